//! Code spans attached to tree nodes and errors.

use nom::Slice;

use core::ops::Range;

use crate::error::ScanError;

/// Input consumed by token descriptors.
pub type InputSpan<'a> = nom_locate::LocatedSpan<&'a str, ()>;
/// Result of a descriptor scanning the input.
pub type NomResult<'a, T> = nom::IResult<InputSpan<'a>, T, ScanError<'a>>;

/// Location of a code fragment in the parsed input together with a payload.
///
/// In contrast to [`InputSpan`], this type does not reference the remaining input, so
/// the fragment can be [stripped](CodeFragment::strip()) to decouple the span
/// from the input lifetime.
#[derive(Debug, Clone, Copy)]
pub struct LocatedSpan<Span, T = ()> {
    offset: usize,
    line: u32,
    column: usize,
    fragment: Span,

    /// Payload attached to the span.
    pub extra: T,
}

impl<Span: PartialEq, T> PartialEq for LocatedSpan<Span, T> {
    fn eq(&self, other: &Self) -> bool {
        self.offset == other.offset && self.line == other.line && self.fragment == other.fragment
    }
}

impl<Span, T> LocatedSpan<Span, T> {
    /// Byte offset of the fragment start in the parsed input (0-based).
    pub fn location_offset(&self) -> usize {
        self.offset
    }

    /// Line of the fragment start (1-based).
    pub fn location_line(&self) -> u32 {
        self.line
    }

    /// Column of the fragment start (1-based).
    pub fn get_column(&self) -> usize {
        self.column
    }

    /// Spanned fragment.
    pub fn fragment(&self) -> &Span {
        &self.fragment
    }

    fn with_fragment<U>(self, fragment: U) -> LocatedSpan<U, T> {
        LocatedSpan {
            offset: self.offset,
            line: self.line,
            column: self.column,
            fragment,
            extra: self.extra,
        }
    }
}

impl<Span: Copy, T> LocatedSpan<Span, T> {
    /// Copies location info of this span, attaching `extra` to it.
    pub fn copy_with_extra<U>(&self, extra: U) -> LocatedSpan<Span, U> {
        LocatedSpan {
            offset: self.offset,
            line: self.line,
            column: self.column,
            fragment: self.fragment,
            extra,
        }
    }

    /// Copies location info of this span without the payload.
    pub fn with_no_extra(&self) -> LocatedSpan<Span> {
        self.copy_with_extra(())
    }
}

/// Span referencing the parsed input.
pub type Spanned<'a, T = ()> = LocatedSpan<&'a str, T>;

impl<'a, T> Spanned<'a, T> {
    pub(crate) fn new(span: InputSpan<'a>, extra: T) -> Self {
        Self {
            offset: span.location_offset(),
            line: span.location_line(),
            column: span.get_column(),
            fragment: *span.fragment(),
            extra,
        }
    }
}

impl<'a> Spanned<'a> {
    /// Creates a span covering `range` of the `code`.
    pub fn from_str<R>(code: &'a str, range: R) -> Self
    where
        InputSpan<'a>: Slice<R>,
    {
        Self::new(InputSpan::new(code).slice(range), ())
    }
}

/// Code fragment of a span: either a reference to the parsed input, or only the fragment
/// length if the span has outlived the input.
///
/// Expression trees and errors returned by the engine always contain stripped fragments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CodeFragment<'a> {
    /// Reference to the parsed input.
    Str(&'a str),
    /// Length of the stripped fragment in bytes.
    Stripped(usize),
}

impl PartialEq<&str> for CodeFragment<'_> {
    fn eq(&self, other: &&str) -> bool {
        matches!(self, Self::Str(code) if code == other)
    }
}

impl CodeFragment<'_> {
    /// Forgets the reference to the parsed input, retaining only the fragment length.
    pub fn strip(self) -> CodeFragment<'static> {
        CodeFragment::Stripped(self.len())
    }

    /// Length of the fragment in bytes.
    pub fn len(self) -> usize {
        match self {
            Self::Str(code) => code.len(),
            Self::Stripped(len) => len,
        }
    }

    /// Checks whether the fragment is empty.
    pub fn is_empty(self) -> bool {
        self.len() == 0
    }
}

impl<'a> From<&'a str> for CodeFragment<'a> {
    fn from(code: &'a str) -> Self {
        Self::Str(code)
    }
}

/// Span that may or may not reference the parsed input.
pub type MaybeSpanned<'a, T = ()> = LocatedSpan<CodeFragment<'a>, T>;

impl<'a> MaybeSpanned<'a> {
    /// Creates a span covering `range` of the `code`.
    pub fn from_str<R>(code: &'a str, range: R) -> Self
    where
        InputSpan<'a>: Slice<R>,
    {
        Spanned::from_str(code, range).into()
    }
}

impl<T> MaybeSpanned<'_, T> {
    /// Byte range of the fragment in the parsed input.
    pub fn range(&self) -> Range<usize> {
        self.offset..(self.offset + self.fragment.len())
    }
}

impl<'a, T> From<Spanned<'a, T>> for MaybeSpanned<'a, T> {
    fn from(span: Spanned<'a, T>) -> Self {
        let fragment = CodeFragment::Str(span.fragment);
        span.with_fragment(fragment)
    }
}

/// Conversion of a value referencing the parsed input into a `'static` one.
pub trait StripCode {
    /// Value without references to the parsed input.
    type Stripped: 'static;

    /// Strips references to the parsed input.
    fn strip_code(&self) -> Self::Stripped;
}

impl<T: Clone + 'static> StripCode for MaybeSpanned<'_, T> {
    type Stripped = MaybeSpanned<'static, T>;

    fn strip_code(&self) -> Self::Stripped {
        self.clone().with_fragment(self.fragment.strip())
    }
}

/// Creates a stripped span covering `span`.
pub(crate) fn stripped<T>(span: InputSpan<'_>, extra: T) -> MaybeSpanned<'static, T> {
    let span = Spanned::new(span, extra);
    let fragment = CodeFragment::Stripped(span.fragment.len());
    span.with_fragment(fragment)
}

/// Creates a stripped span from the start of `start` to the end of `end`.
pub(crate) fn unite_spans<T, U>(
    start: &MaybeSpanned<'_, T>,
    end: &MaybeSpanned<'_, U>,
) -> MaybeSpanned<'static> {
    let end_offset = end.range().end;
    debug_assert!(start.offset <= end_offset);
    LocatedSpan {
        offset: start.offset,
        line: start.line,
        column: start.column,
        fragment: CodeFragment::Stripped(end_offset.saturating_sub(start.offset)),
        extra: (),
    }
}

/// Wraps a parser so that its output is spanned by the consumed input.
pub(crate) fn with_span<'a, O>(
    mut parser: impl FnMut(InputSpan<'a>) -> NomResult<'a, O>,
) -> impl FnMut(InputSpan<'a>) -> NomResult<'a, MaybeSpanned<'static, O>> {
    move |input: InputSpan<'a>| {
        let (rest, output) = parser(input)?;
        let consumed = rest.location_offset() - input.location_offset();
        Ok((rest, stripped(input.slice(..consumed), output)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stripping_keeps_location() {
        let span = MaybeSpanned::from_str("1 + foo", 4..);
        assert_eq!(*span.fragment(), "foo");
        let stripped = span.strip_code();
        assert_eq!(stripped.location_offset(), 4);
        assert_eq!(stripped.get_column(), 5);
        assert_eq!(*stripped.fragment(), CodeFragment::Stripped(3));
        assert_eq!(stripped.range(), 4..7);
    }

    #[test]
    fn uniting_spans() {
        let start = MaybeSpanned::from_str("(1 + foo) * 2", 1..2);
        let end = MaybeSpanned::from_str("(1 + foo) * 2", 5..8);
        let united = unite_spans(&start, &end);
        assert_eq!(united.range(), 1..8);
    }

    #[test]
    fn spanning_parser_output() {
        let mut parser = with_span(nom::character::complete::digit1::<_, ScanError<'_>>);
        let (rest, digits) = parser(InputSpan::new("123 + 4")).unwrap();
        assert_eq!(*rest.fragment(), " + 4");
        assert_eq!(digits.range(), 0..3);
        assert_eq!(*digits.extra.fragment(), "123");
    }
}
