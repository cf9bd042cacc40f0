//! Built-in expression descriptors.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while_m_n},
    character::complete::{char as tag_char, digit1, one_of},
    combinator::{map_res, not, opt, peek, recognize},
    error::{ErrorKind as NomErrorKind, ParseError},
    sequence::{preceded, terminated, tuple},
    Slice,
};

use crate::{
    error::{ErrorKind, ScanError},
    parser::Scanner,
    registry::{ExpressionToken, Grouping},
    spans::{InputSpan, NomResult},
    tree::{Expr, SpannedExpr},
    Value,
};

/// Ensures that the child parser does not consume a part of a larger token by rejecting
/// if the part following the input is an alphabetic char or `_`.
fn ensure_no_overlap<'a, T>(
    parser: impl FnMut(InputSpan<'a>) -> NomResult<'a, T>,
) -> impl FnMut(InputSpan<'a>) -> NomResult<'a, T> {
    terminated(
        parser,
        peek(not(take_while_m_n(1, 1, |c: char| {
            c.is_ascii_alphabetic() || c == '_'
        }))),
    )
}

/// Decimal number in the plain or scientific notation, e.g. `1`, `2.5`, `.5`, `1e-3`.
fn decimal(input: InputSpan<'_>) -> NomResult<'_, InputSpan<'_>> {
    fn exponent(input: InputSpan<'_>) -> NomResult<'_, InputSpan<'_>> {
        recognize(tuple((one_of("eE"), opt(one_of("+-")), digit1)))(input)
    }

    // `2.` is a valid number unless the dot starts an operator such as `.*`
    let bare_dot = terminated(tag_char('.'), not(one_of("*/^'")));
    let fraction = alt((recognize(preceded(tag_char('.'), digit1)), recognize(bare_dot)));

    let with_integer_part = tuple((digit1, opt(fraction), opt(exponent)));
    let without_integer_part = tuple((tag_char('.'), digit1, opt(exponent)));
    alt((recognize(with_integer_part), recognize(without_integer_part)))(input)
}

/// Real or imaginary number literal, e.g., `2.5`, `1e-3` or `4i`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumberLiteral;

impl ExpressionToken for NumberLiteral {
    fn name(&self) -> &str {
        "number"
    }

    fn scan<'a>(&self, input: InputSpan<'a>, _: &Scanner<'_>) -> NomResult<'a, Expr> {
        let parse_decimal =
            |s: InputSpan<'_>| s.fragment().parse::<f64>().map_err(ErrorKind::literal);
        let number = tuple((map_res(decimal, parse_decimal), opt(one_of("ij"))));
        let (rest, (value, imaginary)) = ensure_no_overlap(number)(input)?;

        let value = if imaginary.is_some() {
            Value::complex(0.0, value)
        } else {
            Value::real(value)
        };
        Ok((rest, Expr::Literal(value)))
    }
}

/// Identifier, like `a_foo` or `Bar`, or the last-result symbol `$`.
fn symbol_name(input: InputSpan<'_>) -> NomResult<'_, InputSpan<'_>> {
    let identifier = preceded(
        peek(take_while_m_n(1, 1, |c: char| {
            c.is_ascii_alphabetic() || c == '_'
        })),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    );
    alt((identifier, tag("$")))(input)
}

/// Checks if the provided string is a valid symbol name.
pub fn is_valid_symbol_name(name: &str) -> bool {
    if name == "$" {
        return true;
    }
    let mut chars = name.chars();
    chars
        .next()
        .map_or(false, |c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Splits the input starting with `open` at the matching closing bracket. Returns the remaining
/// input after the closing bracket and the contents between the brackets.
///
/// Brackets `()` and `[]` are tracked together, so `(1, [2)]` is reported as unbalanced.
fn bracketed(input: InputSpan<'_>, open: char) -> NomResult<'_, InputSpan<'_>> {
    if !input.fragment().starts_with(open) {
        let err = ScanError::from_error_kind(input, NomErrorKind::Char);
        return Err(nom::Err::Error(err));
    }

    let mut expected_closers = vec![];
    for (i, c) in input.fragment().char_indices() {
        match c {
            '(' => expected_closers.push(')'),
            '[' => expected_closers.push(']'),
            ')' | ']' => {
                if expected_closers.pop() != Some(c) {
                    let err = ScanError::new(
                        input.slice(i..i + 1),
                        ErrorKind::UnbalancedBracket { bracket: c },
                    );
                    return Err(nom::Err::Failure(err));
                }
                if expected_closers.is_empty() {
                    return Ok((input.slice(i + 1..), input.slice(1..i)));
                }
            }
            _ => { /* not a bracket */ }
        }
    }

    let err = ScanError::new(input.slice(..1), ErrorKind::UnbalancedBracket { bracket: open });
    Err(nom::Err::Failure(err))
}

/// Splits bracket contents at top-level commas.
fn split_args(input: InputSpan<'_>) -> Vec<InputSpan<'_>> {
    let mut args = vec![];
    let mut depth = 0_usize;
    let mut arg_start = 0;
    for (i, c) in input.fragment().char_indices() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                args.push(input.slice(arg_start..i));
                arg_start = i + 1;
            }
            _ => { /* other char */ }
        }
    }
    args.push(input.slice(arg_start..));
    args
}

fn is_blank(input: &InputSpan<'_>) -> bool {
    input.fragment().trim().is_empty()
}

fn build_nested<'a>(
    scanner: &Scanner<'_>,
    input: InputSpan<'a>,
    grouping: Grouping,
) -> Result<SpannedExpr, nom::Err<ScanError<'a>>> {
    if is_blank(&input) {
        return Err(nom::Err::Failure(ScanError::new(input, ErrorKind::EmptyArgument)));
    }
    scanner.build_tree(input, grouping).map_err(nom::Err::Failure)
}

/// Symbol reference (`x`, `$`), function call (`sin(x)`) or indexing (`x(2, 1)`).
///
/// Whether a call is a function call or indexing is decided during evaluation.
#[derive(Debug, Clone, Copy, Default)]
pub struct SymbolToken;

impl ExpressionToken for SymbolToken {
    fn name(&self) -> &str {
        "symbol"
    }

    fn scan<'a>(&self, input: InputSpan<'a>, scanner: &Scanner<'_>) -> NomResult<'a, Expr> {
        let (rest, name) = symbol_name(input)?;
        let name = (*name.fragment()).to_owned();
        if !rest.fragment().starts_with('(') {
            return Ok((rest, Expr::Symbol(name)));
        }

        let (rest, contents) = bracketed(rest, '(')?;
        let args = if is_blank(&contents) {
            vec![]
        } else {
            split_args(contents)
                .into_iter()
                .map(|arg| build_nested(scanner, arg, Grouping::Args))
                .collect::<Result<_, _>>()?
        };
        Ok((rest, Expr::Call { name, args }))
    }
}

/// Expression in parentheses, e.g., `(1 + 2)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParenGroup;

impl ExpressionToken for ParenGroup {
    fn name(&self) -> &str {
        "parens"
    }

    fn scan<'a>(&self, input: InputSpan<'a>, scanner: &Scanner<'_>) -> NomResult<'a, Expr> {
        let (rest, contents) = bracketed(input, '(')?;
        let inner = build_nested(scanner, contents, Grouping::Parens)?;
        Ok((rest, Expr::Group(Box::new(inner))))
    }
}

/// Matrix literal, e.g., `[1, 2; 3, 4]`, `[1 2 3]` or `[]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatrixLiteral;

impl ExpressionToken for MatrixLiteral {
    fn name(&self) -> &str {
        "matrix"
    }

    fn scan<'a>(&self, input: InputSpan<'a>, scanner: &Scanner<'_>) -> NomResult<'a, Expr> {
        let (rest, contents) = bracketed(input, '[')?;
        if is_blank(&contents) {
            return Ok((rest, Expr::Matrix(None)));
        }
        let inner = build_nested(scanner, contents, Grouping::Matrix)?;
        Ok((rest, Expr::Matrix(Some(Box::new(inner)))))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::registry::TokenSet;

    fn scan<'a>(token: &dyn ExpressionToken, input: &'a str) -> NomResult<'a, Expr> {
        let tokens = TokenSet::builtin();
        let scanner = Scanner::for_tests(&tokens);
        token.scan(InputSpan::new(input), &scanner)
    }

    #[test]
    fn number_literals() {
        let samples = [
            ("1", Value::real(1.0), ""),
            ("2.5 + 1", Value::real(2.5), " + 1"),
            (".5", Value::real(0.5), ""),
            ("1e-3*x", Value::real(1e-3), "*x"),
            ("2.E2", Value::real(200.0), ""),
            ("3i", Value::complex(0.0, 3.0), ""),
            ("1.5j'", Value::complex(0.0, 1.5), "'"),
            ("2.*x", Value::real(2.0), ".*x"),
            ("2.'", Value::real(2.0), ".'"),
        ];
        for (input, expected, expected_rest) in samples {
            let (rest, expr) = scan(&NumberLiteral, input).unwrap();
            assert_eq!(expr, Expr::Literal(expected), "{input}");
            assert_eq!(*rest.fragment(), expected_rest, "{input}");
        }
    }

    #[test]
    fn number_literal_cannot_overlap_identifier() {
        assert_matches!(scan(&NumberLiteral, "2x"), Err(nom::Err::Error(_)));
        assert_matches!(scan(&NumberLiteral, "3if"), Err(nom::Err::Error(_)));
        assert_matches!(scan(&NumberLiteral, "x"), Err(nom::Err::Error(_)));
    }

    #[test]
    fn symbol_names() {
        assert!(is_valid_symbol_name("x_1"));
        assert!(is_valid_symbol_name("_"));
        assert!(is_valid_symbol_name("$"));
        assert!(!is_valid_symbol_name("1x"));
        assert!(!is_valid_symbol_name("a-b"));
        assert!(!is_valid_symbol_name(""));
    }

    #[test]
    fn symbols_and_calls() {
        let (rest, expr) = scan(&SymbolToken, "foo_1 + 2").unwrap();
        assert_eq!(expr, Expr::Symbol("foo_1".to_owned()));
        assert_eq!(*rest.fragment(), " + 2");

        let (rest, expr) = scan(&SymbolToken, "max(1, (2 + 3)')").unwrap();
        assert_eq!(*rest.fragment(), "");
        assert_matches!(expr, Expr::Call { name, args } if name == "max" && args.len() == 2);

        let (_, expr) = scan(&SymbolToken, "rand()").unwrap();
        assert_matches!(expr, Expr::Call { args, .. } if args.is_empty());
    }

    #[test]
    fn empty_call_argument() {
        let err = scan(&SymbolToken, "f(1, , 2)").unwrap_err();
        let nom::Err::Failure(err) = err else {
            panic!("unexpected error: {err:?}");
        };
        assert_matches!(err.kind(), ErrorKind::EmptyArgument);
        assert_eq!(err.span().location_offset(), 4);
    }

    #[test]
    fn unbalanced_brackets() {
        let err = scan(&ParenGroup, "(1 + [2)]").unwrap_err();
        let nom::Err::Failure(err) = err else {
            panic!("unexpected error: {err:?}");
        };
        assert_matches!(err.kind(), ErrorKind::UnbalancedBracket { bracket: ')' });
        assert_eq!(err.span().location_offset(), 7);

        let err = scan(&MatrixLiteral, "[1, 2").unwrap_err();
        assert_matches!(
            err,
            nom::Err::Failure(err) if matches!(err.kind(), ErrorKind::UnbalancedBracket { bracket: '[' })
        );
    }

    #[test]
    fn matrix_literals() {
        let (_, expr) = scan(&MatrixLiteral, "[]").unwrap();
        assert_eq!(expr, Expr::Matrix(None));
        let (rest, expr) = scan(&MatrixLiteral, "[1 2; 3 4]'").unwrap();
        assert_eq!(*rest.fragment(), "'");
        assert_eq!(expr.to_string(), "[1, 2; 3, 4]");
    }
}
