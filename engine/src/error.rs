//! Error handling.

use nom::error::{ErrorKind as NomErrorKind, FromExternalError, ParseError};

use core::fmt;

use crate::{
    fns::{Arity, FromValueError, Signature},
    spans::{InputSpan, MaybeSpanned, Spanned, StripCode},
    values::{Op, ValueType},
};

/// Arithmetic errors raised by operations on [`Value`](crate::Value)s.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ArithmeticError {
    /// Operand dimensions are incompatible for the operation.
    DimensionMismatch {
        /// Operation that has failed.
        op: Op,
        /// Dimensions of the left-hand side, as `(rows, cols)`.
        lhs: (usize, usize),
        /// Dimensions of the right-hand side, as `(rows, cols)`.
        rhs: (usize, usize),
    },
    /// Operand type is not supported by the operation.
    UnsupportedOperand {
        /// Operation that has failed.
        op: Op,
        /// Type of the offending operand.
        operand: ValueType,
    },
    /// Operation requires a square matrix.
    NonSquareMatrix {
        /// Operation that has failed.
        op: Op,
        /// Number of rows.
        rows: usize,
        /// Number of columns.
        cols: usize,
    },
    /// Matrix power exponent is not a non-negative integer.
    InvalidExponent,
    /// Operation would produce a matrix with more than [`Matrix::MAX_ELEMENTS`] elements.
    ///
    /// [`Matrix::MAX_ELEMENTS`]: crate::Matrix::MAX_ELEMENTS
    TooManyElements {
        /// Requested number of elements.
        requested: f64,
    },
    /// Range bounds are too large for consecutive elements to be distinguishable.
    ImpreciseRange,
}

impl fmt::Display for ArithmeticError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DimensionMismatch { op, lhs, rhs } => write!(
                formatter,
                "Dimension mismatch in {op}: LHS is {}x{}, RHS is {}x{}",
                lhs.0, lhs.1, rhs.0, rhs.1
            ),
            Self::UnsupportedOperand { op, operand } => {
                write!(formatter, "Unsupported operand type for {op}: {operand}")
            }
            Self::NonSquareMatrix { op, rows, cols } => write!(
                formatter,
                "{op} requires a square matrix, got {rows}x{cols}"
            ),
            Self::InvalidExponent => {
                formatter.write_str("Matrix exponent must be a non-negative integer")
            }
            Self::TooManyElements { requested } => write!(
                formatter,
                "Matrix would have {requested} elements, while at most {} are allowed",
                crate::Matrix::MAX_ELEMENTS
            ),
            Self::ImpreciseRange => {
                formatter.write_str("Range bounds are too large to step through by 1")
            }
        }
    }
}

impl std::error::Error for ArithmeticError {}

/// Kind of an [`Error`].
#[derive(Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// No expression descriptor matched the input at an operand position.
    NoExpressionMatched,
    /// No operator descriptor matched the input after an operand.
    NoOperatorMatched,
    /// Operands and operators do not pair up; for example, the input ends with a binary operator.
    DanglingTokens {
        /// Tail of the input near the problem.
        tail: String,
    },
    /// Bracket without a matching counterpart.
    UnbalancedBracket {
        /// The unmatched bracket.
        bracket: char,
    },
    /// Empty function argument or bracketed group, such as in `f(1,,2)`.
    EmptyArgument,
    /// Error parsing a literal.
    Literal(anyhow::Error),
    /// Operator is not allowed in the current grouping, e.g., `;` outside of a matrix literal.
    MisplacedOperator {
        /// Operator symbol.
        symbol: String,
    },

    /// Symbol is not defined at the point of use.
    UndefinedSymbol(String),
    /// Function is not defined.
    UndefinedFunction(String),
    /// Mismatch between the number of arguments in the function definition and its call.
    ArgsLenMismatch {
        /// Function name.
        name: String,
        /// Number of args at the function definition.
        def: Arity,
        /// Number of args at the function call.
        call: usize,
    },
    /// None of the function overloads accepts the provided arguments.
    NoMatchingOverload {
        /// Function name.
        name: String,
        /// Types of the provided arguments.
        args: Vec<ValueType>,
    },
    /// Left-hand side of an assignment is not a symbol.
    InvalidAssignment,
    /// Index is out of matrix bounds.
    IndexOutOfBounds {
        /// One-based index.
        index: usize,
        /// Size of the indexed dimension.
        len: usize,
    },
    /// Index is not a positive integer.
    InvalidIndex,

    /// Error performing an arithmetic operation.
    Arithmetic(ArithmeticError),
    /// Generic error during execution of a native function.
    NativeCall(String),
    /// Error while converting arguments for a [`FnWrapper`](crate::fns::FnWrapper).
    Wrapper(FromValueError),

    /// Other scanning error.
    Other {
        /// `nom`-defined error kind.
        kind: NomErrorKind,
    },
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoExpressionMatched => formatter.write_str("Expected an expression"),
            Self::NoOperatorMatched => formatter.write_str("Expected an operator"),
            Self::DanglingTokens { tail } => {
                write!(formatter, "Missing operand near `{tail}`")
            }
            Self::UnbalancedBracket { bracket } => {
                write!(formatter, "Unbalanced bracket `{bracket}`")
            }
            Self::EmptyArgument => formatter.write_str("Empty argument"),
            Self::Literal(err) => write!(formatter, "Invalid literal: {err}"),
            Self::MisplacedOperator { symbol } => {
                write!(formatter, "Operator `{symbol}` is not allowed here")
            }

            Self::UndefinedSymbol(name) => write!(formatter, "Symbol `{name}` is not defined"),
            Self::UndefinedFunction(name) => {
                write!(formatter, "Function `{name}` is not defined")
            }
            Self::ArgsLenMismatch { name, def, call } => write!(
                formatter,
                "Mismatch between the number of arguments in the definition of `{name}` \
                 and its call: definition requires {def} arg(s), call has {call}"
            ),
            Self::NoMatchingOverload { name, args } => {
                write!(formatter, "No overload of `{name}` accepts (")?;
                for (i, arg) in args.iter().enumerate() {
                    formatter.write_str(if i == 0 { "" } else { ", " })?;
                    fmt::Display::fmt(arg, formatter)?;
                }
                formatter.write_str(")")
            }
            Self::InvalidAssignment => {
                formatter.write_str("Left-hand side of an assignment must be a symbol")
            }
            Self::IndexOutOfBounds { index, len } => {
                write!(formatter, "Index {index} is out of bounds 1..={len}")
            }
            Self::InvalidIndex => formatter.write_str("Index must be a positive integer"),

            Self::Arithmetic(err) => fmt::Display::fmt(err, formatter),
            Self::NativeCall(message) => {
                write!(formatter, "Failed executing native function: {message}")
            }
            Self::Wrapper(err) => write!(
                formatter,
                "Failed converting arguments for native function wrapper: {err}"
            ),
            Self::Other { .. } => formatter.write_str("Cannot parse sequence"),
        }
    }
}

impl ErrorKind {
    pub(crate) fn literal<T: Into<anyhow::Error>>(error: T) -> Self {
        Self::Literal(error.into())
    }

    /// Creates a native error.
    pub fn native(message: impl Into<String>) -> Self {
        Self::NativeCall(message.into())
    }

    /// Checks whether this error was raised when building an expression tree
    /// (as opposed to evaluating it).
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            Self::NoExpressionMatched
                | Self::NoOperatorMatched
                | Self::DanglingTokens { .. }
                | Self::UnbalancedBracket { .. }
                | Self::EmptyArgument
                | Self::Literal(_)
                | Self::MisplacedOperator { .. }
                | Self::Other { .. }
        )
    }

    /// Returns a short description of the spanned information.
    pub fn to_short_string(&self) -> String {
        match self {
            Self::NoExpressionMatched => "Expression expected here".to_owned(),
            Self::NoOperatorMatched => "Operator expected here".to_owned(),
            Self::DanglingTokens { .. } => "Unfinished expression".to_owned(),
            Self::UnbalancedBracket { .. } => "Unbalanced bracket".to_owned(),
            Self::EmptyArgument => "Empty argument".to_owned(),
            Self::Literal(_) => "Invalid literal".to_owned(),
            Self::MisplacedOperator { .. } => "Misplaced operator".to_owned(),
            Self::UndefinedSymbol(_) => "Undefined symbol occurrence".to_owned(),
            Self::UndefinedFunction(_) => "Undefined function".to_owned(),
            Self::ArgsLenMismatch { call, .. } => format!("Called with {call} arg(s) here"),
            Self::NoMatchingOverload { .. } | Self::NativeCall(_) | Self::Wrapper(_) => {
                "Failed call".to_owned()
            }
            Self::InvalidAssignment => "Not a symbol".to_owned(),
            Self::IndexOutOfBounds { .. } | Self::InvalidIndex => "Invalid index".to_owned(),
            Self::Arithmetic(ArithmeticError::DimensionMismatch { .. }) => {
                "Operands with incompatible dimensions".to_owned()
            }
            Self::Arithmetic(_) => "Failed operation".to_owned(),
            Self::Other { .. } => "Cannot parse sequence".to_owned(),
        }
    }
}

impl std::error::Error for ErrorKind {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Literal(err) => Some(&**err),
            Self::Arithmetic(err) => Some(err),
            Self::Wrapper(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ArithmeticError> for ErrorKind {
    fn from(err: ArithmeticError) -> Self {
        Self::Arithmetic(err)
    }
}

/// Error that has occurred when building or evaluating an expression, together with
/// its location in the input.
///
/// Once the error passes through the [`Query`](crate::Query) driver, it also carries
/// the original input text.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    location: MaybeSpanned<'static>,
    input: Option<String>,
}

impl Error {
    pub(crate) fn new(kind: ErrorKind, location: MaybeSpanned<'static>) -> Self {
        Self {
            kind,
            location,
            input: None,
        }
    }

    /// Creates an error without a known location.
    pub fn unspanned(kind: ErrorKind) -> Self {
        Self::new(kind, MaybeSpanned::from_str("", ..).strip_code())
    }

    pub(crate) fn with_input(mut self, input: &str) -> Self {
        self.input = Some(input.to_owned());
        self
    }

    /// Returns the kind of this error.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Consumes this error returning its kind.
    pub fn into_kind(self) -> ErrorKind {
        self.kind
    }

    /// Returns the location of the error in the evaluated input.
    pub fn location(&self) -> &MaybeSpanned<'static> {
        &self.location
    }

    /// Returns the original input, if the error was produced by the query driver.
    pub fn input(&self) -> Option<&str> {
        self.input.as_deref()
    }

    /// Returns the part of the input covered by the error location, if the input is attached.
    pub fn snippet(&self) -> Option<&str> {
        self.input.as_deref()?.get(self.location.range())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "{}:{}: {}",
            self.location.location_line(),
            self.location.get_column(),
            self.kind
        )
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

/// Result of evaluating an expression.
pub type EvalResult = Result<crate::Value, Error>;

/// Scanning error with the associated code span. Used by token descriptors.
///
/// A recoverable `nom::Err::Error` means that the descriptor does not match
/// the input, so that the registry may try the next descriptor; `nom::Err::Failure`
/// aborts building the tree.
#[derive(Debug)]
pub struct ScanError<'a> {
    inner: Spanned<'a, ErrorKind>,
}

impl<'a> ScanError<'a> {
    /// Creates an error with the specified kind at the specified input position.
    pub fn new(span: InputSpan<'a>, kind: ErrorKind) -> Self {
        Self {
            inner: Spanned::new(span, kind),
        }
    }

    /// Returns the kind of this error.
    pub fn kind(&self) -> &ErrorKind {
        &self.inner.extra
    }

    /// Returns the span of this error.
    pub fn span(&self) -> Spanned<'a> {
        self.inner.with_no_extra()
    }

    pub(crate) fn into_error(self) -> Error {
        let location = MaybeSpanned::from(self.inner.with_no_extra()).strip_code();
        Error::new(self.inner.extra, location)
    }
}

impl fmt::Display for ScanError<'_> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "{}:{}: {}",
            self.inner.location_line(),
            self.inner.get_column(),
            self.inner.extra
        )
    }
}

impl std::error::Error for ScanError<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(&self.inner.extra)
    }
}

impl<'a> ParseError<InputSpan<'a>> for ScanError<'a> {
    fn from_error_kind(input: InputSpan<'a>, kind: NomErrorKind) -> Self {
        ScanError::new(input, ErrorKind::Other { kind })
    }

    fn append(_: InputSpan<'a>, _: NomErrorKind, other: Self) -> Self {
        other
    }
}

impl<'a> FromExternalError<InputSpan<'a>, ErrorKind> for ScanError<'a> {
    fn from_external_error(input: InputSpan<'a>, _: NomErrorKind, err: ErrorKind) -> Self {
        ScanError::new(input, err)
    }
}

/// Error registering a function, operator or other token in a [`Context`](crate::Context).
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum RegistrationError {
    /// Overload with the same signature is already registered for this name.
    ConflictingSignature {
        /// Function name.
        name: String,
        /// Conflicting signature.
        signature: Signature,
    },
    /// Name cannot be used for the registered item.
    InvalidName {
        /// Offending name.
        name: String,
    },
}

impl fmt::Display for RegistrationError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConflictingSignature { name, signature } => write!(
                formatter,
                "Function `{name}` already has an overload with signature {signature}"
            ),
            Self::InvalidName { name } => write!(formatter, "`{name}` is not a valid name"),
        }
    }
}

impl std::error::Error for RegistrationError {}
