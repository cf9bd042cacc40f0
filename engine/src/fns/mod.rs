//! Function contract and standard functions.
//!
//! A function callable from expressions implements the [`Function`] trait. There are several
//! ways to define one:
//!
//! - Implement the trait directly. This is the most flexible way, e.g., to define variadic
//!   functions with a custom [`Signature`].
//! - Use a closure taking a `Vec` of [`SpannedValue`]s and a [`CallContext`]. Such closures
//!   accept any arguments, so they should check their args themselves.
//! - [Wrap](wrap()) a Rust function with typed arguments. The wrapper derives the signature
//!   and performs argument conversions automatically.
//! - Apply a scalar function element-wise with [`Elementwise`].
//!
//! Several functions may be registered under the same name as long as their signatures differ.
//! On a call, overloads are resolved by the number of arguments first, and then by argument types;
//! the first overload (in the registration order) accepting the arguments is called.

use core::fmt;
use std::sync::Arc;

use crate::{
    context::Context,
    error::{Error, ErrorKind, EvalResult},
    spans::MaybeSpanned,
    values::{Value, ValueType},
};

mod prelude;
mod wrapper;

pub use self::{
    prelude::{Elementwise, Prelude},
    wrapper::{
        wrap, Binary, FnWrapper, FromValueError, FromValueErrorKind, IntoEvalResult, TryFromValue,
        Unary,
    },
};

/// Value together with the span of the argument expression that has produced it.
pub type SpannedValue = MaybeSpanned<'static, Value>;

/// Shared reference to a function.
pub type FunctionRef = Arc<dyn Function>;

/// Number of arguments accepted by a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arity {
    /// Exact number of arguments.
    Exact(usize),
    /// Minimum number of arguments.
    AtLeast(usize),
}

impl Arity {
    /// Checks whether the arity matches the provided number of arguments.
    pub fn matches(self, args_len: usize) -> bool {
        match self {
            Self::Exact(len) => args_len == len,
            Self::AtLeast(len) => args_len >= len,
        }
    }
}

impl From<usize> for Arity {
    fn from(value: usize) -> Self {
        Self::Exact(value)
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(len) => write!(formatter, "{len}"),
            Self::AtLeast(len) => write!(formatter, "at least {len}"),
        }
    }
}

/// Kind of a function parameter used for overload resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ParamKind {
    /// Any value, including opaque ones.
    Any,
    /// Scalar value (including the missing scalar).
    Scalar,
    /// Matrix value. Since `1×1` matrices are normalized to scalars, scalars do not match.
    Matrix,
    /// Scalar or matrix value.
    Numeric,
}

impl ParamKind {
    /// Checks whether the parameter accepts the provided value.
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            Self::Any => true,
            Self::Scalar => matches!(value, Value::Scalar(_)),
            Self::Matrix => matches!(value, Value::Matrix(_)),
            Self::Numeric => matches!(value, Value::Scalar(_) | Value::Matrix(_)),
        }
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Any => "any",
            Self::Scalar => "scalar",
            Self::Matrix => "matrix",
            Self::Numeric => "numeric",
        })
    }
}

/// Function signature: kinds of positional parameters and an optional variadic tail.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    params: Vec<ParamKind>,
    variadic: Option<ParamKind>,
}

impl Signature {
    /// Creates a signature with the specified positional parameters.
    pub fn new(params: impl IntoIterator<Item = ParamKind>) -> Self {
        Self {
            params: params.into_iter().collect(),
            variadic: None,
        }
    }

    /// Creates a signature accepting any number of args of the specified kind.
    pub fn variadic(kind: ParamKind) -> Self {
        Self {
            params: vec![],
            variadic: Some(kind),
        }
    }

    /// Adds a variadic tail to this signature.
    #[must_use]
    pub fn with_variadic(mut self, kind: ParamKind) -> Self {
        self.variadic = Some(kind);
        self
    }

    /// Returns positional parameters.
    pub fn params(&self) -> &[ParamKind] {
        &self.params
    }

    /// Returns the kind of variadic args, if any.
    pub fn variadic_kind(&self) -> Option<ParamKind> {
        self.variadic
    }

    /// Returns the arity of this signature.
    pub fn arity(&self) -> Arity {
        if self.variadic.is_some() {
            Arity::AtLeast(self.params.len())
        } else {
            Arity::Exact(self.params.len())
        }
    }

    /// Checks whether this signature accepts the provided args.
    pub fn accepts<'v>(&self, args: impl IntoIterator<Item = &'v Value>) -> bool {
        let mut args = args.into_iter();
        for param in &self.params {
            match args.next() {
                Some(arg) if param.accepts(arg) => { /* continue checking */ }
                _ => return false,
            }
        }
        match self.variadic {
            Some(kind) => args.all(|arg| kind.accepts(arg)),
            None => args.next().is_none(),
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                formatter.write_str(", ")?;
            }
            fmt::Display::fmt(param, formatter)?;
        }
        if let Some(kind) = self.variadic {
            if !self.params.is_empty() {
                formatter.write_str(", ")?;
            }
            write!(formatter, "...{kind}")?;
        }
        formatter.write_str(")")
    }
}

/// Context for native function calls.
#[derive(Debug)]
pub struct CallContext<'r, 'c> {
    name: &'r str,
    call_span: MaybeSpanned<'static>,
    context: &'r Context<'c>,
}

impl<'r, 'c> CallContext<'r, 'c> {
    pub(crate) fn new(
        name: &'r str,
        call_span: MaybeSpanned<'static>,
        context: &'r Context<'c>,
    ) -> Self {
        Self {
            name,
            call_span,
            context,
        }
    }

    /// Creates a mock call context with the specified function name and call span.
    pub fn mock(
        name: &'r str,
        call_span: MaybeSpanned<'static>,
        context: &'r Context<'c>,
    ) -> Self {
        Self::new(name, call_span, context)
    }

    /// Returns the name of the called function.
    pub fn name(&self) -> &str {
        self.name
    }

    /// Returns the call span of the currently executing function.
    pub fn call_span(&self) -> &MaybeSpanned<'static> {
        &self.call_span
    }

    /// Returns the context the function is evaluated in.
    pub fn context(&self) -> &'r Context<'c> {
        self.context
    }

    /// Applies the call span to the specified `value`.
    pub fn apply_call_span<T>(&self, value: T) -> MaybeSpanned<'static, T> {
        self.call_span.copy_with_extra(value)
    }

    /// Creates an error spanning the call site.
    pub fn call_site_error(&self, error: ErrorKind) -> Error {
        Error::new(error, self.call_span)
    }

    /// Checks argument count and returns an error if it doesn't match.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ArgsLenMismatch`] spanning the call site on a mismatch.
    pub fn check_args_count(
        &self,
        args: &[SpannedValue],
        expected_count: impl Into<Arity>,
    ) -> Result<(), Error> {
        let expected_count = expected_count.into();
        if expected_count.matches(args.len()) {
            Ok(())
        } else {
            Err(self.call_site_error(ErrorKind::ArgsLenMismatch {
                name: self.name.to_owned(),
                def: expected_count,
                call: args.len(),
            }))
        }
    }
}

/// Function on zero or more [`Value`]s.
pub trait Function: Send + Sync {
    /// Returns the signature of this function used for overload resolution.
    fn signature(&self) -> Signature;

    /// Executes the function on the specified arguments.
    ///
    /// # Errors
    ///
    /// Errors should be created with [`CallContext::call_site_error()`] unless they can
    /// be attributed to a specific argument.
    fn evaluate(&self, args: Vec<SpannedValue>, context: &mut CallContext<'_, '_>) -> EvalResult;
}

impl fmt::Debug for dyn Function {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Function")
            .field("signature", &self.signature())
            .finish_non_exhaustive()
    }
}

impl<F> Function for F
where
    F: Fn(Vec<SpannedValue>, &mut CallContext<'_, '_>) -> EvalResult + Send + Sync,
{
    fn signature(&self) -> Signature {
        Signature::variadic(ParamKind::Any)
    }

    fn evaluate(&self, args: Vec<SpannedValue>, context: &mut CallContext<'_, '_>) -> EvalResult {
        self(args, context)
    }
}

/// Overloads registered for a single function name, in the registration order.
#[derive(Debug, Clone, Default)]
pub struct Overloads {
    functions: Vec<FunctionRef>,
}

impl Overloads {
    pub(crate) fn single(function: FunctionRef) -> Self {
        Self {
            functions: vec![function],
        }
    }

    /// Adds an overload. Returns the conflicting signature if an overload with the same
    /// signature is already present.
    pub(crate) fn push(&mut self, function: FunctionRef) -> Result<(), Signature> {
        let signature = function.signature();
        if self
            .functions
            .iter()
            .any(|existing| existing.signature() == signature)
        {
            return Err(signature);
        }
        self.functions.push(function);
        Ok(())
    }

    /// Iterates over overloads in the registration order.
    pub fn iter(&self) -> impl Iterator<Item = &FunctionRef> + '_ {
        self.functions.iter()
    }

    /// Returns the number of overloads.
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Checks whether there are no overloads.
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Picks the overload for the provided args.
    pub(crate) fn resolve(
        &self,
        name: &str,
        args: &[SpannedValue],
    ) -> Result<&FunctionRef, ErrorKind> {
        let mut by_arity = self
            .functions
            .iter()
            .filter(|function| function.signature().arity().matches(args.len()))
            .peekable();

        if by_arity.peek().is_none() {
            let def = self
                .functions
                .first()
                .map_or(Arity::Exact(0), |function| function.signature().arity());
            return Err(ErrorKind::ArgsLenMismatch {
                name: name.to_owned(),
                def,
                call: args.len(),
            });
        }

        by_arity
            .find(|function| function.signature().accepts(args.iter().map(|arg| &arg.extra)))
            .ok_or_else(|| ErrorKind::NoMatchingOverload {
                name: name.to_owned(),
                args: arg_types(args),
            })
    }
}

fn arg_types(args: &[SpannedValue]) -> Vec<ValueType> {
    args.iter().map(|arg| arg.extra.value_type()).collect()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::{spans::StripCode, Matrix, Scalar};

    fn spanned(value: Value) -> SpannedValue {
        MaybeSpanned::from_str("", ..).copy_with_extra(value).strip_code()
    }

    #[test]
    fn signature_display_and_arity() {
        let signature = Signature::new([ParamKind::Scalar, ParamKind::Matrix]);
        assert_eq!(signature.to_string(), "(scalar, matrix)");
        assert_eq!(signature.arity(), Arity::Exact(2));

        let signature = Signature::new([ParamKind::Numeric]).with_variadic(ParamKind::Any);
        assert_eq!(signature.to_string(), "(numeric, ...any)");
        assert_eq!(signature.arity(), Arity::AtLeast(1));
        assert!(signature.arity().matches(3));
        assert!(!signature.arity().matches(0));
    }

    #[test]
    fn signature_accepts_args() {
        let matrix = Value::matrix(Matrix::row_vector(vec![Scalar::real(1.0); 2]));
        let signature = Signature::new([ParamKind::Matrix, ParamKind::Scalar]);
        assert!(signature.accepts([&matrix, &Value::real(1.0)]));
        assert!(!signature.accepts([&Value::real(1.0), &Value::real(1.0)]));
        assert!(!signature.accepts([&matrix]));

        let signature = Signature::variadic(ParamKind::Numeric);
        assert!(signature.accepts(std::iter::empty()));
        assert!(signature.accepts([&matrix, &Value::real(1.0)]));
        assert!(!signature.accepts([&Value::opaque(1_u8)]));
    }

    #[test]
    fn overload_resolution() {
        let scalar_fn: FunctionRef = Arc::new(wrap(|x: Scalar| x));
        let matrix_fn: FunctionRef = Arc::new(wrap(|xs: Matrix| xs.transpose()));
        let mut overloads = Overloads::single(scalar_fn);
        overloads.push(matrix_fn).unwrap();

        let conflicting: FunctionRef = Arc::new(wrap(|x: Scalar| -x));
        let err = overloads.push(conflicting).unwrap_err();
        assert_eq!(err, Signature::new([ParamKind::Scalar]));

        let matrix = Value::matrix(Matrix::row_vector(vec![Scalar::real(1.0); 2]));
        let resolved = overloads.resolve("f", &[spanned(matrix)]).unwrap();
        assert_eq!(resolved.signature(), Signature::new([ParamKind::Matrix]));

        let err = overloads.resolve("f", &[]).unwrap_err();
        assert_matches!(
            err,
            ErrorKind::ArgsLenMismatch { def: Arity::Exact(1), call: 0, .. }
        );
        let err = overloads
            .resolve("f", &[spanned(Value::opaque(1_u8))])
            .unwrap_err();
        assert_matches!(
            err,
            ErrorKind::NoMatchingOverload { args, .. } if args == [ValueType::Opaque]
        );
    }
}
