//! Wrapper for eloquent `Function` definitions.

use num_complex::Complex64;

use core::{fmt, marker::PhantomData};

use super::{Arity, CallContext, Function, ParamKind, Signature, SpannedValue};
use crate::{
    error::{ArithmeticError, Error, ErrorKind, EvalResult},
    values::{Matrix, Scalar, Value, ValueType},
};

/// Error raised when a value cannot be converted to the expected type when using
/// [`FnWrapper`].
#[derive(Debug, Clone, PartialEq)]
pub struct FromValueError {
    kind: FromValueErrorKind,
    arg_index: usize,
}

impl FromValueError {
    fn new(kind: FromValueErrorKind) -> Self {
        Self { kind, arg_index: 0 }
    }

    pub(crate) fn invalid_type(expected: ParamKind, actual_value: &Value) -> Self {
        Self::new(FromValueErrorKind::InvalidType {
            expected,
            actual: actual_value.value_type(),
        })
    }

    fn set_arg_index(mut self, index: usize) -> Self {
        self.arg_index = index;
        self
    }

    /// Returns the error kind.
    pub fn kind(&self) -> &FromValueErrorKind {
        &self.kind
    }

    /// Returns the zero-based index of the argument where the error has occurred.
    pub fn arg_index(&self) -> usize {
        self.arg_index
    }
}

impl fmt::Display for FromValueError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "{}. Error location: arg{}",
            self.kind, self.arg_index
        )
    }
}

impl std::error::Error for FromValueError {}

/// Error kinds for [`FromValueError`].
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum FromValueErrorKind {
    /// Mismatch between expected and actual value type.
    InvalidType {
        /// Expected parameter kind.
        expected: ParamKind,
        /// Actual value type.
        actual: ValueType,
    },
    /// Scalar is missing.
    Missing,
    /// Scalar has a non-zero imaginary part, while a real number is expected.
    NotReal,
    /// Scalar is not a non-negative integer.
    NotCount,
}

impl fmt::Display for FromValueErrorKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidType { expected, actual } => {
                write!(formatter, "Cannot convert {actual} to {expected}")
            }
            Self::Missing => formatter.write_str("Value is missing"),
            Self::NotReal => formatter.write_str("Expected a real number"),
            Self::NotCount => formatter.write_str("Expected a non-negative integer"),
        }
    }
}

/// Fallible conversion from `Value` to a function argument.
pub trait TryFromValue: Sized {
    /// Returns the kind of parameters of this type used in function signatures.
    fn param_kind() -> ParamKind;

    /// Attempts to convert `value` to a type supported by the function.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be converted.
    fn try_from_value(value: Value) -> Result<Self, FromValueError>;
}

impl TryFromValue for Value {
    fn param_kind() -> ParamKind {
        ParamKind::Any
    }

    fn try_from_value(value: Value) -> Result<Self, FromValueError> {
        Ok(value)
    }
}

impl TryFromValue for Scalar {
    fn param_kind() -> ParamKind {
        ParamKind::Scalar
    }

    fn try_from_value(value: Value) -> Result<Self, FromValueError> {
        match value {
            Value::Scalar(scalar) => Ok(scalar),
            _ => Err(FromValueError::invalid_type(ParamKind::Scalar, &value)),
        }
    }
}

impl TryFromValue for Complex64 {
    fn param_kind() -> ParamKind {
        ParamKind::Scalar
    }

    fn try_from_value(value: Value) -> Result<Self, FromValueError> {
        let scalar = Scalar::try_from_value(value)?;
        scalar
            .as_complex()
            .ok_or_else(|| FromValueError::new(FromValueErrorKind::Missing))
    }
}

impl TryFromValue for f64 {
    fn param_kind() -> ParamKind {
        ParamKind::Scalar
    }

    fn try_from_value(value: Value) -> Result<Self, FromValueError> {
        let scalar = Scalar::try_from_value(value)?;
        if scalar.is_missing() {
            return Err(FromValueError::new(FromValueErrorKind::Missing));
        }
        scalar
            .as_real()
            .ok_or_else(|| FromValueError::new(FromValueErrorKind::NotReal))
    }
}

impl TryFromValue for usize {
    fn param_kind() -> ParamKind {
        ParamKind::Scalar
    }

    fn try_from_value(value: Value) -> Result<Self, FromValueError> {
        let value = f64::try_from_value(value)?;
        if value >= 0.0 && value.fract() == 0.0 && value <= u32::MAX.into() {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let count = value as usize;
            Ok(count)
        } else {
            Err(FromValueError::new(FromValueErrorKind::NotCount))
        }
    }
}

impl TryFromValue for Matrix {
    fn param_kind() -> ParamKind {
        ParamKind::Matrix
    }

    fn try_from_value(value: Value) -> Result<Self, FromValueError> {
        match value {
            Value::Matrix(matrix) => Ok(matrix),
            _ => Err(FromValueError::invalid_type(ParamKind::Matrix, &value)),
        }
    }
}

/// Converts type into `Value` or an error. This is used to convert the return type
/// of [wrapped functions](FnWrapper) to the result expected by [`Function`].
///
/// Beside values and numbers, this trait is implemented for `Result`s with the error
/// convertible to [`ErrorKind`]. String errors are converted to [`ErrorKind::NativeCall`].
pub trait IntoEvalResult {
    /// Performs the conversion.
    ///
    /// # Errors
    ///
    /// Returns an error if the wrapped function has failed.
    fn into_eval_result(self) -> Result<Value, ErrorKind>;
}

impl<U: IntoEvalResult> IntoEvalResult for Result<U, String> {
    fn into_eval_result(self) -> Result<Value, ErrorKind> {
        self.map_err(ErrorKind::NativeCall)
            .and_then(U::into_eval_result)
    }
}

impl<U: IntoEvalResult> IntoEvalResult for Result<U, ErrorKind> {
    fn into_eval_result(self) -> Result<Value, ErrorKind> {
        self.and_then(U::into_eval_result)
    }
}

impl<U: IntoEvalResult> IntoEvalResult for Result<U, ArithmeticError> {
    fn into_eval_result(self) -> Result<Value, ErrorKind> {
        self.map_err(ErrorKind::Arithmetic)
            .and_then(U::into_eval_result)
    }
}

impl IntoEvalResult for Value {
    fn into_eval_result(self) -> Result<Value, ErrorKind> {
        Ok(self)
    }
}

impl IntoEvalResult for Scalar {
    fn into_eval_result(self) -> Result<Value, ErrorKind> {
        Ok(Value::Scalar(self))
    }
}

impl IntoEvalResult for f64 {
    fn into_eval_result(self) -> Result<Value, ErrorKind> {
        Ok(Value::real(self))
    }
}

impl IntoEvalResult for Complex64 {
    fn into_eval_result(self) -> Result<Value, ErrorKind> {
        Ok(Value::from(self))
    }
}

impl IntoEvalResult for bool {
    fn into_eval_result(self) -> Result<Value, ErrorKind> {
        Ok(Value::real(if self { 1.0 } else { 0.0 }))
    }
}

impl IntoEvalResult for usize {
    #[allow(clippy::cast_precision_loss)]
    fn into_eval_result(self) -> Result<Value, ErrorKind> {
        Ok(Value::real(self as f64))
    }
}

impl IntoEvalResult for Matrix {
    fn into_eval_result(self) -> Result<Value, ErrorKind> {
        Ok(Value::matrix(self))
    }
}

/// Wraps a function enriching it with the information about its arguments.
/// This is a slightly shorter way to create wrappers compared to calling [`FnWrapper::new()`].
///
/// See [`FnWrapper`] for more details on function requirements.
pub const fn wrap<T, F>(function: F) -> FnWrapper<T, F> {
    FnWrapper::new(function)
}

/// Wrapper of a function containing information about its arguments.
///
/// Using `FnWrapper` allows to define [functions](Function) with minimum boilerplate
/// and with increased type safety. Arguments of a wrapped function must implement
/// [`TryFromValue`], and the output type must implement [`IntoEvalResult`]. The signature
/// of the wrapper is derived from the argument types, so wrappers with different argument
/// types can be registered as overloads of the same function.
///
/// # Examples
///
/// ```
/// use mathexpr::{fns, Context, Symbols, Value};
///
/// # fn main() -> anyhow::Result<()> {
/// let context = Context::new();
/// let hypot = fns::wrap(|x: f64, y: f64| x.hypot(y));
/// context.register_function("hypot", hypot);
///
/// let value = mathexpr::evaluate(&context, "hypot(3, 4)", &Symbols::new())?;
/// assert_eq!(value, Value::real(5.0));
/// # Ok(())
/// # }
/// ```
///
/// ## Fallible function
///
/// ```
/// # use mathexpr::{fns::FnWrapper, Context, ErrorKind, Symbols};
/// fn checked_sqrt(x: f64) -> Result<f64, String> {
///     if x >= 0.0 {
///         Ok(x.sqrt())
///     } else {
///         Err("negative argument".to_owned())
///     }
/// }
///
/// let context = Context::new();
/// context.register_function("checked_sqrt", FnWrapper::new(checked_sqrt));
/// let err = mathexpr::evaluate(&context, "checked_sqrt(-1)", &Symbols::new()).unwrap_err();
/// assert!(matches!(err.kind(), ErrorKind::NativeCall(msg) if msg == "negative argument"));
/// ```
pub struct FnWrapper<T, F> {
    function: F,
    _arg_types: PhantomData<fn() -> T>,
}

impl<T, F> fmt::Debug for FnWrapper<T, F>
where
    F: fmt::Debug,
{
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("FnWrapper")
            .field("function", &self.function)
            .finish()
    }
}

impl<T, F: Clone> Clone for FnWrapper<T, F> {
    fn clone(&self) -> Self {
        Self {
            function: self.function.clone(),
            _arg_types: PhantomData,
        }
    }
}

impl<T, F: Copy> Copy for FnWrapper<T, F> {}

impl<T, F> FnWrapper<T, F> {
    /// Creates a new wrapper.
    ///
    /// Note that the created wrapper is not guaranteed to be usable as [`Function`]. For this
    /// to be the case, `function` needs to be a function or an [`Fn`] closure,
    /// and the `T` type argument needs to be a tuple with the function return type
    /// and the argument types (in this order).
    pub const fn new(function: F) -> Self {
        Self {
            function,
            _arg_types: PhantomData,
        }
    }
}

fn convert_arg<T: TryFromValue>(arg: SpannedValue, index: usize) -> Result<T, Error> {
    let span = arg.with_no_extra();
    T::try_from_value(arg.extra)
        .map_err(|err| Error::new(ErrorKind::Wrapper(err.set_arg_index(index)), span))
}

macro_rules! arity_fn {
    ($arity:tt => $($index:tt : $arg_name:ident : $t:ident),*) => {
        impl<F, Ret, $($t,)*> Function for FnWrapper<(Ret, $($t,)*), F>
        where
            F: Fn($($t,)*) -> Ret + Send + Sync,
            $($t: TryFromValue,)*
            Ret: IntoEvalResult,
        {
            fn signature(&self) -> Signature {
                let params: [ParamKind; $arity] = [$($t::param_kind(),)*];
                Signature::new(params)
            }

            fn evaluate(
                &self,
                args: Vec<SpannedValue>,
                context: &mut CallContext<'_, '_>,
            ) -> EvalResult {
                context.check_args_count(&args, Arity::Exact($arity))?;
                let args_len = args.len();
                let [$($arg_name,)*] = <[SpannedValue; $arity]>::try_from(args).map_err(|_| {
                    context.call_site_error(ErrorKind::ArgsLenMismatch {
                        name: context.name().to_owned(),
                        def: Arity::Exact($arity),
                        call: args_len,
                    })
                })?;
                $(let $arg_name = convert_arg::<$t>($arg_name, $index)?;)*

                let output = (self.function)($($arg_name,)*);
                output
                    .into_eval_result()
                    .map_err(|err| context.call_site_error(err))
            }
        }
    };
}

arity_fn!(0 =>);
arity_fn!(1 => 0: x0: T);
arity_fn!(2 => 0: x0: T, 1: x1: U);
arity_fn!(3 => 0: x0: T, 1: x1: U, 2: x2: V);
arity_fn!(4 => 0: x0: T, 1: x1: U, 2: x2: V, 3: x3: W);

/// Unary function wrapper.
pub type Unary<T> = FnWrapper<(T, T), fn(T) -> T>;

/// Binary function wrapper.
pub type Binary<T> = FnWrapper<(T, T, T), fn(T, T) -> T>;
