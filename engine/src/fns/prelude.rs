//! Standard functions and constants.

use num_complex::Complex64;

use core::cmp::Ordering;

use super::{wrap, CallContext, FromValueError, Function, ParamKind, Signature, SpannedValue};
use crate::{
    error::{ArithmeticError, Error, ErrorKind, EvalResult},
    extension::{Extension, Plugin},
    values::{Matrix, Scalar, Value},
};

/// Function applying a scalar function to a scalar or to each element of a matrix.
/// The missing sentinel is passed to the function as is.
///
/// # Examples
///
/// ```
/// use mathexpr::{fns::Elementwise, Context, Scalar, Symbols, Value};
///
/// # fn main() -> anyhow::Result<()> {
/// let context = Context::new();
/// let double = Elementwise::new(|x: Scalar| x + x);
/// context.register_function("double", double);
///
/// let value = mathexpr::evaluate(&context, "double([1, 2])", &Symbols::new())?;
/// assert_eq!(value.dims(), Some((1, 2)));
/// assert_eq!(value.into_matrix().unwrap().get(0, 1), Some(Scalar::real(4.0)));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Elementwise<F> {
    function: F,
}

impl<F> Elementwise<F>
where
    F: Fn(Scalar) -> Scalar + Send + Sync,
{
    /// Creates an element-wise function.
    pub const fn new(function: F) -> Self {
        Self { function }
    }
}

impl<F> Function for Elementwise<F>
where
    F: Fn(Scalar) -> Scalar + Send + Sync,
{
    fn signature(&self) -> Signature {
        Signature::new([ParamKind::Numeric])
    }

    fn evaluate(&self, mut args: Vec<SpannedValue>, context: &mut CallContext<'_, '_>) -> EvalResult {
        context.check_args_count(&args, 1_usize)?;
        let arg = args.pop().ok_or_else(|| {
            context.call_site_error(ErrorKind::native("missing argument"))
        })?;
        let span = arg.with_no_extra();

        match arg.extra {
            Value::Scalar(scalar) => Ok(Value::Scalar((self.function)(scalar))),
            Value::Matrix(matrix) => Ok(Value::matrix(matrix.map(&self.function))),
            value @ Value::Opaque(_) => {
                let err = FromValueError::invalid_type(ParamKind::Numeric, &value);
                Err(Error::new(ErrorKind::Wrapper(err), span))
            }
        }
    }
}

/// Function on a numeric value viewed as a matrix. Scalars are treated as `1×1` matrices.
struct MatrixFn<F> {
    function: F,
}

impl<F> MatrixFn<F>
where
    F: Fn(Matrix) -> Value + Send + Sync,
{
    const fn new(function: F) -> Self {
        Self { function }
    }
}

impl<F> Function for MatrixFn<F>
where
    F: Fn(Matrix) -> Value + Send + Sync,
{
    fn signature(&self) -> Signature {
        Signature::new([ParamKind::Numeric])
    }

    fn evaluate(&self, mut args: Vec<SpannedValue>, context: &mut CallContext<'_, '_>) -> EvalResult {
        context.check_args_count(&args, 1_usize)?;
        let arg = args.pop().ok_or_else(|| {
            context.call_site_error(ErrorKind::native("missing argument"))
        })?;
        let span = arg.with_no_extra();

        let value = arg.extra;
        if let Value::Opaque(_) = &value {
            let err = FromValueError::invalid_type(ParamKind::Numeric, &value);
            return Err(Error::new(ErrorKind::Wrapper(err), span));
        }
        let matrix = value.into_matrix().unwrap_or_default();
        Ok((self.function)(matrix))
    }
}

fn real_fn(
    real: fn(f64) -> f64,
    complex: fn(Complex64) -> Complex64,
) -> Elementwise<impl Fn(Scalar) -> Scalar + Send + Sync> {
    Elementwise::new(move |x: Scalar| x.map_real_or_complex(|x| Some(real(x)), complex))
}

/// Function with a real path restricted to `domain`; the complex path is taken outside it.
fn domain_fn(
    domain: fn(f64) -> bool,
    real: fn(f64) -> f64,
    complex: fn(Complex64) -> Complex64,
) -> Elementwise<impl Fn(Scalar) -> Scalar + Send + Sync> {
    Elementwise::new(move |x: Scalar| {
        x.map_real_or_complex(|x| domain(x).then(|| real(x)), complex)
    })
}

fn non_negative(x: f64) -> bool {
    x >= 0.0
}

fn unit_interval(x: f64) -> bool {
    (-1.0..=1.0).contains(&x)
}

fn ln(x: Scalar) -> Scalar {
    x.map_real_or_complex(|x| non_negative(x).then(|| x.ln()), Complex64::ln)
}

fn round_parts(x: Scalar, round: fn(f64) -> f64) -> Scalar {
    x.map(|z| Complex64::new(round(z.re), round(z.im)))
}

fn sign(x: Scalar) -> Scalar {
    x.map_real_or_complex(
        |x| {
            Some(if x == 0.0 || x.is_nan() {
                x
            } else {
                x.signum()
            })
        },
        |z| if z.norm() == 0.0 { z } else { z / z.norm() },
    )
}

fn abs(x: Scalar) -> Scalar {
    x.map_real_or_complex(|x| Some(x.abs()), |z| Complex64::new(z.norm(), 0.0))
}

fn flag(condition: bool) -> Scalar {
    Scalar::real(if condition { 1.0 } else { 0.0 })
}

#[allow(clippy::cast_precision_loss)] // dimensions are way below 2^52
fn count(value: usize) -> Scalar {
    Scalar::real(value as f64)
}

/// Reduces vectors to a scalar and matrices to a row of per-column results.
fn reduce(matrix: &Matrix, reduce_fn: fn(Vec<Scalar>) -> Scalar) -> Value {
    if matrix.rows() == 1 || matrix.cols() == 1 || matrix.is_empty() {
        return Value::Scalar(reduce_fn(matrix.iter().collect()));
    }
    let columns = (0..matrix.cols()).map(|col| {
        let column = (0..matrix.rows())
            .filter_map(|row| matrix.get(row, col))
            .collect();
        reduce_fn(column)
    });
    Value::matrix(columns.collect())
}

fn sum(values: Vec<Scalar>) -> Scalar {
    values.into_iter().fold(Scalar::zero(), |acc, x| acc + x)
}

fn prod(values: Vec<Scalar>) -> Scalar {
    values.into_iter().fold(Scalar::one(), |acc, x| acc * x)
}

fn mean(values: Vec<Scalar>) -> Scalar {
    if values.is_empty() {
        return Scalar::real(f64::NAN);
    }
    let len = count(values.len());
    sum(values) / len
}

/// Selects the element with the extreme real part. Missing and NaN elements are skipped.
fn extremum(values: Vec<Scalar>, wanted: Ordering) -> Scalar {
    values
        .into_iter()
        .filter(|x| !x.is_missing() && !x.re().is_nan())
        .reduce(|acc, x| {
            if x.partial_cmp_real(acc) == Some(wanted) {
                x
            } else {
                acc
            }
        })
        .unwrap_or(Scalar::Missing)
}

fn min(values: Vec<Scalar>) -> Scalar {
    extremum(values, Ordering::Less)
}

fn max(values: Vec<Scalar>) -> Scalar {
    extremum(values, Ordering::Greater)
}

fn min2(x: Scalar, y: Scalar) -> Scalar {
    min(vec![x, y])
}

fn max2(x: Scalar, y: Scalar) -> Scalar {
    max(vec![x, y])
}

fn filled(rows: usize, cols: usize, value: Scalar) -> Result<Matrix, ArithmeticError> {
    Matrix::filled(rows, cols, value)
}

fn eye(rows: usize, cols: usize) -> Result<Matrix, ArithmeticError> {
    Matrix::from_fn(rows, cols, |row, col| flag(row == col))
}

/// Standard functions and constants loaded by [`Context::with_prelude()`].
///
/// [`Context::with_prelude()`]: crate::Context::with_prelude()
///
/// # Functions
///
/// - Element-wise math: `sin`, `cos`, `tan`, `asin`, `acos`, `atan`, `sinh`, `cosh`, `tanh`,
///   `exp`, `ln`, `log` (natural or with the base as the second arg), `log10`, `sqrt`.
///   Functions switch to complex results outside their real domain, e.g., `sqrt(-4) == 2i`.
/// - Complex helpers: `abs`, `arg`, `real`, `imag`, `conj`, `sign`.
/// - Rounding: `floor`, `ceil`, `round`. Real and imaginary parts are rounded separately.
/// - Shape: `size`, `rows`, `cols`, `numel`, `transpose`.
/// - Reductions: `sum`, `prod`, `mean`, `min`, `max`. Vectors reduce to a scalar, matrices
///   to a row of per-column results. `min` and `max` have two-scalar overloads as well.
/// - Constructors: `zeros`, `ones`, `eye` taking a size or rows and columns.
/// - `isint`: checks whether elements are integer, returning `1` or `0`.
///
/// # Constants
///
/// `pi`, `e`, `i`, `j` (imaginary unit), `inf`, `nan`, `phi` (golden ratio).
#[derive(Debug, Clone, Copy, Default)]
pub struct Prelude;

impl Prelude {
    fn constants() -> Vec<Extension> {
        let phi = (1.0 + 5.0_f64.sqrt()) / 2.0;
        [
            ("pi", Value::real(core::f64::consts::PI)),
            ("e", Value::real(core::f64::consts::E)),
            ("i", Value::complex(0.0, 1.0)),
            ("j", Value::complex(0.0, 1.0)),
            ("inf", Value::real(f64::INFINITY)),
            ("nan", Value::real(f64::NAN)),
            ("phi", Value::real(phi)),
        ]
        .into_iter()
        .map(|(name, value)| Extension::constant(name, value))
        .collect()
    }

    fn math_functions() -> Vec<Extension> {
        vec![
            Extension::function("sin", real_fn(f64::sin, Complex64::sin)),
            Extension::function("cos", real_fn(f64::cos, Complex64::cos)),
            Extension::function("tan", real_fn(f64::tan, Complex64::tan)),
            Extension::function("asin", domain_fn(unit_interval, f64::asin, Complex64::asin)),
            Extension::function("acos", domain_fn(unit_interval, f64::acos, Complex64::acos)),
            Extension::function("atan", real_fn(f64::atan, Complex64::atan)),
            Extension::function("sinh", real_fn(f64::sinh, Complex64::sinh)),
            Extension::function("cosh", real_fn(f64::cosh, Complex64::cosh)),
            Extension::function("tanh", real_fn(f64::tanh, Complex64::tanh)),
            Extension::function("exp", real_fn(f64::exp, Complex64::exp)),
            Extension::function("ln", Elementwise::new(ln)),
            Extension::function("log", Elementwise::new(ln)),
            Extension::overload("log", wrap(|x: Scalar, base: Scalar| ln(x) / ln(base))),
            Extension::function(
                "log10",
                domain_fn(non_negative, f64::log10, Complex64::log10),
            ),
            Extension::function(
                "sqrt",
                domain_fn(non_negative, f64::sqrt, Complex64::sqrt),
            ),
        ]
    }

    fn complex_functions() -> Vec<Extension> {
        vec![
            Extension::function("abs", Elementwise::new(abs)),
            Extension::function(
                "arg",
                Elementwise::new(|x: Scalar| {
                    x.map_real_or_complex(|x| Some(0.0_f64.atan2(x)), |z| Complex64::new(z.arg(), 0.0))
                }),
            ),
            Extension::function("real", Elementwise::new(|x: Scalar| x.map(|z| z.re.into()))),
            Extension::function("imag", Elementwise::new(|x: Scalar| x.map(|z| z.im.into()))),
            Extension::function("conj", Elementwise::new(Scalar::conj)),
            Extension::function("sign", Elementwise::new(sign)),
            Extension::function("floor", Elementwise::new(|x: Scalar| round_parts(x, f64::floor))),
            Extension::function("ceil", Elementwise::new(|x: Scalar| round_parts(x, f64::ceil))),
            Extension::function("round", Elementwise::new(|x: Scalar| round_parts(x, f64::round))),
            Extension::function(
                "isint",
                Elementwise::new(|x: Scalar| flag(x.is_integer())),
            ),
        ]
    }

    fn matrix_functions() -> Vec<Extension> {
        vec![
            Extension::function(
                "size",
                MatrixFn::new(|x: Matrix| {
                    let (rows, cols) = x.dims();
                    Value::matrix(Matrix::row_vector(vec![count(rows), count(cols)]))
                }),
            ),
            Extension::function("rows", MatrixFn::new(|x: Matrix| count(x.rows()).into())),
            Extension::function("cols", MatrixFn::new(|x: Matrix| count(x.cols()).into())),
            Extension::function("numel", MatrixFn::new(|x: Matrix| count(x.len()).into())),
            Extension::function("transpose", MatrixFn::new(|x: Matrix| x.transpose().into())),
            Extension::function("sum", MatrixFn::new(|x: Matrix| reduce(&x, sum))),
            Extension::function("prod", MatrixFn::new(|x: Matrix| reduce(&x, prod))),
            Extension::function("mean", MatrixFn::new(|x: Matrix| reduce(&x, mean))),
            Extension::function("min", MatrixFn::new(|x: Matrix| reduce(&x, min))),
            Extension::overload("min", wrap(min2)),
            Extension::function("max", MatrixFn::new(|x: Matrix| reduce(&x, max))),
            Extension::overload("max", wrap(max2)),
            Extension::function("zeros", wrap(|n: usize| filled(n, n, Scalar::zero()))),
            Extension::overload(
                "zeros",
                wrap(|rows: usize, cols: usize| filled(rows, cols, Scalar::zero())),
            ),
            Extension::function("ones", wrap(|n: usize| filled(n, n, Scalar::one()))),
            Extension::overload(
                "ones",
                wrap(|rows: usize, cols: usize| filled(rows, cols, Scalar::one())),
            ),
            Extension::function("eye", wrap(|n: usize| eye(n, n))),
            Extension::overload("eye", wrap(eye)),
        ]
    }
}

impl Plugin for Prelude {
    fn name(&self) -> &str {
        "prelude"
    }

    fn extensions(&self) -> Vec<Extension> {
        let mut extensions = Self::constants();
        extensions.extend(Self::math_functions());
        extensions.extend(Self::complex_functions());
        extensions.extend(Self::matrix_functions());
        extensions
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::{Context, Symbols};

    fn eval(input: &str) -> Value {
        let context = Context::with_prelude();
        crate::evaluate(&context, input, &Symbols::new()).unwrap()
    }

    fn assert_close(value: &Value, expected: Complex64) {
        let actual = value.as_scalar().and_then(Scalar::as_complex).unwrap();
        assert!((actual - expected).norm() < 1e-9, "{actual} != {expected}");
    }

    #[test]
    fn real_functions_stay_real() {
        assert_close(&eval("sin(pi / 2)"), Complex64::new(1.0, 0.0));
        assert_close(&eval("exp(0)"), Complex64::new(1.0, 0.0));
        assert_close(&eval("log(8, 2)"), Complex64::new(3.0, 0.0));
        assert_close(&eval("log10(1000)"), Complex64::new(3.0, 0.0));
        assert_eq!(eval("sqrt(16)"), Value::real(4.0));
    }

    #[test]
    fn functions_switch_to_complex_outside_domain() {
        assert_close(&eval("sqrt(-4)"), Complex64::new(0.0, 2.0));
        assert_close(&eval("ln(-1)"), Complex64::new(0.0, core::f64::consts::PI));
        let acos = eval("acos(2)");
        assert!(acos.as_scalar().unwrap().im() != 0.0);
    }

    #[test]
    fn complex_helpers() {
        assert_eq!(eval("abs(3 + 4i)"), Value::real(5.0));
        assert_eq!(eval("real(3 + 4i)"), Value::real(3.0));
        assert_eq!(eval("imag(3 + 4i)"), Value::real(4.0));
        assert_eq!(eval("conj(3 + 4i)"), Value::complex(3.0, -4.0));
        assert_eq!(eval("sign(-2)"), Value::real(-1.0));
        assert_eq!(eval("sign(0)"), Value::real(0.0));
        assert_close(&eval("arg(-1)"), Complex64::new(core::f64::consts::PI, 0.0));
        assert_eq!(eval("round(2.5 - 1.4i)"), Value::complex(3.0, -1.0));
    }

    #[test]
    fn elementwise_functions_map_matrices() {
        let value = eval("abs([-1, 2; -3, 4])");
        let matrix = value.into_matrix().unwrap();
        let elements: Vec<_> = matrix.iter().map(Scalar::re).collect();
        assert_eq!(elements, [1.0, 2.0, 3.0, 4.0]);

        assert_eq!(eval("isint([1, 1.5])").dims(), Some((1, 2)));
    }

    #[test]
    fn reductions() {
        assert_eq!(eval("sum([1, 2, 3])"), Value::real(6.0));
        assert_eq!(eval("prod([1; 2; 3; 4])"), Value::real(24.0));
        assert_eq!(eval("mean([1, 2, 3, 6])"), Value::real(3.0));
        assert_eq!(eval("min([3, -1, 2])"), Value::real(-1.0));
        assert_eq!(eval("max(3, 7)"), Value::real(7.0));
        assert_eq!(eval("sum([])"), Value::real(0.0));
        assert!(eval("max([])").is_missing());

        let column_sums = eval("sum([1, 2; 3, 4])").into_matrix().unwrap();
        let sums: Vec<_> = column_sums.iter().map(Scalar::re).collect();
        assert_eq!(sums, [4.0, 6.0]);
    }

    #[test]
    fn shape_functions() {
        let size = eval("size([1, 2, 3; 4, 5, 6])").into_matrix().unwrap();
        let dims: Vec<_> = size.iter().map(Scalar::re).collect();
        assert_eq!(dims, [2.0, 3.0]);
        assert_eq!(eval("rows(5)"), Value::real(1.0));
        assert_eq!(eval("numel(zeros(2, 3))"), Value::real(6.0));
        assert_eq!(eval("transpose([1, 2])").dims(), Some((2, 1)));
    }

    #[test]
    fn constructors() {
        assert_eq!(eval("eye(2)"), eval("[1, 0; 0, 1]"));
        assert_eq!(eval("ones(1, 2)"), eval("[1, 1]"));
        assert_eq!(eval("zeros(1)"), Value::real(0.0));
        assert_eq!(eval("zeros(0)").dims(), Some((0, 0)));
    }

    #[test]
    fn oversized_constructors() {
        let context = Context::with_prelude();
        let inputs = [
            "zeros(4e9, 4e9)",
            "ones(70000)",
            "eye(1, 4294967295)",
            "zeros(2^32 - 1, 2)",
        ];
        for input in inputs {
            let err = crate::evaluate(&context, input, &Symbols::new()).unwrap_err();
            assert_matches!(
                err.kind(),
                ErrorKind::Arithmetic(ArithmeticError::TooManyElements { .. }),
                "{input}"
            );
        }
    }

    #[test]
    fn constants() {
        assert_eq!(eval("i"), Value::complex(0.0, 1.0));
        assert_eq!(eval("j * j"), Value::real(-1.0));
        assert!(eval("nan").as_real().unwrap().is_nan());
        assert_close(&eval("phi^2 - phi"), Complex64::new(1.0, 0.0));
    }

    #[test]
    fn invalid_arguments() {
        let context = Context::with_prelude();
        let err = crate::evaluate(&context, "zeros(-1)", &Symbols::new()).unwrap_err();
        assert_matches!(err.kind(), ErrorKind::Wrapper(_));
        assert_eq!(err.location().range(), 6..8);

        let err = crate::evaluate(&context, "sin(1, 2)", &Symbols::new()).unwrap_err();
        assert_matches!(err.kind(), ErrorKind::ArgsLenMismatch { call: 2, .. });
    }
}
