//! Scalar values.

use num_complex::Complex64;
use num_traits::{One, Zero};

use core::{cmp::Ordering, fmt, ops};

/// Largest argument for which the factorial fits into `f64`.
const MAX_FACTORIAL_ARG: f64 = 170.0;

/// Scalar value: either a real / complex number, or the missing sentinel.
///
/// Real arithmetic is used as long as both operands have a zero imaginary part;
/// complex arithmetic kicks in automatically otherwise, or if a real operation would leave
/// the real domain (e.g., `(-8)^(1/3)`). The missing sentinel propagates through
/// all arithmetic operations.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Scalar {
    /// Missing / empty value, e.g., the result of evaluating empty input.
    #[default]
    Missing,
    /// Number (possibly with a zero imaginary part).
    Number(Complex64),
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Self::real(value)
    }
}

impl From<Complex64> for Scalar {
    fn from(value: Complex64) -> Self {
        Self::Number(value)
    }
}

impl Scalar {
    /// Imaginary unit.
    pub const I: Self = Self::Number(Complex64::new(0.0, 1.0));

    /// Creates a real scalar.
    pub const fn real(value: f64) -> Self {
        Self::Number(Complex64::new(value, 0.0))
    }

    /// Creates a complex scalar.
    pub const fn complex(re: f64, im: f64) -> Self {
        Self::Number(Complex64::new(re, im))
    }

    /// Checks whether this is the missing sentinel.
    pub fn is_missing(self) -> bool {
        matches!(self, Self::Missing)
    }

    /// Returns the complex value of this scalar, or `None` if it's missing.
    pub fn as_complex(self) -> Option<Complex64> {
        match self {
            Self::Number(value) => Some(value),
            Self::Missing => None,
        }
    }

    /// Returns the real value of this scalar, or `None` if it's missing or has
    /// a non-zero imaginary part.
    pub fn as_real(self) -> Option<f64> {
        match self {
            Self::Number(value) if value.im == 0.0 => Some(value.re),
            _ => None,
        }
    }

    /// Real part. The missing scalar has a NaN real part.
    pub fn re(self) -> f64 {
        self.as_complex().map_or(f64::NAN, |value| value.re)
    }

    /// Imaginary part. The missing scalar has a NaN imaginary part.
    pub fn im(self) -> f64 {
        self.as_complex().map_or(f64::NAN, |value| value.im)
    }

    /// Checks whether this scalar is a finite integer.
    pub fn is_integer(self) -> bool {
        self.as_real()
            .map_or(false, |value| value.is_finite() && value.fract() == 0.0)
    }

    /// Converts this scalar into a zero-based index if it is a positive integer.
    pub(crate) fn as_one_based_index(self) -> Option<usize> {
        let value = self.as_real()?;
        if value >= 1.0 && value.fract() == 0.0 && value <= usize::MAX as f64 {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let index = value as usize - 1;
            Some(index)
        } else {
            None
        }
    }

    /// Applies a unary function to the complex value, propagating the missing sentinel.
    pub fn map(self, map_fn: impl FnOnce(Complex64) -> Complex64) -> Self {
        match self {
            Self::Number(value) => Self::Number(map_fn(value)),
            Self::Missing => Self::Missing,
        }
    }

    /// Applies a unary function using a fast real path if this scalar is real.
    pub fn map_real_or_complex(
        self,
        real_fn: impl FnOnce(f64) -> Option<f64>,
        complex_fn: impl FnOnce(Complex64) -> Complex64,
    ) -> Self {
        match self {
            Self::Number(value) if value.im == 0.0 => {
                real_fn(value.re).map_or_else(|| Self::Number(complex_fn(value)), Self::real)
            }
            Self::Number(value) => Self::Number(complex_fn(value)),
            Self::Missing => Self::Missing,
        }
    }

    fn combine(
        self,
        rhs: Self,
        real_fn: impl FnOnce(f64, f64) -> f64,
        complex_fn: impl FnOnce(Complex64, Complex64) -> Complex64,
    ) -> Self {
        match (self, rhs) {
            (Self::Number(x), Self::Number(y)) if x.im == 0.0 && y.im == 0.0 => {
                Self::real(real_fn(x.re, y.re))
            }
            (Self::Number(x), Self::Number(y)) => Self::Number(complex_fn(x, y)),
            _ => Self::Missing,
        }
    }

    /// Raises this scalar to the specified power.
    #[must_use]
    pub fn pow(self, exponent: Self) -> Self {
        match (self, exponent) {
            (Self::Number(base), Self::Number(exp)) if base.im == 0.0 && exp.im == 0.0 => {
                if base.re >= 0.0 || exp.re.fract() == 0.0 || !exp.re.is_finite() {
                    Self::real(base.re.powf(exp.re))
                } else {
                    Self::Number(base.powc(exp))
                }
            }
            (Self::Number(base), Self::Number(exp)) => {
                if base.is_zero() {
                    Self::Number(Complex64::zero())
                } else {
                    Self::Number(base.powc(exp))
                }
            }
            _ => Self::Missing,
        }
    }

    /// Complex conjugate.
    #[must_use]
    pub fn conj(self) -> Self {
        self.map(|value| value.conj())
    }

    /// Factorial. Defined for non-negative integers; other values produce NaN.
    #[must_use]
    pub fn factorial(self) -> Self {
        let Some(value) = self.as_real() else {
            return if self.is_missing() {
                Self::Missing
            } else {
                Self::real(f64::NAN)
            };
        };
        if value < 0.0 || value.fract() != 0.0 {
            Self::real(f64::NAN)
        } else if value > MAX_FACTORIAL_ARG {
            Self::real(f64::INFINITY)
        } else {
            let mut product = 1.0;
            let mut factor = 2.0;
            while factor <= value {
                product *= factor;
                factor += 1.0;
            }
            Self::real(product)
        }
    }

    /// Compares real parts of the scalars. Returns `None` if any scalar is missing or NaN.
    pub fn partial_cmp_real(self, other: Self) -> Option<Ordering> {
        let (x, y) = (self.as_complex()?, other.as_complex()?);
        x.re.partial_cmp(&y.re)
    }

    pub(crate) fn one() -> Self {
        Self::Number(Complex64::one())
    }

    pub(crate) fn zero() -> Self {
        Self::Number(Complex64::zero())
    }
}

impl ops::Add for Scalar {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.combine(rhs, |x, y| x + y, |x, y| x + y)
    }
}

impl ops::Sub for Scalar {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self.combine(rhs, |x, y| x - y, |x, y| x - y)
    }
}

impl ops::Mul for Scalar {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        self.combine(rhs, |x, y| x * y, |x, y| x * y)
    }
}

impl ops::Div for Scalar {
    type Output = Self;

    fn div(self, rhs: Self) -> Self {
        self.combine(rhs, |x, y| x / y, |x, y| x / y)
    }
}

impl ops::Neg for Scalar {
    type Output = Self;

    fn neg(self) -> Self {
        self.map(|value| -value)
    }
}

fn fmt_real(value: f64, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
    if value.is_nan() {
        formatter.write_str("nan")
    } else if value.is_infinite() {
        formatter.write_str(if value > 0.0 { "inf" } else { "-inf" })
    } else {
        write!(formatter, "{value}")
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Self::Missing => return formatter.write_str("missing"),
            Self::Number(value) => *value,
        };

        if value.im == 0.0 {
            fmt_real(value.re, formatter)
        } else if value.re == 0.0 {
            fmt_real(value.im, formatter)?;
            formatter.write_str("i")
        } else {
            fmt_real(value.re, formatter)?;
            if value.im >= 0.0 || value.im.is_nan() {
                formatter.write_str("+")?;
            }
            fmt_real(value.im, formatter)?;
            formatter.write_str("i")
        }
    }
}
