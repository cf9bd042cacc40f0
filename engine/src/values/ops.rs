//! Operations on `Value`s.

use core::{cmp::Ordering, fmt};

use super::{Matrix, Scalar, Value, ValueType};
use crate::error::ArithmeticError;

/// Unary operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum UnaryOp {
    /// Negation (`-`).
    Neg,
    /// Transposition (`.'`).
    Transpose,
    /// Conjugate transposition (`'`).
    ConjTranspose,
    /// Factorial (`!`).
    Factorial,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Neg => "negation",
            Self::Transpose => "transposition",
            Self::ConjTranspose => "conjugate transposition",
            Self::Factorial => "factorial",
        })
    }
}

/// Binary operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum BinaryOp {
    /// Addition (`+`).
    Add,
    /// Subtraction (`-`).
    Sub,
    /// Multiplication (`*`); matrix product for two matrices.
    Mul,
    /// Division (`/`).
    Div,
    /// Power (`^`); matrix power for a square matrix and an integer exponent.
    Pow,
    /// Element-wise multiplication (`.*`).
    ElemMul,
    /// Element-wise division (`./`).
    ElemDiv,
    /// Element-wise power (`.^`).
    ElemPow,
    /// Equality (`==`).
    Eq,
    /// Non-equality (`~=` or `!=`).
    NotEq,
    /// "Greater than" comparison.
    Gt,
    /// "Lesser than" comparison.
    Lt,
    /// "Greater or equal" comparison.
    Ge,
    /// "Lesser or equal" comparison.
    Le,
    /// Range (`:`).
    Range,
    /// Horizontal concatenation (`,` in matrix literals).
    HorizontalConcat,
    /// Vertical concatenation (`;` in matrix literals).
    VerticalConcat,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Add => "addition",
            Self::Sub => "subtraction",
            Self::Mul => "multiplication",
            Self::Div => "division",
            Self::Pow => "exponentiation",
            Self::ElemMul => "element-wise multiplication",
            Self::ElemDiv => "element-wise division",
            Self::ElemPow => "element-wise exponentiation",
            Self::Eq => "equality comparison",
            Self::NotEq => "non-equality comparison",
            Self::Gt => "greater comparison",
            Self::Lt => "lesser comparison",
            Self::Ge => "greater-or-equal comparison",
            Self::Le => "lesser-or-equal comparison",
            Self::Range => "range",
            Self::HorizontalConcat => "horizontal concatenation",
            Self::VerticalConcat => "vertical concatenation",
        })
    }
}

impl BinaryOp {
    /// Checks if this operation is a comparison.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::NotEq | Self::Gt | Self::Lt | Self::Le | Self::Ge
        )
    }

    fn scalar_fn(self) -> fn(Scalar, Scalar) -> Scalar {
        match self {
            Self::Add => |x, y| x + y,
            Self::Sub => |x, y| x - y,
            Self::Mul | Self::ElemMul => |x, y| x * y,
            Self::Div | Self::ElemDiv => |x, y| x / y,
            Self::Pow | Self::ElemPow => Scalar::pow,
            Self::Eq => |x, y| compare(x, y, |_| x == y),
            Self::NotEq => |x, y| compare(x, y, |_| x != y),
            Self::Gt => |x, y| compare(x, y, |ord| ord == Some(Ordering::Greater)),
            Self::Lt => |x, y| compare(x, y, |ord| ord == Some(Ordering::Less)),
            Self::Ge => |x, y| {
                compare(x, y, |ord| {
                    matches!(ord, Some(Ordering::Greater | Ordering::Equal))
                })
            },
            Self::Le => |x, y| {
                compare(x, y, |ord| matches!(ord, Some(Ordering::Less | Ordering::Equal)))
            },
            // Not element-wise; handled separately.
            Self::Range | Self::HorizontalConcat | Self::VerticalConcat => |_, _| Scalar::Missing,
        }
    }
}

fn compare(x: Scalar, y: Scalar, predicate: impl FnOnce(Option<Ordering>) -> bool) -> Scalar {
    if x.is_missing() || y.is_missing() {
        Scalar::Missing
    } else if predicate(x.partial_cmp_real(y)) {
        Scalar::real(1.0)
    } else {
        Scalar::real(0.0)
    }
}

/// Generic operation, either unary or binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Op {
    /// Unary operation.
    Unary(UnaryOp),
    /// Binary operation.
    Binary(BinaryOp),
}

impl fmt::Display for Op {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unary(inner) => fmt::Display::fmt(inner, formatter),
            Self::Binary(inner) => fmt::Display::fmt(inner, formatter),
        }
    }
}

impl From<UnaryOp> for Op {
    fn from(value: UnaryOp) -> Self {
        Self::Unary(value)
    }
}

impl From<BinaryOp> for Op {
    fn from(value: BinaryOp) -> Self {
        Self::Binary(value)
    }
}

/// Arithmetic operand: a value with `1×1` matrices collapsed to scalars.
#[derive(Debug)]
enum Operand {
    Scalar(Scalar),
    Matrix(Matrix),
}

impl Operand {
    fn new(value: Value, op: Op) -> Result<Self, ArithmeticError> {
        match value {
            Value::Scalar(scalar) => Ok(Self::Scalar(scalar)),
            Value::Matrix(matrix) => Ok(match matrix.as_scalar() {
                Some(scalar) => Self::Scalar(scalar),
                None => Self::Matrix(matrix),
            }),
            Value::Opaque(_) => Err(ArithmeticError::UnsupportedOperand {
                op,
                operand: ValueType::Opaque,
            }),
        }
    }

    fn into_matrix(self) -> Matrix {
        match self {
            Self::Scalar(scalar) => Matrix::row_vector(vec![scalar]),
            Self::Matrix(matrix) => matrix,
        }
    }
}

fn elementwise(
    op: BinaryOp,
    lhs: Operand,
    rhs: Operand,
    scalar_fn: fn(Scalar, Scalar) -> Scalar,
) -> Result<Value, ArithmeticError> {
    Ok(match (lhs, rhs) {
        (Operand::Scalar(x), Operand::Scalar(y)) => Value::Scalar(scalar_fn(x, y)),
        (Operand::Scalar(x), Operand::Matrix(ys)) => Value::matrix(ys.map(|y| scalar_fn(x, y))),
        (Operand::Matrix(xs), Operand::Scalar(y)) => Value::matrix(xs.map(|x| scalar_fn(x, y))),
        (Operand::Matrix(xs), Operand::Matrix(ys)) => {
            Value::matrix(xs.zip_map(&ys, op, scalar_fn)?)
        }
    })
}

#[allow(
    clippy::float_cmp,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn range(start: Scalar, end: Scalar) -> Result<Value, ArithmeticError> {
    let unsupported = ArithmeticError::UnsupportedOperand {
        op: Op::Binary(BinaryOp::Range),
        operand: ValueType::Scalar,
    };
    if start.is_missing() || end.is_missing() {
        return Ok(Value::missing());
    }
    let (Some(start), Some(end)) = (start.as_real(), end.as_real()) else {
        return Err(unsupported);
    };
    if !start.is_finite() || !end.is_finite() {
        return Err(unsupported);
    }

    if end < start {
        return Ok(Value::matrix(Matrix::default()));
    }
    if start + 1.0 == start || end + 1.0 == end {
        return Err(ArithmeticError::ImpreciseRange);
    }

    let requested = (end - start).floor() + 1.0;
    if requested > Matrix::MAX_ELEMENTS as f64 {
        return Err(ArithmeticError::TooManyElements { requested });
    }
    let len = requested as usize;
    let elements = (0..len).map(|k| Scalar::real(start + k as f64)).collect();
    Ok(Value::matrix(Matrix::row_vector(elements)))
}

impl Value {
    /// Performs a binary operation on this value and `rhs`.
    ///
    /// # Errors
    ///
    /// Returns an error if the operands have incompatible types or dimensions.
    pub fn binary_op(self, op: BinaryOp, rhs: Self) -> Result<Self, ArithmeticError> {
        let lhs = Operand::new(self, op.into())?;
        let rhs = Operand::new(rhs, op.into())?;

        match op {
            BinaryOp::Mul => match (lhs, rhs) {
                (Operand::Matrix(xs), Operand::Matrix(ys)) => Ok(Value::matrix(xs.matmul(&ys)?)),
                (lhs, rhs) => elementwise(op, lhs, rhs, op.scalar_fn()),
            },

            BinaryOp::Pow => match (lhs, rhs) {
                (Operand::Matrix(xs), Operand::Scalar(exp)) => {
                    let exp = exp
                        .as_real()
                        .filter(|&exp| exp >= 0.0 && exp.fract() == 0.0 && exp <= u32::MAX.into())
                        .ok_or(ArithmeticError::InvalidExponent)?;
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    let exp = exp as u64;
                    Ok(Value::matrix(xs.powi(exp)?))
                }
                (Operand::Scalar(x), Operand::Scalar(y)) => Ok(Value::Scalar(x.pow(y))),
                (_, Operand::Matrix(_)) => Err(ArithmeticError::UnsupportedOperand {
                    op: op.into(),
                    operand: ValueType::Matrix,
                }),
            },

            BinaryOp::Range => match (lhs, rhs) {
                (Operand::Scalar(start), Operand::Scalar(end)) => range(start, end),
                _ => Err(ArithmeticError::UnsupportedOperand {
                    op: op.into(),
                    operand: ValueType::Matrix,
                }),
            },

            BinaryOp::HorizontalConcat => {
                Ok(Value::matrix(lhs.into_matrix().hcat(&rhs.into_matrix())?))
            }
            BinaryOp::VerticalConcat => {
                Ok(Value::matrix(lhs.into_matrix().vcat(&rhs.into_matrix())?))
            }

            _ => elementwise(op, lhs, rhs, op.scalar_fn()),
        }
    }

    /// Performs a unary operation on this value.
    ///
    /// # Errors
    ///
    /// Returns an error if the operand is opaque.
    pub fn unary_op(self, op: UnaryOp) -> Result<Self, ArithmeticError> {
        let operand = Operand::new(self, op.into())?;
        Ok(match (op, operand) {
            (UnaryOp::Neg, Operand::Scalar(x)) => Value::Scalar(-x),
            (UnaryOp::Neg, Operand::Matrix(xs)) => Value::matrix(xs.map(|x| -x)),
            (UnaryOp::Transpose, Operand::Scalar(x)) => Value::Scalar(x),
            (UnaryOp::Transpose, Operand::Matrix(xs)) => Value::matrix(xs.transpose()),
            (UnaryOp::ConjTranspose, Operand::Scalar(x)) => Value::Scalar(x.conj()),
            (UnaryOp::ConjTranspose, Operand::Matrix(xs)) => Value::matrix(xs.conj_transpose()),
            (UnaryOp::Factorial, Operand::Scalar(x)) => Value::Scalar(x.factorial()),
            (UnaryOp::Factorial, Operand::Matrix(xs)) => Value::matrix(xs.map(Scalar::factorial)),
        })
    }
}
