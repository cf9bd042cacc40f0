//! Dense matrices of scalars.

use core::fmt;

use super::{BinaryOp, Op, Scalar};
use crate::error::ArithmeticError;

/// Rectangular grid of [`Scalar`]s stored in the row-major order.
///
/// A `1×1` matrix is interchangeable with a scalar for arithmetic purposes;
/// see [`Value`](crate::Value) for how operations are dispatched.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "MatrixParts"))]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<Scalar>,
}

/// Deserialized matrix parts that are yet to be checked for consistency.
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct MatrixParts {
    rows: usize,
    cols: usize,
    data: Vec<Scalar>,
}

#[cfg(feature = "serde")]
impl TryFrom<MatrixParts> for Matrix {
    type Error = &'static str;

    fn try_from(parts: MatrixParts) -> Result<Self, Self::Error> {
        Self::new(parts.rows, parts.cols, parts.data)
            .ok_or("matrix dimensions do not match the number of elements")
    }
}

impl Matrix {
    /// Creates a matrix from the row-major `data`. Returns `None` if the data length
    /// does not correspond to the dimensions.
    pub fn new(rows: usize, cols: usize, data: Vec<Scalar>) -> Option<Self> {
        if rows.checked_mul(cols)? == data.len() {
            Some(Self::new_unchecked(rows, cols, data))
        } else {
            None
        }
    }

    fn new_unchecked(rows: usize, cols: usize, data: Vec<Scalar>) -> Self {
        debug_assert_eq!(rows * cols, data.len());
        if data.is_empty() {
            Self::default()
        } else {
            Self { rows, cols, data }
        }
    }

    /// Creates a `1×n` matrix.
    pub fn row_vector(data: Vec<Scalar>) -> Self {
        let cols = data.len();
        Self::new_unchecked(1, cols, data)
    }

    /// Creates an `n×1` matrix.
    pub fn column_vector(data: Vec<Scalar>) -> Self {
        let rows = data.len();
        Self::new_unchecked(rows, 1, data)
    }

    /// Creates a matrix from nested rows. Returns a dimension error if the rows have
    /// different lengths.
    pub fn from_rows<I, R>(rows: I) -> Result<Self, ArithmeticError>
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = Scalar>,
    {
        let mut result = Self::default();
        for row in rows {
            let row = Self::row_vector(row.into_iter().collect());
            result = result.vcat(&row)?;
        }
        Ok(result)
    }

    /// Maximum number of elements in a matrix created by the interpreter.
    pub const MAX_ELEMENTS: usize = 1 << 22;

    /// Checks that a `rows×cols` matrix fits into [`Self::MAX_ELEMENTS`] and returns
    /// its number of elements.
    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn checked_len(rows: usize, cols: usize) -> Result<usize, ArithmeticError> {
        match rows.checked_mul(cols) {
            Some(len) if len <= Self::MAX_ELEMENTS => Ok(len),
            _ => Err(ArithmeticError::TooManyElements {
                requested: rows as f64 * cols as f64,
            }),
        }
    }

    /// Creates a matrix with all elements set to `value`.
    ///
    /// # Errors
    ///
    /// Returns [`ArithmeticError::TooManyElements`] if the matrix is too large.
    pub fn filled(rows: usize, cols: usize, value: Scalar) -> Result<Self, ArithmeticError> {
        let len = Self::checked_len(rows, cols)?;
        Ok(Self::new_unchecked(rows, cols, vec![value; len]))
    }

    /// Creates an identity matrix.
    ///
    /// # Errors
    ///
    /// Returns [`ArithmeticError::TooManyElements`] if the matrix is too large.
    pub fn identity(size: usize) -> Result<Self, ArithmeticError> {
        Self::from_fn(size, size, |row, col| {
            if row == col {
                Scalar::one()
            } else {
                Scalar::zero()
            }
        })
    }

    /// Creates a matrix by calling `element_fn(row, col)` for each element.
    ///
    /// # Errors
    ///
    /// Returns [`ArithmeticError::TooManyElements`] if the matrix is too large.
    pub fn from_fn(
        rows: usize,
        cols: usize,
        element_fn: impl FnMut(usize, usize) -> Scalar,
    ) -> Result<Self, ArithmeticError> {
        Self::checked_len(rows, cols)?;
        Ok(Self::generate(rows, cols, element_fn))
    }

    /// Same as `from_fn`, but for dimensions known to be within limits.
    fn generate(
        rows: usize,
        cols: usize,
        mut element_fn: impl FnMut(usize, usize) -> Scalar,
    ) -> Self {
        let data = (0..rows * cols)
            .map(|i| element_fn(i / cols, i % cols))
            .collect();
        Self::new_unchecked(rows, cols, data)
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Dimensions as `(rows, cols)`.
    pub fn dims(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Checks whether this matrix has no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Checks whether this matrix is square.
    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    /// Gets an element by zero-based row and column.
    pub fn get(&self, row: usize, col: usize) -> Option<Scalar> {
        if row < self.rows && col < self.cols {
            self.data.get(row * self.cols + col).copied()
        } else {
            None
        }
    }

    /// Gets an element by zero-based linear index. Linear indexing is column-major,
    /// so that it enumerates column vectors naturally.
    pub fn get_linear(&self, index: usize) -> Option<Scalar> {
        if index >= self.data.len() {
            return None;
        }
        let (row, col) = (index % self.rows, index / self.rows);
        self.get(row, col)
    }

    /// Iterates over elements in the row-major order.
    pub fn iter(&self) -> impl Iterator<Item = Scalar> + '_ {
        self.data.iter().copied()
    }

    /// Iterates over rows.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[Scalar]> + '_ {
        self.data.chunks(self.cols.max(1))
    }

    /// Returns the only element of a `1×1` matrix.
    pub fn as_scalar(&self) -> Option<Scalar> {
        match self.data.as_slice() {
            [element] => Some(*element),
            _ => None,
        }
    }

    /// Applies `map_fn` to each element.
    #[must_use]
    pub fn map(&self, map_fn: impl FnMut(Scalar) -> Scalar) -> Self {
        Self::new_unchecked(self.rows, self.cols, self.iter().map(map_fn).collect())
    }

    /// Combines two same-sized matrices element-wise.
    pub(crate) fn zip_map(
        &self,
        other: &Self,
        op: BinaryOp,
        mut map_fn: impl FnMut(Scalar, Scalar) -> Scalar,
    ) -> Result<Self, ArithmeticError> {
        if self.dims() != other.dims() {
            return Err(ArithmeticError::DimensionMismatch {
                op: Op::Binary(op),
                lhs: self.dims(),
                rhs: other.dims(),
            });
        }
        let data = self
            .iter()
            .zip(other.iter())
            .map(|(x, y)| map_fn(x, y))
            .collect();
        Ok(Self::new_unchecked(self.rows, self.cols, data))
    }

    /// Transposes this matrix.
    #[must_use]
    pub fn transpose(&self) -> Self {
        Self::generate(self.cols, self.rows, |row, col| self.data[col * self.cols + row])
    }

    /// Conjugate-transposes this matrix.
    #[must_use]
    pub fn conj_transpose(&self) -> Self {
        self.transpose().map(Scalar::conj)
    }

    /// Computes the matrix product.
    pub fn matmul(&self, other: &Self) -> Result<Self, ArithmeticError> {
        if self.cols != other.rows {
            return Err(ArithmeticError::DimensionMismatch {
                op: Op::Binary(BinaryOp::Mul),
                lhs: self.dims(),
                rhs: other.dims(),
            });
        }

        Self::from_fn(self.rows, other.cols, |row, col| {
            (0..self.cols).fold(Scalar::zero(), |acc, k| {
                acc + self.data[row * self.cols + k] * other.data[k * other.cols + col]
            })
        })
    }

    /// Raises a square matrix to a non-negative integer power by repeated squaring.
    pub fn powi(&self, mut exponent: u64) -> Result<Self, ArithmeticError> {
        if !self.is_square() {
            return Err(ArithmeticError::NonSquareMatrix {
                op: Op::Binary(BinaryOp::Pow),
                rows: self.rows,
                cols: self.cols,
            });
        }

        let mut result = Self::identity(self.rows)?;
        let mut base = self.clone();
        while exponent > 0 {
            if exponent & 1 == 1 {
                result = result.matmul(&base)?;
            }
            exponent >>= 1;
            if exponent > 0 {
                base = base.matmul(&base)?;
            }
        }
        Ok(result)
    }

    /// Concatenates matrices horizontally. Empty matrices are neutral.
    pub fn hcat(&self, other: &Self) -> Result<Self, ArithmeticError> {
        if self.is_empty() {
            return Ok(other.clone());
        } else if other.is_empty() {
            return Ok(self.clone());
        }
        if self.rows != other.rows {
            return Err(ArithmeticError::DimensionMismatch {
                op: Op::Binary(BinaryOp::HorizontalConcat),
                lhs: self.dims(),
                rhs: other.dims(),
            });
        }

        let cols = self.cols + other.cols;
        Self::from_fn(self.rows, cols, |row, col| {
            if col < self.cols {
                self.data[row * self.cols + col]
            } else {
                other.data[row * other.cols + col - self.cols]
            }
        })
    }

    /// Concatenates matrices vertically. Empty matrices are neutral.
    pub fn vcat(&self, other: &Self) -> Result<Self, ArithmeticError> {
        if self.is_empty() {
            return Ok(other.clone());
        } else if other.is_empty() {
            return Ok(self.clone());
        }
        if self.cols != other.cols {
            return Err(ArithmeticError::DimensionMismatch {
                op: Op::Binary(BinaryOp::VerticalConcat),
                lhs: self.dims(),
                rhs: other.dims(),
            });
        }

        Self::checked_len(self.rows + other.rows, self.cols)?;
        let mut data = self.data.clone();
        data.extend_from_slice(&other.data);
        Ok(Self::new_unchecked(self.rows + other.rows, self.cols, data))
    }
}

impl FromIterator<Scalar> for Matrix {
    /// Collects scalars into a row vector.
    fn from_iter<I: IntoIterator<Item = Scalar>>(iter: I) -> Self {
        Self::row_vector(iter.into_iter().collect())
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("[")?;
        for (i, row) in self.iter_rows().enumerate() {
            if i > 0 {
                formatter.write_str("; ")?;
            }
            for (j, element) in row.iter().enumerate() {
                if j > 0 {
                    formatter.write_str(", ")?;
                }
                fmt::Display::fmt(element, formatter)?;
            }
        }
        formatter.write_str("]")
    }
}
