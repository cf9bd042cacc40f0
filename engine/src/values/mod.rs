//! Values used by the interpreter.

use num_complex::Complex64;

use core::{
    any::{type_name, Any},
    fmt,
};
use std::sync::Arc;

mod matrix;
mod ops;
mod scalar;

pub use self::{
    matrix::Matrix,
    ops::{BinaryOp, Op, UnaryOp},
    scalar::Scalar,
};

/// Possible high-level types of [`Value`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ValueType {
    /// Scalar (real, complex or missing).
    Scalar,
    /// Matrix of scalars.
    Matrix,
    /// Opaque value contributed by an extension.
    Opaque,
}

impl fmt::Display for ValueType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Scalar => "scalar",
            Self::Matrix => "matrix",
            Self::Opaque => "opaque value",
        })
    }
}

/// Type-erased native value wrapped by an [`OpaqueRef`].
trait NativeValue: Any + Send + Sync + fmt::Debug {
    fn as_any(&self) -> &dyn Any;

    /// Compares this value with `other`, or returns `None` if the value is compared
    /// by identity.
    fn eq_value(&self, other: &dyn Any) -> Option<bool>;
}

/// Native value compared via its [`PartialEq`] implementation.
struct Comparable<T>(T);

impl<T: fmt::Debug> fmt::Debug for Comparable<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, formatter)
    }
}

impl<T> NativeValue for Comparable<T>
where
    T: Any + Send + Sync + fmt::Debug + PartialEq,
{
    fn as_any(&self) -> &dyn Any {
        &self.0
    }

    fn eq_value(&self, other: &dyn Any) -> Option<bool> {
        Some(other.downcast_ref::<T>() == Some(&self.0))
    }
}

/// Native value compared by identity.
struct ByIdentity<T>(T);

impl<T: fmt::Debug> fmt::Debug for ByIdentity<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, formatter)
    }
}

impl<T: Any + Send + Sync + fmt::Debug> NativeValue for ByIdentity<T> {
    fn as_any(&self) -> &dyn Any {
        &self.0
    }

    fn eq_value(&self, _other: &dyn Any) -> Option<bool> {
        None
    }
}

/// Reference to a native value contributed by an extension, e.g. a handle to
/// a host resource.
///
/// Opaque references cannot be created by expressions; they enter evaluation via
/// variables, overlays or function return values. Arithmetic on them is rejected.
/// References are cheaply cloneable and can be shared among threads.
#[derive(Clone)]
pub struct OpaqueRef {
    value: Arc<dyn NativeValue>,
    type_name: &'static str,
}

impl OpaqueRef {
    /// Wraps a `value` comparable via its [`PartialEq`] implementation.
    pub fn new<T>(value: T) -> Self
    where
        T: Any + Send + Sync + fmt::Debug + PartialEq,
    {
        Self {
            value: Arc::new(Comparable(value)),
            type_name: type_name::<T>(),
        }
    }

    /// Wraps a `value` without a [`PartialEq`] implementation. Such references are equal
    /// only to their clones.
    pub fn with_identity_eq<T>(value: T) -> Self
    where
        T: Any + Send + Sync + fmt::Debug,
    {
        Self {
            value: Arc::new(ByIdentity(value)),
            type_name: type_name::<T>(),
        }
    }

    /// Returns the name of the wrapped type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Tries to downcast the wrapped value to a specific type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.as_any().downcast_ref()
    }
}

impl PartialEq for OpaqueRef {
    fn eq(&self, other: &Self) -> bool {
        let by_value = self.value.eq_value(other.value.as_any());
        match (by_value, other.value.eq_value(self.value.as_any())) {
            (Some(eq), Some(_)) => eq,
            _ => Arc::as_ptr(&self.value).cast::<()>() == Arc::as_ptr(&other.value).cast::<()>(),
        }
    }
}

impl fmt::Debug for OpaqueRef {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_tuple("OpaqueRef")
            .field(&self.type_name)
            .finish()
    }
}

impl fmt::Display for OpaqueRef {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}::{:?}", self.type_name, self.value)
    }
}

/// Values produced by expressions during their interpretation.
///
/// Values are normalized so that a `1×1` matrix produced by a matrix literal or an operation
/// is represented as a [`Scalar`]; arithmetic on `Value`s treats both representations
/// identically.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum Value {
    /// Scalar value.
    Scalar(Scalar),
    /// Matrix value.
    Matrix(Matrix),
    /// Opaque reference to a native value contributed by an extension.
    #[cfg_attr(feature = "serde", serde(skip))]
    Opaque(OpaqueRef),
}

impl Default for Value {
    fn default() -> Self {
        Self::missing()
    }
}

impl Value {
    /// Creates a real scalar value.
    pub const fn real(value: f64) -> Self {
        Self::Scalar(Scalar::real(value))
    }

    /// Creates a complex scalar value.
    pub const fn complex(re: f64, im: f64) -> Self {
        Self::Scalar(Scalar::complex(re, im))
    }

    /// Creates the missing value.
    pub const fn missing() -> Self {
        Self::Scalar(Scalar::Missing)
    }

    /// Creates a matrix value, normalizing `1×1` matrices to scalars.
    pub fn matrix(matrix: Matrix) -> Self {
        match matrix.as_scalar() {
            Some(scalar) => Self::Scalar(scalar),
            None => Self::Matrix(matrix),
        }
    }

    /// Creates an opaque reference value.
    pub fn opaque<T>(value: T) -> Self
    where
        T: Any + Send + Sync + fmt::Debug + PartialEq,
    {
        Self::Opaque(OpaqueRef::new(value))
    }

    /// Returns the type of this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Scalar(_) => ValueType::Scalar,
            Self::Matrix(_) => ValueType::Matrix,
            Self::Opaque(_) => ValueType::Opaque,
        }
    }

    /// Checks whether this value is the missing scalar.
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Scalar(Scalar::Missing))
    }

    /// Checks whether this value is numeric, i.e., a non-missing scalar or a matrix.
    pub fn is_numeric(&self) -> bool {
        match self {
            Self::Scalar(scalar) => !scalar.is_missing(),
            Self::Matrix(_) => true,
            Self::Opaque(_) => false,
        }
    }

    /// Returns the scalar contained in this value, treating `1×1` matrices as scalars.
    pub fn as_scalar(&self) -> Option<Scalar> {
        match self {
            Self::Scalar(scalar) => Some(*scalar),
            Self::Matrix(matrix) => matrix.as_scalar(),
            Self::Opaque(_) => None,
        }
    }

    /// Returns the real number contained in this value, if any.
    pub fn as_real(&self) -> Option<f64> {
        self.as_scalar()?.as_real()
    }

    /// Returns dimensions of this value as `(rows, cols)`. Scalars are `1×1`.
    pub fn dims(&self) -> Option<(usize, usize)> {
        match self {
            Self::Scalar(_) => Some((1, 1)),
            Self::Matrix(matrix) => Some(matrix.dims()),
            Self::Opaque(_) => None,
        }
    }

    /// Converts this value into a matrix. Scalars become `1×1` matrices.
    pub fn into_matrix(self) -> Option<Matrix> {
        match self {
            Self::Scalar(scalar) => Some(Matrix::row_vector(vec![scalar])),
            Self::Matrix(matrix) => Some(matrix),
            Self::Opaque(_) => None,
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::real(value)
    }
}

impl From<Complex64> for Value {
    fn from(value: Complex64) -> Self {
        Self::Scalar(value.into())
    }
}

impl From<Scalar> for Value {
    fn from(value: Scalar) -> Self {
        Self::Scalar(value)
    }
}

impl From<Matrix> for Value {
    fn from(value: Matrix) -> Self {
        Self::matrix(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(scalar) => fmt::Display::fmt(scalar, formatter),
            Self::Matrix(matrix) => fmt::Display::fmt(matrix, formatter),
            Self::Opaque(opaque) => fmt::Display::fmt(opaque, formatter),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opaque_ref_equality() {
        let value = Value::opaque(Box::new(5_u32));
        let other_value = Value::opaque(Box::new(5_u32));
        assert_eq!(value, other_value);
        let other_value = Value::opaque(Box::new(3_u32));
        assert_ne!(value, other_value);
        let other_value = Value::opaque(Box::new(5_i32));
        assert_ne!(value, other_value);
        assert_eq!(value.value_type(), ValueType::Opaque);
    }

    #[test]
    fn opaque_ref_formatting() {
        let value = OpaqueRef::new(Some("xyz"));
        assert_eq!(
            value.to_string(),
            "core::option::Option<&str>::Some(\"xyz\")"
        );
    }

    #[test]
    fn identity_comparison() {
        let value = OpaqueRef::with_identity_eq(vec![1_u8]);
        assert_eq!(value, value.clone());
        assert_ne!(value, OpaqueRef::with_identity_eq(vec![1_u8]));
        assert_eq!(value.downcast_ref::<Vec<u8>>(), Some(&vec![1]));
        assert_eq!(value.type_name(), "alloc::vec::Vec<u8>");
    }

    #[test]
    fn matrix_normalization() {
        let value = Value::from(Matrix::row_vector(vec![Scalar::real(5.0)]));
        assert_eq!(value, Value::real(5.0));
        let value = Value::from(Matrix::default());
        assert_eq!(value.dims(), Some((0, 0)));
        assert!(!Value::missing().is_numeric());
    }
}
