//! Operators defined by closures.

use core::fmt;

use super::{Associativity, Fixity, Operator};
use crate::{ErrorKind, Value};

type BinaryFn = dyn Fn(Value, Value) -> Result<Value, ErrorKind> + Send + Sync;
type UnaryFn = dyn Fn(Value) -> Result<Value, ErrorKind> + Send + Sync;

enum Apply {
    Binary(Box<BinaryFn>),
    Unary(Box<UnaryFn>),
}

/// Operator defined by a closure. This is the easiest way for hosts to add operators.
///
/// # Examples
///
/// ```
/// use mathexpr::{registry::FnOperator, Context, Symbols, Value};
///
/// # fn main() -> anyhow::Result<()> {
/// let context = Context::with_prelude();
/// let modulo = FnOperator::binary("%", 6, |x, y| {
///     let (x, y) = (x.as_real().unwrap_or(f64::NAN), y.as_real().unwrap_or(f64::NAN));
///     Ok(Value::real(x.rem_euclid(y)))
/// });
/// context.register_operator(modulo);
///
/// let value = mathexpr::evaluate(&context, "2 + 7 % 4", &Symbols::new())?;
/// assert_eq!(value, Value::real(5.0));
/// # Ok(())
/// # }
/// ```
pub struct FnOperator {
    symbol: String,
    level: i32,
    associativity: Associativity,
    fixity: Fixity,
    apply: Apply,
}

impl fmt::Debug for FnOperator {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("FnOperator")
            .field("symbol", &self.symbol)
            .field("level", &self.level)
            .field("associativity", &self.associativity)
            .field("fixity", &self.fixity)
            .finish_non_exhaustive()
    }
}

impl FnOperator {
    /// Creates a left-to-right binary operator.
    pub fn binary<F>(symbol: impl Into<String>, level: i32, apply: F) -> Self
    where
        F: Fn(Value, Value) -> Result<Value, ErrorKind> + Send + Sync + 'static,
    {
        Self {
            symbol: symbol.into(),
            level,
            associativity: Associativity::LeftToRight,
            fixity: Fixity::Infix,
            apply: Apply::Binary(Box::new(apply)),
        }
    }

    /// Creates a prefix unary operator.
    pub fn prefix<F>(symbol: impl Into<String>, level: i32, apply: F) -> Self
    where
        F: Fn(Value) -> Result<Value, ErrorKind> + Send + Sync + 'static,
    {
        Self {
            symbol: symbol.into(),
            level,
            associativity: Associativity::LeftToRight,
            fixity: Fixity::Prefix,
            apply: Apply::Unary(Box::new(apply)),
        }
    }

    /// Creates a postfix unary operator.
    pub fn postfix<F>(symbol: impl Into<String>, level: i32, apply: F) -> Self
    where
        F: Fn(Value) -> Result<Value, ErrorKind> + Send + Sync + 'static,
    {
        Self {
            fixity: Fixity::Postfix,
            ..Self::prefix(symbol, level, apply)
        }
    }

    /// Makes this operator right-to-left associative.
    #[must_use]
    pub fn right_to_left(mut self) -> Self {
        self.associativity = Associativity::RightToLeft;
        self
    }
}

impl Operator for FnOperator {
    fn symbol(&self) -> &str {
        &self.symbol
    }

    fn level(&self) -> i32 {
        self.level
    }

    fn associativity(&self) -> Associativity {
        self.associativity
    }

    fn fixity(&self) -> Fixity {
        self.fixity
    }

    fn apply(&self, lhs: Value, rhs: Value) -> Result<Value, ErrorKind> {
        match &self.apply {
            Apply::Binary(apply) => apply(lhs, rhs),
            Apply::Unary(_) => Err(ErrorKind::native(format!(
                "`{}` is not a binary operator",
                self.symbol
            ))),
        }
    }

    fn apply_unary(&self, operand: Value) -> Result<Value, ErrorKind> {
        match &self.apply {
            Apply::Unary(apply) => apply(operand),
            Apply::Binary(_) => Err(ErrorKind::native(format!(
                "`{}` is not a unary operator",
                self.symbol
            ))),
        }
    }
}
