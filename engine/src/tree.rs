//! Expression trees.

use core::fmt;

use crate::{
    registry::{Fixity, OperatorRef},
    spans::MaybeSpanned,
    Value,
};

/// Expression tree node with the associated code span.
pub type SpannedExpr = MaybeSpanned<'static, Expr>;

/// Expression tree node.
///
/// Trees are immutable once built. Equality of trees is structural: spans are ignored,
/// and operators are compared by their symbol and fixity.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum Expr {
    /// Literal value, such as `2.5` or `3i`.
    Literal(Value),
    /// Symbol reference, e.g., `x` or `$`. Resolved lazily during evaluation.
    Symbol(String),
    /// Function call, e.g., `sin(x)`, or indexing into a value, e.g., `x(2, 1)`.
    Call {
        /// Function or variable name.
        name: String,
        /// Arguments.
        args: Vec<SpannedExpr>,
    },
    /// Expression in parentheses.
    Group(Box<SpannedExpr>),
    /// Matrix literal, e.g., `[1, 2; 3, 4]`. The contents use the matrix concatenation
    /// operators; `None` corresponds to the empty matrix `[]`.
    Matrix(Option<Box<SpannedExpr>>),
    /// Application of a prefix or postfix operator.
    Unary {
        /// Operator.
        op: OperatorRef,
        /// Operand.
        operand: Box<SpannedExpr>,
    },
    /// Application of an infix operator.
    Binary {
        /// Operator.
        op: OperatorRef,
        /// Left-hand side.
        lhs: Box<SpannedExpr>,
        /// Right-hand side.
        rhs: Box<SpannedExpr>,
    },
}

impl Expr {
    /// Returns the symbol name if this expression is a [`Symbol`](Self::Symbol).
    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Self::Symbol(name) => Some(name),
            _ => None,
        }
    }

    /// Checks whether this expression is an assignment, possibly wrapped in parentheses.
    pub fn is_assignment(&self) -> bool {
        match self {
            Self::Binary { op, .. } => op.assignment().is_some(),
            Self::Group(inner) => inner.extra.is_assignment(),
            _ => false,
        }
    }

    /// Returns the depth of this tree. Leaves have depth 1.
    pub fn depth(&self) -> usize {
        match self {
            Self::Literal(_) | Self::Symbol(_) | Self::Matrix(None) => 1,
            Self::Call { args, .. } => {
                1 + args.iter().map(|arg| arg.extra.depth()).max().unwrap_or(0)
            }
            Self::Group(inner) | Self::Matrix(Some(inner)) => 1 + inner.extra.depth(),
            Self::Unary { operand, .. } => 1 + operand.extra.depth(),
            Self::Binary { lhs, rhs, .. } => 1 + lhs.extra.depth().max(rhs.extra.depth()),
        }
    }
}

fn ops_eq(lhs: &OperatorRef, rhs: &OperatorRef) -> bool {
    lhs.symbol() == rhs.symbol() && lhs.fixity() == rhs.fixity()
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Literal(x), Self::Literal(y)) => x == y,
            (Self::Symbol(x), Self::Symbol(y)) => x == y,
            (
                Self::Call { name, args },
                Self::Call {
                    name: other_name,
                    args: other_args,
                },
            ) => {
                name == other_name
                    && args.len() == other_args.len()
                    && args
                        .iter()
                        .zip(other_args)
                        .all(|(x, y)| x.extra == y.extra)
            }
            (Self::Group(x), Self::Group(y)) => x.extra == y.extra,
            (Self::Matrix(x), Self::Matrix(y)) => match (x, y) {
                (Some(x), Some(y)) => x.extra == y.extra,
                (None, None) => true,
                _ => false,
            },
            (
                Self::Unary { op, operand },
                Self::Unary {
                    op: other_op,
                    operand: other_operand,
                },
            ) => ops_eq(op, other_op) && operand.extra == other_operand.extra,
            (
                Self::Binary { op, lhs, rhs },
                Self::Binary {
                    op: other_op,
                    lhs: other_lhs,
                    rhs: other_rhs,
                },
            ) => ops_eq(op, other_op) && lhs.extra == other_lhs.extra && rhs.extra == other_rhs.extra,
            _ => false,
        }
    }
}

/// Prints the expression in a form that can be parsed back into an equal tree.
impl fmt::Display for Expr {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => fmt::Display::fmt(value, formatter),
            Self::Symbol(name) => formatter.write_str(name),
            Self::Call { name, args } => {
                write!(formatter, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        formatter.write_str(", ")?;
                    }
                    fmt::Display::fmt(&arg.extra, formatter)?;
                }
                formatter.write_str(")")
            }
            Self::Group(inner) => write!(formatter, "({})", inner.extra),
            Self::Matrix(None) => formatter.write_str("[]"),
            Self::Matrix(Some(inner)) => write!(formatter, "[{}]", inner.extra),
            Self::Unary { op, operand } => {
                if op.fixity() == Fixity::Postfix {
                    write!(formatter, "{}{}", operand.extra, op.symbol())
                } else {
                    write!(formatter, "{}{}", op.symbol(), operand.extra)
                }
            }
            Self::Binary { op, lhs, rhs } => match op.symbol() {
                symbol @ ("," | ";") => write!(formatter, "{}{symbol} {}", lhs.extra, rhs.extra),
                symbol => write!(formatter, "{} {symbol} {}", lhs.extra, rhs.extra),
            },
        }
    }
}

/// Prints an indented outline of the tree.
#[derive(Debug)]
pub struct Outline<'a>(pub &'a SpannedExpr);

impl Outline<'_> {
    fn fmt_node(
        expr: &SpannedExpr,
        indent: usize,
        formatter: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let location = expr.range();
        write!(formatter, "{:indent$}", "")?;
        match &expr.extra {
            Expr::Literal(value) => writeln!(formatter, "Literal {value} @ {location:?}"),
            Expr::Symbol(name) => writeln!(formatter, "Symbol {name} @ {location:?}"),
            Expr::Call { name, args } => {
                writeln!(formatter, "Call {name} @ {location:?}")?;
                args.iter()
                    .try_for_each(|arg| Self::fmt_node(arg, indent + 2, formatter))
            }
            Expr::Group(inner) => {
                writeln!(formatter, "Group @ {location:?}")?;
                Self::fmt_node(inner, indent + 2, formatter)
            }
            Expr::Matrix(inner) => {
                writeln!(formatter, "Matrix @ {location:?}")?;
                match inner {
                    Some(inner) => Self::fmt_node(inner, indent + 2, formatter),
                    None => Ok(()),
                }
            }
            Expr::Unary { op, operand } => {
                writeln!(formatter, "Unary `{}` @ {location:?}", op.symbol())?;
                Self::fmt_node(operand, indent + 2, formatter)
            }
            Expr::Binary { op, lhs, rhs } => {
                writeln!(formatter, "Binary `{}` @ {location:?}", op.symbol())?;
                Self::fmt_node(lhs, indent + 2, formatter)?;
                Self::fmt_node(rhs, indent + 2, formatter)
            }
        }
    }
}

impl fmt::Display for Outline<'_> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        Self::fmt_node(self.0, 0, formatter)
    }
}
