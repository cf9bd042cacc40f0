//! Built-in operator descriptors.

use nom::error::{ErrorKind as NomErrorKind, ParseError};

use crate::{
    error::{ErrorKind, ScanError},
    parser::Scanner,
    registry::{unsupported_op, Assignment, Associativity, Fixity, Grouping, Operator},
    spans::{InputSpan, NomResult},
    values::{BinaryOp, UnaryOp},
    Value,
};

#[derive(Debug, Clone, Copy)]
enum Action {
    Binary(BinaryOp),
    Unary(UnaryOp),
    Identity,
}

/// Arithmetic operator backed by a [`Value`] operation.
#[derive(Debug, Clone)]
pub struct StandardOperator {
    symbol: &'static str,
    level: i32,
    associativity: Associativity,
    fixity: Fixity,
    action: Action,
    matrix_only: bool,
}

impl StandardOperator {
    /// Creates a left-to-right infix operator.
    pub const fn infix(symbol: &'static str, level: i32, op: BinaryOp) -> Self {
        Self {
            symbol,
            level,
            associativity: Associativity::LeftToRight,
            fixity: Fixity::Infix,
            action: Action::Binary(op),
            matrix_only: false,
        }
    }

    /// Creates a prefix operator.
    pub const fn prefix(symbol: &'static str, level: i32, op: UnaryOp) -> Self {
        Self {
            symbol,
            level,
            associativity: Associativity::LeftToRight,
            fixity: Fixity::Prefix,
            action: Action::Unary(op),
            matrix_only: false,
        }
    }

    /// Creates a prefix operator returning its operand unchanged, such as `+` in `+x`.
    pub const fn identity_prefix(symbol: &'static str, level: i32) -> Self {
        Self {
            action: Action::Identity,
            ..Self::prefix(symbol, level, UnaryOp::Neg)
        }
    }

    /// Creates a postfix operator.
    pub const fn postfix(symbol: &'static str, level: i32, op: UnaryOp) -> Self {
        Self {
            fixity: Fixity::Postfix,
            ..Self::prefix(symbol, level, op)
        }
    }

    /// Makes this operator right-to-left associative.
    #[must_use]
    pub const fn right_to_left(mut self) -> Self {
        self.associativity = Associativity::RightToLeft;
        self
    }

    /// Restricts this operator to matrix literals.
    #[must_use]
    pub const fn matrix_only(mut self) -> Self {
        self.matrix_only = true;
        self
    }
}

impl Operator for StandardOperator {
    fn symbol(&self) -> &str {
        self.symbol
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

    fn is_allowed_in(&self, grouping: Grouping) -> bool {
        !self.matrix_only || grouping == Grouping::Matrix
    }

    fn apply(&self, lhs: Value, rhs: Value) -> Result<Value, ErrorKind> {
        match self.action {
            Action::Binary(op) => lhs.binary_op(op, rhs).map_err(ErrorKind::from),
            Action::Unary(op) => Err(unsupported_op(op, &rhs)),
            Action::Identity => Err(ErrorKind::native(format!(
                "`{}` is not a binary operator",
                self.symbol
            ))),
        }
    }

    fn apply_unary(&self, operand: Value) -> Result<Value, ErrorKind> {
        match self.action {
            Action::Unary(op) => operand.unary_op(op).map_err(ErrorKind::from),
            Action::Identity => Ok(operand),
            Action::Binary(op) => Err(unsupported_op(op, &operand)),
        }
    }
}

/// Plain (`=`) or compound (`+=`, `-=`, etc.) assignment.
///
/// The operator itself only computes the assigned value; binding it to the left-hand side
/// symbol is performed by the interpreter.
#[derive(Debug, Clone)]
pub struct AssignmentOperator {
    symbol: &'static str,
    op: Option<BinaryOp>,
}

impl AssignmentOperator {
    /// Precedence level of assignments.
    pub const LEVEL: i32 = 2;

    /// Creates a plain assignment.
    pub const fn plain(symbol: &'static str) -> Self {
        Self { symbol, op: None }
    }

    /// Creates a compound assignment combining the current value with the right-hand side
    /// using `op`.
    pub const fn compound(symbol: &'static str, op: BinaryOp) -> Self {
        Self {
            symbol,
            op: Some(op),
        }
    }
}

impl Operator for AssignmentOperator {
    fn symbol(&self) -> &str {
        self.symbol
    }

    fn level(&self) -> i32 {
        Self::LEVEL
    }

    fn associativity(&self) -> Associativity {
        Associativity::RightToLeft
    }

    fn assignment(&self) -> Option<Assignment> {
        Some(if self.op.is_some() {
            Assignment::Compound
        } else {
            Assignment::Plain
        })
    }

    fn apply(&self, lhs: Value, rhs: Value) -> Result<Value, ErrorKind> {
        match self.op {
            Some(op) => lhs.binary_op(op, rhs).map_err(ErrorKind::from),
            None => Ok(rhs),
        }
    }
}

/// Column separator in matrix literals expressed by whitespace, as in `[1 2 -3]`.
///
/// The operator has zero width. It matches if whitespace was skipped before the current
/// position and the following input starts an operand. A sign starts an operand only if it
/// is immediately followed by a non-whitespace char; thus, `[1 -2]` is a 2-element row,
/// while `[1 - 2]` is a single element.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImplicitColumn;

impl ImplicitColumn {
    fn starts_operand(input: &str) -> bool {
        let mut chars = input.chars();
        let Some(first) = chars.next() else {
            return false;
        };
        match first {
            '(' | '[' | '_' | '$' => true,
            '.' => chars.next().map_or(false, |c| c.is_ascii_digit()),
            '+' | '-' => chars.next().map_or(false, |c| !c.is_whitespace()),
            c => c.is_ascii_alphanumeric(),
        }
    }
}

impl Operator for ImplicitColumn {
    fn symbol(&self) -> &str {
        ","
    }

    fn level(&self) -> i32 {
        1
    }

    fn is_allowed_in(&self, grouping: Grouping) -> bool {
        grouping == Grouping::Matrix
    }

    fn scan<'a>(&self, input: InputSpan<'a>, scanner: &Scanner<'_>) -> NomResult<'a, ()> {
        let matches = scanner.grouping() == Grouping::Matrix
            && scanner.last_skipped().is_some()
            && Self::starts_operand(input.fragment());
        if matches {
            Ok((input, ()))
        } else {
            let err = ScanError::from_error_kind(input, NomErrorKind::Verify);
            Err(nom::Err::Error(err))
        }
    }

    fn apply(&self, lhs: Value, rhs: Value) -> Result<Value, ErrorKind> {
        lhs.binary_op(BinaryOp::HorizontalConcat, rhs)
            .map_err(ErrorKind::from)
    }
}
