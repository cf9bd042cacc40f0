//! Built-in token descriptors: number literals, symbols and calls, bracketed groups,
//! matrix literals and the standard operators.

use once_cell::sync::Lazy;

use std::sync::Arc;

use crate::{
    registry::{Operator, OperatorRef, TokenRegistry},
    values::{BinaryOp, UnaryOp},
};

mod expr;
mod ops;

pub use self::{
    expr::{is_valid_symbol_name, MatrixLiteral, NumberLiteral, ParenGroup, SymbolToken},
    ops::{AssignmentOperator, ImplicitColumn, StandardOperator},
};

const COMPARISON_LEVEL: i32 = 3;
const ADDITIVE_LEVEL: i32 = 5;
const MULTIPLICATIVE_LEVEL: i32 = 6;
/// Level of prefix operators.
pub const PREFIX_LEVEL: i32 = 7;
const POWER_LEVEL: i32 = 8;
const POSTFIX_LEVEL: i32 = 9;

/// Built-in operators in the lookup order. Longer symbols go before symbols that are
/// their prefixes (e.g., `==` goes before `=`), since the first match wins.
fn builtin_operators() -> Vec<OperatorRef> {
    fn op(op: impl Operator + 'static) -> OperatorRef {
        Arc::new(op)
    }

    let infix = |symbol, level, binary_op| op(StandardOperator::infix(symbol, level, binary_op));

    vec![
        op(ImplicitColumn),
        op(StandardOperator::infix(";", 0, BinaryOp::VerticalConcat).matrix_only()),
        op(StandardOperator::infix(",", 1, BinaryOp::HorizontalConcat).matrix_only()),
        infix("==", COMPARISON_LEVEL, BinaryOp::Eq),
        infix("~=", COMPARISON_LEVEL, BinaryOp::NotEq),
        infix("!=", COMPARISON_LEVEL, BinaryOp::NotEq),
        infix("<=", COMPARISON_LEVEL, BinaryOp::Le),
        infix(">=", COMPARISON_LEVEL, BinaryOp::Ge),
        infix("<", COMPARISON_LEVEL, BinaryOp::Lt),
        infix(">", COMPARISON_LEVEL, BinaryOp::Gt),
        op(AssignmentOperator::compound("+=", BinaryOp::Add)),
        op(AssignmentOperator::compound("-=", BinaryOp::Sub)),
        op(AssignmentOperator::compound("*=", BinaryOp::Mul)),
        op(AssignmentOperator::compound("/=", BinaryOp::Div)),
        op(AssignmentOperator::plain("=")),
        infix(".*", MULTIPLICATIVE_LEVEL, BinaryOp::ElemMul),
        infix("./", MULTIPLICATIVE_LEVEL, BinaryOp::ElemDiv),
        op(StandardOperator::infix(".^", POWER_LEVEL, BinaryOp::ElemPow).right_to_left()),
        op(StandardOperator::postfix(".'", POSTFIX_LEVEL, UnaryOp::Transpose)),
        infix("+", ADDITIVE_LEVEL, BinaryOp::Add),
        infix("-", ADDITIVE_LEVEL, BinaryOp::Sub),
        infix("*", MULTIPLICATIVE_LEVEL, BinaryOp::Mul),
        infix("/", MULTIPLICATIVE_LEVEL, BinaryOp::Div),
        op(StandardOperator::infix("^", POWER_LEVEL, BinaryOp::Pow).right_to_left()),
        op(StandardOperator::postfix("'", POSTFIX_LEVEL, UnaryOp::ConjTranspose)),
        op(StandardOperator::postfix("!", POSTFIX_LEVEL, UnaryOp::Factorial)),
        infix(":", 4, BinaryOp::Range),
        op(StandardOperator::prefix("-", PREFIX_LEVEL, UnaryOp::Neg)),
        op(StandardOperator::identity_prefix("+", PREFIX_LEVEL)),
    ]
}

static BUILTIN_REGISTRY: Lazy<TokenRegistry> = Lazy::new(|| {
    let mut registry = TokenRegistry::new();
    registry.register_expression(Arc::new(NumberLiteral));
    registry.register_expression(Arc::new(SymbolToken));
    registry.register_expression(Arc::new(ParenGroup));
    registry.register_expression(Arc::new(MatrixLiteral));
    // `ImplicitColumn` shares its symbol with the explicit `,` separator, so operators
    // are pushed without replacement.
    for op in builtin_operators() {
        registry.push_operator(op);
    }
    registry
});

/// Returns the immutable registry of built-in descriptors shared by all contexts.
pub(crate) fn builtin_registry() -> &'static TokenRegistry {
    &BUILTIN_REGISTRY
}
