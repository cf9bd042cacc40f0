//! Token registry: catalogs of expression and operator descriptors consulted
//! by the [tree builder](crate::TokenSet::build_tree()).
//!
//! # Lookup order
//!
//! Descriptors are matched against the remaining input in registration order, and the first
//! successful match wins. Registries of [`Context`](crate::Context)s are consulted
//! from the nearest context to the root, and the built-in registry is consulted last.
//! Thus, a host can override a built-in descriptor by registering a descriptor with the same
//! name (or the same operator symbol) in its context.
//!
//! Re-registering a descriptor with the same name in the same registry replaces the previous
//! descriptor in place, retaining its position.

use nom::{bytes::complete::tag, combinator::value};

use core::fmt;
use std::sync::Arc;

use crate::{
    error::{ErrorKind, ScanError},
    parser::Scanner,
    spans::{with_span, InputSpan, MaybeSpanned, NomResult},
    tree::Expr,
    values::{Op, Value},
    ArithmeticError,
};

mod fn_operator;

pub use self::fn_operator::FnOperator;

/// Shared reference to an operator descriptor.
pub type OperatorRef = Arc<dyn Operator>;
/// Shared reference to an expression descriptor.
pub type ExpressionRef = Arc<dyn ExpressionToken>;

/// Associativity of an infix operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Associativity {
    /// Left-to-right associativity: `x R y R z` is parsed as `(x R y) R z`.
    LeftToRight,
    /// Right-to-left associativity: `x R y R z` is parsed as `x R (y R z)`.
    RightToLeft,
}

/// Position of an operator relative to its operand(s).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fixity {
    /// Binary operator placed between operands, e.g., `+`.
    Infix,
    /// Unary operator placed before its operand, e.g., `-` in `-x`.
    Prefix,
    /// Unary operator placed after its operand, e.g., `!` in `x!`.
    /// Postfix operators do not expect a right operand.
    Postfix,
}

/// Kind of an assignment operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Assignment {
    /// Plain assignment, e.g. `=`. The right-hand side is bound as is.
    Plain,
    /// Compound assignment, e.g. `+=`. The current value of the target is combined
    /// with the right-hand side using [`Operator::apply()`].
    Compound,
}

/// Bracketed grouping the tree builder is working in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Grouping {
    /// Top-level expression.
    Top,
    /// Expression in parentheses.
    Parens,
    /// Function call argument.
    Args,
    /// Contents of a matrix literal.
    Matrix,
}

/// Descriptor for expressions: literals, identifiers, function calls or bracketed
/// sub-expressions.
///
/// Implementations should return a recoverable `nom::Err::Error` if the input does not
/// start with the recognized expression, so that the next descriptor can be tried,
/// and `nom::Err::Failure` if the input is recognized, but malformed.
pub trait ExpressionToken: Send + Sync + fmt::Debug {
    /// Name of the descriptor. Descriptors with the same name replace each other
    /// on registration.
    fn name(&self) -> &str;

    /// Scans the start of the `input` producing an expression.
    fn scan<'a>(&self, input: InputSpan<'a>, scanner: &Scanner<'_>) -> NomResult<'a, Expr>;
}

/// Descriptor for operators.
///
/// # Precedence
///
/// Operators with a higher [level](Self::level()) bind tighter. Built-in operators have
/// the following levels:
///
/// | Operators | Level | Associativity |
/// |-----------|-------|---------------|
/// | `;` (matrix rows) | 0 | left-to-right |
/// | `,` / whitespace (matrix columns) | 1 | left-to-right |
/// | `=`, `+=`, `-=`, `*=`, `/=` | 2 | right-to-left |
/// | `==`, `~=`, `!=`, `<`, `>`, `<=`, `>=` | 3 | left-to-right |
/// | `:` | 4 | left-to-right |
/// | `+`, `-` | 5 | left-to-right |
/// | `*`, `/`, `.*`, `./` | 6 | left-to-right |
/// | prefix `-`, `+` | 7 | |
/// | `^`, `.^` | 8 | right-to-left |
/// | postfix `'`, `.'`, `!` | 9 | |
pub trait Operator: Send + Sync + fmt::Debug {
    /// Symbol of the operator. Operators with the same symbol and compatible fixity replace
    /// each other on registration.
    fn symbol(&self) -> &str;

    /// Precedence level of the operator.
    fn level(&self) -> i32;

    /// Associativity of the operator. Only relevant for infix operators.
    fn associativity(&self) -> Associativity {
        Associativity::LeftToRight
    }

    /// Position of the operator relative to its operands.
    fn fixity(&self) -> Fixity {
        Fixity::Infix
    }

    /// Checks whether the operator expects a right operand.
    fn expects_right_operand(&self) -> bool {
        self.fixity() != Fixity::Postfix
    }

    /// Returns the assignment kind if this operator is an assignment.
    fn assignment(&self) -> Option<Assignment> {
        None
    }

    /// Checks whether the operator may be used in the specified grouping.
    fn is_allowed_in(&self, grouping: Grouping) -> bool {
        let _ = grouping;
        true
    }

    /// Scans the start of the `input`. By default, matches the operator [symbol](Self::symbol()).
    fn scan<'a>(&self, input: InputSpan<'a>, scanner: &Scanner<'_>) -> NomResult<'a, ()> {
        let _ = scanner;
        value((), tag(self.symbol()))(input)
    }

    /// Applies the binary operator.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation is not supported for the provided operands.
    fn apply(&self, lhs: Value, rhs: Value) -> Result<Value, ErrorKind> {
        let _ = rhs;
        Err(unsupported_operand(&lhs))
    }

    /// Applies the unary operator.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation is not supported for the provided operand.
    fn apply_unary(&self, operand: Value) -> Result<Value, ErrorKind> {
        Err(unsupported_operand(&operand))
    }
}

fn unsupported_operand(value: &Value) -> ErrorKind {
    ErrorKind::NativeCall(format!("operator does not support {}", value.value_type()))
}

/// Creates an error for an arithmetic operation that does not support the value.
pub(crate) fn unsupported_op(op: impl Into<Op>, value: &Value) -> ErrorKind {
    ErrorKind::Arithmetic(ArithmeticError::UnsupportedOperand {
        op: op.into(),
        operand: value.value_type(),
    })
}

fn is_prefix(op: &dyn Operator) -> bool {
    op.fixity() == Fixity::Prefix
}

/// Mutable catalog of expression and operator descriptors.
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    expressions: Vec<ExpressionRef>,
    operators: Vec<OperatorRef>,
}

impl TokenRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an expression descriptor, replacing a descriptor with the same name.
    pub fn register_expression(&mut self, token: ExpressionRef) {
        let existing = self
            .expressions
            .iter_mut()
            .find(|existing| existing.name() == token.name());
        if let Some(existing) = existing {
            *existing = token;
        } else {
            self.expressions.push(token);
        }
    }

    /// Registers an operator descriptor, replacing an operator with the same symbol.
    /// Prefix operators only replace prefix operators, and vice versa.
    pub fn register_operator(&mut self, op: OperatorRef) {
        let existing = self.operators.iter_mut().find(|existing| {
            existing.symbol() == op.symbol()
                && is_prefix(existing.as_ref()) == is_prefix(op.as_ref())
        });
        if let Some(existing) = existing {
            *existing = op;
        } else {
            self.operators.push(op);
        }
    }

    /// Appends an operator without replacing operators with the same symbol.
    pub(crate) fn push_operator(&mut self, op: OperatorRef) {
        self.operators.push(op);
    }

    /// Removes an expression descriptor by name. Returns `true` if the descriptor was present.
    pub fn remove_expression(&mut self, name: &str) -> bool {
        let len = self.expressions.len();
        self.expressions.retain(|token| token.name() != name);
        self.expressions.len() < len
    }

    /// Removes all operators with the specified symbol. Returns `true` if any operator
    /// was removed.
    pub fn remove_operator(&mut self, symbol: &str) -> bool {
        let len = self.operators.len();
        self.operators.retain(|op| op.symbol() != symbol);
        self.operators.len() < len
    }

    /// Iterates over registered expression descriptors in the registration order.
    pub fn expressions(&self) -> impl Iterator<Item = &ExpressionRef> + '_ {
        self.expressions.iter()
    }

    /// Iterates over registered operators in the registration order.
    pub fn operators(&self) -> impl Iterator<Item = &OperatorRef> + '_ {
        self.operators.iter()
    }

    /// Checks whether this registry is empty.
    pub fn is_empty(&self) -> bool {
        self.expressions.is_empty() && self.operators.is_empty()
    }
}

/// Immutable snapshot of descriptors used to build a single expression tree.
///
/// A set is obtained via [`Context::token_set()`](crate::Context::token_set()) and combines
/// the registries of the context chain with the built-in registry.
#[derive(Debug, Clone, Default)]
pub struct TokenSet {
    expressions: Vec<ExpressionRef>,
    operators: Vec<OperatorRef>,
}

impl TokenSet {
    /// Returns the set of built-in descriptors.
    pub fn builtin() -> Self {
        Self::from_registries([crate::tokens::builtin_registry()])
    }

    pub(crate) fn from_registries<'r>(
        registries: impl IntoIterator<Item = &'r TokenRegistry>,
    ) -> Self {
        let mut set = Self::default();
        for registry in registries {
            set.expressions.extend(registry.expressions.iter().cloned());
            set.operators.extend(registry.operators.iter().cloned());
        }
        set
    }

    /// Iterates over expression descriptors in the lookup order.
    pub fn expressions(&self) -> impl Iterator<Item = &ExpressionRef> + '_ {
        self.expressions.iter()
    }

    /// Iterates over operator descriptors in the lookup order.
    pub fn operators(&self) -> impl Iterator<Item = &OperatorRef> + '_ {
        self.operators.iter()
    }

    /// Finds the first expression descriptor matching the start of the `input`.
    pub(crate) fn find_expression<'a>(
        &self,
        input: InputSpan<'a>,
        scanner: &Scanner<'_>,
    ) -> Result<(InputSpan<'a>, MaybeSpanned<'static, Expr>), ScanError<'a>> {
        for token in &self.expressions {
            match with_span(|input| token.scan(input, scanner))(input) {
                Ok(output) => return Ok(output),
                Err(nom::Err::Failure(err)) => return Err(err),
                Err(nom::Err::Error(_) | nom::Err::Incomplete(_)) => { /* try the next one */ }
            }
        }
        Err(ScanError::new(input, ErrorKind::NoExpressionMatched))
    }

    /// Finds the first prefix operator matching the start of the `input`.
    pub(crate) fn find_prefix_operator<'a>(
        &self,
        input: InputSpan<'a>,
        scanner: &Scanner<'_>,
    ) -> Result<Option<(InputSpan<'a>, ScannedOperator)>, ScanError<'a>> {
        let prefix_ops = self.operators.iter().filter(|op| is_prefix(op.as_ref()));
        match Self::find_in(prefix_ops, input, scanner) {
            Ok(output) => Ok(Some(output)),
            Err(err) if matches!(err.kind(), ErrorKind::NoOperatorMatched) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Finds the first infix or postfix operator matching the start of the `input`.
    pub(crate) fn find_operator<'a>(
        &self,
        input: InputSpan<'a>,
        scanner: &Scanner<'_>,
    ) -> Result<(InputSpan<'a>, ScannedOperator), ScanError<'a>> {
        let ops = self.operators.iter().filter(|op| !is_prefix(op.as_ref()));
        Self::find_in(ops, input, scanner)
    }

    fn find_in<'o, 'a>(
        ops: impl Iterator<Item = &'o OperatorRef>,
        input: InputSpan<'a>,
        scanner: &Scanner<'_>,
    ) -> Result<(InputSpan<'a>, ScannedOperator), ScanError<'a>> {
        let mut misplaced = None;
        for op in ops {
            match with_span(|input| op.scan(input, scanner))(input) {
                Ok((rest, span)) => {
                    if op.is_allowed_in(scanner.grouping()) {
                        let scanned = ScannedOperator {
                            op: Arc::clone(op),
                            span: span.with_no_extra(),
                        };
                        return Ok((rest, scanned));
                    }
                    misplaced.get_or_insert_with(|| op.symbol().to_owned());
                }
                Err(nom::Err::Failure(err)) => return Err(err),
                Err(nom::Err::Error(_) | nom::Err::Incomplete(_)) => { /* try the next one */ }
            }
        }

        let kind = match misplaced {
            Some(symbol) => ErrorKind::MisplacedOperator { symbol },
            None => ErrorKind::NoOperatorMatched,
        };
        Err(ScanError::new(input, kind))
    }
}

/// Operator matched by a [`TokenSet`] together with its span.
#[derive(Debug, Clone)]
pub(crate) struct ScannedOperator {
    pub op: OperatorRef,
    pub span: MaybeSpanned<'static>,
}
