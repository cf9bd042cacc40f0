//! Queries and the tree-walking interpreter.

use crate::{
    context::{Context, Symbols, LAST_RESULT},
    error::{Error, ErrorKind, EvalResult},
    fns::{Arity, CallContext, SpannedValue},
    registry::{Assignment, OperatorRef, TokenSet},
    tree::{Expr, SpannedExpr},
    values::{Matrix, Scalar, Value},
};

/// Single unit of evaluation: an input string together with its parse tree
/// and evaluation outcome.
///
/// A trailing `;` marks the query as *muted*: hosts are expected not to display
/// its result. The `;` is removed from the [normalized](Self::normalized()) input.
///
/// # Examples
///
/// ```
/// use mathexpr::{Context, Query, Symbols, Value};
///
/// let context = Context::with_prelude();
/// let mut query = Query::new("x = 2 + 3;");
/// assert!(query.is_muted());
/// assert_eq!(query.normalized(), "x = 2 + 3");
/// assert_eq!(*query.evaluate(&context, &Symbols::new()).unwrap(), Value::real(5.0));
///
/// let mut query = Query::new("x ^ 2");
/// query.evaluate(&context, &Symbols::new()).unwrap();
/// assert_eq!(context.last_result(), Some(Value::real(25.0)));
/// ```
#[derive(Debug)]
pub struct Query {
    input: String,
    normalized: String,
    muted: bool,
    tree: Option<SpannedExpr>,
    outcome: Option<EvalResult>,
}

impl Query {
    /// Creates a query from the input string.
    pub fn new(input: impl Into<String>) -> Self {
        let input = input.into();
        let trimmed = input.trim_end();
        let (normalized, muted) = match trimmed.strip_suffix(';') {
            Some(stripped) => (stripped.trim_end().to_owned(), true),
            None => (trimmed.to_owned(), false),
        };
        Self {
            input,
            normalized,
            muted,
            tree: None,
            outcome: None,
        }
    }

    pub(crate) fn failed(input: impl Into<String>, error: ErrorKind) -> Self {
        let mut query = Self::new(input);
        let error = Error::unspanned(error).with_input(&query.input);
        query.outcome = Some(Err(error));
        query
    }

    /// Returns the original input.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Returns the normalized input with trailing whitespace and the mute marker removed.
    /// Spans in parse trees and errors refer to this string, which is a prefix
    /// of the original input.
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// Checks whether this query is muted.
    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Returns the cached parse tree, if the query was parsed.
    pub fn tree(&self) -> Option<&SpannedExpr> {
        self.tree.as_ref()
    }

    /// Returns the evaluation outcome, if the query was evaluated.
    pub fn outcome(&self) -> Option<Result<&Value, &Error>> {
        self.outcome.as_ref().map(Result::as_ref)
    }

    /// Converts this query into the evaluation outcome.
    pub fn into_outcome(self) -> Option<EvalResult> {
        self.outcome
    }

    /// Parses the query using the provided tokens. The tree is cached; repeated calls
    /// return the cached tree regardless of `tokens`.
    ///
    /// # Errors
    ///
    /// Returns a parsing error if the input cannot be parsed. An empty input is
    /// an error as well.
    pub fn build_tree(&mut self, tokens: &TokenSet) -> Result<&SpannedExpr, Error> {
        if self.tree.is_none() {
            let tree = tokens
                .build_tree(&self.normalized)
                .map_err(|err| err.with_input(&self.normalized))?;
            self.tree = Some(tree);
        }
        self.tree
            .as_ref()
            .ok_or_else(|| Error::unspanned(ErrorKind::NoExpressionMatched))
    }

    /// Evaluates this query in the `context` with the `symbols` overlay and records
    /// the outcome.
    ///
    /// An empty query evaluates to the missing value. A successful non-assignment query
    /// with a numeric result binds the result to `$` in the `context`.
    ///
    /// # Errors
    ///
    /// Returns a parsing or evaluation error. The error has the normalized input attached.
    pub fn evaluate(
        &mut self,
        context: &Context<'_>,
        symbols: &Symbols,
    ) -> Result<&Value, &Error> {
        tracing::debug!(input = %self.normalized, muted = self.muted, "evaluating query");
        let outcome = self
            .run(context, symbols)
            .map_err(|err| err.with_input(&self.normalized));
        match &outcome {
            Ok(value) => tracing::debug!(%value, "query evaluated"),
            Err(err) => tracing::debug!(%err, "query failed"),
        }
        self.outcome.insert(outcome).as_ref()
    }

    fn run(&mut self, context: &Context<'_>, symbols: &Symbols) -> EvalResult {
        if self.normalized.trim().is_empty() {
            return Ok(Value::missing());
        }

        let tree = match self.tree.take() {
            Some(tree) => tree,
            None => context.token_set().build_tree(&self.normalized)?,
        };
        let outcome = Interpreter::new(context, symbols).evaluate(&tree);
        if let Ok(value) = &outcome {
            if !tree.extra.is_assignment() && value.is_numeric() {
                context.bind_variable(LAST_RESULT, value.clone());
            }
        }
        self.tree = Some(tree);
        outcome
    }
}

/// Parses and evaluates `input` in the `context`.
///
/// # Errors
///
/// Returns a parsing or evaluation error.
///
/// # Examples
///
/// ```
/// use mathexpr::{Context, Symbols, Value};
///
/// # fn main() -> anyhow::Result<()> {
/// let context = Context::with_prelude();
/// let value = mathexpr::evaluate(&context, "1 + 2 * 3", &Symbols::new())?;
/// assert_eq!(value, Value::real(7.0));
///
/// let symbols = Symbols::new().with("x", 0.5);
/// let value = mathexpr::evaluate(&context, "2 * x", &symbols)?;
/// assert_eq!(value, Value::real(1.0));
/// # Ok(())
/// # }
/// ```
pub fn evaluate(context: &Context<'_>, input: &str, symbols: &Symbols) -> EvalResult {
    let mut query = Query::new(input);
    // The outcome is retrieved below.
    let _ = query.evaluate(context, symbols);
    query
        .into_outcome()
        .unwrap_or_else(|| Ok(Value::missing()))
}

/// Tree-walking interpreter.
///
/// Assignments bind variables in the context the interpreter was created with.
/// Symbols are resolved at the point of use; the interpreter does not hold context locks
/// while evaluating subtrees or calling functions.
#[derive(Debug)]
pub struct Interpreter<'r, 'c> {
    context: &'r Context<'c>,
    symbols: &'r Symbols,
}

impl<'r, 'c> Interpreter<'r, 'c> {
    /// Creates an interpreter.
    pub fn new(context: &'r Context<'c>, symbols: &'r Symbols) -> Self {
        Self { context, symbols }
    }

    /// Evaluates the tree.
    ///
    /// # Errors
    ///
    /// Returns an evaluation error spanning the offending subtree.
    pub fn evaluate(&self, expr: &SpannedExpr) -> EvalResult {
        let error = |kind| Error::new(kind, expr.with_no_extra());

        match &expr.extra {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Symbol(name) => self
                .context
                .lookup(name, self.symbols)
                .ok_or_else(|| error(ErrorKind::UndefinedSymbol(name.clone()))),
            Expr::Group(inner) => self.evaluate(inner),
            Expr::Matrix(None) => Ok(Value::matrix(Matrix::default())),
            Expr::Matrix(Some(inner)) => {
                let value = self.evaluate(inner)?;
                if value.is_numeric() {
                    Ok(value)
                } else {
                    Err(error(ErrorKind::native("matrix elements must be numeric")))
                }
            }
            Expr::Call { name, args } => self.evaluate_call(expr, name, args),
            Expr::Unary { op, operand } => {
                let operand = self.evaluate(operand)?;
                op.apply_unary(operand).map_err(error)
            }
            Expr::Binary { op, lhs, rhs } => {
                if let Some(assignment) = op.assignment() {
                    return self.evaluate_assignment(op, assignment, lhs, rhs);
                }
                let lhs = self.evaluate(lhs)?;
                let rhs = self.evaluate(rhs)?;
                op.apply(lhs, rhs).map_err(error)
            }
        }
    }

    fn evaluate_assignment(
        &self,
        op: &OperatorRef,
        assignment: Assignment,
        lhs: &SpannedExpr,
        rhs: &SpannedExpr,
    ) -> EvalResult {
        let Some(name) = lhs.extra.as_symbol() else {
            return Err(Error::new(ErrorKind::InvalidAssignment, lhs.with_no_extra()));
        };

        let current = match assignment {
            Assignment::Plain => Value::missing(),
            Assignment::Compound => self.context.lookup(name, self.symbols).ok_or_else(|| {
                Error::new(ErrorKind::UndefinedSymbol(name.to_owned()), lhs.with_no_extra())
            })?,
        };
        let rhs_value = self.evaluate(rhs)?;
        let span = crate::spans::unite_spans(lhs, rhs);
        let value = op
            .apply(current, rhs_value)
            .map_err(|kind| Error::new(kind, span))?;

        tracing::trace!(name, %value, "assigned variable");
        self.context.bind_variable(name, value.clone());
        Ok(value)
    }

    fn evaluate_call(&self, expr: &SpannedExpr, name: &str, args: &[SpannedExpr]) -> EvalResult {
        if let Some(value) = self.context.lookup(name, self.symbols) {
            if value.is_numeric() {
                return self.index(expr, name, value, args);
            }
        }

        let overloads = self.context.find_function(name).ok_or_else(|| {
            Error::new(ErrorKind::UndefinedFunction(name.to_owned()), expr.with_no_extra())
        })?;
        let args = args
            .iter()
            .map(|arg| Ok(arg.copy_with_extra(self.evaluate(arg)?)))
            .collect::<Result<Vec<SpannedValue>, Error>>()?;
        let function = overloads
            .resolve(name, &args)
            .map_err(|kind| Error::new(kind, expr.with_no_extra()))?;

        let mut call_context = CallContext::new(name, expr.with_no_extra(), self.context);
        function.evaluate(args, &mut call_context)
    }

    /// Indexes a numeric value with 1-based linear or row / column indices.
    fn index(
        &self,
        expr: &SpannedExpr,
        name: &str,
        value: Value,
        args: &[SpannedExpr],
    ) -> EvalResult {
        let indices = args
            .iter()
            .map(|arg| {
                let index = self.evaluate(arg)?;
                index
                    .as_scalar()
                    .and_then(Scalar::as_one_based_index)
                    .ok_or_else(|| Error::new(ErrorKind::InvalidIndex, arg.with_no_extra()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let matrix = value.into_matrix().unwrap_or_default();
        let out_of_bounds = |index: usize, len: usize, arg: &SpannedExpr| {
            Error::new(
                ErrorKind::IndexOutOfBounds {
                    index: index + 1,
                    len,
                },
                arg.with_no_extra(),
            )
        };

        let element = match (indices.as_slice(), args) {
            ([index], [arg]) => matrix
                .get_linear(*index)
                .ok_or_else(|| out_of_bounds(*index, matrix.len(), arg))?,
            ([row, col], [row_arg, col_arg]) => {
                if *row >= matrix.rows() {
                    return Err(out_of_bounds(*row, matrix.rows(), row_arg));
                }
                matrix
                    .get(*row, *col)
                    .ok_or_else(|| out_of_bounds(*col, matrix.cols(), col_arg))?
            }
            _ => {
                let kind = ErrorKind::ArgsLenMismatch {
                    name: name.to_owned(),
                    def: Arity::Exact(2),
                    call: args.len(),
                };
                return Err(Error::new(kind, expr.with_no_extra()));
            }
        };
        Ok(Value::Scalar(element))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::{fns, ArithmeticError};

    fn eval(context: &Context<'_>, input: &str) -> EvalResult {
        evaluate(context, input, &Symbols::new())
    }

    #[test]
    fn query_normalization() {
        let query = Query::new("  1 + 2 ;  ");
        assert!(query.is_muted());
        assert_eq!(query.normalized(), "  1 + 2");
        assert_eq!(query.input(), "  1 + 2 ;  ");

        let query = Query::new("1 + 2");
        assert!(!query.is_muted());
        assert_eq!(query.normalized(), "1 + 2");
    }

    #[test]
    fn empty_query_is_missing() {
        let context = Context::new();
        for input in ["", "   ", ";"] {
            let value = eval(&context, input).unwrap();
            assert!(value.is_missing(), "{input}");
        }
        assert_eq!(context.last_result(), None);
    }

    #[test]
    fn last_result_is_bound() {
        let context = Context::new();
        assert_eq!(eval(&context, "3 + 4").unwrap(), Value::real(7.0));
        assert_eq!(eval(&context, "$ * 2").unwrap(), Value::real(14.0));
        assert_eq!(context.last_result(), Some(Value::real(14.0)));

        eval(&context, "x = 1").unwrap();
        assert_eq!(context.last_result(), Some(Value::real(14.0)));
        eval(&context, "1 +").unwrap_err();
        assert_eq!(context.last_result(), Some(Value::real(14.0)));
    }

    #[test]
    fn parenthesized_assignment_keeps_last_result() {
        let context = Context::new();
        eval(&context, "2 + 3").unwrap();
        assert_eq!(eval(&context, "(x = 1)").unwrap(), Value::real(1.0));
        assert_eq!(eval(&context, "((y = 2))").unwrap(), Value::real(2.0));
        assert_eq!(context.last_result(), Some(Value::real(5.0)));

        // An assignment nested in a larger expression does not make the query an assignment.
        assert_eq!(eval(&context, "(z = 1) + 1").unwrap(), Value::real(2.0));
        assert_eq!(context.last_result(), Some(Value::real(2.0)));
    }

    #[test]
    fn assignments() {
        let context = Context::new();
        assert_eq!(eval(&context, "a = 5").unwrap(), Value::real(5.0));
        assert_eq!(eval(&context, "a + 1").unwrap(), Value::real(6.0));
        assert_eq!(eval(&context, "a += 2").unwrap(), Value::real(7.0));
        assert_eq!(eval(&context, "b = c = 2").unwrap(), Value::real(2.0));
        assert_eq!(context.resolve("c", &Symbols::new()), Value::real(2.0));

        let err = eval(&context, "1 = 2").unwrap_err();
        assert_matches!(err.kind(), ErrorKind::InvalidAssignment);
        assert_eq!(err.location().range(), 0..1);

        let err = eval(&context, "z *= 2").unwrap_err();
        assert_matches!(err.kind(), ErrorKind::UndefinedSymbol(name) if name == "z");
    }

    #[test]
    fn overlay_takes_precedence_and_is_not_mutated() {
        let context = Context::new();
        context.bind_variable("x", Value::real(1.0));
        let symbols = Symbols::new().with("x", 10.0);
        let value = evaluate(&context, "x + 1", &symbols).unwrap();
        assert_eq!(value, Value::real(11.0));

        evaluate(&context, "x = x * 2", &symbols).unwrap();
        assert_eq!(symbols.get("x"), Some(&Value::real(10.0)));
        assert_eq!(context.resolve("x", &Symbols::new()), Value::real(20.0));
    }

    #[test]
    fn undefined_symbols_and_functions() {
        let context = Context::new();
        let err = eval(&context, "1 + y").unwrap_err();
        assert_matches!(err.kind(), ErrorKind::UndefinedSymbol(name) if name == "y");
        assert_eq!(err.location().range(), 4..5);
        assert_eq!(err.input(), Some("1 + y"));

        let err = eval(&context, "f(1)").unwrap_err();
        assert_matches!(err.kind(), ErrorKind::UndefinedFunction(name) if name == "f");
    }

    #[test]
    fn indexing() {
        let context = Context::new();
        eval(&context, "m = [1, 2; 3, 4]").unwrap();
        assert_eq!(eval(&context, "m(2)").unwrap(), Value::real(3.0));
        assert_eq!(eval(&context, "m(1, 2)").unwrap(), Value::real(2.0));
        assert_eq!(eval(&context, "m(2, 2) + m(1)").unwrap(), Value::real(5.0));

        let err = eval(&context, "m(5)").unwrap_err();
        assert_matches!(err.kind(), ErrorKind::IndexOutOfBounds { index: 5, len: 4 });
        let err = eval(&context, "m(1, 3)").unwrap_err();
        assert_matches!(err.kind(), ErrorKind::IndexOutOfBounds { index: 3, len: 2 });
        let err = eval(&context, "m(0.5)").unwrap_err();
        assert_matches!(err.kind(), ErrorKind::InvalidIndex);
        let err = eval(&context, "m(1, 1, 1)").unwrap_err();
        assert_matches!(err.kind(), ErrorKind::ArgsLenMismatch { call: 3, .. });
    }

    #[test]
    fn variables_shadow_functions() {
        let context = Context::new();
        context.register_function("f", fns::wrap(|x: f64| x * 10.0));
        assert_eq!(eval(&context, "f(2)").unwrap(), Value::real(20.0));
        context.bind_variable("f", Value::real(7.0));
        assert_eq!(eval(&context, "f(1)").unwrap(), Value::real(7.0));
    }

    #[test]
    fn arithmetic_errors_span_operation() {
        let context = Context::new();
        let err = eval(&context, "[1, 2] + [1, 2, 3]").unwrap_err();
        assert_matches!(
            err.kind(),
            ErrorKind::Arithmetic(ArithmeticError::DimensionMismatch { .. })
        );
        assert_eq!(err.location().range(), 0..18);
    }

    #[test]
    fn opaque_values_in_matrices() {
        let context = Context::new();
        context.bind_variable("h", Value::opaque("handle"));
        let err = eval(&context, "[h]").unwrap_err();
        assert_matches!(err.kind(), ErrorKind::NativeCall(_));
        assert_eq!(eval(&context, "[]").unwrap().dims(), Some((0, 0)));
    }

    #[test]
    fn query_caches_tree() {
        let context = Context::new();
        let mut query = Query::new("x + 1");
        let symbols = Symbols::new().with("x", 1.0);
        assert_eq!(*query.evaluate(&context, &symbols).unwrap(), Value::real(2.0));
        assert!(query.tree().is_some());

        let symbols = Symbols::new().with("x", 2.0);
        assert_eq!(*query.evaluate(&context, &symbols).unwrap(), Value::real(3.0));
        assert_matches!(query.outcome(), Some(Ok(_)));
    }
}
