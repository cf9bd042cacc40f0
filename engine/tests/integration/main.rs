//! Integration tests for the interpreter.

use assert_matches::assert_matches;

use mathexpr::{ArithmeticError, Context, Error, ErrorKind, Matrix, Scalar, Symbols, Value};

mod concurrency;
mod extensions;
mod properties;

fn try_evaluate(context: &Context<'_>, input: &str) -> Result<Value, Error> {
    mathexpr::evaluate(context, input, &Symbols::new())
}

fn evaluate(context: &Context<'_>, input: &str) -> Value {
    try_evaluate(context, input).unwrap_or_else(|err| panic!("failed evaluating `{input}`: {err}"))
}

fn real_matrix<const N: usize>(rows: &[[f64; N]]) -> Value {
    let rows = rows
        .iter()
        .map(|row| row.iter().copied().map(Scalar::real).collect::<Vec<_>>());
    Value::matrix(Matrix::from_rows(rows).unwrap())
}

#[test]
fn precedence_of_arithmetic_ops() {
    let context = Context::new();
    assert_eq!(evaluate(&context, "1 + 2 * 3"), Value::real(7.0));
    assert_eq!(evaluate(&context, "(1 + 2) * 3"), Value::real(9.0));
    assert_eq!(evaluate(&context, "10 - 4 - 3"), Value::real(3.0));
    assert_eq!(evaluate(&context, "2 * 3 / 4"), Value::real(1.5));
    assert_eq!(evaluate(&context, "-2 ^ 2"), Value::real(-4.0));
    assert_eq!(evaluate(&context, "2 ^ -1"), Value::real(0.5));
    assert_eq!(evaluate(&context, "1 + 2 == 3"), Value::real(1.0));
    assert_eq!(evaluate(&context, "3! + 1"), Value::real(7.0));
}

#[test]
fn power_is_right_associative() {
    let context = Context::new();
    assert_eq!(evaluate(&context, "2 ^ 3 ^ 2"), Value::real(512.0));
    assert_eq!(evaluate(&context, "(2 ^ 3) ^ 2"), Value::real(64.0));
}

#[test]
fn muted_assignment_then_use() {
    let context = Context::new();
    let mut query = mathexpr::Query::new("a = 5;");
    assert!(query.is_muted());
    query.evaluate(&context, &Symbols::new()).unwrap();
    assert_eq!(evaluate(&context, "a + 1"), Value::real(6.0));
}

#[test]
fn matrix_arithmetic() {
    let context = Context::new();
    let sum = evaluate(&context, "[1, 2; 3, 4] + [1, 1; 1, 1]");
    assert_eq!(sum, real_matrix(&[[2.0, 3.0], [4.0, 5.0]]));

    let product = evaluate(&context, "[1, 2; 3, 4] * [1; 1]");
    assert_eq!(product, real_matrix(&[[3.0], [7.0]]));

    let elementwise = evaluate(&context, "[1 2 3] .* [4 5 6]");
    assert_eq!(elementwise, real_matrix(&[[4.0, 10.0, 18.0]]));

    let transposed = evaluate(&context, "[1 + 1i, 2]'");
    assert_eq!(transposed.dims(), Some((2, 1)));
    let first = transposed.into_matrix().unwrap().get(0, 0).unwrap();
    assert_eq!(first, Scalar::complex(1.0, -1.0));

    let range = evaluate(&context, "1:4");
    assert_eq!(range, real_matrix(&[[1.0, 2.0, 3.0, 4.0]]));
    let concat = evaluate(&context, "[[1, 2], 3; 4:6]");
    assert_eq!(concat, real_matrix(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]));
}

#[test]
fn dimension_mismatch() {
    let context = Context::new();
    let err = try_evaluate(&context, "[1, 2] + [1, 2, 3]").unwrap_err();
    assert_matches!(
        err.kind(),
        ErrorKind::Arithmetic(ArithmeticError::DimensionMismatch { lhs: (1, 2), rhs: (1, 3), .. })
    );
    assert_eq!(err.snippet(), Some("[1, 2] + [1, 2, 3]"));
}

#[test]
fn last_result_chaining() {
    let context = Context::new();
    assert_eq!(evaluate(&context, "3 + 4"), Value::real(7.0));
    assert_eq!(evaluate(&context, "$ * 2"), Value::real(14.0));
}

#[test]
fn complex_numbers() {
    let context = Context::with_prelude();
    assert_eq!(evaluate(&context, "(1 + 2i) * (1 - 2i)"), Value::real(5.0));
    assert_eq!(evaluate(&context, "i * i"), Value::real(-1.0));
    assert_eq!(evaluate(&context, "sqrt(-9)"), Value::complex(0.0, 3.0));
    assert_eq!(evaluate(&context, "1 / 0"), Value::real(f64::INFINITY));
}

#[test]
fn parse_errors() {
    let context = Context::new();
    let err = try_evaluate(&context, "1 +").unwrap_err();
    assert_matches!(err.kind(), ErrorKind::DanglingTokens { .. });
    assert!(err.kind().is_parse_error());

    let err = try_evaluate(&context, "(1 + 2").unwrap_err();
    assert_matches!(err.kind(), ErrorKind::UnbalancedBracket { bracket: '(' });

    let err = try_evaluate(&context, "f(1,,2)").unwrap_err();
    assert_matches!(err.kind(), ErrorKind::EmptyArgument);

    let err = try_evaluate(&context, "1 # 2").unwrap_err();
    assert_matches!(err.kind(), ErrorKind::NoOperatorMatched);
    assert_eq!(err.location().range().start, 2);
}

#[test]
fn function_errors() {
    let context = Context::with_prelude();
    let err = try_evaluate(&context, "sin()").unwrap_err();
    assert_matches!(err.kind(), ErrorKind::ArgsLenMismatch { call: 0, .. });

    context.bind_variable("handle", Value::opaque(1_u8));
    let err = try_evaluate(&context, "sin(handle)").unwrap_err();
    assert_matches!(
        err.kind(),
        ErrorKind::NoMatchingOverload { name, .. } if name == "sin"
    );
    assert_eq!(err.location().range(), 0..11);
}

#[test]
fn child_context_sees_parent_definitions() {
    let root = Context::with_prelude();
    evaluate(&root, "x = 3");
    let child = root.child();
    assert_eq!(evaluate(&child, "x = x + cos(0)"), Value::real(4.0));
    assert_eq!(evaluate(&root, "x"), Value::real(3.0));
    assert_eq!(evaluate(&child, "x"), Value::real(4.0));
}

#[test]
fn oversized_matrices_are_rejected() {
    let context = Context::with_prelude();
    let err = try_evaluate(&context, "1e16:1e16+4").unwrap_err();
    assert_matches!(
        err.kind(),
        ErrorKind::Arithmetic(ArithmeticError::ImpreciseRange)
    );
    assert_eq!(err.location().range(), 0..11);

    let err = try_evaluate(&context, "1:1e12").unwrap_err();
    assert_matches!(
        err.kind(),
        ErrorKind::Arithmetic(ArithmeticError::TooManyElements { .. })
    );

    for input in ["zeros(4e9, 4e9)", "ones(1e5)", "eye(3000)", "(1:3000)' * (1:3000)"] {
        let err = try_evaluate(&context, input).unwrap_err();
        assert_matches!(
            err.kind(),
            ErrorKind::Arithmetic(ArithmeticError::TooManyElements { .. }),
            "{input}"
        );
    }

    assert_eq!(evaluate(&context, "numel(1:1e4)"), Value::real(1e4));
}
