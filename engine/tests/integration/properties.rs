//! Property-based tests for parsing and evaluation.

use proptest::prelude::*;

use mathexpr::{
    fns::FromValueErrorKind, registry::FnOperator, ArithmeticError, Context, ErrorKind, Expr,
    Symbols, TokenSet, Value,
};

/// Generates expressions built from small integers, symbols and arithmetic operators.
fn expression() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![
        (0_u32..100).prop_map(|x| x.to_string()),
        prop::sample::select(vec!["x", "y", "zeta", "a_1"]).prop_map(str::to_owned),
    ];
    leaf.prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            (
                inner.clone(),
                prop::sample::select(vec!["+", "-", "*", "/", "^", ".*", "=="]),
                inner.clone()
            )
                .prop_map(|(lhs, op, rhs)| format!("{lhs} {op} {rhs}")),
            inner.clone().prop_map(|expr| format!("({expr})")),
            inner.clone().prop_map(|expr| format!("-{expr}")),
            (inner.clone(), inner).prop_map(|(x, y)| format!("f({x}, {y})")),
        ]
    })
}

/// Number literals including ones too large to be used as sizes or range bounds.
fn large_literal() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        "0", "3", "1e3", "65536", "4e9", "1e12", "2^40", "2^53", "1e16", "-1e300", "1e308",
    ])
}

/// Generates calls of matrix constructors and ranges with possibly huge sizes.
fn sized_expression() -> impl Strategy<Value = String> {
    let constructor = prop::sample::select(vec!["zeros", "ones", "eye"]);
    prop_oneof![
        (constructor.clone(), large_literal()).prop_map(|(name, n)| format!("{name}({n})")),
        (constructor, large_literal(), large_literal())
            .prop_map(|(name, rows, cols)| format!("{name}({rows}, {cols})")),
        (large_literal(), large_literal()).prop_map(|(start, end)| format!("{start}:{end}")),
        (large_literal(), 0_u8..8).prop_map(|(start, len)| format!("{start}:{start}+{len}")),
    ]
}

fn root_operator(tree: &Expr) -> Option<&str> {
    match tree {
        Expr::Binary { op, .. } => Some(op.symbol()),
        _ => None,
    }
}

fn add_values(lhs: Value, rhs: Value) -> Result<Value, ErrorKind> {
    lhs.binary_op(mathexpr::BinaryOp::Add, rhs).map_err(ErrorKind::from)
}

proptest! {
    #[test]
    fn arbitrary_input_does_not_panic(input in "[0-9a-z+*/^()\\[\\];,.:'! -]{0,24}") {
        let context = Context::new();
        let _ = mathexpr::evaluate(&context, &input, &Symbols::new());
    }

    #[test]
    fn huge_sizes_produce_typed_errors(input in sized_expression()) {
        let context = Context::with_prelude();
        match mathexpr::evaluate(&context, &input, &Symbols::new()) {
            Ok(value) => {
                let (rows, cols) = value.dims().unwrap();
                prop_assert!(rows * cols <= mathexpr::Matrix::MAX_ELEMENTS);
            }
            Err(err) => {
                let is_expected = matches!(
                    err.kind(),
                    ErrorKind::Arithmetic(
                        ArithmeticError::TooManyElements { .. } | ArithmeticError::ImpreciseRange
                    )
                ) || matches!(
                    err.kind(),
                    ErrorKind::Wrapper(err) if *err.kind() == FromValueErrorKind::NotCount
                );
                prop_assert!(is_expected, "{}: {}", input, err);
            }
        }
    }

    #[test]
    fn precedence_of_custom_operators(
        first_level in 0_i32..12,
        second_level in 0_i32..12,
        first_rtl: bool,
        second_rtl: bool,
    ) {
        let context = Context::new();
        let mut first = FnOperator::binary("@", first_level, add_values);
        if first_rtl {
            first = first.right_to_left();
        }
        let mut second = FnOperator::binary("#", second_level, add_values);
        if second_rtl {
            second = second.right_to_left();
        }
        context.register_operator(first);
        context.register_operator(second);
        let tokens = context.token_set();

        let tree = tokens.build_tree("x @ y # z").unwrap().extra;
        let expected_root = match first_level.cmp(&second_level) {
            core::cmp::Ordering::Greater => "#",
            core::cmp::Ordering::Less => "@",
            core::cmp::Ordering::Equal if second_rtl => "@",
            core::cmp::Ordering::Equal => "#",
        };
        prop_assert_eq!(root_operator(&tree), Some(expected_root));

        let tree = tokens.build_tree("x @ y @ z").unwrap().extra;
        let Expr::Binary { lhs, rhs, .. } = &tree else {
            return Err(TestCaseError::fail(format!("unexpected tree: {tree:?}")));
        };
        if first_rtl {
            prop_assert_eq!(rhs.extra.as_symbol(), None);
            prop_assert_eq!(lhs.extra.as_symbol(), Some("x"));
        } else {
            prop_assert_eq!(lhs.extra.as_symbol(), None);
            prop_assert_eq!(rhs.extra.as_symbol(), Some("z"));
        }
    }

    #[test]
    fn printed_tree_parses_back(input in expression()) {
        let tokens = TokenSet::builtin();
        let tree = tokens.build_tree(&input).unwrap();
        let printed = tree.extra.to_string();
        let reparsed = tokens.build_tree(&printed).unwrap();
        prop_assert_eq!(&tree.extra, &reparsed.extra, "printed: {}", printed);
    }

    #[test]
    fn integer_arithmetic_matches_native(
        x in -1_000_i32..1_000,
        y in -1_000_i32..1_000,
        z in -1_000_i32..1_000,
    ) {
        let context = Context::new();
        let symbols = Symbols::new().with("x", f64::from(x)).with("y", f64::from(y));
        let input = format!("x + y * ({z})");
        let value = mathexpr::evaluate(&context, &input, &symbols).unwrap();
        let expected = f64::from(x) + f64::from(y) * f64::from(z);
        prop_assert_eq!(value, Value::real(expected));

        let input = format!("x - y - ({z})");
        let value = mathexpr::evaluate(&context, &input, &symbols).unwrap();
        prop_assert_eq!(value, Value::real(f64::from(x) - f64::from(y) - f64::from(z)));
    }

    #[test]
    fn overlay_wins_over_context(bound in -100.0_f64..100.0, overlay in -100.0_f64..100.0) {
        let context = Context::new();
        context.bind_variable("v", Value::real(bound));
        let symbols = Symbols::new().with("v", overlay);
        let value = mathexpr::evaluate(&context, "v", &symbols).unwrap();
        prop_assert_eq!(value, Value::real(overlay));
        prop_assert_eq!(context.resolve("v", &Symbols::new()), Value::real(bound));
    }

    #[test]
    fn evaluation_is_deterministic(input in expression()) {
        let symbols = Symbols::new()
            .with("x", 2.0)
            .with("y", -3.0)
            .with("zeta", 0.5)
            .with("a_1", 7.0);
        let context = Context::new();
        context.register_function("f", mathexpr::fns::wrap(|x: f64, y: f64| x.max(y)));
        let first = mathexpr::evaluate(&context, &input, &symbols);
        let second = mathexpr::evaluate(&context, &input, &symbols);
        match (first, second) {
            (Ok(first), Ok(second)) => {
                prop_assert_eq!(first.to_string(), second.to_string());
            }
            (Err(first), Err(second)) => {
                prop_assert_eq!(first.to_string(), second.to_string());
            }
            (first, second) => {
                prop_assert!(false, "outcomes differ: {:?} vs {:?}", first, second);
            }
        }
    }
}
