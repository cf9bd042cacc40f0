//! Tests for runtime grammar and function extensions.

use assert_matches::assert_matches;
use nom::{bytes::complete::tag, character::complete::hex_digit1, sequence::preceded};

use mathexpr::{
    fns::{self, CallContext, ParamKind, Signature, SpannedValue},
    registry::{ExpressionToken, FnOperator},
    Context, ErrorKind, EvalResult, Expr, Extension, ExtensionSet, InputSpan, NomResult,
    RegistrationError, ScanError, Scanner, Value,
};

use crate::{evaluate, try_evaluate};

/// Hexadecimal integer literal, such as `0x1F`.
#[derive(Debug)]
struct HexLiteral;

impl ExpressionToken for HexLiteral {
    fn name(&self) -> &str {
        "hex"
    }

    fn scan<'a>(&self, input: InputSpan<'a>, _scanner: &Scanner<'_>) -> NomResult<'a, Expr> {
        let (rest, digits) = preceded(tag("0x"), hex_digit1)(input)?;
        let value = u32::from_str_radix(digits.fragment(), 16).map_err(|err| {
            nom::Err::Failure(ScanError::new(digits, ErrorKind::Literal(err.into())))
        })?;
        Ok((rest, Expr::Literal(Value::real(value.into()))))
    }
}

/// Variadic function counting its arguments.
#[derive(Debug)]
struct Count;

impl fns::Function for Count {
    fn signature(&self) -> Signature {
        Signature::variadic(ParamKind::Any)
    }

    #[allow(clippy::cast_precision_loss)]
    fn evaluate(&self, args: Vec<SpannedValue>, _context: &mut CallContext<'_, '_>) -> EvalResult {
        Ok(Value::real(args.len() as f64))
    }
}

#[test]
fn custom_expression_descriptor() {
    let context = Context::new();
    context.register_expression(HexLiteral);
    assert_eq!(evaluate(&context, "0x1F + 1"), Value::real(32.0));
    assert_eq!(evaluate(&context, "[0x10 0x20]").dims(), Some((1, 2)));
    // Built-in number literals still work.
    assert_eq!(evaluate(&context, "0.5 * 4"), Value::real(2.0));

    let err = try_evaluate(&context, "0x123456789").unwrap_err();
    assert_matches!(err.kind(), ErrorKind::Literal(_));

    assert!(context.remove_expression("hex"));
    assert!(try_evaluate(&context, "0x1F").is_err());
}

#[test]
fn custom_operators() {
    let context = Context::new();
    let modulo = FnOperator::binary("%", 6, |x, y| {
        let (x, y) = (x.as_real().unwrap_or(f64::NAN), y.as_real().unwrap_or(f64::NAN));
        Ok(Value::real(x.rem_euclid(y)))
    });
    context.register_operator(modulo);
    assert_eq!(evaluate(&context, "1 + 7 % 4"), Value::real(4.0));
    assert_eq!(evaluate(&context, "(1 + 7) % 4"), Value::real(0.0));

    let double = FnOperator::postfix("!!", 9, |x| {
        x.binary_op(mathexpr::BinaryOp::Mul, Value::real(2.0))
            .map_err(ErrorKind::from)
    });
    context.register_operator(double);
    // `!!` is registered in the context and thus is tried before the built-in `!`.
    assert_eq!(evaluate(&context, "3!!"), Value::real(6.0));

    let abs = FnOperator::prefix("|", 7, |x| {
        Ok(Value::real(x.as_real().unwrap_or(f64::NAN).abs()))
    });
    context.register_operator(abs);
    assert_eq!(evaluate(&context, "|-3 + 1"), Value::real(4.0));
}

#[test]
fn overriding_builtin_operator() {
    let context = Context::new();
    let saturating_add = FnOperator::binary("+", 5, |x, y| {
        let sum = x.as_real().unwrap_or(f64::NAN) + y.as_real().unwrap_or(f64::NAN);
        Ok(Value::real(sum.min(10.0)))
    });
    context.register_operator(saturating_add);
    assert_eq!(evaluate(&context, "7 + 8"), Value::real(10.0));

    let child = context.child();
    assert_eq!(evaluate(&child, "7 + 8"), Value::real(10.0));
    assert_eq!(evaluate(&Context::new(), "7 + 8"), Value::real(15.0));
}

#[test]
fn function_overloads() {
    let context = Context::new();
    context.register_function("f", fns::wrap(|x: f64| x + 1.0));
    context
        .register_overload("f", fns::wrap(|x: f64, y: f64| x * y))
        .unwrap()
        .register_overload("f", fns::wrap(|m: mathexpr::Matrix| m.len()))
        .unwrap();

    assert_eq!(evaluate(&context, "f(1)"), Value::real(2.0));
    assert_eq!(evaluate(&context, "f(2, 3)"), Value::real(6.0));
    assert_eq!(evaluate(&context, "f([1, 2, 3])"), Value::real(3.0));

    let err = try_evaluate(&context, "f(1, 2, 3)").unwrap_err();
    assert_matches!(err.kind(), ErrorKind::ArgsLenMismatch { call: 3, .. });

    let err = context
        .register_overload("f", fns::wrap(|y: f64| y))
        .unwrap_err();
    assert_matches!(err, RegistrationError::ConflictingSignature { .. });
}

#[test]
fn variadic_functions() {
    let context = Context::new();
    context.register_function("count", Count);
    assert_eq!(evaluate(&context, "count()"), Value::real(0.0));
    assert_eq!(evaluate(&context, "count(1, [2, 3], count(4))"), Value::real(3.0));
}

#[test]
fn native_errors_are_spanned() {
    let context = Context::new();
    context.register_function(
        "checked_sqrt",
        fns::wrap(|x: f64| {
            if x >= 0.0 {
                Ok(x.sqrt())
            } else {
                Err("negative argument".to_owned())
            }
        }),
    );
    let err = try_evaluate(&context, "1 + checked_sqrt(-4)").unwrap_err();
    assert_matches!(err.kind(), ErrorKind::NativeCall(msg) if msg == "negative argument");
    assert_eq!(err.location().range(), 4..20);

    let err = try_evaluate(&context, "1 + checked_sqrt(2i)").unwrap_err();
    assert_matches!(err.kind(), ErrorKind::Wrapper(_));
    assert_eq!(err.location().range(), 17..19);
}

#[test]
fn plugins() {
    let plugin = ExtensionSet::new("physics")
        .with(Extension::constant("g", 9.81))
        .with(Extension::function(
            "fall_time",
            fns::wrap(|height: f64| (2.0 * height / 9.81).sqrt()),
        ))
        .with(Extension::expression(HexLiteral));
    let context = Context::new();
    assert_eq!(context.load(&plugin).unwrap(), 3);

    assert_eq!(evaluate(&context, "g * 2"), Value::real(19.62));
    let time = evaluate(&context, "fall_time(0x0 + 19.62)").as_real().unwrap();
    assert!((time - 2.0).abs() < 1e-12, "{time}");
}

#[test]
fn overlay_symbols_do_not_leak() {
    let context = Context::new();
    let symbols = mathexpr::Symbols::new().with("t", 2.0);
    let value = mathexpr::evaluate(&context, "t * t", &symbols).unwrap();
    assert_eq!(value, Value::real(4.0));
    assert!(context.lookup("t", &mathexpr::Symbols::new()).is_none());
}
