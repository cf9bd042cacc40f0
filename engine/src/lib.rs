//! Embeddable interpreter for math expressions over complex scalars and matrices
//! with a grammar extensible at runtime.
//!
//! # How it works
//!
//! 1. An input string is wrapped into a [`Query`]. A trailing `;` marks the query as muted.
//! 2. The query is parsed into an expression tree ([`SpannedExpr`]) by a two-stack
//!   operator-precedence builder. The builder is driven by *descriptors* from a [`TokenSet`]:
//!   expression descriptors recognize operands (number literals, symbols and calls,
//!   parenthesized groups, matrix literals), and operator descriptors recognize prefix,
//!   infix and postfix operators with their precedence level and associativity.
//! 3. The tree is evaluated by an [`Interpreter`] against a [`Context`] and an optional
//!   [`Symbols`] overlay. Symbols are resolved at the point of use; assignments bind variables
//!   in the context.
//!
//! Descriptors, functions and constants can be added to a [`Context`] at runtime, either
//! one by one or in bundles via [`Plugin`]s. Contexts form a parent chain; definitions in a child
//! shadow those in its ancestors.
//!
//! # Values
//!
//! A [`Value`] is a complex [`Scalar`] (possibly the *missing* sentinel), a [`Matrix`]
//! of scalars, or an opaque host value. Computations stay on the real fast path while
//! possible: `sqrt(4)` is real, `sqrt(-4)` is complex. Division by zero follows IEEE 754.
//!
//! # Crate features
//!
//! - `serde`: enables (de)serialization of values and context [`Snapshot`]s.
//!
//! # Examples
//!
//! ```
//! use mathexpr::{Context, ErrorKind, Symbols, Value};
//!
//! # fn main() -> anyhow::Result<()> {
//! let context = Context::with_prelude();
//! let no_symbols = Symbols::new();
//!
//! assert_eq!(mathexpr::evaluate(&context, "1 + 2 * 3", &no_symbols)?, Value::real(7.0));
//! assert_eq!(mathexpr::evaluate(&context, "2 ^ 3 ^ 2", &no_symbols)?, Value::real(512.0));
//!
//! mathexpr::evaluate(&context, "a = [1, 2; 3, 4];", &no_symbols)?;
//! let sum = mathexpr::evaluate(&context, "a + a", &no_symbols)?;
//! assert_eq!(sum, mathexpr::evaluate(&context, "[2, 4; 6, 8]", &no_symbols)?);
//!
//! let err = mathexpr::evaluate(&context, "a * [1, 2, 3]", &no_symbols).unwrap_err();
//! assert!(matches!(err.kind(), ErrorKind::Arithmetic(_)));
//! assert_eq!(err.snippet(), Some("a * [1, 2, 3]"));
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc(html_root_url = "https://docs.rs/mathexpr/0.1.0")]
#![warn(missing_docs, missing_debug_implementations)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::module_name_repetitions
)]

pub use crate::{
    context::{Context, Snapshot, Symbols, LAST_RESULT},
    error::{ArithmeticError, Error, ErrorKind, EvalResult, RegistrationError, ScanError},
    extension::{Extension, ExtensionSet, Plugin},
    parser::Scanner,
    query::{evaluate, Interpreter, Query},
    registry::TokenSet,
    spans::{CodeFragment, InputSpan, LocatedSpan, MaybeSpanned, NomResult, Spanned, StripCode},
    tree::{Expr, Outline, SpannedExpr},
    values::{BinaryOp, Matrix, Op, OpaqueRef, Scalar, UnaryOp, Value, ValueType},
    worker::{evaluate_async, spawn_query, QueryHandle},
};

mod context;
mod error;
mod extension;
pub mod fns;
mod parser;
mod query;
pub mod registry;
mod spans;
pub mod tokens;
mod tree;
mod values;
mod worker;

