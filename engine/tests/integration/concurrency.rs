//! Tests for sharing contexts among threads.

use static_assertions::assert_impl_all;

use std::{sync::Arc, thread};

use mathexpr::{Context, Query, QueryHandle, Symbols, TokenSet, Value};

assert_impl_all!(Context<'static>: Send, Sync);
assert_impl_all!(Value: Send, Sync, Clone);
assert_impl_all!(Symbols: Send, Sync);
assert_impl_all!(TokenSet: Send, Sync);
assert_impl_all!(Query: Send);
assert_impl_all!(QueryHandle: Send);
assert_impl_all!(mathexpr::Error: Send, Sync, std::error::Error);

#[test]
fn scoped_threads_share_context() {
    let context = Context::with_prelude();
    context.bind_variable("base", Value::real(10.0));

    let results: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let context = &context;
                scope.spawn(move || {
                    let symbols = Symbols::new().with("i", f64::from(i));
                    mathexpr::evaluate(context, "base + i", &symbols).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    });

    let expected: Vec<_> = (0..4).map(|i| Value::real(10.0 + f64::from(i))).collect();
    assert_eq!(results, expected);
}

#[test]
fn concurrent_assignments_are_not_lost() {
    let context = Arc::new(Context::new());
    context.bind_variable("counter", Value::real(0.0));

    let handles: Vec<_> = (0..16)
        .map(|i| mathexpr::spawn_query(context.clone(), format!("v{i} = {i}"), Symbols::new()))
        .collect::<Result<_, _>>()
        .unwrap();
    for handle in handles {
        let query = handle.join();
        assert!(query.outcome().unwrap().is_ok(), "{query:?}");
    }

    let variables = context.variables();
    assert_eq!(variables.len(), 17);
    assert_eq!(context.resolve("v7", &Symbols::new()), Value::real(7.0));
}

#[test]
fn async_evaluation_with_callback() {
    let context = Arc::new(Context::with_prelude());
    let (sender, receiver) = std::sync::mpsc::channel();
    mathexpr::evaluate_async(context.clone(), "max([3, 1, 2])", Symbols::new(), move |query| {
        let value = query.into_outcome().unwrap().unwrap();
        sender.send(value).unwrap();
    })
    .unwrap()
    .join()
    .unwrap();

    assert_eq!(receiver.recv().unwrap(), Value::real(3.0));
    assert_eq!(context.last_result(), Some(Value::real(3.0)));
}
