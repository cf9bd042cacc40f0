//! Evaluating queries on background threads.

use std::{
    any::Any,
    io,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    thread::{self, JoinHandle},
};

use crate::{
    context::{Context, Symbols},
    error::ErrorKind,
    query::Query,
};

const THREAD_NAME: &str = "mathexpr-query";

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "evaluation panicked".to_owned()
    }
}

fn run_query(context: &Context<'_>, input: String, symbols: &Symbols) -> Query {
    let mut query = Query::new(input);
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        // The outcome is stored in the query.
        let _ = query.evaluate(context, symbols);
    }));
    match outcome {
        Ok(()) => query,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::warn!(input = query.input(), message = %message, "query evaluation panicked");
            Query::failed(query.input(), ErrorKind::native(message))
        }
    }
}

/// Handle to a query evaluated on a background thread.
#[derive(Debug)]
pub struct QueryHandle {
    input: String,
    inner: JoinHandle<Query>,
}

impl QueryHandle {
    /// Returns the input of the query.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Checks whether the evaluation has finished.
    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }

    /// Waits for the query to finish. A panic during evaluation is converted
    /// to an [`ErrorKind::NativeCall`] error.
    pub fn join(self) -> Query {
        self.inner.join().unwrap_or_else(|payload| {
            let message = panic_message(payload.as_ref());
            Query::failed(self.input, ErrorKind::native(message))
        })
    }
}

/// Evaluates `input` on a new thread and returns a handle to the evaluated query.
///
/// Assignments in the query are visible in the `context` once evaluation completes.
///
/// # Errors
///
/// Returns an I/O error if the thread cannot be spawned.
///
/// # Examples
///
/// ```
/// use mathexpr::{Context, Symbols, Value};
/// use std::sync::Arc;
///
/// # fn main() -> anyhow::Result<()> {
/// let context = Arc::new(Context::with_prelude());
/// let handle = mathexpr::spawn_query(context.clone(), "x = sqrt(16)", Symbols::new())?;
/// let query = handle.join();
/// assert_eq!(*query.outcome().unwrap().unwrap(), Value::real(4.0));
/// assert_eq!(context.resolve("x", &Symbols::new()), Value::real(4.0));
/// # Ok(())
/// # }
/// ```
pub fn spawn_query(
    context: Arc<Context<'static>>,
    input: impl Into<String>,
    symbols: Symbols,
) -> io::Result<QueryHandle> {
    let input = input.into();
    tracing::debug!(input = %input, "spawning query worker");
    let thread_input = input.clone();
    let inner = thread::Builder::new()
        .name(THREAD_NAME.to_owned())
        .spawn(move || run_query(&context, thread_input, &symbols))?;
    Ok(QueryHandle { input, inner })
}

/// Evaluates `input` on a new thread and passes the evaluated query to `callback`
/// on the same thread.
///
/// # Errors
///
/// Returns an I/O error if the thread cannot be spawned.
pub fn evaluate_async<F>(
    context: Arc<Context<'static>>,
    input: impl Into<String>,
    symbols: Symbols,
    callback: F,
) -> io::Result<JoinHandle<()>>
where
    F: FnOnce(Query) + Send + 'static,
{
    let input = input.into();
    tracing::debug!(input = %input, "spawning query worker with callback");
    thread::Builder::new()
        .name(THREAD_NAME.to_owned())
        .spawn(move || callback(run_query(&context, input, &symbols)))
}
