//! Ambient context propagation
//!
//! The current [`LogContext`] lives in a `tokio` task-local slot. A scope
//! installs a context for the dynamic extent of a closure or a future and
//! restores the enclosing one when it ends, so nested scopes follow stack
//! discipline and interleaved tasks never see each other's context.
//!
//! Task-locals do not cross `tokio::spawn` or OS thread boundaries on their
//! own. Work scheduled from inside a scope should go through
//! [`spawn_in_context`], [`spawn_thread_in_context`] or
//! [`ContextFutureExt::in_current_log_context`], which capture the current
//! context at the scheduling point and re-install it in the continuation.

use super::log_context::LogContext;
use std::future::Future;
use std::sync::Arc;
use tokio::task::futures::TaskLocalFuture;
use tokio::task::JoinHandle;

tokio::task_local! {
    static CURRENT_CONTEXT: Option<Arc<LogContext>>;
}

/// Entry points for installing and reading the ambient context
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextPropagator;

impl ContextPropagator {
    /// Context active for the calling code, if any
    pub fn current_context() -> Option<Arc<LogContext>> {
        CURRENT_CONTEXT
            .try_with(|current| current.clone())
            .ok()
            .flatten()
    }

    /// Run `body` with `context` installed as the current context
    pub fn run_with_new_context<R>(context: LogContext, body: impl FnOnce() -> R) -> R {
        Self::run_with_shared(Some(Arc::new(context)), body)
    }

    /// Run `body` with an already shared context (or none) installed
    pub fn run_with_shared<R>(context: Option<Arc<LogContext>>, body: impl FnOnce() -> R) -> R {
        CURRENT_CONTEXT.sync_scope(context, body)
    }

    /// Drive `future` with `context` installed on every poll
    pub fn scope<F: Future>(
        context: LogContext,
        future: F,
    ) -> TaskLocalFuture<Option<Arc<LogContext>>, F> {
        CURRENT_CONTEXT.scope(Some(Arc::new(context)), future)
    }

    /// Drive `future` with an already shared context (or none) installed
    pub fn scope_shared<F: Future>(
        context: Option<Arc<LogContext>>,
        future: F,
    ) -> TaskLocalFuture<Option<Arc<LogContext>>, F> {
        CURRENT_CONTEXT.scope(context, future)
    }
}

/// Context-carrying adapters for futures
pub trait ContextFutureExt: Future + Sized {
    /// Run this future under `context`
    fn in_log_context(self, context: LogContext) -> TaskLocalFuture<Option<Arc<LogContext>>, Self> {
        ContextPropagator::scope(context, self)
    }

    /// Run this future under the context that is current right now
    ///
    /// Use this when a future is created inside a scope but polled elsewhere,
    /// e.g. handed to an executor or a channel.
    fn in_current_log_context(self) -> TaskLocalFuture<Option<Arc<LogContext>>, Self> {
        ContextPropagator::scope_shared(ContextPropagator::current_context(), self)
    }
}

impl<F: Future> ContextFutureExt for F {}

/// Spawn a tokio task that inherits the current context
pub fn spawn_in_context<F>(future: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::spawn(future.in_current_log_context())
}

/// Spawn an OS thread that inherits the current context
pub fn spawn_thread_in_context<F, R>(body: F) -> std::thread::JoinHandle<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let context = ContextPropagator::current_context();
    std::thread::spawn(move || ContextPropagator::run_with_shared(context, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn current_request_id() -> Option<String> {
        ContextPropagator::current_context().map(|ctx| ctx.request_id().to_string())
    }

    #[test]
    fn test_no_context_outside_scope() {
        assert!(ContextPropagator::current_context().is_none());
    }

    #[test]
    fn test_sync_scope() {
        let seen = ContextPropagator::run_with_new_context(
            LogContext::new().with_request_id("A"),
            current_request_id,
        );
        assert_eq!(seen.as_deref(), Some("A"));
        assert!(ContextPropagator::current_context().is_none());
    }

    #[test]
    fn test_nested_scope_restores_parent() {
        ContextPropagator::run_with_new_context(LogContext::new().with_request_id("outer"), || {
            let inner = ContextPropagator::run_with_new_context(
                LogContext::new().with_request_id("inner"),
                current_request_id,
            );
            assert_eq!(inner.as_deref(), Some("inner"));
            assert_eq!(current_request_id().as_deref(), Some("outer"));
        });
    }

    #[test]
    fn test_thread_inherits_context() {
        let handle = ContextPropagator::run_with_new_context(
            LogContext::new().with_request_id("T"),
            || spawn_thread_in_context(current_request_id),
        );
        assert_eq!(handle.join().unwrap().as_deref(), Some("T"));
    }

    #[tokio::test]
    async fn test_future_scope() {
        let seen = async {
            tokio::task::yield_now().await;
            current_request_id()
        }
        .in_log_context(LogContext::new().with_request_id("F"))
        .await;

        assert_eq!(seen.as_deref(), Some("F"));
        assert!(ContextPropagator::current_context().is_none());
    }

    #[tokio::test]
    async fn test_spawn_inherits_context() {
        let handle = ContextPropagator::scope(LogContext::new().with_request_id("S"), async {
            spawn_in_context(async {
                tokio::task::yield_now().await;
                current_request_id()
            })
        })
        .await;

        assert_eq!(handle.await.unwrap().as_deref(), Some("S"));
    }

    #[tokio::test]
    async fn test_plain_spawn_does_not_inherit() {
        let handle = ContextPropagator::scope(LogContext::new().with_request_id("S"), async {
            tokio::spawn(async { current_request_id() })
        })
        .await;

        assert_eq!(handle.await.unwrap(), None);
    }
}
