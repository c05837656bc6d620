//! Request-scoped identity propagation
//!
//! The identity established by the extraction filter has to reach every
//! continuation of the request, across suspension points and worker
//! threads, without living in process-wide mutable state. A task-local
//! scope carries it: the filter opens the scope around the request future,
//! downstream guards read it, and crossing an explicit `tokio::spawn`
//! boundary requires re-capturing it with [`spawn_with_identity`].

use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::types::AuthInfo;

tokio::task_local! {
    static CURRENT_IDENTITY: Option<Arc<AuthInfo>>;
}

/// Run a future with the given identity bound for its whole duration
///
/// `None` binds an explicitly unauthenticated scope, which downstream
/// guards treat as the anonymous identity.
pub async fn with_identity<F>(identity: Option<Arc<AuthInfo>>, future: F) -> F::Output
where
    F: Future,
{
    CURRENT_IDENTITY.scope(identity, future).await
}

/// Identity bound to the current task, if any
///
/// Returns `None` both outside any identity scope and inside an
/// unauthenticated scope.
pub fn current_identity() -> Option<Arc<AuthInfo>> {
    CURRENT_IDENTITY.try_with(Clone::clone).ok().flatten()
}

/// Spawn a task that inherits the current identity scope
///
/// A plain `tokio::spawn` does not carry task-locals; use this at spawn
/// points inside a request so the child continues the request's identity.
pub fn spawn_with_identity<F>(future: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let identity = current_identity();
    tokio::spawn(CURRENT_IDENTITY.scope(identity, future))
}
