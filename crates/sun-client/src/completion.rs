//! Completion adapters
//!
//! Every operation is a single `async fn` returning `Result<T>`. These
//! adapters offer the other two calling conventions on top of it: a
//! callback driven exactly once, and a blocking call.

use std::future::Future;

use sun_core::{Result, SunError};
use tokio::task::JoinHandle;

/// Await `operation` and hand its outcome to `callback`
pub async fn with_callback<T, F, C>(operation: F, callback: C)
where
    F: Future<Output = Result<T>>,
    C: FnOnce(Result<T>),
{
    callback(operation.await);
}

/// Run `operation` on the current runtime and hand its outcome to `callback`
pub fn spawn_with_callback<T, F, C>(operation: F, callback: C) -> JoinHandle<()>
where
    T: Send + 'static,
    F: Future<Output = Result<T>> + Send + 'static,
    C: FnOnce(Result<T>) + Send + 'static,
{
    tokio::spawn(with_callback(operation, callback))
}

/// Drive `operation` to completion on a private current-thread runtime.
///
/// Must not be called from inside an async context.
pub fn blocking<T, F>(operation: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| SunError::Configuration(format!("Failed to start runtime: {}", e)))?;
    runtime.block_on(operation)
}
