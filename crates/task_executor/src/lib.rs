// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! A thin handle around a Tokio runtime, so that callers depend on "something
//! that can spawn work" rather than on a concrete runtime. Tests can construct
//! one from a throwaway current-thread runtime instead of paying for the
//! default multi-threaded one.

use std::future::Future;

use log::warn;

/// A cheaply cloneable handle that can spawn async and blocking work.
///
/// Every crate in this workspace that needs to push work onto a background
/// task (cloud API calls inside listers/deleters, blocking filesystem calls
/// inside the materializer) takes an `Executor` rather than reaching for
/// `tokio::spawn` directly, so the caller controls which runtime work lands
/// on.
#[derive(Clone)]
pub struct Executor {
    handle: tokio::runtime::Handle,
}

impl Executor {
    /// Wrap the handle of the runtime that is driving the current task.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context.
    pub fn new() -> Executor {
        Executor {
            handle: tokio::runtime::Handle::current(),
        }
    }

    /// Wrap a specific runtime handle.
    pub fn from_handle(handle: tokio::runtime::Handle) -> Executor {
        Executor { handle }
    }

    pub fn handle(&self) -> &tokio::runtime::Handle {
        &self.handle
    }

    /// Spawn an async task, logging (rather than silently dropping) any panic.
    pub fn spawn<F>(&self, future: F) -> tokio::task::JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.handle.spawn(future)
    }

    /// Run a blocking closure on the blocking thread pool.
    pub async fn spawn_blocking<F, R>(&self, f: F) -> Result<R, String>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        self.handle.spawn_blocking(f).await.map_err(|e| {
            let msg = if e.is_panic() {
                let panic_payload = e.into_panic();
                describe_panic(&panic_payload)
            } else {
                "blocking task was cancelled".to_owned()
            };
            warn!("spawn_blocking task failed: {msg}");
            msg
        })
    }
}

impl Default for Executor {
    fn default() -> Executor {
        Executor::new()
    }
}

fn describe_panic(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::Executor;

    #[tokio::test]
    async fn spawn_blocking_returns_value() {
        let executor = Executor::new();
        let result = executor.spawn_blocking(|| 1 + 1).await.unwrap();
        assert_eq!(result, 2);
    }

    #[tokio::test]
    async fn spawn_blocking_surfaces_panics_as_errors() {
        let executor = Executor::new();
        let result = executor
            .spawn_blocking(|| -> i32 { panic!("boom") })
            .await;
        assert!(result.is_err());
    }
}
