// src/task.rs
//! Deferred async work returned from the reducer.
//!
//! The reducer never awaits. It returns a `Task` whose futures the session
//! runtime spawns; each future yields one message that is fed back into
//! the reducer on the control loop.

use futures::future::{BoxFuture, FutureExt};
use std::future::Future;

#[must_use = "a Task does nothing unless handed to the runtime"]
pub struct Task<M> {
    futures: Vec<BoxFuture<'static, M>>,
}

impl<M: Send + 'static> Task<M> {
    pub fn none() -> Self {
        Self { futures: Vec::new() }
    }

    /// Runs `future` in the background and maps its output to a message.
    pub fn perform<F, T>(future: F, map: impl FnOnce(T) -> M + Send + 'static) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Self {
            futures: vec![future.map(map).boxed()],
        }
    }

    pub fn is_none(&self) -> bool {
        self.futures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.futures.len()
    }

    pub fn into_futures(self) -> Vec<BoxFuture<'static, M>> {
        self.futures
    }
}

impl<M> std::fmt::Debug for Task<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task").field("pending", &self.futures.len()).finish()
    }
}
