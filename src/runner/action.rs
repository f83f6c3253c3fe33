//! Leaf actions
//!
//! A leaf task wraps an [`Action`]: one unit of work that resolves once all
//! of its I/O has completed.

use crate::error::ExecutionResult;
use crate::runner::Context;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;

/// Lines a leaf wants surfaced to the user (lint findings, bundler stats, sizes)
pub type Diagnostics = Vec<String>;

/// The work behind a leaf task
pub trait Action: Send + Sync {
    fn run<'a>(&'a self, ctx: &'a Context) -> BoxFuture<'a, ExecutionResult<Diagnostics>>;
}

/// An action built from a closure
pub struct FnAction<F> {
    f: F,
}

/// Wrap a closure returning a future as an [`Action`]
pub fn from_fn<F, Fut>(f: F) -> FnAction<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = ExecutionResult<Diagnostics>> + Send + 'static,
{
    FnAction { f }
}

impl<F, Fut> Action for FnAction<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = ExecutionResult<Diagnostics>> + Send + 'static,
{
    fn run<'a>(&'a self, _ctx: &'a Context) -> BoxFuture<'a, ExecutionResult<Diagnostics>> {
        (self.f)().boxed()
    }
}
