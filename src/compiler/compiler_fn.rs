//! # Function-backed compiler (`CompilerFn`)
//!
//! [`CompilerFn`] wraps a closure `F: Fn(Vec<PathBuf>, CompilerOptions) -> Fut`,
//! producing a fresh future per compile. Useful for tests and for hosts that
//! already have their own compile routine.
//!
//! ## Example
//! ```rust
//! use std::path::PathBuf;
//! use nimvisor::{CompilerFailure, CompilerFn, CompilerOptions, CompilerRef};
//!
//! let c: CompilerRef = CompilerFn::arc(|files: Vec<PathBuf>, _opts: CompilerOptions| async move {
//!     Ok::<_, CompilerFailure>(format!("{} files", files.len()))
//! });
//! ```

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::compiler::Compiler;
use crate::error::CompilerFailure;
use crate::options::CompilerOptions;

/// Function-backed compiler implementation.
pub struct CompilerFn<F> {
    f: F,
}

impl<F> CompilerFn<F> {
    /// Creates a new function-backed compiler.
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the compiler and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<F, Fut> Compiler for CompilerFn<F>
where
    F: Fn(Vec<PathBuf>, CompilerOptions) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<String, CompilerFailure>> + Send + 'static,
{
    async fn compile_to_string(
        &self,
        files: &[PathBuf],
        options: &CompilerOptions,
    ) -> Result<String, CompilerFailure> {
        (self.f)(files.to_vec(), options.clone()).await
    }
}
