//! # Compiler abstraction.
//!
//! A [`Compiler`] turns a list of source files plus an option bag into text.
//! The scheduler treats it as a black box: it only awaits the result and never
//! inspects the output.
//!
//! # Example
//! ```
//! use std::path::PathBuf;
//! use async_trait::async_trait;
//! use nimvisor::{Compiler, CompilerFailure, CompilerOptions};
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl Compiler for Echo {
//!     async fn compile_to_string(
//!         &self,
//!         files: &[PathBuf],
//!         _options: &CompilerOptions,
//!     ) -> Result<String, CompilerFailure> {
//!         Ok(format!("// {} files", files.len()))
//!     }
//! }
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::CompilerFailure;
use crate::options::CompilerOptions;

/// Asynchronous source-to-output compiler.
#[async_trait]
pub trait Compiler: Send + Sync + 'static {
    /// Compiles `files` and returns the output as text.
    ///
    /// Failures are reported either as a bare message or a structured error.
    async fn compile_to_string(
        &self,
        files: &[PathBuf],
        options: &CompilerOptions,
    ) -> Result<String, CompilerFailure>;
}

/// Shared handle to a compiler.
pub type CompilerRef = Arc<dyn Compiler>;
