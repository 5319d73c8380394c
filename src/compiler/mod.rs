//! # Compiler collaborators.
//!
//! - [`Compiler`] - trait for async source-to-text compilation
//! - [`CompilerFn`] - closure-backed implementation
//! - [`ProcessCompiler`] - runs an external compiler command
//! - [`CompilerRef`] - shared handle (`Arc<dyn Compiler>`)

#[allow(clippy::module_inception)]
mod compiler;
mod compiler_fn;
mod process;

pub use compiler::{Compiler, CompilerRef};
pub use compiler_fn::CompilerFn;
pub use process::ProcessCompiler;
