//! # External compiler process.
//!
//! [`ProcessCompiler`] runs a command such as `nim js --stdout` with the input
//! files appended and returns its stdout. A non-zero exit is reported as a
//! [`CompilerFailure::Message`] carrying stderr (or the exit status when stderr
//! is empty). Failing to spawn the command, or stdout that is not UTF-8, is a
//! [`CompilerFailure::Error`].
//!
//! ```text
//! <program> <args...> [-d:release] <files...>
//!     cwd = options.cwd (if set)
//! ```

use std::ffi::OsString;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::process::Command;

use crate::compiler::Compiler;
use crate::error::CompilerFailure;
use crate::options::CompilerOptions;

/// Flag appended when `optimize` is set.
const RELEASE_FLAG: &str = "-d:release";

/// Compiler that shells out to an external program.
#[derive(Clone, Debug)]
pub struct ProcessCompiler {
    program: OsString,
    args: Vec<OsString>,
}

impl ProcessCompiler {
    /// Creates a compiler running `program` with leading `args`.
    pub fn new<I, S>(program: impl Into<OsString>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// `nim js --stdout --hints:off`.
    pub fn nim() -> Self {
        Self::new("nim", ["js", "--stdout", "--hints:off"])
    }

    fn command(&self, files: &[PathBuf], options: &CompilerOptions) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if options.optimize {
            cmd.arg(RELEASE_FLAG);
        }
        cmd.args(files);
        if let Some(cwd) = &options.cwd {
            cmd.current_dir(cwd);
        }
        cmd
    }
}

impl Default for ProcessCompiler {
    fn default() -> Self {
        Self::nim()
    }
}

#[async_trait]
impl Compiler for ProcessCompiler {
    async fn compile_to_string(
        &self,
        files: &[PathBuf],
        options: &CompilerOptions,
    ) -> Result<String, CompilerFailure> {
        let output = self.command(files, options).output().await?;

        if output.status.success() {
            return String::from_utf8(output.stdout)
                .map_err(|e| CompilerFailure::Error(Box::new(e)));
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if stderr.is_empty() {
            Err(CompilerFailure::Message(output.status.to_string()))
        } else {
            Err(CompilerFailure::Message(stderr))
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stdout_is_the_result() {
        let c = ProcessCompiler::new("echo", ["compiled"]);
        let out = c
            .compile_to_string(&[PathBuf::from("a.nim")], &CompilerOptions::default())
            .await
            .unwrap();
        assert_eq!(out, "compiled a.nim\n");
    }

    #[tokio::test]
    async fn optimize_adds_release_flag() {
        let c = ProcessCompiler::new("echo", Vec::<String>::new());
        let opts = CompilerOptions {
            optimize: true,
            ..CompilerOptions::default()
        };
        let out = c
            .compile_to_string(&[PathBuf::from("a.nim")], &opts)
            .await
            .unwrap();
        assert_eq!(out, "-d:release a.nim\n");
    }

    #[tokio::test]
    async fn stderr_becomes_the_failure_message() {
        let c = ProcessCompiler::new("sh", ["-c", "echo 'undeclared identifier' >&2; exit 1"]);
        let err = c
            .compile_to_string(&[], &CompilerOptions::default())
            .await
            .unwrap_err();
        assert_eq!(
            err.normalize().to_string(),
            "Compiler process exited with error undeclared identifier"
        );
    }

    #[tokio::test]
    async fn missing_program_is_a_structured_failure() {
        let c = ProcessCompiler::new("/nonexistent/nim-compiler", Vec::<String>::new());
        let err = c
            .compile_to_string(&[], &CompilerOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CompilerFailure::Error(_)));
    }

    #[tokio::test]
    async fn non_utf8_output_is_a_structured_failure() {
        let c = ProcessCompiler::new("sh", ["-c", "printf '\\377'"]);
        let err = c
            .compile_to_string(&[], &CompilerOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CompilerFailure::Error(_)));
    }
}
