//! Error types used by the loader, the scheduler and compiler collaborators.
//!
//! This module defines the following enums:
//!
//! - [`ConfigError`]: invalid loader options, raised before anything is scheduled.
//! - [`ManifestError`]: `nim.json` could not be read or understood.
//! - [`LoaderError`]: umbrella for the loader entry points.
//! - [`CompileError`]: the single failure delivered for a scheduled compile.
//! - [`CompilerFailure`]: raw failure value produced by a [`Compiler`](crate::Compiler).
//!
//! All delivered types provide helper methods (`as_label`, `as_message`) for logs.

use std::any::Any;
use std::path::PathBuf;

use thiserror::Error;

/// Fixed phrase every compiler execution error starts with.
pub const EXITED_PREFIX: &str = "Compiler process exited with error ";

/// # Invalid loader options.
///
/// Detected eagerly by [`Loader::prepare`](crate::Loader::prepare); nothing is
/// scheduled when one of these is returned.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `files` was given but is not an array.
    #[error("files option must be an array")]
    FilesNotArray,

    /// `files` was given as an empty array.
    #[error("You specified the 'files' option but didn't list any files")]
    FilesEmpty,

    /// A known option carried a value of the wrong type.
    #[error("option '{name}' must be {expected}")]
    InvalidOption {
        /// Option key as written in the bag.
        name: &'static str,
        /// Human-readable expected type.
        expected: &'static str,
    },

    /// The merged option bag could not be read (for example `maxInstances: 0`).
    #[error("invalid loader options: {message}")]
    Malformed {
        /// Deserializer message.
        message: String,
    },
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::FilesNotArray => "config_files_not_array",
            ConfigError::FilesEmpty => "config_files_empty",
            ConfigError::InvalidOption { .. } => "config_invalid_option",
            ConfigError::Malformed { .. } => "config_malformed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        self.to_string()
    }
}

/// # Failures while reading `nim.json`.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ManifestError {
    /// The manifest file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// Path of the manifest.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The manifest is not valid JSON.
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// Path of the manifest.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The manifest has no `source-directories` array of strings.
    #[error("{path} has no 'source-directories' array")]
    MissingSourceDirectories {
        /// Path of the manifest.
        path: PathBuf,
    },
}

impl ManifestError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ManifestError::Read { .. } => "manifest_read",
            ManifestError::Parse { .. } => "manifest_parse",
            ManifestError::MissingSourceDirectories { .. } => "manifest_missing_source_directories",
        }
    }
}

/// # Errors raised by the loader entry points.
///
/// `Config` and `Manifest` are raised synchronously, before anything is scheduled.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum LoaderError {
    /// Invalid options.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Watch-mode dependency discovery failed.
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// The scheduled compile failed (only from [`Loader::load`](crate::Loader::load)).
    #[error(transparent)]
    Compile(#[from] CompileError),
}

impl LoaderError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            LoaderError::Config(e) => e.as_label(),
            LoaderError::Manifest(e) => e.as_label(),
            LoaderError::Compile(e) => e.as_label(),
        }
    }
}

/// # The failure delivered to the caller of a scheduled compile.
///
/// Exactly one `Result<String, CompileError>` is produced per request.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// The compiler ran and reported a failure.
    ///
    /// `message` is the original compiler message; the rendered form carries
    /// the [`EXITED_PREFIX`].
    #[error("Compiler process exited with error {message}")]
    Exited {
        /// The original compiler message.
        message: String,
    },

    /// The scheduler was closed before the request could be admitted.
    #[error("scheduler closed before the compile was admitted")]
    Closed,
}

impl CompileError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use nimvisor::CompileError;
    ///
    /// let err = CompileError::Exited { message: "boom".into() };
    /// assert_eq!(err.as_label(), "compile_exited");
    /// assert_eq!(err.to_string(), "Compiler process exited with error boom");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            CompileError::Exited { .. } => "compile_exited",
            CompileError::Closed => "compile_closed",
        }
    }

    /// Returns the full, prefixed message.
    pub fn as_message(&self) -> String {
        self.to_string()
    }
}

/// Raw failure value of a compiler invocation.
///
/// Compilers report either a bare message or a structured error; both are
/// normalized into [`CompileError::Exited`] before delivery.
#[derive(Debug)]
pub enum CompilerFailure {
    /// Plain string failure.
    Message(String),
    /// Structured error value.
    Error(Box<dyn std::error::Error + Send + Sync>),
}

impl CompilerFailure {
    /// Converts the failure into the delivered error form.
    pub fn normalize(self) -> CompileError {
        let message = match self {
            CompilerFailure::Message(m) => m,
            CompilerFailure::Error(e) => e.to_string(),
        };
        CompileError::Exited { message }
    }
}

impl From<String> for CompilerFailure {
    fn from(value: String) -> Self {
        CompilerFailure::Message(value)
    }
}

impl From<&str> for CompilerFailure {
    fn from(value: &str) -> Self {
        CompilerFailure::Message(value.to_string())
    }
}

impl From<std::io::Error> for CompilerFailure {
    fn from(value: std::io::Error) -> Self {
        CompilerFailure::Error(Box::new(value))
    }
}

/// Extracts a readable message from a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
