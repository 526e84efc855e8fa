//! Unified error types for firmsim.
//!
//! Artifact errors abort only the module that owns the artifact, module errors
//! are recorded by the orchestrator with the module's weight retained, and
//! batch errors either fail a single task or, for a stalled pool, the run.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Main error type for firmsim operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum FirmsimError {
    /// A feature artifact is absent or unreadable as expected
    #[error("Artifact error: {context}")]
    Artifact {
        context: String,
        #[source]
        source: ArtifactErrorKind,
    },

    /// A comparison module could not produce a score
    #[error("Module failed: {context}")]
    Module {
        context: String,
        #[source]
        source: ModuleErrorKind,
    },

    /// Errors raised while planning or running a batch
    #[error("Batch evaluation failed: {context}")]
    Batch {
        context: String,
        #[source]
        source: BatchErrorKind,
    },

    /// IO errors with context
    #[error("IO error at {path:?}: {message}")]
    Io {
        path: Option<PathBuf>,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration errors
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),
}

/// Specific artifact error kinds
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ArtifactErrorKind {
    #[error("Missing {what}: {path}")]
    Missing { path: PathBuf, what: String },

    #[error("Malformed artifact {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },
}

/// Specific module error kinds
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ModuleErrorKind {
    #[error("{module}: {message}")]
    Execution { module: String, message: String },

    #[error("{module}: no comparable artifacts on both sides")]
    NoComparableArtifacts { module: String },

    #[error("Unknown module name: {0}")]
    UnknownModule(String),
}

/// Specific batch error kinds
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum BatchErrorKind {
    #[error("Task {task_id} failed: {reason}")]
    TaskExecution { task_id: String, reason: String },

    #[error("All workers exited with {outstanding} task(s) outstanding")]
    PoolStalled { outstanding: usize },

    #[error("Invalid dataset: {0}")]
    Dataset(String),
}

// ============================================================================
// Result type alias
// ============================================================================

/// Convenient Result type for firmsim operations
pub type Result<T> = std::result::Result<T, FirmsimError>;

// ============================================================================
// Error construction helpers
// ============================================================================

impl FirmsimError {
    /// Create an artifact error with context
    pub fn artifact(context: impl Into<String>, source: ArtifactErrorKind) -> Self {
        Self::Artifact {
            context: context.into(),
            source,
        }
    }

    /// A required artifact does not exist
    pub fn missing_artifact(path: impl AsRef<Path>, what: impl Into<String>) -> Self {
        let path = path.as_ref().to_path_buf();
        Self::artifact(
            format!("required file not found at {}", path.display()),
            ArtifactErrorKind::Missing {
                path,
                what: what.into(),
            },
        )
    }

    /// An artifact exists but cannot be interpreted
    pub fn malformed_artifact(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        let path = path.as_ref().to_path_buf();
        Self::artifact(
            format!("cannot interpret {}", path.display()),
            ArtifactErrorKind::Malformed {
                path,
                reason: reason.into(),
            },
        )
    }

    /// Create a module error with context
    pub fn module(context: impl Into<String>, source: ModuleErrorKind) -> Self {
        Self::Module {
            context: context.into(),
            source,
        }
    }

    /// A module failed with a free-form message
    pub fn module_execution(module: impl Into<String>, message: impl Into<String>) -> Self {
        Self::module(
            "execution",
            ModuleErrorKind::Execution {
                module: module.into(),
                message: message.into(),
            },
        )
    }

    /// None of the artifacts a module needs exist on both sides
    pub fn no_comparable_artifacts(module: impl Into<String>) -> Self {
        Self::module(
            "nothing to compare",
            ModuleErrorKind::NoComparableArtifacts {
                module: module.into(),
            },
        )
    }

    /// Create a batch error with context
    pub fn batch(context: impl Into<String>, source: BatchErrorKind) -> Self {
        Self::Batch {
            context: context.into(),
            source,
        }
    }

    /// A single comparison task could not be completed
    pub fn task_execution(task_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::batch(
            "task",
            BatchErrorKind::TaskExecution {
                task_id: task_id.into(),
                reason: reason.into(),
            },
        )
    }

    /// Every worker has exited while results are still expected
    pub fn pool_stalled(outstanding: usize) -> Self {
        Self::batch("worker pool", BatchErrorKind::PoolStalled { outstanding })
    }

    /// Create an IO error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        let message = format!("{source}");
        Self::Io {
            path: Some(path),
            message,
            source,
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// The error and its sources joined with `": "`.
    #[must_use]
    pub fn detailed_message(&self) -> String {
        let mut message = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            message.push_str(": ");
            message.push_str(&err.to_string());
            source = err.source();
        }
        message
    }

    /// True when the error marks a missing (rather than broken) artifact.
    #[must_use]
    pub const fn is_missing_artifact(&self) -> bool {
        matches!(
            self,
            Self::Artifact {
                source: ArtifactErrorKind::Missing { .. },
                ..
            }
        )
    }
}

// ============================================================================
// Conversions from existing error types
// ============================================================================

impl From<std::io::Error> for FirmsimError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            path: None,
            message: format!("{err}"),
            source: err,
        }
    }
}

impl From<serde_json::Error> for FirmsimError {
    fn from(err: serde_json::Error) -> Self {
        Self::Validation(format!("JSON serialization: {err}"))
    }
}

// ============================================================================
// Error context extension trait
// ============================================================================

/// Extension trait for adding context to errors.
///
/// Context strings are prepended to the error's existing context, so a chain
/// like `"comparing fw_a: reading output.json"` shows the path through the code.
///
/// # Example
///
/// ```ignore
/// use firmsim::error::ErrorContext;
///
/// let summary = load_summary(&path)
///     .with_context(|| format!("loading summary from {}", path.display()))?;
/// ```
pub trait ErrorContext<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context from a closure, evaluated only on error.
    fn with_context<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T, E: Into<FirmsimError>> ErrorContext<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        let ctx: String = context.into();
        self.map_err(|e| add_context_to_error(e.into(), &ctx))
    }

    fn with_context<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.map_err(|e| {
            let ctx: String = f().into();
            add_context_to_error(e.into(), &ctx)
        })
    }
}

/// Add context to an error, chaining with any existing context.
fn add_context_to_error(err: FirmsimError, new_ctx: &str) -> FirmsimError {
    match err {
        FirmsimError::Artifact {
            context: existing,
            source,
        } => FirmsimError::Artifact {
            context: chain_context(new_ctx, &existing),
            source,
        },
        FirmsimError::Module {
            context: existing,
            source,
        } => FirmsimError::Module {
            context: chain_context(new_ctx, &existing),
            source,
        },
        FirmsimError::Batch {
            context: existing,
            source,
        } => FirmsimError::Batch {
            context: chain_context(new_ctx, &existing),
            source,
        },
        FirmsimError::Io {
            path,
            message,
            source,
        } => FirmsimError::Io {
            path,
            message: chain_context(new_ctx, &message),
            source,
        },
        FirmsimError::Config(msg) => FirmsimError::Config(chain_context(new_ctx, &msg)),
        FirmsimError::Validation(msg) => FirmsimError::Validation(chain_context(new_ctx, &msg)),
    }
}

/// Chain two context strings together as "`new`: `existing`".
fn chain_context(new: &str, existing: &str) -> String {
    if existing.is_empty() {
        new.to_string()
    } else {
        format!("{new}: {existing}")
    }
}

/// Extension trait for Option types to convert to errors with context.
pub trait OptionContext<T> {
    /// Convert None to an error with the given context.
    fn context_none(self, context: impl Into<String>) -> Result<T>;
}

impl<T> OptionContext<T> for Option<T> {
    fn context_none(self, context: impl Into<String>) -> Result<T> {
        self.ok_or_else(|| FirmsimError::Validation(context.into()))
    }
}
