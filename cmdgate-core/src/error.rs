/*!
 * Error handling
 *
 * Per-message failures are `CommandError` and never leave the dispatcher.
 * Lifecycle faults are `RegistryError` and propagate to startup/shutdown
 * control. Host plumbing uses `anyhow` through `AppResult`.
 */

use std::path::PathBuf;

use thiserror::Error;

/// Result type for host-level plumbing and handler lifecycle hooks.
pub type AppResult<T> = anyhow::Result<T>;

pub type CommandResult<T> = Result<T, CommandError>;
pub type RegistryResult<T> = Result<T, RegistryError>;
pub type StorageResult<T> = Result<T, StorageError>;

/// Failures raised while handling one inbound message.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Unknown flag \"{0}\".")]
    UnknownFlag(String),

    #[error("Flag \"{0}\" requires a value.")]
    MissingFlagValue(String),

    #[error("This command requires at least {required} argument{}.", plural_suffix(.required))]
    MissingArguments { required: usize },

    #[error("Argument {argument} does not accept input: {input}")]
    ArgumentMismatch { argument: String, input: String },

    /// Expected failure declared by a handler, e.g. an unresolvable lookup key.
    #[error("{0}")]
    Protocol(String),

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl CommandError {
    pub fn protocol(message: impl Into<String>) -> Self {
        CommandError::Protocol(message.into())
    }

    /// Input the command grammar cannot accept. Usually caught before the
    /// handler runs, but handlers may raise these for input they check themselves.
    pub fn is_grammar(&self) -> bool {
        matches!(
            self,
            CommandError::UnknownFlag(_)
                | CommandError::MissingFlagValue(_)
                | CommandError::MissingArguments { .. }
                | CommandError::ArgumentMismatch { .. }
        )
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            CommandError::UnknownFlag(_) => ErrorSeverity::Info,
            CommandError::MissingFlagValue(_) => ErrorSeverity::Info,
            CommandError::MissingArguments { .. } => ErrorSeverity::Info,
            CommandError::ArgumentMismatch { .. } => ErrorSeverity::Info,
            CommandError::Protocol(_) => ErrorSeverity::Warning,
            CommandError::Unexpected(_) => ErrorSeverity::Error,
        }
    }
}

fn plural_suffix(count: &usize) -> &'static str {
    if *count > 1 {
        "s"
    } else {
        ""
    }
}

/// Error severity, used to pick the log level for a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
}

/// Operator/startup faults. These are caller bugs, not user input.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Cannot {operation} in locked registry")]
    Locked { operation: &'static str },

    #[error("Registry has not been locked yet")]
    NotLocked,

    #[error("Catalog entry {entry} failed to build: {source}")]
    Discovery {
        entry: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to initialise command {command}: {source}")]
    Init {
        command: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Storage root {path} is unavailable: {source}")]
    StorageRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures of the shared JSON codec.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error while {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error in document {schema}: {source}")]
    Json {
        schema: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Document {schema} has version {found}, expected {expected}")]
    SchemaMismatch {
        schema: String,
        expected: u32,
        found: u32,
    },

    #[error("Schema {0} was not registered with the codec")]
    UnknownSchema(String),
}
