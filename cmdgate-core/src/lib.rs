//! cmdgate core
//!
//! Turns chat messages into typed invocations of registered commands:
//! - descriptors and the flag/argument grammar
//! - permission gate and dispatcher
//! - command registry with a one-way lock
//! - lifecycle coordinator for autosave and shutdown

pub mod config;
pub mod context;
pub mod descriptor;
pub mod dispatcher;
pub mod error;
pub mod grammar;
pub mod handler;
pub mod lifecycle;
pub mod logging;
pub mod permission;
pub mod registry;
pub mod storage;

pub use config::EngineConfig;
pub use context::{Group, InboundMessage, InvocationContext, Invoker, Reply, ReplySink, SentMessage};
pub use descriptor::{Argument, CommandGroup, CommandSpec, Descriptor, Flag, Requirements};
pub use dispatcher::{parse_invocation, DispatchOutcome, Dispatcher};
pub use error::{AppResult, CommandError, CommandResult, ErrorSeverity, RegistryError, StorageError};
pub use handler::{handler_fn, CommandHandler};
pub use lifecycle::{LifecycleCoordinator, SaveReport};
pub use permission::{PermissionDecision, PermissionGate};
pub use registry::{CommandCatalog, CommandRegistry};
pub use storage::{CodecBuilder, JsonCodec, StorageContext};
