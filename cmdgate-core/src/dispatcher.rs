/*!
 * Dispatcher
 *
 * Lookup → permission check → flag parse → argument parse → invoke.
 * Every per-message failure ends here as at most one reply; nothing
 * propagates back to the transport loop.
 */

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::config::EngineConfig;
use crate::context::{InboundMessage, InvocationContext, Reply, ReplySink, SentMessage};
use crate::error::{CommandError, ErrorSeverity};
use crate::grammar::{strip_arguments, strip_flags};
use crate::permission::{PermissionDecision, PermissionGate};
use crate::registry::CommandRegistry;

pub const DENIAL_MESSAGE: &str = "You do not have permission to use this command!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The text did not start with the command prefix.
    NotACommand,
    /// No command is registered under that name.
    UnknownCommand,
    /// Admin-only command from a non-operator.
    Dropped,
    Denied,
    /// Flag or argument grammar rejected the input.
    Rejected,
    Completed,
    ProtocolError,
    UnexpectedError,
}

/// Splits `<prefix><name> <argstr>` into name and argument text.
pub fn parse_invocation<'a>(text: &'a str, prefix: &str) -> Option<(&'a str, &'a str)> {
    let body = text.trim_start().strip_prefix(prefix)?;
    let body = body.trim_end();
    let (name, argstr) = match body.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim_start()),
        None => (body, ""),
    };
    if name.is_empty() {
        return None;
    }
    Some((name, argstr))
}

pub struct Dispatcher {
    registry: Arc<CommandRegistry>,
    gate: PermissionGate,
    sink: Arc<dyn ReplySink>,
    prefix: String,
    denial_retract_delay: Duration,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<CommandRegistry>,
        sink: Arc<dyn ReplySink>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            registry,
            gate: PermissionGate::from_config(config),
            sink,
            prefix: config.command_prefix.clone(),
            denial_retract_delay: config.denial_retract_delay(),
        }
    }

    pub fn with_gate(mut self, gate: PermissionGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    /// Entry point for raw transport messages.
    pub fn handle_message(&self, message: &InboundMessage) -> DispatchOutcome {
        match parse_invocation(&message.content, &self.prefix) {
            Some((name, argstr)) => self.dispatch(message, name, argstr),
            None => DispatchOutcome::NotACommand,
        }
    }

    /// Runs one command invocation to completion.
    ///
    /// The denial retraction is scheduled on the current Tokio runtime when
    /// one is available.
    pub fn dispatch(&self, message: &InboundMessage, name: &str, argstr: &str) -> DispatchOutcome {
        let Some(command) = self.registry.find(name) else {
            debug!("ignoring unknown command {}", name);
            return DispatchOutcome::UnknownCommand;
        };

        match self
            .gate
            .check(&command, &message.author, message.group.as_ref())
        {
            PermissionDecision::Allow => {}
            PermissionDecision::SilentDrop => {
                debug!(
                    "dropping admin command {} from user {}",
                    name, message.author.user_id
                );
                return DispatchOutcome::Dropped;
            }
            PermissionDecision::Deny => {
                debug!("user {} denied command {}", message.author.user_id, name);
                self.send_transient_denial(message.channel_id);
                return DispatchOutcome::Denied;
            }
        }

        let mut buffer = argstr.trim().to_string();
        let parsed = strip_flags(&mut buffer, command.flags()).and_then(|flags| {
            let args = strip_arguments(&mut buffer, command.arguments(), &flags)?;
            Ok((flags, args))
        });
        let (flags, args) = match parsed {
            Ok(parsed) => parsed,
            Err(e) => {
                log_failure(name, &e);
                self.send(message.channel_id, Reply::Text(e.to_string()));
                return DispatchOutcome::Rejected;
            }
        };
        debug!(
            "invoking {} with {} flags and {} arguments",
            name,
            flags.len(),
            args.len()
        );

        let ctx = InvocationContext::new(command.name(), message, Arc::clone(&self.sink))
            .with_flags(flags)
            .with_args(args);
        let handler = Arc::clone(command.handler());
        let result = panic::catch_unwind(AssertUnwindSafe(|| handler.process(&ctx)));

        match result {
            Ok(Ok(())) => DispatchOutcome::Completed,
            Ok(Err(e)) => {
                log_failure(name, &e);
                if let CommandError::Unexpected(inner) = &e {
                    self.send(
                        message.channel_id,
                        Reply::Text(format!("Unexpected error processing command: {}", inner)),
                    );
                    return DispatchOutcome::UnexpectedError;
                }
                self.send(
                    message.channel_id,
                    Reply::Text(format!("Could not process command: {}", e)),
                );
                // handlers may raise grammar errors for input they validate themselves
                if e.is_grammar() {
                    DispatchOutcome::Rejected
                } else {
                    DispatchOutcome::ProtocolError
                }
            }
            Err(payload) => {
                let detail = panic_message(payload.as_ref());
                error!("command {} panicked: {}", name, detail);
                self.send(
                    message.channel_id,
                    Reply::Text(format!("Unexpected error processing command: {}", detail)),
                );
                DispatchOutcome::UnexpectedError
            }
        }
    }

    fn send(&self, channel_id: u64, reply: Reply) -> Option<SentMessage> {
        match self.sink.send(channel_id, &reply) {
            Ok(sent) => Some(sent),
            Err(e) => {
                warn!("failed to send reply to channel {}: {:#}", channel_id, e);
                None
            }
        }
    }

    fn send_transient_denial(&self, channel_id: u64) {
        let Some(sent) = self.send(channel_id, Reply::Text(DENIAL_MESSAGE.to_string())) else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("no async runtime available, denial reply will not be retracted");
            return;
        };
        let sink = Arc::clone(&self.sink);
        let delay = self.denial_retract_delay;
        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = sink.delete(&sent) {
                warn!("failed to retract denial reply {}: {:#}", sent.id, e);
            }
        });
    }
}

fn log_failure(command: &str, e: &CommandError) {
    match e.severity() {
        ErrorSeverity::Info => debug!("command {} rejected input: {}", command, e),
        ErrorSeverity::Warning => info!("command {} reported: {}", command, e),
        ErrorSeverity::Error => error!("command {} failed unexpectedly: {:#}", command, e),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::parse_invocation;

    #[test]
    fn splits_name_and_arguments() {
        assert_eq!(parse_invocation("!echo hi there", "!"), Some(("echo", "hi there")));
        assert_eq!(parse_invocation("  !ping  ", "!"), Some(("ping", "")));
        assert_eq!(parse_invocation("!quote   -a x", "!"), Some(("quote", "-a x")));
    }

    #[test]
    fn rejects_non_commands() {
        assert_eq!(parse_invocation("hello", "!"), None);
        assert_eq!(parse_invocation("!", "!"), None);
        assert_eq!(parse_invocation("! echo", "!"), None);
    }
}
