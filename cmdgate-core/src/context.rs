/*!
 * Inbound messages, reply sink and the per-dispatch invocation context.
 */

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::descriptor::{Argument, Flag};
use crate::error::{AppResult, CommandError, CommandResult};
use crate::grammar::{ParsedArgs, ParsedFlags};

/// The user a message came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoker {
    pub user_id: u64,
    #[serde(default)]
    pub roles: Vec<u64>,
}

impl Invoker {
    pub fn new(user_id: u64) -> Self {
        Self {
            user_id,
            roles: Vec::new(),
        }
    }

    pub fn with_roles(mut self, roles: impl IntoIterator<Item = u64>) -> Self {
        self.roles = roles.into_iter().collect();
        self
    }

    pub fn has_role(&self, role: u64) -> bool {
        self.roles.contains(&role)
    }
}

/// The group (guild, server, room) a message originated in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: u64,
    pub name: String,
}

/// One message as delivered by the transport.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub content: String,
    pub author: Invoker,
    pub group: Option<Group>,
    pub channel_id: u64,
}

impl InboundMessage {
    pub fn new(content: impl Into<String>, author: Invoker, channel_id: u64) -> Self {
        Self {
            content: content.into(),
            author,
            group: None,
            channel_id,
        }
    }

    pub fn in_group(mut self, group: Group) -> Self {
        self.group = Some(group);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Embed {
        title: Option<String>,
        description: String,
        color: u32,
    },
}

impl Reply {
    /// Plain-text rendering, used by transports without rich messages.
    pub fn as_plain_text(&self) -> String {
        match self {
            Reply::Text(text) => text.clone(),
            Reply::Embed {
                title: Some(title),
                description,
                ..
            } => format!("{}\n{}", title, description),
            Reply::Embed { description, .. } => description.clone(),
        }
    }
}

impl From<&str> for Reply {
    fn from(text: &str) -> Self {
        Reply::Text(text.to_string())
    }
}

impl From<String> for Reply {
    fn from(text: String) -> Self {
        Reply::Text(text)
    }
}

/// Handle to a message the sink has sent, so it can be retracted later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SentMessage {
    pub id: u64,
    pub channel_id: u64,
}

/// Outbound side of the chat transport.
pub trait ReplySink: Send + Sync {
    fn send(&self, channel_id: u64, reply: &Reply) -> AppResult<SentMessage>;

    fn delete(&self, message: &SentMessage) -> AppResult<()>;
}

/// State of a single dispatch, handed to the command handler.
pub struct InvocationContext {
    command: String,
    author: Invoker,
    group: Option<Group>,
    channel_id: u64,
    flags: ParsedFlags,
    args: ParsedArgs,
    sink: Arc<dyn ReplySink>,
}

impl InvocationContext {
    pub fn new(
        command: impl Into<String>,
        message: &InboundMessage,
        sink: Arc<dyn ReplySink>,
    ) -> Self {
        Self {
            command: command.into(),
            author: message.author.clone(),
            group: message.group.clone(),
            channel_id: message.channel_id,
            flags: ParsedFlags::default(),
            args: ParsedArgs::default(),
            sink,
        }
    }

    pub fn with_flags(mut self, flags: ParsedFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_args(mut self, args: ParsedArgs) -> Self {
        self.args = args;
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn author(&self) -> &Invoker {
        &self.author
    }

    pub fn group(&self) -> Option<&Group> {
        self.group.as_ref()
    }

    pub fn channel_id(&self) -> u64 {
        self.channel_id
    }

    pub fn flags(&self) -> &ParsedFlags {
        &self.flags
    }

    pub fn args(&self) -> &ParsedArgs {
        &self.args
    }

    pub fn has_flag(&self, flag: &Flag) -> bool {
        self.flags.contains(flag)
    }

    pub fn flag(&self, flag: &Flag) -> Option<&str> {
        self.flags.get(flag)
    }

    pub fn arg(&self, argument: &Argument) -> Option<&str> {
        self.args.get(argument)
    }

    pub fn arg_or(&self, argument: &Argument, default: &str) -> String {
        self.arg(argument).unwrap_or(default).to_string()
    }

    pub fn arg_or_else<F>(&self, argument: &Argument, default: F) -> String
    where
        F: FnOnce() -> String,
    {
        match self.arg(argument) {
            Some(value) => value.to_string(),
            None => default(),
        }
    }

    /// Sends a reply to the channel the command came from.
    pub fn reply(&self, reply: impl Into<Reply>) -> CommandResult<SentMessage> {
        self.sink
            .send(self.channel_id, &reply.into())
            .map_err(CommandError::Unexpected)
    }
}
