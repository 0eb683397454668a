use std::path::PathBuf;

use clap::Parser;
use cmdgate_core::{EngineConfig, Group, Invoker};

/// Console host for the cmdgate command engine. Each stdin line is one
/// inbound chat message.
#[derive(Parser, Debug, Clone)]
#[command(name = "cmdgate", version, about)]
pub struct Cli {
    /// Engine config file (JSON); defaults are used when it does not exist
    #[arg(long, default_value = "cmdgate.json")]
    pub config: PathBuf,

    /// Storage root for command state, overrides the config file
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// User id the console speaks as
    #[arg(long, default_value_t = 0)]
    pub user: u64,

    /// Role held by the console user (repeatable)
    #[arg(long = "role")]
    pub roles: Vec<u64>,

    /// Group the console messages originate from
    #[arg(long)]
    pub group: Option<u64>,

    /// Role allowed to run moderation commands (repeatable)
    #[arg(long = "moderator-role")]
    pub moderator_roles: Vec<u64>,

    /// Default log level when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Cli {
    /// Applies command-line overrides on top of the loaded config.
    pub fn apply(&self, config: &mut EngineConfig) {
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
    }

    pub fn invoker(&self) -> Invoker {
        Invoker::new(self.user).with_roles(self.roles.iter().copied())
    }

    pub fn origin_group(&self) -> Option<Group> {
        self.group.map(|id| Group {
            id,
            name: format!("group-{}", id),
        })
    }
}
