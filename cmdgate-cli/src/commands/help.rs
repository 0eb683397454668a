use std::sync::{Arc, Weak};

use anyhow::anyhow;
use cmdgate_core::{
    Argument, CommandError, CommandHandler, CommandRegistry, CommandResult, CommandSpec,
    InvocationContext, Reply,
};

const HELP_COLOR: u32 = 0x3498db;

struct Help {
    registry: Weak<CommandRegistry>,
    command: Argument,
}

impl CommandHandler for Help {
    fn process(&self, ctx: &InvocationContext) -> CommandResult<()> {
        let registry = self
            .registry
            .upgrade()
            .ok_or_else(|| anyhow!("command registry is no longer available"))?;

        if let Some(name) = ctx.arg(&self.command) {
            let command = registry
                .find(name)
                .ok_or_else(|| CommandError::protocol(format!("Unknown command: {}", name)))?;
            let mut description = format!("`{}`", command.usage());
            if !command.description().is_empty() {
                description.push('\n');
                description.push_str(command.description());
            }
            for flag in command.flags().iter().filter(|f| !f.description().is_empty()) {
                description.push_str(&format!(
                    "\n  -{}, --{}: {}",
                    flag.short(),
                    flag.long(),
                    flag.description()
                ));
            }
            ctx.reply(Reply::Embed {
                title: Some(command.name().to_string()),
                description,
                color: HELP_COLOR,
            })?;
            return Ok(());
        }

        // admin commands stay out of the listing
        let lines: Vec<String> = registry
            .commands()
            .iter()
            .filter(|c| !c.is_admin())
            .map(|c| format!("{} - {}", c.name(), c.description()))
            .collect();
        ctx.reply(Reply::Embed {
            title: Some("Commands".to_string()),
            description: lines.join("\n"),
            color: HELP_COLOR,
        })?;
        Ok(())
    }
}

pub fn descriptor(registry: Weak<CommandRegistry>) -> CommandSpec {
    let command = Argument::word("command")
        .optional()
        .with_description("Command to describe");
    CommandSpec::new(
        "help",
        Arc::new(Help {
            registry,
            command: command.clone(),
        }),
    )
    .with_description("Lists commands, or shows usage for one")
    .with_argument(command)
}
