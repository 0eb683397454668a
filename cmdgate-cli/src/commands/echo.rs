use std::sync::Arc;

use cmdgate_core::{Argument, CommandHandler, CommandResult, CommandSpec, Flag, InvocationContext};

struct Echo {
    upper: Flag,
    text: Argument,
}

impl CommandHandler for Echo {
    fn process(&self, ctx: &InvocationContext) -> CommandResult<()> {
        let text = ctx.arg_or(&self.text, "");
        let text = if ctx.has_flag(&self.upper) {
            text.to_uppercase()
        } else {
            text
        };
        ctx.reply(text)?;
        Ok(())
    }
}

pub fn descriptor() -> CommandSpec {
    let upper = Flag::switch("u", "upper").with_description("Upper-case the text");
    let text = Argument::rest("text");
    CommandSpec::new(
        "echo",
        Arc::new(Echo {
            upper: upper.clone(),
            text: text.clone(),
        }),
    )
    .with_description("Repeats the given text")
    .with_flag(upper)
    .with_argument(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::TestHost;
    use cmdgate_core::{CommandCatalog, DispatchOutcome};

    fn host() -> TestHost {
        TestHost::new(&CommandCatalog::new().with("echo", || Ok(descriptor().into())))
    }

    #[test]
    fn repeats_text_with_flags_anywhere() {
        let host = host();
        host.send("!echo hello there");
        host.send("!echo hello -u there");
        host.send("!echo well-known words");
        assert_eq!(
            host.take_replies(),
            vec!["hello there", "HELLO THERE", "well-known words"]
        );
    }

    #[test]
    fn empty_input_is_rejected() {
        let host = host();
        assert_eq!(host.send("!echo"), DispatchOutcome::Rejected);
        assert_eq!(
            host.take_replies(),
            vec!["This command requires at least 1 argument."]
        );
    }
}
