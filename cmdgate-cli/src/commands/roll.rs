//! Dice family: `roll` is a group node that only contributes `roll4`,
//! `roll6` and `roll20`.

use std::sync::Arc;

use cmdgate_core::{
    AppResult, Argument, CommandError, CommandGroup, CommandHandler, CommandResult, CommandSpec,
    Flag, InvocationContext,
};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use regex::Regex;

const SIDES: [u32; 3] = [4, 6, 20];
const MAX_DICE: u32 = 100;

struct Roll {
    sides: u32,
    count: Argument,
    sum: Flag,
    rng: Mutex<StdRng>,
}

impl Roll {
    fn roll(&self, dice: u32) -> Vec<u32> {
        let mut rng = self.rng.lock();
        (0..dice).map(|_| rng.gen_range(1..=self.sides)).collect()
    }
}

impl CommandHandler for Roll {
    fn process(&self, ctx: &InvocationContext) -> CommandResult<()> {
        let dice: u32 = match ctx.arg(&self.count) {
            Some(raw) => raw
                .parse()
                .map_err(|_| CommandError::protocol(format!("\"{}\" is not a dice count.", raw)))?,
            None => 1,
        };
        if dice == 0 || dice > MAX_DICE {
            return Err(CommandError::protocol(format!(
                "You can roll between 1 and {} dice.",
                MAX_DICE
            )));
        }

        let rolls = self.roll(dice);
        let listed = rolls
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        let mut text = format!("Rolled {}d{}: {}", dice, self.sides, listed);
        if ctx.has_flag(&self.sum) {
            let total: u32 = rolls.iter().sum();
            text.push_str(&format!(" (total {})", total));
        }
        ctx.reply(text)?;
        Ok(())
    }
}

fn die(sides: u32, rng: StdRng) -> AppResult<CommandSpec> {
    let count = Argument::new("count", Regex::new(r"\d+")?)
        .optional()
        .with_description("Number of dice");
    let sum = Flag::switch("s", "sum").with_description("Also print the total");

    Ok(CommandSpec::new(
        &format!("roll{}", sides),
        Arc::new(Roll {
            sides,
            count: count.clone(),
            sum: sum.clone(),
            rng: Mutex::new(rng),
        }),
    )
    .with_description(&format!("Rolls {}-sided dice", sides))
    .with_flag(sum)
    .with_argument(count))
}

pub fn descriptor() -> AppResult<CommandGroup> {
    let mut group = CommandGroup::new("roll");
    for sides in SIDES {
        group = group.with_child(die(sides, StdRng::from_entropy())?);
    }
    Ok(group)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::TestHost;
    use cmdgate_core::{CommandCatalog, DispatchOutcome};

    fn host() -> TestHost {
        TestHost::new(
            &CommandCatalog::new().with("roll6", || Ok(die(6, StdRng::seed_from_u64(7))?.into())),
        )
    }

    fn parse_rolls(reply: &str) -> Vec<u32> {
        let (_, listed) = reply.split_once(": ").unwrap();
        let listed = listed.split(" (").next().unwrap();
        listed.split(", ").map(|n| n.parse().unwrap()).collect()
    }

    #[test]
    fn group_contributes_one_command_per_die() {
        let group = descriptor().unwrap();
        let names: Vec<String> = group.children().iter().map(|c| c.name().to_string()).collect();
        assert_eq!(names, vec!["roll4", "roll6", "roll20"]);
    }

    #[test]
    fn rolls_stay_in_range_and_sum() {
        let host = host();
        host.send("!roll6 5 --sum");
        let replies = host.take_replies();
        assert!(replies[0].starts_with("Rolled 5d6: "));

        let rolls = parse_rolls(&replies[0]);
        assert_eq!(rolls.len(), 5);
        assert!(rolls.iter().all(|r| (1..=6).contains(r)));
        let total: u32 = rolls.iter().sum();
        assert!(replies[0].ends_with(&format!("(total {})", total)));
    }

    #[test]
    fn defaults_to_one_die() {
        let host = host();
        host.send("!roll6");
        let replies = host.take_replies();
        assert_eq!(parse_rolls(&replies[0]).len(), 1);
        assert!(!replies[0].contains("total"));
    }

    #[test]
    fn rejects_silly_counts() {
        let host = host();
        assert_eq!(host.send("!roll6 0"), DispatchOutcome::ProtocolError);
        assert_eq!(host.send("!roll6 101"), DispatchOutcome::ProtocolError);
        assert_eq!(
            host.take_replies(),
            vec![
                "Could not process command: You can roll between 1 and 100 dice.",
                "Could not process command: You can roll between 1 and 100 dice.",
            ]
        );
    }
}
