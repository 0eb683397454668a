/*!
 * Argument grammar
 *
 * Runs after flags are stripped. Each declared argument, in order, takes the
 * first match of its pattern from whatever text is left.
 */

use std::collections::BTreeMap;

use super::cut_span;
use super::flags::ParsedFlags;
use crate::descriptor::Argument;
use crate::error::{CommandError, CommandResult};

/// Argument values resolved during one dispatch, keyed by argument name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedArgs {
    values: BTreeMap<String, String>,
}

impl ParsedArgs {
    pub fn insert(&mut self, argument: &Argument, value: String) {
        self.values.insert(argument.name().to_string(), value);
    }

    pub fn get(&self, argument: &Argument) -> Option<&str> {
        self.values.get(argument.name()).map(String::as_str)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

pub fn strip_arguments(
    buffer: &mut String,
    arguments: &[Argument],
    flags: &ParsedFlags,
) -> CommandResult<ParsedArgs> {
    let mut parsed = ParsedArgs::default();

    for argument in arguments {
        let required = argument.is_required(flags);
        if required && buffer.is_empty() {
            let count = arguments.iter().filter(|a| a.is_required(flags)).count();
            return Err(CommandError::MissingArguments { required: count });
        }

        // empty matches are skipped; the first non-empty one wins
        let found = argument
            .pattern()
            .find_iter(buffer.as_str())
            .find(|m| !m.as_str().is_empty())
            .map(|m| (m.start(), m.end(), m.as_str().to_string()));

        match found {
            Some((start, end, value)) => {
                cut_span(buffer, start, end);
                parsed.insert(argument, value);
            }
            None if required => {
                return Err(CommandError::ArgumentMismatch {
                    argument: argument.name().to_string(),
                    input: buffer.clone(),
                });
            }
            None => {}
        }
    }

    Ok(parsed)
}
