/*!
 * Flag grammar
 *
 * Recognises `-k`, `--long`, `-k=v`, `-k v` and `-k="quoted v"` anywhere in
 * the input. Each recognised token is cut out of the buffer and the scan
 * restarts, so flags may appear in any order and interleave with arguments.
 */

use std::collections::{BTreeMap, HashMap};

use once_cell::sync::Lazy;
use regex::Regex;

use super::cut_span;
use crate::descriptor::Flag;
use crate::error::{CommandError, CommandResult};

static FLAG_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(--?)(\w+)(?:[=\s](?:"(.*?)"|(\S+)))?"#).expect("valid flag pattern")
});

/// Flag values resolved during one dispatch, keyed by the flag's long key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFlags {
    values: BTreeMap<String, String>,
}

impl ParsedFlags {
    pub fn insert(&mut self, flag: &Flag, value: String) {
        self.values.insert(flag.long().to_string(), value);
    }

    pub fn contains(&self, flag: &Flag) -> bool {
        self.values.contains_key(flag.long())
    }

    pub fn contains_key(&self, long: &str) -> bool {
        self.values.contains_key(long)
    }

    pub fn get(&self, flag: &Flag) -> Option<&str> {
        self.values.get(flag.long()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Cuts every known flag token out of `buffer` and returns their values.
///
/// Known flags are recognised anywhere, even inside a word (`x-v`). An
/// unknown key is only an error at the beginning of the buffer or after
/// whitespace, so hyphenated words such as `well-known` stay intact.
pub fn strip_flags(buffer: &mut String, flags: &[Flag]) -> CommandResult<ParsedFlags> {
    let by_short: HashMap<&str, &Flag> = flags.iter().map(|f| (f.short(), f)).collect();
    let by_long: HashMap<&str, &Flag> = flags.iter().map(|f| (f.long(), f)).collect();

    let mut parsed = ParsedFlags::default();
    let mut search_from = 0;

    while let Some(caps) = FLAG_PATTERN.captures_at(buffer.as_str(), search_from) {
        let Some(whole) = caps.get(0) else {
            break;
        };

        let dashes = &caps[1];
        let key = &caps[2];
        let flag = if dashes == "--" {
            by_long.get(key)
        } else {
            by_short.get(key)
        };
        let Some(flag) = flag.copied() else {
            let at_boundary = buffer[..whole.start()]
                .chars()
                .next_back()
                .map_or(true, char::is_whitespace);
            if at_boundary {
                return Err(CommandError::UnknownFlag(key.to_string()));
            }
            // the dash is ASCII, so start + 1 is a char boundary
            search_from = whole.start() + 1;
            continue;
        };

        let mut value = caps.get(3).or_else(|| caps.get(4)).map(|m| m.as_str());
        let mut end = whole.end();

        match value {
            None if flag.needs_value() => {
                return Err(CommandError::MissingFlagValue(key.to_string()));
            }
            Some(_) if !flag.can_have_value() => {
                // leave the trailing token for later scans and arguments
                end = caps.get(2).map_or(whole.end(), |m| m.end());
                value = None;
            }
            _ => {}
        }

        let value = value
            .map(str::to_string)
            .unwrap_or_else(|| flag.default_value().to_string());
        parsed.insert(flag, value);

        let start = whole.start();
        cut_span(buffer, start, end);
        search_from = 0;
    }

    Ok(parsed)
}
