//! Text grammar for command input: flags first, then positional arguments.

pub mod arguments;
pub mod flags;

pub use arguments::{strip_arguments, ParsedArgs};
pub use flags::{strip_flags, ParsedFlags};

/// Removes `start..end` plus any whitespace after it, then trims the buffer.
pub(crate) fn cut_span(buffer: &mut String, start: usize, end: usize) {
    let tail = &buffer[end..];
    let trailing = tail.len() - tail.trim_start().len();
    buffer.replace_range(start..end + trailing, "");
    let trimmed = buffer.trim();
    if trimmed.len() != buffer.len() {
        *buffer = trimmed.to_string();
    }
}
