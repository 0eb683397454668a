/*!
 * Console transport
 *
 * Stands in for the chat transport: replies are written as numbered lines,
 * retractions as a marker line naming the retracted message.
 */

use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Context;
use cmdgate_core::{AppResult, Reply, ReplySink, SentMessage};
use parking_lot::Mutex;

pub const CONSOLE_CHANNEL: u64 = 1;

pub struct ConsoleTransport<W: Write + Send> {
    out: Mutex<W>,
    next_id: AtomicU64,
}

impl ConsoleTransport<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> ConsoleTransport<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
            next_id: AtomicU64::new(0),
        }
    }

    fn write_line(&self, line: &str) -> AppResult<()> {
        let mut out = self.out.lock();
        writeln!(out, "{}", line).context("failed to write to console")?;
        out.flush().context("failed to flush console")?;
        Ok(())
    }
}

fn render(reply: &Reply) -> String {
    match reply {
        Reply::Text(text) => text.clone(),
        Reply::Embed {
            title,
            description,
            color,
        } => {
            let header = match title {
                Some(title) => format!("== {} ==", title),
                None => "==".to_string(),
            };
            format!("{} (#{:06x})\n{}", header, color, description)
        }
    }
}

impl<W: Write + Send> ReplySink for ConsoleTransport<W> {
    fn send(&self, channel_id: u64, reply: &Reply) -> AppResult<SentMessage> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.write_line(&format!("[{}] {}", id, render(reply)))?;
        Ok(SentMessage { id, channel_id })
    }

    fn delete(&self, message: &SentMessage) -> AppResult<()> {
        self.write_line(&format!("[{}] (retracted)", message.id))
    }
}
