//! Shared test helpers

#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use cmdgate_core::{AppResult, InboundMessage, Invoker, Reply, ReplySink, SentMessage};
use parking_lot::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Sent { id: u64, channel_id: u64, text: String },
    Deleted { id: u64 },
}

/// Reply sink that records everything it is asked to do.
#[derive(Default)]
pub struct RecordingSink {
    next_id: AtomicU64,
    events: Mutex<Vec<SinkEvent>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().clone()
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                SinkEvent::Sent { text, .. } => Some(text.clone()),
                SinkEvent::Deleted { .. } => None,
            })
            .collect()
    }

    pub fn deleted_ids(&self) -> Vec<u64> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                SinkEvent::Deleted { id } => Some(*id),
                SinkEvent::Sent { .. } => None,
            })
            .collect()
    }
}

impl ReplySink for RecordingSink {
    fn send(&self, channel_id: u64, reply: &Reply) -> AppResult<SentMessage> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.events.lock().push(SinkEvent::Sent {
            id,
            channel_id,
            text: reply.as_plain_text(),
        });
        Ok(SentMessage { id, channel_id })
    }

    fn delete(&self, message: &SentMessage) -> AppResult<()> {
        self.events.lock().push(SinkEvent::Deleted { id: message.id });
        Ok(())
    }
}

pub fn message_from(user_id: u64, content: &str) -> InboundMessage {
    InboundMessage::new(content, Invoker::new(user_id), 100)
}
