//! Event sink that publishes to another thread.
//!
//! The interactive surface owns the receiver and only ever *reads*
//! published state; it never touches pins while a run is active.

use std::sync::mpsc::{Receiver, Sender, channel};

use crate::app::events::WashEvent;
use crate::app::ports::EventSink;

pub struct ChannelEventSink {
    tx: Sender<WashEvent>,
}

impl ChannelEventSink {
    /// Create a sink and the receiver the display side listens on.
    pub fn new() -> (Self, Receiver<WashEvent>) {
        let (tx, rx) = channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&mut self, event: &WashEvent) {
        // Fire-and-forget: a closed display must not stop the wash.
        let _ = self.tx.send(event.clone());
    }
}
