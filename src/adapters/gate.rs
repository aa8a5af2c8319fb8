//! Operator acknowledge gates.
//!
//! - [`AutoConfirm`]: answers every prompt with `Proceed` (unattended demo
//!   runs, tests).
//! - [`ChannelGate`]: forwards the prompt to the interactive surface and
//!   blocks the worker until an answer comes back, the stop flag is raised,
//!   or the surface goes away.

use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, channel};
use std::time::Duration;

use log::{info, warn};

use crate::app::cancel::CancelFlag;
use crate::app::ports::{Confirmation, OperatorGate};

#[derive(Debug, Default, Clone, Copy)]
pub struct AutoConfirm;

impl OperatorGate for AutoConfirm {
    fn confirm(&mut self, message: &str) -> Confirmation {
        info!("gate (auto): {message}");
        Confirmation::Proceed
    }
}

/// Stop-flag poll interval while waiting for an answer.
const ANSWER_POLL: Duration = Duration::from_millis(100);

pub struct ChannelGate {
    prompts: Sender<String>,
    answers: Receiver<Confirmation>,
    cancel: CancelFlag,
}

/// The surface's end of a [`ChannelGate`].
pub struct GateEndpoint {
    pub prompts: Receiver<String>,
    pub answers: Sender<Confirmation>,
}

impl ChannelGate {
    pub fn new(cancel: CancelFlag) -> (Self, GateEndpoint) {
        let (prompt_tx, prompt_rx) = channel();
        let (answer_tx, answer_rx) = channel();
        (
            Self {
                prompts: prompt_tx,
                answers: answer_rx,
                cancel,
            },
            GateEndpoint {
                prompts: prompt_rx,
                answers: answer_tx,
            },
        )
    }
}

impl OperatorGate for ChannelGate {
    fn confirm(&mut self, message: &str) -> Confirmation {
        // Drop answers typed before the question was asked.
        while self.answers.try_recv().is_ok() {}

        if self.prompts.send(message.to_owned()).is_err() {
            warn!("gate: no operator surface attached");
            return Confirmation::Cancelled;
        }
        loop {
            if self.cancel.is_requested() {
                return Confirmation::Cancelled;
            }
            match self.answers.recv_timeout(ANSWER_POLL) {
                Ok(answer) => return answer,
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return Confirmation::Cancelled,
            }
        }
    }
}
