//! Prompt ingress: one unbounded FIFO queue every transport writes into
//! and a single agent dispatch loop reads from.

use std::sync::atomic::{AtomicI64, Ordering};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::models::prompt::Prompt;

static MESSAGE_COUNTER: AtomicI64 = AtomicI64::new(0);

/// Next value of the process-wide monotone message counter.
#[must_use]
pub fn next_message_id() -> i64 {
    MESSAGE_COUNTER.fetch_add(1, Ordering::Relaxed) + 1
}

/// Create the prompt queue, returning the clonable writer half and the
/// single consumer half.
#[must_use]
pub fn prompt_channel() -> (PromptSender, PromptReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (PromptSender { tx }, PromptReceiver { rx })
}

/// Writer half of the prompt queue; cheap to clone, never blocks.
#[derive(Clone)]
pub struct PromptSender {
    tx: mpsc::UnboundedSender<Prompt>,
}

impl PromptSender {
    /// Enqueue a prompt. Never blocks; a send after shutdown is dropped
    /// with a warning.
    pub fn enqueue(&self, prompt: Prompt) {
        if let Err(err) = self.tx.send(prompt) {
            warn!(
                chat_id = err.0.chat_id,
                "prompt dropped, dispatch loop has shut down"
            );
        }
    }
}

/// Consumer half of the prompt queue.
pub struct PromptReceiver {
    rx: mpsc::UnboundedReceiver<Prompt>,
}

impl PromptReceiver {
    /// Receive the next prompt, suspending until one arrives.
    ///
    /// Returns `None` when `ct` fires or every sender has been dropped.
    pub async fn recv(&mut self, ct: &CancellationToken) -> Option<Prompt> {
        tokio::select! {
            prompt = self.rx.recv() => prompt,
            () = ct.cancelled() => None,
        }
    }
}
