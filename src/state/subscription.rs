//! Subscriber side of the timer broadcast

use futures::stream::{self, Stream};
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::warn;

use super::TimerState;

/// Stream of timer states for one subscriber.
///
/// Yields the state current at subscription time first, then every state
/// published afterwards, in order.
#[derive(Debug)]
pub struct Subscription {
    pending: Option<TimerState>,
    rx: broadcast::Receiver<TimerState>,
}

impl Subscription {
    pub(crate) fn new(current: TimerState, rx: broadcast::Receiver<TimerState>) -> Self {
        Self {
            pending: Some(current),
            rx,
        }
    }

    /// Wait for the next state; `None` once the engine is gone
    pub async fn recv(&mut self) -> Option<TimerState> {
        if let Some(state) = self.pending.take() {
            return Some(state);
        }
        loop {
            match self.rx.recv().await {
                Ok(state) => return Some(state),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Timer subscriber lagged, skipped {} states", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next state if one is already queued
    pub fn try_recv(&mut self) -> Option<TimerState> {
        if let Some(state) = self.pending.take() {
            return Some(state);
        }
        loop {
            match self.rx.try_recv() {
                Ok(state) => return Some(state),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!("Timer subscriber lagged, skipped {} states", skipped);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = TimerState> {
        stream::unfold(self, |mut sub| async move {
            sub.recv().await.map(|state| (state, sub))
        })
    }
}
