//! Tick loop background task

use std::{sync::Weak, time::Duration};

use tokio::{
    runtime::Handle,
    sync::oneshot,
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::debug;

use crate::state::engine::{EngineCore, TickOutcome};

const MIN_TICK_PERIOD: Duration = Duration::from_millis(10);

/// Handle to a running tick loop
#[derive(Debug)]
pub struct TickLoop {
    cancel_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl TickLoop {
    pub(crate) fn spawn(
        runtime: &Handle,
        core: Weak<EngineCore>,
        generation: u64,
        period: Duration,
    ) -> Self {
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let period = period.max(MIN_TICK_PERIOD);
        let handle = runtime.spawn(tick_loop_task(core, generation, period, cancel_rx));
        Self { cancel_tx, handle }
    }

    /// Ask the loop to stop before its next tick
    pub fn cancel(self) {
        // The loop may already have exited on its own
        let _ = self.cancel_tx.send(());
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

/// Fire `tick` on the engine every `period` until cancelled, finished or superseded
pub(crate) async fn tick_loop_task(
    core: Weak<EngineCore>,
    generation: u64,
    period: Duration,
    mut cancel_rx: oneshot::Receiver<()>,
) {
    debug!("Tick loop {} started with period {:?}", generation, period);

    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let Some(core) = core.upgrade() else {
                    debug!("Timer engine dropped, ending tick loop {}", generation);
                    break;
                };
                match core.tick(generation) {
                    TickOutcome::Continue => {}
                    TickOutcome::Finished => {
                        debug!("Tick loop {} reached the session end", generation);
                        break;
                    }
                    TickOutcome::Stale => {
                        debug!("Tick loop {} superseded", generation);
                        break;
                    }
                }
            }

            _ = &mut cancel_rx => {
                debug!("Tick loop {} cancelled", generation);
                break;
            }
        }
    }
}
