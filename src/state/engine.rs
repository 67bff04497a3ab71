//! Timer engine: owns the timer state, the tick loop and reconciliation
//!
//! ```text
//! Idle --start--> Active --tick (end reached)--> Ended
//!   ^               |  ^                           |
//!   +-----stop------+  +-----------start-----------+
//! ```
//!
//! The engine is a cheap handle. Clone it into every consumer that needs the
//! timer; all clones share one state, one store record and one tick loop.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use chrono::{DateTime, Utc};
use tokio::{
    runtime::Handle,
    sync::{broadcast, watch},
};
use tracing::{debug, info, warn};

use super::{
    session::Reading, PersistedTimerRecord, SessionDescriptor, SessionId, Subscription,
    TimerState,
};
use crate::{error::EngineError, services::TimerStore, tasks::TickLoop, utils::clock::Clock};

/// Tunables for a [`TimerEngine`]
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Interval between ticks
    pub tick_period: Duration,
    /// States a slow subscriber may fall behind before skipping ahead
    pub channel_capacity: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            tick_period: Duration::from_secs(1),
            channel_capacity: 64,
        }
    }
}

/// Result of one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TickOutcome {
    Continue,
    Finished,
    /// The loop belongs to a timer that has been replaced or stopped
    Stale,
}

#[derive(Debug, Default)]
struct Inner {
    /// Bumped on every start, stop and resume so older loops can tell they are stale
    generation: u64,
    /// Session being ticked, present only while active
    session: Option<SessionDescriptor>,
    last_elapsed: u64,
    tick_loop: Option<TickLoop>,
}

pub(crate) struct EngineCore {
    clock: Arc<dyn Clock>,
    store: Arc<dyn TimerStore>,
    settings: EngineSettings,
    runtime: Handle,
    inner: Mutex<Inner>,
    /// Every published state, in order
    state_tx: broadcast::Sender<TimerState>,
    /// Latest published state
    latest_tx: watch::Sender<TimerState>,
}

/// Shared timer for the active study session
#[derive(Clone)]
pub struct TimerEngine {
    core: Arc<EngineCore>,
}

impl TimerEngine {
    /// Create an engine and reconcile it with whatever the store holds.
    ///
    /// Must be called inside a Tokio runtime; the tick loop is spawned on it.
    pub fn new(
        clock: Arc<dyn Clock>,
        store: Arc<dyn TimerStore>,
        settings: EngineSettings,
    ) -> Result<Self, EngineError> {
        let engine = Self::new_idle(clock, store, settings)?;
        engine.resume();
        Ok(engine)
    }

    /// Create an idle engine without looking at the store
    pub fn new_idle(
        clock: Arc<dyn Clock>,
        store: Arc<dyn TimerStore>,
        settings: EngineSettings,
    ) -> Result<Self, EngineError> {
        let runtime = Handle::try_current().map_err(|_| EngineError::NoRuntime)?;
        let (state_tx, _) = broadcast::channel(settings.channel_capacity.max(1));
        let (latest_tx, _) = watch::channel(TimerState::new());

        Ok(Self {
            core: Arc::new(EngineCore {
                clock,
                store,
                settings,
                runtime,
                inner: Mutex::new(Inner::default()),
                state_tx,
                latest_tx,
            }),
        })
    }

    /// Subscribe to state changes, starting with the current state
    pub fn subscribe(&self) -> Subscription {
        // Holding the lock keeps a publish from slipping between the two reads
        let _inner = self.core.lock();
        let current = self.core.latest_tx.borrow().clone();
        Subscription::new(current, self.core.state_tx.subscribe())
    }

    /// Latest-value view for consumers that only render the newest state
    pub fn watch(&self) -> watch::Receiver<TimerState> {
        self.core.latest_tx.subscribe()
    }

    pub fn current(&self) -> TimerState {
        self.core.latest_tx.borrow().clone()
    }

    /// Whether a tick loop is alive
    pub fn is_ticking(&self) -> bool {
        self.core
            .lock()
            .tick_loop
            .as_ref()
            .is_some_and(TickLoop::is_running)
    }

    /// Whether `id` is the session currently being ticked
    pub fn is_tracking(&self, id: &SessionId) -> bool {
        self.core
            .lock()
            .session
            .as_ref()
            .is_some_and(|session| &session.id == id)
    }

    /// Start timing a session, replacing any timer already running.
    ///
    /// Invalid input is rejected before anything changes.
    pub fn start(&self, session: SessionDescriptor) -> Result<TimerState, EngineError> {
        session.validate()?;

        let core = &self.core;
        let mut inner = core.lock();
        core.cancel_loop(&mut inner);

        if let Err(e) = core.store.save(&PersistedTimerRecord::from(&session)) {
            warn!("Failed to persist timer for session {}: {}", session.id, e);
        }

        info!(
            "Starting timer for session {} (start={}, end={})",
            session.id, session.start_time, session.end_time
        );
        let now = core.clock.now();
        Ok(core.activate(&mut inner, session, now))
    }

    /// Stop the timer, forget the persisted record and go idle
    pub fn stop(&self) -> TimerState {
        let core = &self.core;
        let mut inner = core.lock();
        core.cancel_loop(&mut inner);

        if let Err(e) = core.store.clear() {
            warn!("Failed to clear persisted timer: {}", e);
        }

        info!("Timer stopped");
        core.reset(&mut inner)
    }

    /// Rebuild the timer from the persisted record, if it is still live.
    ///
    /// Missing, malformed, finished and not-yet-started records are removed
    /// and leave the engine idle.
    pub fn resume(&self) -> TimerState {
        let core = &self.core;
        let mut inner = core.lock();
        core.cancel_loop(&mut inner);

        let session = match core.store.load().map(|record| record.to_session()) {
            None => {
                debug!("No persisted timer to resume");
                core.discard_record();
                return core.reset(&mut inner);
            }
            Some(Err(e)) => {
                warn!("Discarding invalid persisted timer: {}", e);
                core.discard_record();
                return core.reset(&mut inner);
            }
            Some(Ok(session)) => session,
        };

        let now = core.clock.now();
        // Less than a whole second left counts as already over
        let finished = matches!(session.read_at(now), Reading::Finished { .. });
        if session.end_time.has_passed(now) || finished {
            info!(
                "Discarding persisted timer for session {}: it ended at {}",
                session.id, session.end_time
            );
            core.discard_record();
            return core.reset(&mut inner);
        }
        if now < session.start_time {
            warn!(
                "Discarding persisted timer for session {}: start {} is in the future",
                session.id, session.start_time
            );
            core.discard_record();
            return core.reset(&mut inner);
        }

        info!("Resuming timer for session {}", session.id);
        core.activate(&mut inner, session, now)
    }
}

impl EngineCore {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Send a state to every subscriber. Callers hold the inner lock.
    fn publish(&self, state: TimerState) {
        self.latest_tx.send_replace(state.clone());
        if self.state_tx.send(state).is_err() {
            debug!("No timer subscribers");
        }
    }

    fn cancel_loop(&self, inner: &mut Inner) {
        if let Some(tick_loop) = inner.tick_loop.take() {
            tick_loop.cancel();
            debug!("Cancelled tick loop {}", inner.generation);
        }
    }

    fn discard_record(&self) {
        if let Err(e) = self.store.clear() {
            warn!("Failed to remove persisted timer: {}", e);
        }
    }

    fn reset(&self, inner: &mut Inner) -> TimerState {
        inner.generation += 1;
        inner.session = None;
        inner.last_elapsed = 0;
        let idle = TimerState::new();
        self.publish(idle.clone());
        idle
    }

    /// Publish the reading of `session` at `now` and start ticking it unless it is already over
    fn activate(
        self: &Arc<Self>,
        inner: &mut Inner,
        session: SessionDescriptor,
        now: DateTime<Utc>,
    ) -> TimerState {
        inner.generation += 1;
        inner.last_elapsed = 0;

        match session.read_at(now) {
            Reading::Finished { elapsed } => {
                info!("Session {} is already over", session.id);
                inner.session = None;
                let ended = TimerState::ended(&session, elapsed);
                self.publish(ended.clone());
                ended
            }
            Reading::Running { elapsed, remaining } => {
                let state = TimerState::active(&session, elapsed, remaining);
                self.publish(state.clone());
                inner.last_elapsed = elapsed;
                inner.session = Some(session);
                inner.tick_loop = Some(TickLoop::spawn(
                    &self.runtime,
                    Arc::downgrade(self),
                    inner.generation,
                    self.settings.tick_period,
                ));
                state
            }
        }
    }

    pub(crate) fn tick(&self, generation: u64) -> TickOutcome {
        let mut inner = self.lock();
        if inner.generation != generation {
            return TickOutcome::Stale;
        }
        let Some(session) = inner.session.take() else {
            return TickOutcome::Stale;
        };

        match session.read_at(self.clock.now()) {
            Reading::Running { elapsed, remaining } => {
                // Wall-clock steps backwards must not make elapsed shrink
                let elapsed = elapsed.max(inner.last_elapsed);
                inner.last_elapsed = elapsed;
                self.publish(TimerState::active(&session, elapsed, remaining));
                inner.session = Some(session);
                TickOutcome::Continue
            }
            Reading::Finished { elapsed } => {
                info!("Session {} reached its end after {}s", session.id, elapsed);
                self.publish(TimerState::ended(&session, elapsed));
                inner.tick_loop = None;
                TickOutcome::Finished
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        services::MemoryStore,
        state::{EndTime, Remaining, TimerPhase},
        utils::clock::ManualClock,
    };
    use chrono::{TimeDelta, TimeZone, Utc};

    fn setup() -> (Arc<ManualClock>, Arc<MemoryStore>, TimerEngine) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
        ));
        let store = Arc::new(MemoryStore::new());
        let engine =
            TimerEngine::new_idle(clock.clone(), store.clone(), EngineSettings::default()).unwrap();
        (clock, store, engine)
    }

    fn current_generation(engine: &TimerEngine) -> u64 {
        engine.core.lock().generation
    }

    #[test]
    fn construction_needs_a_runtime() {
        let result = TimerEngine::new_idle(
            Arc::new(ManualClock::new(Utc::now())),
            Arc::new(MemoryStore::new()),
            EngineSettings::default(),
        );
        assert!(matches!(result, Err(EngineError::NoRuntime)));
    }

    #[tokio::test]
    async fn manual_ticks_count_up_and_end() {
        let (clock, _store, engine) = setup();
        let now = clock.now();
        engine
            .start(SessionDescriptor::new(1, now, EndTime::At(now + TimeDelta::seconds(3))))
            .unwrap();
        let generation = current_generation(&engine);

        clock.advance(TimeDelta::seconds(2));
        assert_eq!(engine.core.tick(generation), TickOutcome::Continue);
        assert_eq!(engine.current().elapsed_seconds, 2);
        assert_eq!(engine.current().remaining, Some(Remaining::Seconds(1)));

        clock.advance(TimeDelta::seconds(1));
        assert_eq!(engine.core.tick(generation), TickOutcome::Finished);
        let ended = engine.current();
        assert_eq!(ended.phase(), TimerPhase::Ended);
        assert_eq!(ended.elapsed_seconds, 3);
        assert!(!engine.is_tracking(&SessionId::Number(1)));

        assert_eq!(engine.core.tick(generation), TickOutcome::Stale);
    }

    #[tokio::test]
    async fn old_generation_cannot_publish() {
        let (clock, _store, engine) = setup();
        let now = clock.now();
        engine
            .start(SessionDescriptor::new(1, now, EndTime::Open))
            .unwrap();
        let first = current_generation(&engine);
        engine
            .start(SessionDescriptor::new(2, now, EndTime::Open))
            .unwrap();

        assert_eq!(engine.core.tick(first), TickOutcome::Stale);
        assert_eq!(engine.current().session_id, Some(SessionId::Number(2)));
    }

    #[tokio::test]
    async fn elapsed_never_goes_backwards() {
        let (clock, _store, engine) = setup();
        let now = clock.now();
        engine
            .start(SessionDescriptor::new(1, now, EndTime::Open))
            .unwrap();
        let generation = current_generation(&engine);

        clock.advance(TimeDelta::seconds(30));
        engine.core.tick(generation);
        clock.advance(TimeDelta::seconds(-20));
        engine.core.tick(generation);
        assert_eq!(engine.current().elapsed_seconds, 30);
    }

    #[tokio::test]
    async fn start_after_end_publishes_ended_without_loop() {
        let (clock, store, engine) = setup();
        let now = clock.now();
        let state = engine
            .start(SessionDescriptor::new(
                "late",
                now - TimeDelta::hours(2),
                EndTime::At(now - TimeDelta::hours(1)),
            ))
            .unwrap();

        assert_eq!(state.phase(), TimerPhase::Ended);
        assert_eq!(state.elapsed_seconds, 3600);
        assert!(!engine.is_ticking());
        assert!(store.load().is_some());
    }

    #[tokio::test]
    async fn rejected_start_changes_nothing() {
        let (clock, store, engine) = setup();
        let now = clock.now();
        engine
            .start(SessionDescriptor::new(1, now, EndTime::Open))
            .unwrap();
        let before = engine.current();

        let err = engine
            .start(SessionDescriptor::new("", now, EndTime::Open))
            .unwrap_err();
        assert!(matches!(err, EngineError::MissingSessionId));
        let err = engine
            .start(SessionDescriptor::new(
                2,
                now,
                EndTime::At(now - TimeDelta::seconds(1)),
            ))
            .unwrap_err();
        assert!(matches!(err, EngineError::EndBeforeStart));

        assert_eq!(engine.current(), before);
        assert_eq!(store.load().unwrap().session_id, SessionId::Number(1));
        assert!(engine.is_tracking(&SessionId::Number(1)));
    }

    #[tokio::test]
    async fn resume_rejects_future_start() {
        let (clock, store, engine) = setup();
        let now = clock.now();
        store
            .save(&PersistedTimerRecord {
                session_id: SessionId::Number(9),
                start_time: now + TimeDelta::minutes(5),
                end_time: EndTime::Open,
            })
            .unwrap();

        assert_eq!(engine.resume().phase(), TimerPhase::Idle);
        assert_eq!(store.raw(), None);
        assert!(!engine.is_ticking());
    }

    #[tokio::test]
    async fn resume_leaves_record_untouched() {
        let (clock, store, engine) = setup();
        let now = clock.now();
        store.set_raw(format!(
            r#"{{"sessionId":"room-1","startTimeISO":"{}","endTimeISO":"infinity"}}"#,
            crate::state::session::to_iso(&(now - TimeDelta::seconds(42)))
        ));
        let raw = store.raw();

        let state = engine.resume();
        assert_eq!(state.phase(), TimerPhase::Active);
        assert_eq!(state.elapsed_seconds, 42);
        assert!(engine.is_tracking(&SessionId::from("room-1")));
        assert_eq!(store.raw(), raw);
    }

    #[tokio::test]
    async fn subscribers_see_current_state_first() {
        let (clock, _store, engine) = setup();
        let now = clock.now();
        engine
            .start(SessionDescriptor::new(5, now, EndTime::Open))
            .unwrap();

        let mut widget = engine.subscribe();
        let mut room = engine.clone().subscribe();
        for sub in [&mut widget, &mut room] {
            let first = sub.try_recv().unwrap();
            assert_eq!(first.session_id, Some(SessionId::Number(5)));
            assert!(sub.try_recv().is_none());
        }

        engine.stop();
        assert_eq!(widget.try_recv().unwrap().phase(), TimerPhase::Idle);
        assert_eq!(room.try_recv().unwrap().phase(), TimerPhase::Idle);
    }
}
