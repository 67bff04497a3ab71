//! Command handlers for the host binary

use anyhow::Context;
use futures::StreamExt;
use tracing::info;

use crate::{
    config::Command,
    state::{session::to_iso, SessionDescriptor, TimerEngine, TimerPhase, TimerState},
    utils::{clock::Clock, signals::shutdown_signal},
};

/// Run one CLI command against the shared engine
pub async fn run_command(engine: &TimerEngine, clock: &dyn Clock, command: &Command) -> anyhow::Result<()> {
    match command {
        Command::Start { session, start, end, watch, json } => {
            let start = start.clone().unwrap_or_else(|| to_iso(&clock.now()));
            let descriptor = SessionDescriptor::parse(session, &start, end.as_deref())
                .context("Invalid session")?;
            let state = engine.start(descriptor)?;
            if *watch {
                watch_timer(engine, *json).await
            } else {
                print_state(&state, *json)
            }
        }
        Command::Stop => print_state(&engine.stop(), false),
        Command::Status { json } => print_state(&engine.current(), *json),
        Command::Watch { json } => watch_timer(engine, *json).await,
    }
}

/// Print states until the timer is no longer active or a shutdown signal arrives
pub async fn watch_timer(engine: &TimerEngine, json: bool) -> anyhow::Result<()> {
    let mut updates = Box::pin(engine.subscribe().into_stream());
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            next = updates.next() => {
                let Some(state) = next else { break };
                print_state(&state, json)?;
                if !state.is_active() {
                    info!("Timer is {:?}, nothing left to watch", state.phase());
                    break;
                }
            }

            result = &mut shutdown => {
                result.context("Failed to install signal handler")?;
                info!("Shutdown signal received, timer keeps its persisted state");
                break;
            }
        }
    }

    Ok(())
}

fn print_state(state: &TimerState, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string(state)?);
    } else {
        println!("{}", describe(state));
    }
    Ok(())
}

/// One-line human description of a state
pub fn describe(state: &TimerState) -> String {
    let id = state
        .session_id
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_default();
    match state.phase() {
        TimerPhase::Idle => "idle".to_string(),
        TimerPhase::Active => format!(
            "session {}: {} elapsed, {} remaining",
            id,
            state.elapsed_time_string,
            state.remaining_time_string()
        ),
        TimerPhase::Ended => format!("session {}: {}", id, state.elapsed_time_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{session::parse_timestamp, EndTime, Remaining};

    fn session(end: EndTime) -> SessionDescriptor {
        SessionDescriptor::new(8, parse_timestamp("start", "2024-05-01T10:00:00Z").unwrap(), end)
    }

    #[test]
    fn describes_each_phase() {
        assert_eq!(describe(&TimerState::new()), "idle");
        assert_eq!(
            describe(&TimerState::active(&session(EndTime::Open), 65, Remaining::Ongoing)),
            "session 8: 00:01:05 elapsed, ongoing remaining"
        );
        assert_eq!(
            describe(&TimerState::active(&session(EndTime::Open), 5, Remaining::Seconds(55))),
            "session 8: 00:00:05 elapsed, 00:00:55 remaining"
        );
        assert_eq!(
            describe(&TimerState::ended(&session(EndTime::Open), 60)),
            "session 8: Ended (00:01:00)"
        );
    }
}
