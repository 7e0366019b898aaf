use std::sync::{Arc, Mutex};

use chrono::Utc;
use log::{info, warn};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{sleep, Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::alerts::{AlertDispatcher, AlertEngine};
use crate::history::HistoryBuffer;
use crate::parser::parse_line;
use crate::presence::PresenceTracker;

use super::UiEvent;

const PAUSED_POLL: Duration = Duration::from_millis(500);

pub(crate) struct MonitorTask {
    pub lines: mpsc::Receiver<String>,
    pub presence: PresenceTracker,
    pub engine: AlertEngine,
    pub history: Arc<Mutex<HistoryBuffer>>,
    pub dispatcher: AlertDispatcher,
    pub ui_tx: broadcast::Sender<UiEvent>,
}

/// One iteration per available line: parse, update presence, snapshot,
/// append history, forward UI events, evaluate and dispatch alerts.
pub(crate) async fn monitor_loop(
    mut task: MonitorTask,
    cancel_token: CancellationToken,
    pause_rx: watch::Receiver<bool>,
) {
    loop {
        if *pause_rx.borrow() {
            // Incoming lines just queue in the channel while paused.
            tokio::select! {
                _ = sleep(PAUSED_POLL) => continue,
                _ = cancel_token.cancelled() => break,
            }
        }

        tokio::select! {
            maybe_line = task.lines.recv() => match maybe_line {
                Some(line) => process_line(&mut task, &line).await,
                None => {
                    warn!("transport channel closed, stopping monitor");
                    break;
                }
            },
            _ = cancel_token.cancelled() => break,
        }
    }
    info!("monitor loop shutting down");
}

async fn process_line(task: &mut MonitorTask, line: &str) {
    let now = Instant::now();
    let wall = Utc::now();

    for (item, at) in parse_line(line, now) {
        task.presence.record_seen(item, at);
    }
    let snapshot = task.presence.snapshot(now);

    {
        let mut history = match task.history.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        history.push(snapshot);
    }

    // Send errors just mean nobody is watching right now.
    let _ = task.ui_tx.send(UiEvent::LineReceived {
        line: line.to_string(),
    });
    let _ = task.ui_tx.send(UiEvent::Snapshot { snapshot, at: wall });

    for intent in task.engine.evaluate(&snapshot, now, wall) {
        task.dispatcher.dispatch(intent).await;
    }
}
