use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use log::info;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::alerts::{AlertDispatcher, AlertEngine};
use crate::history::HistoryBuffer;
use crate::models::Snapshot;
use crate::presence::PresenceTracker;

use super::loop_worker::{monitor_loop, MonitorTask};
use super::UiEvent;

const HISTORY_CAPACITY: usize = 100;
const UI_CHANNEL_CAPACITY: usize = 64;

/// Owns the monitor loop task: start, pause toggle, shutdown, and the
/// handles external consumers read from (UI events, trend history).
pub struct MonitorController {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
    pause_tx: watch::Sender<bool>,
    ui_tx: broadcast::Sender<UiEvent>,
    history: Arc<Mutex<HistoryBuffer>>,
}

impl MonitorController {
    pub fn new() -> Self {
        let (pause_tx, _) = watch::channel(false);
        let (ui_tx, _) = broadcast::channel(UI_CHANNEL_CAPACITY);
        Self {
            handle: None,
            cancel_token: None,
            pause_tx,
            ui_tx,
            history: Arc::new(Mutex::new(HistoryBuffer::new(HISTORY_CAPACITY))),
        }
    }

    pub fn start(
        &mut self,
        lines: mpsc::Receiver<String>,
        engine: AlertEngine,
        dispatcher: AlertDispatcher,
    ) -> Result<()> {
        if self.handle.is_some() {
            bail!("monitor already running");
        }

        let cancel_token = CancellationToken::new();
        let task = MonitorTask {
            lines,
            presence: PresenceTracker::new(),
            engine,
            history: Arc::clone(&self.history),
            dispatcher,
            ui_tx: self.ui_tx.clone(),
        };
        let handle = tokio::spawn(monitor_loop(
            task,
            cancel_token.clone(),
            self.pause_tx.subscribe(),
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    /// Paused, the loop idles without consuming input; presence keeps
    /// decaying on its own since it is time-based.
    pub fn set_paused(&self, paused: bool) {
        let _ = self.pause_tx.send(paused);
        info!("monitor {}", if paused { "paused" } else { "resumed" });
    }

    pub fn is_paused(&self) -> bool {
        *self.pause_tx.borrow()
    }

    pub fn ui_sender(&self) -> broadcast::Sender<UiEvent> {
        self.ui_tx.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UiEvent> {
        self.ui_tx.subscribe()
    }

    /// The last `limit` snapshots in chronological order, for trend display.
    pub fn recent_history(&self, limit: usize) -> Vec<Snapshot> {
        let guard = match self.history.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.recent(limit)
    }

    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("monitor loop task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }
}

impl Default for MonitorController {
    fn default() -> Self {
        Self::new()
    }
}
