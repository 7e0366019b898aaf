mod controller;
mod loop_worker;

pub use controller::MonitorController;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{AlertKind, Item, Snapshot};

/// Events forwarded to dashboard subscribers over the broadcast channel.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase", tag = "type")]
pub enum UiEvent {
    LineReceived {
        line: String,
    },
    Snapshot {
        snapshot: Snapshot,
        at: DateTime<Utc>,
    },
    AlertBanner {
        alert_type: AlertKind,
        items: Vec<Item>,
        at: DateTime<Utc>,
    },
}
