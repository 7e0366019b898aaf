use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AlertKind {
    MissingPpe,
    UnauthorizedLabourer,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::MissingPpe => "PPE Missing",
            AlertKind::UnauthorizedLabourer => "Unauthorized Labourer",
        }
    }
}

/// What happened to an alert on its single delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeliveryStatus {
    Sent,
    Failed,
    Shown,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Failed => "failed",
            DeliveryStatus::Shown => "shown",
        }
    }
}

/// Persisted alert entry. Created at fire time, immutable afterwards; the
/// id is assigned by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRecord {
    pub id: Option<i64>,
    pub timestamp: DateTime<Utc>,
    pub missing_items: String,
    pub alert_type: AlertKind,
    pub status: DeliveryStatus,
}
