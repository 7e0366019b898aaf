use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{error, warn};
use tokio::sync::broadcast;
use tokio::time::timeout;

use crate::audio::BuzzerHandle;
use crate::db::Database;
use crate::models::{AlertKind, AlertRecord, DeliveryStatus, Item};
use crate::monitor::UiEvent;
use crate::settings::Settings;

use super::email::Mailer;
use super::engine::AlertIntent;

const EMAIL_TIMEOUT: Duration = Duration::from_secs(15);

/// Turns alert intents into side effects: email delivery, in-app banners,
/// the audible buzzer, and the persisted alert log. Failures are recorded
/// or logged; nothing here ever takes the monitor loop down.
pub struct AlertDispatcher {
    enable_email: bool,
    enable_in_app: bool,
    recipients: Vec<String>,
    buzzer_sound: Option<PathBuf>,
    mailer: Option<Mailer>,
    db: Database,
    buzzer: BuzzerHandle,
    ui_tx: broadcast::Sender<UiEvent>,
}

impl AlertDispatcher {
    pub fn new(
        settings: &Settings,
        mailer: Option<Mailer>,
        db: Database,
        buzzer: BuzzerHandle,
        ui_tx: broadcast::Sender<UiEvent>,
    ) -> Self {
        Self {
            enable_email: settings.enable_email_alerts,
            enable_in_app: settings.enable_in_app_alerts,
            recipients: settings.recipients.clone(),
            buzzer_sound: settings.buzzer_sound.clone(),
            mailer,
            db,
            buzzer,
            ui_tx,
        }
    }

    pub async fn dispatch(&self, intent: AlertIntent) {
        match intent {
            AlertIntent::MissingRequired { items, at } => {
                self.deliver(AlertKind::MissingPpe, &items, at).await;
            }
            AlertIntent::UnauthorizedPresence { at } => {
                self.deliver(AlertKind::UnauthorizedLabourer, &[Item::UnauthorizedLabourer], at)
                    .await;
            }
            AlertIntent::SoundAlarm => self.sound_alarm(),
        }
    }

    async fn deliver(&self, kind: AlertKind, items: &[Item], at: DateTime<Utc>) {
        let item_list = items
            .iter()
            .map(|item| item.label())
            .collect::<Vec<_>>()
            .join(", ");

        if self.enable_email {
            let status = self.send_email(kind, &item_list, at).await;
            self.record(kind, &item_list, at, status).await;
        }

        if self.enable_in_app {
            let _ = self.ui_tx.send(UiEvent::AlertBanner {
                alert_type: kind,
                items: items.to_vec(),
                at,
            });
            self.record(kind, &item_list, at, DeliveryStatus::Shown).await;
        }
    }

    async fn send_email(&self, kind: AlertKind, item_list: &str, at: DateTime<Utc>) -> DeliveryStatus {
        let Some(mailer) = &self.mailer else {
            warn!("email alerts enabled but SMTP is not configured");
            return DeliveryStatus::Failed;
        };

        let body = format!(
            "{}:\n{}\nTime: {}",
            kind.as_str(),
            item_list,
            at.format("%Y-%m-%d %H:%M:%S")
        );
        match timeout(EMAIL_TIMEOUT, mailer.deliver(kind.as_str(), &body, &self.recipients)).await {
            Ok(Ok(())) => DeliveryStatus::Sent,
            Ok(Err(err)) => {
                error!("email delivery failed: {err}");
                DeliveryStatus::Failed
            }
            Err(_) => {
                warn!("email delivery timed out after {}s", EMAIL_TIMEOUT.as_secs());
                DeliveryStatus::Failed
            }
        }
    }

    async fn record(&self, kind: AlertKind, item_list: &str, at: DateTime<Utc>, status: DeliveryStatus) {
        let record = AlertRecord {
            id: None,
            timestamp: at,
            missing_items: item_list.to_string(),
            alert_type: kind,
            status,
        };
        if let Err(err) = self.db.insert_alert(&record).await {
            error!("failed to persist alert record: {err:#}");
        }
    }

    fn sound_alarm(&self) {
        let Some(path) = &self.buzzer_sound else {
            return;
        };
        if !path.exists() {
            warn!("buzzer sound {} not found, skipping", path.display());
            return;
        }
        if let Err(err) = self.buzzer.play(path.clone()) {
            error!("failed to trigger buzzer: {err:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Snapshot;
    use tempfile::tempdir;

    fn test_settings() -> Settings {
        Settings {
            enable_email_alerts: false,
            enable_in_app_alerts: true,
            ..Settings::default()
        }
    }

    fn dispatcher(settings: &Settings, db: Database) -> (AlertDispatcher, broadcast::Receiver<UiEvent>) {
        let (ui_tx, ui_rx) = broadcast::channel(16);
        (
            AlertDispatcher::new(settings, None, db, BuzzerHandle::new(), ui_tx),
            ui_rx,
        )
    }

    #[tokio::test]
    async fn in_app_alert_is_broadcast_and_recorded_as_shown() {
        let dir = tempdir().unwrap();
        let db = Database::new(dir.path().join("alerts.sqlite3")).unwrap();
        let (dispatcher, mut ui_rx) = dispatcher(&test_settings(), db.clone());

        let at = Utc::now();
        dispatcher
            .dispatch(AlertIntent::MissingRequired {
                items: vec![Item::Goggle, Item::Vest],
                at,
            })
            .await;

        match ui_rx.try_recv().unwrap() {
            UiEvent::AlertBanner { alert_type, items, .. } => {
                assert_eq!(alert_type, AlertKind::MissingPpe);
                assert_eq!(items, vec![Item::Goggle, Item::Vest]);
            }
            other => panic!("expected a banner, got {other:?}"),
        }

        let records = db.list_recent_alerts(10).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].missing_items, "Goggle, Vest");
        assert_eq!(records[0].alert_type, AlertKind::MissingPpe);
        assert_eq!(records[0].status, DeliveryStatus::Shown);
    }

    #[tokio::test]
    async fn unconfigured_smtp_records_a_failed_delivery() {
        let dir = tempdir().unwrap();
        let db = Database::new(dir.path().join("alerts.sqlite3")).unwrap();
        let settings = Settings {
            enable_email_alerts: true,
            enable_in_app_alerts: false,
            ..Settings::default()
        };
        let (dispatcher, _ui_rx) = dispatcher(&settings, db.clone());

        dispatcher
            .dispatch(AlertIntent::UnauthorizedPresence { at: Utc::now() })
            .await;

        let records = db.list_recent_alerts(10).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].alert_type, AlertKind::UnauthorizedLabourer);
        assert_eq!(records[0].missing_items, "Unauthorized Labourer");
        assert_eq!(records[0].status, DeliveryStatus::Failed);
    }

    #[tokio::test]
    async fn sound_alarm_without_a_configured_sound_is_a_no_op() {
        let dir = tempdir().unwrap();
        let db = Database::new(dir.path().join("alerts.sqlite3")).unwrap();
        let (dispatcher, _ui_rx) = dispatcher(&test_settings(), db.clone());

        dispatcher.dispatch(AlertIntent::SoundAlarm).await;
        assert!(db.list_recent_alerts(10).await.unwrap().is_empty());
    }

    #[test]
    fn snapshot_items_join_like_the_persisted_column() {
        let snapshot = Snapshot::from_fn(|item| item == Item::Helmet);
        let joined = snapshot
            .missing_monitored()
            .iter()
            .map(|item| item.label())
            .collect::<Vec<_>>()
            .join(", ");
        assert_eq!(joined, "Goggle, Vest");
    }
}
