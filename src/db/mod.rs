use std::{
    path::PathBuf,
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use log::{error, info};
use rusqlite::{params, Connection};
use tokio::sync::oneshot;

mod migrations;

use crate::models::{AlertKind, AlertRecord, DeliveryStatus};
use migrations::run_migrations;

type DbTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum DbCommand {
    Execute(DbTask),
    Shutdown,
}

struct DatabaseInner {
    sender: mpsc::Sender<DbCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for DatabaseInner {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if let Err(err) = self.sender.send(DbCommand::Shutdown) {
                error!("Failed to send shutdown to DB thread: {err}");
            }
            if let Err(join_err) = handle.join() {
                error!("Failed to join DB thread: {join_err:?}");
            }
        }
    }
}

fn parse_datetime(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| anyhow!("invalid datetime '{value}': {err}"))
}

fn kind_from_str(value: &str) -> Result<AlertKind> {
    match value {
        "PPE Missing" => Ok(AlertKind::MissingPpe),
        "Unauthorized Labourer" => Ok(AlertKind::UnauthorizedLabourer),
        _ => Err(anyhow!("unknown alert type '{value}'")),
    }
}

fn status_from_str(value: &str) -> Result<DeliveryStatus> {
    match value {
        "sent" => Ok(DeliveryStatus::Sent),
        "failed" => Ok(DeliveryStatus::Failed),
        "shown" => Ok(DeliveryStatus::Shown),
        _ => Err(anyhow!("unknown delivery status '{value}'")),
    }
}

/// Alert store on a dedicated worker thread.
///
/// All reads and writes funnel through the command channel, which also
/// serializes the dashboard's history queries against alert inserts.
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

impl Database {
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let (command_tx, command_rx) = mpsc::channel::<DbCommand>();
        let (ready_tx, ready_rx) = mpsc::channel();
        let path_for_thread = db_path.clone();

        let worker = thread::Builder::new()
            .name("ppewatch-db".into())
            .spawn(move || {
                let mut conn = match Connection::open(&path_for_thread) {
                    Ok(connection) => connection,
                    Err(err) => {
                        let _ = ready_tx.send(Err(anyhow::Error::new(err)
                            .context("failed to open SQLite database")));
                        return;
                    }
                };

                if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
                    error!("Failed to enable WAL mode: {err}");
                }

                let init_result =
                    run_migrations(&mut conn).context("failed to run database migrations");
                if ready_tx.send(init_result).is_err() {
                    error!("DB initialization receiver dropped before ready signal");
                    return;
                }

                while let Ok(command) = command_rx.recv() {
                    match command {
                        DbCommand::Execute(task) => {
                            task(&mut conn);
                        }
                        DbCommand::Shutdown => break,
                    }
                }

                info!("Database thread shutting down");
            })
            .with_context(|| "failed to spawn database worker thread")?;

        ready_rx
            .recv()
            .context("database worker exited before signaling readiness")??;

        info!("Database initialized at {}", db_path.display());

        Ok(Self {
            inner: Arc::new(DatabaseInner {
                sender: command_tx,
                worker: Mutex::new(Some(worker)),
            }),
        })
    }

    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let sender = self.inner.sender.clone();
        let (reply_tx, reply_rx) = oneshot::channel();

        let command = DbCommand::Execute(Box::new(move |conn| {
            let result = task(conn);
            if reply_tx.send(result).is_err() {
                error!("DB caller dropped before receiving result");
            }
        }));

        sender
            .send(command)
            .map_err(|err| anyhow!("failed to send command to DB thread: {err}"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("database thread terminated unexpectedly"))?
    }

    pub async fn insert_alert(&self, record: &AlertRecord) -> Result<()> {
        let record = record.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO alerts (timestamp, missing_items, alert_type, status)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    record.timestamp.to_rfc3339(),
                    record.missing_items,
                    record.alert_type.as_str(),
                    record.status.as_str(),
                ],
            )
            .with_context(|| "failed to insert alert record")?;
            Ok(())
        })
        .await
    }

    /// Most recent alerts first.
    pub async fn list_recent_alerts(&self, limit: u32) -> Result<Vec<AlertRecord>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, timestamp, missing_items, alert_type, status
                 FROM alerts
                 ORDER BY timestamp DESC
                 LIMIT ?1",
            )?;

            let mut rows = stmt.query(params![limit])?;
            let mut records = Vec::new();
            while let Some(row) = rows.next()? {
                records.push(AlertRecord {
                    id: Some(row.get::<_, i64>(0)?),
                    timestamp: parse_datetime(&row.get::<_, String>(1)?)?,
                    missing_items: row.get::<_, String>(2)?,
                    alert_type: kind_from_str(&row.get::<_, String>(3)?)?,
                    status: status_from_str(&row.get::<_, String>(4)?)?,
                });
            }

            Ok(records)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use tempfile::tempdir;

    fn record(timestamp: DateTime<Utc>, items: &str, status: DeliveryStatus) -> AlertRecord {
        AlertRecord {
            id: None,
            timestamp,
            missing_items: items.to_string(),
            alert_type: AlertKind::MissingPpe,
            status,
        }
    }

    #[tokio::test]
    async fn inserted_alerts_come_back_newest_first() {
        let dir = tempdir().unwrap();
        let db = Database::new(dir.path().join("alerts.sqlite3")).unwrap();

        let base = Utc::now();
        db.insert_alert(&record(base, "Helmet", DeliveryStatus::Sent))
            .await
            .unwrap();
        db.insert_alert(&record(
            base + TimeDelta::seconds(10),
            "Goggle",
            DeliveryStatus::Shown,
        ))
        .await
        .unwrap();
        db.insert_alert(&record(
            base + TimeDelta::seconds(20),
            "Vest",
            DeliveryStatus::Failed,
        ))
        .await
        .unwrap();

        let records = db.list_recent_alerts(10).await.unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].missing_items, "Vest");
        assert_eq!(records[1].missing_items, "Goggle");
        assert_eq!(records[2].missing_items, "Helmet");
        assert!(records.iter().all(|r| r.id.is_some()));
    }

    #[tokio::test]
    async fn limit_caps_the_number_of_returned_alerts() {
        let dir = tempdir().unwrap();
        let db = Database::new(dir.path().join("alerts.sqlite3")).unwrap();

        let base = Utc::now();
        for offset in 0..5 {
            db.insert_alert(&record(
                base + TimeDelta::seconds(offset),
                "Helmet",
                DeliveryStatus::Sent,
            ))
            .await
            .unwrap();
        }

        assert_eq!(db.list_recent_alerts(2).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn round_trips_kind_and_status() {
        let dir = tempdir().unwrap();
        let db = Database::new(dir.path().join("alerts.sqlite3")).unwrap();

        let unauthorized = AlertRecord {
            id: None,
            timestamp: Utc::now(),
            missing_items: "Unauthorized Labourer".to_string(),
            alert_type: AlertKind::UnauthorizedLabourer,
            status: DeliveryStatus::Shown,
        };
        db.insert_alert(&unauthorized).await.unwrap();

        let records = db.list_recent_alerts(1).await.unwrap();
        assert_eq!(records[0].alert_type, AlertKind::UnauthorizedLabourer);
        assert_eq!(records[0].status, DeliveryStatus::Shown);
        assert_eq!(records[0].timestamp, unauthorized.timestamp);
    }
}
