use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::models::{Item, Snapshot};

/// How long every required item must be absent before the audible alarm
/// sounds. Intentionally a fixed constant, not derived from the
/// configurable alert threshold.
const BUZZER_AFTER: Duration = Duration::from_secs(5);

/// Whether both alert kinds share one cooldown gate or each has its own.
///
/// Shared is the historical behavior: firing either kind silences both for
/// the cooldown period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CooldownPolicy {
    Shared,
    PerKind,
}

/// An alert the engine wants delivered. Delivery is someone else's job;
/// the engine only describes what should happen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertIntent {
    MissingRequired {
        items: Vec<Item>,
        at: DateTime<Utc>,
    },
    UnauthorizedPresence {
        at: DateTime<Utc>,
    },
    SoundAlarm,
}

#[derive(Debug, Clone, Copy)]
enum GateKind {
    Missing,
    Unauthorized,
}

#[derive(Debug)]
struct CooldownGate {
    policy: CooldownPolicy,
    cooldown: Duration,
    missing_until: Option<Instant>,
    unauthorized_until: Option<Instant>,
}

impl CooldownGate {
    fn new(cooldown: Duration, policy: CooldownPolicy) -> Self {
        Self {
            policy,
            cooldown,
            missing_until: None,
            unauthorized_until: None,
        }
    }

    fn open(&self, kind: GateKind, now: Instant) -> bool {
        let until = match kind {
            GateKind::Missing => self.missing_until,
            GateKind::Unauthorized => self.unauthorized_until,
        };
        until.map(|until| now >= until).unwrap_or(true)
    }

    fn close(&mut self, kind: GateKind, now: Instant) {
        let until = Some(now + self.cooldown);
        match (self.policy, kind) {
            (CooldownPolicy::Shared, _) => {
                self.missing_until = until;
                self.unauthorized_until = until;
            }
            (CooldownPolicy::PerKind, GateKind::Missing) => self.missing_until = until,
            (CooldownPolicy::PerKind, GateKind::Unauthorized) => self.unauthorized_until = until,
        }
    }
}

/// The alert state machine.
///
/// Consumes one presence snapshot at a time and decides whether the
/// missing-equipment alert, the unauthorized-presence alert, or the one-shot
/// audible alarm should fire. Performs no I/O and cannot fail.
#[derive(Debug)]
pub struct AlertEngine {
    threshold: Duration,
    gate: CooldownGate,
    missing_since: Option<Instant>,
    buzzer_armed: bool,
}

impl AlertEngine {
    pub fn new(threshold: Duration, cooldown: Duration, policy: CooldownPolicy) -> Self {
        Self {
            threshold,
            gate: CooldownGate::new(cooldown, policy),
            missing_since: None,
            buzzer_armed: false,
        }
    }

    /// Evaluates one snapshot. `now` drives the streak and cooldown
    /// arithmetic; `wall` is only stamped into the emitted intents.
    pub fn evaluate(
        &mut self,
        snapshot: &Snapshot,
        now: Instant,
        wall: DateTime<Utc>,
    ) -> Vec<AlertIntent> {
        let mut intents = Vec::new();

        let missing = snapshot.missing_monitored();
        if missing.is_empty() {
            self.missing_since = None;
            self.buzzer_armed = false;
        } else {
            match self.missing_since {
                // The evaluation that starts the streak never fires,
                // regardless of threshold or cooldown.
                None => self.missing_since = Some(now),
                Some(start) => {
                    if now.duration_since(start) >= self.threshold
                        && self.gate.open(GateKind::Missing, now)
                    {
                        intents.push(AlertIntent::MissingRequired { items: missing, at: wall });
                        self.gate.close(GateKind::Missing, now);
                        self.missing_since = None;
                    }
                }
            }
        }

        // Audible alarm once nothing at all has been seen for a while.
        // One-shot per streak; the armed flag clears only on full recovery.
        if !snapshot.any_monitored_present() {
            if let Some(start) = self.missing_since {
                if now.duration_since(start) >= BUZZER_AFTER && !self.buzzer_armed {
                    intents.push(AlertIntent::SoundAlarm);
                    self.buzzer_armed = true;
                }
            }
        }

        if snapshot.is_present(Item::UnauthorizedLabourer)
            && self.gate.open(GateKind::Unauthorized, now)
        {
            intents.push(AlertIntent::UnauthorizedPresence { at: wall });
            self.gate.close(GateKind::Unauthorized, now);
        }

        intents
    }
}
