//! SLA threshold tracking and one-shot escalation.
//!
//! A case moves through `OnTrack < Warning50 < Warning80 < Breached` and
//! never moves back. Each warning trigger is sent at most once per case,
//! and breach escalates the case exactly once.

use crate::case::{AuthorityTier, CaseEvent, CaseStatus, GrievanceCase};
use crate::error::CoreError;
use crate::notification::{TriggerConfig, TriggerType};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Percentages used when a trigger configuration is absent.
pub const DEFAULT_WARNING_PERCENT: u32 = 50;
pub const DEFAULT_APPROACHING_PERCENT: u32 = 80;
pub const DEFAULT_BREACH_PERCENT: u32 = 100;
/// Longest quiet period a NO_UPDATE_N_DAYS trigger may wait for (10 years).
pub const MAX_NO_UPDATE_DAYS: u32 = 3_650;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SlaState {
    #[default]
    OnTrack,
    Warning50,
    Warning80,
    Breached,
}

impl fmt::Display for SlaState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::OnTrack => "on_track",
            Self::Warning50 => "warning_50",
            Self::Warning80 => "warning_80",
            Self::Breached => "breached",
        };
        f.write_str(s)
    }
}

/// SLA window applied to a case, fixed when the case is filed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaTarget {
    pub hours: u32,
    /// True when no department/category entry existed and the default was used.
    #[serde(default)]
    pub defaulted: bool,
}

/// Per-case tracker state persisted with the case.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlaProgress {
    pub state: SlaState,
    /// Warning triggers already sent, or skipped by a multi-threshold jump.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub passed: BTreeSet<TriggerType>,
    #[serde(default)]
    pub escalated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_update_notified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlaThresholds {
    pub warning_percent: u32,
    pub approaching_percent: u32,
    pub breach_percent: u32,
    /// `None` when the no-update trigger is absent or disabled.
    pub no_update_days: Option<u32>,
    warning_enabled: bool,
    approaching_enabled: bool,
}

impl Default for SlaThresholds {
    fn default() -> Self {
        Self {
            warning_percent: DEFAULT_WARNING_PERCENT,
            approaching_percent: DEFAULT_APPROACHING_PERCENT,
            breach_percent: DEFAULT_BREACH_PERCENT,
            no_update_days: None,
            warning_enabled: true,
            approaching_enabled: true,
        }
    }
}

impl SlaThresholds {
    /// Read thresholds from trigger configs; missing triggers keep defaults.
    pub fn from_triggers(triggers: &[TriggerConfig], breach_percent: u32) -> Result<Self, CoreError> {
        let mut t = Self {
            breach_percent,
            ..Self::default()
        };
        for trigger in triggers {
            match trigger.trigger_type {
                TriggerType::Sla50Percent => {
                    t.warning_percent = trigger.threshold_value;
                    t.warning_enabled = trigger.enabled;
                }
                TriggerType::SlaApproaching => {
                    t.approaching_percent = trigger.threshold_value;
                    t.approaching_enabled = trigger.enabled;
                }
                TriggerType::NoUpdateNDays => {
                    t.no_update_days = trigger.enabled.then_some(trigger.threshold_value);
                }
            }
        }
        if !(0 < t.warning_percent
            && t.warning_percent < t.approaching_percent
            && t.approaching_percent < t.breach_percent)
        {
            return Err(CoreError::Configuration(format!(
                "SLA thresholds must satisfy 0 < {} < {} < {} (warning < approaching < breach)",
                t.warning_percent, t.approaching_percent, t.breach_percent
            )));
        }
        if let Some(days) = t.no_update_days {
            if days == 0 || days > MAX_NO_UPDATE_DAYS {
                return Err(CoreError::Configuration(format!(
                    "NO_UPDATE_N_DAYS threshold must be between 1 and {} days, got {}",
                    MAX_NO_UPDATE_DAYS, days
                )));
            }
        }
        Ok(t)
    }

    /// State implied by elapsed time alone, in integer arithmetic.
    pub fn state_for(&self, elapsed_secs: i64, sla_secs: i64) -> SlaState {
        let reached = |pct: u32| elapsed_secs * 100 >= i64::from(pct) * sla_secs;
        if reached(self.breach_percent) {
            SlaState::Breached
        } else if reached(self.approaching_percent) {
            SlaState::Warning80
        } else if reached(self.warning_percent) {
            SlaState::Warning50
        } else {
            SlaState::OnTrack
        }
    }

    fn enabled(&self, trigger: TriggerType) -> bool {
        match trigger {
            TriggerType::Sla50Percent => self.warning_enabled,
            TriggerType::SlaApproaching => self.approaching_enabled,
            TriggerType::NoUpdateNDays => self.no_update_days.is_some(),
        }
    }
}

/// Side effect the caller must carry out after persisting the case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum SlaEffect {
    Notify { trigger: TriggerType },
    Escalate { from: AuthorityTier, to: AuthorityTier },
}

/// Result of one SLA check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlaCheck {
    pub previous: SlaState,
    pub state: SlaState,
    pub elapsed_fraction: f64,
    pub effects: Vec<SlaEffect>,
}

impl SlaCheck {
    pub fn changed(&self) -> bool {
        self.state != self.previous || !self.effects.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SlaTracker {
    thresholds: SlaThresholds,
}

impl SlaTracker {
    pub fn new(thresholds: SlaThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &SlaThresholds {
        &self.thresholds
    }

    /// Advance `case` to `now` and return what must be sent.
    ///
    /// Mutates only the working copy; the caller persists it with a
    /// compare-and-swap write before acting on the effects. Resolved
    /// cases are left untouched.
    pub fn check(&self, case: &mut GrievanceCase, now: DateTime<Utc>) -> Option<SlaCheck> {
        if case.status == CaseStatus::Resolved {
            return None;
        }
        let previous = case.sla.state;
        let sla_secs = i64::from(case.sla_target.hours) * 3600;
        let elapsed_secs = (now - case.created_at).num_seconds().max(0);
        let computed = self.thresholds.state_for(elapsed_secs, sla_secs);
        let state = previous.max(computed);
        let mut effects = Vec::new();

        if state > previous {
            case.sla.state = state;
            if let Some(trigger) = self.advance_warnings(&mut case.sla, state) {
                effects.push(SlaEffect::Notify { trigger });
            }
            tracing::info!(case = %case.id, from = %previous, to = %state, "SLA state advanced");
        }

        if state == SlaState::Breached && !case.sla.escalated {
            let from = case.authority_tier;
            let to = from.next();
            case.sla.escalated = true;
            case.authority_tier = to;
            case.status = CaseStatus::Escalated;
            case.record(
                CaseEvent::Escalated,
                format!("SLA breached, escalated from {} to {}", from, to),
                now,
            );
            tracing::warn!(case = %case.id, %from, %to, "SLA breached, case escalated");
            effects.push(SlaEffect::Escalate { from, to });
        }

        if self.no_update_due(case, now) {
            case.sla.no_update_notified_at = Some(now);
            effects.push(SlaEffect::Notify {
                trigger: TriggerType::NoUpdateNDays,
            });
        }

        for effect in &effects {
            if let SlaEffect::Notify { trigger } = effect {
                case.record(CaseEvent::Notified, trigger.as_str(), now);
            }
        }

        Some(SlaCheck {
            previous,
            state,
            elapsed_fraction: case.elapsed_fraction(now),
            effects,
        })
    }

    /// Mark warnings up to `state` as passed; return the one to notify.
    ///
    /// Only the highest newly reached warning is sent. A jump straight to
    /// Breached sends no warning, escalation replaces it.
    fn advance_warnings(&self, progress: &mut SlaProgress, state: SlaState) -> Option<TriggerType> {
        let reached: &[TriggerType] = match state {
            SlaState::OnTrack => &[],
            SlaState::Warning50 => &[TriggerType::Sla50Percent],
            SlaState::Warning80 | SlaState::Breached => {
                &[TriggerType::Sla50Percent, TriggerType::SlaApproaching]
            }
        };
        let highest = reached
            .iter()
            .rev()
            .find(|t| !progress.passed.contains(t))
            .copied();
        progress.passed.extend(reached.iter().copied());
        match (state, highest) {
            (SlaState::Breached, _) => None,
            (_, Some(t)) if self.thresholds.enabled(t) => Some(t),
            _ => None,
        }
    }

    fn no_update_due(&self, case: &GrievanceCase, now: DateTime<Utc>) -> bool {
        let Some(days) = self.thresholds.no_update_days else {
            return false;
        };
        if now - case.last_activity_at < Duration::days(i64::from(days)) {
            return false;
        }
        match case.sla.no_update_notified_at {
            None => true,
            Some(notified) => notified < case.last_activity_at,
        }
    }
}
