use crate::case::{CaseId, GrievanceCase};
use crate::taxonomy::Language;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Proactive notification kinds sent to citizens about open cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TriggerType {
    /// Case has used a configured percentage of its SLA (default 50 %).
    #[serde(rename = "SLA_50_PERCENT")]
    Sla50Percent,
    /// Deadline is close (default 80 % of the SLA).
    #[serde(rename = "SLA_APPROACHING")]
    SlaApproaching,
    /// No visible progress for a configured number of days.
    #[serde(rename = "NO_UPDATE_N_DAYS")]
    NoUpdateNDays,
}

impl TriggerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sla50Percent => "SLA_50_PERCENT",
            Self::SlaApproaching => "SLA_APPROACHING",
            Self::NoUpdateNDays => "NO_UPDATE_N_DAYS",
        }
    }
}

impl fmt::Display for TriggerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Threshold and bilingual message for one trigger type.
///
/// `threshold_value` is a percentage of the SLA for the two SLA triggers
/// and a number of days for [`TriggerType::NoUpdateNDays`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerConfig {
    pub trigger_type: TriggerType,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub threshold_value: u32,
    pub message_template_en: String,
    pub message_template_te: String,
}

fn default_true() -> bool {
    true
}

impl TriggerConfig {
    pub fn template(&self, language: Language) -> &str {
        match language {
            Language::En => &self.message_template_en,
            Language::Te => &self.message_template_te,
        }
    }
}

/// Values substituted into trigger message templates.
#[derive(Debug, Clone)]
pub struct MessageContext {
    pub case_id: String,
    pub days_elapsed: i64,
    pub days_remaining: i64,
    pub days_since_update: i64,
    pub status_en: String,
    pub status_te: String,
}

impl MessageContext {
    pub fn for_case(case: &GrievanceCase, now: DateTime<Utc>) -> Self {
        let status = case.status.public_status();
        Self {
            case_id: case.id.to_string(),
            days_elapsed: (now - case.created_at).num_days().max(0),
            days_remaining: (case.sla_deadline() - now).num_days().max(0),
            days_since_update: (now - case.last_activity_at).num_days().max(0),
            status_en: status.label(Language::En).to_string(),
            status_te: status.label(Language::Te).to_string(),
        }
    }
}

/// Substitute `{case_id}`, `{days_elapsed}`, `{status}`, `{days_remaining}`
/// and `{days_since_update}` in a message template.
pub fn render(template: &str, ctx: &MessageContext, language: Language) -> String {
    let status = match language {
        Language::En => &ctx.status_en,
        Language::Te => &ctx.status_te,
    };
    template
        .replace("{case_id}", &ctx.case_id)
        .replace("{days_elapsed}", &ctx.days_elapsed.to_string())
        .replace("{days_remaining}", &ctx.days_remaining.to_string())
        .replace("{days_since_update}", &ctx.days_since_update.to_string())
        .replace("{status}", status)
}

/// A rendered proactive notification, ready for delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub case_id: CaseId,
    pub trigger_type: TriggerType,
    pub rendered_message_en: String,
    pub rendered_message_te: String,
    pub created_at: DateTime<Utc>,
}

impl NotificationEvent {
    pub fn render_for(case: &GrievanceCase, config: &TriggerConfig, now: DateTime<Utc>) -> Self {
        let ctx = MessageContext::for_case(case, now);
        Self {
            case_id: case.id.clone(),
            trigger_type: config.trigger_type,
            rendered_message_en: render(&config.message_template_en, &ctx, Language::En),
            rendered_message_te: render(&config.message_template_te, &ctx, Language::Te),
            created_at: now,
        }
    }

    pub fn message(&self, language: Language) -> &str {
        match language {
            Language::En => &self.rendered_message_en,
            Language::Te => &self.rendered_message_te,
        }
    }
}
