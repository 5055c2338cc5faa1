use crate::case::CaseId;
use crate::error::CoreError;
use crate::template::{ActionCode, ActionStep, ResolutionTemplate, TemplateKey};
use serde::{Deserialize, Serialize};

/// Action codes the built-in [`LoggingExecutor`] accepts.
pub const SUPPORTED_ACTIONS: &[&str] = &[
    "NOTIFY_CITIZEN",
    "NOTIFY_OFFICERS",
    "SEND_VERIFICATION_REQUEST",
    "VERIFY_AADHAAR",
    "FETCH_BANK_DETAILS",
    "UPDATE_PENSION_RECORD",
    "TRIGGER_PAYMENT",
    "IDENTIFY_BLOCKER",
    "ESCALATE_TO_SENIOR",
    "SET_PRIORITY",
    "TRANSFER_CASE",
    "RESET_SLA",
    "CLOSE_DUPLICATE",
    "CHECK_SURVEYOR_AVAILABILITY",
    "ASSIGN_SURVEYOR",
    "SCHEDULE_VISIT",
    "CREATE_REMINDER",
    "VERIFY_LOCATION",
    "ASSESS_SEVERITY",
    "ASSIGN_CONTRACTOR",
    "SCHEDULE_WORK",
    "ANALYZE_CLARIFICATION",
    "IDENTIFY_CORRECT_DEPT",
    "IDENTIFY_ORIGINAL",
    "COMPARE_DETAILS",
    "MERGE_ATTACHMENTS",
    "FIND_AVAILABLE_OFFICER",
    "UPDATE_WORKLOAD",
    "FIND_VERIFIER",
    "SET_DEADLINE",
    "AWAIT_RESPONSE",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub step: u32,
    pub action: ActionCode,
    pub status: ActionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executor: Option<String>,
    pub message: String,
}

/// What an executor knows about the application it is part of.
#[derive(Debug, Clone)]
pub struct ActionContext {
    pub case_id: CaseId,
    pub template_key: TemplateKey,
    pub officer: String,
}

/// Carries out one kind of template action step.
pub trait ActionExecutor: Send + Sync {
    fn name(&self) -> &str;

    fn accepts(&self, action: &ActionCode) -> bool;

    /// Run the step and return a short result message.
    fn execute(&self, ctx: &ActionContext, step: &ActionStep) -> Result<String, CoreError>;
}

/// Records each action in the log and reports it done.
///
/// Stands in for the department integrations (pension, revenue, payment
/// systems) until those register their own executors.
pub struct LoggingExecutor;

impl ActionExecutor for LoggingExecutor {
    fn name(&self) -> &str {
        "logging"
    }

    fn accepts(&self, action: &ActionCode) -> bool {
        SUPPORTED_ACTIONS.contains(&action.as_str())
    }

    fn execute(&self, ctx: &ActionContext, step: &ActionStep) -> Result<String, CoreError> {
        tracing::info!(
            case = %ctx.case_id,
            template = %ctx.template_key,
            officer = %ctx.officer,
            step = step.step,
            action = %step.action,
            "action executed"
        );
        Ok(format!("{}: {}", step.action, step.description))
    }
}

/// Ordered executors; the first that accepts an action code runs it.
pub struct ExecutorRegistry {
    executors: Vec<Box<dyn ActionExecutor>>,
}

impl Default for ExecutorRegistry {
    fn default() -> Self {
        Self {
            executors: vec![Box::new(LoggingExecutor)],
        }
    }
}

impl ExecutorRegistry {
    pub fn empty() -> Self {
        Self {
            executors: Vec::new(),
        }
    }

    /// Register ahead of every executor already present.
    pub fn register(&mut self, executor: Box<dyn ActionExecutor>) {
        self.executors.insert(0, executor);
    }

    fn executor_for(&self, action: &ActionCode) -> Option<&dyn ActionExecutor> {
        self.executors
            .iter()
            .find(|e| e.accepts(action))
            .map(|e| &**e)
    }

    /// Run every step of `template` in step order.
    ///
    /// A failing or unhandled step is recorded and the remaining steps
    /// still run.
    pub fn run(&self, ctx: &ActionContext, template: &ResolutionTemplate) -> Vec<ActionOutcome> {
        let mut steps: Vec<&ActionStep> = template.action_steps.iter().collect();
        steps.sort_by_key(|s| s.step);
        steps
            .into_iter()
            .map(|step| {
                let Some(executor) = self.executor_for(&step.action) else {
                    let err = CoreError::NoExecutor(step.action.to_string());
                    tracing::warn!(case = %ctx.case_id, action = %step.action, "{}", err);
                    return ActionOutcome {
                        step: step.step,
                        action: step.action.clone(),
                        status: ActionStatus::Failed,
                        executor: None,
                        message: err.to_string(),
                    };
                };
                let (status, message) = match executor.execute(ctx, step) {
                    Ok(message) => (ActionStatus::Completed, message),
                    Err(e) => {
                        tracing::warn!(
                            case = %ctx.case_id,
                            action = %step.action,
                            executor = executor.name(),
                            error = %e,
                            "action failed"
                        );
                        (ActionStatus::Failed, e.to_string())
                    }
                };
                ActionOutcome {
                    step: step.step,
                    action: step.action.clone(),
                    status,
                    executor: Some(executor.name().to_string()),
                    message,
                }
            })
            .collect()
    }
}

/// Follow-up guidance for the officer after an application.
pub fn next_steps(outcomes: &[ActionOutcome]) -> Vec<&'static str> {
    if outcomes.iter().all(|o| o.status == ActionStatus::Completed) {
        vec![
            "Monitor for citizen confirmation",
            "Check resolution in 24-48 hours",
        ]
    } else {
        vec!["Review failed actions", "Consider manual intervention"]
    }
}
