//! Template recommendation and clarifying-question selection.
//!
//! Both lookups walk from the most specific key to the most generic one
//! and stop at the first level that has any active rows.

use crate::catalog::ReferenceSource;
use crate::error::CoreError;
use crate::taxonomy::{InterventionQuestion, RootCause, GENERIC_CATEGORY, GENERIC_DEPARTMENT};
use crate::template::{ResolutionTemplate, TemplateKey};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// Lookup level a recommendation was found at, most specific first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Specificity {
    /// (department, category, root cause)
    Exact,
    /// (department, any category, root cause)
    Department,
    /// (any department, any category, root cause)
    Generic,
    /// (any department, "All", root cause)
    GenericAll,
}

impl fmt::Display for Specificity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Exact => "exact",
            Self::Department => "department",
            Self::Generic => "generic",
            Self::GenericAll => "generic_all",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub template: ResolutionTemplate,
    pub specificity: Specificity,
    /// Other candidates at the same level, best first.
    pub alternatives: Vec<TemplateKey>,
    /// Questions still unanswered, in asking order.
    pub questions: Vec<InterventionQuestion>,
}

pub struct Recommender<'a> {
    reference: &'a dyn ReferenceSource,
}

impl<'a> Recommender<'a> {
    pub fn new(reference: &'a dyn ReferenceSource) -> Self {
        Self { reference }
    }

    /// Best active template for the key plus the unanswered questions.
    ///
    /// Empty or `"General"` department and empty category mean "any" and
    /// skip the levels that need them. No template at any level is a
    /// configuration error.
    pub fn recommend(
        &self,
        department: Option<&str>,
        category: Option<&str>,
        root_cause: &RootCause,
        answered: &BTreeSet<u32>,
    ) -> Result<Recommendation, CoreError> {
        let department = normalize(department, Some(GENERIC_DEPARTMENT));
        let category = normalize(category, None);

        let levels = [
            Specificity::Exact,
            Specificity::Department,
            Specificity::Generic,
            Specificity::GenericAll,
        ];
        for level in levels {
            let mut candidates: Vec<&ResolutionTemplate> = self
                .reference
                .templates()
                .iter()
                .filter(|t| t.active && &t.root_cause == root_cause)
                .filter(|t| template_at_level(t, level, department, category))
                .collect();
            if candidates.is_empty() {
                continue;
            }
            candidates.sort_by(|a, b| a.rank_cmp(b));
            let best = candidates[0].clone();
            tracing::debug!(
                template = %best.key,
                %level,
                candidates = candidates.len(),
                "template selected"
            );
            return Ok(Recommendation {
                alternatives: candidates[1..].iter().map(|t| t.key.clone()).collect(),
                template: best,
                specificity: level,
                questions: self.next_questions(root_cause, department, category, answered),
            });
        }

        tracing::error!(
            root_cause = %root_cause,
            department = department.unwrap_or("-"),
            category = category.unwrap_or("-"),
            "no resolution template at any level"
        );
        Err(CoreError::NoTemplateFound {
            root_cause: root_cause.to_string(),
            department: department.unwrap_or_default().to_string(),
            category: category.unwrap_or_default().to_string(),
        })
    }

    /// Active questions for the most specific non-empty level, minus the
    /// answered ones, ordered by index, required first, then id.
    ///
    /// The level is picked before answered questions are removed, so a
    /// fully answered specific set yields nothing rather than generic rows.
    pub fn next_questions(
        &self,
        root_cause: &RootCause,
        department: Option<&str>,
        category: Option<&str>,
        answered: &BTreeSet<u32>,
    ) -> Vec<InterventionQuestion> {
        let department = normalize(department, Some(GENERIC_DEPARTMENT));
        let category = normalize(category, Some(GENERIC_CATEGORY));

        let active: Vec<&InterventionQuestion> = self
            .reference
            .questions()
            .iter()
            .filter(|q| q.active && &q.root_cause == root_cause)
            .collect();

        let exact = |q: &&InterventionQuestion| match (department, category) {
            (Some(d), Some(c)) => same(q.department.as_deref(), d) && same(q.category.as_deref(), c),
            _ => false,
        };
        let dept_only = |q: &&InterventionQuestion| match department {
            Some(d) => same(q.department.as_deref(), d) && q.category.is_none(),
            None => false,
        };
        let root_only = |q: &&InterventionQuestion| q.department.is_none() && q.category.is_none();

        let level: Vec<&InterventionQuestion> = [
            active.iter().copied().filter(exact).collect::<Vec<_>>(),
            active.iter().copied().filter(dept_only).collect(),
            active.iter().copied().filter(root_only).collect(),
        ]
        .into_iter()
        .find(|rows| !rows.is_empty())
        .unwrap_or_default();

        let mut out: Vec<InterventionQuestion> = level
            .into_iter()
            .filter(|q| !answered.contains(&q.id))
            .cloned()
            .collect();
        out.sort_by_key(|q| (q.order, !q.required, q.id));
        out
    }

    /// Active templates matching the given filters, best first.
    pub fn list_templates(
        &self,
        department: Option<&str>,
        category: Option<&str>,
        root_cause: Option<&RootCause>,
    ) -> Vec<ResolutionTemplate> {
        let generic_filter = department.map(|d| d.trim() == GENERIC_DEPARTMENT).unwrap_or(false);
        let department = normalize(department, Some(GENERIC_DEPARTMENT));
        let category = normalize(category, None);
        let mut out: Vec<ResolutionTemplate> = self
            .reference
            .templates()
            .iter()
            .filter(|t| t.active)
            .filter(|t| root_cause.map_or(true, |rc| &t.root_cause == rc))
            .filter(|t| match department {
                Some(d) => same(t.department.as_deref(), d),
                None => !generic_filter || t.department.is_none(),
            })
            .filter(|t| category.map_or(true, |c| same(t.category.as_deref(), c)))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.rank_cmp(b));
        out
    }
}

fn normalize<'s>(value: Option<&'s str>, generic: Option<&str>) -> Option<&'s str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .filter(|v| generic.map_or(true, |g| *v != g))
}

fn same(stored: Option<&str>, wanted: &str) -> bool {
    stored.is_some_and(|s| s.eq_ignore_ascii_case(wanted))
}

fn template_at_level(
    t: &ResolutionTemplate,
    level: Specificity,
    department: Option<&str>,
    category: Option<&str>,
) -> bool {
    let category_is_all = t.category.as_deref() == Some(GENERIC_CATEGORY);
    match level {
        Specificity::Exact => match (department, category) {
            (Some(d), Some(c)) => {
                same(t.department.as_deref(), d) && same(t.category.as_deref(), c)
            }
            _ => false,
        },
        Specificity::Department => match department {
            Some(d) => {
                same(t.department.as_deref(), d) && (t.category.is_none() || category_is_all)
            }
            None => false,
        },
        Specificity::Generic => t.department.is_none() && t.category.is_none(),
        Specificity::GenericAll => t.department.is_none() && category_is_all,
    }
}
