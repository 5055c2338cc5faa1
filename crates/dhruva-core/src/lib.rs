//! Domain model and rule engine for DHRUVA grievance triage.
//!
//! Reference data (clarifying questions, resolution templates, proactive
//! trigger configurations) is immutable once loaded into a
//! [`catalog::ReferenceCatalog`]; the [`recommend::Recommender`] and
//! [`sla::SlaTracker`] only ever read it.

pub mod action;
pub mod case;
pub mod catalog;
pub mod config;
pub mod error;
pub mod hash;
pub mod notification;
pub mod recommend;
pub mod serialize;
pub mod sla;
pub mod taxonomy;
pub mod template;
pub mod workflow;
