//! On-disk storage for DHRUVA: the `.dhruva/` directory, reference data,
//! versioned case documents and the notification outbox.

pub mod cases;
pub mod error;
pub mod lockfile;
pub mod outbox;
pub mod query;
pub mod reference;
pub mod repository;
pub mod sweep;
