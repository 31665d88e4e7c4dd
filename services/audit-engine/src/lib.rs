//! # Audit Engine
//!
//! Backend of the compliance-audit dashboard:
//! - evaluates each control against its anomaly result table and derives a
//!   severity (`Cumpliendo` / `Atención` / `Crítico`)
//! - reconciles the organization's countries with the scraped sanctions map
//! - screens entities against an external best-match service
//! - exports arbitrary tables to a multi-sheet spreadsheet
//!
//! Lookups that feed the dashboard degrade to empty values when their source
//! is unavailable ([`outcome::Outcome`]); screening and export failures are
//! always reported as errors.

pub mod config;
pub mod controls;
pub mod database;
pub mod errors;
pub mod export;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod outcome;
pub mod sanctions;
pub mod screening;
pub mod store;

pub use crate::config::Config;
pub use crate::errors::{AuditError, Result};
pub use crate::outcome::Outcome;
