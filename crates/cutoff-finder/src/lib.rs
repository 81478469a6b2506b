//! Admission-cutoff eligibility lookup.
//!
//! Given an exam rank, category, and gender pool, classifies historical cutoff records
//! into Fitting / Aspirational / Opening Down buckets across the configured views.

pub mod admissions;
pub mod config;
pub mod error;
pub mod telemetry;
