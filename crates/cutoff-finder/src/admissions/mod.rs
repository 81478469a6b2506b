//! Eligibility lookup over historical admission-cutoff tables.
//!
//! Tables are loaded once per tier and year into a [`RecordStore`]; the
//! [`EligibilityEngine`] then runs every configured view through the same pipeline
//! (seat predicate, view filter, rank window, status ordering) for each query.

pub mod classifier;
pub mod domain;
pub mod engine;
pub mod loader;
pub mod store;
pub mod views;

pub use classifier::{classify, RankWindow, Status};
pub use domain::{
    AdmissionRecord, AdmissionYear, BaseCategory, CutoffRank, GenderPool, InstituteScope,
    InstituteTier, Query, Quota, SeatCategory,
};
pub use engine::{EligibilityEngine, QueryError, QueryReport};
pub use loader::{CutoffTableLoader, LoadError, LoadReport, SkipReason, SkippedRow};
pub use store::{DatasetState, DatasetSummary, RecordProvider, RecordStore, RecordTable, StoreError};
pub use views::{ClassifiedResult, ViewCatalog, ViewConfig, ViewFilter, ViewKind, ViewResult};
