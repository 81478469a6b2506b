use super::domain::{AdmissionRecord, AdmissionYear, InstituteTier};
use super::loader::{CutoffTableLoader, LoadError};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Immutable cutoff table for one tier and year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordTable {
    tier: InstituteTier,
    year: AdmissionYear,
    records: Vec<AdmissionRecord>,
    skipped: usize,
}

impl RecordTable {
    pub fn new(
        tier: InstituteTier,
        year: AdmissionYear,
        records: Vec<AdmissionRecord>,
        skipped: usize,
    ) -> Self {
        Self {
            tier,
            year,
            records,
            skipped,
        }
    }

    pub fn tier(&self) -> InstituteTier {
        self.tier
    }

    pub fn year(&self) -> AdmissionYear {
        self.year
    }

    pub fn records(&self) -> &[AdmissionRecord] {
        &self.records
    }

    /// Rows dropped at ingestion.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

/// Source of cutoff tables consumed by the eligibility engine.
pub trait RecordProvider: Send + Sync {
    fn get_records(
        &self,
        tier: InstituteTier,
        year: AdmissionYear,
    ) -> Result<Arc<RecordTable>, StoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("no {tier} cutoff data for {year}")]
    DataUnavailable {
        tier: InstituteTier,
        year: AdmissionYear,
    },
    #[error("{tier} cutoff data for {year} is missing columns: {}", missing.join(", "))]
    SchemaMismatch {
        tier: InstituteTier,
        year: AdmissionYear,
        missing: Vec<&'static str>,
    },
    #[error("{tier} cutoff data for {year} could not be read: {reason}")]
    Unreadable {
        tier: InstituteTier,
        year: AdmissionYear,
        reason: String,
    },
}

#[derive(Debug, Clone)]
enum TableSlot {
    Loaded(Arc<RecordTable>),
    Rejected { missing: Vec<&'static str> },
    Unreadable { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetState {
    Loaded,
    Rejected,
    Unreadable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetSummary {
    pub tier: InstituteTier,
    pub tier_label: &'static str,
    pub year: AdmissionYear,
    pub state: DatasetState,
    pub records: usize,
    pub skipped: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_columns: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// In-memory store built once by an explicit load step.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    slots: BTreeMap<(InstituteTier, AdmissionYear), TableSlot>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table_path(dir: &Path, tier: InstituteTier, year: AdmissionYear) -> PathBuf {
        dir.join(tier.slug()).join(format!("{year}.csv"))
    }

    /// Loads `<dir>/<tier>/<year>.csv` for every tier and year present on disk.
    ///
    /// Absent files are left empty. Tables with missing columns are recorded as rejected and
    /// tables that fail to read as unreadable; both only fail queries that touch them. The
    /// load itself fails only when `dir` is not a directory.
    pub fn load_dir(dir: &Path, years: &[AdmissionYear]) -> Result<Self, LoadError> {
        if !dir.is_dir() {
            return Err(LoadError::MissingDirectory {
                path: dir.to_path_buf(),
            });
        }

        let mut store = Self::new();

        for tier in InstituteTier::ordered() {
            for year in years {
                let path = Self::table_path(dir, tier, *year);
                if !path.is_file() {
                    continue;
                }

                match CutoffTableLoader::from_path(&path, tier, *year) {
                    Ok(report) => {
                        info!(
                            %tier,
                            %year,
                            records = report.table.records().len(),
                            skipped = report.skipped.len(),
                            path = %path.display(),
                            "cutoff table loaded"
                        );
                        store.insert_table(report.table);
                    }
                    Err(LoadError::SchemaMismatch { missing }) => {
                        warn!(
                            %tier,
                            %year,
                            missing = ?missing,
                            path = %path.display(),
                            "cutoff table rejected"
                        );
                        store.reject_table(tier, *year, missing);
                    }
                    Err(other) => {
                        warn!(
                            %tier,
                            %year,
                            error = %other,
                            path = %path.display(),
                            "cutoff table unreadable"
                        );
                        store.mark_unreadable(tier, *year, other.to_string());
                    }
                }
            }
        }

        Ok(store)
    }

    pub fn insert_table(&mut self, table: RecordTable) {
        self.slots.insert(
            (table.tier(), table.year()),
            TableSlot::Loaded(Arc::new(table)),
        );
    }

    pub fn reject_table(
        &mut self,
        tier: InstituteTier,
        year: AdmissionYear,
        missing: Vec<&'static str>,
    ) {
        self.slots
            .insert((tier, year), TableSlot::Rejected { missing });
    }

    pub fn mark_unreadable(&mut self, tier: InstituteTier, year: AdmissionYear, reason: String) {
        self.slots
            .insert((tier, year), TableSlot::Unreadable { reason });
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn datasets(&self) -> Vec<DatasetSummary> {
        self.slots
            .iter()
            .map(|((tier, year), slot)| match slot {
                TableSlot::Loaded(table) => DatasetSummary {
                    tier: *tier,
                    tier_label: tier.label(),
                    year: *year,
                    state: DatasetState::Loaded,
                    records: table.records().len(),
                    skipped: table.skipped(),
                    missing_columns: Vec::new(),
                    error: None,
                },
                TableSlot::Rejected { missing } => DatasetSummary {
                    tier: *tier,
                    tier_label: tier.label(),
                    year: *year,
                    state: DatasetState::Rejected,
                    records: 0,
                    skipped: 0,
                    missing_columns: missing.clone(),
                    error: None,
                },
                TableSlot::Unreadable { reason } => DatasetSummary {
                    tier: *tier,
                    tier_label: tier.label(),
                    year: *year,
                    state: DatasetState::Unreadable,
                    records: 0,
                    skipped: 0,
                    missing_columns: Vec::new(),
                    error: Some(reason.clone()),
                },
            })
            .collect()
    }
}

impl RecordProvider for RecordStore {
    fn get_records(
        &self,
        tier: InstituteTier,
        year: AdmissionYear,
    ) -> Result<Arc<RecordTable>, StoreError> {
        match self.slots.get(&(tier, year)) {
            Some(TableSlot::Loaded(table)) => Ok(Arc::clone(table)),
            Some(TableSlot::Rejected { missing }) => Err(StoreError::SchemaMismatch {
                tier,
                year,
                missing: missing.clone(),
            }),
            Some(TableSlot::Unreadable { reason }) => Err(StoreError::Unreadable {
                tier,
                year,
                reason: reason.clone(),
            }),
            None => Err(StoreError::DataUnavailable { tier, year }),
        }
    }
}
