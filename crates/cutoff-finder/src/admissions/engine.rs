use super::domain::{AdmissionRecord, AdmissionYear, InstituteTier, Query};
use super::store::{RecordProvider, RecordTable, StoreError};
use super::views::{ViewCatalog, ViewResult};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of one query: every applicable view plus ingestion notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryReport {
    pub query: Query,
    pub views: Vec<ViewResult>,
    /// Rows dropped at ingestion across the tables this query read.
    pub skipped_records: usize,
    /// Tiers of a multi-tier scope that had no table for the requested year.
    pub missing_tiers: Vec<InstituteTier>,
}

impl QueryReport {
    pub fn is_empty(&self) -> bool {
        self.views.iter().all(ViewResult::is_empty)
    }

    pub fn skipped_note(&self) -> Option<String> {
        (self.skipped_records > 0).then(|| {
            format!(
                "{} records skipped during ingestion (unparseable or unrecognized values)",
                self.skipped_records
            )
        })
    }
}

/// Stateless facade running the view catalog over tables fetched from a provider.
#[derive(Debug, Clone, Default)]
pub struct EligibilityEngine {
    catalog: ViewCatalog,
    supported_years: Vec<AdmissionYear>,
}

impl EligibilityEngine {
    pub fn new(catalog: ViewCatalog, supported_years: Vec<AdmissionYear>) -> Self {
        Self {
            catalog,
            supported_years,
        }
    }

    pub fn validate(&self, query: &Query) -> Result<(), QueryError> {
        if query.rank == 0 {
            return Err(QueryError::InvalidQuery(
                "rank must be a positive integer".to_string(),
            ));
        }
        if !self.supported_years.is_empty() && !self.supported_years.contains(&query.year) {
            let supported = self
                .supported_years
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            return Err(QueryError::InvalidQuery(format!(
                "year {} is not supported (expected one of {supported})",
                query.year
            )));
        }
        Ok(())
    }

    pub fn evaluate<P>(&self, provider: &P, query: &Query) -> Result<QueryReport, QueryError>
    where
        P: RecordProvider + ?Sized,
    {
        self.validate(query)?;

        let (tables, missing_tiers) = self.collect_tables(provider, query)?;
        let skipped_records = tables.iter().map(|table| table.skipped()).sum();
        let candidates: Vec<AdmissionRecord> = tables
            .iter()
            .flat_map(|table| table.records().iter().cloned())
            .collect();

        debug!(
            scope = %query.institute_scope.label(),
            year = %query.year,
            candidates = candidates.len(),
            "candidate records merged"
        );

        let views = self.catalog.compose(query, &candidates);

        info!(
            rank = query.rank,
            category = query.category.label(),
            pwd = query.pwd,
            year = %query.year,
            views = views.len(),
            matched = views.iter().map(|view| view.count).sum::<usize>(),
            "eligibility query evaluated"
        );

        Ok(QueryReport {
            query: query.clone(),
            views,
            skipped_records,
            missing_tiers,
        })
    }

    fn collect_tables<P>(
        &self,
        provider: &P,
        query: &Query,
    ) -> Result<(Vec<Arc<RecordTable>>, Vec<InstituteTier>), QueryError>
    where
        P: RecordProvider + ?Sized,
    {
        let scope = query.institute_scope;
        if !scope.is_multi_tier() {
            let tables = scope
                .tiers()
                .into_iter()
                .map(|tier| provider.get_records(tier, query.year))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok((tables, Vec::new()));
        }

        let mut tables = Vec::new();
        let mut missing = Vec::new();
        let mut first_gap = None;
        for tier in scope.tiers() {
            match provider.get_records(tier, query.year) {
                Ok(table) => tables.push(table),
                Err(err @ StoreError::DataUnavailable { .. }) => {
                    warn!(%tier, year = %query.year, "tier missing from merged scope");
                    missing.push(tier);
                    if first_gap.is_none() {
                        first_gap = Some(err);
                    }
                }
                Err(err) => return Err(err.into()),
            }
        }

        match first_gap {
            Some(err) if tables.is_empty() => Err(err.into()),
            _ => Ok((tables, missing)),
        }
    }
}
