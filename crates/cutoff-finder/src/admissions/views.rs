use super::classifier::{classify, RankWindow, Status};
use super::domain::{AdmissionRecord, InstituteScope, InstituteTier, Query};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

pub const FIELD_OF_STUDY_KEYWORDS: [&str; 5] = [
    "Computer Science",
    "Electrical",
    "Electronics",
    "Artificial",
    "Mathematics",
];

pub const LEGACY_INSTITUTES: [&str; 7] = [
    "Bombay",
    "Delhi",
    "Madras",
    "Kanpur",
    "Kharagpur",
    "Roorkee",
    "Guwahati",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    AllRecommended,
    FieldOfStudy,
    LegacyInstitutes,
}

impl ViewKind {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::AllRecommended => "All Recommended",
            Self::FieldOfStudy => "Circuital Programmes",
            Self::LegacyInstitutes => "Legacy Institute Branches",
        }
    }
}

/// Narrowing applied on top of the shared seat/gender predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "needles", rename_all = "snake_case")]
pub enum ViewFilter {
    None,
    ProgramContains(Vec<String>),
    InstituteContains(Vec<String>),
}

impl ViewFilter {
    pub fn program_keywords<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::ProgramContains(lowercase_all(keywords))
    }

    pub fn institute_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::InstituteContains(lowercase_all(names))
    }

    pub fn accepts(&self, record: &AdmissionRecord) -> bool {
        match self {
            Self::None => true,
            Self::ProgramContains(needles) => contains_any(&record.program, needles),
            Self::InstituteContains(needles) => contains_any(&record.institute, needles),
        }
    }
}

/// One named view: an extra filter, a rank window, and an optional tier restriction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewConfig {
    pub kind: ViewKind,
    pub filter: ViewFilter,
    pub window: RankWindow,
    /// When set, the view is only produced for queries scoped to exactly this tier.
    pub tier: Option<InstituteTier>,
}

impl ViewConfig {
    pub fn all_recommended(window: RankWindow) -> Self {
        Self {
            kind: ViewKind::AllRecommended,
            filter: ViewFilter::None,
            window,
            tier: None,
        }
    }

    pub fn field_of_study(window: RankWindow) -> Self {
        Self {
            kind: ViewKind::FieldOfStudy,
            filter: ViewFilter::program_keywords(FIELD_OF_STUDY_KEYWORDS),
            window,
            tier: None,
        }
    }

    pub fn legacy_institutes(window: RankWindow) -> Self {
        Self {
            kind: ViewKind::LegacyInstitutes,
            filter: ViewFilter::institute_names(LEGACY_INSTITUTES),
            window,
            tier: Some(InstituteTier::TierA),
        }
    }

    pub fn applies_to(&self, scope: &InstituteScope) -> bool {
        match self.tier {
            Some(tier) => *scope == InstituteScope::Tier(tier),
            None => true,
        }
    }

    /// Runs the shared pipeline: seat predicate, view filter, window, then ordering.
    pub fn build<'a, I>(&self, query: &Query, records: I) -> ViewResult
    where
        I: IntoIterator<Item = &'a AdmissionRecord>,
    {
        let mut results: Vec<ClassifiedResult> = records
            .into_iter()
            .filter(|record| query.matches_seat(record))
            .filter(|record| self.filter.accepts(record))
            .filter_map(|record| {
                classify(record, query.rank, &self.window)
                    .and_then(|status| ClassifiedResult::new(record.clone(), status))
            })
            .collect();

        results.sort_by_key(|result| result.sort_key);

        debug!(
            view = self.kind.label(),
            rank = query.rank,
            matched = results.len(),
            "view classified"
        );

        ViewResult {
            kind: self.kind,
            label: self.kind.label(),
            window: self.window,
            count: results.len(),
            results,
        }
    }
}

/// The configured set of views run for every query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewCatalog {
    views: Vec<ViewConfig>,
}

impl ViewCatalog {
    pub fn new(views: Vec<ViewConfig>) -> Self {
        Self { views }
    }

    pub fn standard() -> Self {
        Self::new(vec![
            ViewConfig::all_recommended(RankWindow::new(RankWindow::DEFAULT_LOOK_BACK, Some(500))),
            ViewConfig::field_of_study(RankWindow::unbounded(RankWindow::DEFAULT_LOOK_BACK)),
            ViewConfig::legacy_institutes(RankWindow::unbounded(RankWindow::DEFAULT_LOOK_BACK)),
        ])
    }

    pub fn views(&self) -> &[ViewConfig] {
        &self.views
    }

    pub fn get(&self, kind: ViewKind) -> Option<&ViewConfig> {
        self.views.iter().find(|view| view.kind == kind)
    }

    pub fn compose(&self, query: &Query, records: &[AdmissionRecord]) -> Vec<ViewResult> {
        self.views
            .iter()
            .filter(|view| view.applies_to(&query.institute_scope))
            .map(|view| view.build(query, records))
            .collect()
    }
}

impl Default for ViewCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedResult {
    pub record: AdmissionRecord,
    pub status: Status,
    /// `(status rank, opening rank)`.
    pub sort_key: (u8, u32),
}

impl ClassifiedResult {
    fn new(record: AdmissionRecord, status: Status) -> Option<Self> {
        let opening = record.opening_rank.value()?;
        Some(Self {
            sort_key: (status.rank(), opening),
            record,
            status,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewResult {
    pub kind: ViewKind,
    pub label: &'static str,
    pub window: RankWindow,
    pub count: usize,
    pub results: Vec<ClassifiedResult>,
}

impl ViewResult {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn grouped_by_tier(&self) -> BTreeMap<InstituteTier, Vec<&ClassifiedResult>> {
        let mut groups: BTreeMap<InstituteTier, Vec<&ClassifiedResult>> = BTreeMap::new();
        for result in &self.results {
            groups
                .entry(result.record.institute_tier)
                .or_default()
                .push(result);
        }
        groups
    }

    pub fn status_counts(&self) -> BTreeMap<Status, usize> {
        let mut counts = BTreeMap::new();
        for result in &self.results {
            *counts.entry(result.status).or_insert(0) += 1;
        }
        counts
    }
}

fn lowercase_all<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .map(|value| value.as_ref().to_lowercase())
        .collect()
}

fn contains_any(haystack: &str, needles: &[String]) -> bool {
    let haystack = haystack.to_lowercase();
    needles.iter().any(|needle| haystack.contains(needle.as_str()))
}
