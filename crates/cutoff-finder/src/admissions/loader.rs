use super::domain::{
    AdmissionRecord, AdmissionYear, CutoffRank, GenderPool, InstituteTier, Quota, SeatCategory,
};
use super::store::RecordTable;
use serde::Deserialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Columns every cutoff table must expose, with the header aliases JoSAA exports use.
const REQUIRED_COLUMNS: [(&str, &[&str]); 6] = [
    ("Institute", &["Institute"]),
    ("Program", &["Program", "Academic Program Name"]),
    ("Seat Type", &["Seat Type"]),
    ("Gender", &["Gender"]),
    ("OR", &["OR", "Opening Rank"]),
    ("CR", &["CR", "Closing Rank"]),
];

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read cutoff table: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid cutoff CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("cutoff table is missing required columns: {}", missing.join(", "))]
    SchemaMismatch { missing: Vec<&'static str> },
    #[error("cutoff data directory {} does not exist", path.display())]
    MissingDirectory { path: PathBuf },
}

/// Why a single row was left out of a table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SkipReason {
    #[error("{column} value '{value}' is not a rank")]
    UnparseableNumeric { column: &'static str, value: String },
    #[error("{column} value '{value}' is not recognized")]
    UnrecognizedValue { column: &'static str, value: String },
    #[error("malformed row: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    pub line: u64,
    pub reason: SkipReason,
}

#[derive(Debug, Clone)]
pub struct LoadReport {
    pub table: RecordTable,
    pub skipped: Vec<SkippedRow>,
}

#[derive(Debug, Deserialize)]
struct CutoffRow {
    #[serde(rename = "Institute")]
    institute: String,
    #[serde(rename = "Program", alias = "Academic Program Name")]
    program: String,
    #[serde(rename = "Quota", default, deserialize_with = "empty_string_as_none")]
    quota: Option<String>,
    #[serde(rename = "Seat Type")]
    seat_type: String,
    #[serde(rename = "Gender")]
    gender: String,
    #[serde(rename = "OR", alias = "Opening Rank")]
    opening_rank: String,
    #[serde(rename = "CR", alias = "Closing Rank")]
    closing_rank: String,
}

impl CutoffRow {
    fn into_record(
        self,
        tier: InstituteTier,
        year: AdmissionYear,
    ) -> Result<AdmissionRecord, SkipReason> {
        let opening_rank = parse_rank(&self.opening_rank).ok_or_else(|| {
            SkipReason::UnparseableNumeric {
                column: "OR",
                value: self.opening_rank.clone(),
            }
        })?;
        let closing_rank = parse_rank(&self.closing_rank).ok_or_else(|| {
            SkipReason::UnparseableNumeric {
                column: "CR",
                value: self.closing_rank.clone(),
            }
        })?;
        let seat_category =
            SeatCategory::parse(&self.seat_type).ok_or_else(|| SkipReason::UnrecognizedValue {
                column: "Seat Type",
                value: self.seat_type.clone(),
            })?;
        let gender_pool =
            GenderPool::parse(&self.gender).ok_or_else(|| SkipReason::UnrecognizedValue {
                column: "Gender",
                value: self.gender.clone(),
            })?;
        let quota = match self.quota.as_deref() {
            Some(raw) => Some(Quota::parse(raw).ok_or_else(|| SkipReason::UnrecognizedValue {
                column: "Quota",
                value: raw.to_string(),
            })?),
            None => None,
        };

        Ok(AdmissionRecord {
            institute: collapse_whitespace(&self.institute),
            institute_tier: tier,
            program: collapse_whitespace(&self.program),
            seat_category,
            gender_pool,
            opening_rank: CutoffRank::Numeric(opening_rank),
            closing_rank: CutoffRank::Numeric(closing_rank),
            quota,
            year,
        })
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

/// Coerces a published rank cell into a positive integer.
///
/// Accepts thousands separators, the preparatory-course suffix (`1234P`) and whole
/// floats (`1234.0`).
pub fn parse_rank(raw: &str) -> Option<u32> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|ch| *ch != ',' && !ch.is_whitespace())
        .collect();
    let cleaned = cleaned
        .strip_suffix('P')
        .or_else(|| cleaned.strip_suffix('p'))
        .unwrap_or(cleaned.as_str());

    if cleaned.is_empty() {
        return None;
    }

    let value = match cleaned.parse::<u32>() {
        Ok(value) => value,
        Err(_) => {
            let float = cleaned.parse::<f64>().ok()?;
            if !float.is_finite() || float.fract() != 0.0 || float < 1.0 || float > f64::from(u32::MAX)
            {
                return None;
            }
            float as u32
        }
    };

    (value > 0).then_some(value)
}

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn missing_columns(headers: &csv::StringRecord) -> Vec<&'static str> {
    REQUIRED_COLUMNS
        .iter()
        .filter(|(_, aliases)| {
            !headers
                .iter()
                .any(|header| aliases.iter().any(|alias| header.trim() == *alias))
        })
        .map(|(name, _)| *name)
        .collect()
}

pub struct CutoffTableLoader;

impl CutoffTableLoader {
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        tier: InstituteTier,
        year: AdmissionYear,
    ) -> Result<LoadReport, LoadError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file, tier, year)
    }

    pub fn from_reader<R: Read>(
        reader: R,
        tier: InstituteTier,
        year: AdmissionYear,
    ) -> Result<LoadReport, LoadError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let missing = missing_columns(&headers);
        if !missing.is_empty() {
            return Err(LoadError::SchemaMismatch { missing });
        }

        let mut records = Vec::new();
        let mut skipped = Vec::new();

        for (index, result) in csv_reader.records().enumerate() {
            let fallback_line = index as u64 + 2;
            let raw = match result {
                Ok(raw) => raw,
                Err(err) => {
                    let line = err
                        .position()
                        .map(|position| position.line())
                        .unwrap_or(fallback_line);
                    skipped.push(SkippedRow {
                        line,
                        reason: SkipReason::Malformed(err.to_string()),
                    });
                    continue;
                }
            };
            let line = raw
                .position()
                .map(|position| position.line())
                .unwrap_or(fallback_line);

            let converted = raw
                .deserialize::<CutoffRow>(Some(&headers))
                .map_err(|err| SkipReason::Malformed(err.to_string()))
                .and_then(|row| row.into_record(tier, year));

            match converted {
                Ok(record) => records.push(record),
                Err(reason) => {
                    debug!(%tier, %year, line, %reason, "cutoff row skipped");
                    skipped.push(SkippedRow { line, reason });
                }
            }
        }

        if !skipped.is_empty() {
            warn!(
                %tier,
                %year,
                skipped = skipped.len(),
                loaded = records.len(),
                "cutoff table rows skipped during ingestion"
            );
        }

        Ok(LoadReport {
            table: RecordTable::new(tier, year, records, skipped.len()),
            skipped,
        })
    }
}
