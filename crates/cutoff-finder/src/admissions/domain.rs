use serde::{Deserialize, Serialize};
use std::fmt;

/// Institute classes that publish separate cutoff tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstituteTier {
    /// Top-tier national institutes (IITs).
    TierA,
    /// Second-tier national institutes (NITs).
    TierB,
    /// Specialized information-technology institutes (IIITs).
    TierC,
    /// Government-funded technical institutes (GFTIs).
    TierD,
}

impl InstituteTier {
    pub const fn ordered() -> [Self; 4] {
        [Self::TierA, Self::TierB, Self::TierC, Self::TierD]
    }

    pub const fn label(&self) -> &'static str {
        match self {
            Self::TierA => "IIT",
            Self::TierB => "NIT",
            Self::TierC => "IIIT",
            Self::TierD => "GFTI",
        }
    }

    /// Directory name holding this tier's per-year tables.
    pub const fn slug(&self) -> &'static str {
        match self {
            Self::TierA => "iit",
            Self::TierB => "nit",
            Self::TierC => "iiit",
            Self::TierD => "gfti",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match normalize_token(value).as_str() {
            "iit" | "tier-a" | "tier_a" | "tiera" | "a" => Some(Self::TierA),
            "nit" | "tier-b" | "tier_b" | "tierb" | "b" => Some(Self::TierB),
            "iiit" | "tier-c" | "tier_c" | "tierc" | "c" => Some(Self::TierC),
            "gfti" | "tier-d" | "tier_d" | "tierd" | "d" => Some(Self::TierD),
            _ => None,
        }
    }
}

impl fmt::Display for InstituteTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Reservation category without the disability marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BaseCategory {
    #[serde(rename = "OPEN")]
    Open,
    #[serde(rename = "EWS")]
    Ews,
    #[serde(rename = "OBC-NCL")]
    ObcNcl,
    #[serde(rename = "SC")]
    Sc,
    #[serde(rename = "ST")]
    St,
}

impl BaseCategory {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Ews => "EWS",
            Self::ObcNcl => "OBC-NCL",
            Self::Sc => "SC",
            Self::St => "ST",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "OPEN" | "GEN" | "GENERAL" => Some(Self::Open),
            "EWS" | "GEN-EWS" => Some(Self::Ews),
            "OBC-NCL" | "OBC" | "OBC_NCL" => Some(Self::ObcNcl),
            "SC" => Some(Self::Sc),
            "ST" => Some(Self::St),
            _ => None,
        }
    }
}

impl fmt::Display for BaseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Seat type as published in the cutoff tables, e.g. `OBC-NCL (PwD)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeatCategory {
    pub base: BaseCategory,
    pub pwd: bool,
}

impl SeatCategory {
    pub const fn new(base: BaseCategory, pwd: bool) -> Self {
        Self { base, pwd }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        let upper = trimmed.to_ascii_uppercase();
        match upper.strip_suffix("(PWD)") {
            Some(base) => BaseCategory::parse(base.trim()).map(|base| Self::new(base, true)),
            None => BaseCategory::parse(trimmed).map(|base| Self::new(base, false)),
        }
    }

    /// With `pwd` set any PwD seat qualifies; otherwise the base must match exactly.
    pub fn admits(&self, category: BaseCategory, pwd: bool) -> bool {
        if pwd {
            self.pwd
        } else {
            !self.pwd && self.base == category
        }
    }
}

impl fmt::Display for SeatCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.pwd {
            write!(f, "{} (PwD)", self.base.label())
        } else {
            f.write_str(self.base.label())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenderPool {
    GenderNeutral,
    FemaleOnly,
}

impl GenderPool {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::GenderNeutral => "Gender-Neutral",
            Self::FemaleOnly => "Female-only",
        }
    }

    /// Accepts the long-form table values such as `Female-only (including Supernumerary)`.
    pub fn parse(value: &str) -> Option<Self> {
        let lowered = value.trim().to_ascii_lowercase();
        if lowered.contains("female") {
            Some(Self::FemaleOnly)
        } else if lowered.contains("neutral") {
            Some(Self::GenderNeutral)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quota {
    OtherState,
    HomeState,
    AllIndia,
}

impl Quota {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::OtherState => "OS",
            Self::HomeState => "HS",
            Self::AllIndia => "AI",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match normalize_token(value).as_str() {
            "os" | "other-state" | "other state" => Some(Self::OtherState),
            "hs" | "home-state" | "home state" => Some(Self::HomeState),
            "ai" | "all-india" | "all india" => Some(Self::AllIndia),
            _ => None,
        }
    }
}

/// Counselling year a table belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdmissionYear(pub u16);

impl fmt::Display for AdmissionYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opening or closing rank as carried by a record.
///
/// Ingestion only emits `Numeric` values; `Unparsed` exists so that records built by other
/// providers can still reach the classifier without panicking it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CutoffRank {
    Numeric(u32),
    Unparsed(String),
}

impl CutoffRank {
    pub fn value(&self) -> Option<u32> {
        match self {
            Self::Numeric(value) if *value > 0 => Some(*value),
            _ => None,
        }
    }
}

impl From<u32> for CutoffRank {
    fn from(value: u32) -> Self {
        Self::Numeric(value)
    }
}

impl fmt::Display for CutoffRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(value) => write!(f, "{value}"),
            Self::Unparsed(raw) => f.write_str(raw),
        }
    }
}

/// One offered seat bucket for a program at an institute in a given year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionRecord {
    pub institute: String,
    pub institute_tier: InstituteTier,
    pub program: String,
    pub seat_category: SeatCategory,
    pub gender_pool: GenderPool,
    pub opening_rank: CutoffRank,
    pub closing_rank: CutoffRank,
    pub quota: Option<Quota>,
    pub year: AdmissionYear,
}

/// Which tiers a query draws records from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstituteScope {
    Tier(InstituteTier),
    AllExceptTopTier,
}

impl InstituteScope {
    pub fn tiers(&self) -> Vec<InstituteTier> {
        match self {
            Self::Tier(tier) => vec![*tier],
            Self::AllExceptTopTier => InstituteTier::ordered()
                .into_iter()
                .filter(|tier| *tier != InstituteTier::TierA)
                .collect(),
        }
    }

    pub fn is_multi_tier(&self) -> bool {
        matches!(self, Self::AllExceptTopTier)
    }

    pub fn label(&self) -> String {
        match self {
            Self::Tier(tier) => tier.label().to_string(),
            Self::AllExceptTopTier => "NIT + IIIT + GFTI".to_string(),
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match normalize_token(value).as_str() {
            "all-except-iit" | "non-iit" | "all-except-tier-a" => {
                Some(Self::AllExceptTopTier)
            }
            other => InstituteTier::parse(other).map(Self::Tier),
        }
    }
}

/// Per-request lookup parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub rank: u32,
    pub category: BaseCategory,
    #[serde(default)]
    pub pwd: bool,
    pub gender_pool: GenderPool,
    pub year: AdmissionYear,
    pub institute_scope: InstituteScope,
}

impl Query {
    /// Base predicate shared by every view.
    pub fn matches_seat(&self, record: &AdmissionRecord) -> bool {
        record.seat_category.admits(self.category, self.pwd)
            && record.gender_pool == self.gender_pool
    }
}

fn normalize_token(value: &str) -> String {
    value.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seat_category_parses_pwd_suffix() {
        let seat = SeatCategory::parse("OBC-NCL (PwD)").expect("parses");
        assert_eq!(seat, SeatCategory::new(BaseCategory::ObcNcl, true));
        assert_eq!(seat.to_string(), "OBC-NCL (PwD)");

        let open = SeatCategory::parse(" open ").expect("parses");
        assert_eq!(open, SeatCategory::new(BaseCategory::Open, false));
        assert!(SeatCategory::parse("DS").is_none());
    }

    #[test]
    fn pwd_queries_accept_any_pwd_seat() {
        let sc_pwd = SeatCategory::new(BaseCategory::Sc, true);
        assert!(sc_pwd.admits(BaseCategory::Open, true));
        assert!(!sc_pwd.admits(BaseCategory::Sc, false));

        let st = SeatCategory::new(BaseCategory::St, false);
        assert!(st.admits(BaseCategory::St, false));
        assert!(!st.admits(BaseCategory::ObcNcl, false));
        assert!(!st.admits(BaseCategory::St, true));
    }

    #[test]
    fn gender_pool_reads_long_form_labels() {
        assert_eq!(
            GenderPool::parse("Female-only (including Supernumerary)"),
            Some(GenderPool::FemaleOnly)
        );
        assert_eq!(
            GenderPool::parse("Gender-Neutral"),
            Some(GenderPool::GenderNeutral)
        );
        assert_eq!(GenderPool::parse("unknown"), None);
    }

    #[test]
    fn multi_tier_scope_excludes_top_tier() {
        let tiers = InstituteScope::AllExceptTopTier.tiers();
        assert_eq!(
            tiers,
            vec![
                InstituteTier::TierB,
                InstituteTier::TierC,
                InstituteTier::TierD
            ]
        );
        assert_eq!(
            InstituteScope::parse("iit"),
            Some(InstituteScope::Tier(InstituteTier::TierA))
        );
        assert_eq!(
            InstituteScope::parse("all-except-iit"),
            Some(InstituteScope::AllExceptTopTier)
        );
        assert_eq!(InstituteScope::parse("all"), None);
    }

    #[test]
    fn cutoff_rank_rejects_unparsed_and_zero() {
        assert_eq!(CutoffRank::Numeric(42).value(), Some(42));
        assert_eq!(CutoffRank::Numeric(0).value(), None);
        assert_eq!(CutoffRank::Unparsed("N/A".to_string()).value(), None);
    }
}
