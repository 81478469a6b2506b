use super::domain::AdmissionRecord;
use serde::{Deserialize, Serialize};

/// Status bucket assigned to a record for a given rank, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// `OR <= rank <= CR`.
    Fitting,
    /// Closing rank sits just below the query rank.
    Aspirational,
    /// Opening rank sits above the query rank.
    OpeningDown,
}

impl Status {
    pub const fn rank(&self) -> u8 {
        match self {
            Self::Fitting => 1,
            Self::Aspirational => 2,
            Self::OpeningDown => 3,
        }
    }

    pub const fn label(&self) -> &'static str {
        match self {
            Self::Fitting => "Fitting",
            Self::Aspirational => "Aspirational",
            Self::OpeningDown => "Opening Down",
        }
    }
}

/// Margins deciding how far past an exact fit a record stays reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankWindow {
    pub look_back: u32,
    /// `None` means any opening rank above the query rank qualifies.
    pub look_ahead: Option<u32>,
}

impl RankWindow {
    pub const DEFAULT_LOOK_BACK: u32 = 300;

    pub const fn new(look_back: u32, look_ahead: Option<u32>) -> Self {
        Self {
            look_back,
            look_ahead,
        }
    }

    pub const fn unbounded(look_back: u32) -> Self {
        Self::new(look_back, None)
    }
}

impl Default for RankWindow {
    fn default() -> Self {
        Self::unbounded(Self::DEFAULT_LOOK_BACK)
    }
}

/// Classifies a record against `rank`; `None` when it falls outside every bucket or its
/// cutoffs are not numeric.
pub fn classify(record: &AdmissionRecord, rank: u32, window: &RankWindow) -> Option<Status> {
    let opening = u64::from(record.opening_rank.value()?);
    let closing = u64::from(record.closing_rank.value()?);
    let rank = u64::from(rank);

    if opening <= rank && rank <= closing {
        return Some(Status::Fitting);
    }

    let floor = rank.saturating_sub(u64::from(window.look_back));
    if floor <= closing && closing < rank {
        return Some(Status::Aspirational);
    }

    if opening > rank {
        let within = match window.look_ahead {
            Some(margin) => opening <= rank + u64::from(margin),
            None => true,
        };
        if within {
            return Some(Status::OpeningDown);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admissions::domain::{
        AdmissionYear, BaseCategory, CutoffRank, GenderPool, InstituteTier, SeatCategory,
    };

    fn record(opening: u32, closing: u32) -> AdmissionRecord {
        AdmissionRecord {
            institute: "Indian Institute of Technology Bombay".to_string(),
            institute_tier: InstituteTier::TierA,
            program: "Electrical Engineering (4 Years, Bachelor of Technology)".to_string(),
            seat_category: SeatCategory::new(BaseCategory::Open, false),
            gender_pool: GenderPool::GenderNeutral,
            opening_rank: CutoffRank::Numeric(opening),
            closing_rank: CutoffRank::Numeric(closing),
            quota: None,
            year: AdmissionYear(2024),
        }
    }

    #[test]
    fn rank_inside_cutoffs_is_fitting() {
        let window = RankWindow::new(300, Some(500));
        assert_eq!(
            classify(&record(500, 1200), 1000, &window),
            Some(Status::Fitting)
        );
        assert_eq!(
            classify(&record(1000, 1000), 1000, &window),
            Some(Status::Fitting)
        );
    }

    #[test]
    fn closing_rank_within_look_back_is_aspirational() {
        let window = RankWindow::unbounded(300);
        assert_eq!(
            classify(&record(600, 800), 1000, &window),
            Some(Status::Aspirational)
        );
        assert_eq!(
            classify(&record(600, 999), 1000, &RankWindow::unbounded(1)),
            Some(Status::Aspirational)
        );
        assert_eq!(
            classify(&record(600, 700), 1000, &window),
            Some(Status::Aspirational)
        );
        assert_eq!(classify(&record(100, 699), 1000, &window), None);
    }

    #[test]
    fn look_ahead_bound_is_inclusive() {
        let window = RankWindow::new(300, Some(500));
        assert_eq!(
            classify(&record(1500, 2000), 1000, &window),
            Some(Status::OpeningDown)
        );
        assert_eq!(classify(&record(1501, 2000), 1000, &window), None);
        assert_eq!(
            classify(&record(90_000, 95_000), 1000, &RankWindow::unbounded(300)),
            Some(Status::OpeningDown)
        );
    }

    #[test]
    fn inverted_cutoffs_fall_through_to_opening_down() {
        let inverted = record(1300, 1290);
        assert_eq!(
            classify(&inverted, 1000, &RankWindow::new(300, Some(300))),
            Some(Status::OpeningDown)
        );
        assert_eq!(
            classify(&inverted, 1000, &RankWindow::new(300, Some(299))),
            None
        );
    }

    #[test]
    fn unparsed_cutoffs_are_unclassifiable() {
        let mut malformed = record(500, 1200);
        malformed.opening_rank = CutoffRank::Unparsed("N/A".to_string());
        assert_eq!(classify(&malformed, 1000, &RankWindow::default()), None);

        let mut zeroed = record(500, 1200);
        zeroed.closing_rank = CutoffRank::Numeric(0);
        assert_eq!(classify(&zeroed, 1000, &RankWindow::default()), None);
    }

    #[test]
    fn extreme_values_do_not_overflow() {
        let window = RankWindow::new(u32::MAX, Some(u32::MAX));
        assert_eq!(
            classify(&record(u32::MAX, u32::MAX), u32::MAX - 1, &window),
            Some(Status::OpeningDown)
        );
        assert_eq!(
            classify(&record(1, 5), u32::MAX, &window),
            Some(Status::Aspirational)
        );
    }

    #[test]
    fn statuses_are_exclusive_and_widening_look_ahead_only_adds() {
        let narrow = RankWindow::new(300, Some(100));
        let wide = RankWindow::new(300, Some(5_000));
        for opening in (1..3_000).step_by(37) {
            for closing in (1..3_000).step_by(53) {
                let candidate = record(opening, closing);
                let before = classify(&candidate, 1_000, &narrow);
                let after = classify(&candidate, 1_000, &wide);
                match before {
                    Some(status) => assert_eq!(after, Some(status)),
                    None => assert!(matches!(after, None | Some(Status::OpeningDown))),
                }
            }
        }
    }
}
