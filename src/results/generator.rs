use super::{TimeSlot, codec};
use chrono::{Days, NaiveDate};

/// Extension order for the fast path and background scans.
pub const PREFERRED_EXTENSIONS: [&str; 4] = ["webp", "jpeg", "jpg", "png"];

/// Wider extension set used when looking up one exact date and slot.
pub const LOOKUP_EXTENSIONS: [&str; 6] = ["webp", "jpeg", "jpg", "png", "gif", "bmp"];

/// Name prefixes tried on exact lookups, in order.
pub const LOOKUP_PREFIXES: [&str; 2] = ["", codec::FILE_PREFIX];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOrder {
    /// slot, then day (newest first), then extension
    PriorityFirst,
    /// day (newest first), then slot, then extension
    DateFirst,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub filename: String,
    pub date: NaiveDate,
    pub time_slot: TimeSlot,
}

#[derive(Debug, Clone)]
pub struct CandidateQuery<'a> {
    pub today: NaiveDate,
    pub lookback_days: u32,
    pub time_slots: &'a [TimeSlot],
    pub extensions: &'a [String],
}

impl CandidateQuery<'_> {
    /// Dates in the window, `today` first. Dates before the calendar's
    /// start are silently dropped.
    fn dates(&self) -> Vec<NaiveDate> {
        (0..self.lookback_days)
            .filter_map(|back| self.today.checked_sub_days(Days::new(back as u64)))
            .collect()
    }

    pub fn generate(&self, order: SearchOrder) -> Vec<Candidate> {
        let dates = self.dates();
        let mut candidates =
            Vec::with_capacity(dates.len() * self.time_slots.len() * self.extensions.len());

        let mut push = |date: NaiveDate, slot: TimeSlot| {
            for ext in self.extensions {
                candidates.push(Candidate {
                    filename: codec::candidate_filename("", date, slot, ext),
                    date,
                    time_slot: slot,
                });
            }
        };

        match order {
            SearchOrder::PriorityFirst => {
                for &slot in self.time_slots {
                    for &date in &dates {
                        push(date, slot);
                    }
                }
            }
            SearchOrder::DateFirst => {
                for &date in &dates {
                    for &slot in self.time_slots {
                        push(date, slot);
                    }
                }
            }
        }

        candidates
    }
}

/// Every name an exact `date` + `slot` lookup may be published under.
pub fn lookup_candidates(date: NaiveDate, slot: TimeSlot) -> Vec<Candidate> {
    LOOKUP_PREFIXES
        .iter()
        .flat_map(|prefix| {
            LOOKUP_EXTENSIONS.iter().map(move |ext| Candidate {
                filename: codec::candidate_filename(prefix, date, slot, ext),
                date,
                time_slot: slot,
            })
        })
        .collect()
}

pub fn default_extensions() -> Vec<String> {
    PREFERRED_EXTENSIONS.iter().map(|e| e.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, 13).unwrap()
    }

    fn names(candidates: &[Candidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.filename.as_str()).collect()
    }

    #[test]
    fn test_priority_first_checks_best_slot_on_every_day_first() {
        let extensions = vec!["webp".to_string(), "jpeg".to_string()];
        let query = CandidateQuery {
            today: today(),
            lookback_days: 2,
            time_slots: &TimeSlot::PRIORITY_ORDER,
            extensions: &extensions,
        };
        let candidates = query.generate(SearchOrder::PriorityFirst);

        assert_eq!(candidates.len(), 2 * 3 * 2);
        assert_eq!(
            names(&candidates[..4]),
            vec![
                "13-08-2025 8pm.webp",
                "13-08-2025 8pm.jpeg",
                "12-08-2025 8pm.webp",
                "12-08-2025 8pm.jpeg",
            ]
        );
        assert_eq!(candidates[4].filename, "13-08-2025 6pm.webp");
    }

    #[test]
    fn test_date_first_completes_each_day() {
        let extensions = vec!["webp".to_string()];
        let query = CandidateQuery {
            today: today(),
            lookback_days: 2,
            time_slots: &TimeSlot::PRIORITY_ORDER,
            extensions: &extensions,
        };
        let candidates = query.generate(SearchOrder::DateFirst);

        assert_eq!(
            names(&candidates),
            vec![
                "13-08-2025 8pm.webp",
                "13-08-2025 6pm.webp",
                "13-08-2025 1pm.webp",
                "12-08-2025 8pm.webp",
                "12-08-2025 6pm.webp",
                "12-08-2025 1pm.webp",
            ]
        );
    }

    #[test]
    fn test_generation_is_deterministic_and_bounded() {
        let extensions = default_extensions();
        let query = CandidateQuery {
            today: today(),
            lookback_days: 7,
            time_slots: &TimeSlot::PRIORITY_ORDER,
            extensions: &extensions,
        };
        let first = query.generate(SearchOrder::DateFirst);
        let second = query.generate(SearchOrder::DateFirst);
        assert_eq!(first, second);

        let oldest = first.iter().map(|c| c.date).min().unwrap();
        assert_eq!(oldest, NaiveDate::from_ymd_opt(2025, 8, 7).unwrap());
        assert!(first.iter().all(|c| c.date <= today()));
    }

    #[test]
    fn test_zero_lookback_generates_nothing() {
        let extensions = default_extensions();
        let query = CandidateQuery {
            today: today(),
            lookback_days: 0,
            time_slots: &TimeSlot::PRIORITY_ORDER,
            extensions: &extensions,
        };
        assert!(query.generate(SearchOrder::PriorityFirst).is_empty());
    }

    #[test]
    fn test_lookup_candidates_try_plain_names_before_prefixed() {
        let candidates = lookup_candidates(today(), TimeSlot::SIX_PM);
        assert_eq!(candidates.len(), 12);
        assert_eq!(candidates[0].filename, "13-08-2025 6pm.webp");
        assert_eq!(candidates[5].filename, "13-08-2025 6pm.bmp");
        assert_eq!(candidates[6].filename, "File 13-08-2025 6pm.webp");
    }
}
