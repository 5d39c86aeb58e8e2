use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Am,
    Pm,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Am => "am",
            Period::Pm => "pm",
        }
    }
}

/// A draw time on the 12-hour clock, e.g. `8pm`.
///
/// The hour is always in `1..=12`; construction goes through [`TimeSlot::new`]
/// or [`FromStr`], both of which reject anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeSlot {
    hour: u8,
    period: Period,
}

impl TimeSlot {
    pub const ONE_PM: TimeSlot = TimeSlot {
        hour: 1,
        period: Period::Pm,
    };
    pub const SIX_PM: TimeSlot = TimeSlot {
        hour: 6,
        period: Period::Pm,
    };
    pub const EIGHT_PM: TimeSlot = TimeSlot {
        hour: 8,
        period: Period::Pm,
    };

    /// Primary draw times, highest priority first.
    pub const PRIORITY_ORDER: [TimeSlot; 3] = [Self::EIGHT_PM, Self::SIX_PM, Self::ONE_PM];

    pub fn new(hour: u8, period: Period) -> Option<Self> {
        (1..=12)
            .contains(&hour)
            .then_some(Self { hour, period })
    }

    pub fn from_hour24(hour24: u8) -> Option<Self> {
        match hour24 {
            0 => Some(Self {
                hour: 12,
                period: Period::Am,
            }),
            1..=11 => Some(Self {
                hour: hour24,
                period: Period::Am,
            }),
            12 => Some(Self {
                hour: 12,
                period: Period::Pm,
            }),
            13..=23 => Some(Self {
                hour: hour24 - 12,
                period: Period::Pm,
            }),
            _ => None,
        }
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn period(&self) -> Period {
        self.period
    }

    pub fn hour24(&self) -> u8 {
        match (self.hour, self.period) {
            (12, Period::Am) => 0,
            (12, Period::Pm) => 12,
            (h, Period::Am) => h,
            (h, Period::Pm) => h + 12,
        }
    }

    /// Selection rank: `8pm > 6pm > 1pm`, every other slot ranks 0.
    pub fn priority(&self) -> u8 {
        match *self {
            Self::EIGHT_PM => 3,
            Self::SIX_PM => 2,
            Self::ONE_PM => 1,
            _ => 0,
        }
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.hour, self.period.as_str())
    }
}

impl FromStr for TimeSlot {
    type Err = super::ResultsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let invalid = || super::ResultsError::InvalidTimeSlot(s.to_string());

        let (digits, period) = if let Some(digits) = lower.strip_suffix("am") {
            (digits, Period::Am)
        } else if let Some(digits) = lower.strip_suffix("pm") {
            (digits, Period::Pm)
        } else {
            return Err(invalid());
        };

        if digits.is_empty() || digits.len() > 2 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let hour: u8 = digits.parse().map_err(|_| invalid())?;
        TimeSlot::new(hour, period).ok_or_else(invalid)
    }
}

impl TryFrom<String> for TimeSlot {
    type Error = super::ResultsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeSlot> for String {
    fn from(slot: TimeSlot) -> Self {
        slot.to_string()
    }
}

/// One result image, identified from its filename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedResult {
    pub date: NaiveDate,
    pub time_slot: TimeSlot,
    pub filename: String,
    pub extension: String,
}

impl ParsedResult {
    pub fn hour24(&self) -> u8 {
        self.time_slot.hour24()
    }

    pub fn display_time(&self) -> String {
        self.time_slot.to_string()
    }

    pub fn date_time(&self) -> NaiveDateTime {
        // hour24 is always 0..=23
        let time = NaiveTime::from_hms_opt(self.hour24() as u32, 0, 0).unwrap_or(NaiveTime::MIN);
        self.date.and_time(time)
    }

    pub fn timestamp(&self) -> i64 {
        self.date_time().and_utc().timestamp()
    }
}

/// Wire form of a result on the index API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultDescriptor {
    pub filename: String,
    pub day: u32,
    pub month: u32,
    pub year: i32,
    pub hour: u8,
    pub hour24: u8,
    pub period: Period,
    pub display_time: String,
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<i64>,
}

impl ResultDescriptor {
    pub fn from_result(result: &ParsedResult) -> Self {
        Self {
            filename: result.filename.clone(),
            day: result.date.day(),
            month: result.date.month(),
            year: result.date.year(),
            hour: result.time_slot.hour(),
            hour24: result.hour24(),
            period: result.time_slot.period(),
            display_time: result.display_time(),
            timestamp: result.timestamp(),
            file_size: None,
            last_modified: None,
        }
    }

    pub fn with_file_info(mut self, file_size: u64, last_modified: Option<i64>) -> Self {
        self.file_size = Some(file_size);
        self.last_modified = last_modified;
        self
    }

    /// Re-derives the result from the filename; the other fields are not trusted.
    pub fn to_result(&self) -> Option<ParsedResult> {
        super::codec::parse_filename(&self.filename)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse {
    pub success: bool,
    pub count: usize,
    pub images: Vec<ResultDescriptor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindResponse {
    pub success: bool,
    pub found: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ResultDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct FindQuery {
    pub date: Option<String>,
    pub time: Option<String>,
}
