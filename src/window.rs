//! Date-window generation for the observation window and its successor.

use std::fmt;

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::errors::ExtractError;

/// One calendar day, the iteration unit for window extraction.
///
/// Ordering follows calendar order; two triples are equal exactly when all
/// components match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DateTriple {
    /// Calendar year.
    pub year: i32,
    /// Calendar month (1-12).
    pub month: u32,
    /// Calendar day of month (1-31).
    pub day: u32,
}

impl DateTriple {
    /// Build a triple from explicit components, rejecting invalid dates.
    pub fn new(year: i32, month: u32, day: u32) -> Result<Self, ExtractError> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self::from_date)
            .ok_or_else(|| {
                ExtractError::Configuration(format!("invalid date {year}-{month}-{day}"))
            })
    }

    /// Build a triple from a `chrono` date.
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
            day: date.day(),
        }
    }

    /// Convert back to a `chrono` date.
    pub fn to_date(self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
            .expect("DateTriple holds a valid calendar date")
    }
}

impl fmt::Display for DateTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// Generate the ordered days of an observation window.
///
/// Yields `ceil(window_size / stride)` triples spaced `stride` days apart,
/// starting at `start`. With `offset` set, the sequence instead starts
/// `window_size` days after `start`, producing the disjoint next window of
/// equal length. A zero `window_size` yields an empty sequence.
///
/// Pure and deterministic; recompute rather than cache.
pub fn gen_window_dates(
    start: NaiveDate,
    window_size: u32,
    stride: u32,
    offset: bool,
) -> Result<Vec<DateTriple>, ExtractError> {
    if stride == 0 {
        return Err(ExtractError::Configuration(
            "window stride must be at least one day".into(),
        ));
    }
    if window_size == 0 {
        return Ok(Vec::new());
    }
    let first = if offset {
        start
            .checked_add_days(Days::new(u64::from(window_size)))
            .ok_or_else(|| ExtractError::Configuration("window start out of range".into()))?
    } else {
        start
    };
    let end = first
        .checked_add_days(Days::new(u64::from(window_size)))
        .ok_or_else(|| ExtractError::Configuration("window end out of range".into()))?;

    let mut days = Vec::with_capacity(window_size.div_ceil(stride) as usize);
    let mut cursor = first;
    while cursor < end {
        days.push(DateTriple::from_date(cursor));
        cursor = match cursor.checked_add_days(Days::new(u64::from(stride))) {
            Some(next) => next,
            None => break,
        };
    }
    Ok(days)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn window_has_expected_length_and_spacing() {
        for (window_size, stride) in [(7u32, 1u32), (7, 2), (7, 3), (30, 7), (1, 1)] {
            let days = gen_window_dates(date(2018, 5, 27), window_size, stride, false).unwrap();
            assert_eq!(
                days.len(),
                window_size.div_ceil(stride) as usize,
                "window_size={window_size} stride={stride}"
            );
            for pair in days.windows(2) {
                let gap = pair[1].to_date() - pair[0].to_date();
                assert_eq!(gap.num_days(), i64::from(stride));
            }
        }
    }

    #[test]
    fn window_wraps_month_and_year_boundaries() {
        let days = gen_window_dates(date(2018, 1, 31), 2, 1, false).unwrap();
        assert_eq!(
            days,
            vec![
                DateTriple::new(2018, 1, 31).unwrap(),
                DateTriple::new(2018, 2, 1).unwrap(),
            ]
        );

        let days = gen_window_dates(date(2017, 12, 31), 2, 1, false).unwrap();
        assert_eq!(days[1], DateTriple::new(2018, 1, 1).unwrap());
    }

    #[test]
    fn offset_window_is_adjacent_and_disjoint() {
        let current = gen_window_dates(date(2018, 5, 27), 7, 1, false).unwrap();
        let next = gen_window_dates(date(2018, 5, 27), 7, 1, true).unwrap();

        assert_eq!(next.len(), current.len());
        let gap = next[0].to_date() - current[0].to_date();
        assert_eq!(gap.num_days(), 7);
        assert!(current.iter().all(|day| !next.contains(day)));
    }

    #[test]
    fn zero_window_is_empty_and_zero_stride_is_rejected() {
        assert!(gen_window_dates(date(2018, 5, 27), 0, 1, false)
            .unwrap()
            .is_empty());
        assert!(gen_window_dates(date(2018, 5, 27), 7, 0, false).is_err());
    }

    #[test]
    fn date_triple_orders_by_calendar() {
        let earlier = DateTriple::new(2018, 12, 31).unwrap();
        let later = DateTriple::new(2019, 1, 1).unwrap();
        assert!(earlier < later);
        assert_eq!(later.to_string(), "2019-01-01");
        assert!(DateTriple::new(2018, 2, 30).is_err());
    }
}
