use chrono::NaiveDate;

use crate::error::{FernError, Result};

/// Date range with an inclusive `start` and exclusive `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }
}

fn day_after(date: NaiveDate) -> NaiveDate {
    date.succ_opt().expect("date out of range")
}

/// Compute the date ranges that must be fetched to cover
/// `[window_start, yesterday]` minus what the store already holds.
///
/// `stored` is the account's `(earliest, latest)` transaction dates, or None
/// for an account with no transactions. The forward gap deliberately starts
/// at `latest` itself: the remote source can still flip the status of
/// transactions on the last known day, and insert-time dedup absorbs the
/// re-fetched rows.
pub fn ranges_to_fetch(
    window_start: Option<NaiveDate>,
    default_start: Option<NaiveDate>,
    stored: Option<(NaiveDate, NaiveDate)>,
    yesterday: NaiveDate,
    full: bool,
) -> Result<Vec<DateRange>> {
    let ceiling = day_after(yesterday);

    if full || stored.is_none() {
        let start = window_start.or(default_start).ok_or_else(|| {
            FernError::Config(
                "no start date: pass --from or set default_start_date in the config".to_string(),
            )
        })?;
        if start >= ceiling {
            return Ok(Vec::new());
        }
        return Ok(vec![DateRange { start, end: ceiling }]);
    }

    let (earliest, latest) = stored.unwrap();
    let mut ranges = Vec::new();

    if let Some(start) = window_start {
        if start < earliest {
            ranges.push(DateRange { start, end: earliest });
        }
    }
    if latest < yesterday {
        ranges.push(DateRange { start: latest, end: ceiling });
    }

    Ok(ranges)
}
