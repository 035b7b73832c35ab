//! [`Schedule`] of a [`Contract`].

use std::iter::FusedIterator;

use common::Date;
use derive_more::{Display, Error};

#[cfg(doc)]
use crate::domain::Contract;

/// Billing period of a [`Contract`]: 7 days or less for the last one.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Week {
    /// First day of this [`Week`].
    pub date_started: Date,

    /// Last day of this [`Week`] (inclusive).
    pub date_finished: Date,
}

impl Week {
    /// Number of days in a full [`Week`].
    pub const DAYS: i64 = 7;

    /// Indicates whether the provided `date` belongs to this [`Week`].
    #[must_use]
    pub fn contains(&self, date: Date) -> bool {
        self.date_started <= date && date <= self.date_finished
    }

    /// Returns the number of days in this [`Week`].
    #[must_use]
    pub fn days(&self) -> i64 {
        self.date_finished.days_since(self.date_started) + 1
    }
}

/// Ordered sequence of consecutive [`Week`]s covering a [`Contract`] span.
///
/// Every [`Week`] starts the day after the previous one finishes, and the
/// last one is truncated to the span end. Being [`Clone`], a [`Schedule`] can
/// be walked any number of times.
#[derive(Clone, Debug)]
pub struct Schedule {
    /// Start of the next [`Week`] to yield, if any left.
    next: Option<Date>,

    /// Last day of the span (inclusive).
    end: Date,
}

impl Schedule {
    /// Creates a new [`Schedule`] of the span between the provided dates
    /// (both inclusive).
    ///
    /// An empty [`Schedule`] is created if `end` precedes `start`.
    #[must_use]
    pub fn new(start: Date, end: Date) -> Self {
        Self {
            next: (start <= end).then_some(start),
            end,
        }
    }
}

impl Iterator for Schedule {
    type Item = Week;

    fn next(&mut self) -> Option<Self::Item> {
        let date_started = self.next?;
        let date_finished =
            date_started.add_days(Week::DAYS - 1).min(self.end);

        // `date_finished >= date_started`, so this always moves forward.
        self.next = date_finished
            .checked_add_days(1)
            .filter(|d| *d <= self.end);

        Some(Week {
            date_started,
            date_finished,
        })
    }
}

impl FusedIterator for Schedule {}

/// Error of looking up a [`Week`] for a date outside of a [`Contract`].
#[derive(Clone, Copy, Debug, Display, Error)]
#[display("No `Contract` week contains {_0}")]
pub struct WeekOutOfRange(#[error(not(source))] pub Date);

#[cfg(test)]
mod spec {
    use common::Date;

    use super::{Schedule, Week};

    fn date(s: &str) -> Date {
        s.parse().unwrap()
    }

    fn week(start: &str, end: &str) -> Week {
        Week {
            date_started: date(start),
            date_finished: date(end),
        }
    }

    #[test]
    fn splits_two_full_weeks() {
        let weeks = Schedule::new(date("2030-01-01"), date("2030-01-14"))
            .collect::<Vec<_>>();

        assert_eq!(
            weeks,
            [
                week("2030-01-01", "2030-01-07"),
                week("2030-01-08", "2030-01-14"),
            ],
        );
    }

    #[test]
    fn truncates_last_week() {
        let weeks = Schedule::new(date("2030-01-29"), date("2030-02-10"))
            .collect::<Vec<_>>();

        assert_eq!(
            weeks,
            [
                week("2030-01-29", "2030-02-04"),
                week("2030-02-05", "2030-02-10"),
            ],
        );
    }

    #[test]
    fn handles_degenerate_spans() {
        let single = Schedule::new(date("2030-01-01"), date("2030-01-01"))
            .collect::<Vec<_>>();
        assert_eq!(single, [week("2030-01-01", "2030-01-01")]);

        let mut empty = Schedule::new(date("2030-01-02"), date("2030-01-01"));
        assert_eq!(empty.next(), None);
        assert_eq!(empty.next(), None);
    }

    #[test]
    fn covers_span_without_gaps_or_overlaps() {
        let start = date("2030-01-01");
        for len in 0..120 {
            let end = start.add_days(len);
            let schedule = Schedule::new(start, end);
            let weeks = schedule.clone().collect::<Vec<_>>();

            assert_eq!(weeks.first().map(|w| w.date_started), Some(start));
            assert_eq!(weeks.last().map(|w| w.date_finished), Some(end));
            assert!(weeks.iter().all(|w| (1..=7).contains(&w.days())));
            assert!(weeks.iter().rev().skip(1).all(|w| w.days() == 7));
            for pair in weeks.windows(2) {
                assert_eq!(
                    pair[0].date_finished.add_days(1),
                    pair[1].date_started,
                );
            }
            assert_eq!(weeks.iter().map(Week::days).sum::<i64>(), len + 1);

            // Restartable.
            assert_eq!(schedule.collect::<Vec<_>>(), weeks);
        }
    }
}
