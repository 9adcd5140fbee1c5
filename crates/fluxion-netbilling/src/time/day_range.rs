// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of FluxION.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

use chrono::{DateTime, NaiveDate, Utc};

use super::{DayBounds, ZoneClock};

/// Local calendar days overlapping a UTC range, oldest first.
///
/// Cloning yields an independent iterator positioned where the original was,
/// so a sequence can be replayed.
#[derive(Debug, Clone)]
pub struct LocalDays<'a> {
    clock: &'a ZoneClock,
    next: Option<NaiveDate>,
    last: NaiveDate,
}

/// Enumerate the local days from the one containing `from` to the one
/// containing `to`, inclusive. Empty when `from > to`.
pub fn local_days(clock: &ZoneClock, from: DateTime<Utc>, to: DateTime<Utc>) -> LocalDays<'_> {
    let first = clock.local_date(from);
    let last = clock.local_date(to);
    LocalDays {
        clock,
        next: (from <= to).then_some(first),
        last,
    }
}

/// UTC instants of each local-day start between `from` and `to`
pub fn local_day_starts(
    clock: &ZoneClock,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> impl Iterator<Item = DateTime<Utc>> + Clone + '_ {
    local_days(clock, from, to).map(|day| day.start)
}

impl Iterator for LocalDays<'_> {
    type Item = DayBounds;

    fn next(&mut self) -> Option<DayBounds> {
        let date = self.next?;
        if date > self.last {
            self.next = None;
            return None;
        }
        self.next = date.succ_opt().filter(|d| *d <= self.last);
        Some(self.clock.day_bounds(date))
    }
}
