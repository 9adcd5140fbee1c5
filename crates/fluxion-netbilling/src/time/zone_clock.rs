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

use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use prometheus::IntCounter;
use tracing::warn;

/// UTC instants of local 00:00:00.000 and 23:59:59.999 of one civil day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayBounds {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Civil-time arithmetic for one configured zone.
///
/// Offsets come from the tz database. When the zone cannot be resolved the
/// clock falls back to a seasonal guess (+02:00 April–October, +01:00
/// otherwise). That path is lossy around DST changes, so every use is logged
/// and counted.
#[derive(Debug, Clone)]
pub struct ZoneClock {
    zone_name: String,
    tz: Option<Tz>,
    degraded: Option<IntCounter>,
}

impl ZoneClock {
    pub fn new(zone_name: &str) -> Self {
        let tz = match zone_name.parse::<Tz>() {
            Ok(tz) => Some(tz),
            Err(e) => {
                warn!(
                    "🌍 Unknown timezone '{}' ({}), day boundaries will use the seasonal offset heuristic",
                    zone_name, e
                );
                None
            }
        };
        Self {
            zone_name: zone_name.to_owned(),
            tz,
            degraded: None,
        }
    }

    /// Count every heuristic offset resolution on `counter`
    #[must_use]
    pub fn with_degrade_counter(mut self, counter: IntCounter) -> Self {
        self.degraded = Some(counter);
        self
    }

    pub fn zone_name(&self) -> &str {
        &self.zone_name
    }

    pub fn is_degraded(&self) -> bool {
        self.tz.is_none()
    }

    /// UTC offset of the zone at `instant`, in minutes
    #[expect(
        clippy::integer_division,
        reason = "tz database offsets are whole minutes"
    )]
    pub fn offset_minutes(&self, instant: DateTime<Utc>) -> i32 {
        match self.tz {
            Some(tz) => {
                tz.offset_from_utc_datetime(&instant.naive_utc())
                    .fix()
                    .local_minus_utc()
                    / 60
            }
            None => self.heuristic_offset_minutes(instant),
        }
    }

    /// Local wall-clock date and time at `instant`
    pub fn local_parts(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        let utc = instant.naive_utc();
        utc.checked_add_signed(Duration::minutes(i64::from(self.offset_minutes(instant))))
            .unwrap_or(utc)
    }

    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        self.local_parts(instant).date()
    }

    /// Resolve a local wall-clock time to UTC.
    ///
    /// Ambiguous times (autumn fold) resolve to the earlier instant. Times
    /// inside the spring gap are shifted by the offset in force before it.
    pub fn to_utc(&self, local: NaiveDateTime) -> DateTime<Utc> {
        let Some(tz) = self.tz else {
            let offset = self.heuristic_offset_minutes(local.and_utc());
            return (local - Duration::minutes(i64::from(offset))).and_utc();
        };

        match tz.from_local_datetime(&local) {
            LocalResult::Single(dt) => dt.with_timezone(&Utc),
            LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
            LocalResult::None => {
                let before_gap = (local - Duration::hours(3)).and_utc();
                let offset = self.offset_minutes(before_gap);
                (local - Duration::minutes(i64::from(offset))).and_utc()
            }
        }
    }

    pub fn day_bounds(&self, date: NaiveDate) -> DayBounds {
        let midnight = date.and_time(NaiveTime::MIN);
        let last_milli = midnight
            .checked_add_signed(Duration::days(1) - Duration::milliseconds(1))
            .unwrap_or(NaiveDateTime::MAX);
        DayBounds {
            start: self.to_utc(midnight),
            end: self.to_utc(last_milli),
        }
    }

    /// Bounds of the local calendar day containing `instant`
    pub fn local_day_bounds(&self, instant: DateTime<Utc>) -> DayBounds {
        self.day_bounds(self.local_date(instant))
    }

    pub fn today_bounds(&self) -> DayBounds {
        self.local_day_bounds(Utc::now())
    }

    fn heuristic_offset_minutes(&self, instant: DateTime<Utc>) -> i32 {
        if let Some(counter) = &self.degraded {
            counter.inc();
        }
        let month = (instant + Duration::hours(1)).month();
        let offset = if (4..=10).contains(&month) { 120 } else { 60 };
        warn!(
            "⚠️ Degraded timezone resolution for '{}' at {}: assuming offset of +{} min",
            self.zone_name,
            instant.format("%Y-%m-%d %H:%M"),
            offset
        );
        offset
    }
}
