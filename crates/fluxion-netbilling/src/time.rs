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

//! Civil-time helpers: zone offsets, local-day boundaries and flexible date parsing

mod day_range;
mod parser;
mod zone_clock;

pub use day_range::{LocalDays, local_day_starts, local_days};
pub use parser::{RangeRole, parse_instant};
pub use zone_clock::{DayBounds, ZoneClock};
