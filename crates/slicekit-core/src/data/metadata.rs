//! Print-time and filament-usage metadata

use crate::constants::headers;
use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// Metadata recovered from the engine's output
///
/// Summing metadata over several artifacts is an approximation: plates printed
/// one after another do not share warm-up or purge costs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SliceMetaData {
    /// Estimated print duration in seconds
    pub print_time: u64,
    /// Filament consumption in grams
    #[serde(rename = "filamentUsedG")]
    pub filament_used_g: f64,
    /// Filament consumption in millimeters
    #[serde(rename = "filamentUsedMm")]
    pub filament_used_mm: f64,
}

impl SliceMetaData {
    pub fn new(print_time: u64, filament_used_g: f64, filament_used_mm: f64) -> Self {
        Self {
            print_time,
            filament_used_g,
            filament_used_mm,
        }
    }

    /// True when nothing could be recovered
    pub fn is_zero(&self) -> bool {
        self.print_time == 0 && self.filament_used_g == 0.0 && self.filament_used_mm == 0.0
    }

    /// Response headers carrying this metadata as decimal strings
    pub fn header_pairs(&self) -> [(&'static str, String); 3] {
        [
            (headers::PRINT_TIME_SECONDS, self.print_time.to_string()),
            (headers::FILAMENT_USED_G, self.filament_used_g.to_string()),
            (headers::FILAMENT_USED_MM, self.filament_used_mm.to_string()),
        ]
    }
}

impl Add for SliceMetaData {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            print_time: self.print_time.saturating_add(other.print_time),
            filament_used_g: self.filament_used_g + other.filament_used_g,
            filament_used_mm: self.filament_used_mm + other.filament_used_mm,
        }
    }
}

impl AddAssign for SliceMetaData {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl Sum for SliceMetaData {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}
