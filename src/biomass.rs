//! Phytoplankton biomass estimation from chlorophyll-a concentration.
//!
//! Chlorophyll-a is used here as a direct proxy for standing phytoplankton
//! stock under a constant mixed layer depth (MLD) assumption: the surface
//! concentration is taken to extend uniformly through the mixed layer, and
//! every grid cell is assigned the same per-pixel area. The latitude
//! dependence of lon/lat cell areas is intentionally not corrected; the
//! estimate is a first-order bound, not a gridded integration.
//!
//! Steps:
//!
//! 1. Replace masked cells with 0 (missing data contributes nothing)
//! 2. Clip remaining negative concentrations to 0
//! 3. Sum concentrations (mg/m³) over the grid
//! 4. Multiply by MLD (m) and per-pixel area (m²) to get total mg
//! 5. Convert mg to kg
//! 6. Band the result at ±25%, representing MLD ±25%
//!
//! The low/high bounds are scalar multiples of the point estimate, not
//! re-runs with a perturbed MLD.
//!
//! ## References
//!
//! - Huot, Y., et al. (2007). Does chlorophyll a provide the best index of
//!   phytoplankton biomass for primary productivity studies?
//!   *Biogeosciences Discussions*, 4, 707-745.

use crate::grid::{self, MaskedField};

const KM2_TO_M2: f64 = 1.0e6;
const MG_PER_KG: f64 = 1.0e6;
const BAND_FRACTION: f64 = 0.25;

/// Biomass point estimate with its uncertainty band, in kilograms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiomassEstimate {
    pub total_kg: f64,
    pub low_kg: f64,  // MLD -25%
    pub high_kg: f64, // MLD +25%
}

impl BiomassEstimate {
    /// Three-line human-readable summary, suitable for stdout and for the
    /// figure annotation box.
    pub fn text_block(&self) -> String {
        format!(
            "Total biomass: {} kg\nLow estimate (MLD -25%): {} kg\nHigh estimate (MLD +25%): {} kg",
            format_kg(self.total_kg),
            format_kg(self.low_kg),
            format_kg(self.high_kg),
        )
    }
}

/// Estimates phytoplankton biomass from a masked CHL-a field (mg/m³), a
/// mixed layer depth in meters, and a per-pixel area in km².
///
/// Total over any input: an empty, all-masked, or all-zero field yields a
/// valid zero estimate.
pub fn compute_biomass_estimates(
    field: &MaskedField,
    mld_m: f64,
    area_per_pixel_km2: f64,
) -> BiomassEstimate {
    let chl = grid::clip_negative(field.filled(0.0));

    let pixel_area_m2 = area_per_pixel_km2 * KM2_TO_M2;
    let biomass_mg: f64 = chl.iter().map(|&v| v as f64).sum::<f64>() * mld_m * pixel_area_m2;
    let total_kg = biomass_mg / MG_PER_KG;

    BiomassEstimate {
        total_kg,
        low_kg: total_kg * (1.0 - BAND_FRACTION),
        high_kg: total_kg * (1.0 + BAND_FRACTION),
    }
}

// Thousands-separated fixed-point formatting, e.g. 1234567.891 -> "1,234,567.89"
fn format_kg(value: f64) -> String {
    let fixed = format!("{:.2}", value);
    let (integer, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let (sign, digits) = match integer.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", integer),
    };

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    format!("{}{}.{}", sign, grouped, fraction)
}
