//! Log-scale color normalization and the reversed "summer" colormap used
//! for the concentration mesh (low values light yellow, high values dark
//! green).

use crate::grid::MaskedField;
use plotters::style::RGBColor;

/// Maps strictly positive values onto [0, 1] logarithmically between vmin
/// and vmax.
#[derive(Debug, Clone, Copy)]
pub struct LogNorm {
    vmin: f64,
    vmax: f64,
    ln_min: f64,
    ln_max: f64,
}

impl LogNorm {
    /// Requires 0 < vmin <= vmax, both finite.
    pub fn new(vmin: f64, vmax: f64) -> Option<Self> {
        if !vmin.is_finite() || !vmax.is_finite() || vmin <= 0.0 || vmax < vmin {
            return None;
        }

        Some(Self {
            vmin,
            vmax,
            ln_min: vmin.ln(),
            ln_max: vmax.ln(),
        })
    }

    /// Scale bounds from a field: vmin is the smallest strictly positive
    /// unmasked value, vmax the largest unmasked value. None when the field
    /// holds no strictly positive unmasked value, the degenerate case a log
    /// scale cannot represent.
    pub fn from_field(field: &MaskedField) -> Option<Self> {
        let vmin = field.min_positive()? as f64;
        let vmax = field.max()? as f64;

        Self::new(vmin, vmax)
    }

    pub fn vmin(&self) -> f64 {
        self.vmin
    }

    pub fn vmax(&self) -> f64 {
        self.vmax
    }

    /// Normalized position of `value` on the scale, clamped to [0, 1].
    /// Non-positive values map to 0; a single-valued scale maps everything
    /// to mid-scale instead of dividing by a zero log range.
    pub fn apply(&self, value: f32) -> f64 {
        let v = value as f64;
        if !(v > 0.0) {
            return 0.0;
        }
        if self.ln_max == self.ln_min {
            return 0.5;
        }

        ((v.ln() - self.ln_min) / (self.ln_max - self.ln_min)).clamp(0.0, 1.0)
    }

    /// Inverse of `apply` for colorbar labeling: the data value sitting at
    /// fraction `frac` of the scale.
    pub fn value_at(&self, frac: f64) -> f64 {
        (self.ln_min + (self.ln_max - self.ln_min) * frac).exp()
    }
}

/// Uniformly spaced colorbar ticks as (fraction, data value) pairs.
pub fn colorbar_ticks(norm: &LogNorm, count: usize) -> Vec<(f64, f64)> {
    if count < 2 {
        return vec![(0.0, norm.vmin())];
    }

    (0..count)
        .map(|i| {
            let frac = i as f64 / (count - 1) as f64;
            (frac, norm.value_at(frac))
        })
        .collect()
}

/// Matplotlib's "summer" ramp reversed: r = x, g = 0.5 + x/2, b = 0.4 with
/// x = 1 - t, so t = 0 is light yellow and t = 1 dark green.
pub fn summer_reversed(t: f64) -> RGBColor {
    let x = 1.0 - t.clamp(0.0, 1.0);

    RGBColor(
        (255.0 * x) as u8,
        (255.0 * (0.5 + 0.5 * x)) as u8,
        (255.0 * 0.4) as u8,
    )
}
