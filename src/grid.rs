use std::fmt;

/// Geographic axes of a regular lat/lon product, in degrees.
#[derive(Debug, Clone)]
pub struct Grid {
    lat: Vec<f64>,
    lon: Vec<f64>,
}

impl Grid {
    pub fn new(lat: Vec<f64>, lon: Vec<f64>) -> Self {
        Self { lat, lon }
    }

    pub fn lat(&self) -> &[f64] {
        &self.lat
    }

    pub fn lon(&self) -> &[f64] {
        &self.lon
    }

    // Cell edges at midpoints between consecutive axis values, with the end
    // cells extended by half the adjacent spacing. Works for ascending and
    // descending axes alike.
    pub fn lat_edges(&self) -> Vec<f64> {
        cell_edges(&self.lat)
    }

    pub fn lon_edges(&self) -> Vec<f64> {
        cell_edges(&self.lon)
    }
}

fn cell_edges(axis: &[f64]) -> Vec<f64> {
    match axis.len() {
        0 => Vec::new(),
        1 => vec![axis[0] - 0.5, axis[0] + 0.5],
        n => {
            let mut edges = Vec::with_capacity(n + 1);
            edges.push(axis[0] - (axis[1] - axis[0]) / 2.0);
            for i in 1..n {
                edges.push((axis[i - 1] + axis[i]) / 2.0);
            }
            edges.push(axis[n - 1] + (axis[n - 1] - axis[n - 2]) / 2.0);
            edges
        }
    }
}

/// A 2D concentration field paired with its missing-data mask.
///
/// Values are row-major `[lat][lon]`; `mask[i]` is true when cell `i` holds
/// no usable data. Masked cells are excluded from every statistic. The
/// transforms below return new data rather than mutating in place.
#[derive(Debug, Clone)]
pub struct MaskedField {
    values: Vec<f32>,
    mask: Vec<bool>,
    width: usize,
    height: usize,
}

impl MaskedField {
    pub fn new(values: Vec<f32>, width: usize, height: usize) -> Result<Self, String> {
        if values.len() != width * height {
            return Err(format!(
                "Field has {} values, expected {}x{} = {}",
                values.len(),
                width,
                height,
                width * height
            ));
        }

        let mask = vec![false; values.len()];
        Ok(Self {
            values,
            mask,
            width,
            height,
        })
    }

    /// Masks every cell equal to `fill_value` or NaN, keeping cells that are
    /// already masked. Re-applying the same rule leaves the mask unchanged.
    pub fn mask_where(self, fill_value: f32) -> Self {
        let mask = self
            .values
            .iter()
            .zip(&self.mask)
            .map(|(&v, &m)| m || v == fill_value || v.is_nan())
            .collect();

        Self { mask, ..self }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn value(&self, row: usize, col: usize) -> f32 {
        self.values[row * self.width + col]
    }

    pub fn is_masked(&self, row: usize, col: usize) -> bool {
        self.mask[row * self.width + col]
    }

    pub fn mask(&self) -> &[bool] {
        &self.mask
    }

    pub fn unmasked_count(&self) -> usize {
        self.mask.iter().filter(|&&m| !m).count()
    }

    /// Copy of the value array with masked cells replaced by `fill`.
    pub fn filled(&self, fill: f32) -> Vec<f32> {
        self.values
            .iter()
            .zip(&self.mask)
            .map(|(&v, &m)| if m { fill } else { v })
            .collect()
    }

    /// Smallest strictly positive unmasked value.
    pub fn min_positive(&self) -> Option<f32> {
        self.unmasked()
            .filter(|&v| v > 0.0)
            .fold(None, |acc, v| Some(acc.map_or(v, |m: f32| m.min(v))))
    }

    /// Largest unmasked value.
    pub fn max(&self) -> Option<f32> {
        self.unmasked()
            .fold(None, |acc, v| Some(acc.map_or(v, |m: f32| m.max(v))))
    }

    fn unmasked(&self) -> impl Iterator<Item = f32> + '_ {
        self.values
            .iter()
            .zip(&self.mask)
            .filter(|&(_, &m)| !m)
            .map(|(&v, _)| v)
    }
}

/// Negative concentrations treated as zero; positive values pass through.
pub fn clip_negative(values: Vec<f32>) -> Vec<f32> {
    values
        .into_iter()
        .map(|v| if v < 0.0 { 0.0 } else { v })
        .collect()
}

impl fmt::Display for MaskedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Grid: {}x{}\nValid cells: {} / {}\nMin: {}\nMax: {}",
            self.width,
            self.height,
            self.unmasked_count(),
            self.values.len(),
            self.unmasked()
                .filter(|v| !v.is_nan())
                .fold(f32::INFINITY, f32::min),
            self.unmasked()
                .filter(|v| !v.is_nan())
                .fold(f32::NEG_INFINITY, f32::max),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_shape_mismatch() {
        assert!(MaskedField::new(vec![1.0, 2.0, 3.0], 2, 2).is_err());
        assert!(MaskedField::new(vec![1.0, 2.0, 3.0, 4.0], 2, 2).is_ok());
    }

    #[test]
    fn test_mask_where_fill_and_nan() {
        let field = MaskedField::new(vec![1.0, -999.0, f32::NAN, 3.0], 2, 2)
            .unwrap()
            .mask_where(-999.0);

        assert!(!field.is_masked(0, 0));
        assert!(field.is_masked(0, 1));
        assert!(field.is_masked(1, 0));
        assert!(!field.is_masked(1, 1));
        assert_eq!(field.unmasked_count(), 2);
    }

    #[test]
    fn test_mask_where_is_idempotent() {
        let once = MaskedField::new(vec![1.0, -999.0, f32::NAN, 3.0], 2, 2)
            .unwrap()
            .mask_where(-999.0);
        let twice = once.clone().mask_where(-999.0);

        assert_eq!(once.mask(), twice.mask());
    }

    #[test]
    fn test_negatives_pass_through_masking() {
        let field = MaskedField::new(vec![1.0, -2.0], 2, 1)
            .unwrap()
            .mask_where(-999.0);

        assert!(!field.is_masked(0, 1));
        assert_eq!(field.value(0, 1), -2.0);
    }

    #[test]
    fn test_min_positive_and_max_skip_masked_cells() {
        // 0 is the fill value here, so the color scale sees only 5 and 10
        let field = MaskedField::new(vec![0.0, 0.0, 5.0, 10.0], 2, 2)
            .unwrap()
            .mask_where(0.0);

        assert_eq!(field.min_positive(), Some(5.0));
        assert_eq!(field.max(), Some(10.0));
    }

    #[test]
    fn test_min_positive_ignores_negatives_and_zero() {
        let field = MaskedField::new(vec![-3.0, 0.0, 2.0, 8.0], 2, 2).unwrap();

        assert_eq!(field.min_positive(), Some(2.0));
        assert_eq!(field.max(), Some(8.0));
    }

    #[test]
    fn test_all_masked_field_has_no_statistics() {
        let field = MaskedField::new(vec![f32::NAN, f32::NAN], 2, 1)
            .unwrap()
            .mask_where(-999.0);

        assert_eq!(field.min_positive(), None);
        assert_eq!(field.max(), None);
    }

    #[test]
    fn test_filled_replaces_only_masked_cells() {
        let field = MaskedField::new(vec![1.0, f32::NAN, -2.0, 3.0], 2, 2)
            .unwrap()
            .mask_where(-999.0);

        assert_eq!(field.filled(0.0), vec![1.0, 0.0, -2.0, 3.0]);
    }

    #[test]
    fn test_clip_negative() {
        assert_eq!(
            clip_negative(vec![1.0, -2.0, 0.0, 3.0]),
            vec![1.0, 0.0, 0.0, 3.0]
        );
    }

    #[test]
    fn test_cell_edges_ascending() {
        let edges = cell_edges(&[0.0, 1.0, 2.0]);
        assert_eq!(edges, vec![-0.5, 0.5, 1.5, 2.5]);
    }

    #[test]
    fn test_cell_edges_descending() {
        let edges = cell_edges(&[80.0, 79.0, 78.0]);
        assert_eq!(edges, vec![80.5, 79.5, 78.5, 77.5]);
    }

    #[test]
    fn test_cell_edges_single_point() {
        assert_eq!(cell_edges(&[5.0]), vec![4.5, 5.5]);
    }
}
