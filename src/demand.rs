//! Origin-destination demand.

use serde::{Deserialize, Serialize};

/// Demand between origin and destination zones, indexed by registration order.
///
/// Entries outside the matrix read as zero demand.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OdMatrix {
    rows: Vec<Vec<f64>>,
}

impl OdMatrix {
    /// Zero matrix of the given shape.
    pub fn zeros(origins: usize, destinations: usize) -> Self {
        Self {
            rows: vec![vec![0.0; destinations]; origins],
        }
    }

    /// Matrix with the same demand on every cell.
    pub fn uniform(origins: usize, destinations: usize, value: f64) -> Self {
        Self {
            rows: vec![vec![value; destinations]; origins],
        }
    }

    /// Matrix from explicit rows.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Self {
        Self { rows }
    }

    /// Demand from origin `i` to destination `j`.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.rows.get(i).and_then(|r| r.get(j)).copied().unwrap_or(0.0)
    }

    /// Set the demand of one cell, growing the matrix when needed.
    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        if self.rows.len() <= i {
            self.rows.resize_with(i + 1, Vec::new);
        }
        let row = &mut self.rows[i];
        if row.len() <= j {
            row.resize(j + 1, 0.0);
        }
        row[j] = value;
    }

    /// Number of origin rows.
    pub fn origins(&self) -> usize {
        self.rows.len()
    }

    /// Total demand.
    pub fn total(&self) -> f64 {
        self.rows.iter().flatten().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_is_zero() {
        let m = OdMatrix::uniform(1, 1, 5.0);
        assert_eq!(m.get(0, 0), 5.0);
        assert_eq!(m.get(3, 0), 0.0);
    }

    #[test]
    fn test_set_grows() {
        let mut m = OdMatrix::zeros(0, 0);
        m.set(2, 1, 4.0);
        assert_eq!(m.origins(), 3);
        assert_eq!(m.get(2, 1), 4.0);
        assert_eq!(m.total(), 4.0);
    }
}
