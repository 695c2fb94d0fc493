use serde::{Deserialize, Serialize};

use crate::error::{AtlasError, Result};
use crate::nodes::NodeRecord;

pub const DEFAULT_MIN_SIZE: f64 = 10.0;
pub const DEFAULT_MAX_SIZE: f64 = 200.0;

/// What to do when every node has the same popularity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegenerateRangePolicy {
    #[default]
    Reject,
    /// Every node is drawn at the minimum visual size.
    Collapse,
}

/// Observed popularity extremes of the node file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopularityRange {
    pub min: u64,
    pub max: u64,
}

impl PopularityRange {
    /// Scans all records rather than trusting the file to be sorted.
    pub fn scan(records: &[NodeRecord]) -> Option<Self> {
        let min = records.iter().map(|r| r.popularity).min()?;
        let max = records.iter().map(|r| r.popularity).max()?;
        Some(PopularityRange { min, max })
    }
}

/// Linear map from a popularity range onto a visual size range.
#[derive(Debug, Clone, Copy)]
pub struct SizeScale {
    source: PopularityRange,
    min_t: f64,
    max_t: f64,
}

impl SizeScale {
    pub fn new(source: PopularityRange, (min_t, max_t): (f64, f64), policy: DegenerateRangePolicy) -> Result<Self> {
        if source.max == source.min && policy == DegenerateRangePolicy::Reject {
            return Err(AtlasError::DegenerateRange { count: source.min });
        }
        Ok(SizeScale { source, min_t, max_t })
    }

    pub fn size(&self, count: u64) -> f64 {
        let PopularityRange { min, max } = self.source;
        if max == min {
            return self.min_t;
        }
        if count == max {
            return self.max_t;
        }
        let span = (max - min) as f64;
        (count as f64 - min as f64) / span * (self.max_t - self.min_t) + self.min_t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scale(min: u64, max: u64) -> SizeScale {
        SizeScale::new(
            PopularityRange { min, max },
            (DEFAULT_MIN_SIZE, DEFAULT_MAX_SIZE),
            DegenerateRangePolicy::Reject,
        )
        .unwrap()
    }

    #[test]
    fn boundaries_are_exact() {
        let s = scale(10, 100);
        assert_eq!(s.size(10), 10.0);
        assert_eq!(s.size(100), 200.0);

        let s = scale(3, 1_234_567);
        assert_eq!(s.size(3), 10.0);
        assert_eq!(s.size(1_234_567), 200.0);
    }

    #[test]
    fn midpoint() {
        let s = scale(0, 100);
        assert!((s.size(50) - 105.0).abs() < 1e-9);
    }

    #[test]
    fn monotonic() {
        let s = scale(7, 9_001);
        let sizes: Vec<f64> = (7..=9_001).step_by(13).map(|c| s.size(c)).collect();
        assert!(sizes.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn scan_ignores_row_order() {
        let records = vec![
            NodeRecord::new("b", "B", 50),
            NodeRecord::new("a", "A", 100),
            NodeRecord::new("c", "C", 10),
        ];
        assert_eq!(PopularityRange::scan(&records), Some(PopularityRange { min: 10, max: 100 }));
        assert_eq!(PopularityRange::scan(&[]), None);
    }

    #[test]
    fn degenerate_range_rejected_or_collapsed() {
        let range = PopularityRange { min: 5, max: 5 };
        let err = SizeScale::new(range, (10.0, 200.0), DegenerateRangePolicy::Reject).unwrap_err();
        assert!(matches!(err, AtlasError::DegenerateRange { count: 5 }));

        let s = SizeScale::new(range, (10.0, 200.0), DegenerateRangePolicy::Collapse).unwrap();
        assert_eq!(s.size(5), 10.0);
    }
}
