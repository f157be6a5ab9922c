//! Location depth: mean over cells of each cell's peak depth.
use crate::engine::{Channel, TimeSeries};
use crate::error::Result;

use super::check_elements;

pub fn location_depth(depth: &TimeSeries, location: &str, cells: &[usize]) -> Result<f64> {
    check_elements(depth, Channel::Depth, location, cells, "cells")?;

    let total: f64 = cells
        .iter()
        .map(|&cell| depth.column(cell).fold(f64::NEG_INFINITY, f64::max))
        .sum();
    Ok(total / cells.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SweepError;
    use approx::assert_relative_eq;

    #[test]
    fn mean_of_cell_maxima() {
        let depth = TimeSeries::from_rows(vec![
            vec![1.0, 4.0, 9.0],
            vec![2.0, 0.5, 9.0],
            vec![0.0, 3.0, 9.0],
        ])
        .unwrap();
        assert_relative_eq!(location_depth(&depth, "loc", &[0, 1]).unwrap(), 3.0);
        assert_relative_eq!(location_depth(&depth, "loc", &[2]).unwrap(), 9.0);
    }

    #[test]
    fn out_of_range_cell_is_rejected() {
        let depth = TimeSeries::new(2, 2, 0.0);
        let err = location_depth(&depth, "loc", &[0, 5]).unwrap_err();
        assert!(
            matches!(err, SweepError::ElementOutOfRange { element: 5, width: 2, .. }),
            "got {err:?}"
        );
    }
}
