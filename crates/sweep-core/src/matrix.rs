//! Scenario × location matrices and percent difference against the baseline.
use serde::{Deserialize, Serialize};

use crate::error::{Result, SweepError};
use crate::metrics::{MetricGrid, MetricKind, MetricSet};

/// Rows are scenarios, columns locations; every cell is populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultMatrix {
    pub rows: Vec<String>,
    pub columns: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

/// Same shape as [`ResultMatrix`] minus the baseline row; values in percent.
pub type PercentDifferenceMatrix = ResultMatrix;

impl ResultMatrix {
    pub fn get(&self, row: &str, column: &str) -> Option<f64> {
        let r = self.rows.iter().position(|x| x == row)?;
        let c = self.columns.iter().position(|x| x == column)?;
        self.values.get(r)?.get(c).copied()
    }
}

/// Pivot a metric grid into `scenario_order` × `location_order`.
///
/// Fails with `MissingCell` for the first (location, scenario) pair that has
/// no value, including names the grid has never seen.
pub fn build_matrix(grid: &MetricGrid, scenario_order: &[String], location_order: &[String]) -> Result<ResultMatrix> {
    let mut values = Vec::with_capacity(scenario_order.len());
    for scenario in scenario_order {
        let mut row = Vec::with_capacity(location_order.len());
        for location in location_order {
            let value = grid.get(location, scenario).ok_or_else(|| SweepError::MissingCell {
                location: location.clone(),
                scenario: scenario.clone(),
            })?;
            row.push(value);
        }
        values.push(row);
    }
    Ok(ResultMatrix {
        rows: scenario_order.to_vec(),
        columns: location_order.to_vec(),
        values,
    })
}

/// `(row - baseline) / baseline × 100` for every non-baseline row, where the
/// baseline is row 0. Any zero in the baseline aborts the whole computation.
pub fn percent_difference(matrix: &ResultMatrix) -> Result<PercentDifferenceMatrix> {
    let Some((baseline, rest)) = matrix.values.split_first() else {
        return Err(SweepError::Validation("matrix has no baseline row".to_string()));
    };
    if let Some(c) = baseline.iter().position(|&b| b == 0.0) {
        return Err(SweepError::DivideByZero {
            column: matrix.columns.get(c).cloned().unwrap_or_else(|| format!("#{c}")),
        });
    }

    let values: Vec<Vec<f64>> = rest
        .iter()
        .map(|row| {
            row.iter()
                .zip(baseline)
                .map(|(&v, &b)| (v - b) / b * 100.0)
                .collect::<Vec<f64>>()
        })
        .collect();

    Ok(ResultMatrix {
        rows: matrix.rows[1..].to_vec(),
        columns: matrix.columns.clone(),
        values,
    })
}

/// Raw matrix and baseline comparison for one metric kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricReport {
    pub kind: MetricKind,
    pub matrix: ResultMatrix,
    pub percent_difference: PercentDifferenceMatrix,
}

pub fn metric_report(grid: &MetricGrid, scenario_order: &[String], location_order: &[String]) -> Result<MetricReport> {
    let matrix = build_matrix(grid, scenario_order, location_order)?;
    let percent_difference = percent_difference(&matrix)?;
    Ok(MetricReport {
        kind: grid.kind,
        matrix,
        percent_difference,
    })
}

/// Reports for every metric kind, each in its grid's declared orders.
/// Fails on the first incomplete grid or zero baseline; nothing partial is returned.
pub fn report_all(set: &MetricSet) -> Result<Vec<MetricReport>> {
    set.grids
        .iter()
        .map(|grid| metric_report(grid, &grid.scenarios, &grid.locations))
        .collect()
}
