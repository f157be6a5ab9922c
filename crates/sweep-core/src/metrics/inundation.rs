//! Percent time inundated and inundation duration.
//!
//! A cell is wet at a time step when its depth exceeds `min_depth`. For each
//! cell, n = wet steps and T = total steps:
//!   percent_time = mean over cells of (n / T × 100)
//!   duration     = mean over cells of n, in time steps
//!
//! Duration stays in step units; converting it to physical time needs the
//! run's output interval, which the results store does not carry.
use crate::engine::{Channel, TimeSeries};
use crate::error::Result;

use super::check_elements;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Inundation {
    pub percent_time: f64,
    pub duration_steps: f64,
}

pub fn location_inundation(depth: &TimeSeries, location: &str, cells: &[usize], min_depth: f64) -> Result<Inundation> {
    check_elements(depth, Channel::Depth, location, cells, "cells")?;

    let total_steps = depth.steps as f64;
    let mut fraction_sum = 0.0;
    let mut wet_sum = 0.0;
    for &cell in cells {
        let wet = depth.column(cell).filter(|&d| d > min_depth).count() as f64;
        fraction_sum += wet / total_steps;
        wet_sum += wet;
    }

    let n = cells.len() as f64;
    Ok(Inundation {
        percent_time: fraction_sum / n * 100.0,
        duration_steps: wet_sum / n,
    })
}
