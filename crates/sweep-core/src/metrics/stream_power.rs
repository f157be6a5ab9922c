//! Stream power proxy per location.
//!
//! Per face: max|shear| over time × max|velocity| over time. The two maxima
//! may come from different time steps; the product is not a per-step stream
//! power. Location value = largest face value.
use crate::engine::{Channel, TimeSeries};
use crate::error::Result;

use super::{abs_max, check_elements};

pub fn location_stream_power(
    shear: &TimeSeries,
    velocity: &TimeSeries,
    location: &str,
    faces: &[usize],
) -> Result<f64> {
    check_elements(shear, Channel::FaceShearStress, location, faces, "faces")?;
    check_elements(velocity, Channel::FaceVelocity, location, faces, "faces")?;

    Ok(faces
        .iter()
        .map(|&face| abs_max(shear, face) * abs_max(velocity, face))
        .fold(0.0, f64::max))
}
