//! Velocity per location from face-point X/Y components.
//!
//! Per face point: sqrt(max|vx|² + max|vy|²), each maximum taken over the
//! whole series independently. Location value = largest face-point value.
use crate::engine::{Channel, TimeSeries};
use crate::error::Result;

use super::{abs_max, check_elements};

pub fn location_velocity(vx: &TimeSeries, vy: &TimeSeries, location: &str, points: &[usize]) -> Result<f64> {
    check_elements(vx, Channel::NodeXVelocity, location, points, "face points")?;
    check_elements(vy, Channel::NodeYVelocity, location, points, "face points")?;

    Ok(points
        .iter()
        .map(|&p| {
            let (x, y) = (abs_max(vx, p), abs_max(vy, p));
            (x * x + y * y).sqrt()
        })
        .fold(0.0, f64::max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SweepError;
    use approx::assert_relative_eq;

    #[test]
    fn resultant_of_componentwise_maxima() {
        // point 0: max|x| = 3, max|y| = 4 → 5
        // point 1: max|x| = 6, max|y| = 0 → 6
        let vx = TimeSeries::from_rows(vec![vec![-3.0, 1.0], vec![1.0, 6.0]]).unwrap();
        let vy = TimeSeries::from_rows(vec![vec![0.0, 0.0], vec![4.0, 0.0]]).unwrap();

        assert_relative_eq!(location_velocity(&vx, &vy, "bank", &[0]).unwrap(), 5.0);
        assert_relative_eq!(location_velocity(&vx, &vy, "bank", &[0, 1]).unwrap(), 6.0);
    }

    #[test]
    fn maxima_from_different_steps_are_combined() {
        let vx = TimeSeries::from_rows(vec![vec![3.0], vec![0.0]]).unwrap();
        let vy = TimeSeries::from_rows(vec![vec![0.0], vec![4.0]]).unwrap();
        assert_relative_eq!(location_velocity(&vx, &vy, "bank", &[0]).unwrap(), 5.0);
    }

    #[test]
    fn empty_point_set_is_rejected() {
        let ts = TimeSeries::new(1, 1, 0.0);
        let err = location_velocity(&ts, &ts, "bank", &[]).unwrap_err();
        assert!(
            matches!(err, SweepError::EmptyLocation { element_set: "face points", .. }),
            "got {err:?}"
        );
    }
}
