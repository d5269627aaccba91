//! # Barometric Tide-Rise Estimator
//!
//! Low atmospheric pressure lets the sea surface bulge upward (the
//! "inverse barometer" effect). This module models that rise with a single
//! linear fit derived from the table below:
//!
//! | Rise (in) | Pressure (hPa) |
//! |-----------|----------------|
//! | 0         | 1013.003       |
//! | 1         | 1010.463       |
//! | 2         | 1007.923       |
//! | ...       | ...            |
//! | 16        | 972.3631       |
//!
//! The fit gives a slope of −0.3937 inches per hPa. The model only predicts
//! rise below the reference pressure; it never predicts a fall under high
//! pressure, so the estimate is absent there and charts fall back to the
//! plain prediction.

/// Reference (standard sea-level) pressure in hPa.
pub const REFERENCE_PRESSURE_HPA: f64 = 1013.003;

/// Inches of tide rise per hPa of pressure change.
pub const SLOPE_IN_PER_HPA: f64 = -0.3937;

const INCHES_PER_FOOT: f64 = 12.0;

/// Estimated additional tide height in feet caused by low pressure.
///
/// Returns `None` when `pressure` is absent, NaN, or at/above
/// [`REFERENCE_PRESSURE_HPA`].
///
/// # Example
/// ```
/// use tide_dash_lib::pressure::estimate_rise;
///
/// assert!(estimate_rise(Some(1000.0)).unwrap() > 0.0);
/// assert!(estimate_rise(Some(1013.003)).is_none());
/// assert!(estimate_rise(None).is_none());
/// ```
pub fn estimate_rise(pressure: Option<f64>) -> Option<f64> {
    let pressure = pressure?;
    if pressure.is_nan() || pressure >= REFERENCE_PRESSURE_HPA {
        return None;
    }
    Some(SLOPE_IN_PER_HPA * (pressure - REFERENCE_PRESSURE_HPA) / INCHES_PER_FOOT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_rise_at_or_above_reference() {
        for p in [1013.003, 1013.004, 1020.0, 1050.0, f64::MAX] {
            assert!(estimate_rise(Some(p)).is_none(), "pressure {p} should give no rise");
        }
    }

    #[test]
    fn test_positive_rise_below_reference() {
        for p in [1013.0029, 1010.0, 990.0, 950.0, 0.0, f64::MIN] {
            let rise = estimate_rise(Some(p)).expect("low pressure should give a rise");
            assert!(rise > 0.0, "pressure {p} gave rise {rise}");
        }
    }

    #[test]
    fn test_absent_pressure() {
        assert!(estimate_rise(None).is_none());
        assert!(estimate_rise(Some(f64::NAN)).is_none());
    }

    #[test]
    fn test_one_inch_per_table_step() {
        // 1010.463 hPa is the one-inch row of the fit table
        let rise = estimate_rise(Some(1010.463)).unwrap();
        assert!((rise * 12.0 - 1.0).abs() < 0.01, "got {} inches", rise * 12.0);
    }

    #[test]
    fn test_known_value() {
        let rise = estimate_rise(Some(1008.0)).unwrap();
        assert!((rise - 0.16414).abs() < 1e-4, "got {rise}");
    }
}
