// Meters <-> pixels conversion parameterized by a garden's scale.
use kurbo::Point;

use crate::error::GardenError;

/// Pixels per meter. Always finite and strictly positive.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct Scale(f64);

impl Scale {
    pub fn new(pixels_per_meter: f64) -> Option<Self> {
        (pixels_per_meter.is_finite() && pixels_per_meter > 0.0).then_some(Self(pixels_per_meter))
    }

    /// Uses `fallback` when the stored value is missing or invalid.
    pub fn or(pixels_per_meter: f64, fallback: Scale) -> Self {
        Self::new(pixels_per_meter).unwrap_or(fallback)
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

impl Default for Scale {
    fn default() -> Self {
        Self(20.0)
    }
}

impl TryFrom<f64> for Scale {
    type Error = GardenError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Scale::new(value).ok_or(GardenError::InvalidScale(value))
    }
}

pub fn meters_to_pixels(meters: f64, scale: Scale) -> f64 {
    meters * scale.0
}

pub fn pixels_to_meters(pixels: f64, scale: Scale) -> f64 {
    pixels / scale.0
}

pub fn position_to_pixels(position: Point, scale: Scale) -> Point {
    Point::new(
        meters_to_pixels(position.x, scale),
        meters_to_pixels(position.y, scale),
    )
}

pub fn position_to_meters(position: Point, scale: Scale) -> Point {
    Point::new(
        pixels_to_meters(position.x, scale),
        pixels_to_meters(position.y, scale),
    )
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn round_trip_is_identity() {
        for s in [0.01, 0.5, 1.0, 7.3, 20.0, 123.456] {
            let scale = Scale::new(s).unwrap();
            for m in [0.0, 0.3, 0.7, 1.0, 12.5, 1_000.0] {
                assert_relative_eq!(
                    pixels_to_meters(meters_to_pixels(m, scale), scale),
                    m,
                    max_relative = 1e-12
                );
            }
        }
    }

    #[test]
    fn scale_rejects_non_positive() {
        assert!(Scale::new(0.0).is_none());
        assert!(Scale::new(-3.0).is_none());
        assert!(Scale::new(f64::NAN).is_none());
        assert!(Scale::new(f64::INFINITY).is_none());
        assert!(matches!(
            Scale::try_from(0.0),
            Err(GardenError::InvalidScale(v)) if v == 0.0
        ));
        assert_eq!(Scale::or(-1.0, Scale::default()).get(), 20.0);
        assert_eq!(Scale::or(8.0, Scale::default()).get(), 8.0);
    }

    #[test]
    fn positions_convert_componentwise() {
        let scale = Scale::new(10.0).unwrap();
        let px = position_to_pixels(Point::new(1.5, 2.0), scale);
        assert_eq!(px, Point::new(15.0, 20.0));
        assert_eq!(position_to_meters(px, scale), Point::new(1.5, 2.0));
    }
}
