//! Great-circle distance between restaurant and delivery coordinates.

use crate::config::EARTH_RADIUS_MILES;
use polars::prelude::*;

/// Haversine distance in miles between two latitude/longitude points given in
/// degrees, on a sphere of radius [`EARTH_RADIUS_MILES`].
///
/// ```rust,ignore
/// let d = haversine_miles(40.7128, -74.0060, 34.0522, -118.2437);
/// assert!((d - 2445.0).abs() < 10.0);
/// ```
#[inline]
pub fn haversine_miles(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    haversine_miles_with_radius(lat1, lon1, lat2, lon2, EARTH_RADIUS_MILES)
}

/// Haversine distance on a sphere of the given radius.
///
/// Non-finite inputs propagate as NaN.
#[inline]
pub fn haversine_miles_with_radius(lat1: f64, lon1: f64, lat2: f64, lon2: f64, radius: f64) -> f64 {
    let (lat1, lon1, lat2, lon2) = (
        lat1.to_radians(),
        lon1.to_radians(),
        lat2.to_radians(),
        lon2.to_radians(),
    );
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    // rounding can push `a` a hair above 1 for antipodal points
    2.0 * radius * a.clamp(0.0, 1.0).sqrt().asin()
}

/// Haversine distance over four coordinate series, computed column-wise.
///
/// The inputs are cast to `Float64` (strictly, so text that is not a number is
/// an error). A null in any of the four inputs yields a null distance.
pub fn haversine_series(
    name: &str,
    restaurant_lat: &Series,
    restaurant_lon: &Series,
    delivery_lat: &Series,
    delivery_lon: &Series,
    radius: f64,
) -> PolarsResult<Series> {
    let len = restaurant_lat.len();
    if [restaurant_lon, delivery_lat, delivery_lon].iter().any(|s| s.len() != len) {
        return Err(PolarsError::ShapeMismatch(
            "coordinate series must have equal lengths".into(),
        ));
    }

    let lat1 = radians(restaurant_lat)?;
    let lon1 = radians(restaurant_lon)?;
    let lat2 = radians(delivery_lat)?;
    let lon2 = radians(delivery_lon)?;

    let dlat = &lat2 - &lat1;
    let dlon = &lon2 - &lon1;

    let cos_product = &lat1.apply_values(f64::cos) * &lat2.apply_values(f64::cos);
    let a = &half_angle_sin_sq(&dlat) + &(&cos_product * &half_angle_sin_sq(&dlon));

    let distances = a.apply_values(|a| 2.0 * radius * a.clamp(0.0, 1.0).sqrt().asin());
    Ok(distances.with_name(name.into()).into_series())
}

fn radians(degrees: &Series) -> PolarsResult<Float64Chunked> {
    Ok(degrees
        .strict_cast(&DataType::Float64)?
        .f64()?
        .apply_values(f64::to_radians))
}

/// `sin²(x / 2)` per value.
fn half_angle_sin_sq(angles: &Float64Chunked) -> Float64Chunked {
    angles.apply_values(|x| (x / 2.0).sin().powi(2))
}
