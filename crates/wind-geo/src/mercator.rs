//! Web-Mercator world-pixel transforms and great-circle displacement.

use std::f64::consts::PI;

/// Mercator's valid latitude range.
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_78;

/// Pixel size of the zoom-0 world tile.
pub const BASE_TILE_SIZE: f64 = 512.0;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// World size in pixels at the given zoom.
pub fn world_size(zoom: f64) -> f64 {
    BASE_TILE_SIZE * 2f64.powf(zoom)
}

/// Clamp latitude into Mercator's valid range.
pub fn clamp_lat(lat: f64) -> f64 {
    lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT)
}

/// Normalize longitude into [-180, 180).
pub fn normalize_lon(lon: f64) -> f64 {
    let mut value = lon;
    while value < -180.0 {
        value += 360.0;
    }
    while value >= 180.0 {
        value -= 360.0;
    }
    value
}

pub fn lon_to_world_x(lon: f64, world: f64) -> f64 {
    (normalize_lon(lon) + 180.0) / 360.0 * world
}

pub fn lat_to_world_y(lat: f64, world: f64) -> f64 {
    let rad = clamp_lat(lat).to_radians();
    let merc = (PI / 4.0 + rad / 2.0).tan().ln();
    world / 2.0 - world * merc / (2.0 * PI)
}

pub fn world_x_to_lon(x: f64, world: f64) -> f64 {
    normalize_lon(x / world * 360.0 - 180.0)
}

/// Inverse latitude projection via the Gudermannian inverse.
pub fn world_y_to_lat(y: f64, world: f64) -> f64 {
    let n = PI - 2.0 * PI * y / world;
    n.sinh().atan().to_degrees()
}

/// Great-circle destination point from (lat, lon) along a bearing.
pub fn destination_point(lat: f64, lon: f64, bearing_deg: f64, distance_m: f64) -> (f64, f64) {
    let angular = distance_m / EARTH_RADIUS_M;
    let bearing = bearing_deg.to_radians();
    let lat1 = clamp_lat(lat).to_radians();
    let lon1 = normalize_lon(lon).to_radians();

    let (sin_lat1, cos_lat1) = lat1.sin_cos();
    let (sin_angular, cos_angular) = angular.sin_cos();

    let lat2 = (sin_lat1 * cos_angular + cos_lat1 * sin_angular * bearing.cos()).asin();
    let lon2 = lon1
        + (bearing.sin() * sin_angular * cos_lat1).atan2(cos_angular - sin_lat1 * lat2.sin());

    (
        clamp_lat(lat2.to_degrees()),
        normalize_lon(lon2.to_degrees()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn world_transforms_round_trip() {
        let world = world_size(6.0);
        for &(lat, lon) in &[(0.0, 0.0), (47.37, 8.54), (-33.9, 151.2), (60.0, -179.5)] {
            let x = lon_to_world_x(lon, world);
            let y = lat_to_world_y(lat, world);
            assert!((world_x_to_lon(x, world) - lon).abs() < 1e-9);
            assert!((world_y_to_lat(y, world) - lat).abs() < 1e-9);
        }
    }

    #[test]
    fn latitude_is_clamped_to_mercator_range() {
        let world = world_size(3.0);
        assert_eq!(lat_to_world_y(89.0, world), lat_to_world_y(MAX_MERCATOR_LAT, world));
        assert_eq!(lat_to_world_y(-89.0, world), lat_to_world_y(-MAX_MERCATOR_LAT, world));
    }

    #[test]
    fn longitude_normalizes_into_half_open_range() {
        assert_eq!(normalize_lon(180.0), -180.0);
        assert_eq!(normalize_lon(-180.0), -180.0);
        assert!((normalize_lon(190.0) + 170.0).abs() < 1e-9);
        assert!((normalize_lon(-370.0) + 10.0).abs() < 1e-9);
    }

    #[test]
    fn destination_point_moves_north_along_zero_bearing() {
        let (lat, lon) = destination_point(10.0, 20.0, 0.0, 111_195.0);
        assert!((lon - 20.0).abs() < 1e-6);
        assert!((lat - 11.0).abs() < 0.01);
    }

    #[test]
    fn destination_point_wraps_antimeridian() {
        let (_, lon) = destination_point(0.0, 179.9, 90.0, 50_000.0);
        assert!(lon < -179.0, "expected wrap past 180, got {lon}");
    }
}
