//! Evenly spaced sample lattice over a bounds rectangle.

use wind_common::{GeoBounds, SamplePoint};

/// Build a `rows x cols` lattice of fetch coordinates, row-major.
///
/// Row 0 sits on the northern edge and column 0 on the western edge.
/// A 1-row or 1-column grid interpolates at the midpoint. Bounds with
/// `east < west` (antimeridian wrap) interpolate through 180 and each
/// generated longitude is re-normalized into (-180, 180].
pub fn build_sample_points(bounds: &GeoBounds, rows: usize, cols: usize) -> Vec<SamplePoint> {
    let mut points = Vec::with_capacity(rows * cols);

    let west = bounds.west;
    let east = if bounds.east < bounds.west {
        bounds.east + 360.0
    } else {
        bounds.east
    };

    for row in 0..rows {
        let lat_ratio = if rows == 1 {
            0.5
        } else {
            row as f64 / (rows - 1) as f64
        };
        let lat = bounds.north - (bounds.north - bounds.south) * lat_ratio;

        for col in 0..cols {
            let lon_ratio = if cols == 1 {
                0.5
            } else {
                col as f64 / (cols - 1) as f64
            };
            let mut lon = west + (east - west) * lon_ratio;
            if lon > 180.0 {
                lon -= 360.0;
            }
            points.push(SamplePoint { lat, lon });
        }
    }

    points
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lattice_is_row_major_north_to_south() {
        let bounds = GeoBounds::new(-10.0, 10.0, 50.0, 40.0);
        let points = build_sample_points(&bounds, 9, 11);

        assert_eq!(points.len(), 99);
        let first = points[0];
        assert!((first.lat - 50.0).abs() < 1e-9);
        assert!((first.lon + 10.0).abs() < 1e-9);

        let last = points[98];
        assert!((last.lat - 40.0).abs() < 1e-9);
        assert!((last.lon - 10.0).abs() < 1e-9);

        // Second point advances along the northern row.
        assert!((points[1].lat - 50.0).abs() < 1e-9);
        assert!(points[1].lon > first.lon);
    }

    #[test]
    fn edges_round_trip_the_bounds() {
        let bounds = GeoBounds::new(5.0, 25.0, 60.0, 45.0);
        let points = build_sample_points(&bounds, 4, 5);

        assert!((points[0].lon - bounds.west).abs() < 1e-9);
        assert!((points[4].lon - bounds.east).abs() < 1e-9);
        assert!((points[0].lat - bounds.north).abs() < 1e-9);
        assert!((points[15].lat - bounds.south).abs() < 1e-9);
    }

    #[test]
    fn single_row_and_column_use_midpoint() {
        let bounds = GeoBounds::new(0.0, 10.0, 50.0, 40.0);
        let points = build_sample_points(&bounds, 1, 1);
        assert_eq!(points.len(), 1);
        assert!((points[0].lat - 45.0).abs() < 1e-9);
        assert!((points[0].lon - 5.0).abs() < 1e-9);
    }

    #[test]
    fn antimeridian_interpolation_stays_in_range() {
        let bounds = GeoBounds::new(170.0, -170.0, 50.0, 40.0);
        let points = build_sample_points(&bounds, 3, 5);

        for point in &points {
            assert!(
                point.lon > -180.0 - 1e-9 && point.lon <= 180.0 + 1e-9,
                "longitude out of range: {}",
                point.lon
            );
        }

        // The middle column lands on the antimeridian itself.
        assert!((points[2].lon.abs() - 180.0).abs() < 1e-9);
    }
}
