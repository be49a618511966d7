//! Regridding a fetched wind series to the render density.

use wind_common::{GeoBounds, GridSize, WindVector};

use crate::sample::build_sample_points;

/// Resample `source` from `source_grid` to `target_grid` without a
/// new fetch.
///
/// Identity when the grids match. Otherwise each target cell maps to
/// the nearest source cell by proportional row/column ratio, carrying
/// that cell's speed and direction, while the output coordinate is
/// recomputed from a fresh lattice over the same bounds at target
/// resolution. This keeps visual point placement independent of the
/// coarser fetch grid.
pub fn resample_by_density(
    source: &[WindVector],
    source_grid: GridSize,
    target_grid: GridSize,
    bounds: &GeoBounds,
) -> Vec<WindVector> {
    if source.is_empty() {
        return Vec::new();
    }

    let source_rows = source_grid.rows.max(1);
    let source_cols = source_grid.cols.max(1);
    let target_rows = target_grid.rows.max(1);
    let target_cols = target_grid.cols.max(1);

    if source_rows == target_rows && source_cols == target_cols {
        return source.to_vec();
    }

    let target_samples = build_sample_points(bounds, target_rows, target_cols);
    let mut result = Vec::with_capacity(target_rows * target_cols);

    for row in 0..target_rows {
        let row_ratio = if target_rows <= 1 {
            0.0
        } else {
            row as f64 / (target_rows - 1) as f64
        };
        let source_row = ((row_ratio * (source_rows - 1) as f64).round() as usize)
            .min(source_rows - 1);

        for col in 0..target_cols {
            let col_ratio = if target_cols <= 1 {
                0.0
            } else {
                col as f64 / (target_cols - 1) as f64
            };
            let source_col = ((col_ratio * (source_cols - 1) as f64).round() as usize)
                .min(source_cols - 1);

            let source_index =
                (source_row * source_cols + source_col).min(source.len() - 1);
            let nearest = source[source_index];
            let coordinate = target_samples[row * target_cols + col];

            result.push(WindVector {
                lat: coordinate.lat,
                lon: coordinate.lon,
                speed: nearest.speed,
                direction: nearest.direction,
            });
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_vectors(bounds: &GeoBounds, grid: GridSize) -> Vec<WindVector> {
        build_sample_points(bounds, grid.rows, grid.cols)
            .into_iter()
            .enumerate()
            .map(|(index, point)| WindVector {
                lat: point.lat,
                lon: point.lon,
                speed: Some(index as f64),
                direction: Some((index * 10) as f64 % 360.0),
            })
            .collect()
    }

    #[test]
    fn identity_when_grids_match() {
        let bounds = GeoBounds::new(-10.0, 10.0, 50.0, 40.0);
        let grid = GridSize::new(3, 4);
        let source = grid_vectors(&bounds, grid);

        let resampled = resample_by_density(&source, grid, grid, &bounds);
        assert_eq!(resampled, source);
    }

    #[test]
    fn upsampling_recomputes_coordinates_from_target_lattice() {
        let bounds = GeoBounds::new(0.0, 10.0, 50.0, 40.0);
        let source_grid = GridSize::new(3, 3);
        let target_grid = GridSize::new(5, 5);
        let source = grid_vectors(&bounds, source_grid);

        let resampled = resample_by_density(&source, source_grid, target_grid, &bounds);
        assert_eq!(resampled.len(), 25);

        let expected = build_sample_points(&bounds, 5, 5);
        for (vector, sample) in resampled.iter().zip(&expected) {
            assert!((vector.lat - sample.lat).abs() < 1e-9);
            assert!((vector.lon - sample.lon).abs() < 1e-9);
        }

        // Corner cells keep the corner source data.
        assert_eq!(resampled[0].speed, source[0].speed);
        assert_eq!(resampled[24].speed, source[8].speed);
    }

    #[test]
    fn downsampling_picks_nearest_source_cell() {
        let bounds = GeoBounds::new(0.0, 10.0, 50.0, 40.0);
        let source_grid = GridSize::new(5, 5);
        let target_grid = GridSize::new(3, 3);
        let source = grid_vectors(&bounds, source_grid);

        let resampled = resample_by_density(&source, source_grid, target_grid, &bounds);
        assert_eq!(resampled.len(), 9);

        // Center of a 3x3 target maps to the center of the 5x5 source.
        assert_eq!(resampled[4].speed, source[12].speed);
    }

    #[test]
    fn carries_missing_values_through() {
        let bounds = GeoBounds::new(0.0, 10.0, 50.0, 40.0);
        let source_grid = GridSize::new(2, 2);
        let mut source = grid_vectors(&bounds, source_grid);
        source[0].speed = None;
        source[0].direction = None;

        let resampled = resample_by_density(&source, source_grid, GridSize::new(3, 3), &bounds);
        assert_eq!(resampled[0].speed, None);
        assert_eq!(resampled[0].direction, None);
    }
}
