//! Wind arrow rendering.
//!
//! Arrows point in the direction the wind blows *toward* (push
//! direction), centered on each vector's projected screen position.
//! On a tilted or rotated live map, flat trigonometry would disagree
//! with the basemap, so the screen direction is instead recovered by
//! projecting a short great-circle probe downwind and normalizing the
//! resulting screen offset.

use wind_common::WindVector;
use wind_geo::mercator;
use wind_geo::{GeoContext, Projector, ScreenPoint};

use crate::surface::{Color, PixelSurface};

/// Pixel slack around the clip rect; arrows whose center is just
/// offscreen still contribute visible head or tail pixels.
const CLIP_MARGIN: f64 = 26.0;

const ARROW_ALPHA: f64 = 0.95;
const OUTLINE: Color = Color::with_alpha(2, 6, 23, 0.8);
const OUTER_SHAFT_WIDTH: f64 = 4.8;
const INNER_SHAFT_WIDTH: f64 = 2.8;

/// Shaft color by speed band (km/h).
pub fn wind_color(speed_kmh: f64) -> Color {
    if speed_kmh >= 30.0 {
        Color::opaque(0xf8, 0x71, 0x71)
    } else if speed_kmh >= 20.0 {
        Color::opaque(0xf5, 0x9e, 0x0b)
    } else if speed_kmh >= 10.0 {
        Color::opaque(0x34, 0xd3, 0x99)
    } else {
        Color::opaque(0x38, 0xbd, 0xf8)
    }
}

/// Probe distance for direction correction, scaled with speed so
/// faster winds use a longer (more stable) baseline.
fn probe_distance_meters(speed_kmh: f64) -> f64 {
    let speed = if speed_kmh.is_finite() { speed_kmh } else { 0.0 };
    (760.0 + speed.min(55.0) * 8.0).clamp(600.0, 1200.0)
}

/// Screen-space unit vector of the wind's push direction, recovered
/// through the live projection. `None` falls back to flat trig.
fn projected_wind_unit(
    vector: &WindVector,
    base: ScreenPoint,
    projector: &dyn Projector,
) -> Option<(f64, f64)> {
    let direction = vector.direction?;
    let push_bearing = direction + 180.0;
    let distance = probe_distance_meters(vector.speed.unwrap_or(0.0));
    let (probe_lat, probe_lon) =
        mercator::destination_point(vector.lat, vector.lon, push_bearing, distance);

    let probe = projector.project(probe_lon, probe_lat)?;
    let dx = probe.x - base.x;
    let dy = probe.y - base.y;
    let length = dx.hypot(dy);
    if !length.is_finite() || length < 0.001 {
        return None;
    }
    Some((dx / length, dy / length))
}

/// Draw all resolvable vectors onto `surface`, clipped to the
/// context's viewport rect. Vectors with missing speed or direction,
/// unprojectable positions, or positions outside the clip margin are
/// skipped.
pub fn draw_vectors(surface: &mut PixelSurface, vectors: &[WindVector], context: &GeoContext) {
    surface.clear();

    let clip = context.clip;
    if clip.width < 1.0 || clip.height < 1.0 {
        return;
    }
    surface.set_clip(clip.left, clip.top, clip.right(), clip.bottom());

    let correct_direction = context.needs_projected_direction();

    for vector in vectors {
        let (speed, direction) = match (vector.speed, vector.direction) {
            (Some(speed), Some(direction)) if speed.is_finite() && direction.is_finite() => {
                (speed, direction)
            }
            _ => continue,
        };

        let point = match context.projector.project(vector.lon, vector.lat) {
            Some(point) => point,
            None => continue,
        };
        if !clip.contains_with_margin(point, CLIP_MARGIN) {
            continue;
        }

        let unit = if correct_direction {
            projected_wind_unit(vector, point, context.projector.as_ref())
        } else {
            None
        };
        draw_arrow(surface, point.x, point.y, direction, speed, unit);
    }

    surface.clear_clip();
}

/// One arrow: outlined shaft plus a two-layer head, centered on
/// (x, y). `unit` overrides the screen direction when supplied.
fn draw_arrow(
    surface: &mut PixelSurface,
    x: f64,
    y: f64,
    direction_degrees: f64,
    speed_kmh: f64,
    unit: Option<(f64, f64)>,
) {
    let (ux, uy) = match unit {
        Some((ux, uy)) if ux.is_finite() && uy.is_finite() => (ux, uy),
        _ => {
            let push_angle = (direction_degrees + 180.0).to_radians();
            (push_angle.cos(), push_angle.sin())
        }
    };
    // Perpendicular, for the head's base corners.
    let px = -uy;
    let py = ux;

    let length = 15.0 + speed_kmh.min(52.0) * 0.6;
    let tip_x = x + ux * (length * 0.5);
    let tip_y = y + uy * (length * 0.5);
    let tail_x = x - ux * (length * 0.5);
    let tail_y = y - uy * (length * 0.5);

    let head_length = (length * 0.36).max(8.0);
    let head_half_width = (length * 0.13).max(4.2);
    let head_base_x = tip_x - ux * head_length;
    let head_base_y = tip_y - uy * head_length;

    let color = wind_color(speed_kmh);

    surface.stroke_line(
        tail_x,
        tail_y,
        head_base_x,
        head_base_y,
        OUTER_SHAFT_WIDTH,
        OUTLINE,
        ARROW_ALPHA,
    );
    surface.stroke_line(
        tail_x,
        tail_y,
        head_base_x,
        head_base_y,
        INNER_SHAFT_WIDTH,
        color,
        ARROW_ALPHA,
    );

    surface.fill_triangle(
        (tip_x, tip_y),
        (
            head_base_x + px * head_half_width,
            head_base_y + py * head_half_width,
        ),
        (
            head_base_x - px * head_half_width,
            head_base_y - py * head_half_width,
        ),
        OUTLINE,
        ARROW_ALPHA,
    );

    let inner_head_length = head_length * 0.78;
    let inner_half_width = head_half_width * 0.72;
    let inner_base_x = tip_x - ux * inner_head_length;
    let inner_base_y = tip_y - uy * inner_head_length;
    surface.fill_triangle(
        (tip_x, tip_y),
        (
            inner_base_x + px * inner_half_width,
            inner_base_y + py * inner_half_width,
        ),
        (
            inner_base_x - px * inner_half_width,
            inner_base_y - py * inner_half_width,
        ),
        color,
        ARROW_ALPHA,
    );
}
