// Scalar and heading helpers shared by ingestion and sampling.

/// Wraps a heading in degrees into `(-180, 180]`.
pub fn normalize_deg(degrees: f64) -> f64 {
    let mut value = degrees % 360.0;
    if value > 180.0 {
        value -= 360.0;
    } else if value <= -180.0 {
        value += 360.0;
    }
    value
}

/// Signed shortest-arc difference `to - from`, in degrees.
pub fn shortest_arc_deg(from: f64, to: f64) -> f64 {
    normalize_deg(to - from)
}

pub fn lerp(start: f64, end: f64, t: f64) -> f64 {
    start + (end - start) * t
}

/// Interpolates along the shorter way around the circle.
pub fn lerp_angle_deg(start: f64, end: f64, t: f64) -> f64 {
    normalize_deg(start + shortest_arc_deg(start, end) * t)
}
