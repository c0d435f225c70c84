/// Signed smallest angle from `set_point` to `heading`, in (-180, 180].
pub fn heading_error(heading: f64, set_point: f64) -> f64 {
    normalize(heading - set_point)
}

/// Folds a difference of two [0,360) angles into (-180, 180].
pub fn normalize(angle: f64) -> f64 {
    let mut a = angle;
    if a > 180.0 {
        a -= 360.0;
    }
    if a <= -180.0 {
        a += 360.0;
    }
    a
}

/// |error| within `bound` (inclusive).
pub fn within_bound(bound: f64, error: f64) -> bool {
    -bound <= error && error <= bound
}
