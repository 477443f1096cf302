//! Heading arithmetic shared by every moving agent.

use rand::Rng;
use std::f32::consts::{FRAC_PI_2, PI, TAU};

/// Wrap an angle into `(-π, π]`. Non-finite input maps to 0.
pub fn wrap_signed_angle(angle: f32) -> f32 {
    if !angle.is_finite() {
        return 0.0;
    }
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}

/// Damped proportional turn of `heading` toward the direction of `(dx, dy)`.
pub fn steer_towards(heading: f32, dx: f32, dy: f32, gain: f32) -> f32 {
    let diff = wrap_signed_angle(dy.atan2(dx) - heading);
    heading + diff * gain
}

/// Quarter turn plus jitter, used when the look-ahead probe hits something.
pub fn obstacle_turn<R: Rng>(heading: f32, rng: &mut R) -> f32 {
    heading + FRAC_PI_2 + (rng.gen::<f32>() * 0.5 - 0.25)
}

/// Symmetric random heading jitter in `[-amplitude, amplitude)`.
pub fn jitter<R: Rng>(heading: f32, amplitude: f32, rng: &mut R) -> f32 {
    heading + (rng.gen::<f32>() - 0.5) * 2.0 * amplitude
}

/// Clamp a position into `[0, width] × [0, height]`, mirroring the heading on every crossing.
pub fn keep_in_bounds(x: &mut f32, y: &mut f32, heading: &mut f32, width: f32, height: f32) {
    if *x < 0.0 {
        *x = 0.0;
        *heading = PI - *heading;
    }
    if *x > width {
        *x = width;
        *heading = PI - *heading;
    }
    if *y < 0.0 {
        *y = 0.0;
        *heading = -*heading;
    }
    if *y > height {
        *y = height;
        *heading = -*heading;
    }
}
