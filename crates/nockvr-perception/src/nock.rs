//! Nock confirmation by angular deviation.
//!
//! Nocking rotates the arrow hand against the bow by a repeatable amount, so
//! a nock is confirmed once the bow/hand Euler angles move far enough from
//! the equip-time baseline.

use crate::transform::Vec3;

/// `true` iff `|baseline - sample| > threshold_rad`.
///
/// The boundary is exclusive: a deviation of exactly `threshold_rad` is not
/// a nock.
pub fn is_nocked(baseline: Vec3, sample: Vec3, threshold_rad: f32) -> bool {
    baseline.sub(sample).length() > threshold_rad
}
