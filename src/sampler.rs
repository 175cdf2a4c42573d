use crate::classify::classify;
use crate::frame::FrameView;

/// Vertical position of the primary sample, as a fraction of frame height.
const SAMPLE_A_HEIGHT: f64 = 0.9;
/// Vertical position of the secondary sample.
const SAMPLE_B_HEIGHT: f64 = 0.8;

/// The two pixel coordinates sampled for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplePoints {
    pub a: (usize, usize),
    pub b: (usize, usize),
}

/// Compute the sample coordinates for `key` out of `total` keys.
///
/// Sample A sits at the horizontal center of the key's column at 90% of the
/// frame height; sample B half a key width to the right at 80%. For the last
/// key, B lands past the right edge and is clamped by the pixel accessor.
pub fn sample_points(width: usize, height: usize, key: usize, total: usize) -> SamplePoints {
    let key_width = width as f64 / total as f64;
    let ax = (key as f64 + 0.5) * key_width;
    let bx = ax + key_width * 0.5;
    SamplePoints {
        a: (ax as usize, (height as f64 * SAMPLE_A_HEIGHT) as usize),
        b: (bx as usize, (height as f64 * SAMPLE_B_HEIGHT) as usize),
    }
}

/// Sample both points for `key` and pack the two classifications into one
/// command code: `classify(A) | classify(B) << 2`.
pub fn key_code(frame: &FrameView, key: usize, total: usize) -> u8 {
    let points = sample_points(frame.width(), frame.height(), key, total);
    let a = frame.pixel(points.a.0, points.a.1);
    let b = frame.pixel(points.b.0, points.b.1);
    classify(a) | classify(b) << 2
}
