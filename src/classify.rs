use crate::frame::Rgb;

/// Channel intensity cutoff for the tri-state classification.
pub const CHANNEL_THRESHOLD: u8 = 220;

/// Classify one RGB sample into a tri-state class.
///
/// Returns 1 when only the green channel is at or above the threshold,
/// 2 when only the blue channel is, and 0 otherwise. A red channel at or
/// above the threshold always classifies as 0.
pub fn classify(sample: Rgb) -> u8 {
    if sample.r < CHANNEL_THRESHOLD {
        if sample.g >= CHANNEL_THRESHOLD && sample.b < CHANNEL_THRESHOLD {
            return 1;
        }
        if sample.g < CHANNEL_THRESHOLD && sample.b >= CHANNEL_THRESHOLD {
            return 2;
        }
    }
    0
}
