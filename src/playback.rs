use std::time::Duration;

use anyhow::Result;

use crate::frame::FrameView;

/// Whether the playback position is advancing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Playing,
    Paused,
}

/// Interface to the playback engine that feeds the decoder.
///
/// The decode loop only requires that each call to `frame` yields one
/// consistent frame for the duration of a sampling pass, and that seeking
/// while paused still refreshes the frame without starting playback.
pub trait PlaybackClock {
    /// Consume `dt` seconds of wall time, scaled by the speed multiplier.
    /// No-op while paused. Errors are per-tick and never fatal to the loop.
    fn advance(&mut self, dt: f64) -> Result<()>;

    /// Borrow the current frame for one sampling pass.
    fn frame(&self) -> FrameView<'_>;

    /// Nominal interval between frames, used to pace the decode loop.
    fn frame_interval(&self) -> Duration;

    /// Current playback position in seconds.
    fn position(&self) -> f64;

    /// Total media duration in seconds.
    fn duration(&self) -> f64;

    fn state(&self) -> TransportState;

    fn set_state(&mut self, state: TransportState);

    /// Jump to `time_sec` (clamped to the media range) and decode exactly one
    /// frame there, even while paused. The transport state is preserved.
    fn seek(&mut self, time_sec: f64) -> Result<()>;

    fn speed(&self) -> f64;

    fn set_speed(&mut self, speed: f64);
}
