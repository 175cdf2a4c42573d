use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::frame::FrameView;
use crate::playback::{PlaybackClock, TransportState};

/// Playback clock over a stream of pre-decoded RGB24 frames.
///
/// Frame `i` lives at byte offset `i * width * height * 3`, so pause, seek
/// and speed changes reduce to offset arithmetic plus one frame read. A
/// trailing partial frame is ignored.
pub struct RawMediaClock<R> {
    reader: R,
    width: usize,
    height: usize,
    fps: f64,
    frame_size: u64,
    frame_count: u64,
    index: u64,
    clock_sec: f64,
    state: TransportState,
    speed: f64,
    buf: Vec<u8>,
}

impl RawMediaClock<File> {
    /// Open a raw RGB24 file, e.g. produced with
    /// `ffmpeg -i in.mp4 -f rawvideo -pix_fmt rgb24 out.rgb`.
    pub fn open(path: &str, width: usize, height: usize, fps: f64) -> Result<Self> {
        let file = File::open(path).context(format!("Failed to open media file {}", path))?;
        Self::new(file, width, height, fps).context(format!("Failed to read media file {}", path))
    }
}

impl<R: Read + Seek> RawMediaClock<R> {
    /// Wrap an already-open frame stream and decode its first frame.
    pub fn new(mut reader: R, width: usize, height: usize, fps: f64) -> Result<Self> {
        let frame_size = (width * height * 3) as u64;
        let len = reader.seek(SeekFrom::End(0))?;
        let frame_count = len / frame_size;
        if frame_count == 0 {
            bail!("media holds no complete {}x{} frame ({} bytes)", width, height, len);
        }

        let mut clock = RawMediaClock {
            reader,
            width,
            height,
            fps,
            frame_size,
            frame_count,
            index: 0,
            clock_sec: 0.0,
            state: TransportState::Playing,
            speed: 1.0,
            buf: vec![0; frame_size as usize],
        };
        clock.load(0)?;
        Ok(clock)
    }

    fn load(&mut self, index: u64) -> Result<()> {
        self.reader.seek(SeekFrom::Start(index * self.frame_size))?;
        self.reader.read_exact(&mut self.buf)?;
        self.index = index;
        Ok(())
    }

    fn frame_at(&self, time_sec: f64) -> u64 {
        ((time_sec * self.fps) as u64).min(self.frame_count - 1)
    }
}

impl<R: Read + Seek> PlaybackClock for RawMediaClock<R> {
    fn advance(&mut self, dt: f64) -> Result<()> {
        if self.state == TransportState::Paused || dt <= 0.0 {
            return Ok(());
        }

        self.clock_sec = (self.clock_sec + dt * self.speed).min(self.duration());
        let target = self.frame_at(self.clock_sec);
        if target != self.index {
            self.load(target)?;
        }

        // Hold the last frame at the end of the stream instead of looping.
        if self.clock_sec >= self.duration() {
            self.state = TransportState::Paused;
        }
        Ok(())
    }

    fn frame(&self) -> FrameView<'_> {
        FrameView::new(&self.buf, self.width, self.height)
    }

    fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.fps)
    }

    fn position(&self) -> f64 {
        self.clock_sec
    }

    fn duration(&self) -> f64 {
        self.frame_count as f64 / self.fps
    }

    fn state(&self) -> TransportState {
        self.state
    }

    fn set_state(&mut self, state: TransportState) {
        self.state = state;
    }

    fn seek(&mut self, time_sec: f64) -> Result<()> {
        self.clock_sec = time_sec.clamp(0.0, self.duration());
        // Always decode the target frame so a paused sampler sees fresh
        // pixels; the transport state is untouched.
        self.load(self.frame_at(self.clock_sec))
    }

    fn speed(&self) -> f64 {
        self.speed
    }

    fn set_speed(&mut self, speed: f64) {
        self.speed = speed;
    }
}
