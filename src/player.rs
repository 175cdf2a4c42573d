use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::frame::FrameView;
use crate::output::StripOutput;
use crate::playback::{PlaybackClock, TransportState};
use crate::sampler::key_code;
use crate::tracker::CommandTracker;
use crate::transport::TransportCommand;

const REPORT_PERIOD: Duration = Duration::from_secs(5);

/// The decode loop: one sampling pass per frame tick, changes out the wire.
pub struct Player<C: PlaybackClock> {
    clock: C,
    tracker: CommandTracker,
    output: StripOutput,
    offset: usize,
    running: Arc<AtomicBool>,
    debug: bool,
    passes: u64,
    commands_sent: u64,
}

impl<C: PlaybackClock> Player<C> {
    pub fn new(
        clock: C,
        output: StripOutput,
        white_keys: usize,
        offset: usize,
        debug: bool,
    ) -> Self {
        Player {
            clock,
            tracker: CommandTracker::new(white_keys),
            output,
            offset,
            running: Arc::new(AtomicBool::new(true)),
            debug,
            passes: 0,
            commands_sent: 0,
        }
    }

    /// Get a clone of the running flag for signal handlers
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Run until the running flag clears. Each iteration drains pending
    /// transport commands, advances the clock by the measured wall time, runs
    /// one sampling pass, and paces itself to the media frame interval.
    pub fn run(&mut self, commands: &Receiver<TransportCommand>) {
        let tick = self.clock.frame_interval();
        let mut last = Instant::now();
        let mut report_start = Instant::now();
        let mut report_passes = 0u64;
        let mut report_commands = 0u64;

        while self.running.load(Ordering::Relaxed) {
            while let Ok(command) = commands.try_recv() {
                self.apply(command);
            }

            let now = Instant::now();
            let dt = now.duration_since(last).as_secs_f64();
            last = now;

            if let Err(e) = self.clock.advance(dt) {
                eprintln!("✗ Media read failed: {}", e);
            }

            let sent = self.decode_pass();
            self.passes += 1;
            self.commands_sent += sent;
            report_passes += 1;
            report_commands += sent;

            if self.debug && report_start.elapsed() >= REPORT_PERIOD {
                let secs = report_start.elapsed().as_secs_f64();
                println!(
                    "[Stats] {:.1} passes/s, {} commands, position {:.1}/{:.1}s",
                    report_passes as f64 / secs,
                    report_commands,
                    self.clock.position(),
                    self.clock.duration()
                );
                report_start = Instant::now();
                report_passes = 0;
                report_commands = 0;
            }

            let elapsed = now.elapsed();
            if elapsed < tick {
                thread::sleep(tick - elapsed);
            }
        }
    }

    fn apply(&mut self, command: TransportCommand) {
        match command {
            TransportCommand::TogglePause => {
                let state = match self.clock.state() {
                    TransportState::Playing => TransportState::Paused,
                    TransportState::Paused => TransportState::Playing,
                };
                self.clock.set_state(state);
                if self.debug {
                    println!("✓ {:?} at {:.1}s", state, self.clock.position());
                }
            }
            TransportCommand::SeekBy(delta) => self.seek(self.clock.position() + delta),
            TransportCommand::SeekTo(time_sec) => self.seek(time_sec),
            TransportCommand::SetSpeed(speed) => self.clock.set_speed(speed),
            TransportCommand::ToggleHalfSpeed => {
                let speed = if self.clock.speed() < 1.0 { 1.0 } else { 0.5 };
                self.clock.set_speed(speed);
            }
            TransportCommand::ToggleDoubleSpeed => {
                let speed = if self.clock.speed() > 1.0 { 1.0 } else { 2.0 };
                self.clock.set_speed(speed);
            }
            TransportCommand::Quit => self.running.store(false, Ordering::Relaxed),
        }
    }

    fn seek(&mut self, time_sec: f64) {
        if let Err(e) = self.clock.seek(time_sec) {
            eprintln!("✗ Seek failed: {}", e);
        }
    }

    /// One sampling pass over the current frame. Returns how many command
    /// frames went out.
    fn decode_pass(&mut self) -> u64 {
        let frame = self.clock.frame();
        let changes = collect_changes(&frame, &mut self.tracker, self.offset);
        drop(frame);

        for (code, wire_index) in &changes {
            self.output.send(*code, *wire_index);
        }
        changes.len() as u64
    }

    /// Final report and serial teardown. The output close is idempotent, so
    /// the `Drop` backstop stays safe if shutdown already ran.
    pub fn shutdown(&mut self) {
        if self.debug {
            println!(
                "✓ Stopped after {} passes, {} commands",
                self.passes, self.commands_sent
            );
        }
        self.output.close();
    }
}

/// Scan keys `[offset, total)` in increasing order and record every code
/// transition in the tracker. Returns the `(code, wire_index)` pairs to
/// transmit, in scan order — the wire order downstream hardware relies on.
pub fn collect_changes(
    frame: &FrameView,
    tracker: &mut CommandTracker,
    offset: usize,
) -> Vec<(u8, u8)> {
    let total = tracker.len();
    let mut changes = Vec::new();
    for key in offset..total {
        let code = key_code(frame, key, total);
        if tracker.update(key, code) {
            changes.push((code, (key - offset) as u8));
        }
    }
    changes
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 100x100 black frame with green sample-A pixels for the given keys
    /// (10-key layout).
    fn frame_data(lit_keys: &[usize]) -> Vec<u8> {
        let mut data = vec![0u8; 100 * 100 * 3];
        for &key in lit_keys {
            let x = key * 10 + 5;
            let base = (90 * 100 + x) * 3;
            data[base + 1] = 255;
        }
        data
    }

    #[test]
    fn test_change_detected_and_offset_applied() {
        let data = frame_data(&[4]);
        let frame = FrameView::new(&data, 100, 100);
        let mut tracker = CommandTracker::new(10);

        let changes = collect_changes(&frame, &mut tracker, 1);
        assert_eq!(changes, vec![(1, 3)]);
    }

    #[test]
    fn test_keys_below_offset_never_emit() {
        let data = frame_data(&[0, 1, 2, 5]);
        let frame = FrameView::new(&data, 100, 100);
        let mut tracker = CommandTracker::new(10);

        let changes = collect_changes(&frame, &mut tracker, 3);
        assert_eq!(changes, vec![(1, 2)]);
        assert_eq!(tracker.code(0), 0);
    }

    #[test]
    fn test_unchanged_frame_emits_nothing() {
        let data = frame_data(&[2, 7]);
        let frame = FrameView::new(&data, 100, 100);
        let mut tracker = CommandTracker::new(10);

        assert_eq!(collect_changes(&frame, &mut tracker, 0).len(), 2);
        assert_eq!(collect_changes(&frame, &mut tracker, 0), vec![]);
    }

    #[test]
    fn test_changes_emitted_in_key_order() {
        let data = frame_data(&[7, 2, 9]);
        let frame = FrameView::new(&data, 100, 100);
        let mut tracker = CommandTracker::new(10);

        let changes = collect_changes(&frame, &mut tracker, 0);
        assert_eq!(changes, vec![(1, 2), (1, 7), (1, 9)]);
    }

    #[test]
    fn test_release_emits_zero_code() {
        let lit = frame_data(&[4]);
        let dark = frame_data(&[]);
        let mut tracker = CommandTracker::new(10);

        collect_changes(&FrameView::new(&lit, 100, 100), &mut tracker, 0);
        let changes = collect_changes(&FrameView::new(&dark, 100, 100), &mut tracker, 0);
        assert_eq!(changes, vec![(0, 4)]);
    }
}
