use std::io::Write;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use serialport::SerialPort;

use crate::protocol::{command_frame, RESET_FRAME};

/// Fixed link speed of the key strip.
pub const BAUD_RATE: u32 = 115_200;

/// Upper bound on one write, so a wedged device cannot stall the decode loop.
const WRITE_TIMEOUT: Duration = Duration::from_millis(20);

enum Link<W> {
    Enabled(W),
    Disabled,
}

/// Serial output to the key strip.
///
/// When the device cannot be opened the output is disabled rather than an
/// error: sampling and tracking carry on, just without transmission.
pub struct StripOutput<W: Write = Box<dyn SerialPort>> {
    link: Link<W>,
    ddebug: bool,
}

impl StripOutput<Box<dyn SerialPort>> {
    /// Open and configure the serial device. Failure is reported once and
    /// yields a disabled output.
    pub fn open(path: &str, debug: bool, ddebug: bool) -> Self {
        let port = match Self::open_port(path) {
            Ok(port) => port,
            Err(e) => {
                eprintln!("✗ Failed to open {}: {} — continuing without output", path, e);
                return Self::disabled(ddebug);
            }
        };

        match Self::enabled(port, ddebug) {
            Ok(output) => {
                if debug {
                    println!("✓ Opened {} @ {} baud", path, BAUD_RATE);
                }
                output
            }
            Err(e) => {
                eprintln!("✗ Reset handshake failed on {}: {} — continuing without output", path, e);
                Self::disabled(ddebug)
            }
        }
    }

    fn open_port(path: &str) -> Result<Box<dyn SerialPort>> {
        let mut port = serialport::new(path, BAUD_RATE)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(WRITE_TIMEOUT)
            .open()
            .context(format!("Failed to open serial port {}", path))?;

        if let Err(e) = port.write_data_terminal_ready(true) {
            eprintln!("Warning: Failed to set DTR on {}: {}", path, e);
        }

        // Allow device to initialize
        thread::sleep(Duration::from_millis(100));

        Ok(port)
    }
}

impl<W: Write> StripOutput<W> {
    /// Wrap an already-open link, announcing it with the reset frame.
    fn enabled(mut writer: W, ddebug: bool) -> std::io::Result<Self> {
        writer.write_all(&RESET_FRAME)?;
        writer.flush()?;
        Ok(StripOutput {
            link: Link::Enabled(writer),
            ddebug,
        })
    }

    fn disabled(ddebug: bool) -> Self {
        StripOutput {
            link: Link::Disabled,
            ddebug,
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self.link, Link::Enabled(_))
    }

    /// Write one 2-byte command frame, best effort. A failed write (including
    /// a short one) is logged and never retried; the link stays open for the
    /// next command.
    pub fn send(&mut self, code: u8, wire_index: u8) {
        let Link::Enabled(writer) = &mut self.link else {
            return;
        };

        let frame = command_frame(code, wire_index);
        if self.ddebug {
            eprintln!("[DEBUG] tx {:02x} {:02x}", frame[0], frame[1]);
        }

        if let Err(e) = writer.write_all(&frame) {
            eprintln!("✗ Serial write failed: {}", e);
        }
    }

    /// Write the reset frame and release the link. Idempotent, so the normal
    /// shutdown path and the `Drop` backstop together still close exactly once.
    pub fn close(&mut self) {
        if let Link::Enabled(mut writer) = std::mem::replace(&mut self.link, Link::Disabled) {
            let _ = writer.write_all(&RESET_FRAME);
            let _ = writer.flush();
        }
    }
}

impl<W: Write> Drop for StripOutput<W> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Writer the tests can still inspect after the output is dropped.
    #[derive(Clone, Default)]
    struct SharedBuf(Rc<RefCell<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_reset_frames_bracket_commands() {
        let buf = SharedBuf::default();
        let mut output = StripOutput::enabled(buf.clone(), false).unwrap();
        output.send(1, 4);
        output.send(6, 0);
        output.close();
        assert_eq!(
            buf.0.borrow().as_slice(),
            &[255, 255, 1, 4, 6, 0, 255, 255]
        );
    }

    #[test]
    fn test_close_is_idempotent() {
        let buf = SharedBuf::default();
        let mut output = StripOutput::enabled(buf.clone(), false).unwrap();
        output.close();
        output.close();
        output.send(3, 3);
        drop(output);
        assert_eq!(buf.0.borrow().as_slice(), &[255, 255, 255, 255]);
    }

    #[test]
    fn test_drop_sends_trailing_reset() {
        let buf = SharedBuf::default();
        {
            let mut output = StripOutput::enabled(buf.clone(), false).unwrap();
            output.send(2, 1);
        }
        assert_eq!(buf.0.borrow().as_slice(), &[255, 255, 2, 1, 255, 255]);
    }

    #[test]
    fn test_missing_device_disables_output() {
        let mut output = StripOutput::open("/dev/nonexistent-key-strip", false, false);
        assert!(!output.is_enabled());
        output.send(1, 0);
        output.close();
    }
}
