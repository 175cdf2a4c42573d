use std::io::{self, BufRead};
use std::sync::mpsc::{self, Receiver};
use std::thread;

/// Seek step for the relative left/right commands, in seconds.
const SEEK_STEP: f64 = 5.0;

/// One transport request from the operator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransportCommand {
    TogglePause,
    SeekBy(f64),
    SeekTo(f64),
    SetSpeed(f64),
    ToggleHalfSpeed,
    ToggleDoubleSpeed,
    Quit,
}

/// Parse one stdin line into a transport command. Unrecognized input is
/// ignored so stray terminal noise never disturbs playback.
pub fn parse(line: &str) -> Option<TransportCommand> {
    let mut parts = line.split_whitespace();
    let word = parts.next()?.to_ascii_lowercase();
    let command = match word.as_str() {
        "p" | "pause" | "play" => TransportCommand::TogglePause,
        "left" | "l" => TransportCommand::SeekBy(-SEEK_STEP),
        "right" | "r" => TransportCommand::SeekBy(SEEK_STEP),
        "s" => TransportCommand::ToggleHalfSpeed,
        "f" => TransportCommand::ToggleDoubleSpeed,
        "seek" => TransportCommand::SeekTo(parts.next()?.parse().ok()?),
        "speed" => {
            let speed: f64 = parts.next()?.parse().ok()?;
            if speed <= 0.0 {
                return None;
            }
            TransportCommand::SetSpeed(speed)
        }
        "q" | "quit" | "exit" => TransportCommand::Quit,
        _ => return None,
    };
    Some(command)
}

/// Spawn the stdin reader thread. The decode loop drains the returned
/// channel once per tick; the thread exits when stdin closes, the loop goes
/// away, or the operator quits.
pub fn spawn_stdin_reader() -> Receiver<TransportCommand> {
    let (sender, receiver) = mpsc::channel();

    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if let Some(command) = parse(&line) {
                let quit = command == TransportCommand::Quit;
                if sender.send(command).is_err() || quit {
                    break;
                }
            }
        }
    });

    receiver
}
