// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::io;

use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::{info, span, warn, Level};

use super::Event;
use crate::notes::MIDDLE_C;

const VOLUME: &str = "volume";
const RANGE: &str = "range";
const PROCESS: &str = "process";
const TEST: &str = "test";
const STATUS: &str = "status";
const QUIT: &str = "quit";

/// A controller that controls an instrument using the keyboard.
pub struct Driver {}

impl Driver {
    pub fn new() -> Driver {
        Driver {}
    }

    /// Reads and dispatches one command. Returns false once input is exhausted.
    fn monitor_io<R, W>(
        events_tx: &Sender<Event>,
        mut reader: R,
        mut writer: W,
    ) -> Result<bool, io::Error>
    where
        R: io::BufRead,
        W: io::Write,
    {
        write!(
            writer,
            "Command ({} <0-100>, {} <base> <min> <max>, {}, {} [note], {}, {}): ",
            VOLUME, RANGE, PROCESS, TEST, STATUS, QUIT,
        )?;
        writer.flush()?;
        let mut input: String = String::default();
        if reader.read_line(&mut input)? == 0 {
            return Ok(false);
        }
        if input.trim().is_empty() {
            return Ok(true);
        }

        match parse_command(&input) {
            Ok(event) => events_tx
                .blocking_send(event)
                .map_err(|e| io::Error::other(e.to_string()))?,
            Err(e) => {
                warn!(input = input.trim(), err = %e, "Unrecognized input");
                writeln!(writer, "{}", e)?;
            }
        }
        Ok(true)
    }
}

impl Default for Driver {
    fn default() -> Self {
        Driver::new()
    }
}

/// Parses one line of keyboard input into an event.
pub fn parse_command(input: &str) -> Result<Event, String> {
    let lowered = input.trim().to_lowercase();
    let mut words = lowered.split_whitespace();
    let command = words.next().unwrap_or_default();
    let args: Vec<&str> = words.collect();

    match (command, args.as_slice()) {
        (VOLUME, [percent]) => percent
            .parse::<f32>()
            .map(Event::Volume)
            .map_err(|_| format!("invalid volume '{}'", percent)),
        (RANGE, [base, min, max]) => Ok(Event::Range {
            base: parse_note(base)?,
            min: parse_note(min)?,
            max: parse_note(max)?,
        }),
        (PROCESS, []) => Ok(Event::Process),
        (TEST, []) => Ok(Event::Test(MIDDLE_C)),
        (TEST, [note]) => Ok(Event::Test(parse_note(note)?)),
        (STATUS, []) => Ok(Event::Status),
        (QUIT, []) | ("exit", []) => Ok(Event::Quit),
        _ => Err(format!("unrecognized command '{}'", input.trim())),
    }
}

fn parse_note(value: &str) -> Result<u8, String> {
    value
        .parse::<u8>()
        .map_err(|_| format!("invalid note '{}'", value))
}

impl super::Driver for Driver {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>> {
        tokio::task::spawn_blocking(move || {
            let span = span!(Level::INFO, "keyboard driver");
            let _enter = span.enter();

            info!("Keyboard driver started.");

            while Self::monitor_io(&events_tx, io::stdin().lock(), io::stdout())? {}

            info!("Keyboard input closed.");
            Ok(())
        })
    }
}

#[cfg(test)]
mod test {
    use std::io::{self, BufReader, BufWriter};

    use tokio::sync::mpsc;

    use super::*;

    fn get_event(event: &str) -> Result<Option<Event>, io::Error> {
        let (sender, mut receiver) = mpsc::channel::<Event>(1);

        let reader = BufReader::new(event.as_bytes());
        let writer = BufWriter::new(Vec::new());
        Driver::monitor_io(&sender, reader, writer)?;

        // Force the sender to close.
        drop(sender);
        Ok(receiver.blocking_recv())
    }

    #[test]
    fn test_keyboard_events() -> Result<(), io::Error> {
        assert_eq!(Some(Event::Volume(75.0)), get_event("volume 75\n")?);
        assert_eq!(
            Some(Event::Range {
                base: 60,
                min: 36,
                max: 84
            }),
            get_event("range 60 36 84")?
        );
        assert_eq!(Some(Event::Process), get_event("PROCESS")?);
        assert_eq!(Some(Event::Test(60)), get_event("test")?);
        assert_eq!(Some(Event::Test(72)), get_event("test 72")?);
        assert_eq!(Some(Event::Status), get_event(" status ")?);
        assert_eq!(Some(Event::Quit), get_event("quit")?);
        assert_eq!(None, get_event("unrecognized")?);
        assert_eq!(None, get_event("volume loud")?);
        assert_eq!(None, get_event("range 60 36")?);
        assert_eq!(None, get_event("test 300")?);
        assert_eq!(None, get_event("")?);
        Ok(())
    }

    #[test]
    fn test_end_of_input() -> Result<(), io::Error> {
        let (sender, _receiver) = mpsc::channel::<Event>(1);
        let more = Driver::monitor_io(&sender, BufReader::new(&b""[..]), io::sink())?;
        assert!(!more);
        Ok(())
    }
}
