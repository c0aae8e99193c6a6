//! Line codec for the daemon's text protocol.
//!
//! Every request is a single line. A response is a run of `key: value` lines
//! closed by `OK`, or a single `ACK [code@index] {command} message` line.

use crate::error::{MpcError, MpcResult};
use std::str::FromStr;

/// First line sent by the daemon after accepting a connection.
pub const GREETING_PREFIX: &str = "OK MPD ";

/// ACK code for a rejected password.
pub const ACK_ERROR_PASSWORD: u32 = 3;

/// One parsed response line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line<'a> {
    Pair(&'a str, &'a str),
    Ok,
    Ack(Ack),
}

/// Error response for a failed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    pub code: u32,
    pub index: u32,
    pub command: String,
    pub message: String,
}

impl From<Ack> for MpcError {
    fn from(ack: Ack) -> Self {
        MpcError::Ack {
            code: ack.code,
            index: ack.index,
            command: ack.command,
            message: ack.message,
        }
    }
}

pub fn parse_line(line: &str) -> MpcResult<Line<'_>> {
    if line == "OK" {
        return Ok(Line::Ok);
    }
    if line.starts_with("ACK ") {
        return parse_ack(line)
            .map(Line::Ack)
            .ok_or_else(|| MpcError::Protocol(format!("malformed ACK line: {line}")));
    }
    line.split_once(": ")
        .map(|(key, value)| Line::Pair(key, value))
        .ok_or_else(|| MpcError::Protocol(format!("unexpected response line: {line}")))
}

fn parse_ack(line: &str) -> Option<Ack> {
    let rest = line.strip_prefix("ACK [")?;
    let (position, rest) = rest.split_once("] {")?;
    let (code, index) = position.split_once('@')?;
    let (command, message) = rest.split_once('}')?;
    Some(Ack {
        code: code.parse().ok()?,
        index: index.parse().ok()?,
        command: command.to_owned(),
        message: message.trim_start().to_owned(),
    })
}

/// Quote a command argument, escaping backslashes and double quotes.
pub fn quote(arg: &str) -> String {
    let mut quoted = String::with_capacity(arg.len() + 2);
    quoted.push('"');
    for c in arg.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

pub fn command_line(command: &str, args: &[&str]) -> String {
    let mut line = command.to_owned();
    for arg in args {
        line.push(' ');
        line.push_str(&quote(arg));
    }
    line
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayState {
    Play,
    Pause,
    Stop,
    Unknown(String),
}

impl From<&str> for PlayState {
    fn from(value: &str) -> Self {
        match value {
            "play" => PlayState::Play,
            "pause" => PlayState::Pause,
            "stop" => PlayState::Stop,
            other => PlayState::Unknown(other.to_owned()),
        }
    }
}

/// The parts of `status` the tracker looks at.
#[derive(Debug, Clone, PartialEq)]
pub struct Status {
    pub state: PlayState,
    pub song_id: Option<String>,
    /// `(elapsed, total)` in whole seconds.
    pub time: Option<(u64, u64)>,
    pub elapsed: Option<f64>,
    pub duration: Option<f64>,
    pub consume: bool,
    pub random: bool,
}

impl Status {
    pub fn from_pairs(pairs: &[(String, String)]) -> MpcResult<Self> {
        let mut status = Status {
            state: PlayState::Stop,
            song_id: None,
            time: None,
            elapsed: None,
            duration: None,
            consume: false,
            random: false,
        };
        let mut saw_state = false;
        for (key, value) in pairs {
            match key.as_str() {
                "state" => {
                    status.state = PlayState::from(value.as_str());
                    saw_state = true;
                }
                "songid" => status.song_id = Some(value.clone()),
                "time" => status.time = Some(parse_time(value)?),
                "elapsed" => status.elapsed = value.parse().ok(),
                "duration" => status.duration = value.parse().ok(),
                "consume" => status.consume = value == "1",
                "random" => status.random = value == "1",
                _ => {}
            }
        }
        if !saw_state {
            return Err(MpcError::Protocol("status response without state".into()));
        }
        Ok(status)
    }

    /// Seconds left in the current song. Prefers the integer `time` pair and
    /// falls back to `duration - elapsed`.
    pub fn remaining_seconds(&self) -> Option<f64> {
        if let Some((elapsed, total)) = self.time {
            return Some(total as f64 - elapsed as f64);
        }
        match (self.elapsed, self.duration) {
            (Some(elapsed), Some(duration)) => Some(duration - elapsed),
            _ => None,
        }
    }
}

fn parse_time(value: &str) -> MpcResult<(u64, u64)> {
    let parsed = value
        .split_once(':')
        .and_then(|(elapsed, total)| Some((elapsed.parse().ok()?, total.parse().ok()?)));
    parsed.ok_or_else(|| MpcError::Protocol(format!("malformed time value: {value}")))
}

/// One song in the current queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub id: String,
    pub pos: Option<u32>,
    /// Path relative to the daemon's music directory, or a stream URL.
    pub file: String,
}

/// Split a `playlistinfo` response into entries; each starts at a `file` key.
pub fn parse_queue(pairs: &[(String, String)]) -> MpcResult<Vec<QueueEntry>> {
    let mut entries: Vec<QueueEntry> = Vec::new();
    let mut ids: Vec<Option<String>> = Vec::new();
    for (key, value) in pairs {
        match key.as_str() {
            "file" => {
                entries.push(QueueEntry {
                    id: String::new(),
                    pos: None,
                    file: value.clone(),
                });
                ids.push(None);
            }
            "Id" => {
                if let Some(id) = ids.last_mut() {
                    *id = Some(value.clone());
                }
            }
            "Pos" => {
                if let Some(entry) = entries.last_mut() {
                    entry.pos = value.parse().ok();
                }
            }
            _ => {}
        }
    }
    entries
        .into_iter()
        .zip(ids)
        .map(|(mut entry, id)| {
            entry.id = id.ok_or_else(|| {
                MpcError::Protocol(format!("queue entry {} has no Id", entry.file))
            })?;
            Ok(entry)
        })
        .collect()
}

/// Daemon subsystems reported by `idle`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subsystem {
    Database,
    Update,
    StoredPlaylist,
    Playlist,
    Player,
    Mixer,
    Output,
    Options,
    Partition,
    Sticker,
    Subscription,
    Message,
    Neighbor,
    Mount,
    Other(String),
}

impl FromStr for Subsystem {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "database" => Subsystem::Database,
            "update" => Subsystem::Update,
            "stored_playlist" => Subsystem::StoredPlaylist,
            "playlist" => Subsystem::Playlist,
            "player" => Subsystem::Player,
            "mixer" => Subsystem::Mixer,
            "output" => Subsystem::Output,
            "options" => Subsystem::Options,
            "partition" => Subsystem::Partition,
            "sticker" => Subsystem::Sticker,
            "subscription" => Subsystem::Subscription,
            "message" => Subsystem::Message,
            "neighbor" => Subsystem::Neighbor,
            "mount" => Subsystem::Mount,
            other => Subsystem::Other(other.to_owned()),
        })
    }
}

pub fn parse_changed(pairs: &[(String, String)]) -> Vec<Subsystem> {
    pairs
        .iter()
        .filter(|(key, _)| key == "changed")
        .filter_map(|(_, value)| value.parse().ok())
        .collect()
}
