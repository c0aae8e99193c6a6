//! Blocking connection to the daemon.

use crate::error::{MpcError, MpcResult};
use crate::protocol::{
    command_line, parse_changed, parse_line, parse_queue, Line, QueueEntry, Status, Subsystem,
    GREETING_PREFIX,
};
use playtally_core::redact::redact_secrets;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::{Arc, Mutex};

/// The daemon operations the tracker relies on.
pub trait Daemon {
    fn connect(&mut self) -> MpcResult<()>;

    /// Drop the connection; never fails.
    fn disconnect(&mut self);

    fn password(&mut self, password: &str) -> MpcResult<()>;

    /// Commands the current connection is allowed to run.
    fn commands(&mut self) -> MpcResult<Vec<String>>;

    fn status(&mut self) -> MpcResult<Status>;

    fn playlist_info(&mut self) -> MpcResult<Vec<QueueEntry>>;

    /// Block until something changes and report which subsystems did.
    fn idle(&mut self) -> MpcResult<Vec<Subsystem>>;
}

type Reader = BufReader<Box<dyn Read + Send>>;
type Writer = Box<dyn Write + Send>;

enum Socket {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
}

impl Socket {
    fn try_clone(&self) -> std::io::Result<Socket> {
        match self {
            Socket::Tcp(stream) => stream.try_clone().map(Socket::Tcp),
            #[cfg(unix)]
            Socket::Unix(stream) => stream.try_clone().map(Socket::Unix),
        }
    }

    fn shutdown(&self) -> std::io::Result<()> {
        match self {
            Socket::Tcp(stream) => stream.shutdown(Shutdown::Both),
            #[cfg(unix)]
            Socket::Unix(stream) => stream.shutdown(Shutdown::Both),
        }
    }
}

/// Closes a connection's socket from another thread, so a blocked read
/// fails with [`MpcError::Closed`].
#[derive(Clone, Default)]
pub struct Interrupter(Arc<Mutex<Option<Socket>>>);

impl Interrupter {
    pub fn interrupt(&self) {
        let Ok(socket) = self.0.lock() else { return };
        if let Some(socket) = socket.as_ref() {
            if let Err(err) = socket.shutdown() {
                tracing::debug!(error = %err, "could not shut down daemon socket");
            }
        }
    }

    fn replace(&self, socket: Option<Socket>) {
        if let Ok(mut slot) = self.0.lock() {
            *slot = socket;
        }
    }
}

/// Daemon connection over TCP, or over a Unix socket when the host is an
/// absolute path.
pub struct MpdConnection {
    host: String,
    port: u16,
    reader: Option<Reader>,
    writer: Option<Writer>,
    version: Option<String>,
    interrupter: Interrupter,
}

impl std::fmt::Debug for MpdConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MpdConnection")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("connected", &self.is_connected())
            .field("version", &self.version)
            .finish()
    }
}

impl MpdConnection {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            reader: None,
            writer: None,
            version: None,
            interrupter: Interrupter::default(),
        }
    }

    /// Handle that interrupts whatever socket this connection has open.
    pub fn interrupter(&self) -> Interrupter {
        self.interrupter.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.writer.is_some()
    }

    /// Protocol version announced in the greeting.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    fn open_socket(&self) -> MpcResult<Socket> {
        if self.host.starts_with('/') {
            return open_unix_socket(&self.host);
        }
        let stream = TcpStream::connect((self.host.as_str(), self.port))?;
        stream.set_nodelay(true)?;
        Ok(Socket::Tcp(stream))
    }

    fn read_line(&mut self) -> MpcResult<String> {
        let reader = self.reader.as_mut().ok_or(MpcError::NotConnected)?;
        let mut buf = Vec::new();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Err(MpcError::Closed);
        }
        while matches!(buf.last(), Some(b'\n' | b'\r')) {
            buf.pop();
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Send one command and collect its `key: value` pairs.
    fn execute(&mut self, line: &str) -> MpcResult<Vec<(String, String)>> {
        let result = self.exchange(line);
        if matches!(&result, Err(e) if e.is_transport()) {
            self.disconnect();
        }
        result
    }

    fn exchange(&mut self, line: &str) -> MpcResult<Vec<(String, String)>> {
        tracing::trace!(command = %redact_secrets(line), "sending command");
        let writer = self.writer.as_mut().ok_or(MpcError::NotConnected)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        let mut pairs = Vec::new();
        loop {
            let response = self.read_line()?;
            match parse_line(&response)? {
                Line::Ok => return Ok(pairs),
                Line::Ack(ack) => return Err(ack.into()),
                Line::Pair(key, value) => pairs.push((key.to_owned(), value.to_owned())),
            }
        }
    }
}

fn split(socket: Socket) -> std::io::Result<(Box<dyn Read + Send>, Writer)> {
    match socket {
        Socket::Tcp(stream) => Ok((Box::new(stream.try_clone()?), Box::new(stream))),
        #[cfg(unix)]
        Socket::Unix(stream) => Ok((Box::new(stream.try_clone()?), Box::new(stream))),
    }
}

#[cfg(unix)]
fn open_unix_socket(path: &str) -> MpcResult<Socket> {
    Ok(Socket::Unix(std::os::unix::net::UnixStream::connect(path)?))
}

#[cfg(not(unix))]
fn open_unix_socket(path: &str) -> MpcResult<Socket> {
    Err(MpcError::Protocol(format!(
        "unix sockets are not supported on this platform: {path}"
    )))
}

impl Daemon for MpdConnection {
    fn connect(&mut self) -> MpcResult<()> {
        self.disconnect();
        let socket = self.open_socket()?;
        self.interrupter.replace(Some(socket.try_clone()?));
        let (reader, writer) = split(socket)?;
        self.reader = Some(BufReader::new(reader));
        self.writer = Some(writer);

        let greeting = self.read_line()?;
        match greeting.strip_prefix(GREETING_PREFIX) {
            Some(version) => {
                tracing::debug!(host = %self.host, port = self.port, version, "connected to daemon");
                self.version = Some(version.to_owned());
                Ok(())
            }
            None => {
                self.disconnect();
                Err(MpcError::Protocol(format!("unexpected greeting: {greeting}")))
            }
        }
    }

    fn disconnect(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            let _ = writer.write_all(b"close\n");
            let _ = writer.flush();
        }
        self.reader = None;
        self.version = None;
        self.interrupter.replace(None);
    }

    fn password(&mut self, password: &str) -> MpcResult<()> {
        self.execute(&command_line("password", &[password]))
            .map(|_| ())
    }

    fn commands(&mut self) -> MpcResult<Vec<String>> {
        Ok(self
            .execute("commands")?
            .into_iter()
            .filter(|(key, _)| key == "command")
            .map(|(_, value)| value)
            .collect())
    }

    fn status(&mut self) -> MpcResult<Status> {
        Status::from_pairs(&self.execute("status")?)
    }

    fn playlist_info(&mut self) -> MpcResult<Vec<QueueEntry>> {
        parse_queue(&self.execute("playlistinfo")?)
    }

    fn idle(&mut self) -> MpcResult<Vec<Subsystem>> {
        Ok(parse_changed(&self.execute("idle")?))
    }
}
