//! Reconnecting wrapper around a [`Daemon`].

use crate::connection::Daemon;
use crate::error::{MpcError, MpcResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Waker = Box<dyn Fn() + Send>;

/// Shared flag that ends a session's work. Stopping also runs the registered
/// wakers so a thread blocked on the daemon gets released.
#[derive(Clone, Default)]
pub struct StopHandle {
    stopped: Arc<AtomicBool>,
    wakers: Arc<Mutex<Vec<Waker>>>,
}

impl std::fmt::Debug for StopHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StopHandle")
            .field("stopped", &self.is_stopped())
            .finish_non_exhaustive()
    }
}

impl StopHandle {
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        if let Ok(wakers) = self.wakers.lock() {
            for wake in wakers.iter() {
                wake();
            }
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Run `wake` whenever [`stop`](Self::stop) is called.
    pub fn on_stop(&self, wake: impl Fn() + Send + 'static) {
        if let Ok(mut wakers) = self.wakers.lock() {
            wakers.push(Box::new(wake));
        }
    }
}

/// How hard to try before giving up on a lost connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 10,
            interval: Duration::from_secs(5),
        }
    }
}

pub struct Session<D: Daemon> {
    daemon: D,
    password: Option<String>,
    policy: RetryPolicy,
    stop: StopHandle,
}

impl<D: Daemon> Session<D> {
    /// An empty password means no authentication.
    pub fn new(daemon: D, password: Option<String>, policy: RetryPolicy) -> Self {
        Self {
            daemon,
            password: password.filter(|p| !p.is_empty()),
            policy: RetryPolicy {
                attempts: policy.attempts.max(1),
                ..policy
            },
            stop: StopHandle::default(),
        }
    }

    pub fn set_stop_handle(&mut self, stop: StopHandle) {
        self.stop = stop;
    }

    pub fn stop_handle(&self) -> &StopHandle {
        &self.stop
    }

    pub fn daemon(&self) -> &D {
        &self.daemon
    }

    /// Connect and authenticate. A rejected password comes back as
    /// [`MpcError::Authentication`].
    pub fn open(&mut self) -> MpcResult<()> {
        self.daemon.connect()?;
        if let Some(password) = self.password.as_deref() {
            self.daemon.password(password).map_err(|err| match err {
                MpcError::Ack { message, .. } => MpcError::Authentication(message),
                other => other,
            })?;
        }
        match self.daemon.commands() {
            Ok(commands) => tracing::debug!(?commands, "daemon commands"),
            Err(err) if err.is_transport() => return Err(err),
            Err(err) => tracing::debug!(error = %err, "could not list daemon commands"),
        }
        Ok(())
    }

    /// Run `op`, reconnecting after transport errors until the retry policy
    /// is used up. Other errors are returned as they are. A transport error
    /// after the session was stopped is [`MpcError::Stopped`].
    pub fn call<T>(&mut self, mut op: impl FnMut(&mut D) -> MpcResult<T>) -> MpcResult<T> {
        for attempt in 1..=self.policy.attempts {
            match op(&mut self.daemon) {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transport() && self.stop.is_stopped() => {
                    tracing::debug!(error = %err, "connection closed after stop");
                    return Err(MpcError::Stopped);
                }
                Err(err) if err.is_transport() => {
                    tracing::error!(attempt, error = %err, "lost connection to the daemon");
                    std::thread::sleep(self.policy.interval);
                    self.daemon.disconnect();
                    match self.open() {
                        Ok(()) => tracing::info!(attempt, "reconnected to the daemon"),
                        Err(err @ MpcError::Authentication(_)) => return Err(err),
                        Err(err) => tracing::warn!(attempt, error = %err, "reconnect failed"),
                    }
                }
                Err(err) => return Err(err),
            }
        }
        Err(MpcError::RetriesExhausted {
            attempts: self.policy.attempts,
        })
    }

    pub fn close(&mut self) {
        self.daemon.disconnect();
    }
}
