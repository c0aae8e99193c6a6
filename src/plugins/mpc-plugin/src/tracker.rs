//! The playback tracker: follows the daemon's player state and turns song
//! changes into play and skip statistics on library items.

use crate::connection::Daemon;
use crate::error::{MpcError, MpcResult};
use crate::protocol::{PlayState, QueueEntry, Status, Subsystem};
use crate::rating::classify;
use crate::session::{Session, StopHandle};
use crate::stats::StatsWriter;
use playtally_core::{Item, Library, MpcConfig};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use url::Url;

/// Source of wall-clock time in seconds since the Unix epoch.
pub trait Clock {
    fn now(&self) -> f64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct TrackerSettings {
    pub music_directory: PathBuf,
    pub user: String,
    pub rating: bool,
    pub rating_mix: f64,
}

impl From<&MpcConfig> for TrackerSettings {
    fn from(config: &MpcConfig) -> Self {
        Self {
            music_directory: PathBuf::from(&config.music_directory),
            user: config.user.clone(),
            rating: config.rating,
            rating_mix: config.rating_mix,
        }
    }
}

/// The song in flight and when it was expected to end.
#[derive(Debug, Clone, PartialEq)]
pub struct NowPlaying {
    pub path: String,
    pub started: f64,
    pub remaining: f64,
}

pub struct Tracker<'a, D: Daemon, C: Clock> {
    session: Session<D>,
    library: &'a dyn Library,
    music_directory: PathBuf,
    stats: StatsWriter,
    clock: C,
    now_playing: Option<NowPlaying>,
    /// Queue as of the last read, song id to path.
    queue: BTreeMap<String, String>,
}

impl<'a, D: Daemon, C: Clock> Tracker<'a, D, C> {
    pub fn new(
        session: Session<D>,
        library: &'a dyn Library,
        settings: TrackerSettings,
        clock: C,
    ) -> Self {
        Self {
            session,
            library,
            stats: StatsWriter::new(&settings.user, settings.rating, settings.rating_mix),
            music_directory: settings.music_directory,
            clock,
            now_playing: None,
            queue: BTreeMap::new(),
        }
    }

    pub fn with_stop_handle(mut self, stop: StopHandle) -> Self {
        self.session.set_stop_handle(stop);
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.session.stop_handle().clone()
    }

    /// Song id to path for the queue as last read.
    pub fn queue(&self) -> &BTreeMap<String, String> {
        &self.queue
    }

    pub fn now_playing(&self) -> Option<&NowPlaying> {
        self.now_playing.as_ref()
    }

    pub fn session(&self) -> &Session<D> {
        &self.session
    }

    /// Track playback until stopped. A rejected password ends the run
    /// quietly; running out of reconnect attempts is an error.
    pub fn run(&mut self) -> MpcResult<()> {
        let result = self.run_loop();
        self.session.close();
        match result {
            Err(MpcError::Authentication(message)) => {
                tracing::error!(%message, "daemon rejected the password");
                Ok(())
            }
            Err(MpcError::Stopped) => {
                tracing::info!("tracker stopped");
                Ok(())
            }
            other => other,
        }
    }

    fn is_stopped(&self) -> bool {
        self.session.stop_handle().is_stopped()
    }

    fn run_loop(&mut self) -> MpcResult<()> {
        match self.session.open() {
            Ok(()) => {}
            Err(err @ MpcError::Authentication(_)) => return Err(err),
            Err(err) => tracing::warn!(error = %err, "could not connect to the daemon"),
        }

        let mut events = vec![Subsystem::Player, Subsystem::Playlist];
        while !self.is_stopped() {
            self.handle_events(&events)?;
            if self.is_stopped() {
                break;
            }
            events = self.session.call(|daemon| daemon.idle())?;
            tracing::info!(?events, "daemon events");
        }
        Ok(())
    }

    fn handle_events(&mut self, events: &[Subsystem]) -> MpcResult<()> {
        if events.contains(&Subsystem::Options) {
            let status = self.status()?;
            tracing::debug!(consume = status.consume, random = status.random, "options changed");
        }
        if events.contains(&Subsystem::Player) {
            self.on_player()?;
        }
        if events.contains(&Subsystem::Playlist) {
            self.on_playlist()?;
        }
        Ok(())
    }

    fn status(&mut self) -> MpcResult<Status> {
        self.session.call(|daemon| daemon.status())
    }

    fn read_queue(&mut self) -> MpcResult<BTreeMap<String, String>> {
        let entries = self.session.call(|daemon| daemon.playlist_info())?;
        Ok(entries
            .into_iter()
            .map(|QueueEntry { id, file, .. }| (id, self.resolve(&file)))
            .collect())
    }

    fn resolve(&self, file: &str) -> String {
        if is_url(file) {
            return file.to_owned();
        }
        self.music_directory.join(file).to_string_lossy().into_owned()
    }

    fn on_player(&mut self) -> MpcResult<()> {
        let status = self.status()?;
        tracing::debug!(?status, "player status");
        match &status.state {
            PlayState::Stop | PlayState::Pause => {
                tracing::info!(state = ?status.state, "playback halted");
                self.now_playing = None;
                Ok(())
            }
            PlayState::Play => self.on_play(&status),
            PlayState::Unknown(state) => {
                tracing::info!(%state, "unhandled player state");
                Ok(())
            }
        }
    }

    fn on_play(&mut self, status: &Status) -> MpcResult<()> {
        self.queue = self.read_queue()?;
        if self.queue.is_empty() {
            tracing::debug!("playing with an empty queue");
            return Ok(());
        }
        let Some(path) = status
            .song_id
            .as_ref()
            .and_then(|id| self.queue.get(id))
            .cloned()
        else {
            tracing::debug!(song_id = ?status.song_id, "current song is not in the queue");
            return Ok(());
        };
        if is_url(&path) {
            tracing::info!(url = %path, "ignoring stream");
            return Ok(());
        }
        tracing::info!(%path, "playing");

        let remaining = status.remaining_seconds().unwrap_or(0.0);
        let now = self.clock.now();
        if let Some(previous) = self.now_playing.take() {
            if previous.path != path {
                let outcome = classify(previous.remaining, now - previous.started);
                tracing::info!(path = %previous.path, ?outcome, "song changed");
                let stats = &self.stats;
                self.update_item(Path::new(&previous.path), |item| {
                    stats.record_outcome(item, outcome, now as i64)
                })?;
            }
        }

        self.now_playing = Some(NowPlaying {
            path: path.clone(),
            started: now,
            remaining,
        });
        let stats = &self.stats;
        self.update_item(Path::new(&path), |item| stats.record_start(item, now as i64))
    }

    fn on_playlist(&mut self) -> MpcResult<()> {
        self.status()?;
        let queue = self.read_queue()?;
        for (id, path) in &queue {
            if self.queue.get(id) != Some(path) {
                tracing::info!(%id, %path, "playlist+");
            }
        }
        for (id, path) in &self.queue {
            if queue.get(id) != Some(path) {
                tracing::info!(%id, %path, "playlist-");
            }
        }
        self.queue = queue;
        Ok(())
    }

    fn update_item(&self, path: &Path, apply: impl FnOnce(&mut Item)) -> MpcResult<()> {
        match self.library.item_by_path(path)? {
            Some(mut item) => {
                apply(&mut item);
                self.library.store(&item)?;
            }
            None => tracing::debug!(path = %path.display(), "not in the library"),
        }
        Ok(())
    }
}

/// Whether a queue entry is a stream rather than a file.
pub fn is_url(path: &str) -> bool {
    path.contains("://") && Url::parse(path).is_ok()
}
