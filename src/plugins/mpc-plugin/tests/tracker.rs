use mpc_plugin::protocol::{PlayState, QueueEntry, Status, Subsystem};
use mpc_plugin::stats::{LAST_PLAYED, LAST_STARTED, PLAY_COUNT, RATING, SKIP_COUNT};
use mpc_plugin::{
    Clock, Daemon, MpcError, MpcResult, RetryPolicy, Session, StopHandle, Tracker,
    TrackerSettings,
};
use playtally_core::{Item, Library, MemoryLibrary};
use std::cell::Cell;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

#[derive(Clone, Default)]
struct FakeClock(Rc<Cell<f64>>);

impl FakeClock {
    fn at(now: f64) -> Self {
        Self(Rc::new(Cell::new(now)))
    }

    fn advance(&self, secs: f64) {
        self.0.set(self.0.get() + secs);
    }
}

impl Clock for FakeClock {
    fn now(&self) -> f64 {
        self.0.get()
    }
}

/// What happens between two `idle` calls.
struct Step {
    advance: f64,
    status: Status,
    events: Vec<Subsystem>,
    queue: Option<Vec<QueueEntry>>,
}

fn status(state: PlayState, song_id: Option<&str>, time: Option<(u64, u64)>) -> Status {
    Status {
        state,
        song_id: song_id.map(str::to_owned),
        time,
        elapsed: None,
        duration: None,
        consume: false,
        random: false,
    }
}

fn playing(song_id: &str, elapsed: u64, total: u64) -> Status {
    status(PlayState::Play, Some(song_id), Some((elapsed, total)))
}

fn step(advance: f64, status: Status) -> Step {
    Step {
        advance,
        status,
        events: vec![Subsystem::Player],
        queue: None,
    }
}

/// Daemon that replays a script and stops the tracker when it runs out.
struct FakeDaemon {
    status: Status,
    queue: Vec<QueueEntry>,
    steps: VecDeque<Step>,
    clock: FakeClock,
    stop: StopHandle,
    reject_password: bool,
    broken: bool,
    status_calls: usize,
    queue_reads: usize,
}

impl FakeDaemon {
    fn new(clock: &FakeClock, stop: &StopHandle, initial: Status, steps: Vec<Step>) -> Self {
        Self {
            status: initial,
            queue: vec![
                entry("1", "A/one.flac"),
                entry("2", "A/two.flac"),
                entry("3", "http://radio.example/stream"),
                entry("4", "B/unknown.flac"),
            ],
            steps: steps.into(),
            clock: clock.clone(),
            stop: stop.clone(),
            reject_password: false,
            broken: false,
            status_calls: 0,
            queue_reads: 0,
        }
    }
}

fn entry(id: &str, file: &str) -> QueueEntry {
    QueueEntry {
        id: id.into(),
        pos: None,
        file: file.into(),
    }
}

impl Daemon for FakeDaemon {
    fn connect(&mut self) -> MpcResult<()> {
        Ok(())
    }

    fn disconnect(&mut self) {}

    fn password(&mut self, _password: &str) -> MpcResult<()> {
        if self.reject_password {
            return Err(MpcError::Ack {
                code: 3,
                index: 0,
                command: "password".into(),
                message: "incorrect password".into(),
            });
        }
        Ok(())
    }

    fn commands(&mut self) -> MpcResult<Vec<String>> {
        Ok(vec!["idle".into(), "status".into()])
    }

    fn status(&mut self) -> MpcResult<Status> {
        self.status_calls += 1;
        if self.broken {
            return Err(MpcError::Closed);
        }
        Ok(self.status.clone())
    }

    fn playlist_info(&mut self) -> MpcResult<Vec<QueueEntry>> {
        self.queue_reads += 1;
        Ok(self.queue.clone())
    }

    fn idle(&mut self) -> MpcResult<Vec<Subsystem>> {
        match self.steps.pop_front() {
            Some(step) => {
                self.clock.advance(step.advance);
                self.status = step.status;
                if let Some(queue) = step.queue {
                    self.queue = queue;
                }
                Ok(step.events)
            }
            None => {
                self.stop.stop();
                Ok(Vec::new())
            }
        }
    }
}

fn library() -> MemoryLibrary {
    MemoryLibrary::with_items([
        Item::new("/music/A/one.flac").with("title", "One"),
        Item::new("/music/A/two.flac").with("title", "Two"),
    ])
    .expect("library")
}

fn settings(user: &str) -> TrackerSettings {
    TrackerSettings {
        music_directory: PathBuf::from("/music"),
        user: user.into(),
        rating: true,
        rating_mix: 0.75,
    }
}

fn session(daemon: FakeDaemon, password: Option<&str>) -> Session<FakeDaemon> {
    Session::new(
        daemon,
        password.map(str::to_owned),
        RetryPolicy {
            attempts: 3,
            interval: Duration::ZERO,
        },
    )
}

fn item(library: &MemoryLibrary, path: &str) -> Item {
    library
        .item_by_path(Path::new(path))
        .expect("lookup")
        .expect("item exists")
}

#[test]
fn song_played_to_the_end_counts_as_played() {
    let library = library();
    let clock = FakeClock::at(1_000.0);
    let stop = StopHandle::default();
    let daemon = FakeDaemon::new(
        &clock,
        &stop,
        playing("1", 0, 200),
        vec![step(200.0, playing("2", 0, 180))],
    );

    let mut tracker = Tracker::new(session(daemon, None), &library, settings(""), clock)
        .with_stop_handle(stop);
    tracker.run().expect("tracker run");

    let one = item(&library, "/music/A/one.flac");
    assert_eq!(one.get_int(PLAY_COUNT, 0), 1);
    assert_eq!(one.get(SKIP_COUNT), None);
    assert_eq!(one.get_int(LAST_STARTED, 0), 1_000);
    assert_eq!(one.get_int(LAST_PLAYED, 0), 1_200);
    let expected = 0.75 * (2.0 / 3.0) + 0.25 * 0.75;
    assert!((one.get_float(RATING, 0.0) - expected).abs() < 1e-9);

    let two = item(&library, "/music/A/two.flac");
    assert_eq!(two.get_int(LAST_STARTED, 0), 1_200);
    assert_eq!(two.get(PLAY_COUNT), None);
    assert_eq!(
        tracker.now_playing().map(|np| np.path.as_str()),
        Some("/music/A/two.flac")
    );
}

#[test]
fn song_changed_early_counts_as_skipped() {
    let library = library();
    let clock = FakeClock::at(1_000.0);
    let stop = StopHandle::default();
    let daemon = FakeDaemon::new(
        &clock,
        &stop,
        playing("1", 20, 200),
        vec![step(30.0, playing("2", 0, 180))],
    );

    let mut tracker = Tracker::new(session(daemon, None), &library, settings(""), clock)
        .with_stop_handle(stop);
    tracker.run().expect("tracker run");

    let one = item(&library, "/music/A/one.flac");
    assert_eq!(one.get_int(SKIP_COUNT, 0), 1);
    assert_eq!(one.get(PLAY_COUNT), None);
    assert_eq!(one.get(LAST_PLAYED), None);
    assert!(one.get_float(RATING, 1.0) < 0.5);
}

#[test]
fn pause_forgets_the_song_in_flight() {
    let library = library();
    let clock = FakeClock::at(0.0);
    let stop = StopHandle::default();
    let daemon = FakeDaemon::new(
        &clock,
        &stop,
        playing("1", 0, 200),
        vec![
            step(50.0, status(PlayState::Pause, Some("1"), Some((50, 200)))),
            step(600.0, playing("2", 0, 180)),
        ],
    );

    let mut tracker = Tracker::new(session(daemon, None), &library, settings(""), clock)
        .with_stop_handle(stop);
    tracker.run().expect("tracker run");

    let one = item(&library, "/music/A/one.flac");
    assert_eq!(one.get(PLAY_COUNT), None);
    assert_eq!(one.get(SKIP_COUNT), None);
    assert_eq!(item(&library, "/music/A/two.flac").get_int(LAST_STARTED, 0), 650);
}

#[test]
fn streams_are_ignored() {
    let library = library();
    let clock = FakeClock::at(0.0);
    let stop = StopHandle::default();
    let daemon = FakeDaemon::new(
        &clock,
        &stop,
        playing("1", 0, 200),
        vec![step(20.0, playing("3", 0, 0))],
    );

    let mut tracker = Tracker::new(session(daemon, None), &library, settings(""), clock)
        .with_stop_handle(stop);
    tracker.run().expect("tracker run");

    let one = item(&library, "/music/A/one.flac");
    assert_eq!(one.get(SKIP_COUNT), None);
    assert_eq!(
        tracker.now_playing().map(|np| np.path.as_str()),
        Some("/music/A/one.flac")
    );
}

#[test]
fn songs_missing_from_the_library_are_tolerated() {
    let library = library();
    let clock = FakeClock::at(0.0);
    let stop = StopHandle::default();
    let daemon = FakeDaemon::new(
        &clock,
        &stop,
        playing("4", 0, 100),
        vec![step(5.0, playing("1", 0, 200))],
    );

    let mut tracker = Tracker::new(session(daemon, None), &library, settings(""), clock)
        .with_stop_handle(stop);
    tracker.run().expect("tracker run");

    assert_eq!(item(&library, "/music/A/one.flac").get_int(LAST_STARTED, -1), 5);
}

#[test]
fn user_statistics_are_mirrored() {
    let library = library();
    let clock = FakeClock::at(0.0);
    let stop = StopHandle::default();
    let daemon = FakeDaemon::new(
        &clock,
        &stop,
        playing("1", 0, 200),
        vec![step(195.0, playing("2", 0, 180))],
    );

    let mut tracker = Tracker::new(session(daemon, None), &library, settings("alice"), clock)
        .with_stop_handle(stop);
    tracker.run().expect("tracker run");

    let one = item(&library, "/music/A/one.flac");
    assert_eq!(one.get_int(PLAY_COUNT, 0), 1);
    assert_eq!(one.get_int("play_count[alice]", 0), 1);
    assert_eq!(one.get_int("last_played[alice]", 0), 195);
    assert!(one.get("rating[alice]").is_some());
    assert_eq!(
        item(&library, "/music/A/two.flac").get_int("last_started[alice]", 0),
        195
    );
}

#[test]
fn rejected_password_ends_quietly() {
    let library = library();
    let clock = FakeClock::at(0.0);
    let stop = StopHandle::default();
    let mut daemon = FakeDaemon::new(&clock, &stop, playing("1", 0, 200), Vec::new());
    daemon.reject_password = true;

    let mut tracker = Tracker::new(session(daemon, Some("nope")), &library, settings(""), clock)
        .with_stop_handle(stop);
    tracker.run().expect("authentication failure is not an error");

    assert_eq!(tracker.session().daemon().status_calls, 0);
    assert_eq!(item(&library, "/music/A/one.flac").get(LAST_STARTED), None);
}

#[test]
fn unreachable_daemon_exhausts_retries() {
    let library = library();
    let clock = FakeClock::at(0.0);
    let stop = StopHandle::default();
    let mut daemon = FakeDaemon::new(&clock, &stop, playing("1", 0, 200), Vec::new());
    daemon.broken = true;

    let mut tracker = Tracker::new(session(daemon, None), &library, settings(""), clock)
        .with_stop_handle(stop);
    let err = tracker.run().unwrap_err();

    assert!(matches!(err, MpcError::RetriesExhausted { attempts: 3 }));
    assert_eq!(tracker.session().daemon().status_calls, 3);
}

#[test]
fn stopped_tracker_does_nothing() {
    let library = library();
    let clock = FakeClock::at(0.0);
    let stop = StopHandle::default();
    let daemon = FakeDaemon::new(&clock, &stop, playing("1", 0, 200), Vec::new());
    stop.stop();

    let mut tracker = Tracker::new(session(daemon, None), &library, settings(""), clock)
        .with_stop_handle(stop);
    tracker.run().expect("tracker run");

    assert_eq!(tracker.session().daemon().status_calls, 0);
}

#[test]
fn same_song_again_only_refreshes_last_started() {
    let library = library();
    let clock = FakeClock::at(1_000.0);
    let stop = StopHandle::default();
    let daemon = FakeDaemon::new(
        &clock,
        &stop,
        playing("1", 0, 200),
        vec![step(300.0, playing("1", 0, 200))],
    );

    let mut tracker = Tracker::new(session(daemon, None), &library, settings(""), clock)
        .with_stop_handle(stop);
    tracker.run().expect("tracker run");

    let one = item(&library, "/music/A/one.flac");
    assert_eq!(one.get_int(LAST_STARTED, 0), 1_300);
    assert_eq!(one.get(PLAY_COUNT), None);
    assert_eq!(one.get(SKIP_COUNT), None);
    assert_eq!(one.get(LAST_PLAYED), None);
    assert_eq!(one.get(RATING), None);
    assert_eq!(tracker.now_playing().map(|np| np.started), Some(1_300.0));
}

#[test]
fn playlist_change_refreshes_the_queue() {
    let library = library();
    let clock = FakeClock::at(0.0);
    let stop = StopHandle::default();
    let daemon = FakeDaemon::new(
        &clock,
        &stop,
        playing("1", 0, 200),
        vec![Step {
            advance: 5.0,
            status: playing("1", 5, 200),
            events: vec![Subsystem::Playlist],
            queue: Some(vec![entry("1", "A/one.flac"), entry("5", "C/new.flac")]),
        }],
    );

    let mut tracker = Tracker::new(session(daemon, None), &library, settings(""), clock)
        .with_stop_handle(stop);
    tracker.run().expect("tracker run");

    let queue = tracker.queue();
    assert_eq!(queue.len(), 2);
    assert_eq!(queue.get("5").map(String::as_str), Some("/music/C/new.flac"));
    assert!(!queue.contains_key("2"));
    // startup reads the queue for the player and the playlist, then once more
    assert_eq!(tracker.session().daemon().queue_reads, 3);

    let one = item(&library, "/music/A/one.flac");
    assert_eq!(one.get(PLAY_COUNT), None);
    assert_eq!(one.get(SKIP_COUNT), None);
    assert_eq!(
        tracker.now_playing().map(|np| np.path.as_str()),
        Some("/music/A/one.flac")
    );
}

#[test]
fn options_change_reads_status_only() {
    let library = library();
    let clock = FakeClock::at(0.0);
    let stop = StopHandle::default();
    let stopped = status(PlayState::Stop, None, None);
    let daemon = FakeDaemon::new(
        &clock,
        &stop,
        stopped.clone(),
        vec![Step {
            advance: 1.0,
            status: Status {
                random: true,
                ..stopped
            },
            events: vec![Subsystem::Options],
            queue: None,
        }],
    );

    let mut tracker = Tracker::new(session(daemon, None), &library, settings(""), clock)
        .with_stop_handle(stop);
    tracker.run().expect("tracker run");

    let daemon = tracker.session().daemon();
    assert_eq!(daemon.status_calls, 3);
    assert_eq!(daemon.queue_reads, 1);
    assert!(tracker.now_playing().is_none());
}
