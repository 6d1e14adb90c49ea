//! Interactive player loop
//!
//! Reads commands line by line while applying engine status updates as they
//! arrive, and prints whatever the session reports in between.

use crate::catalog::JsonCatalog;
use crate::commands::{ParseError, PlaylistSource, ShellCommand, HELP};
use crate::error::{CliError, Result};
use cadence_core::{hydrate_tracks, LikedStore, PlaylistStore, Track, TrackCatalog, TrackId};
use cadence_playback::{EngineFactory, PlaybackSession, SessionEvent};
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::debug;

/// What the loop does after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Format milliseconds as `m:ss`
pub fn clock(ms: u64) -> String {
    format!("{}:{:02}", ms / 60_000, (ms / 1_000) % 60)
}

fn describe(track: &Track) -> String {
    if track.artist.is_empty() {
        track.title.clone()
    } else {
        format!("{} - {}", track.artist, track.title)
    }
}

/// A playback session bound to a catalog and the saved playlists
pub struct Shell<'a, F, L, P>
where
    F: EngineFactory,
    L: LikedStore + ?Sized,
    P: PlaylistStore + ?Sized,
{
    session: PlaybackSession<F, L>,
    catalog: &'a JsonCatalog,
    playlists: &'a P,
}

impl<'a, F, L, P> Shell<'a, F, L, P>
where
    F: EngineFactory,
    L: LikedStore + ?Sized,
    P: PlaylistStore + ?Sized,
{
    pub fn new(session: PlaybackSession<F, L>, catalog: &'a JsonCatalog, playlists: &'a P) -> Self {
        Self {
            session,
            catalog,
            playlists,
        }
    }

    pub fn session(&self) -> &PlaybackSession<F, L> {
        &self.session
    }

    /// Run until `quit` or end of input, then tear the session down
    pub async fn run<R, W>(mut self, input: R, out: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let mut lines = input.lines();
        prompt(out)?;

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        break;
                    };
                    let flow = match line.parse::<ShellCommand>() {
                        Ok(command) => self.execute(command, out).await?,
                        Err(ParseError::Empty) => Flow::Continue,
                        Err(e) => {
                            writeln!(out, "{e}")?;
                            Flow::Continue
                        }
                    };
                    self.render_events(out)?;
                    if flow == Flow::Quit {
                        break;
                    }
                    prompt(out)?;
                }
                Some(status) = self.session.recv_status() => {
                    self.session.apply_status(status).await;
                    self.render_events(out)?;
                }
            }
        }

        self.session.teardown().await;
        Ok(())
    }

    /// Run one command; lookup failures are reported, not returned
    pub async fn execute<W: Write>(&mut self, command: ShellCommand, out: &mut W) -> Result<Flow> {
        debug!(?command, "Shell command");
        match self.dispatch(command, out).await {
            Ok(flow) => Ok(flow),
            Err(e @ (CliError::Io(_) | CliError::Json(_))) => Err(e),
            Err(e) => {
                writeln!(out, "{e}")?;
                Ok(Flow::Continue)
            }
        }
    }

    async fn dispatch<W: Write>(&mut self, command: ShellCommand, out: &mut W) -> Result<Flow> {
        match command {
            ShellCommand::Play(None) => self.session.play(None).await,
            ShellCommand::Play(Some(id)) => {
                let track = self.catalog.require(&id)?;
                self.session.play(Some(track)).await;
            }
            ShellCommand::Pause => self.session.pause().await,
            ShellCommand::Toggle => self.session.toggle_play_pause().await,
            ShellCommand::Next => self.session.skip_to_next().await,
            ShellCommand::Previous => self.session.skip_to_previous().await,
            ShellCommand::Seek(position) => {
                let ms = u64::try_from(position.as_millis()).unwrap_or(u64::MAX);
                self.session.seek(ms).await;
            }
            ShellCommand::Queue(id) => {
                let track = self.catalog.require(&id)?;
                if !self.session.add_to_queue(track) {
                    writeln!(out, "{id} has no playable source")?;
                }
            }
            ShellCommand::PlayNext(id) => {
                let track = self.catalog.require(&id)?;
                if !self.session.play_next_in_queue(track) {
                    writeln!(out, "{id} has no playable source")?;
                }
            }
            ShellCommand::ClearQueue => self.session.clear_queue(),
            ShellCommand::Unqueue(index) => {
                let removed = self.session.remove_from_queue(index)?;
                writeln!(out, "removed {}", describe(&removed))?;
            }
            ShellCommand::Like => {
                if self.session.toggle_like_current_track().await.is_none() {
                    writeln!(out, "nothing is playing")?;
                }
            }
            ShellCommand::Shuffle => self.session.toggle_shuffle(),
            ShellCommand::Repeat(None) => self.session.cycle_repeat().await,
            ShellCommand::Repeat(Some(mode)) => self.session.set_repeat(mode).await,
            ShellCommand::Open(id) => {
                let track = self.catalog.require(&id)?;
                let index = self.catalog.index_of(&track.id).unwrap_or(0);
                if !self
                    .session
                    .open_track(track, self.catalog.tracks(), index)
                    .await
                {
                    writeln!(out, "{id} is already open")?;
                }
            }
            ShellCommand::Load { source, index } => self.load_playlist(source, index, out).await?,
            ShellCommand::List => self.write_catalog(out)?,
            ShellCommand::Status => self.write_status(out)?,
            ShellCommand::Help => writeln!(out, "{HELP}")?,
            ShellCommand::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    async fn load_playlist<W: Write>(
        &mut self,
        source: PlaylistSource,
        index: usize,
        out: &mut W,
    ) -> Result<()> {
        let tracks = match source {
            PlaylistSource::Catalog => self.catalog.tracks(),
            PlaylistSource::Saved(id) => {
                let playlist = self
                    .playlists
                    .list_playlists()
                    .await?
                    .into_iter()
                    .find(|p| p.id.as_str() == id)
                    .ok_or(CliError::UnknownPlaylist(id))?;
                hydrate_tracks(self.catalog, &playlist.track_ids)
            }
        };

        let Some(track) = tracks.get(index).cloned() else {
            writeln!(out, "no track {} in a playlist of {}", index + 1, tracks.len())?;
            return Ok(());
        };
        self.session.load_audio(track, true, tracks, index).await;
        Ok(())
    }

    fn title_of(&self, id: &str) -> String {
        self.catalog
            .track(&TrackId::new(id))
            .map_or_else(|| id.to_string(), |t| describe(&t))
    }

    /// Print drained session events, skipping position ticks
    pub fn render_events<W: Write>(&mut self, out: &mut W) -> Result<()> {
        for event in self.session.drain_events() {
            match event {
                SessionEvent::PositionUpdate { .. } => {}
                SessionEvent::StateChanged { state } => writeln!(out, "[{state:?}]")?,
                SessionEvent::TrackChanged {
                    track_id: Some(id), ..
                } => writeln!(out, "now playing: {}", self.title_of(&id))?,
                SessionEvent::TrackChanged { track_id: None, .. } => {
                    writeln!(out, "nothing playing")?;
                }
                SessionEvent::QueueChanged { length } => writeln!(out, "queue: {length}")?,
                SessionEvent::LikeChanged { liked, .. } => {
                    writeln!(out, "{}", if liked { "liked" } else { "not liked" })?;
                }
                SessionEvent::RepeatChanged { mode } => writeln!(out, "repeat: {mode:?}")?,
                SessionEvent::ShuffleChanged { enabled } => {
                    writeln!(out, "shuffle: {}", if enabled { "on" } else { "off" })?;
                }
                SessionEvent::Error { message } => writeln!(out, "error: {message}")?,
            }
        }
        Ok(())
    }

    fn write_catalog<W: Write>(&self, out: &mut W) -> Result<()> {
        let current = self.session.current_track().map(|t| &t.id);
        for track in self.catalog.tracks() {
            let marker = if Some(&track.id) == current { '>' } else { ' ' };
            let length = track.duration_millis().map(clock).unwrap_or_default();
            writeln!(out, "{marker} {:<12} {:<40} {length}", track.id, describe(&track))?;
        }
        Ok(())
    }

    fn write_status<W: Write>(&self, out: &mut W) -> Result<()> {
        let snap = self.session.snapshot();
        match &snap.current_track {
            Some(track) => writeln!(
                out,
                "{:?}: {} [{} / {}]{}",
                snap.state,
                describe(track),
                clock(snap.position_ms),
                snap.duration_ms.map(clock).unwrap_or_else(|| "--:--".to_string()),
                if snap.is_liked { " (liked)" } else { "" },
            )?,
            None => writeln!(out, "{:?}", snap.state)?,
        }
        writeln!(
            out,
            "playlist {}/{}  queue {}  repeat {:?}  shuffle {}",
            snap.current_index + 1,
            snap.playlist_len,
            snap.queue.len(),
            snap.repeat,
            if snap.shuffle { "on" } else { "off" },
        )?;
        for (i, track) in snap.queue.iter().enumerate() {
            writeln!(out, "  {}. {}", i + 1, describe(track))?;
        }
        Ok(())
    }
}

fn prompt<W: Write>(out: &mut W) -> Result<()> {
    write!(out, "> ")?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SimulatedEngine;
    use async_trait::async_trait;
    use cadence_core::{CadenceError, Playlist, PlaylistId};
    use cadence_playback::{EngineResult, PlaybackConfig, PlaybackState, RepeatMode};
    use cadence_storage::MemoryLikedStore;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Default)]
    struct FixedPlaylists(Mutex<Vec<Playlist>>);

    #[async_trait]
    impl PlaylistStore for FixedPlaylists {
        async fn list_playlists(&self) -> cadence_core::Result<Vec<Playlist>> {
            Ok(self.0.lock().unwrap().clone())
        }

        async fn add_track(
            &self,
            _playlist_id: &PlaylistId,
            _track_id: &TrackId,
        ) -> cadence_core::Result<Option<Playlist>> {
            Err(CadenceError::storage("read only"))
        }

        async fn remove_track(
            &self,
            _playlist_id: &PlaylistId,
            _track_id: &TrackId,
        ) -> cadence_core::Result<Option<Playlist>> {
            Err(CadenceError::storage("read only"))
        }
    }

    fn catalog() -> JsonCatalog {
        JsonCatalog::from_tracks(
            ["a", "b", "c"]
                .iter()
                .map(|id| {
                    Track::new(*id, format!("Song {id}"))
                        .with_artist("Band")
                        .with_url(format!("https://cdn.test/{id}.mp3"))
                        .with_duration(Duration::from_secs(2))
                })
                .collect(),
        )
    }

    type TestShell<'a> = Shell<
        'a,
        Box<dyn FnMut() -> EngineResult<SimulatedEngine> + Send>,
        MemoryLikedStore,
        FixedPlaylists,
    >;

    fn shell<'a>(catalog: &'a JsonCatalog, playlists: &'a FixedPlaylists) -> TestShell<'a> {
        let lengths = Arc::new(catalog.lengths_by_url());
        let factory: Box<dyn FnMut() -> EngineResult<SimulatedEngine> + Send> =
            Box::new(move || Ok(SimulatedEngine::new(Arc::clone(&lengths), Duration::from_secs(60))));
        let config = PlaybackConfig {
            status_update_interval_ms: 100,
            shuffle_seed: Some(1),
            ..Default::default()
        };
        let session = PlaybackSession::new(factory, Arc::new(MemoryLikedStore::new()), config);
        Shell::new(session, catalog, playlists)
    }

    async fn exec(shell: &mut TestShell<'_>, line: &str) -> String {
        let mut out = Vec::new();
        let command = line.parse().unwrap();
        shell.execute(command, &mut out).await.unwrap();
        shell.render_events(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn clock_formats_minutes_and_seconds() {
        assert_eq!(clock(0), "0:00");
        assert_eq!(clock(65_432), "1:05");
        assert_eq!(clock(600_000), "10:00");
    }

    #[tokio::test(start_paused = true)]
    async fn open_and_skip_through_catalog() {
        let catalog = catalog();
        let playlists = FixedPlaylists::default();
        let mut shell = shell(&catalog, &playlists);

        let out = exec(&mut shell, "open b").await;
        assert!(out.contains("now playing: Band - Song b"), "{out}");
        assert_eq!(shell.session().current_index(), 1);

        let out = exec(&mut shell, "open b").await;
        assert!(out.contains("already open"), "{out}");

        let out = exec(&mut shell, "next").await;
        assert!(out.contains("Song c"), "{out}");
        assert_eq!(shell.session().state(), PlaybackState::ReadyPlaying);
    }

    #[tokio::test(start_paused = true)]
    async fn lookup_errors_are_printed() {
        let catalog = catalog();
        let playlists = FixedPlaylists::default();
        let mut shell = shell(&catalog, &playlists);

        let out = exec(&mut shell, "queue nope").await;
        assert!(out.contains("Unknown track: nope"), "{out}");

        let out = exec(&mut shell, "load missing").await;
        assert!(out.contains("Unknown playlist: missing"), "{out}");

        let out = exec(&mut shell, "unqueue 1").await;
        assert!(out.contains("Index out of bounds"), "{out}");

        let out = exec(&mut shell, "like").await;
        assert!(out.contains("nothing is playing"), "{out}");
    }

    #[tokio::test(start_paused = true)]
    async fn loads_saved_playlist_in_stored_order() {
        let catalog = catalog();
        let mut saved = Playlist::new("Mix", "");
        saved.track_ids = vec![TrackId::new("c"), TrackId::new("ghost"), TrackId::new("a")];
        let id = saved.id.to_string();
        let playlists = FixedPlaylists(Mutex::new(vec![saved]));
        let mut shell = shell(&catalog, &playlists);

        exec(&mut shell, &format!("load {id} 2")).await;
        let session = shell.session();
        assert_eq!(session.playlist().len(), 2);
        assert_eq!(session.current_track().unwrap().id.as_str(), "a");

        let out = exec(&mut shell, &format!("load {id} 5")).await;
        assert!(out.contains("no track 5"), "{out}");
    }

    #[tokio::test(start_paused = true)]
    async fn queue_and_modes() {
        let catalog = catalog();
        let playlists = FixedPlaylists::default();
        let mut shell = shell(&catalog, &playlists);

        exec(&mut shell, "play a").await;
        let out = exec(&mut shell, "queue c").await;
        assert!(out.contains("queue: 1"), "{out}");

        let out = exec(&mut shell, "repeat one").await;
        assert!(out.contains("repeat: One"), "{out}");
        assert_eq!(shell.session().repeat(), RepeatMode::One);

        let out = exec(&mut shell, "status").await;
        assert!(out.contains("Band - Song a"), "{out}");
        assert!(out.contains("1. Band - Song c"), "{out}");

        let out = exec(&mut shell, "like").await;
        assert!(out.contains("liked"), "{out}");
        assert!(shell.session().is_liked());
    }

    #[tokio::test(start_paused = true)]
    async fn run_plays_until_end_of_input() {
        let catalog = catalog();
        let playlists = FixedPlaylists::default();
        let shell = shell(&catalog, &playlists);

        let mut out = Vec::new();
        shell
            .run(&b"load all\nbogus\nstatus\nquit\n"[..], &mut out)
            .await
            .unwrap();

        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("now playing: Band - Song a"), "{out}");
        assert!(out.contains("unknown command 'bogus'"), "{out}");
        assert!(out.contains("playlist 1/3"), "{out}");
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_seek_is_rejected_and_player_keeps_running() {
        let catalog = catalog();
        let playlists = FixedPlaylists::default();
        let shell = shell(&catalog, &playlists);

        let mut out = Vec::new();
        shell
            .run(&b"play a\nseek 1e30\nseek 1\nstatus\nquit\n"[..], &mut out)
            .await
            .unwrap();

        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("invalid argument '1e30' for 'seek'"), "{out}");
        assert!(out.contains("[0:01 / 0:02]"), "{out}");
    }

    #[tokio::test(start_paused = true)]
    async fn finished_track_advances_while_waiting_for_input() {
        let catalog = catalog();
        let playlists = FixedPlaylists::default();
        let mut shell = shell(&catalog, &playlists);

        exec(&mut shell, "load all").await;
        tokio::time::sleep(Duration::from_millis(2_150)).await;
        assert!(shell.session.pump_status().await > 0);
        assert_eq!(shell.session().current_track().unwrap().id.as_str(), "b");
    }
}
