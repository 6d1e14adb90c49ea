/// Cadence - command-line music player
use anyhow::Context;
use cadence_core::{hydrate_tracks, PlaylistId, TrackCatalog, TrackId};
use cadence_playback::{EngineResult, PlaybackSession};
use cadence_storage::{LikedTracks, PlaylistUpdate, UserPlaylists};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod catalog;
mod commands;
mod config;
mod engine;
mod error;
mod shell;

use catalog::JsonCatalog;
use commands::{PlaylistSource, ShellCommand};
use config::CliConfig;
use engine::SimulatedEngine;
use shell::{clock, Shell};

#[derive(Parser)]
#[command(name = "cadence")]
#[command(about = "Cadence command-line music player", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "CADENCE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the interactive player
    Play {
        /// Track to open, with the whole catalog as playlist
        track: Option<String>,

        /// Saved playlist to load instead
        #[arg(short, long, conflicts_with = "track")]
        playlist: Option<String>,
    },
    /// List catalog tracks
    Tracks,
    /// Manage liked tracks
    Likes {
        #[command(subcommand)]
        action: LikesCommand,
    },
    /// Manage saved playlists
    Playlists {
        #[command(subcommand)]
        action: PlaylistsCommand,
    },
}

#[derive(Subcommand)]
enum LikesCommand {
    /// Show liked tracks, oldest first
    List,
    /// Like a track
    Add { track: String },
    /// Unlike a track
    Remove { track: String },
    /// Forget every liked track
    Clear,
}

#[derive(Subcommand)]
enum PlaylistsCommand {
    /// List playlists
    List,
    /// Create an empty playlist
    Create {
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
    },
    /// Rename or describe a playlist
    Edit {
        playlist: String,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Delete a playlist
    Delete { playlist: String },
    /// Append a track to a playlist
    Add { playlist: String, track: String },
    /// Remove a track from a playlist
    Remove { playlist: String, track: String },
    /// Show a playlist's tracks
    Show { playlist: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so they never interleave with the player prompt
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cadence=info,cadence_playback=info,cadence_storage=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = CliConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    let pool = cadence_storage::create_pool(&config.storage.database_url)
        .await
        .context("Failed to open database")?;
    cadence_storage::run_migrations(&pool)
        .await
        .context("Failed to run migrations")?;

    match cli.command {
        Commands::Play { track, playlist } => {
            let catalog = JsonCatalog::load(&config.catalog.path)?;
            play(&config, &catalog, pool, track, playlist).await?;
        }
        Commands::Tracks => {
            let catalog = JsonCatalog::load(&config.catalog.path)?;
            let liked = LikedTracks::new(pool).ids().await?;
            for track in catalog.tracks() {
                let heart = if liked.contains(&track.id) { '*' } else { ' ' };
                let length = track.duration_millis().map(clock).unwrap_or_default();
                println!(
                    "{heart} {:<12} {} - {} {length}",
                    track.id, track.artist, track.title
                );
            }
        }
        Commands::Likes { action } => likes(&config, LikedTracks::new(pool), action).await?,
        Commands::Playlists { action } => {
            playlists(&config, UserPlaylists::new(pool), action).await?;
        }
    }

    Ok(())
}

async fn play(
    config: &CliConfig,
    catalog: &JsonCatalog,
    pool: cadence_storage::SqlitePool,
    track: Option<String>,
    playlist: Option<String>,
) -> anyhow::Result<()> {
    let lengths = Arc::new(catalog.lengths_by_url());
    let default_length = config.engine.simulated_track_length();
    let factory = move || -> EngineResult<SimulatedEngine> {
        Ok(SimulatedEngine::new(Arc::clone(&lengths), default_length))
    };

    let liked = Arc::new(LikedTracks::new(pool.clone()));
    let saved = UserPlaylists::new(pool);
    let session = PlaybackSession::new(factory, liked, config.player.clone());
    let mut shell = Shell::new(session, catalog, &saved);

    let mut stdout = std::io::stdout();
    let first = match (track, playlist) {
        (Some(id), _) => Some(ShellCommand::Open(id)),
        (None, Some(id)) => Some(ShellCommand::Load {
            source: PlaylistSource::Saved(id),
            index: 0,
        }),
        (None, None) => None,
    };
    if let Some(command) = first {
        shell.execute(command, &mut stdout).await?;
        shell.render_events(&mut stdout)?;
    }

    writeln!(stdout, "type 'help' for commands")?;
    let input = tokio::io::BufReader::new(tokio::io::stdin());
    shell.run(input, &mut stdout).await?;
    Ok(())
}

async fn likes(config: &CliConfig, liked: LikedTracks, action: LikesCommand) -> anyhow::Result<()> {
    match action {
        LikesCommand::List => {
            let ids = liked.ids().await?;
            if ids.is_empty() {
                println!("No liked tracks");
                return Ok(());
            }
            let catalog = JsonCatalog::load(&config.catalog.path).unwrap_or_default();
            for id in ids {
                match catalog.track(&id) {
                    Some(track) => println!("{id:<12} {} - {}", track.artist, track.title),
                    None => println!("{id:<12} (not in catalog)"),
                }
            }
        }
        LikesCommand::Add { track } => {
            let added = liked.add(&TrackId::new(track.as_str())).await?;
            println!("{}", if added { "Liked" } else { "Already liked" });
        }
        LikesCommand::Remove { track } => {
            let removed = liked.remove(&TrackId::new(track.as_str())).await?;
            println!("{}", if removed { "Unliked" } else { "Was not liked" });
        }
        LikesCommand::Clear => {
            liked.clear().await?;
            println!("Cleared liked tracks");
        }
    }
    Ok(())
}

async fn playlists(
    config: &CliConfig,
    store: UserPlaylists,
    action: PlaylistsCommand,
) -> anyhow::Result<()> {
    match action {
        PlaylistsCommand::List => {
            let all = store.list().await?;
            if all.is_empty() {
                println!("No playlists");
            }
            for playlist in all {
                println!(
                    "{}  {} ({} tracks)",
                    playlist.id,
                    playlist.name,
                    playlist.track_ids.len()
                );
            }
        }
        PlaylistsCommand::Create { name, description } => {
            let playlist = store.create(&name, &description).await?;
            println!("Created playlist {} ({})", playlist.name, playlist.id);
        }
        PlaylistsCommand::Edit {
            playlist,
            name,
            description,
        } => {
            let update = PlaylistUpdate {
                name,
                description,
                ..Default::default()
            };
            let updated = store
                .update(&PlaylistId::new(playlist.as_str()), update)
                .await?
                .ok_or(error::CliError::UnknownPlaylist(playlist))?;
            println!("Updated playlist {}", updated.name);
        }
        PlaylistsCommand::Delete { playlist } => {
            if store.delete(&PlaylistId::new(playlist.as_str())).await? {
                println!("Deleted playlist {playlist}");
            } else {
                anyhow::bail!(error::CliError::UnknownPlaylist(playlist));
            }
        }
        PlaylistsCommand::Add { playlist, track } => {
            let catalog = JsonCatalog::load(&config.catalog.path)?;
            let track = catalog.require(&track)?;
            let updated = store
                .add_track(&PlaylistId::new(playlist.as_str()), &track.id)
                .await?
                .ok_or(error::CliError::UnknownPlaylist(playlist))?;
            println!("{} now has {} tracks", updated.name, updated.track_ids.len());
        }
        PlaylistsCommand::Remove { playlist, track } => {
            let updated = store
                .remove_track(&PlaylistId::new(playlist.as_str()), &TrackId::new(track.as_str()))
                .await?
                .ok_or(error::CliError::UnknownPlaylist(playlist))?;
            println!("{} now has {} tracks", updated.name, updated.track_ids.len());
        }
        PlaylistsCommand::Show { playlist } => {
            let found = store
                .get(&PlaylistId::new(playlist.as_str()))
                .await?
                .ok_or(error::CliError::UnknownPlaylist(playlist))?;
            let catalog = JsonCatalog::load(&config.catalog.path)?;
            println!("{}", found.name);
            if !found.description.is_empty() {
                println!("{}", found.description);
            }
            for (i, track) in hydrate_tracks(&catalog, &found.track_ids).iter().enumerate() {
                println!("{:>3}. {} - {}", i + 1, track.artist, track.title);
            }
        }
    }
    Ok(())
}
