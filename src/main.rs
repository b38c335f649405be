//! TurnUp - voice-controlled music player
//!
//! Demo harness: lines typed on stdin are treated as recognized speech.
//! Lines starting with `/` are gestures (`/toggle`, `/next`, `/prev`,
//! `/next-playlist`, `/prev-playlist`, `/seek 0.5`, `/select 1 2`,
//! `/unlock`, `/dark 0.1`, `/listen`, `/mute`, `/quit`).
//!
//! With the `audio-io` feature and `TURNUP_MIC_TAP` set, the microphone is
//! opened for each recognition session. This only exercises the tap: the
//! stdin recognizer ignores the captured samples.

use anyhow::{Context, Result};
use crossbeam_channel::{unbounded, Sender};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use turnup::audio::{AudioOutput, AudioStore, DirectoryAudioStore, MemoryAudioStore, SimulatedOutput};
use turnup::display::ManualBrightness;
use turnup::integration::OrchestratorComponents;
use turnup::utils::{SharedClock, SystemClock};
use turnup::voice::ChannelRecognizer;
use turnup::{Orchestrator, OrchestratorHandle, PlayerEvent, TurnUpConfig};

/// Length of the silent stand-in tracks used without an audio directory
const PLACEHOLDER_TRACK_LENGTH: Duration = Duration::from_secs(180);

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "turnup=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting TurnUp");

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = TurnUpConfig::load_or_default(config_path.as_deref())
        .context("Failed to load configuration")?;
    let catalog = config.load_catalog().context("Failed to load catalog")?;

    let clock: SharedClock = SystemClock::shared();

    let store: Box<dyn AudioStore> = if config.playback.audio_dir.is_dir() {
        info!("Reading audio from {}", config.playback.audio_dir.display());
        Box::new(DirectoryAudioStore::new(
            config.playback.audio_dir.clone(),
            config.playback.audio_extension.clone(),
        ))
    } else {
        warn!(
            "Audio directory {} not found, playing silence",
            config.playback.audio_dir.display()
        );
        Box::new(MemoryAudioStore::with_catalog(&catalog, PLACEHOLDER_TRACK_LENGTH))
    };

    let output = open_output(clock.clone());

    let (line_tx, line_rx) = unbounded::<String>();
    let recognizer = Arc::new(ChannelRecognizer::new(line_rx));
    let brightness = Arc::new(ManualBrightness::default());

    let components = OrchestratorComponents::new(catalog, store, output, recognizer, clock)
        .with_brightness(brightness.clone());
    #[cfg(feature = "audio-io")]
    let components = if std::env::var_os("TURNUP_MIC_TAP").is_some() {
        components.with_tap(Box::new(turnup::audio::CpalTap::new()))
    } else {
        components
    };

    let (orchestrator, handle) = Orchestrator::new(config, components)?;
    let mut threads = orchestrator.start()?;
    threads.push(spawn_event_logger(handle.clone())?);

    read_input(&handle, &line_tx, &brightness)?;

    info!("Input closed, shutting down");
    if let Err(e) = handle.shutdown_and_wait() {
        warn!("{}", e);
    }
    for thread in threads {
        let _ = thread.join();
    }
    Ok(())
}

#[cfg(feature = "audio-io")]
fn open_output(clock: SharedClock) -> Box<dyn AudioOutput> {
    match turnup::audio::RodioOutput::new() {
        Ok(output) => Box::new(output),
        Err(e) => {
            warn!("{}; falling back to silent playback", e);
            Box::new(SimulatedOutput::new(clock))
        }
    }
}

#[cfg(not(feature = "audio-io"))]
fn open_output(clock: SharedClock) -> Box<dyn AudioOutput> {
    Box::new(SimulatedOutput::new(clock))
}

fn spawn_event_logger(handle: OrchestratorHandle) -> Result<thread::JoinHandle<()>> {
    let thread = thread::Builder::new()
        .name("event-logger".into())
        .spawn(move || {
            let mut last_line = String::new();
            while let Ok(event) = handle.recv_event() {
                match event {
                    PlayerEvent::StateChanged => {
                        let state = handle.state().snapshot();
                        let line = format!(
                            "{} {} - {} [{}]",
                            if state.is_playing { ">" } else { "||" },
                            state.playlist_name.as_deref().unwrap_or("-"),
                            state.song_name().unwrap_or("-"),
                            state.voice_mode,
                        );
                        if line != last_line {
                            info!("{}", line);
                            last_line = line;
                        }
                    }
                    PlayerEvent::Status(text) => info!("Status: {}", text),
                    PlayerEvent::Error(text) => warn!("Error: {}", text),
                    PlayerEvent::Shutdown => break,
                }
            }
        })?;
    Ok(thread)
}

fn read_input(
    handle: &OrchestratorHandle,
    line_tx: &Sender<String>,
    brightness: &ManualBrightness,
) -> Result<()> {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("Failed to read stdin")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let Some(gesture) = line.strip_prefix('/') else {
            line_tx.send(line.to_string())?;
            continue;
        };

        let mut parts = gesture.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let args: Vec<&str> = parts.collect();
        match (name, args.as_slice()) {
            ("toggle", []) => handle.toggle_play_pause()?,
            ("next", []) => handle.next()?,
            ("prev", []) => handle.previous()?,
            ("next-playlist", []) => handle.next_playlist()?,
            ("prev-playlist", []) => handle.previous_playlist()?,
            ("unlock", []) => handle.unlock_hidden_playlist()?,
            ("listen", []) => handle.start_listening()?,
            ("mute", []) => handle.stop_listening()?,
            ("seek", [fraction]) => match fraction.parse::<f64>() {
                Ok(fraction) => handle.seek(fraction)?,
                Err(_) => warn!("Bad seek fraction: {}", fraction),
            },
            ("select", [id, index]) => match (id.parse::<u32>(), index.parse::<usize>()) {
                (Ok(id), Ok(index)) => handle.select_song(id, index)?,
                _ => warn!("Usage: /select <playlist id> <index>"),
            },
            ("dark", [level]) => match level.parse::<f32>() {
                Ok(level) => brightness.set(level),
                Err(_) => warn!("Bad brightness: {}", level),
            },
            ("quit", []) => break,
            _ => warn!("Unknown gesture: /{}", gesture),
        }
    }
    Ok(())
}
