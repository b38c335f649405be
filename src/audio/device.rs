//! Speaker output using rodio
//!
//! The output stream is not `Send`, so it lives on its own thread until
//! the output is dropped. Sinks are created from the stream handle.

use crate::audio::output::{AudioOutput, CompletionHandler, TrackId};
use crate::audio::store::DecodedTrack;
use crate::{Result, TurnUpError};
use crossbeam_channel::{bounded, Sender};
use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, OutputStreamHandle, Sink};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

struct LoadedSink {
    id: TrackId,
    sink: Sink,
    track: DecodedTrack,
    completed: bool,
}

impl LoadedSink {
    fn append_track(&self) {
        self.sink.append(SamplesBuffer::new(
            self.track.channels,
            self.track.sample_rate,
            self.track.samples.as_ref().clone(),
        ));
    }

    /// Queue the samples again after the sink drained
    fn rearm(&mut self) {
        if !self.completed {
            return;
        }
        debug!("Refilling sink {}", self.id);
        self.sink.pause();
        self.append_track();
        self.completed = false;
    }
}

struct StreamThread {
    stop_tx: Sender<()>,
    thread: JoinHandle<()>,
}

/// Plays decoded tracks on the default output device
pub struct RodioOutput {
    handle: OutputStreamHandle,
    stream: Option<StreamThread>,
    current: Option<LoadedSink>,
    next_id: TrackId,
    handler: Option<CompletionHandler>,
}

impl RodioOutput {
    /// Open the default output device
    pub fn new() -> Result<Self> {
        let (ready_tx, ready_rx) = bounded::<Result<OutputStreamHandle>>(1);
        let (stop_tx, stop_rx) = bounded::<()>(1);

        let thread = thread::Builder::new()
            .name("audio-output".into())
            .spawn(move || {
                let (stream, handle) = match OutputStream::try_default() {
                    Ok(pair) => pair,
                    Err(e) => {
                        let _ = ready_tx.send(Err(TurnUpError::AudioDeviceError(format!(
                            "Failed to open output stream: {}",
                            e
                        ))));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(handle));

                let _ = stop_rx.recv();
                drop(stream);
                info!("Audio output device closed");
            })?;

        let handle = match ready_rx.recv() {
            Ok(Ok(handle)) => handle,
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(e);
            }
            Err(_) => {
                let _ = thread.join();
                return Err(TurnUpError::AudioDeviceError(
                    "Output thread exited early".into(),
                ));
            }
        };

        info!("Audio output device opened");
        Ok(Self {
            handle,
            stream: Some(StreamThread { stop_tx, thread }),
            current: None,
            next_id: 1,
            handler: None,
        })
    }
}

impl Drop for RodioOutput {
    fn drop(&mut self) {
        if let Some(current) = self.current.take() {
            current.sink.stop();
        }
        if let Some(stream) = self.stream.take() {
            let _ = stream.stop_tx.send(());
            let _ = stream.thread.join();
        }
    }
}

impl AudioOutput for RodioOutput {
    fn set_completion_handler(&mut self, handler: CompletionHandler) {
        self.handler = Some(handler);
    }

    fn load(&mut self, track: DecodedTrack) -> Result<TrackId> {
        let sink = Sink::try_new(&self.handle)
            .map_err(|e| TurnUpError::AudioDeviceError(format!("Failed to create sink: {}", e)))?;
        sink.pause();
        let duration = track.duration();
        let loaded = LoadedSink {
            id: self.next_id,
            sink,
            track,
            completed: false,
        };
        loaded.append_track();

        if let Some(previous) = self.current.take() {
            previous.sink.stop();
        }

        let id = loaded.id;
        self.next_id += 1;
        debug!(
            "Loaded {} ({:.1}s) into sink {}",
            loaded.track.resource,
            duration.as_secs_f64(),
            id
        );
        self.current = Some(loaded);
        Ok(id)
    }

    fn is_loaded(&self) -> bool {
        self.current.is_some()
    }

    fn play(&mut self) {
        if let Some(current) = self.current.as_mut() {
            current.rearm();
            current.sink.play();
        }
    }

    fn pause(&mut self) {
        if let Some(current) = self.current.as_ref() {
            current.sink.pause();
        }
    }

    fn is_playing(&self) -> bool {
        self.current
            .as_ref()
            .map(|c| !c.sink.is_paused() && !c.sink.empty())
            .unwrap_or(false)
    }

    fn position(&self) -> Duration {
        self.current
            .as_ref()
            .map(|c| c.sink.get_pos().min(c.track.duration()))
            .unwrap_or_default()
    }

    fn duration(&self) -> Duration {
        self.current.as_ref().map(|c| c.track.duration()).unwrap_or_default()
    }

    fn seek(&mut self, position: Duration) {
        if let Some(current) = self.current.as_mut() {
            current.rearm();
            if let Err(e) = current.sink.try_seek(position.min(current.track.duration())) {
                warn!("Seek failed: {}", e);
            }
        }
    }

    fn poll(&mut self) {
        let Some(current) = self.current.as_mut() else {
            return;
        };
        if current.completed || !current.sink.empty() {
            return;
        }
        current.completed = true;
        let id = current.id;
        debug!("Sink {} drained", id);
        if let Some(handler) = self.handler.as_mut() {
            handler(id);
        }
    }
}
