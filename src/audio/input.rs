//! Microphone capture using cpal
//!
//! The input stream lives on its own thread for as long as the tap is
//! installed. Its callback only downmixes and appends to the capture
//! buffer of the current recognition session. What reads that buffer is
//! up to the `SpeechRecognizer`; `ChannelRecognizer` takes its text from a
//! line feed and never looks at the captured audio.

use crate::audio::buffer::CaptureBuffer;
use crate::voice::MicrophoneTap;
use crate::{Result, TurnUpError};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{bounded, Sender};
use std::thread::{self, JoinHandle};
use tracing::{error, info, warn};

struct RunningTap {
    stop_tx: Sender<()>,
    thread: JoinHandle<()>,
}

/// Microphone tap on the default input device
#[derive(Default)]
pub struct CpalTap {
    running: Option<RunningTap>,
}

impl CpalTap {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MicrophoneTap for CpalTap {
    fn install(&mut self, buffer: CaptureBuffer) -> Result<()> {
        self.remove();

        let (ready_tx, ready_rx) = bounded::<Result<()>>(1);
        let (stop_tx, stop_rx) = bounded::<()>(1);

        let thread = thread::spawn(move || {
            let host = cpal::default_host();
            let Some(device) = host.default_input_device() else {
                let _ = ready_tx.send(Err(TurnUpError::AudioSessionConfigFailure(
                    "No input device available".into(),
                )));
                return;
            };

            let config: cpal::StreamConfig = match device.default_input_config() {
                Ok(config) => config.into(),
                Err(e) => {
                    let _ = ready_tx.send(Err(TurnUpError::AudioSessionConfigFailure(format!(
                        "Failed to get input config: {}",
                        e
                    ))));
                    return;
                }
            };
            let channels = config.channels as usize;

            let stream = device.build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if channels == 1 {
                        buffer.try_append(data);
                    } else {
                        let mono: Vec<f32> = data
                            .chunks(channels)
                            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
                            .collect();
                        buffer.try_append(&mono);
                    }
                },
                |err| error!("Audio input stream error: {}", err),
                None,
            );

            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    let _ = ready_tx.send(Err(TurnUpError::AudioSessionConfigFailure(format!(
                        "Failed to build input stream: {}",
                        e
                    ))));
                    return;
                }
            };

            if let Err(e) = stream.play() {
                let _ = ready_tx.send(Err(TurnUpError::AudioSessionConfigFailure(format!(
                    "Failed to start input stream: {}",
                    e
                ))));
                return;
            }

            info!("Microphone tap installed ({} Hz)", config.sample_rate.0);
            let _ = ready_tx.send(Ok(()));

            // Hold the stream until told to stop
            let _ = stop_rx.recv();
            drop(stream);
            info!("Microphone tap removed");
        });

        match ready_rx.recv() {
            Ok(Ok(())) => {
                self.running = Some(RunningTap { stop_tx, thread });
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(TurnUpError::AudioSessionConfigFailure(
                    "Microphone thread exited early".into(),
                ))
            }
        }
    }

    fn remove(&mut self) {
        if let Some(running) = self.running.take() {
            let _ = running.stop_tx.send(());
            if running.thread.join().is_err() {
                warn!("Microphone thread panicked");
            }
        }
    }
}

impl Drop for CpalTap {
    fn drop(&mut self) {
        self.remove();
    }
}
