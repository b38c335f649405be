//! Orchestration layer
//!
//! Connects the playback session, voice control, recognition and display
//! state on a single owning thread: Recognizer -> Interpreter -> Session -> UI

mod config;
mod orchestrator;

pub use config::{DisplayConfig, PlaybackConfig, StatusConfig, TurnUpConfig, VoiceConfig};
pub use orchestrator::{Orchestrator, OrchestratorComponents, OrchestratorHandle};
