use crate::state::{PlayerCommand, PlayerEvent};
use crate::voice::RecognitionEvent;
use crossbeam_channel::{bounded, Receiver, Sender};

/// Every channel the orchestrator selects over, plus its event output
pub struct OrchestratorChannels {
    pub command_tx: Sender<PlayerCommand>,
    pub command_rx: Receiver<PlayerCommand>,
    pub event_tx: Sender<PlayerEvent>,
    pub event_rx: Receiver<PlayerEvent>,
    pub recognition_tx: Sender<RecognitionEvent>,
    pub recognition_rx: Receiver<RecognitionEvent>,
    pub dark_mode_tx: Sender<bool>,
    pub dark_mode_rx: Receiver<bool>,
}

impl OrchestratorChannels {
    pub fn new(buffer_size: usize) -> Self {
        let buffer_size = buffer_size.max(1);
        let (command_tx, command_rx) = bounded(buffer_size);
        let (event_tx, event_rx) = bounded(buffer_size);
        let (recognition_tx, recognition_rx) = bounded(buffer_size);
        let (dark_mode_tx, dark_mode_rx) = bounded(buffer_size);

        Self {
            command_tx,
            command_rx,
            event_tx,
            event_rx,
            recognition_tx,
            recognition_rx,
            dark_mode_tx,
            dark_mode_rx,
        }
    }
}

impl Default for OrchestratorChannels {
    fn default() -> Self {
        Self::new(100)
    }
}
