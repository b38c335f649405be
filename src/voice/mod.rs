//! Voice control: keyword commands, title lookup and recognition sessions

pub mod command;
pub mod interpreter;
pub mod recognition;
pub mod recognizer;

pub use command::VoiceCommand;
pub use interpreter::{
    Interpretation, InterpreterMode, VoiceInterpreter, DEFAULT_TITLE_TIMEOUT,
    NOTHING_RECOGNIZED_STATUS, PROMPT_STATUS,
};
pub use recognition::{
    AuthorizationStatus, MicrophoneTap, NoopTap, RecognitionEvent, RecognitionSupervisor,
    SessionId, SpeechRecognizer, SupervisorState, DEFAULT_RESTART_DELAY,
};
pub use recognizer::ChannelRecognizer;
