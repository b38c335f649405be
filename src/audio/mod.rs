//! Audio plumbing: capture buffer, resource store and playback outputs

pub mod buffer;
#[cfg(feature = "audio-io")]
pub mod device;
#[cfg(feature = "audio-io")]
pub mod input;
pub mod output;
pub mod store;
pub mod wav;

pub use buffer::CaptureBuffer;
#[cfg(feature = "audio-io")]
pub use device::RodioOutput;
#[cfg(feature = "audio-io")]
pub use input::CpalTap;
pub use output::{AudioOutput, CompletionHandler, SimulatedOutput, TrackId};
pub use store::{AudioStore, DecodedTrack, DirectoryAudioStore, MemoryAudioStore};
pub use wav::{read_wav, write_wav};
