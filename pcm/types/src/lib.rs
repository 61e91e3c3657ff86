/*!
    Shared types for the pcm crate ecosystem.

    This crate defines the vocabulary of the ecosystem — the types that cross
    crate boundaries. It is dependency-light so consumers can depend on it
    without pulling in any DSP machinery.

    # Core Types

    - [`AudioFrame`] - Decoded audio sample data
    - [`SampleFormat`] - Audio sample formats
    - [`ChannelLayout`] - Audio channel layouts
    - [`StreamType`] - Video or audio stream type

    # Error Handling

    - [`Error`] and [`Result`] - Common error types
*/

mod error;
mod format;
mod frame;
mod stream;

pub use error::{Error, Result};
pub use format::{ChannelLayout, SampleFormat};
pub use frame::AudioFrame;
pub use stream::StreamType;
