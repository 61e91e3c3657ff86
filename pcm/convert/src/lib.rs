/*!
    Audio sample conversion for the pcm crate ecosystem.

    This crate converts decoded audio frames between shapes:
    - **Rate**: resampling between arbitrary sample rates
    - **Layout**: channel remixing (mono fan-out, stereo fold-down, ...)
    - **Format**: sample format conversion (S16 → F32, etc.)
    - **Framing**: re-chunking variably-sized input into fixed-size frames

    This is the "adapter" layer between a decoder and a consumer with
    fixed expectations. Decoders output frames in whatever shape the
    codec specifies; this crate converts them to the shape consumers
    need, at exactly the frame size they ask for.

    # Streaming Conversion

    ```ignore
    use pcm_convert::SampleConverter;
    use pcm_types::{ChannelLayout, SampleFormat};

    // Convert any audio to 44.1kHz stereo F32 in 1024-sample frames
    let mut converter =
        SampleConverter::new(SampleFormat::F32, ChannelLayout::Stereo, 1024, 44100)?;

    for frame in decoded_frames {
        for out in converter.convert(&frame)? {
            // Each `out` is exactly 1024 samples
        }
    }

    // Emit buffered samples at end of stream, including a short final frame
    for out in converter.flush()? {
        // Send final samples
    }
    ```

    # Single-Shot Conversion

    [`SampleConverter::convert_frame`] returns one output frame per call
    together with the number of samples carried over, for callers that
    drive the converter frame by frame instead of draining a sequence.

    # Lazy Initialization

    The converter binds its resampling engine to the source shape of the
    first frame it sees. This allows creating converters before knowing
    the exact input format. The binding then holds for the converter's
    lifetime; later frames are processed under it.

    # Statefulness

    Conversion is stateful: input that does not fill a whole output frame
    stays buffered, and the resampler maintains filter history. Frames
    must be processed in order, `flush()` must be called at end of stream
    to retrieve buffered samples, and `reset()` after seeking.
*/

pub use pcm_types::{AudioFrame, ChannelLayout, Error, Result, SampleFormat, StreamType};

mod config;
mod converter;
mod engine;
mod fifo;
mod mix;
mod sample;

pub use config::CodecConfig;
pub use converter::{ConversionCounts, Frames, SampleConverter};
pub use engine::{ResampleEngine, SourceSpec};
