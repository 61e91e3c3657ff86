/*!
    Audio frame type.
*/

use crate::{ChannelLayout, SampleFormat};

/**
    A buffer of audio samples.

    Contains raw sample data in the format specified by `format`.
    Samples are interleaved for multi-channel audio.

    The shape of a frame (format, channels, rate) is fixed at construction;
    the sample contents are not. Frames own their data exclusively, and
    ownership transfers when a frame is yielded or returned.
*/
#[derive(Clone, Debug)]
pub struct AudioFrame {
    /**
        Raw sample data as bytes.

        Interpret according to `format` and `channels`.
        For interleaved stereo F32: [L0, R0, L1, R1, ...]
    */
    pub data: Vec<u8>,
    /**
        Number of samples per channel.
    */
    pub samples: usize,
    /**
        Sample rate in Hz.
    */
    pub sample_rate: u32,
    /**
        Number of channels.
    */
    pub channels: u16,
    /**
        Channel layout, if known.

        Decoders do not always report one; consumers that need a layout
        should fall back to [`layout_or_default`](Self::layout_or_default).
    */
    pub layout: Option<ChannelLayout>,
    /**
        Sample format.
    */
    pub format: SampleFormat,
}

impl AudioFrame {
    /**
        Create a new audio frame.
    */
    pub fn new(
        data: Vec<u8>,
        samples: usize,
        sample_rate: u32,
        channels: u16,
        layout: Option<ChannelLayout>,
        format: SampleFormat,
    ) -> Self {
        Self {
            data,
            samples,
            sample_rate,
            channels,
            layout,
            format,
        }
    }

    /**
        Create a zero-filled frame of the given shape.

        For integer formats the zero byte pattern is the format's silence
        value except U8, where silence is the midpoint 128.
    */
    pub fn silent(
        samples: usize,
        sample_rate: u32,
        layout: ChannelLayout,
        format: SampleFormat,
    ) -> Self {
        let channels = layout.channels();
        let len = samples * channels as usize * format.bytes_per_sample();
        let fill = match format {
            SampleFormat::U8 => 0x80,
            _ => 0,
        };
        Self {
            data: vec![fill; len],
            samples,
            sample_rate,
            channels,
            layout: Some(layout),
            format,
        }
    }

    /**
        Returns the frame's channel layout, deriving the canonical default
        from the channel count when none was set.

        Returns `None` only when the channel count has no canonical layout.
    */
    pub fn layout_or_default(&self) -> Option<ChannelLayout> {
        self.layout
            .or_else(|| ChannelLayout::default_for_channels(self.channels))
    }

    /**
        Returns the duration of this frame based on sample count and rate.
    */
    pub fn duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(self.samples as f64 / self.sample_rate as f64)
    }

    /**
        Returns the total number of samples (samples per channel * channels).
    */
    pub fn total_samples(&self) -> usize {
        self.samples * self.channels as usize
    }

    /**
        Returns the expected data length in bytes.
    */
    pub fn expected_data_len(&self) -> usize {
        self.total_samples() * self.format.bytes_per_sample()
    }
}

// Ensure frames are Send + Sync
static_assertions::assert_impl_all!(AudioFrame: Send, Sync);
