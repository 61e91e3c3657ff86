/*!
    Codec parameter description.
*/

use pcm_types::{ChannelLayout, SampleFormat, StreamType};

/**
    Parameters of a decoded stream, as reported by its codec.

    Describes the shape of the frames a decoder produces. Converters built
    from a codec take their destination parameters from here instead of
    being spelled out field by field.
*/
#[derive(Clone, Debug)]
pub struct CodecConfig {
    /// Type of stream this codec decodes.
    pub stream_type: StreamType,
    /// Sample format of decoded frames.
    pub sample_format: SampleFormat,
    /// Number of channels.
    pub channels: u16,
    /// Channel layout, if the codec reports one.
    pub channel_layout: Option<ChannelLayout>,
    /// Samples per frame the codec produces (0 if variable).
    pub frame_size: usize,
    /// Sample rate in Hz.
    pub sample_rate: u32,
}

impl CodecConfig {
    /**
        Create a codec config for an audio stream.
    */
    pub fn audio(
        sample_format: SampleFormat,
        channel_layout: ChannelLayout,
        frame_size: usize,
        sample_rate: u32,
    ) -> Self {
        Self {
            stream_type: StreamType::Audio,
            sample_format,
            channels: channel_layout.channels(),
            channel_layout: Some(channel_layout),
            frame_size,
            sample_rate,
        }
    }

    /**
        Create a codec config for an audio stream with a raw channel count.

        Use when the codec reports a channel count but no layout.
    */
    pub fn audio_with_channels(
        sample_format: SampleFormat,
        channels: u16,
        frame_size: usize,
        sample_rate: u32,
    ) -> Self {
        Self {
            stream_type: StreamType::Audio,
            sample_format,
            channels,
            channel_layout: ChannelLayout::default_for_channels(channels),
            frame_size,
            sample_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_config_carries_layout_channels() {
        let config = CodecConfig::audio(SampleFormat::F32, ChannelLayout::Stereo, 1024, 48000);
        assert_eq!(config.stream_type, StreamType::Audio);
        assert_eq!(config.channels, 2);
        assert_eq!(config.channel_layout, Some(ChannelLayout::Stereo));
    }

    #[test]
    fn audio_config_from_channel_count() {
        let config = CodecConfig::audio_with_channels(SampleFormat::S16, 6, 1024, 44100);
        assert_eq!(config.channel_layout, Some(ChannelLayout::Surround51));

        // 5 channels has no canonical layout
        let config = CodecConfig::audio_with_channels(SampleFormat::S16, 5, 1024, 44100);
        assert_eq!(config.channel_layout, None);
        assert_eq!(config.channels, 5);
    }
}
