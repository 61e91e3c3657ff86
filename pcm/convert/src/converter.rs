/*!
    Sample converter.

    Turns variably-sized decoded audio frames into fixed-size frames in a
    target format, layout and rate. Input goes through the resampling
    engine into a sample fifo; output frames are carved off the fifo at
    exactly the configured frame size.
*/

use tracing::{debug, trace};

use pcm_types::{AudioFrame, ChannelLayout, Error, Result, SampleFormat};

use crate::config::CodecConfig;
use crate::engine::{ResampleEngine, SourceSpec};
use crate::fifo::SampleFifo;
use crate::sample;

/**
    Sample counts reported by a single-shot conversion.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConversionCounts {
    /// Samples per channel in the returned frame.
    pub out_samples: usize,
    /// Samples per channel still buffered for later frames.
    pub cached_samples: usize,
}

/**
    Converts decoded audio frames to a fixed output shape.

    The output format, layout, rate and frame size are fixed at
    construction. The source shape is read from the first frame pushed;
    the resampling engine binds to it once and later frames are processed
    under that binding.

    Conversion is stateful. Input that does not fill a whole output frame
    stays buffered and is completed by later input, so a single input
    frame may produce zero, one or many output frames.
*/
#[derive(Debug)]
pub struct SampleConverter {
    dest_format: SampleFormat,
    dest_layout: ChannelLayout,
    // 0 until bound means "match the source rate"
    dest_rate: u32,
    samples_per_frame: usize,
    engine: Option<ResampleEngine>,
    fifo: SampleFifo,
    scratch: Vec<Vec<f32>>,
    pop_buf: Vec<Vec<f32>>,
}

impl SampleConverter {
    /**
        Create a converter with explicit destination parameters.

        A sample rate of 0 means "match the source rate" once the first
        frame arrives. The frame size must be nonzero.
    */
    pub fn new(
        format: SampleFormat,
        layout: ChannelLayout,
        samples_per_frame: usize,
        sample_rate: u32,
    ) -> Result<Self> {
        if samples_per_frame == 0 {
            return Err(Error::configuration("samples per frame is zero"));
        }
        let channels = layout.channels() as usize;
        Ok(Self {
            dest_format: format,
            dest_layout: layout,
            dest_rate: sample_rate,
            samples_per_frame,
            engine: None,
            fifo: SampleFifo::new(layout.channels()),
            scratch: vec![Vec::new(); channels],
            pop_buf: vec![Vec::new(); channels],
        })
    }

    /**
        Create a converter from a destination channel count.

        The count must have a canonical layout.
    */
    pub fn with_channels(
        format: SampleFormat,
        channels: u16,
        samples_per_frame: usize,
        sample_rate: u32,
    ) -> Result<Self> {
        let layout = ChannelLayout::default_for_channels(channels).ok_or_else(|| {
            Error::configuration(format!(
                "no canonical channel layout for {channels} channels"
            ))
        })?;
        Self::new(format, layout, samples_per_frame, sample_rate)
    }

    /**
        Create a converter whose output matches a codec's parameters.

        Fails when the codec is not an audio codec or its channel shape
        has no usable layout.
    */
    pub fn from_codec(config: &CodecConfig) -> Result<Self> {
        if !config.stream_type.is_audio() {
            return Err(Error::configuration("codec is not audio"));
        }
        if let Some(layout) = config.channel_layout {
            if layout.channels() != config.channels {
                return Err(Error::configuration(format!(
                    "codec reports {} channels but a {} channel layout",
                    config.channels,
                    layout.channels()
                )));
            }
        }
        let layout = config
            .channel_layout
            .or_else(|| ChannelLayout::default_for_channels(config.channels))
            .ok_or_else(|| {
                Error::configuration(format!(
                    "no canonical channel layout for {} channels",
                    config.channels
                ))
            })?;
        Self::new(
            config.sample_format,
            layout,
            config.frame_size,
            config.sample_rate,
        )
    }

    /**
        Create a converter whose output matches an existing frame's shape.
    */
    pub fn from_frame(frame: &AudioFrame) -> Result<Self> {
        let layout = frame.layout_or_default().ok_or_else(|| {
            Error::configuration(format!(
                "no canonical channel layout for {} channels",
                frame.channels
            ))
        })?;
        Self::new(frame.format, layout, frame.samples, frame.sample_rate)
    }

    /**
        Returns the output sample format.
    */
    pub fn output_format(&self) -> SampleFormat {
        self.dest_format
    }

    /**
        Returns the output channel layout.
    */
    pub fn output_layout(&self) -> ChannelLayout {
        self.dest_layout
    }

    /**
        Returns the output frame size in samples per channel.
    */
    pub fn samples_per_frame(&self) -> usize {
        self.samples_per_frame
    }

    /**
        Returns the output sample rate.

        Before the first frame binds the engine, a configured rate of 0
        is reported as-is; afterwards it resolves to the source rate.
    */
    pub fn output_rate(&self) -> u32 {
        self.engine
            .as_ref()
            .map_or(self.dest_rate, ResampleEngine::output_rate)
    }

    /**
        Returns the bound resampling engine, if the first frame has
        arrived.
    */
    pub fn engine(&self) -> Option<&ResampleEngine> {
        self.engine.as_ref()
    }

    /**
        Returns the number of samples per channel buffered for future
        output frames.
    */
    pub fn cached_samples(&self) -> usize {
        self.fifo.len()
    }

    /**
        Convert one input frame, yielding full output frames lazily.

        The input is consumed eagerly; the returned sequence pops frames
        off the fifo as it is iterated. Frames not taken stay buffered and
        come out of the next conversion's sequence. Only full frames are
        yielded; a trailing partial stays cached until completed by later
        input or emitted by [`flush`](Self::flush).

        Each yielded frame owns its sample data.
    */
    pub fn convert(&mut self, src: &AudioFrame) -> Result<Frames<'_>> {
        self.fifo_push(src)?;
        trace!(
            input_samples = src.samples,
            cached = self.fifo.len(),
            "converted frame into fifo"
        );
        Ok(Frames {
            converter: self,
            include_partial: false,
        })
    }

    /**
        Convert one input frame and return a single output frame.

        The frame holds at most one frame size worth of samples; whatever
        was buffered beyond that is reported as cached and carried over.
        When buffered input has not yet produced output (the resampler is
        still accumulating), the returned frame is empty.
    */
    pub fn convert_frame(&mut self, src: &AudioFrame) -> Result<(AudioFrame, ConversionCounts)> {
        self.fifo_push(src)?;

        let total = self.fifo.len();
        let count = total.min(self.samples_per_frame);
        self.fifo.pop(count, &mut self.pop_buf);
        let frame = self.emit_frame(count);

        Ok((
            frame,
            ConversionCounts {
                out_samples: count,
                cached_samples: total - count,
            },
        ))
    }

    /**
        Flush all buffered samples at end of stream.

        Drains the resampler tail into the fifo, then yields remaining
        full frames followed by one final short frame if a partial is
        left. After iterating the sequence to its end the converter holds
        no samples.
    */
    pub fn flush(&mut self) -> Result<Frames<'_>> {
        if let Some(engine) = self.engine.as_mut() {
            engine.flush_tail()?;
            loop {
                let n = engine.convert(None, &mut self.scratch, self.samples_per_frame)?;
                self.fifo.push(&self.scratch, n);
                if n < self.samples_per_frame {
                    break;
                }
            }
        }
        debug!(cached = self.fifo.len(), "flushing converter");
        Ok(Frames {
            converter: self,
            include_partial: true,
        })
    }

    /**
        Discard all buffered samples, keeping the configuration and the
        engine binding. Use when seeking.
    */
    pub fn reset(&mut self) {
        self.fifo.clear();
        if let Some(engine) = self.engine.as_mut() {
            engine.reset();
        }
    }

    /// Bind the engine on first input, then run the convert-and-drain
    /// loop until the engine hands back less than a full frame.
    fn fifo_push(&mut self, src: &AudioFrame) -> Result<()> {
        if self.engine.is_none() {
            let spec = SourceSpec::from_frame(src);
            self.engine = Some(ResampleEngine::new(
                &spec,
                self.dest_rate,
                self.dest_layout,
            )?);
        }

        let spf = self.samples_per_frame;
        if let Some(engine) = self.engine.as_mut() {
            let mut input = Some(src);
            loop {
                let n = engine.convert(input.take(), &mut self.scratch, spf)?;
                self.fifo.push(&self.scratch, n);
                if n < spf {
                    break;
                }
            }
        }
        Ok(())
    }

    /// Pop one frame off the fifo, or nothing when below a full frame
    /// (unless partials are allowed).
    fn pop_frame(&mut self, include_partial: bool) -> Option<AudioFrame> {
        let available = self.fifo.len();
        let count = if available >= self.samples_per_frame {
            self.samples_per_frame
        } else if include_partial && available > 0 {
            available
        } else {
            return None;
        };

        self.fifo.pop(count, &mut self.pop_buf);
        Some(self.emit_frame(count))
    }

    fn emit_frame(&self, samples: usize) -> AudioFrame {
        let data = sample::encode_interleaved(&self.pop_buf, samples, self.dest_format);
        AudioFrame::new(
            data,
            samples,
            self.output_rate(),
            self.dest_layout.channels(),
            Some(self.dest_layout),
            self.dest_format,
        )
    }
}

/**
    Lazy sequence of output frames borrowed from a converter.

    Each call to [`next`](Iterator::next) pops one frame off the
    converter's fifo. Dropping the sequence early leaves the remaining
    frames buffered in the converter.
*/
pub struct Frames<'a> {
    converter: &'a mut SampleConverter,
    include_partial: bool,
}

impl Iterator for Frames<'_> {
    type Item = AudioFrame;

    fn next(&mut self) -> Option<AudioFrame> {
        self.converter.pop_frame(self.include_partial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcm_types::StreamType;

    fn f32_frame(samples: &[f32], rate: u32, channels: u16) -> AudioFrame {
        AudioFrame::new(
            bytemuck::cast_slice(samples).to_vec(),
            samples.len() / channels as usize,
            rate,
            channels,
            None,
            SampleFormat::F32,
        )
    }

    fn stereo_passthrough(spf: usize) -> SampleConverter {
        SampleConverter::new(SampleFormat::F32, ChannelLayout::Stereo, spf, 44100).unwrap()
    }

    #[test]
    fn rejects_zero_samples_per_frame() {
        let err =
            SampleConverter::new(SampleFormat::F32, ChannelLayout::Stereo, 0, 44100).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn with_channels_requires_canonical_layout() {
        let converter = SampleConverter::with_channels(SampleFormat::F32, 2, 1024, 44100).unwrap();
        assert_eq!(converter.output_layout(), ChannelLayout::Stereo);

        let err = SampleConverter::with_channels(SampleFormat::F32, 5, 1024, 44100).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn from_codec_rejects_video() {
        let mut config = CodecConfig::audio(SampleFormat::F32, ChannelLayout::Stereo, 1024, 44100);
        config.stream_type = StreamType::Video;

        let err = SampleConverter::from_codec(&config).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn from_codec_rejects_contradictory_layout() {
        let mut config = CodecConfig::audio(SampleFormat::F32, ChannelLayout::Stereo, 1024, 44100);
        config.channels = 6;

        let err = SampleConverter::from_codec(&config).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn from_codec_takes_codec_shape() {
        let config = CodecConfig::audio(SampleFormat::S16, ChannelLayout::Mono, 512, 22050);
        let converter = SampleConverter::from_codec(&config).unwrap();
        assert_eq!(converter.output_format(), SampleFormat::S16);
        assert_eq!(converter.output_layout(), ChannelLayout::Mono);
        assert_eq!(converter.samples_per_frame(), 512);
    }

    #[test]
    fn from_frame_takes_frame_shape() {
        let frame = f32_frame(&[0.0; 2048], 48000, 2);
        let converter = SampleConverter::from_frame(&frame).unwrap();
        assert_eq!(converter.samples_per_frame(), 1024);
        assert_eq!(converter.output_layout(), ChannelLayout::Stereo);
        assert_eq!(converter.output_rate(), 48000);
    }

    #[test]
    fn passthrough_rechunks_exactly() {
        let mut converter = stereo_passthrough(1024);

        // 2048 input samples come out as exactly two full frames
        let input: Vec<f32> = (0..2048 * 2).map(|i| (i as f32) / 8192.0).collect();
        let frame = f32_frame(&input, 44100, 2);

        let frames: Vec<AudioFrame> = converter.convert(&frame).unwrap().collect();
        assert_eq!(frames.len(), 2);
        for out in &frames {
            assert_eq!(out.samples, 1024);
            assert_eq!(out.channels, 2);
            assert_eq!(out.sample_rate, 44100);
            assert_eq!(out.format, SampleFormat::F32);
        }
        assert_eq!(converter.cached_samples(), 0);

        // Identity conversion preserves the data byte for byte
        let rejoined: Vec<u8> = frames.iter().flat_map(|f| f.data.clone()).collect();
        assert_eq!(rejoined, frame.data);
    }

    #[test]
    fn matching_shape_is_one_to_one_and_identical() {
        let mut converter = stereo_passthrough(1024);

        let input: Vec<f32> = (0..1024 * 2).map(|i| (i as f32).sin()).collect();
        let frame = f32_frame(&input, 44100, 2);

        let frames: Vec<AudioFrame> = converter.convert(&frame).unwrap().collect();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, frame.data);
        assert_eq!(converter.cached_samples(), 0);
    }

    #[test]
    fn partial_input_is_retained_and_completed() {
        let mut converter = stereo_passthrough(1024);

        let frame = f32_frame(&vec![0.5; 1536 * 2], 44100, 2);
        let frames: Vec<AudioFrame> = converter.convert(&frame).unwrap().collect();
        assert_eq!(frames.len(), 1);
        assert_eq!(converter.cached_samples(), 512);

        // The next 512 samples complete the buffered partial
        let frame = f32_frame(&vec![0.5; 512 * 2], 44100, 2);
        let frames: Vec<AudioFrame> = converter.convert(&frame).unwrap().collect();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].samples, 1024);
        assert_eq!(converter.cached_samples(), 0);
    }

    #[test]
    fn small_inputs_accumulate_until_full_frame() {
        let mut converter = stereo_passthrough(1024);

        for _ in 0..3 {
            let frame = f32_frame(&vec![0.1; 256 * 2], 44100, 2);
            assert_eq!(converter.convert(&frame).unwrap().count(), 0);
        }
        assert_eq!(converter.cached_samples(), 768);

        let frame = f32_frame(&vec![0.1; 256 * 2], 44100, 2);
        let frames: Vec<AudioFrame> = converter.convert(&frame).unwrap().collect();
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn unconsumed_frames_survive_into_next_call() {
        let mut converter = stereo_passthrough(512);

        let frame = f32_frame(&vec![0.2; 1536 * 2], 44100, 2);
        {
            // Take only one of the three available frames
            let mut frames = converter.convert(&frame).unwrap();
            assert!(frames.next().is_some());
        }
        assert_eq!(converter.cached_samples(), 1024);

        let frame = f32_frame(&vec![0.2; 512 * 2], 44100, 2);
        let frames: Vec<AudioFrame> = converter.convert(&frame).unwrap().collect();
        assert_eq!(frames.len(), 3);
    }

    #[test]
    fn convert_frame_reports_counts() {
        let mut converter = stereo_passthrough(1024);

        let frame = f32_frame(&vec![0.3; 1536 * 2], 44100, 2);
        let (out, counts) = converter.convert_frame(&frame).unwrap();
        assert_eq!(out.samples, 1024);
        assert_eq!(
            counts,
            ConversionCounts {
                out_samples: 1024,
                cached_samples: 512,
            }
        );

        let frame = f32_frame(&vec![0.3; 512 * 2], 44100, 2);
        let (out, counts) = converter.convert_frame(&frame).unwrap();
        assert_eq!(out.samples, 1024);
        assert_eq!(counts.cached_samples, 0);
    }

    #[test]
    fn convert_frame_can_be_empty_while_accumulating() {
        let mut converter =
            SampleConverter::new(SampleFormat::F32, ChannelLayout::Stereo, 2048, 44100).unwrap();

        // 48k -> 44.1k engine needs a full resampler block before any output
        let frame = f32_frame(&vec![0.1; 512 * 2], 48000, 2);
        let (out, counts) = converter.convert_frame(&frame).unwrap();
        assert_eq!(out.samples, 0);
        assert!(out.data.is_empty());
        assert_eq!(counts.out_samples, 0);
    }

    #[test]
    fn flush_emits_trailing_partial() {
        let mut converter = stereo_passthrough(1024);

        let frame = f32_frame(&vec![0.4; 1536 * 2], 44100, 2);
        let frames: Vec<AudioFrame> = converter.convert(&frame).unwrap().collect();
        assert_eq!(frames.len(), 1);

        let frames: Vec<AudioFrame> = converter.flush().unwrap().collect();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].samples, 512);
        assert_eq!(converter.cached_samples(), 0);
    }

    #[test]
    fn flush_on_empty_converter_yields_nothing() {
        let mut converter = stereo_passthrough(1024);
        assert_eq!(converter.flush().unwrap().count(), 0);
    }

    #[test]
    fn binding_is_idempotent() {
        let mut converter = stereo_passthrough(1024);

        let frame = f32_frame(&vec![0.1; 1024 * 2], 44100, 2);
        let _ = converter.convert(&frame).unwrap().count();
        assert!(converter.engine().unwrap().is_passthrough());

        // A later frame declaring a different rate is still processed
        // under the first binding
        let frame = f32_frame(&vec![0.1; 1024 * 2], 48000, 2);
        let frames: Vec<AudioFrame> = converter.convert(&frame).unwrap().collect();
        assert_eq!(frames.len(), 1);
        assert!(converter.engine().unwrap().is_passthrough());
        assert_eq!(converter.engine().unwrap().source_rate(), 44100);
    }

    #[test]
    fn zero_rate_binds_to_source_rate() {
        let mut converter =
            SampleConverter::new(SampleFormat::F32, ChannelLayout::Stereo, 1024, 0).unwrap();
        assert_eq!(converter.output_rate(), 0);

        let frame = f32_frame(&vec![0.1; 1024 * 2], 48000, 2);
        let frames: Vec<AudioFrame> = converter.convert(&frame).unwrap().collect();
        assert_eq!(converter.output_rate(), 48000);
        assert_eq!(frames[0].sample_rate, 48000);
    }

    #[test]
    fn converts_sample_format() {
        let mut converter =
            SampleConverter::new(SampleFormat::F32, ChannelLayout::Mono, 4, 44100).unwrap();

        let values = [16384i16, -16384, 32767, 0];
        let data: Vec<u8> = values.iter().flat_map(|v| v.to_ne_bytes()).collect();
        let frame = AudioFrame::new(
            data,
            4,
            44100,
            1,
            Some(ChannelLayout::Mono),
            SampleFormat::S16,
        );

        let frames: Vec<AudioFrame> = converter.convert(&frame).unwrap().collect();
        assert_eq!(frames.len(), 1);
        let out: &[f32] = bytemuck::cast_slice(&frames[0].data);
        assert!((out[0] - 0.5).abs() < 1e-4);
        assert!((out[1] + 0.5).abs() < 1e-4);
        assert!(out[2] < 1.0 && out[2] > 0.999);
        assert_eq!(out[3], 0.0);
    }

    #[test]
    fn resamples_across_rates_with_flush() {
        let mut converter =
            SampleConverter::new(SampleFormat::F32, ChannelLayout::Stereo, 1024, 44100).unwrap();

        let mut total = 0;
        for _ in 0..10 {
            let frame = f32_frame(&vec![0.1; 1024 * 2], 48000, 2);
            for out in converter.convert(&frame).unwrap() {
                total += out.samples;
            }
        }
        for out in converter.flush().unwrap() {
            total += out.samples;
        }

        let expected = (10.0 * 1024.0 * 44100.0 / 48000.0) as usize;
        let tolerance = 2048;
        assert!(
            total + tolerance >= expected && total <= expected + tolerance,
            "output {total} not within {tolerance} of expected {expected}"
        );
        assert_eq!(converter.cached_samples(), 0);
    }

    #[test]
    fn reset_discards_buffered_samples() {
        let mut converter = stereo_passthrough(1024);

        let frame = f32_frame(&vec![0.1; 512 * 2], 44100, 2);
        let _ = converter.convert(&frame).unwrap().count();
        assert_eq!(converter.cached_samples(), 512);

        converter.reset();
        assert_eq!(converter.cached_samples(), 0);
        assert_eq!(converter.flush().unwrap().count(), 0);

        // Binding survives the reset
        assert!(converter.engine().is_some());
    }

    #[test]
    fn remixes_layout_from_inferred_source() {
        let mut converter =
            SampleConverter::new(SampleFormat::F32, ChannelLayout::Stereo, 8, 44100).unwrap();

        // Mono source with no declared layout fans out to both channels
        let frame = f32_frame(&[0.5; 8], 44100, 1);
        let frames: Vec<AudioFrame> = converter.convert(&frame).unwrap().collect();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].channels, 2);
        let out: &[f32] = bytemuck::cast_slice(&frames[0].data);
        assert!(out.iter().all(|&s| s == 0.5));
    }
}
