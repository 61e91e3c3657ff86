/*!
    Resampling engine.

    Wraps rubato for sample rate conversion, with channel remixing applied
    on the way in. The engine binds to one source shape at construction and
    keeps resampler state across calls, so a stream must use a single
    engine for its whole lifetime.
*/

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use tracing::{debug, trace};

use pcm_types::{AudioFrame, ChannelLayout, Error, Result};

use crate::fifo::SampleFifo;
use crate::mix::ChannelMixer;
use crate::sample;

const RESAMPLER_CHUNK_SIZE: usize = 1024;

/**
    Source stream parameters observed from the first frame.
*/
#[derive(Clone, Copy, Debug)]
pub struct SourceSpec {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Number of channels.
    pub channels: u16,
    /// Channel layout, if known.
    pub layout: Option<ChannelLayout>,
}

impl SourceSpec {
    /**
        Read the source parameters from a frame.
    */
    pub fn from_frame(frame: &AudioFrame) -> Self {
        Self {
            sample_rate: frame.sample_rate,
            channels: frame.channels,
            layout: frame.layout,
        }
    }
}

/**
    Converts frames from one source shape to a destination rate and layout.

    Input frames are decoded to planar f32, remixed to the destination
    layout, then resampled. Converted samples collect in an internal ready
    queue and are handed out in caller-sized slices, so one input frame may
    take several calls to fully drain.
*/
pub struct ResampleEngine {
    source_rate: u32,
    source_channels: u16,
    dest_rate: u32,
    dest_channels: u16,
    mixer: ChannelMixer,
    // None when source and destination rates match (passthrough)
    resampler: Option<SincFixedIn<f32>>,
    decode_buf: Vec<Vec<f32>>,
    mix_buf: Vec<Vec<f32>>,
    // Remixed samples waiting for a full resampler block
    accum: Vec<Vec<f32>>,
    // Converted samples not yet handed to the caller
    ready: SampleFifo,
    input_scratch: Vec<Vec<f32>>,
    output_scratch: Vec<Vec<f32>>,
}

impl std::fmt::Debug for ResampleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResampleEngine")
            .field("source_rate", &self.source_rate)
            .field("source_channels", &self.source_channels)
            .field("dest_rate", &self.dest_rate)
            .field("dest_channels", &self.dest_channels)
            .field("mixer", &self.mixer)
            .field("resampler", &self.resampler.is_some())
            .field("decode_buf", &self.decode_buf)
            .field("mix_buf", &self.mix_buf)
            .field("accum", &self.accum)
            .field("ready", &self.ready)
            .field("input_scratch", &self.input_scratch)
            .field("output_scratch", &self.output_scratch)
            .finish()
    }
}

impl ResampleEngine {
    /**
        Create an engine from observed source parameters and a destination
        rate and layout.

        A destination rate of 0 means "match the source rate". Fails when
        the source shape is unusable (zero rate, zero channels, or a
        channel count with no canonical layout).
    */
    pub fn new(source: &SourceSpec, dest_rate: u32, dest_layout: ChannelLayout) -> Result<Self> {
        if source.sample_rate == 0 {
            return Err(Error::initialization("source sample rate is zero"));
        }
        if source.channels == 0 {
            return Err(Error::initialization("source has zero channels"));
        }
        let source_layout = source
            .layout
            .or_else(|| ChannelLayout::default_for_channels(source.channels))
            .ok_or_else(|| {
                Error::initialization(format!(
                    "no canonical channel layout for {} channels",
                    source.channels
                ))
            })?;

        let dest_rate = if dest_rate == 0 {
            source.sample_rate
        } else {
            dest_rate
        };
        let dest_channels = dest_layout.channels();

        debug!(
            source_rate = source.sample_rate,
            dest_rate,
            source_channels = source.channels,
            dest_channels,
            "creating resampling engine"
        );

        let resampler = if source.sample_rate == dest_rate {
            None
        } else {
            let ratio = dest_rate as f64 / source.sample_rate as f64;
            // Lighter parameters for streaming conversion
            let params = SincInterpolationParameters {
                sinc_len: 64,
                f_cutoff: 0.95,
                interpolation: SincInterpolationType::Linear,
                oversampling_factor: 128,
                window: WindowFunction::BlackmanHarris2,
            };
            let resampler = SincFixedIn::<f32>::new(
                ratio,
                2.0,
                params,
                RESAMPLER_CHUNK_SIZE,
                dest_channels as usize,
            )
            .map_err(|e| Error::initialization(format!("failed to create resampler: {e}")))?;
            Some(resampler)
        };

        Ok(Self {
            source_rate: source.sample_rate,
            source_channels: source.channels,
            dest_rate,
            dest_channels,
            mixer: ChannelMixer::new(source_layout, dest_layout),
            resampler,
            decode_buf: vec![Vec::new(); source.channels as usize],
            mix_buf: vec![Vec::new(); dest_channels as usize],
            accum: vec![Vec::new(); dest_channels as usize],
            ready: SampleFifo::new(dest_channels),
            input_scratch: vec![Vec::new(); dest_channels as usize],
            output_scratch: vec![Vec::new(); dest_channels as usize],
        })
    }

    /**
        Returns the source sample rate the engine is bound to.
    */
    pub fn source_rate(&self) -> u32 {
        self.source_rate
    }

    /**
        Returns the resolved destination sample rate.
    */
    pub fn output_rate(&self) -> u32 {
        self.dest_rate
    }

    /**
        Returns the destination channel count.
    */
    pub fn output_channels(&self) -> u16 {
        self.dest_channels
    }

    /**
        Returns true if no rate conversion is performed.
    */
    pub fn is_passthrough(&self) -> bool {
        self.resampler.is_none()
    }

    /**
        Feed an input frame (or nothing) and drain up to `max` converted
        samples into `out`.

        With `Some(frame)`, the frame is decoded, remixed and resampled
        before draining. With `None`, only previously converted samples are
        drained. Returns the number of samples written per channel; `out`
        vectors are cleared first, and a return shorter than `max` means
        the ready queue is exhausted.

        The frame's declared sample rate is not re-checked against the
        bound source rate; the binding from construction stays in effect.
    */
    pub fn convert(
        &mut self,
        input: Option<&AudioFrame>,
        out: &mut [Vec<f32>],
        max: usize,
    ) -> Result<usize> {
        if let Some(frame) = input {
            if frame.channels != self.source_channels {
                return Err(Error::conversion(format!(
                    "frame has {} channels but engine is bound to {}",
                    frame.channels, self.source_channels
                )));
            }

            for buf in &mut self.decode_buf {
                buf.clear();
            }
            sample::decode_into_planar(frame, &mut self.decode_buf)?;
            self.mixer.remix(&self.decode_buf, frame.samples, &mut self.mix_buf);

            if self.resampler.is_none() {
                self.ready.push(&self.mix_buf, frame.samples);
            } else {
                for (accum, mixed) in self.accum.iter_mut().zip(&self.mix_buf) {
                    accum.extend_from_slice(mixed);
                }
                self.run_resampler()?;
            }

            trace!(
                input_samples = frame.samples,
                ready = self.ready.len(),
                "converted input frame"
            );
        }

        let count = max.min(self.ready.len());
        if count > 0 {
            self.ready.pop(count, out);
        } else {
            for buf in out.iter_mut() {
                buf.clear();
            }
        }
        Ok(count)
    }

    /**
        Resample and emit the samples still buffered below a full resampler
        block, zero-padding the final block.

        The output is trimmed to the portion corresponding to real input.
        Returns the number of samples added to the ready queue. No-op in
        passthrough mode, where nothing is ever buffered.
    */
    pub fn flush_tail(&mut self) -> Result<usize> {
        let Some(resampler) = self.resampler.as_mut() else {
            return Ok(0);
        };

        let buffered = self.accum[0].len();
        if buffered == 0 {
            return Ok(0);
        }

        let input_frames = resampler.input_frames_next();
        for accum in &mut self.accum {
            accum.resize(input_frames, 0.0);
        }

        debug!(buffered, padded_to = input_frames, "flushing resampler tail");

        let input_refs: Vec<&[f32]> = self.accum.iter().map(Vec::as_slice).collect();
        let output_frames = resampler.output_frames_next();
        for buf in &mut self.output_scratch {
            buf.resize(output_frames, 0.0);
        }
        let mut output_refs: Vec<&mut [f32]> = self
            .output_scratch
            .iter_mut()
            .map(Vec::as_mut_slice)
            .collect();

        let (_, out_len) = resampler
            .process_into_buffer(&input_refs, &mut output_refs, None)
            .map_err(|e| Error::conversion(format!("resampler flush failed: {e}")))?;

        let ratio = self.dest_rate as f64 / self.source_rate as f64;
        let keep = ((buffered as f64) * ratio).ceil() as usize;
        let keep = keep.min(out_len);

        self.ready.push(&self.output_scratch, keep);
        for accum in &mut self.accum {
            accum.clear();
        }
        Ok(keep)
    }

    /**
        Returns the number of converted samples waiting to be drained.
    */
    pub fn ready_len(&self) -> usize {
        self.ready.len()
    }

    /**
        Discard all buffered state, keeping the binding.
    */
    pub fn reset(&mut self) {
        for accum in &mut self.accum {
            accum.clear();
        }
        self.ready.clear();
        if let Some(resampler) = self.resampler.as_mut() {
            resampler.reset();
        }
    }

    /// Run complete resampler blocks out of the accumulation buffer.
    fn run_resampler(&mut self) -> Result<()> {
        let Some(resampler) = self.resampler.as_mut() else {
            return Ok(());
        };

        let input_frames = resampler.input_frames_next();
        while self.accum[0].len() >= input_frames {
            for (scratch, accum) in self.input_scratch.iter_mut().zip(&self.accum) {
                scratch.clear();
                scratch.extend_from_slice(&accum[..input_frames]);
            }
            let input_refs: Vec<&[f32]> = self.input_scratch.iter().map(Vec::as_slice).collect();

            let output_frames = resampler.output_frames_next();
            for buf in &mut self.output_scratch {
                buf.resize(output_frames, 0.0);
            }
            let mut output_refs: Vec<&mut [f32]> = self
                .output_scratch
                .iter_mut()
                .map(Vec::as_mut_slice)
                .collect();

            let (_, out_len) = resampler
                .process_into_buffer(&input_refs, &mut output_refs, None)
                .map_err(|e| Error::conversion(format!("resampler step failed: {e}")))?;

            self.ready.push(&self.output_scratch, out_len);
            for accum in &mut self.accum {
                accum.drain(..input_frames);
            }
        }

        Ok(())
    }
}
