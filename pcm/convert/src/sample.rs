/*!
    Sample format decoding and encoding.

    Conversion runs internally on planar f32; this module moves interleaved
    byte buffers in and out of that domain.
*/

use pcm_types::{AudioFrame, Error, Result, SampleFormat};

/**
    Decode an interleaved byte buffer into planar f32 channels.

    `planar` must have one Vec per channel; decoded samples are appended.
    Returns a conversion error when the buffer length does not match the
    frame's declared shape.
*/
pub fn decode_into_planar(frame: &AudioFrame, planar: &mut [Vec<f32>]) -> Result<()> {
    let channels = frame.channels as usize;
    debug_assert_eq!(planar.len(), channels);

    let expected = frame.expected_data_len();
    if frame.data.len() != expected {
        return Err(Error::conversion(format!(
            "frame data length {} does not match expected {} ({} samples, {} channels, {:?})",
            frame.data.len(),
            expected,
            frame.samples,
            frame.channels,
            frame.format,
        )));
    }

    match frame.format {
        SampleFormat::U8 => {
            for (i, &b) in frame.data.iter().enumerate() {
                planar[i % channels].push((b as f32 - 128.0) / 128.0);
            }
        }
        SampleFormat::S16 => {
            let samples: &[i16] = bytemuck::cast_slice(&frame.data);
            for (i, &s) in samples.iter().enumerate() {
                planar[i % channels].push(s as f32 / 32768.0);
            }
        }
        SampleFormat::S32 => {
            let samples: &[i32] = bytemuck::cast_slice(&frame.data);
            for (i, &s) in samples.iter().enumerate() {
                planar[i % channels].push(s as f32 / 2147483648.0);
            }
        }
        SampleFormat::F32 => {
            let samples: &[f32] = bytemuck::cast_slice(&frame.data);
            for (i, &s) in samples.iter().enumerate() {
                planar[i % channels].push(s);
            }
        }
        SampleFormat::F64 => {
            let samples: &[f64] = bytemuck::cast_slice(&frame.data);
            for (i, &s) in samples.iter().enumerate() {
                planar[i % channels].push(s as f32);
            }
        }
        _ => {
            return Err(Error::conversion(format!(
                "unsupported sample format {:?}",
                frame.format
            )));
        }
    }

    Ok(())
}

/**
    Encode planar f32 channels into an interleaved byte buffer.

    Reads `samples` samples from the front of each channel. Integer formats
    are clamped to their representable range before narrowing.
*/
pub fn encode_interleaved(planar: &[Vec<f32>], samples: usize, format: SampleFormat) -> Vec<u8> {
    let channels = planar.len();
    let mut out = Vec::with_capacity(samples * channels * format.bytes_per_sample());

    for i in 0..samples {
        for ch in planar {
            let s = ch[i];
            match format {
                SampleFormat::U8 => {
                    let v = (s * 128.0 + 128.0).clamp(0.0, 255.0);
                    out.push(v as u8);
                }
                SampleFormat::S16 => {
                    let v = (s * 32768.0).clamp(-32768.0, 32767.0);
                    out.extend_from_slice(&(v as i16).to_ne_bytes());
                }
                SampleFormat::S32 => {
                    let v = (s as f64 * 2147483648.0).clamp(-2147483648.0, 2147483647.0);
                    out.extend_from_slice(&(v as i32).to_ne_bytes());
                }
                SampleFormat::F32 => {
                    out.extend_from_slice(&s.to_ne_bytes());
                }
                SampleFormat::F64 => {
                    out.extend_from_slice(&(s as f64).to_ne_bytes());
                }
                _ => unreachable!("unsupported sample format {format:?}"),
            }
        }
    }

    out
}
