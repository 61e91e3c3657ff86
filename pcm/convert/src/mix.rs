/*!
    Channel layout remixing.
*/

use pcm_types::ChannelLayout;

const FRONT_CENTER_GAIN: f32 = std::f32::consts::FRAC_1_SQRT_2;

/**
    Remixes planar samples from one channel layout to another.

    The mix is a fixed per-destination-channel weighting of source channels,
    chosen once at construction from the layout pair.
*/
#[derive(Debug)]
pub struct ChannelMixer {
    // weights[dst][src], applied as a plain weighted sum
    weights: Vec<Vec<f32>>,
}

impl ChannelMixer {
    /**
        Create a mixer between two layouts.
    */
    pub fn new(source: ChannelLayout, dest: ChannelLayout) -> Self {
        Self {
            weights: mix_weights(source, dest),
        }
    }

    /**
        Remix `count` planar samples into `out`.

        `out` vectors are cleared first and refilled with `count` samples
        per destination channel.
    */
    pub fn remix(&self, planar: &[Vec<f32>], count: usize, out: &mut [Vec<f32>]) {
        debug_assert_eq!(out.len(), self.weights.len());
        for (dest, row) in out.iter_mut().zip(&self.weights) {
            dest.clear();
            for i in 0..count {
                let mut sample = 0.0;
                for (src, &weight) in planar.iter().zip(row) {
                    if weight != 0.0 {
                        sample += src[i] * weight;
                    }
                }
                dest.push(sample);
            }
        }
    }
}

/**
    Builds the mixing matrix for a layout pair.

    Identity when the layouts match. Mono fans out to every destination
    channel; mixing down to mono averages all source channels. 5.1 and 7.1
    fold to stereo with the front center at -3 dB into both sides and the
    LFE dropped. Remaining pairs map channels by index and zero-fill.
*/
fn mix_weights(source: ChannelLayout, dest: ChannelLayout) -> Vec<Vec<f32>> {
    let src_n = source.channels() as usize;
    let dst_n = dest.channels() as usize;

    if source == dest {
        return (0..dst_n)
            .map(|d| (0..src_n).map(|s| if s == d { 1.0 } else { 0.0 }).collect())
            .collect();
    }

    match (source, dest) {
        (ChannelLayout::Mono, _) => vec![vec![1.0]; dst_n],
        (_, ChannelLayout::Mono) => {
            vec![vec![1.0 / src_n as f32; src_n]]
        }
        (ChannelLayout::Surround51, ChannelLayout::Stereo) => {
            // FL FR FC LFE BL BR
            vec![
                vec![1.0, 0.0, FRONT_CENTER_GAIN, 0.0, FRONT_CENTER_GAIN, 0.0],
                vec![0.0, 1.0, FRONT_CENTER_GAIN, 0.0, 0.0, FRONT_CENTER_GAIN],
            ]
        }
        (ChannelLayout::Surround71, ChannelLayout::Stereo) => {
            // FL FR FC LFE BL BR SL SR
            vec![
                vec![
                    1.0,
                    0.0,
                    FRONT_CENTER_GAIN,
                    0.0,
                    FRONT_CENTER_GAIN,
                    0.0,
                    FRONT_CENTER_GAIN,
                    0.0,
                ],
                vec![
                    0.0,
                    1.0,
                    FRONT_CENTER_GAIN,
                    0.0,
                    0.0,
                    FRONT_CENTER_GAIN,
                    0.0,
                    FRONT_CENTER_GAIN,
                ],
            ]
        }
        (ChannelLayout::Quad, ChannelLayout::Stereo) => {
            // FL FR BL BR, averaging front and back per side
            vec![vec![0.5, 0.0, 0.5, 0.0], vec![0.0, 0.5, 0.0, 0.5]]
        }
        _ => (0..dst_n)
            .map(|d| {
                (0..src_n)
                    .map(|s| if s == d && d < src_n { 1.0 } else { 0.0 })
                    .collect()
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_when_layouts_match() {
        let mixer = ChannelMixer::new(ChannelLayout::Stereo, ChannelLayout::Stereo);

        let planar = vec![vec![0.1f32, 0.2], vec![-0.1f32, -0.2]];
        let mut out = vec![Vec::new(), Vec::new()];
        mixer.remix(&planar, 2, &mut out);
        assert_eq!(out, planar);
    }

    #[test]
    fn mono_to_stereo_duplicates() {
        let mixer = ChannelMixer::new(ChannelLayout::Mono, ChannelLayout::Stereo);
        let planar = vec![vec![0.5f32, -0.5]];
        let mut out = vec![Vec::new(), Vec::new()];
        mixer.remix(&planar, 2, &mut out);

        assert_eq!(out[0], vec![0.5, -0.5]);
        assert_eq!(out[1], vec![0.5, -0.5]);
    }

    #[test]
    fn stereo_to_mono_averages() {
        let mixer = ChannelMixer::new(ChannelLayout::Stereo, ChannelLayout::Mono);
        let planar = vec![vec![1.0f32, 0.0], vec![0.0f32, 1.0]];
        let mut out = vec![Vec::new()];
        mixer.remix(&planar, 2, &mut out);

        assert_eq!(out[0], vec![0.5, 0.5]);
    }

    #[test]
    fn surround51_to_stereo_folds_center() {
        let mixer = ChannelMixer::new(ChannelLayout::Surround51, ChannelLayout::Stereo);
        // Only the front center carries signal
        let planar = vec![
            vec![0.0f32],
            vec![0.0f32],
            vec![1.0f32],
            vec![1.0f32], // LFE must be dropped
            vec![0.0f32],
            vec![0.0f32],
        ];
        let mut out = vec![Vec::new(), Vec::new()];
        mixer.remix(&planar, 1, &mut out);

        assert!((out[0][0] - FRONT_CENTER_GAIN).abs() < 1e-6);
        assert!((out[1][0] - FRONT_CENTER_GAIN).abs() < 1e-6);
    }

    #[test]
    fn quad_to_stereo_averages_front_back() {
        let mixer = ChannelMixer::new(ChannelLayout::Quad, ChannelLayout::Stereo);
        let planar = vec![vec![1.0f32], vec![0.0f32], vec![0.0f32], vec![1.0f32]];
        let mut out = vec![Vec::new(), Vec::new()];
        mixer.remix(&planar, 1, &mut out);

        assert_eq!(out[0], vec![0.5]);
        assert_eq!(out[1], vec![0.5]);
    }

    #[test]
    fn remix_clears_previous_output() {
        let mixer = ChannelMixer::new(ChannelLayout::Mono, ChannelLayout::Mono);
        let mut out = vec![vec![9.0f32; 8]];
        mixer.remix(&[vec![0.25f32]], 1, &mut out);
        assert_eq!(out[0], vec![0.25]);
    }
}
