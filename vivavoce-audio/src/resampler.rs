//! Linear-interpolation resampling
//!
//! Converts capture-native audio (typically 48kHz) to the 24kHz rate the
//! realtime speech endpoint consumes. Speech intelligibility survives the
//! mild aliasing of linear interpolation, so there is no filter stage.

/// Resampler bound to a fixed source and target rate
///
/// Holds no signal state: every call to [`Resampler::process`] is independent,
/// which lets the processor resample each capture frame as it arrives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resampler {
    source_rate: u32,
    target_rate: u32,
}

impl Resampler {
    /// Create new resampler
    ///
    /// # Panics
    ///
    /// Panics if either rate is zero.
    pub fn new(source_rate: u32, target_rate: u32) -> Self {
        assert!(source_rate > 0, "source sample rate must be positive");
        assert!(target_rate > 0, "target sample rate must be positive");

        Self {
            source_rate,
            target_rate,
        }
    }

    pub fn source_rate(&self) -> u32 {
        self.source_rate
    }

    pub fn target_rate(&self) -> u32 {
        self.target_rate
    }

    /// Whether this resampler passes audio through untouched
    pub fn is_passthrough(&self) -> bool {
        self.source_rate == self.target_rate
    }

    /// Resample one block of mono samples
    pub fn process(&self, input: &[f32]) -> Vec<f32> {
        resample_linear(input, self.source_rate, self.target_rate)
    }

    /// Get expected output length for given input length
    pub fn expected_output_len(&self, input_len: usize) -> usize {
        output_len(input_len, self.source_rate, self.target_rate)
    }
}

/// Number of samples produced for `input_len` samples: `ceil(len * target / source)`
pub fn output_len(input_len: usize, source_rate: u32, target_rate: u32) -> usize {
    if source_rate == target_rate {
        return input_len;
    }
    let numerator = input_len as u64 * target_rate as u64;
    numerator.div_ceil(source_rate as u64) as usize
}

/// Resample `input` from `source_rate` to `target_rate` by linear interpolation
///
/// Equal rates return a copy of the input. Output positions whose right-hand
/// neighbour falls past the end of the input hold the last sample instead of
/// extrapolating.
///
/// # Panics
///
/// Panics if either rate is zero.
pub fn resample_linear(input: &[f32], source_rate: u32, target_rate: u32) -> Vec<f32> {
    assert!(source_rate > 0, "source sample rate must be positive");
    assert!(target_rate > 0, "target sample rate must be positive");

    if source_rate == target_rate {
        return input.to_vec();
    }
    if input.is_empty() {
        return Vec::new();
    }

    let ratio = source_rate as f64 / target_rate as f64;
    let len = output_len(input.len(), source_rate, target_rate);
    let last = input.len() - 1;

    (0..len)
        .map(|i| {
            let position = i as f64 * ratio;
            let index = position.floor() as usize;
            if index >= last {
                return input[last];
            }
            let frac = (position - index as f64) as f32;
            let left = input[index];
            let right = input[index + 1];
            left + (right - left) * frac
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_no_resampling_needed() {
        let resampler = Resampler::new(24000, 24000);
        let input = vec![0.5, 0.3, 0.1, -0.2];
        let output = resampler.process(&input);
        assert_eq!(output, input);
        assert!(resampler.is_passthrough());
    }

    #[test]
    fn test_resampling_48k_to_24k() {
        let resampler = Resampler::new(48000, 24000);

        // 100ms at 48kHz
        let input: Vec<f32> = (0..4800)
            .map(|i| (i as f32 * 440.0 * 2.0 * std::f32::consts::PI / 48000.0).sin() * 0.5)
            .collect();

        let output = resampler.process(&input);
        assert_eq!(output.len(), 2400);

        // Integer ratio lands exactly on every other input sample
        for (i, sample) in output.iter().enumerate() {
            assert_relative_eq!(*sample, input[i * 2]);
        }
    }

    #[test]
    fn test_output_length_rounds_up() {
        assert_eq!(output_len(3, 48000, 24000), 2);
        assert_eq!(output_len(441, 44100, 24000), 240);
        assert_eq!(output_len(1, 44100, 24000), 1);
        assert_eq!(output_len(0, 44100, 24000), 0);
        assert_eq!(resample_linear(&[0.1, 0.2, 0.3], 48000, 24000).len(), 2);
    }

    #[test]
    fn test_interpolates_between_neighbours() {
        // 2:3 upsampling puts targets at 0, 2/3, 4/3, 2, ...
        let input = vec![0.0, 0.3, 0.6];
        let output = resample_linear(&input, 16000, 24000);

        assert_eq!(output.len(), 5);
        assert_relative_eq!(output[0], 0.0);
        assert_relative_eq!(output[1], 0.2, epsilon = 1e-6);
        assert_relative_eq!(output[2], 0.4, epsilon = 1e-6);
        assert_relative_eq!(output[3], 0.6, epsilon = 1e-6);
    }

    #[test]
    fn test_edge_sample_is_held() {
        let input = vec![0.25, -0.75];
        let output = resample_linear(&input, 16000, 24000);

        // Positions 0, 0.667, 1.333: the last one has no right neighbour
        assert_eq!(output.len(), 3);
        assert_relative_eq!(output[2], -0.75);
    }

    #[test]
    fn test_empty_input() {
        assert!(resample_linear(&[], 48000, 24000).is_empty());
    }

    #[test]
    #[should_panic(expected = "source sample rate must be positive")]
    fn test_zero_rate_is_a_contract_violation() {
        resample_linear(&[0.0], 0, 24000);
    }
}
