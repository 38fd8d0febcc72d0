//! Strided display waveform.

/// Samples every `stride`-th byte (`stride = max(1, m / out.len())`) and maps
/// it from `[0, 255]` centred on 128 into `[-1, 1)`. No interpolation.
///
/// When the input is shorter than `out`, indices past the end repeat the last
/// sample; an empty input yields a flat line.
pub fn reduce_waveform(time: &[u8], out: &mut [f32]) {
    let m = time.len();
    if m == 0 {
        out.fill(0.0);
        return;
    }
    let stride = (m / out.len().max(1)).max(1);
    for (i, slot) in out.iter_mut().enumerate() {
        let sample = time[(i * stride).min(m - 1)];
        *slot = sample as f32 / 128.0 - 1.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_is_flat_zero() {
        let mut out = vec![9.0f32; 256];
        reduce_waveform(&[128u8; 2048], &mut out);
        assert!(out.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn samples_every_stride() {
        let time: Vec<u8> = (0..2048u32).map(|i| (i % 256) as u8).collect();
        let mut out = vec![0.0f32; 256];
        reduce_waveform(&time, &mut out);
        // stride 8: index 2 reads time[16] = 16
        assert_eq!(out[2], 16.0 / 128.0 - 1.0);
        assert_eq!(out[0], -1.0);
    }

    #[test]
    fn extremes_map_into_unit_range() {
        let mut out = [0.0f32; 2];
        reduce_waveform(&[0, 255], &mut out);
        assert_eq!(out[0], -1.0);
        assert!((out[1] - 0.9921875).abs() < 1e-7);
    }

    #[test]
    fn short_input_repeats_with_stride_one() {
        let time = [10u8, 20, 30];
        let mut out = vec![0.0f32; 256];
        reduce_waveform(&time, &mut out);
        assert_eq!(out.len(), 256);
        assert_eq!(out[1], 20.0 / 128.0 - 1.0);
        assert_eq!(out[255], 30.0 / 128.0 - 1.0);
    }

    #[test]
    fn empty_input_is_flat() {
        let mut out = vec![1.0f32; 4];
        reduce_waveform(&[], &mut out);
        assert_eq!(out, vec![0.0; 4]);
    }
}
