use crate::{Error, Result};
use num_complex::Complex64;
use rustfft::FftPlanner;

/// number of samples `len` input samples occupy at the new rate
pub fn resampled_len(len: usize, from_rate: u32, to_rate: u32) -> usize {
    (len as f64 * to_rate as f64 / from_rate as f64).round() as usize
}

/// fourier resampling: keep the shared low band of the spectrum, zero fill or drop the rest.
///
/// Exact for periodic band-limited input; anything else rings a little at the ends.
pub fn resample(input: &[f64], from_rate: u32, to_rate: u32) -> Result<Vec<f64>> {
    if from_rate == 0 || to_rate == 0 {
        return Err(Error::InvalidParameter(format!(
            "sample rates must be positive, got {from_rate} -> {to_rate}"
        )));
    }
    if input.is_empty() {
        return Err(Error::InputFormat("nothing to resample".to_string()));
    }
    let out_len = resampled_len(input.len(), from_rate, to_rate);
    if out_len == 0 {
        return Err(Error::InvalidParameter(format!(
            "{} samples at {from_rate} Hz is less than one sample at {to_rate} Hz",
            input.len()
        )));
    }

    Ok(resize_spectrum(input, out_len))
}

fn resize_spectrum(input: &[f64], out_len: usize) -> Vec<f64> {
    let in_len = input.len();
    if in_len == out_len {
        return input.to_vec();
    }

    let mut planner = FftPlanner::<f64>::new();

    let mut spectrum = input
        .iter()
        .map(|&v| Complex64::new(v, 0.))
        .collect::<Vec<Complex64>>();
    planner.plan_fft_forward(in_len).process(&mut spectrum);

    let shared = in_len.min(out_len);
    let mut resized = vec![Complex64::new(0., 0.); out_len];

    // dc and the positive/negative bins strictly below nyquist of the shorter spectrum
    resized[0] = spectrum[0];
    for k in 1..=(shared - 1) / 2 {
        resized[k] = spectrum[k];
        resized[out_len - k] = spectrum[in_len - k];
    }

    // an even length has a lone nyquist bin, which the other spectrum sees as a +/- pair
    if shared % 2 == 0 {
        let half = shared / 2;
        if out_len < in_len {
            resized[half] = spectrum[half] + spectrum[in_len - half];
        } else {
            resized[half] = spectrum[half] * 0.5;
            resized[out_len - half] = spectrum[half] * 0.5;
        }
    }

    planner.plan_fft_inverse(out_len).process(&mut resized);

    // rustfft leaves both directions unscaled
    let scale = 1. / in_len as f64;
    resized.iter().map(|c| c.re * scale).collect()
}

#[cfg(test)]
fn cosine(cycles: f64, len: usize) -> Vec<f64> {
    (0..len)
        .map(|n| (std::f64::consts::TAU * cycles * n as f64 / len as f64).cos())
        .collect()
}

#[test]
fn test_resampled_len() {
    assert_eq!(resampled_len(20_000, 20_000, 200_000), 200_000);
    assert_eq!(resampled_len(200_000, 200_000, 20_000), 20_000);
    assert_eq!(resampled_len(3, 2, 3), 5);
    assert_eq!(resampled_len(7, 44_100, 48_000), 8);
}

#[test]
fn test_lengths() {
    let input = cosine(3., 101);
    for (from, to) in [(10, 7), (7, 10), (44_100, 48_000), (48_000, 44_100), (1, 3)] {
        let out = resample(&input, from, to).unwrap();
        assert_eq!(out.len(), resampled_len(input.len(), from, to));
    }
}

#[test]
fn test_upsample_periodic_tone() {
    let out = resample(&cosine(5., 64), 1000, 4000).unwrap();
    crate::assert_close_slice(&out, &cosine(5., 256), 1e-9);
}

#[test]
fn test_downsample_periodic_tone() {
    let out = resample(&cosine(5., 256), 4000, 1000).unwrap();
    crate::assert_close_slice(&out, &cosine(5., 64), 1e-9);
}

#[test]
fn test_odd_lengths() {
    let out = resample(&cosine(2., 33), 33, 50).unwrap();
    crate::assert_close_slice(&out, &cosine(2., 50), 1e-9);
    let back = resample(&out, 50, 33).unwrap();
    crate::assert_close_slice(&back, &cosine(2., 33), 1e-9);
}

#[test]
fn test_identity() {
    let input = cosine(1.5, 10);
    assert_eq!(resample(&input, 8000, 8000).unwrap(), input);
}

#[test]
fn test_rejects() {
    assert!(matches!(
        resample(&[1.], 0, 10),
        Err(Error::InvalidParameter(_))
    ));
    assert!(matches!(
        resample(&[1., 2.], 10_000, 1),
        Err(Error::InvalidParameter(_))
    ));
    assert!(matches!(resample(&[], 10, 20), Err(Error::InputFormat(_))));
}
