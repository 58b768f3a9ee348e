use crate::fir::Window;
use itertools::Itertools;
use num_complex::Complex64;
use rustfft::FftPlanner;

/// single sided, blackman-harris windowed magnitude spectrum as `(frequency Hz, magnitude)` pairs
pub fn magnitude_spectrum(samples: &[f64], sample_rate: u32) -> Vec<(f64, f64)> {
    if samples.is_empty() {
        return Vec::new();
    }
    let len = samples.len();
    let window = Window::BlackmanHarris.coefficients(len);

    let mut buf = samples
        .iter()
        .zip(window.iter())
        .map(|(s, w)| Complex64::new(s * w, 0.))
        .collect_vec();
    FftPlanner::new().plan_fft_forward(len).process(&mut buf);

    let bin_hz = sample_rate as f64 / len as f64;
    buf.iter()
        .take(len / 2 + 1)
        .enumerate()
        .map(|(k, c)| (k as f64 * bin_hz, c.norm()))
        .collect()
}

/// frequency of the strongest non-dc bin
pub fn peak_frequency(samples: &[f64], sample_rate: u32) -> Option<f64> {
    magnitude_spectrum(samples, sample_rate)
        .into_iter()
        .skip(1)
        .max_by(|(_, a), (_, b)| f64::total_cmp(a, b))
        .map(|(freq, _)| freq)
}

/// summed power of the bins in `[low_hz, high_hz)`
pub fn band_energy(samples: &[f64], sample_rate: u32, low_hz: f64, high_hz: f64) -> f64 {
    magnitude_spectrum(samples, sample_rate)
        .into_iter()
        .filter(|(freq, _)| *freq >= low_hz && *freq < high_hz)
        .map(|(_, mag)| mag * mag)
        .sum()
}

#[cfg(test)]
fn sine(freq: f64, sample_rate: u32, len: usize) -> Vec<f64> {
    (0..len)
        .map(|n| (std::f64::consts::TAU * freq * n as f64 / sample_rate as f64).sin())
        .collect()
}

#[test]
fn test_peak_frequency() {
    assert_eq!(peak_frequency(&sine(1000., 20_000, 20_000), 20_000), Some(1000.));
    assert_eq!(peak_frequency(&sine(440., 8000, 4000), 8000), Some(440.));
    assert_eq!(peak_frequency(&[], 8000), None);
}

#[test]
fn test_spectrum_bins() {
    let spectrum = magnitude_spectrum(&[0.; 10], 1000);
    assert_eq!(spectrum.len(), 6);
    assert_eq!(spectrum[5].0, 500.);
}

#[test]
fn test_band_energy() {
    let samples = sine(3000., 8000, 8000)
        .iter()
        .zip(sine(500., 8000, 8000).iter().map(|v| v * 0.1))
        .map(|(a, b)| a + b)
        .collect_vec();
    let low = band_energy(&samples, 8000, 0., 1000.);
    let high = band_energy(&samples, 8000, 1000., 4001.);
    // amplitudes of 0.1 and 1 are 20 dB apart
    assert!((10. * (high / low).log10() - 20.).abs() < 0.1);
}
