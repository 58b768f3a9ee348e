pub mod audio;
pub mod demod_fm;
pub mod error;
pub mod fir;
pub mod iq_file;
pub mod lowpass;
pub mod mod_fm;
pub mod noise;
pub mod pipeline;
pub mod resample;
pub mod spectrum;
pub mod staging;

pub use error::{Error, Result};

use log::warn;
use num_complex::Complex64;

/// full scale of the 16-bit output, matching a signed pcm cast
pub const I16_FULL_SCALE: f64 = 32767.;

/// real valued samples at a known rate
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    pub samples: Vec<f64>,
    pub sample_rate: u32,
}

impl Waveform {
    pub fn new(samples: Vec<f64>, sample_rate: u32) -> Result<Waveform> {
        if sample_rate == 0 {
            return Err(Error::InvalidParameter(
                "waveform sample rate must be positive".to_string(),
            ));
        }
        if samples.is_empty() {
            return Err(Error::InputFormat("waveform has no samples".to_string()));
        }
        Ok(Waveform {
            samples,
            sample_rate,
        })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// complex baseband samples; `center` is only ever carried through to the header
#[derive(Debug, Clone, PartialEq)]
pub struct IqStream {
    pub samples: Vec<Complex64>,
    pub sample_rate: u32,
    pub center: iq_file::CenterFrequency,
}

impl IqStream {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// largest absolute sample, zero for an empty slice
pub fn peak(samples: &[f64]) -> f64 {
    samples.iter().fold(0., |acc, v| acc.max(v.abs()))
}

/// scale into [-1, 1] by the peak magnitude; an all-zero buffer is returned untouched
pub fn normalise_peak(samples: &[f64]) -> Vec<f64> {
    let max = peak(samples);
    if max > 0. {
        samples.iter().map(|v| v / max).collect()
    } else {
        warn!("all-zero buffer of {} samples, skipping normalisation", samples.len());
        samples.to_vec()
    }
}

/// peak normalise, then map onto the 16-bit range.
///
/// This truncates towards zero (a plain integer cast), it does not round to
/// the nearest step, so `0.99999` of full scale lands on 32766.
pub fn quantise_i16(samples: &[f64]) -> Vec<f64> {
    normalise_peak(samples)
        .into_iter()
        .map(|v| (v * I16_FULL_SCALE).trunc())
        .collect()
}

#[test]
fn test_peak() {
    assert_eq!(peak(&[0.5, -2., 1.]), 2.);
    assert_eq!(peak(&[]), 0.);
}

#[test]
fn test_normalise_zeros() {
    let out = normalise_peak(&[0.; 16]);
    assert_eq!(out, vec![0.; 16]);
}

#[test]
fn test_quantise_truncates() {
    let out = quantise_i16(&[1., -1., 0.5, -0.25, 0.]);
    assert_eq!(out, vec![32767., -32767., 16383., -8191., 0.]);
}

#[test]
fn test_waveform_rejects_degenerate() {
    assert!(matches!(
        Waveform::new(vec![], 8000),
        Err(Error::InputFormat(_))
    ));
    assert!(matches!(
        Waveform::new(vec![1.], 0),
        Err(Error::InvalidParameter(_))
    ));
}

#[cfg(test)]
pub(crate) fn assert_close_slice(a: &[f64], b: &[f64], tolerance: f64) {
    assert_eq!(a.len(), b.len());
    if let Some((i, (av, bv))) = a
        .iter()
        .zip(b.iter())
        .enumerate()
        .find(|(_, (a, b))| (*a - *b).abs() > tolerance)
    {
        panic!("not equal at {i}: {av} != {bv}");
    }
}
