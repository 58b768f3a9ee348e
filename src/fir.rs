use crate::{Error, Result};
use rayon::prelude::*;
use std::f64::consts::{PI, TAU};

/// taper applied to the ideal sinc response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Window {
    #[default]
    BlackmanHarris,
    Blackman,
    Hamming,
    Hann,
    Rectangular,
}

impl Window {
    /// symmetric window of `n` points, i.e. the last point mirrors the first
    pub fn coefficients(self, n: usize) -> Vec<f64> {
        if n == 1 {
            return vec![1.];
        }
        (0..n)
            .map(|i| {
                let x = TAU * i as f64 / (n - 1) as f64;
                match self {
                    Window::BlackmanHarris => {
                        0.35875 - 0.48829 * x.cos() + 0.14128 * (2.0 * x).cos()
                            - 0.01168 * (3.0 * x).cos()
                    }
                    Window::Blackman => 0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos(),
                    Window::Hamming => 0.54 - 0.46 * x.cos(),
                    Window::Hann => 0.5 - 0.5 * x.cos(),
                    Window::Rectangular => 1.,
                }
            })
            .collect()
    }
}

/// linear phase windowed-sinc filter
#[derive(Debug, Clone, PartialEq)]
pub struct Fir {
    taps: Vec<f64>,
}

impl Fir {
    /// `cutoff` is relative to nyquist, so must lie strictly inside (0, 1).
    ///
    /// The lowpass prototype is scaled for unity gain at DC. A highpass is the
    /// spectral inversion of that prototype (a unit impulse at the centre tap,
    /// minus the lowpass), so it has zero DC gain.
    pub fn design(tap_count: usize, cutoff: f64, highpass: bool, window: Window) -> Result<Fir> {
        if tap_count < 3 || tap_count % 2 == 0 {
            return Err(Error::FilterDesign(format!(
                "tap count must be odd and at least 3, got {tap_count}"
            )));
        }
        if !(cutoff > 0. && cutoff < 1.) {
            return Err(Error::FilterDesign(format!(
                "normalised cutoff must be inside (0, 1), got {cutoff}"
            )));
        }

        let centre = (tap_count - 1) / 2;
        let mut taps = window
            .coefficients(tap_count)
            .into_iter()
            .enumerate()
            .map(|(n, w)| {
                let m = n as f64 - centre as f64;
                w * cutoff * sinc(cutoff * m)
            })
            .collect::<Vec<f64>>();

        let dc_gain = taps.iter().sum::<f64>();
        for tap in taps.iter_mut() {
            *tap /= dc_gain;
        }

        if highpass {
            for tap in taps.iter_mut() {
                *tap = -*tap;
            }
            taps[centre] += 1.;
        }

        Ok(Fir { taps })
    }

    pub fn lowpass(tap_count: usize, cutoff_hz: f64, sample_rate: u32, window: Window) -> Result<Fir> {
        Fir::design(tap_count, normalised_cutoff(cutoff_hz, sample_rate)?, false, window)
    }

    pub fn highpass(tap_count: usize, cutoff_hz: f64, sample_rate: u32, window: Window) -> Result<Fir> {
        Fir::design(tap_count, normalised_cutoff(cutoff_hz, sample_rate)?, true, window)
    }

    pub fn taps(&self) -> &[f64] {
        &self.taps
    }

    /// delay, in samples, between an input and its filtered copy
    pub fn group_delay(&self) -> usize {
        (self.taps.len() - 1) / 2
    }

    /// causal convolution, with the filter starting from rest.
    /// Output is the same length as the input; the first `group_delay()` samples are startup transient.
    pub fn filter(&self, input: &[f64]) -> Vec<f64> {
        (0..input.len())
            .into_par_iter()
            .map(|n| {
                self.taps
                    .iter()
                    .zip(input[..=n].iter().rev())
                    .map(|(b, x)| b * x)
                    .sum::<f64>()
            })
            .collect()
    }

    /// magnitude response at `freq`, relative to nyquist
    pub fn gain_at(&self, freq: f64) -> f64 {
        let (re, im) = self
            .taps
            .iter()
            .enumerate()
            .fold((0f64, 0f64), |(re, im), (n, &b)| {
                let w = PI * freq * n as f64;
                (re + b * w.cos(), im - b * w.sin())
            });
        re.hypot(im)
    }
}

fn normalised_cutoff(cutoff_hz: f64, sample_rate: u32) -> Result<f64> {
    if sample_rate == 0 {
        return Err(Error::InvalidParameter(
            "sample rate must be positive".to_string(),
        ));
    }
    let nyquist = sample_rate as f64 / 2.;
    if cutoff_hz >= nyquist {
        return Err(Error::FilterDesign(format!(
            "cutoff {cutoff_hz} Hz is not below nyquist ({nyquist} Hz)"
        )));
    }
    Ok(cutoff_hz / nyquist)
}

fn sinc(x: f64) -> f64 {
    if x == 0. {
        1.
    } else {
        (PI * x).sin() / (PI * x)
    }
}

#[test]
fn test_window_shape() {
    let w = Window::BlackmanHarris.coefficients(9);
    assert!(w[0].abs() < 1e-4);
    assert!((w[4] - 1.).abs() < 1e-9);
    for i in 0..9 {
        assert!((w[i] - w[8 - i]).abs() < 1e-12);
    }
    assert_eq!(Window::Rectangular.coefficients(3), vec![1., 1., 1.]);
}

#[test]
fn test_lowpass_response() {
    let fir = Fir::design(101, 0.2, false, Window::BlackmanHarris).unwrap();
    assert_eq!(fir.taps().len(), 101);
    assert_eq!(fir.group_delay(), 50);
    assert!((fir.taps().iter().sum::<f64>() - 1.).abs() < 1e-12);
    for i in 0..101 {
        assert!((fir.taps()[i] - fir.taps()[100 - i]).abs() < 1e-12);
    }
    assert!(fir.gain_at(0.05) > 0.99);
    assert!(fir.gain_at(0.5) < 1e-3);
    assert!(fir.gain_at(0.9) < 1e-3);
}

#[test]
fn test_highpass_response() {
    let fir = Fir::design(101, 0.3, true, Window::BlackmanHarris).unwrap();
    assert!(fir.gain_at(0.).abs() < 1e-12);
    assert!(fir.gain_at(0.1) < 1e-3);
    assert!((fir.gain_at(1.) - 1.).abs() < 1e-3);
    assert!((fir.gain_at(0.7) - 1.).abs() < 1e-2);
}

#[test]
fn test_design_rejects() {
    assert!(matches!(
        Fir::design(100, 0.2, false, Window::Hann),
        Err(Error::FilterDesign(_))
    ));
    assert!(matches!(
        Fir::design(1, 0.2, false, Window::Hann),
        Err(Error::FilterDesign(_))
    ));
    assert!(matches!(
        Fir::design(11, 1., false, Window::Hann),
        Err(Error::FilterDesign(_))
    ));
    assert!(matches!(
        Fir::design(11, 0., true, Window::Hann),
        Err(Error::FilterDesign(_))
    ));
    assert!(matches!(
        Fir::design(11, f64::NAN, true, Window::Hann),
        Err(Error::FilterDesign(_))
    ));
    assert!(matches!(
        Fir::lowpass(11, 10_000., 20_000, Window::Hann),
        Err(Error::FilterDesign(_))
    ));
}

#[test]
fn test_filter_impulse_is_taps() {
    let fir = Fir::design(7, 0.4, false, Window::Hamming).unwrap();
    let mut impulse = vec![0.; 12];
    impulse[0] = 1.;
    let out = fir.filter(&impulse);
    assert_eq!(out.len(), 12);
    assert_eq!(&out[..7], fir.taps());
    assert!(out[7..].iter().all(|&v| v == 0.));
}

#[test]
fn test_filter_delays_by_group_delay() {
    let fir = Fir::design(21, 0.5, false, Window::BlackmanHarris).unwrap();
    let step = vec![1.; 64];
    let out = fir.filter(&step);
    // a step through a unity-gain lowpass settles once the full filter is loaded
    assert!((out[40] - 1.).abs() < 1e-12);
    // and crosses half way at the group delay
    assert!(out[fir.group_delay() - 1] < 0.5);
    assert!(out[fir.group_delay()] > 0.5);
}
