use crate::fir::{Fir, Window};
use crate::{Error, Result, Waveform, normalise_peak, quantise_i16};
use log::{debug, warn};

/// post-demodulation cleanup filter
#[derive(Debug, Clone, PartialEq)]
pub struct LowpassSpec {
    pub cutoff_hz: f64,
    pub taps: usize,
    pub window: Window,
    /// samples dropped from the start of the filtered output
    pub transient: usize,
}

impl Default for LowpassSpec {
    fn default() -> Self {
        LowpassSpec {
            cutoff_hz: 3500.,
            taps: 1001,
            window: Window::BlackmanHarris,
            transient: 1000,
        }
    }
}

/// lowpass, drop the startup transient, then peak normalise and truncate to the 16-bit range.
/// The output is `spec.transient` samples shorter than the input.
pub fn filter(input: &Waveform, spec: &LowpassSpec) -> Result<Waveform> {
    let fir = Fir::lowpass(spec.taps, spec.cutoff_hz, input.sample_rate, spec.window)?;

    if spec.transient <= fir.group_delay() {
        warn!(
            "transient trim of {} samples does not cover the filter's group delay of {}",
            spec.transient,
            fir.group_delay()
        );
    }
    if input.len() <= spec.transient {
        return Err(Error::InvalidParameter(format!(
            "{} samples is too short to drop a {} sample transient",
            input.len(),
            spec.transient
        )));
    }

    let filtered = fir.filter(&normalise_peak(&input.samples));
    debug!(
        "lowpassed {} samples at {} Hz, dropping the first {}",
        filtered.len(),
        spec.cutoff_hz,
        spec.transient
    );

    Waveform::new(quantise_i16(&filtered[spec.transient..]), input.sample_rate)
}

#[cfg(test)]
fn tones(freqs: &[f64], sample_rate: u32, len: usize) -> Waveform {
    let samples = (0..len)
        .map(|n| {
            freqs
                .iter()
                .map(|f| (std::f64::consts::TAU * f * n as f64 / sample_rate as f64).sin())
                .sum()
        })
        .collect();
    Waveform::new(samples, sample_rate).unwrap()
}

#[test]
fn test_length_and_bounds() {
    let spec = LowpassSpec {
        cutoff_hz: 1000.,
        taps: 101,
        window: Window::BlackmanHarris,
        transient: 200,
    };
    let out = filter(&tones(&[300., 3000.], 8000, 2000), &spec).unwrap();
    assert_eq!(out.len(), 1800);
    assert_eq!(out.sample_rate, 8000);
    assert!(
        out.samples
            .iter()
            .all(|v| (-32768. ..=32767.).contains(v) && *v == v.trunc())
    );
}

#[test]
fn test_removes_high_tone() {
    let spec = LowpassSpec {
        cutoff_hz: 1000.,
        taps: 201,
        window: Window::BlackmanHarris,
        transient: 400,
    };
    let out = filter(&tones(&[250., 3000.], 8000, 4000), &spec).unwrap();
    let clean = tones(&[250.], 8000, 4000);

    // what survives is the 250 Hz tone, delayed by the group delay, at full scale
    let delay = (spec.taps - 1) / 2;
    for (n, v) in out.samples.iter().enumerate() {
        let expected = clean.samples[n + spec.transient - delay] * 32767.;
        assert!((v - expected).abs() < 100., "{n}: {v} vs {expected}");
    }
}

#[test]
fn test_silent_input() {
    let out = filter(
        &Waveform::new(vec![0.; 1500], 20_000).unwrap(),
        &LowpassSpec::default(),
    )
    .unwrap();
    assert_eq!(out.len(), 500);
    assert!(out.samples.iter().all(|&v| v == 0.));
}

#[test]
fn test_too_short() {
    assert!(matches!(
        filter(
            &Waveform::new(vec![0.; 1000], 20_000).unwrap(),
            &LowpassSpec::default()
        ),
        Err(Error::InvalidParameter(_))
    ));
}
