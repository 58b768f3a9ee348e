use crate::iq_file::CenterFrequency;
use crate::{Error, IqStream, Result, Waveform, normalise_peak, peak};
use log::{debug, warn};
use num_complex::Complex64;
use std::f64::consts::TAU;

#[derive(Debug, Clone, PartialEq)]
pub struct ModulationParams {
    /// frequency swing (Hz) for a full scale input
    pub deviation_hz: f64,
    /// recorded in the header only, the stream itself is always at baseband
    pub center: CenterFrequency,
}

impl Default for ModulationParams {
    fn default() -> Self {
        ModulationParams {
            deviation_hz: 75_000.,
            center: CenterFrequency::Baseband,
        }
    }
}

pub(crate) fn check_deviation(deviation_hz: f64) -> Result<()> {
    if !(deviation_hz.is_finite() && deviation_hz > 0.) {
        return Err(Error::InvalidParameter(format!(
            "deviation must be positive, got {deviation_hz}"
        )));
    }
    Ok(())
}

/// frequency modulate a real baseband signal into unit magnitude iq.
///
/// Input louder than full scale is peak normalised first. The phase is the
/// running sum of the input, accumulated strictly in sample order.
pub fn modulate(input: &Waveform, params: &ModulationParams) -> Result<IqStream> {
    check_deviation(params.deviation_hz)?;
    if params.deviation_hz > input.sample_rate as f64 / 2. {
        // only full scale input steps the phase by more than pi per sample
        warn!(
            "deviation {} Hz is above nyquist ({} Hz), loud passages will not unwrap cleanly",
            params.deviation_hz,
            input.sample_rate as f64 / 2.
        );
    }

    let normalised;
    let samples = if peak(&input.samples) > 1. {
        normalised = normalise_peak(&input.samples);
        &normalised
    } else {
        &input.samples
    };

    let fs = input.sample_rate as f64;
    let mut integral = 0f64;
    let iq = samples
        .iter()
        .map(|&v| {
            integral += v;
            let phase = TAU * params.deviation_hz * integral / fs;
            Complex64::new(phase.cos(), phase.sin())
        })
        .collect::<Vec<Complex64>>();

    debug!(
        "modulated {} samples at {} Hz, deviation {} Hz",
        iq.len(),
        input.sample_rate,
        params.deviation_hz
    );

    Ok(IqStream {
        samples: iq,
        sample_rate: input.sample_rate,
        center: params.center.clone(),
    })
}

#[test]
fn test_unit_magnitude() {
    let input = Waveform::new(
        (0..1000).map(|n| (n as f64 * 0.01).sin() * 3.).collect(),
        48_000,
    )
    .unwrap();
    let iq = modulate(&input, &ModulationParams::default()).unwrap();
    assert_eq!(iq.len(), input.len());
    assert_eq!(iq.sample_rate, 48_000);
    assert_eq!(iq.center, CenterFrequency::Baseband);
    assert!(iq.samples.iter().all(|c| (c.norm() - 1.).abs() < 1e-12));
}

#[test]
fn test_deviation_above_nyquist() {
    use crate::demod_fm::demodulate;

    // 15 kHz at 20 kHz, but a 0.1 amplitude input only swings 1.5 kHz
    let input = Waveform::new(
        (0..2000)
            .map(|n| 0.1 * (TAU * 200. * n as f64 / 20_000.).sin())
            .collect(),
        20_000,
    )
    .unwrap();
    let params = ModulationParams {
        deviation_hz: 15_000.,
        center: CenterFrequency::Baseband,
    };
    let iq = modulate(&input, &params).unwrap();
    let out = demodulate(&iq, params.deviation_hz).unwrap();
    crate::assert_close_slice(&out.samples[1..], &input.samples[1..], 1e-9);
}

#[test]
fn test_constant_input_is_a_tone() {
    // a dc input of 0.25 full scale shifts the carrier by a quarter of the deviation
    let params = ModulationParams {
        deviation_hz: 1000.,
        center: CenterFrequency::Hz(100_000_000),
    };
    let iq = modulate(&Waveform::new(vec![0.25; 16], 8000).unwrap(), &params).unwrap();
    let step = TAU * 250. / 8000.;
    for (n, c) in iq.samples.iter().enumerate() {
        let expected = Complex64::from_polar(1., step * (n + 1) as f64);
        assert!((c - expected).norm() < 1e-12);
    }
    assert_eq!(iq.center, CenterFrequency::Hz(100_000_000));
}

#[test]
fn test_loud_input_is_normalised() {
    let params = ModulationParams {
        deviation_hz: 1000.,
        center: CenterFrequency::Baseband,
    };
    let quiet = modulate(&Waveform::new(vec![0.5, 1., -1.], 8000).unwrap(), &params).unwrap();
    let loud = modulate(&Waveform::new(vec![50., 100., -100.], 8000).unwrap(), &params).unwrap();
    assert_eq!(quiet.samples, loud.samples);
}

#[test]
fn test_rejects_deviation() {
    let input = Waveform::new(vec![0.; 4], 8000).unwrap();
    for deviation_hz in [0., -1., f64::INFINITY, f64::NAN] {
        let params = ModulationParams {
            deviation_hz,
            center: CenterFrequency::Baseband,
        };
        assert!(matches!(
            modulate(&input, &params),
            Err(Error::InvalidParameter(_))
        ));
    }
}
