use crate::mod_fm::check_deviation;
use crate::{Error, IqStream, Result, Waveform};
use log::debug;
use std::f64::consts::{PI, TAU};

/// undo the [-pi, pi] wrapping of successive angles, so steps between samples are always under pi
pub fn unwrap_phase(phase: &[f64]) -> Vec<f64> {
    let Some((&first, rest)) = phase.split_first() else {
        return Vec::new();
    };

    let mut unwrapped = Vec::with_capacity(phase.len());
    unwrapped.push(first);

    let mut correction = 0f64;
    let mut prev = first;
    for &p in rest {
        let step = p - prev;
        if step.abs() >= PI {
            let mut wrapped = (step + PI).rem_euclid(TAU) - PI;
            if wrapped == -PI && step > 0. {
                wrapped = PI;
            }
            correction += wrapped - step;
        }
        prev = p;
        unwrapped.push(p + correction);
    }

    unwrapped
}

/// recover the modulating signal from the rate of change of phase.
///
/// The first output sample is always zero, as it has no predecessor to difference against.
pub fn demodulate(iq: &IqStream, deviation_hz: f64) -> Result<Waveform> {
    check_deviation(deviation_hz)?;
    if iq.is_empty() {
        return Err(Error::InputFormat("no iq samples to demodulate".to_string()));
    }

    let phase = unwrap_phase(&iq.samples.iter().map(|c| c.im.atan2(c.re)).collect::<Vec<f64>>());

    let fs = iq.sample_rate as f64;
    let mut baseband = Vec::with_capacity(phase.len());
    baseband.push(0.);
    baseband.extend(
        phase
            .windows(2)
            .map(|w| (w[1] - w[0]) * fs / TAU / deviation_hz),
    );

    debug!("demodulated {} iq samples at {} Hz", baseband.len(), iq.sample_rate);

    Waveform::new(baseband, iq.sample_rate)
}

#[cfg(test)]
use crate::iq_file::CenterFrequency;
#[cfg(test)]
use crate::mod_fm::{ModulationParams, modulate};

#[test]
fn test_unwrap_phase() {
    let truth = (0..100).map(|n| n as f64 * 0.9).collect::<Vec<f64>>();
    let wrapped = truth
        .iter()
        .map(|v| v.sin().atan2(v.cos()))
        .collect::<Vec<f64>>();
    assert!(wrapped.iter().all(|v| v.abs() <= PI));
    crate::assert_close_slice(&unwrap_phase(&wrapped), &truth, 1e-9);

    let falling = truth.iter().map(|v| -v).collect::<Vec<f64>>();
    let wrapped = falling
        .iter()
        .map(|v| v.sin().atan2(v.cos()))
        .collect::<Vec<f64>>();
    crate::assert_close_slice(&unwrap_phase(&wrapped), &falling, 1e-9);

    assert!(unwrap_phase(&[]).is_empty());
    assert_eq!(unwrap_phase(&[3.]), vec![3.]);
}

#[test]
fn test_round_trip() {
    let fs = 48_000;
    let input = Waveform::new(
        (0..4800)
            .map(|n| {
                let t = n as f64 / fs as f64;
                0.6 * (TAU * 440. * t).sin() + 0.3 * (TAU * 1250. * t).cos()
            })
            .collect(),
        fs,
    )
    .unwrap();
    let params = ModulationParams {
        deviation_hz: 15_000.,
        center: CenterFrequency::Baseband,
    };

    let iq = modulate(&input, &params).unwrap();
    let out = demodulate(&iq, params.deviation_hz).unwrap();

    assert_eq!(out.len(), input.len());
    assert_eq!(out.sample_rate, fs);
    assert_eq!(out.samples[0], 0.);
    crate::assert_close_slice(&out.samples[1..], &input.samples[1..], 1e-9);
}

#[test]
fn test_rejects_empty() {
    let iq = IqStream {
        samples: vec![],
        sample_rate: 8000,
        center: CenterFrequency::Baseband,
    };
    assert!(matches!(
        demodulate(&iq, 1000.),
        Err(Error::InputFormat(_))
    ));
}
