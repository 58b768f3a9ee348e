use crate::fir::{Fir, Window};
use crate::{Error, Result, Waveform, peak, quantise_i16};
use log::{debug, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};

/// highpass shaped noise to mix into a waveform
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseSpec {
    /// gain applied to the filtered noise, relative to the peak normalised signal
    pub level: f64,
    /// highpass corner (Hz)
    pub cutoff_hz: f64,
    pub taps: usize,
    pub window: Window,
}

impl Default for NoiseSpec {
    fn default() -> Self {
        NoiseSpec {
            level: 1_000_000.,
            cutoff_hz: 5000.,
            taps: 2001,
            window: Window::BlackmanHarris,
        }
    }
}

/// unit variance gaussian noise, reproducible for a given seed
pub fn white_noise(len: usize, seed: u64) -> Result<Vec<f64>> {
    let normal = Normal::new(0., 1.).map_err(|e| Error::InvalidParameter(e.to_string()))?;
    let mut rng = StdRng::seed_from_u64(seed);
    Ok((0..len).map(|_| normal.sample(&mut rng)).collect())
}

/// mix highpass noise into `waveform`, returning a 16-bit range (truncated) waveform.
///
/// The signal and the raw noise are divided by the same peak, so `level` is a
/// ratio against a full scale signal regardless of the source's scaling.
pub fn inject(waveform: &Waveform, spec: &NoiseSpec, seed: u64) -> Result<Waveform> {
    if !(spec.level.is_finite() && spec.level >= 0.) {
        return Err(Error::InvalidParameter(format!(
            "noise level must be finite and non-negative, got {}",
            spec.level
        )));
    }
    let highpass = Fir::highpass(
        spec.taps,
        spec.cutoff_hz,
        waveform.sample_rate,
        spec.window,
    )?;

    let noise = white_noise(waveform.len(), seed)?;

    let max = peak(&waveform.samples);
    let (signal, noise) = if max > 0. {
        debug!("co-normalising signal and noise by peak {max}");
        (
            waveform.samples.iter().map(|v| v / max).collect::<Vec<f64>>(),
            noise.into_iter().map(|v| v / max).collect::<Vec<f64>>(),
        )
    } else {
        warn!("source waveform is silent, noise will not be normalised");
        (waveform.samples.clone(), noise)
    };

    let shaped = highpass.filter(&noise);

    let noisy = signal
        .iter()
        .zip(shaped.iter())
        .map(|(s, n)| s + spec.level * n)
        .collect::<Vec<f64>>();

    Waveform::new(quantise_i16(&noisy), waveform.sample_rate)
}

#[cfg(test)]
fn tone(freq: f64, sample_rate: u32, len: usize) -> Waveform {
    let samples = (0..len)
        .map(|n| (std::f64::consts::TAU * freq * n as f64 / sample_rate as f64).sin())
        .collect();
    Waveform::new(samples, sample_rate).unwrap()
}

#[test]
fn test_white_noise_is_seeded() {
    let a = white_noise(64, 0).unwrap();
    let b = white_noise(64, 0).unwrap();
    let c = white_noise(64, 1).unwrap();
    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn test_inject_silent_input() {
    let spec = NoiseSpec {
        level: 1.,
        cutoff_hz: 2000.,
        taps: 101,
        window: Window::BlackmanHarris,
    };
    let out = inject(&Waveform::new(vec![0.; 4000], 8000).unwrap(), &spec, 0).unwrap();
    assert_eq!(out.len(), 4000);
    assert!(out.samples.iter().all(|v| v.is_finite()));
    assert!(out.samples.iter().any(|&v| v != 0.));
}

#[test]
fn test_inject_bounds_and_length() {
    let spec = NoiseSpec {
        level: 0.5,
        cutoff_hz: 3000.,
        taps: 201,
        window: Window::BlackmanHarris,
    };
    let source = tone(440., 8000, 8000);
    let out = inject(&source, &spec, 0).unwrap();
    assert_eq!(out.len(), source.len());
    assert_eq!(out.sample_rate, 8000);
    for &v in &out.samples {
        assert!((-32768. ..=32767.).contains(&v));
        assert_eq!(v, v.trunc());
    }
    assert_eq!(peak(&out.samples), 32767.);
}

#[test]
fn test_inject_zero_level_is_quantised_source() {
    let spec = NoiseSpec {
        level: 0.,
        cutoff_hz: 3000.,
        taps: 51,
        window: Window::Hann,
    };
    let source = Waveform::new(vec![0., 100., -200., 50.], 8000).unwrap();
    let out = inject(&source, &spec, 0).unwrap();
    assert_eq!(out.samples, vec![0., 16383., -32767., 8191.]);
}

#[test]
fn test_inject_noise_is_highpassed() {
    use crate::spectrum::band_energy;

    let taps = 1001;
    let spec = NoiseSpec {
        level: 1.,
        cutoff_hz: 5000.,
        taps,
        window: Window::BlackmanHarris,
    };
    let out = inject(&Waveform::new(vec![0.; 20_000], 20_000).unwrap(), &spec, 0).unwrap();
    let settled = &out.samples[taps..];

    let below = band_energy(settled, 20_000, 0., spec.cutoff_hz);
    let above = band_energy(settled, 20_000, spec.cutoff_hz, 10_000.);
    assert!(10. * (above / below).log10() > 20.);
}

#[test]
fn test_inject_rejects() {
    let source = tone(440., 8000, 100);
    let mut spec = NoiseSpec::default();
    assert!(matches!(
        inject(&source, &spec, 0),
        Err(Error::FilterDesign(_))
    ));
    spec.cutoff_hz = 1000.;
    spec.taps = 51;
    spec.level = f64::INFINITY;
    assert!(matches!(
        inject(&source, &spec, 0),
        Err(Error::InvalidParameter(_))
    ));
}
