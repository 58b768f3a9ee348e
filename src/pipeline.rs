//! The two batch jobs: turn a source waveform into noisy fm iq, and recover audio from that iq.
//!
//! Both run entirely in memory; callers write the results out afterwards, so a
//! failure part way through never leaves partial output behind.

use crate::demod_fm::demodulate;
use crate::lowpass::{self, LowpassSpec};
use crate::mod_fm::{ModulationParams, modulate};
use crate::noise::{NoiseSpec, inject};
use crate::resample::resample;
use crate::spectrum::peak_frequency;
use crate::{IqStream, Result, Waveform};
use log::info;

#[derive(Debug, Clone, PartialEq)]
pub struct GenerateConfig {
    pub noise: NoiseSpec,
    /// seeds the noise generator; the same seed gives byte identical output
    pub seed: u64,
    /// iq sample rate (Hz)
    pub iq_rate: u32,
    pub modulation: ModulationParams,
    /// name of the binary, as recorded in the header
    pub iq_file_name: String,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        GenerateConfig {
            noise: NoiseSpec::default(),
            seed: 0,
            iq_rate: 200_000,
            modulation: ModulationParams::default(),
            iq_file_name: "iq_data.bin".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolveConfig {
    pub deviation_hz: f64,
    /// recovered audio rate (Hz)
    pub output_rate: u32,
    pub lowpass: LowpassSpec,
}

impl Default for SolveConfig {
    fn default() -> Self {
        SolveConfig {
            deviation_hz: 75_000.,
            output_rate: 20_000,
            lowpass: LowpassSpec::default(),
        }
    }
}

pub struct Generated {
    /// the noisy source, on the 16-bit scale at the source rate
    pub noisy: Waveform,
    pub iq: IqStream,
}

pub struct Solved {
    /// demodulated and resampled, before any filtering
    pub pre_filter: Waveform,
    /// lowpassed, trimmed and on the 16-bit scale
    pub post_filter: Waveform,
}

pub fn generate(source: &Waveform, config: &GenerateConfig) -> Result<Generated> {
    info!(
        "source: {} samples at {} Hz ({:.2}s)",
        source.len(),
        source.sample_rate,
        source.duration_secs()
    );
    log_peak("source", source);

    let noisy = inject(source, &config.noise, config.seed)?;
    log_peak("noisy", &noisy);

    let upsampled = Waveform::new(
        resample(&noisy.samples, noisy.sample_rate, config.iq_rate)?,
        config.iq_rate,
    )?;
    let iq = modulate(&upsampled, &config.modulation)?;
    info!(
        "modulated {} iq samples at {} Hz, deviation {} Hz",
        iq.len(),
        iq.sample_rate,
        config.modulation.deviation_hz
    );

    Ok(Generated { noisy, iq })
}

pub fn solve(iq: &IqStream, config: &SolveConfig) -> Result<Solved> {
    info!(
        "iq: {} samples at {} Hz, centre {}",
        iq.len(),
        iq.sample_rate,
        iq.center
    );

    let demodulated = demodulate(iq, config.deviation_hz)?;
    let pre_filter = Waveform::new(
        resample(&demodulated.samples, demodulated.sample_rate, config.output_rate)?,
        config.output_rate,
    )?;
    log_peak("pre-filter", &pre_filter);

    let post_filter = lowpass::filter(&pre_filter, &config.lowpass)?;
    log_peak("post-filter", &post_filter);

    Ok(Solved {
        pre_filter,
        post_filter,
    })
}

fn log_peak(name: &str, waveform: &Waveform) {
    if let Some(freq) = peak_frequency(&waveform.samples, waveform.sample_rate) {
        info!("{name}: strongest component at {freq:.1} Hz");
    }
}
