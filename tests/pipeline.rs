use noisy_fm::audio::{read_wav, write_wav_f32, write_wav_i16};
use noisy_fm::iq_file::{self, CenterFrequency};
use noisy_fm::noise::NoiseSpec;
use noisy_fm::pipeline::{GenerateConfig, SolveConfig, generate, solve};
use noisy_fm::spectrum::peak_frequency;
use noisy_fm::{Waveform, peak};
use std::f64::consts::TAU;

fn sine(freq: f64, sample_rate: u32, len: usize) -> Waveform {
    let samples = (0..len)
        .map(|n| (TAU * freq * n as f64 / sample_rate as f64).sin())
        .collect();
    Waveform::new(samples, sample_rate).unwrap()
}

fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len() as f64;
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;
    let (mut cov, mut var_a, mut var_b) = (0., 0., 0.);
    for (x, y) in a.iter().zip(b.iter()) {
        cov += (x - mean_a) * (y - mean_b);
        var_a += (x - mean_a).powi(2);
        var_b += (y - mean_b).powi(2);
    }
    cov / (var_a * var_b).sqrt()
}

fn quiet_config() -> GenerateConfig {
    GenerateConfig {
        noise: NoiseSpec {
            level: 0.,
            ..NoiseSpec::default()
        },
        ..GenerateConfig::default()
    }
}

#[test]
fn one_kilohertz_tone_survives_the_round_trip() {
    let source = sine(1000., 20_000, 20_000);
    let generated = generate(&source, &quiet_config()).unwrap();

    assert_eq!(generated.noisy.len(), 20_000);
    assert_eq!(generated.iq.len(), 200_000);
    assert_eq!(generated.iq.sample_rate, 200_000);
    assert!(
        generated
            .iq
            .samples
            .iter()
            .all(|c| (c.norm() - 1.).abs() < 1e-9)
    );

    let solved = solve(&generated.iq, &SolveConfig::default()).unwrap();
    assert_eq!(solved.pre_filter.len(), 20_000);
    assert_eq!(solved.pre_filter.sample_rate, 20_000);
    assert_eq!(solved.post_filter.len(), 19_000);

    let pre = peak_frequency(&solved.pre_filter.samples, 20_000).unwrap();
    assert!((pre - 1000.).abs() <= 2., "{pre}");
    let post = peak_frequency(&solved.post_filter.samples, 20_000).unwrap();
    assert!((post - 1000.).abs() <= 2., "{post}");

    // without noise, the demodulated audio is the source apart from the zeroed first sample
    let correlation = pearson(&solved.pre_filter.samples[10..], &source.samples[10..]);
    assert!(correlation > 0.999, "{correlation}");
}

#[test]
fn noise_is_filtered_back_out() {
    let source = sine(700., 20_000, 20_000);
    let config = GenerateConfig {
        noise: NoiseSpec {
            level: 0.5,
            ..NoiseSpec::default()
        },
        ..GenerateConfig::default()
    };
    let generated = generate(&source, &config).unwrap();
    let noisy_correlation = pearson(&generated.noisy.samples, &source.samples);

    let solved = solve(&generated.iq, &SolveConfig::default()).unwrap();
    assert!(
        solved
            .post_filter
            .samples
            .iter()
            .all(|v| (-32768. ..=32767.).contains(v))
    );
    assert_eq!(peak(&solved.post_filter.samples), 32767.);

    // the lowpass delays by its group delay, then the transient trim removes 1000 samples
    let delay = (SolveConfig::default().lowpass.taps - 1) / 2;
    let aligned = &source.samples[1000 - delay..20_000 - delay];
    let cleaned_correlation = pearson(&solved.post_filter.samples, aligned);

    assert!(cleaned_correlation > 0.99, "{cleaned_correlation}");
    assert!(cleaned_correlation > noisy_correlation);
}

#[test]
fn generation_is_deterministic() {
    let source = sine(300., 8000, 4000);
    let config = GenerateConfig {
        noise: NoiseSpec {
            level: 2.,
            cutoff_hz: 2000.,
            taps: 301,
            ..NoiseSpec::default()
        },
        iq_rate: 160_000,
        ..GenerateConfig::default()
    };
    let a = generate(&source, &config).unwrap();
    let b = generate(&source, &config).unwrap();
    assert_eq!(a.noisy, b.noisy);
    assert_eq!(a.iq, b.iq);

    let reseeded = generate(
        &source,
        &GenerateConfig {
            seed: 1,
            ..config
        },
    )
    .unwrap();
    assert_ne!(a.noisy, reseeded.noisy);
}

#[test]
fn silent_source_does_not_blow_up() {
    let source = Waveform::new(vec![0.; 20_000], 20_000).unwrap();
    let generated = generate(&source, &GenerateConfig::default()).unwrap();
    assert!(generated.noisy.samples.iter().all(|v| v.is_finite()));
    assert!(generated.iq.samples.iter().all(|c| c.re.is_finite() && c.im.is_finite()));

    let solved = solve(&generated.iq, &SolveConfig::default()).unwrap();
    assert!(solved.post_filter.samples.iter().all(|v| v.is_finite()));
}

#[test]
fn files_carry_the_jobs_across() {
    let dir = tempfile::tempdir().unwrap();
    let config = quiet_config();
    let generated = generate(&sine(1000., 20_000, 20_000), &config).unwrap();

    let header_path = dir.path().join("iq_data_header.yml");
    iq_file::save(&header_path, &config.iq_file_name, &generated.iq).unwrap();
    write_wav_i16(dir.path().join("noisy_audio.wav"), &generated.noisy).unwrap();
    assert_eq!(
        std::fs::read_to_string(&header_path).unwrap(),
        "file: iq_data.bin\nnChannels: 1\nfs: 200000\nfc: baseband\n"
    );
    assert_eq!(
        std::fs::metadata(dir.path().join("iq_data.bin")).unwrap().len(),
        200_000 * 16
    );
    assert_eq!(
        read_wav(dir.path().join("noisy_audio.wav")).unwrap(),
        generated.noisy
    );

    let (header, iq) = iq_file::load(&header_path).unwrap();
    assert_eq!(header.center, CenterFrequency::Baseband);
    assert_eq!(iq, generated.iq);

    let solved = solve(&iq, &SolveConfig::default()).unwrap();
    write_wav_f32(dir.path().join("audio_pre_filter.wav"), &solved.pre_filter).unwrap();
    let post_path = dir.path().join("audio_post_filter.wav");
    write_wav_i16(&post_path, &solved.post_filter).unwrap();
    assert_eq!(read_wav(&post_path).unwrap(), solved.post_filter);
}
