use crate::{Error, Result, Waveform};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::debug;
use std::path::Path;

/// Read a wav as a mono waveform. Stereo keeps only the first (left) channel.
/// Integer samples keep their raw integer values rather than being scaled to [-1, 1].
pub fn read_wav(path: impl AsRef<Path>) -> Result<Waveform> {
    let path = path.as_ref();
    let mut reader = WavReader::open(path)
        .map_err(|e| Error::InputFormat(format!("can't open {}: {e}", path.display())))?;
    let spec = reader.spec();

    let channels = usize::from(spec.channels);
    if channels != 1 && channels != 2 {
        return Err(Error::InputFormat(format!(
            "expected a mono or stereo wav, got {} channels",
            spec.channels
        )));
    }

    let interleaved = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .map(|s| s.map(f64::from))
            .collect::<std::result::Result<Vec<f64>, hound::Error>>()?,
        SampleFormat::Int => reader
            .samples::<i32>()
            .map(|s| s.map(f64::from))
            .collect::<std::result::Result<Vec<f64>, hound::Error>>()?,
    };

    let samples = interleaved
        .into_iter()
        .step_by(channels)
        .collect::<Vec<f64>>();
    debug!(
        "read {} samples at {} Hz ({} channel {:?})",
        samples.len(),
        spec.sample_rate,
        spec.channels,
        spec.sample_format
    );

    Waveform::new(samples, spec.sample_rate)
}

/// mono 16-bit pcm; samples are expected to already be on the 16-bit scale
pub fn write_wav_i16(path: impl AsRef<Path>, waveform: &Waveform) -> Result<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: waveform.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec)?;
    for &sample in &waveform.samples {
        writer.write_sample(sample.clamp(-32768., 32767.) as i16)?;
    }
    writer.finalize()?;
    Ok(())
}

/// mono 32-bit float, for unquantised intermediate signals
pub fn write_wav_f32(path: impl AsRef<Path>, waveform: &Waveform) -> Result<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: waveform.sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };

    let mut writer = WavWriter::create(path, spec)?;
    for &sample in &waveform.samples {
        writer.write_sample(sample as f32)?;
    }
    writer.finalize()?;
    Ok(())
}

#[test]
fn test_i16_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pcm.wav");
    let waveform = Waveform::new(vec![0., 32767., -32767., 12., -1.], 20_000).unwrap();
    write_wav_i16(&path, &waveform).unwrap();
    assert_eq!(read_wav(&path).unwrap(), waveform);
}

#[test]
fn test_f32_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("float.wav");
    let waveform = Waveform::new(vec![0., 0.5, -0.25, 1.5], 44_100).unwrap();
    write_wav_f32(&path, &waveform).unwrap();
    assert_eq!(read_wav(&path).unwrap(), waveform);
}

#[test]
fn test_stereo_keeps_left() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stereo.wav");
    let spec = WavSpec {
        channels: 2,
        sample_rate: 8000,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(&path, spec).unwrap();
    for (l, r) in [(1i16, -1i16), (2, -2), (3, -3)] {
        writer.write_sample(l).unwrap();
        writer.write_sample(r).unwrap();
    }
    writer.finalize().unwrap();

    let waveform = read_wav(&path).unwrap();
    assert_eq!(waveform.samples, vec![1., 2., 3.]);
    assert_eq!(waveform.sample_rate, 8000);
}

#[test]
fn test_rejects_surround() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("quad.wav");
    let spec = WavSpec {
        channels: 4,
        sample_rate: 8000,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(&path, spec).unwrap();
    for _ in 0..8 {
        writer.write_sample(0i16).unwrap();
    }
    writer.finalize().unwrap();
    assert!(matches!(read_wav(&path), Err(Error::InputFormat(_))));
}

#[test]
fn test_missing_file() {
    assert!(matches!(
        read_wav("/nonexistent/source.wav"),
        Err(Error::InputFormat(_))
    ));
}
