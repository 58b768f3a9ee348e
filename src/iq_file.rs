use crate::staging::Staging;
use crate::{Error, IqStream, Result};
use num_complex::Complex64;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::fs;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::str::FromStr;

/// bytes per sample on disk: an f64 for each of I and Q, native endian
pub const BYTES_PER_SAMPLE: u64 = 16;

/// tuning label for a stream; `baseband` means no offset
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "CenterRepr", into = "CenterRepr")]
pub enum CenterFrequency {
    #[default]
    Baseband,
    Hz(i64),
}

/// `fc` as it appears in the header: an integer, or the `baseband` label
#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum CenterRepr {
    Hz(i64),
    Label(String),
}

impl CenterFrequency {
    pub fn hz(&self) -> i64 {
        match self {
            CenterFrequency::Baseband => 0,
            CenterFrequency::Hz(hz) => *hz,
        }
    }
}

impl fmt::Display for CenterFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CenterFrequency::Baseband => write!(f, "baseband"),
            CenterFrequency::Hz(hz) => write!(f, "{hz}"),
        }
    }
}

impl FromStr for CenterFrequency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("baseband") {
            return Ok(CenterFrequency::Baseband);
        }
        s.parse::<i64>()
            .map(CenterFrequency::Hz)
            .map_err(|_| Error::InputFormat(format!("unrecognised centre frequency: {s:?}")))
    }
}

impl TryFrom<CenterRepr> for CenterFrequency {
    type Error = Error;

    fn try_from(repr: CenterRepr) -> Result<Self> {
        match repr {
            CenterRepr::Hz(hz) => Ok(CenterFrequency::Hz(hz)),
            CenterRepr::Label(label) => label.parse(),
        }
    }
}

impl From<CenterFrequency> for CenterRepr {
    fn from(center: CenterFrequency) -> Self {
        match center {
            CenterFrequency::Baseband => CenterRepr::Label("baseband".to_string()),
            CenterFrequency::Hz(hz) => CenterRepr::Hz(hz),
        }
    }
}

/// the yaml record written next to the iq binary; unknown keys are ignored on read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// binary file name, relative to the header
    pub file: String,
    #[serde(rename = "nChannels")]
    pub channels: u32,
    #[serde(rename = "fs", deserialize_with = "whole_hz")]
    pub sample_rate: u32,
    #[serde(rename = "fc")]
    pub center: CenterFrequency,
}

impl Header {
    pub fn for_stream(file: impl Into<String>, iq: &IqStream) -> Header {
        Header {
            file: file.into(),
            channels: 1,
            sample_rate: iq.sample_rate,
            center: iq.center.clone(),
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

impl FromStr for Header {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        serde_yaml::from_str(s).map_err(|e| Error::InputFormat(format!("iq header: {e}")))
    }
}

/// a rate written as an integer, or as a float with no fractional part (`2.0e+5`)
fn whole_hz<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u32, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Rate {
        Int(u32),
        Float(f64),
    }

    match Rate::deserialize(deserializer)? {
        Rate::Int(hz) => Ok(hz),
        Rate::Float(hz) if hz.fract() == 0. && (0. ..=u32::MAX as f64).contains(&hz) => {
            Ok(hz as u32)
        }
        Rate::Float(hz) => Err(serde::de::Error::custom(format!(
            "sample rate must be a whole number of Hz, got {hz}"
        ))),
    }
}

pub fn write_header(path: impl AsRef<Path>, header: &Header) -> Result<()> {
    fs::write(path, header.to_yaml()?)?;
    Ok(())
}

pub fn read_header(path: impl AsRef<Path>) -> Result<Header> {
    fs::read_to_string(path)?.parse()
}

/// writes I0, Q0, I1, Q1, ... as native endian f64s
pub fn write_iq(path: impl AsRef<Path>, samples: &[Complex64]) -> Result<()> {
    let mut out = BufWriter::new(fs::File::create(path)?);
    for sample in samples {
        out.write_all(&sample.re.to_ne_bytes())?;
        out.write_all(&sample.im.to_ne_bytes())?;
    }
    out.flush()?;
    Ok(())
}

/// next interleaved pair, or None at a clean end of input
pub fn read_one_iq(inp: &mut impl Read) -> Result<Option<Complex64>> {
    let mut re = [0u8; 8];
    let mut im = [0u8; 8];
    if let Err(e) = inp.read_exact(&mut re) {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            return Ok(None);
        }
        return Err(e.into());
    }
    // a lone I with no Q is a truncated file, not the end of one
    inp.read_exact(&mut im)?;
    Ok(Some(Complex64::new(
        f64::from_ne_bytes(re),
        f64::from_ne_bytes(im),
    )))
}

pub fn read_iq(path: impl AsRef<Path>) -> Result<Vec<Complex64>> {
    let path = path.as_ref();
    let file = fs::File::open(path)?;
    let len = file.metadata()?.len();
    if len % BYTES_PER_SAMPLE != 0 {
        return Err(Error::InputFormat(format!(
            "{} is {len} bytes, not a whole number of {BYTES_PER_SAMPLE} byte iq samples",
            path.display()
        )));
    }

    let mut inp = BufReader::new(file);
    let mut samples = Vec::with_capacity((len / BYTES_PER_SAMPLE) as usize);
    while let Some(sample) = read_one_iq(&mut inp)? {
        samples.push(sample);
    }
    Ok(samples)
}

/// write `iq` as `dir/file_name`, with its header at `header_path`.
///
/// Neither file appears unless both were written.
pub fn save(header_path: impl AsRef<Path>, file_name: &str, iq: &IqStream) -> Result<Header> {
    let mut staging = Staging::new();
    let header = save_staged(&mut staging, header_path, file_name, iq)?;
    staging.commit()?;
    Ok(header)
}

/// as [`save`], but the files only land when `staging` is committed
pub fn save_staged(
    staging: &mut Staging,
    header_path: impl AsRef<Path>,
    file_name: &str,
    iq: &IqStream,
) -> Result<Header> {
    let header_path = header_path.as_ref();
    let header = Header::for_stream(file_name, iq);
    let dir = header_path.parent().unwrap_or(Path::new(""));
    write_iq(staging.stage(dir.join(&header.file))?, &iq.samples)?;
    write_header(staging.stage(header_path)?, &header)?;
    Ok(header)
}

/// read a header, then the binary it names (relative to the header's directory)
pub fn load(header_path: impl AsRef<Path>) -> Result<(Header, IqStream)> {
    let header_path = header_path.as_ref();
    let header = read_header(header_path)?;
    if header.channels != 1 {
        return Err(Error::InputFormat(format!(
            "only single channel iq is supported, header says {}",
            header.channels
        )));
    }
    if header.sample_rate == 0 {
        return Err(Error::InputFormat("header sample rate is zero".to_string()));
    }

    let dir = header_path.parent().unwrap_or(Path::new(""));
    let samples = read_iq(dir.join(&header.file))?;
    if samples.is_empty() {
        return Err(Error::InputFormat(format!("{} has no samples", header.file)));
    }

    let iq = IqStream {
        samples,
        sample_rate: header.sample_rate,
        center: header.center.clone(),
    };
    Ok((header, iq))
}

#[test]
fn test_header_text() {
    let header = Header {
        file: "iq_data.bin".to_string(),
        channels: 1,
        sample_rate: 200_000,
        center: CenterFrequency::Baseband,
    };
    let text = header.to_yaml().unwrap();
    assert_eq!(
        text,
        "file: iq_data.bin\nnChannels: 1\nfs: 200000\nfc: baseband\n"
    );
    assert_eq!(text.parse::<Header>().unwrap(), header);

    let tuned = Header {
        center: CenterFrequency::Hz(433_920_000),
        ..header
    };
    assert!(tuned.to_yaml().unwrap().ends_with("fc: 433920000\n"));
    assert_eq!(tuned.to_yaml().unwrap().parse::<Header>().unwrap(), tuned);
}

#[test]
fn test_header_parse_lenient() {
    let header = "# written elsewhere\n\nfc: 433920000\nfile: 'capture.bin'\nauthor: someone\nfs: 48000\nnChannels: 1\n"
        .parse::<Header>()
        .unwrap();
    assert_eq!(header.file, "capture.bin");
    assert_eq!(header.sample_rate, 48_000);
    assert_eq!(header.center, CenterFrequency::Hz(433_920_000));
    assert_eq!(header.center.hz(), 433_920_000);
    assert_eq!(CenterFrequency::Baseband.hz(), 0);
}

#[test]
fn test_header_parse_other_yaml_writers() {
    let expected = Header {
        file: "iq_data.bin".to_string(),
        channels: 1,
        sample_rate: 200_000,
        center: CenterFrequency::Baseband,
    };
    for text in [
        "file: iq_data.bin\nnChannels: 1\nfs: 200000\nfc: baseband  # label\n",
        "{file: iq_data.bin, nChannels: 1, fs: 200000, fc: baseband}\n",
        "---\nfile: \"iq_data.bin\"\nnChannels: 1\nfs: 2.0e+5\nfc: Baseband\n",
    ] {
        assert_eq!(text.parse::<Header>().unwrap(), expected, "{text:?}");
    }
}

#[test]
fn test_header_parse_rejects() {
    for text in [
        "file: a.bin\nnChannels: 1\nfs: 200000\n",
        "file: a.bin\nnChannels: one\nfs: 200000\nfc: baseband\n",
        "file: a.bin\nnChannels: 1\nfs: 200000\nfc: somewhere\n",
        "file: a.bin\nnChannels: 1\nfs: 44100.5\nfc: baseband\n",
        "file: a.bin\nnChannels: 1\nfs: -8000\nfc: baseband\n",
        "file a.bin\n",
    ] {
        assert!(
            matches!(text.parse::<Header>(), Err(Error::InputFormat(_))),
            "{text:?}"
        );
    }
}

#[test]
fn test_iq_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("iq.bin");
    let samples = (0..10)
        .map(|n| Complex64::new(n as f64 * 0.5, -(n as f64) / 3.))
        .collect::<Vec<Complex64>>();
    write_iq(&path, &samples).unwrap();
    assert_eq!(fs::metadata(&path).unwrap().len(), 160);
    assert_eq!(read_iq(&path).unwrap(), samples);

    let raw = fs::read(&path).unwrap();
    assert_eq!(&raw[16..24], &0.5f64.to_ne_bytes());
}

#[test]
fn test_iq_file_truncated() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("iq.bin");
    fs::write(&path, [0u8; 40]).unwrap();
    assert!(matches!(read_iq(&path), Err(Error::InputFormat(_))));
}

#[test]
fn test_read_one_iq_half_sample() {
    let mut inp = &0.25f64.to_ne_bytes()[..];
    assert!(matches!(read_one_iq(&mut inp), Err(Error::Io(_))));

    let mut inp = &[0u8; 0][..];
    assert!(read_one_iq(&mut inp).unwrap().is_none());
}

#[test]
fn test_save_load() {
    let dir = tempfile::tempdir().unwrap();
    let header_path = dir.path().join("iq_data_header.yml");
    let iq = IqStream {
        samples: vec![Complex64::new(1., 0.), Complex64::new(0., -1.)],
        sample_rate: 200_000,
        center: CenterFrequency::Baseband,
    };
    let header = save(&header_path, "iq_data.bin", &iq).unwrap();
    assert!(dir.path().join("iq_data.bin").exists());
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);

    let (loaded_header, loaded) = load(&header_path).unwrap();
    assert_eq!(loaded_header, header);
    assert_eq!(loaded, iq);
}

#[test]
fn test_load_rejects_multichannel() {
    let dir = tempfile::tempdir().unwrap();
    let header_path = dir.path().join("h.yml");
    fs::write(&header_path, "file: x.bin\nnChannels: 2\nfs: 1000\nfc: baseband\n").unwrap();
    fs::write(dir.path().join("x.bin"), [0u8; 32]).unwrap();
    assert!(matches!(load(&header_path), Err(Error::InputFormat(_))));
}

#[test]
fn test_failed_save_leaves_no_binary() {
    let dir = tempfile::tempdir().unwrap();
    let header_path = dir.path().join("iq_data_header.yml");
    fs::create_dir(&header_path).unwrap();
    let iq = IqStream {
        samples: vec![Complex64::new(1., 0.)],
        sample_rate: 8000,
        center: CenterFrequency::Baseband,
    };
    assert!(save(&header_path, "iq_data.bin", &iq).is_err());
    assert!(!dir.path().join("iq_data.bin").exists());
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}
