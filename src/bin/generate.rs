use anyhow::{Context, Result};
use log::info;
use noisy_fm::audio::{read_wav, write_wav_i16};
use noisy_fm::iq_file;
use noisy_fm::pipeline::{GenerateConfig, generate};
use noisy_fm::staging::Staging;
use std::fs;
use std::path::PathBuf;

#[derive(facet::Facet)]
struct Args {
    #[facet(positional)]
    input_wav: PathBuf,
    #[facet(positional)]
    output_dir: PathBuf,
}

fn main() -> Result<()> {
    stderrlog::new().verbosity(log::Level::Info).init()?;

    let args: Args =
        facet_args::from_std_args().context("usage: generate input_wav output_dir")?;

    let config = GenerateConfig::default();

    let source = read_wav(&args.input_wav)
        .with_context(|| format!("reading source audio {}", args.input_wav.display()))?;
    let generated = generate(&source, &config)?;

    fs::create_dir_all(&args.output_dir)?;
    let mut staging = Staging::new();

    let header_path = args.output_dir.join("iq_data_header.yml");
    let header = iq_file::save_staged(&mut staging, &header_path, &config.iq_file_name, &generated.iq)
        .with_context(|| format!("writing iq to {}", args.output_dir.display()))?;

    let noisy_path = args.output_dir.join("noisy_audio.wav");
    write_wav_i16(staging.stage(&noisy_path)?, &generated.noisy)
        .with_context(|| format!("writing {}", noisy_path.display()))?;

    staging
        .commit()
        .with_context(|| format!("moving outputs into {}", args.output_dir.display()))?;
    info!(
        "wrote {} iq samples to {} ({header_path:?})",
        generated.iq.len(),
        header.file
    );
    info!("wrote noisy audio to {}", noisy_path.display());

    Ok(())
}
