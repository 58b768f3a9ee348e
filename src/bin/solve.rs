use anyhow::{Context, Result};
use log::info;
use noisy_fm::audio::{write_wav_f32, write_wav_i16};
use noisy_fm::iq_file;
use noisy_fm::pipeline::{SolveConfig, solve};
use noisy_fm::staging::Staging;
use std::fs;
use std::path::PathBuf;

#[derive(facet::Facet)]
struct Args {
    #[facet(positional)]
    header: PathBuf,
    #[facet(positional)]
    output_dir: PathBuf,
}

fn main() -> Result<()> {
    stderrlog::new().verbosity(log::Level::Info).init()?;

    let args: Args = facet_args::from_std_args().context("usage: solve iq_header output_dir")?;

    let config = SolveConfig::default();

    let (header, iq) = iq_file::load(&args.header)
        .with_context(|| format!("loading iq described by {}", args.header.display()))?;
    info!("loaded {} ({} Hz, fc {})", header.file, header.sample_rate, header.center);

    let solved = solve(&iq, &config)?;

    fs::create_dir_all(&args.output_dir)?;
    let mut staging = Staging::new();
    let pre_path = args.output_dir.join("audio_pre_filter.wav");
    write_wav_f32(staging.stage(&pre_path)?, &solved.pre_filter)
        .with_context(|| format!("writing {}", pre_path.display()))?;
    let post_path = args.output_dir.join("audio_post_filter.wav");
    write_wav_i16(staging.stage(&post_path)?, &solved.post_filter)
        .with_context(|| format!("writing {}", post_path.display()))?;
    staging
        .commit()
        .with_context(|| format!("moving outputs into {}", args.output_dir.display()))?;

    info!(
        "wrote {} and {}",
        pre_path.display(),
        post_path.display()
    );

    Ok(())
}
