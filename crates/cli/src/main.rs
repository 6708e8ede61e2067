//! voxalign CLI — multi-pass DTW forced alignment and timeline sub-alignment.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use voxalign_core::audio::io::read_wav_audio;
use voxalign_core::cache::cached_align_using_dtw;
use voxalign_core::mfcc::DefaultMfccExtractor;
use voxalign_core::tts::{get_tts_engine, TtsOptions};
use voxalign_core::types::{Granularity, TimelineEntry};
use voxalign_core::{align_phone_timelines, align_using_dtw, align_using_dtw_with_recognition};
use voxalign_core::{interpolate_phone_timelines, PhoneAlignmentMethod};

// ─── Top-level CLI ───────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "voxalign", about = "Multi-pass DTW forced alignment over MFCC features", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Show verbose (debug-level) logging
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Align a reference timeline onto source audio via multi-pass DTW
    Align(AlignArgs),
    /// Align a reference word list onto source audio using only a rough
    /// recognition timeline, via a synthesized intermediate reference
    AlignWithRecognition(AlignWithRecognitionArgs),
    /// Proportionally rescale a reference phone timeline onto a source word
    /// timeline, without running DTW
    InterpolatePhones(InterpolatePhonesArgs),
    /// Refine a mapped word timeline down to phones via bounded per-word DTW
    AlignPhones(AlignPhonesArgs),
    /// Synthesize a reference recording and phone timeline from a word list
    CreateReference(CreateReferenceArgs),
}

// ─── align ───────────────────────────────────────────────────────

#[derive(Parser, Debug)]
struct AlignArgs {
    /// Source audio to align onto
    source_audio: PathBuf,
    /// Reference audio the reference timeline was measured against
    reference_audio: PathBuf,
    /// Reference timeline, as JSON (array of TimelineEntry)
    reference_timeline: PathBuf,

    /// Comma-separated granularities, coarsest first
    #[arg(long, default_value = "low,medium,high", value_delimiter = ',')]
    granularities: Vec<String>,

    /// Comma-separated per-pass band half-widths in seconds, same length as
    /// --granularities
    #[arg(long, default_value = "2.0,0.5,0.1", value_delimiter = ',')]
    window_durations: Vec<f64>,

    /// Skip the on-disk alignment cache and always recompute
    #[arg(long, default_value_t = false)]
    no_cache: bool,

    /// Write the mapped timeline here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

fn run_align(args: AlignArgs) -> Result<()> {
    let source_audio = read_wav_audio(&args.source_audio)
        .with_context(|| format!("reading source audio {}", args.source_audio.display()))?;
    let reference_audio = read_wav_audio(&args.reference_audio)
        .with_context(|| format!("reading reference audio {}", args.reference_audio.display()))?;
    let reference_timeline = read_timeline(&args.reference_timeline)?;

    let granularities = args
        .granularities
        .iter()
        .map(|g| parse_granularity(g))
        .collect::<Result<Vec<_>>>()?;

    let mfcc = DefaultMfccExtractor::default();
    let mapped = if args.no_cache {
        align_using_dtw(
            &source_audio,
            &reference_audio,
            &reference_timeline,
            &granularities,
            &args.window_durations,
            &mfcc,
        )?
    } else {
        cached_align_using_dtw(
            &source_audio,
            &args.source_audio,
            &reference_audio,
            &args.reference_audio,
            &reference_timeline,
            &granularities,
            &args.window_durations,
            &mfcc,
        )?
    };

    write_timeline(&mapped, args.output.as_deref())
}

// ─── align-with-recognition ──────────────────────────────────────

#[derive(Parser, Debug)]
struct AlignWithRecognitionArgs {
    /// Source audio the recognition timeline was produced against
    source_audio: PathBuf,
    /// Reference audio the reference timeline was measured against (not the
    /// same recording as `source_audio` — different voice, different pace)
    reference_audio: PathBuf,
    /// Reference timeline, as JSON (array of TimelineEntry)
    reference_timeline: PathBuf,
    /// Rough word-level recognition timeline over the source audio, as JSON
    recognition_timeline: PathBuf,

    /// Comma-separated granularities, coarsest first
    #[arg(long, default_value = "low,medium,high", value_delimiter = ',')]
    granularities: Vec<String>,

    /// Comma-separated per-pass band half-widths in seconds, same length as
    /// --granularities
    #[arg(long, default_value = "2.0,0.5,0.1", value_delimiter = ',')]
    window_durations: Vec<f64>,

    /// How to attach phones once words are composed onto source time
    #[arg(long, default_value = "interpolation", value_parser = ["interpolation", "dtw"])]
    phone_method: String,

    #[arg(long)]
    output: Option<PathBuf>,
}

fn run_align_with_recognition(args: AlignWithRecognitionArgs) -> Result<()> {
    let source_audio = read_wav_audio(&args.source_audio)
        .with_context(|| format!("reading source audio {}", args.source_audio.display()))?;
    let reference_audio = read_wav_audio(&args.reference_audio)
        .with_context(|| format!("reading reference audio {}", args.reference_audio.display()))?;
    let reference_timeline = read_timeline(&args.reference_timeline)?;
    let recognition_timeline = read_timeline(&args.recognition_timeline)?;

    let granularities = args
        .granularities
        .iter()
        .map(|g| parse_granularity(g))
        .collect::<Result<Vec<_>>>()?;

    let phone_method = PhoneAlignmentMethod::try_from(args.phone_method.as_str())?;
    let tts = get_tts_engine("default")?;
    let mfcc = DefaultMfccExtractor::default();

    let mapped = align_using_dtw_with_recognition(
        &source_audio,
        &reference_audio,
        &reference_timeline,
        &recognition_timeline,
        &granularities,
        &args.window_durations,
        &TtsOptions::default(),
        phone_method,
        tts.as_ref(),
        &mfcc,
    )?;

    write_timeline(&mapped, args.output.as_deref())
}

// ─── interpolate-phones ──────────────────────────────────────────

#[derive(Parser, Debug)]
struct InterpolatePhonesArgs {
    /// Mapped source word timeline (no phone children needed), as JSON
    source_word_timeline: PathBuf,
    /// Reference word timeline, each word carrying its nested phone
    /// breakdown, as JSON
    reference_timeline: PathBuf,

    #[arg(long)]
    output: Option<PathBuf>,
}

fn run_interpolate_phones(args: InterpolatePhonesArgs) -> Result<()> {
    let source_word_timeline = read_timeline(&args.source_word_timeline)?;
    let reference_timeline = read_timeline(&args.reference_timeline)?;

    let mapped = interpolate_phone_timelines(&source_word_timeline, &reference_timeline)?;
    write_timeline(&mapped, args.output.as_deref())
}

// ─── align-phones ────────────────────────────────────────────────

#[derive(Parser, Debug)]
struct AlignPhonesArgs {
    source_audio: PathBuf,
    /// Mapped source word timeline (no phone children needed), as JSON
    source_word_timeline: PathBuf,
    reference_audio: PathBuf,
    /// Reference word timeline, each word carrying its nested phone
    /// breakdown, as JSON
    reference_timeline: PathBuf,

    /// Band half-width in seconds for each word's bounded DTW pass
    #[arg(long, default_value_t = 60.0)]
    window_duration: f64,

    #[arg(long)]
    output: Option<PathBuf>,
}

fn run_align_phones(args: AlignPhonesArgs) -> Result<()> {
    let source_audio = read_wav_audio(&args.source_audio)?;
    let source_word_timeline = read_timeline(&args.source_word_timeline)?;
    let reference_audio = read_wav_audio(&args.reference_audio)?;
    let reference_timeline = read_timeline(&args.reference_timeline)?;

    let mfcc = DefaultMfccExtractor::default();
    let mapped = align_phone_timelines(
        &source_audio,
        &source_word_timeline,
        &reference_audio,
        &reference_timeline,
        args.window_duration,
        &mfcc,
    )?;

    write_timeline(&mapped, args.output.as_deref())
}

// ─── create-reference ────────────────────────────────────────────

#[derive(Parser, Debug)]
struct CreateReferenceArgs {
    /// Space-separated words to synthesize
    #[arg(required = true, num_args = 1..)]
    words: Vec<String>,

    /// Voice name to stamp on the result
    #[arg(long, default_value = "default")]
    voice: String,

    /// Output WAV path for the synthesized reference audio
    #[arg(long, default_value = "reference.wav")]
    audio_output: PathBuf,

    /// Output JSON path for the reference phone timeline
    #[arg(long, default_value = "reference_timeline.json")]
    timeline_output: PathBuf,
}

fn run_create_reference(args: CreateReferenceArgs) -> Result<()> {
    let tts = get_tts_engine("default")?;
    let words: Vec<&str> = args.words.iter().map(String::as_str).collect();
    let options = TtsOptions {
        voice_name: args.voice,
        ..TtsOptions::default()
    };

    let reference = voxalign_core::create_alignment_reference(&words, tts.as_ref(), &options)?;

    voxalign_core::audio::io::write_wav_audio(&args.audio_output, &reference.reference_audio)?;
    write_timeline(&reference.reference_timeline, Some(&args.timeline_output))?;

    println!("Wrote {}", args.audio_output.display());
    println!("Wrote {}", args.timeline_output.display());
    Ok(())
}

// ─── shared helpers ──────────────────────────────────────────────

fn parse_granularity(name: &str) -> Result<Granularity> {
    Ok(match name {
        "xx-low" | "xxlow" => Granularity::XxLow,
        "x-low" | "xlow" => Granularity::XLow,
        "low" => Granularity::Low,
        "medium" => Granularity::Medium,
        "high" => Granularity::High,
        "x-high" | "xhigh" => Granularity::XHigh,
        other => bail!("unknown granularity: '{}'", other),
    })
}

fn read_timeline(path: &Path) -> Result<Vec<TimelineEntry>> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("reading timeline {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("parsing timeline {}", path.display()))
}

fn write_timeline(entries: &[TimelineEntry], output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(entries)?;
    match output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("writing timeline {}", path.display()))?;
            log::info!("Wrote {} entries to {}", entries.len(), path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

// ─── main ────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    let result = match cli.command {
        Command::Align(args) => run_align(args),
        Command::AlignWithRecognition(args) => run_align_with_recognition(args),
        Command::InterpolatePhones(args) => run_interpolate_phones(args),
        Command::AlignPhones(args) => run_align_phones(args),
        Command::CreateReference(args) => run_create_reference(args),
    };

    if let Err(e) = result {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}
