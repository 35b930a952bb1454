use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use slidecast::{
    CodecPreference, ExportOpts, FfmpegSink, FfmpegSinkOpts, Story, build_timeline, export_story,
    total_duration,
};

#[derive(Parser, Debug)]
#[command(name = "slidecast", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Export a story to a video file (requires `ffmpeg` on PATH).
    Render(RenderArgs),
    /// Print the computed timeline without rendering.
    Probe(ProbeArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input story manifest JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output video path.
    #[arg(long)]
    out: PathBuf,

    /// Output container/codec: auto, mp4-h264-aac, mp4, webm-vp9, webm.
    #[arg(long, default_value = "auto")]
    codec: String,

    /// Pace the render loop at the live 30 fps cadence.
    #[arg(long, default_value_t = false)]
    realtime_pacing: bool,
}

#[derive(Parser, Debug)]
struct ProbeArgs {
    /// Input story manifest JSON.
    #[arg(long = "in")]
    in_path: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Probe(args) => cmd_probe(args),
    }
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let codec = parse_codec(&args.codec)?;
    let story = Story::from_manifest_path(&args.in_path)?;

    let mut sink = FfmpegSink::new(FfmpegSinkOpts {
        codec,
        ..FfmpegSinkOpts::default()
    });
    let opts = ExportOpts {
        codec,
        realtime_pacing: args.realtime_pacing,
        ..ExportOpts::default()
    };

    let mut print_progress = |percent: u8, status: &str| {
        eprintln!("[{percent:3}%] {status}");
    };
    let report = export_story(&story, &mut sink, &mut print_progress, &opts)?;

    let bytes = sink
        .take_bytes()
        .context("export finished without producing a container blob")?;
    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(&args.out, &bytes)
        .with_context(|| format!("write output '{}'", args.out.display()))?;

    eprintln!(
        "wrote {} ({} frames, {:.2}s, {} bytes)",
        args.out.display(),
        report.frames_pushed,
        report.duration_secs,
        bytes.len()
    );
    Ok(())
}

fn cmd_probe(args: ProbeArgs) -> anyhow::Result<()> {
    let story = Story::from_manifest_path(&args.in_path)?;
    story.validate()?;

    // The probe resolves assets exactly like an export would, so the printed
    // durations match what live playback and the encoder will agree on.
    let assets = slidecast::AssetStore::load(&story, slidecast::FRAME_RATE, |_, _| {});
    let segments = build_timeline(&story, &assets);

    println!("{} ({:?})", story.title, story.aspect);
    for segment in &segments {
        println!("  {segment}");
    }
    println!("total: {:.2}s", total_duration(&segments));
    Ok(())
}

fn parse_codec(s: &str) -> anyhow::Result<CodecPreference> {
    match s.trim().to_ascii_lowercase().as_str() {
        "auto" => Ok(CodecPreference::Auto),
        "mp4-h264-aac" | "h264" => Ok(CodecPreference::Mp4H264Aac),
        "mp4" => Ok(CodecPreference::Mp4),
        "webm-vp9" | "vp9" => Ok(CodecPreference::WebmVp9),
        "webm" => Ok(CodecPreference::Webm),
        other => anyhow::bail!("unknown codec '{other}'"),
    }
}
