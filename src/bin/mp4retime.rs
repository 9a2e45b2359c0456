use anyhow::{Context, bail};
use clap::Parser;
use mp4edit::{EditConfig, Mp4File};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(version, about = "Change movie or track timescales of an MP4 file in place")]
struct Args {
    /// MP4/ISOBMFF file path
    path: String,

    /// New movie (mvhd) timescale
    #[arg(long)]
    movie_timescale: Option<u32>,

    /// Track id whose media (mdhd) timescale changes
    #[arg(long, requires = "media_timescale")]
    track: Option<u32>,

    /// New media timescale for --track
    #[arg(long, requires = "track")]
    media_timescale: Option<u32>,

    /// I/O block size used while shifting file contents
    #[arg(long)]
    buffer_size: Option<usize>,

    /// JSON file with edit settings
    #[arg(long)]
    config: Option<String>,

    /// Apply the changes in memory and report, but do not write the file
    #[arg(long)]
    dry_run: bool,
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(p) => EditConfig::from_path(p).with_context(|| format!("loading config {p}"))?,
        None => EditConfig::default(),
    };
    if let Some(n) = args.buffer_size {
        config = EditConfig::with_buffer_size(n)?;
    }

    if args.movie_timescale.is_none() && args.track.is_none() {
        bail!("nothing to do: pass --movie-timescale and/or --track with --media-timescale");
    }

    let mut file = Mp4File::open(&args.path, &config).with_context(|| format!("opening {}", args.path))?;
    if file.is_possibly_corrupt() {
        bail!("{} looks corrupt; refusing to edit it", args.path);
    }

    if let Some(ts) = args.movie_timescale {
        let old = file.tree().movie_timescale();
        file.tree_mut().set_movie_timescale(ts)?;
        tracing::info!("movie timescale {:?} -> {ts}", old);
    }

    if let (Some(track), Some(ts)) = (args.track, args.media_timescale) {
        let mdhd = file
            .tree()
            .media_header_for_track(track)
            .with_context(|| format!("track {track} has no media header"))?;
        let old = file.tree().media_timescale(mdhd);
        file.tree_mut().set_media_timescale(mdhd, ts)?;
        tracing::info!("track {track} media timescale {:?} -> {ts}", old);
    }

    if args.dry_run {
        let tree = file.tree();
        for &id in tree.roots() {
            let (size, actual) = (tree.size(id), tree.actual_size(id));
            if size != actual {
                println!("{} would change size: {size} -> {actual}", tree.box_type(id));
            }
        }
        return Ok(());
    }

    let written = file.save()?;
    println!("{}: rewrote {written} top-level ranges", args.path);
    Ok(())
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mp4edit=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
