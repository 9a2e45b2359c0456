use anyhow::Context;
use clap::{ArgAction, Parser};
use mp4edit::{
    BoxId, BoxTree, EditConfig, Mp4File,
    hex_range,
    json_api::tree_to_json,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(version, about = "MP4/ISOBMFF box tree explorer")]
struct Args {
    /// MP4/ISOBMFF file path
    path: String,

    /// Only print the subtree at this slash separated path (e.g. moov/trak/mdia)
    #[arg(long = "filter")]
    filter: Option<String>,

    /// Dump raw payload of every box of this type (e.g. --raw stsd) or uuid:xxxxxxxx...
    #[arg(long = "raw")]
    raw: Option<String>,

    /// Limit recursion depth (for text/tree output)
    #[arg(long, default_value_t = 64)]
    max_depth: usize,

    /// Print structured values for boxes with a typed payload
    #[arg(long, action = ArgAction::SetTrue)]
    decode: bool,

    /// Bytes to show when dumping raw (0 means entire box payload)
    #[arg(long, default_value_t = 0)]
    bytes: usize,

    /// Emit JSON instead of human-readable tree
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let args = Args::parse();
    let file = Mp4File::open(&args.path, &EditConfig::default())
        .with_context(|| format!("opening {}", args.path))?;
    if file.is_possibly_corrupt() {
        tracing::warn!("{} looks corrupt; showing what could be parsed", args.path);
    }

    let targets: Vec<BoxId> = match &args.filter {
        Some(path) => file.tree().find_path(path)?.into_iter().collect(),
        None => file.tree().roots().to_vec(),
    };

    if args.json {
        let json_boxes: Vec<mp4edit::JsonBox> = if args.filter.is_some() {
            targets
                .iter()
                .map(|&id| mp4edit::json_api::build_json_for_box(file.tree(), id, args.decode))
                .collect()
        } else {
            tree_to_json(file.tree(), args.decode)
        };
        println!("{}", serde_json::to_string_pretty(&json_boxes)?);
        return Ok(());
    }

    for &id in &targets {
        print_box(file.tree(), id, 0, args.max_depth, args.decode);
    }

    if let Some(sel) = args.raw.as_ref() {
        dump_raw(&file, sel, args.bytes)?;
    }
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

// ---------- Human-readable tree ----------

fn print_box(tree: &BoxTree, id: BoxId, depth: usize, max_depth: usize, decode: bool) {
    let indent = "  ".repeat(depth);
    let n = tree.node(id);
    let offset = n
        .header
        .position
        .map_or_else(|| "-".to_string(), |p| format!("{p:#x}"));
    let mut line = format!("{indent}{offset:>6} {:>10} {}", n.size(), display_type(tree, id));
    if let Some(f) = n.full {
        line.push_str(&format!(" (ver={}, flags=0x{:06x})", f.version, f.flags));
    } else if n.data.has_children() {
        line.push_str(" (container)");
    }
    println!("{line}");
    if decode {
        if let Some(s) = n.data.summary() {
            println!("{indent}        -> {s}");
        }
        if !n.residual.is_empty() {
            println!("{indent}        -> {} residual bytes", n.residual.len());
        }
    }
    if depth < max_depth {
        for &c in tree.children(id) {
            print_box(tree, c, depth + 1, max_depth, decode);
        }
    }
}

fn display_type(tree: &BoxTree, id: BoxId) -> String {
    let h = &tree.node(id).header;
    match h.extended_type {
        Some(u) => format!("uuid:{}", hex::encode(u)),
        None => h.box_type.to_string(),
    }
}

// ---------- Raw dump ----------

fn matches_selector(tree: &BoxTree, id: BoxId, sel: &str) -> bool {
    let h = &tree.node(id).header;
    match (sel.strip_prefix("uuid:"), h.extended_type) {
        (Some(prefix), Some(u)) => hex::encode(u).starts_with(&prefix.to_ascii_lowercase()),
        (Some(_), None) => false,
        (None, _) => sel
            .parse::<mp4edit::BoxType>()
            .is_ok_and(|t| t == h.box_type),
    }
}

fn dump_raw(file: &Mp4File, sel: &str, limit: usize) -> anyhow::Result<()> {
    let matches: Vec<BoxId> = file
        .tree()
        .iter()
        .into_iter()
        .filter(|&id| matches_selector(file.tree(), id, sel))
        .collect();

    let mut src = std::fs::File::open(file.file().path())?;
    for (i, id) in matches.into_iter().enumerate() {
        let Some(off) = file.tree().node(id).header.data_position() else {
            continue;
        };
        let len = file.tree().node(id).header.data_size;
        let to_read = if limit == 0 || limit as u64 > len {
            len
        } else {
            limit as u64
        };
        let dump = hex_range(&mut src, off, to_read)?;
        println!(
            "\n== {} #{i} payload at {off:#x}, {} bytes ==",
            display_type(file.tree(), id),
            dump.length
        );
        print!("{}", dump.hex);
    }
    Ok(())
}
