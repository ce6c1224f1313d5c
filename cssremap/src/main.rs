use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use cssremap_lib::{generate, load_mappings, DeviceProfile, Order, RemapOptions, SourceSpec};
use std::fs;
use std::path::PathBuf;

const CSSREMAP_INTRO: &str = r#"
     ___ ___ ___ _ __ ___ _ __ ___   __ _ _ __
    / __/ __/ __| '__/ _ \ '_ ` _ \ / _` | '_ \
   | (__\__ \__ \ | |  __/ | | | | | (_| | |_) |
    \___|___/___/_|  \___|_| |_| |_|\__,_| .__/
                                         |_|
    Generate override stylesheets by remapping CSS declarations.
"#;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OrderArg {
    /// Mapping table order.
    Mappings,
    /// Order the sources first matched each mapping.
    Source,
}

impl From<OrderArg> for Order {
    fn from(order: OrderArg) -> Self {
        match order {
            OrderArg::Mappings => Order::Mappings,
            OrderArg::Source => Order::Source,
        }
    }
}

#[derive(Parser)]
#[command(name = "cssremap")]
#[command(about = "Remap CSS declarations into an override stylesheet")]
#[command(before_help = CSSREMAP_INTRO)]
struct Args {
    /// Source CSS files.
    #[arg(required = true)]
    sources: Vec<PathBuf>,

    /// JSON object mapping "property: value" to replacement declarations.
    #[arg(short, long)]
    mappings: PathBuf,

    /// Output file name. Writes to stdout when absent.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Selector prefix added to every generated selector.
    #[arg(short, long)]
    prefix: Option<String>,

    /// Selectors starting with this are not prefixed. Repeatable.
    #[arg(long = "match", value_name = "SELECTOR")]
    match_exemptions: Vec<String>,

    /// Regex of selectors to drop. Repeatable.
    #[arg(short, long = "ignore-selector", value_name = "REGEX")]
    ignore_selectors: Vec<String>,

    #[arg(long, default_value_t = 2)]
    indent_declaration: usize,

    #[arg(long, default_value_t = 0)]
    indent_css: usize,

    /// Wrap selector lists longer than this.
    #[arg(long, default_value_t = 80)]
    line_length: usize,

    /// Highest pixel width generated for $border macros.
    #[arg(long, default_value_t = 25)]
    limit_special: u32,

    #[arg(long, default_value = "screen")]
    device_type: String,

    #[arg(long, default_value = "1024px")]
    device_width: String,

    /// Emit provenance comments.
    #[arg(long)]
    comments: bool,

    /// Canonicalize selector spacing, quotes and pseudo-elements.
    #[arg(long)]
    stylistic: bool,

    #[arg(long, value_enum, default_value_t = OrderArg::Mappings)]
    order: OrderArg,

    /// Emit one rule per selector instead of one rule per mapping.
    #[arg(long)]
    no_combine: bool,

    /// More logging (-v info, -vv debug).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    // parse the args given in terminal
    let args: Args = Args::parse();
    init_logging(args.verbose);

    let mapping_text = fs::read_to_string(&args.mappings)
        .with_context(|| format!("reading mappings {}", args.mappings.display()))?;
    let mappings = load_mappings(&mapping_text)
        .with_context(|| format!("parsing mappings {}", args.mappings.display()))?;

    let mut sources = Vec::with_capacity(args.sources.len());
    for path in &args.sources {
        let css = fs::read_to_string(path)
            .with_context(|| format!("reading stylesheet {}", path.display()))?;
        let mut source = SourceSpec::new(css).with_exemptions(args.match_exemptions.iter().cloned());
        if let Some(prefix) = &args.prefix {
            source = source.with_prefix(prefix.clone());
        }
        sources.push(source);
    }

    let opts = RemapOptions {
        indent_declaration: args.indent_declaration,
        indent_css: args.indent_css,
        line_length: args.line_length,
        limit_special: args.limit_special,
        device: DeviceProfile {
            media_type: args.device_type,
            width: args.device_width,
        },
        comments: args.comments,
        stylistic: args.stylistic,
        order: args.order.into(),
        combine: !args.no_combine,
        ..RemapOptions::default()
    }
    .with_ignore_selectors(&args.ignore_selectors)?;

    let css = generate(&sources, &mappings, &opts).context("generating override stylesheet")?;

    match &args.output {
        Some(path) => {
            fs::write(path, format!("{}\n", css))
                .with_context(|| format!("writing {}", path.display()))?;
            log::info!("wrote {}", path.display());
        }
        None => println!("{}", css),
    }
    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}
