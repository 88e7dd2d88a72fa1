use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use clap::Parser;
use log::info;
use svgsqueeze::{Config, DataUriMode, Info, Optimizer, decode_data_uri};

#[derive(Parser)]
#[command(name = "svgsqueeze")]
#[command(about = "A multipass SVG optimizer", long_about = None)]
struct Cli {
    /// Input file holding markup or an SVG data URI (use - for stdin)
    #[arg(default_value = "-")]
    input: PathBuf,

    /// Output file (use - for stdout)
    #[arg(short, long, default_value = "-")]
    output: PathBuf,

    /// JSON configuration file; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Repeat the pipeline while the output keeps shrinking
    #[arg(long)]
    multipass: bool,

    /// Decimal places kept in path data
    #[arg(short, long)]
    precision: Option<u8>,

    /// Indent the output
    #[arg(long)]
    pretty: bool,

    /// Print a data URI instead of markup (base64, enc or unenc)
    #[arg(long)]
    datauri: Option<DataUriMode>,

    /// Disable a plugin by name (repeatable)
    #[arg(long = "disable", value_name = "PLUGIN")]
    disabled: Vec<String>,

    /// Print size comparison
    #[arg(short, long)]
    stats: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let raw = if cli.input.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        fs::read_to_string(&cli.input)?
    };
    // data URIs are accepted as input, too
    let input = decode_data_uri(&raw)?;

    let mut config = match &cli.config {
        Some(path) => serde_json::from_str::<Config>(&fs::read_to_string(path)?)?,
        None => Config::default(),
    };
    config.multipass |= cli.multipass;
    config.js2svg.pretty |= cli.pretty;
    if cli.datauri.is_some() {
        config.datauri = cli.datauri;
    }
    if let Some(precision) = cli.precision {
        config.set_param("convert_path_data", "precision", precision.into());
    }
    for name in &cli.disabled {
        if !config.set_enabled(name, false) {
            return Err(format!("unknown plugin `{name}`").into());
        }
    }

    let optimizer = Optimizer::new(config)?;
    let info = Info {
        path: (cli.input.as_os_str() != "-").then(|| cli.input.display().to_string()),
    };
    let output = optimizer.optimize(&input, info)?;
    info!("{} passes", output.passes);

    let text = output.data_uri.as_deref().unwrap_or(&output.data);
    if cli.output.as_os_str() == "-" {
        io::stdout().write_all(text.as_bytes())?;
    } else {
        fs::write(&cli.output, text)?;
    }

    if cli.stats {
        let input_len = input.len();
        let output_len = output.data.len();
        let saved = input_len.saturating_sub(output_len);
        let percent = if input_len > 0 {
            (saved as f64 / input_len as f64) * 100.0
        } else {
            0.0
        };
        eprintln!(
            "{} -> {} bytes ({:.1}% smaller, {} passes)",
            input_len, output_len, percent, output.passes
        );
    }

    Ok(())
}
