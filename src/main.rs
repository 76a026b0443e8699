//! vsfind — list installed Visual Studio instances.
//!
//! Thin binary entry point. All discovery logic lives in the `vsfind-core`
//! crate.

use clap::Parser;
use vsfind_core::{discover, Instance, DEFAULT_MINIMUM_MAJOR_VERSION};

#[derive(Debug, Parser)]
#[command(name = "vsfind", version, about = "List installed Visual Studio instances")]
struct Cli {
    /// Oldest major version to report (14 = Visual Studio 2015).
    #[arg(long, default_value_t = DEFAULT_MINIMUM_MAJOR_VERSION)]
    min_major: u32,

    /// Print a JSON array instead of a table.
    #[arg(long)]
    json: bool,

    /// Log discovery details to stderr.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("vsfind starting (minimum major version {})", cli.min_major);

    let instances = discover(cli.min_major)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(instances.as_slice())?);
    } else {
        for instance in &instances {
            println!("{}", format_row(instance));
        }
    }

    Ok(())
}

fn format_row(instance: &Instance) -> String {
    let mut row = format!(
        "{:<18} {:<13} {}",
        instance.version().to_string(),
        instance.edition().name(),
        instance.product_directory()
    );
    if instance.is_prerelease() {
        row.push_str(" [prerelease]");
    }
    if !instance.nickname().is_empty() {
        row.push_str(&format!(" ({})", instance.nickname()));
    }
    row
}
