use clap::Parser;
use procicon::{IconProvider, load_config, platform_provider};
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about = "Save the application icon of a process or executable as PNG.", long_about = None)]
struct Cli {
    /// Process id, or path to an executable or bundle.
    target: String,
    /// Where to write the PNG.
    #[arg(short, long, default_value = "icon.png")]
    output: PathBuf,
    /// JSON file overriding search directories and limits.
    #[arg(long, default_value = "procicon.json")]
    config: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    let provider = platform_provider(&config);

    let icon = match cli.target.parse::<u32>() {
        Ok(pid) => provider.icon_from_pid(pid),
        Err(_) => provider.icon_from_path(Path::new(&cli.target)),
    };
    let icon = match icon {
        Ok(icon) => icon,
        Err(e) => {
            error!("Icon FAIL: '{}' -> {}", cli.target, e);
            return Err(e.into());
        }
    };

    icon.save_with_format(&cli.output, image::ImageFormat::Png)?;
    info!(
        "Saved {}x{} icon to '{}'",
        icon.width(),
        icon.height(),
        cli.output.display()
    );
    Ok(())
}
