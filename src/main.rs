//! Head Scroller: scroll the focused window by tilting your head.

use anyhow::Result;
use clap::Parser;
use head_scroller::{app::HeadScrollApp, config::Config};
use log::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Camera index to use (overrides the configuration file)
    #[arg(long)]
    cam: Option<i32>,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<String>,

    /// Show the annotated preview window
    #[arg(short, long)]
    preview: bool,

    /// Report scroll intents without injecting scroll events
    #[arg(long)]
    no_scroll: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,
}

impl Args {
    /// Apply command line overrides on top of a loaded configuration
    fn apply(&self, mut config: Config) -> Config {
        if let Some(cam) = self.cam {
            config.camera.index = cam;
        }
        if self.preview {
            config.display.show_preview = true;
        }
        if self.no_scroll {
            config.scroll.enabled = false;
        }
        config
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    info!("Head Scroller");

    let config_file = if let Some(config_path) = &args.config {
        info!("Loading configuration from: {}", config_path);
        match Config::from_file(config_path) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!("Failed to load config file: {}. Using defaults.", e);
                Config::default()
            }
        }
    } else {
        Config::default()
    };

    let config = args.apply(config_file);
    config.validate()?;

    let mut app = HeadScrollApp::new(config)?;
    app.run()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["head-scroller"]).unwrap();
        assert_eq!(args.cam, None);
        assert!(!args.preview);
        assert!(!args.no_scroll);
        assert!(!args.debug);

        let config = args.apply(Config::default());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_overrides_applied() {
        let args =
            Args::try_parse_from(["head-scroller", "--cam", "2", "-p", "--no-scroll", "-C", "my.yaml"]).unwrap();
        assert_eq!(args.config.as_deref(), Some("my.yaml"));

        let config = args.apply(Config::default());
        assert_eq!(config.camera.index, 2);
        assert!(config.display.show_preview);
        assert!(!config.scroll.enabled);
    }

    #[test]
    fn test_invalid_camera_index_rejected() {
        assert!(Args::try_parse_from(["head-scroller", "--cam", "front"]).is_err());
    }
}
