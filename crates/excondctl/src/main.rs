//! excondctl - replay exploration traces and report exception conditions

use anyhow::Result;
use clap::Parser;
use excond_common::config::{self, ExcondConfig, LogConfig};
use excond_common::ExcondError;
use excondctl::cli::{Cli, Commands};
use excondctl::{commands, logging};
use tracing::{debug, warn};

fn run(cli: Cli) -> Result<()> {
    let loaded = commands::load_config(cli.config.as_deref());
    let default_level = LogConfig::default().level;
    let config_level = loaded.as_ref().map_or(default_level.as_str(), |c| c.log.level.as_str());
    logging::init(cli.log_level.as_deref(), config_level);
    debug!("excondctl v{} starting", excond_common::VERSION);

    // An explicit --config must load; the default lookup degrades to defaults.
    let mut cfg = match loaded {
        Ok(cfg) => cfg,
        Err(e) if cli.config.is_none() => {
            warn!("ignoring config: {:#}", e);
            ExcondConfig::default()
        }
        Err(e) => return Err(e),
    };

    if let Commands::Replay { pretty, no_qualify, .. } = &cli.command {
        if *pretty {
            cfg.report.pretty = true;
        }
        if *no_qualify {
            cfg.report.qualify_fields = false;
        }
    }
    config::init(cfg);

    match &cli.command {
        Commands::Replay { trace, .. } => commands::handle_replay(trace),
        Commands::Normalize { condition, fields, params } => {
            commands::handle_normalize(condition, fields, params)
        }
        Commands::Signature { class, method, descriptor } => {
            commands::handle_signature(class, method, descriptor)
        }
        Commands::List { dir } => commands::handle_list(dir),
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {:#}", e);
        let code = e.downcast_ref::<ExcondError>().map_or(1, ExcondError::code);
        std::process::exit(code);
    }
}
