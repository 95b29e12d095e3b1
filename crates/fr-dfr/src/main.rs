use anyhow::Result;
use clap::CommandFactory;
use tracing_subscriber::EnvFilter;

use fr_dfr::{disassemble, listing, Cli, Config, DfrError, Invocation};

fn main() -> Result<()> {
    let invocation = Invocation::try_parse_from(std::env::args_os()).unwrap_or_else(|e| e.exit());

    let level = if invocation.cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();

    let dir = std::env::current_dir()?;
    let mut config = match Config::from_cli(&invocation, &dir) {
        Ok(config) => config,
        Err(DfrError::Usage(text)) => {
            eprint!("{text}");
            std::process::exit(1);
        }
        Err(DfrError::NoInput) => {
            eprintln!("{}", Cli::command().render_usage());
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    let disassembly = disassemble(&mut config)?;
    let input = config.input.as_deref().ok_or(DfrError::NoInput)?;
    for path in listing::write(&disassembly, input, config.output.as_deref(), config.split)? {
        tracing::info!("wrote {}", path.display());
    }
    Ok(())
}
