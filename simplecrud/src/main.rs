use clap::Parser;
use simplecrud::config::Args;
use simplecrud::{Config, telemetry, workflow};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::load(&args).unwrap_or_else(|e| Args::usage_error(e).exit());

    if args.validate {
        println!("Configuration is valid.");
        return Ok(());
    }

    telemetry::init_telemetry(args.verbose)?;

    tracing::debug!(config = %args.config, verbose = args.verbose, "Starting");

    if let Err(e) = workflow::run(&config, &mut std::io::stdout()).await {
        tracing::error!("database connection failed");
        tracing::error!("{e}");
        return Err(e.into());
    }

    Ok(())
}
