use clap::Parser;
use tracing_subscriber::EnvFilter;

use passvault::cli::{commands, output, Cli, Commands, Context};
use passvault::config::Settings;
use passvault::errors::Result;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        output::error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let settings = Settings::load(&cwd)?;
    init_tracing(&settings.log_level);

    let ctx = Context::open(&cli, settings)?;

    match cli.command {
        Commands::Status => commands::status::execute(&ctx).await,
        Commands::Setup => commands::setup::execute(&ctx).await,
        Commands::Add { ref record } => commands::add::execute(&ctx, record).await,
        Commands::List { kind } => commands::list::execute(&ctx, kind).await,
        Commands::Show { kind, ref id } => commands::show::execute(&ctx, kind, id).await,
        Commands::Edit {
            kind,
            ref id,
            ref sets,
            ref fields,
        } => commands::edit::execute(&ctx, kind, id, sets, fields).await,
        Commands::Remove { kind, ref id, force } => {
            commands::remove::execute(&ctx, kind, id, force).await
        }
        Commands::Watch { kind } => commands::watch::execute(&ctx, kind).await,
    }
}

/// Log to stderr.  `RUST_LOG` wins over the configured level.
fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
