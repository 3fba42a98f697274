use anyhow::Result;
use clap::Parser;
use headsync::cli::CliArgs;
use headsync::runner::HeadSyncApp;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with env filter
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();
    let app = HeadSyncApp::new(&args)?;

    let cancel = app.cancellation();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, cancelling synchronization");
            cancel.cancel();
        }
    });

    let mut stdout = std::io::stdout();
    if let Err(e) = app.run(args.command(), &mut stdout).await {
        error!("headsync failed: {:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
