// src/main.rs

use prox::errors::ProxError;
use prox::{cli, logging, run};

#[tokio::main]
async fn main() {
    if let Err(err) = run_main().await {
        eprintln!("prox error: {err}");
        std::process::exit(err.exit_code());
    }
}

async fn run_main() -> Result<(), ProxError> {
    let args = cli::parse();
    logging::init_logging(args.log_level, args.verbose)?;
    run(args).await
}
