use std::process::ExitCode;

use clap::Parser;
use labelkit::cli::{self, Cli};
use labelkit::init_logging;

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging()?;
    tracing::debug!("labelkit {} (built {})", labelkit::VERSION, labelkit::BUILD_DATE);

    cli::run(cli)
}
