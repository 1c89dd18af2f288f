use clap::Parser;
use log::{info, warn};
use snafu::ErrorCompat;

mod args;
mod workshop;

fn main() {
    let args = args::Args::parse();

    let mut logger = env_logger::Builder::from_default_env();
    if args.verbose {
        logger.filter_level(log::LevelFilter::Debug);
    }
    logger.init();

    info!("args: {:?}", args);

    if let Err(e) = workshop::run_werksessie(&args) {
        warn!("Error occured {:?}", e);
        eprintln!("An error occured {}", e);
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            eprintln!("trace: {}", bt);
        }
        std::process::exit(1);
    }
}
