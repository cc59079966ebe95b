mod args;
mod reports;

use clap::Parser;
use log::{info, warn};
use snafu::ErrorCompat;

use crate::args::Args;
use crate::reports::RunOverrides;

fn main() {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    info!("args: {:?}", args);

    let overrides = RunOverrides {
        config: args.config,
        input: args.input,
        template: args.template,
        out: args.out,
        seed: args.seed,
        variant: args.variant,
    };
    if let Err(e) = reports::run_generation(&overrides) {
        warn!("Error occured {:?}", e);
        eprintln!("An error occured: {}", e);
        if let Some(bt) = ErrorCompat::backtrace(e.as_ref()) {
            eprintln!("trace: {}", bt);
        }
        std::process::exit(1);
    }
}
