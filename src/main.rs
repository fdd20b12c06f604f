mod args;
mod multi;

use clap::Parser;
use log::LevelFilter;
use snafu::ErrorCompat;

use crate::args::Args;
use crate::multi::AuditOverrides;

fn main() {
    let args = Args::parse();

    if args.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(LevelFilter::Debug)
            .init();
    } else {
        env_logger::init();
    }

    let overrides = AuditOverrides {
        seed: args.seed,
        n_trials: args.trials,
    };

    let res = multi::run_audit(
        &args.config,
        args.out.as_deref(),
        args.reference.as_deref(),
        &overrides,
    );

    if let Err(e) = res {
        eprintln!("An error occured: {}", e);
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            eprintln!("trace: {}", bt);
        }
        std::process::exit(1);
    }
}
