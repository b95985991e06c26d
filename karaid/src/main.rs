extern crate karai_core;

use karai_core::error;
use karaid_lib::{args::parse_args, daemon::run_daemon};
use std::process::exit;

pub fn main() {
    let args = parse_args();

    if let Err(err) = run_daemon(args) {
        match err.early_report() {
            Some(report) => eprintln!("{report}"),
            None => error!("{}", err),
        }
        exit(err.exit_code());
    }
}
