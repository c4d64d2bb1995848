use clap::Parser;
use log::{error, info};
use std::process::ExitCode;

use beevision::{logging, split_dataset, success, SplitArgs};

fn main() -> ExitCode {
    logging::init();
    let args = SplitArgs::parse();

    if !args.root.exists() {
        error!("The specified dataset root does not exist: {}", args.root.display());
        return ExitCode::FAILURE;
    }

    info!("Splitting dataset in {}", args.root.display());
    match split_dataset(&args) {
        Ok(report) => {
            success!("Split complete:");
            success!("Train: {}", report.train);
            success!("Val:   {}", report.valid);
            success!("Test:  {}", report.test);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Failed to split dataset: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
