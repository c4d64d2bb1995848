use clap::Parser;
use log::error;
use std::process::ExitCode;

use beevision::fetch::{fetch_dataset, RoboflowClient};
use beevision::{logging, FetchArgs};

fn main() -> ExitCode {
    logging::init();
    let args = FetchArgs::parse();

    let result = RoboflowClient::new(args.api_key.clone())
        .and_then(|client| fetch_dataset(&args, &client));

    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
