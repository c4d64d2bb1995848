use clap::Parser;
use log::error;
use std::process::ExitCode;

use beevision::train::train_model;
use beevision::{logging, TrainArgs, YoloCli};

fn main() -> ExitCode {
    logging::init();
    let args = TrainArgs::parse();

    let mut trainer = YoloCli::pretrained(&args.yolo_bin, args.model_type.weights_file());
    match train_model(&args, &mut trainer) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
