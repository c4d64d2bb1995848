use anyhow::Result;
use clap::Parser;
use log::{error, info};
use std::process::ExitCode;

use beevision::drive::GoogleDriveFolder;
use beevision::{logging, run_video_pipeline, Ffmpeg, VideoArgs, YoloCli};

fn run(args: &VideoArgs) -> Result<()> {
    let drive = GoogleDriveFolder::new()?;

    info!("Loading YOLO model...");
    let mut detector = YoloCli::load(&args.yolo_bin, &args.model_path)?;
    let tools = Ffmpeg::new(&args.ffmpeg_bin);

    let report = run_video_pipeline(args, &drive, &mut detector, &tools)?;
    if let Some(downloads) = &report.downloads {
        downloads.print_summary("Download");
    }
    report.annotations.print_summary("Annotation");
    Ok(())
}

fn main() -> ExitCode {
    logging::init();
    let args = VideoArgs::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
