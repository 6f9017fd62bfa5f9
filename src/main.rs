use std::process::ExitCode;

use chrono::Utc;
use clap::Parser;
use log::{error, info, warn};
use org_census_app::{Args, Outcome};

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    tokio::select! {
        result = org_census_app::run(args, Utc::now()) => match result {
            Ok(Outcome::Written) => ExitCode::SUCCESS,
            Ok(Outcome::KeptExisting) => {
                warn!("Reports were not refreshed");
                ExitCode::SUCCESS
            }
            Err(err) => {
                error!("{:#}", err);
                ExitCode::FAILURE
            }
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, exiting");
            ExitCode::SUCCESS
        }
    }
}
