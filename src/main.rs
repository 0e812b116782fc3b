use std::process::ExitCode;

use dayrecap::{cli::run_cli, utils::runtime::single_thread_runtime};
use tracing::error;

fn main() -> ExitCode {
    let result = single_thread_runtime().and_then(|runtime| runtime.block_on(run_cli()));
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(e) = e.downcast_ref::<clap::Error>() {
                e.exit();
            }
            error!("Error running cli {e:?}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
