use anyhow::Context;
use rct_core::{load_rmr_file, validate_rmr};
use std::path::PathBuf;
use std::process::ExitCode;

pub fn run(rmr: PathBuf) -> anyhow::Result<ExitCode> {
    let document =
        load_rmr_file(&rmr).with_context(|| format!("loading RMR {}", rmr.display()))?;
    let validation = validate_rmr(&document);

    if validation.passed {
        println!("{}: valid", rmr.display());
        Ok(ExitCode::SUCCESS)
    } else {
        println!(
            "{}: invalid: {}",
            rmr.display(),
            validation.error.unwrap_or_default()
        );
        Ok(ExitCode::FAILURE)
    }
}
