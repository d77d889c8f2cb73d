use anyhow::Context;
use rct_core::{
    evaluate_all_rules_with_config, load_rmr_file, render_rule_log, render_summary,
    EvaluationConfig, Role, RmrTriplet,
};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

pub struct Args {
    pub user: PathBuf,
    pub baseline: PathBuf,
    pub proposed: PathBuf,
    pub config: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub log: Option<PathBuf>,
    pub json: bool,
}

pub fn run(args: Args) -> anyhow::Result<ExitCode> {
    let paths = [
        (Role::User, &args.user),
        (Role::Baseline, &args.baseline),
        (Role::Proposed, &args.proposed),
    ];

    let mut rmrs = RmrTriplet::default();
    let mut unreadable = 0;
    for (role, path) in paths {
        match load_rmr_file(path) {
            Ok(rmr) => rmrs.set(role, rmr),
            Err(e) => {
                eprintln!("{role} RMR {} is not a valid JSON file: {e}", path.display());
                unreadable += 1;
            }
        }
    }
    if unreadable > 0 {
        return Ok(ExitCode::FAILURE);
    }

    let config = match &args.config {
        Some(path) => EvaluationConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EvaluationConfig::default(),
    };

    let report = evaluate_all_rules_with_config(&rmrs, &config)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_summary(&report));
    }

    if let Some(path) = &args.output {
        fs::write(path, serde_json::to_string_pretty(&report)?)
            .with_context(|| format!("writing report {}", path.display()))?;
        info!(path = %path.display(), "report written");
    }

    if let Some(path) = &args.log {
        fs::write(path, render_rule_log(&report))
            .with_context(|| format!("writing rule log {}", path.display()))?;
        info!(path = %path.display(), "rule log written");
    }

    Ok(if report.is_valid() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
