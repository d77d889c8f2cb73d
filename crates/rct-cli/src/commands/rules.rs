use rct_core::default_catalog;
use serde_json::json;
use std::process::ExitCode;

pub fn run(section: Option<u32>, json_output: bool) -> anyhow::Result<ExitCode> {
    let catalog = default_catalog()?;
    let rules: Vec<_> = catalog
        .iter()
        .filter(|rule| section.map_or(true, |s| rule.key().section == s))
        .collect();

    if json_output {
        let payload: Vec<_> = rules
            .iter()
            .map(|rule| {
                json!({
                    "id": rule.id(),
                    "description": rule.description(),
                    "rmr_context": rule.rmr_context(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        for rule in rules {
            println!(
                "{:<6} {:<14} {}",
                rule.id(),
                rule.rmr_context(),
                rule.description()
            );
        }
    }

    Ok(ExitCode::SUCCESS)
}
