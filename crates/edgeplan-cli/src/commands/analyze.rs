use std::path::Path;

pub fn analyze(results: &Path, tree: &Path, fallback: &Path, format: &str) -> anyhow::Result<()> {
    let report = edgeplan_analyzer::analyze_run(tree, results, fallback)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            println!("{}", edgeplan_analyzer::report::format_report(&report));
        }
    }

    Ok(())
}
