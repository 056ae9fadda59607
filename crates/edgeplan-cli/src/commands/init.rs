use std::path::Path;

use edgeplan_core::PlannerConfig;

pub const CONFIG_FILE: &str = "edgeplan.toml";

pub fn init(path: &Path) -> anyhow::Result<()> {
    let output = path.join(CONFIG_FILE);
    if output.exists() {
        anyhow::bail!("{} already exists", output.display());
    }

    std::fs::create_dir_all(path)?;
    let config = PlannerConfig::scaffold(40, &["A", "B", "C"]);
    std::fs::write(&output, config.to_toml_string()?)?;
    println!("✓ Generated {}", output.display());

    Ok(())
}
