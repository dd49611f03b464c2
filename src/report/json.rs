use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::types::StressResults;

/// File name for results written now
pub fn results_file_name() -> String {
    chrono::Local::now()
        .format("stress_test_results_%Y%m%d_%H%M%S.json")
        .to_string()
}

/// Save detailed results as pretty JSON under `dir`, returning the file path
pub fn save(results: &StressResults, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;

    let path = dir.join(results_file_name());
    let json = serde_json::to_string_pretty(results)?;
    std::fs::write(&path, json)
        .with_context(|| format!("Failed to write results: {}", path.display()))?;

    log::info!("Results saved to {}", path.display());
    Ok(path)
}

/// Load a results file written by [`save`]
pub fn load(path: &Path) -> Result<StressResults> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read results: {}", path.display()))?;
    let results = serde_json::from_str(&content)
        .with_context(|| format!("Invalid results file: {}", path.display()))?;
    Ok(results)
}
