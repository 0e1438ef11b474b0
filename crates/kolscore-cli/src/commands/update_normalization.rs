//! The `kolscore update-normalization` command.

use std::path::PathBuf;

use anyhow::Result;

use kolscore_core::normalization::NormalizationManager;

pub fn execute(output: PathBuf) -> Result<()> {
    let mut norm = NormalizationManager::new(&output);
    norm.load_history()?;

    if norm.history().is_empty() {
        eprintln!(
            "No raw score history at {}; score some accounts first.",
            norm.history_path().display()
        );
        return Ok(());
    }

    let identities = norm.history().len();
    norm.update_params_from_history()?;
    eprintln!(
        "Recomputed normalization params from {identities} accounts:"
    );

    let mut keys: Vec<&String> = norm.params().keys().collect();
    keys.sort();
    for key in keys {
        let range = norm.params()[key];
        eprintln!("  {key}: min {:.4}, max {:.4}", range.min, range.max);
    }
    eprintln!("Saved to: {}", norm.params_path().display());

    Ok(())
}
