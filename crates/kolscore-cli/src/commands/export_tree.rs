//! The `kolscore export-tree` command.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use kolscore_evaluators::tree::default_tree;
use kolscore_providers::mock::MockChat;

pub fn execute(output: PathBuf) -> Result<()> {
    // The structure is evaluator-free, so a mock chat backend suffices.
    let root = default_tree(Arc::new(MockChat::with_fixed_response("{}")));
    root.structure().save_json(&output)?;
    eprintln!("Tree structure written to: {}", output.display());
    Ok(())
}
