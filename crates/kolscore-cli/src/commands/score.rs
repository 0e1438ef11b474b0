//! The `kolscore score` command.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use kolscore_core::engine::{EngineConfig, ScoringEngine};
use kolscore_core::model::Account;
use kolscore_core::normalization::NormalizationManager;
use kolscore_core::report::ScoreReport;
use kolscore_evaluators::narrative::ChatNarrator;
use kolscore_evaluators::tree::default_tree;
use kolscore_providers::{create_chat_model, load_config_from};

pub async fn execute(
    accounts_path: PathBuf,
    tweets_limit: usize,
    output: Option<PathBuf>,
    no_history: bool,
    config_path: Option<PathBuf>,
) -> Result<()> {
    anyhow::ensure!(tweets_limit >= 1, "tweets-limit must be at least 1");

    let config = load_config_from(config_path.as_deref())?;
    let output = output.unwrap_or_else(|| config.output_dir.clone());

    let content = std::fs::read_to_string(&accounts_path)
        .with_context(|| format!("failed to read accounts from {}", accounts_path.display()))?;
    let mut accounts: Vec<Account> =
        serde_json::from_str(&content).context("failed to parse accounts JSON")?;
    anyhow::ensure!(!accounts.is_empty(), "accounts file contains no accounts");

    // Cap tweets per account to keep LLM usage bounded.
    for account in &mut accounts {
        account.tweets.truncate(tweets_limit);
    }

    let chat = create_chat_model(&config)?;
    let root = default_tree(chat.clone());

    let mut norm = NormalizationManager::new(&output);
    norm.load_params()?;

    let engine = ScoringEngine::new(
        Arc::new(ChatNarrator::new(chat)),
        EngineConfig {
            save_history: !no_history,
        },
    );

    eprintln!(
        "kolscore v{} — scoring {} accounts",
        env!("CARGO_PKG_VERSION"),
        accounts.len()
    );
    let report = engine.score(&accounts, &root, &mut norm).await?;

    print_summary(&accounts, &root.key, &report);

    std::fs::create_dir_all(&output)?;
    let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H%M%S");
    let report_path = output.join(format!("report-{timestamp}.json"));
    report.save_json(&report_path)?;
    eprintln!("Report saved to: {}", report_path.display());

    let tree_path = output.join("tree_structure.json");
    root.structure().save_json(&tree_path)?;
    eprintln!("Tree structure: {}", tree_path.display());

    Ok(())
}

fn print_summary(accounts: &[Account], root_key: &str, report: &ScoreReport) {
    use comfy_table::{Cell, Table};

    let mut table = Table::new();
    table.set_header(vec!["Account", "Overall", "Comment"]);

    let scores = report.scores_for(root_key).unwrap_or(&[]);
    let comments = report.comments_for(root_key).unwrap_or(&[]);
    for (idx, account) in accounts.iter().enumerate() {
        let score = scores.get(idx).copied().unwrap_or(0.0);
        let comment = comments.get(idx).map(String::as_str).unwrap_or("");
        table.add_row(vec![
            Cell::new(account.identity()),
            Cell::new(format!("{:.1}%", score * 100.0)),
            Cell::new(truncate(comment, 80)),
        ]);
    }

    eprintln!("\n{table}");
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_chars).collect();
        format!("{cut}…")
    }
}
