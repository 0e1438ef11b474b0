//! The `kolscore init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("kolscore.toml").exists() {
        println!("kolscore.toml already exists, skipping.");
    } else {
        std::fs::write("kolscore.toml", SAMPLE_CONFIG)?;
        println!("Created kolscore.toml");
    }

    let sample_path = std::path::Path::new("accounts.sample.json");
    if sample_path.exists() {
        println!("accounts.sample.json already exists, skipping.");
    } else {
        std::fs::write(sample_path, SAMPLE_ACCOUNTS)?;
        println!("Created accounts.sample.json");
    }

    println!("\nNext steps:");
    println!("  1. Edit kolscore.toml with your API key (or set OPENAI_API_KEY)");
    println!("  2. Run: kolscore score --accounts accounts.sample.json");
    println!("  3. Run: kolscore update-normalization");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# kolscore configuration

max_concurrent_requests = 10
output_dir = "./outputs"

[openai]
api_key = "${OPENAI_API_KEY}"
model = "gpt-4o-mini"
# base_url = "https://api.openai.com"
"#;

const SAMPLE_ACCOUNTS: &str = r#"[
  {
    "user_id": "1001",
    "username": "example_kol",
    "description": "Crypto analyst and writer",
    "followers_count": 12500,
    "friends_count": 340,
    "tweets_count": 2100,
    "tweets": [
      {
        "tweet_id": "2001",
        "author_id": "1001",
        "full_text": "Deep dive: why L2 fee markets behave differently under congestion.",
        "likes_count": 120,
        "retweets_count": 30,
        "replies_count": 14,
        "views_count": 15000
      },
      {
        "tweet_id": "2002",
        "author_id": "1001",
        "full_text": "Quick take on today's market structure.",
        "likes_count": 45,
        "retweets_count": 8,
        "replies_count": 3,
        "views_count": 6000
      }
    ]
  }
]
"#;
