//! Core data model types for kolscore.
//!
//! Accounts and tweets are opaque input records as far as the engine is
//! concerned: the engine only relies on the account list having a stable
//! index and on `Account::identity()` for the raw-score history key. The
//! concrete fields exist for the leaf evaluators.

use serde::{Deserialize, Serialize};

/// A single tweet belonging to an account.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tweet {
    /// Tweet identifier.
    pub tweet_id: String,
    /// Identifier of the authoring account.
    pub author_id: String,
    /// Tweet body.
    #[serde(default)]
    pub full_text: String,
    #[serde(default)]
    pub likes_count: u64,
    #[serde(default)]
    pub retweets_count: u64,
    #[serde(default)]
    pub replies_count: u64,
    #[serde(default)]
    pub views_count: u64,
    /// Set when the tweet is a reply.
    #[serde(default)]
    pub in_reply_to_status_id: Option<String>,
    /// Whether the tweet quotes another tweet.
    #[serde(default)]
    pub is_quote_status: bool,
}

impl Tweet {
    /// Total interactions (likes + retweets + replies).
    pub fn interactions(&self) -> u64 {
        self.likes_count + self.retweets_count + self.replies_count
    }

    /// Whether this tweet is a repost (reply or quote) rather than original
    /// content.
    pub fn is_repost(&self) -> bool {
        self.in_reply_to_status_id.is_some() || self.is_quote_status
    }
}

/// A social-media account to be scored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Account {
    /// Platform account identifier.
    pub user_id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub followers_count: u64,
    #[serde(default)]
    pub friends_count: u64,
    #[serde(default)]
    pub tweets_count: u64,
    /// Recent tweets used for scoring (typically capped by the caller).
    #[serde(default)]
    pub tweets: Vec<Tweet>,
}

impl Account {
    /// Stable identity used as the raw-score history key.
    ///
    /// Falls back to the user id when the username is missing so that
    /// history entries stay deduplicated across batches.
    pub fn identity(&self) -> String {
        if self.username.is_empty() {
            format!("user:{}", self.user_id)
        } else {
            self.username.clone()
        }
    }

    /// Concatenated non-empty tweet bodies, double-newline separated.
    pub fn tweets_text(&self) -> String {
        self.tweets
            .iter()
            .map(|t| t.full_text.as_str())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tweet(text: &str) -> Tweet {
        Tweet {
            tweet_id: "1".into(),
            author_id: "a".into(),
            full_text: text.into(),
            ..Tweet::default()
        }
    }

    #[test]
    fn identity_prefers_username() {
        let account = Account {
            user_id: "42".into(),
            username: "alice".into(),
            ..Account::default()
        };
        assert_eq!(account.identity(), "alice");
    }

    #[test]
    fn identity_falls_back_to_user_id() {
        let account = Account {
            user_id: "42".into(),
            ..Account::default()
        };
        assert_eq!(account.identity(), "user:42");
    }

    #[test]
    fn tweets_text_skips_empty_bodies() {
        let account = Account {
            user_id: "42".into(),
            tweets: vec![tweet("first"), tweet(""), tweet("second")],
            ..Account::default()
        };
        assert_eq!(account.tweets_text(), "first\n\nsecond");
    }

    #[test]
    fn repost_detection() {
        let mut t = tweet("hi");
        assert!(!t.is_repost());
        t.is_quote_status = true;
        assert!(t.is_repost());
        t.is_quote_status = false;
        t.in_reply_to_status_id = Some("99".into());
        assert!(t.is_repost());
    }

    #[test]
    fn account_serde_roundtrip_with_defaults() {
        let json = r#"{"user_id": "7", "username": "bob"}"#;
        let account: Account = serde_json::from_str(json).unwrap();
        assert_eq!(account.user_id, "7");
        assert_eq!(account.followers_count, 0);
        assert!(account.tweets.is_empty());
    }
}
