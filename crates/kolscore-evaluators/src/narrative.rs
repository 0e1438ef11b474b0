//! Narrative generation backed by a chat model.

use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;

use kolscore_core::traits::{AccountSummary, ChatModel, ChatRequest, NarrativeGenerator};

/// Turns a finished account summary into a free-text overall comment by
/// prompting a chat model. Errors propagate; the engine substitutes its
/// fallback text.
pub struct ChatNarrator {
    chat: Arc<dyn ChatModel>,
}

impl ChatNarrator {
    pub fn new(chat: Arc<dyn ChatModel>) -> Self {
        Self { chat }
    }

    fn build_prompt(summary: &AccountSummary) -> String {
        let mut dimensions = String::new();
        for dim in &summary.dimensions {
            let (label, tag) = if dim.normalized {
                (format!("{:.2}%", dim.score * 100.0), "[normalized]")
            } else {
                (format!("{:.2}", dim.score), "[raw]")
            };
            let _ = writeln!(
                dimensions,
                "- {} ({}): score {label} {tag}, comment: {}",
                dim.name, dim.key, dim.comment
            );
        }

        format!(
            "Based on the following KOL scoring information, generate an overall \
             assessment.\n\n\
             Account information:\n\
             - username: {username}\n\
             - description: {description}\n\
             - followers_count: {followers}\n\
             - friends_count: {friends}\n\
             - tweets_count: {tweets}\n\n\
             Dimension scores:\n{dimensions}\n\
             Overall score (root, normalized): {overall:.2}%\n\n\
             Write one overall comment summarizing this KOL's performance, covering \
             strengths, weaknesses, and recommendations. The comment should:\n\
             1. Be concise (100-200 words)\n\
             2. Be grounded in the per-dimension scores and comments\n\
             3. Provide valuable insight\n\n\
             Return the comment text directly, with no extra formatting.",
            username = summary.username,
            description = summary.description,
            followers = summary.followers_count,
            friends = summary.friends_count,
            tweets = summary.tweets_count,
            overall = summary.overall_score * 100.0,
        )
    }
}

#[async_trait]
impl NarrativeGenerator for ChatNarrator {
    async fn narrate(&self, summary: &AccountSummary) -> anyhow::Result<String> {
        let request = ChatRequest::text(Self::build_prompt(summary));
        let response = self.chat.complete(&request).await?;
        let text = response.content.trim().to_string();
        anyhow::ensure!(!text.is_empty(), "chat model returned an empty narrative");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kolscore_core::traits::DimensionSummary;
    use kolscore_providers::mock::MockChat;

    fn summary() -> AccountSummary {
        AccountSummary {
            username: "alice".into(),
            description: "crypto analyst".into(),
            followers_count: 1200,
            friends_count: 80,
            tweets_count: 340,
            overall_score: 0.62,
            dimensions: vec![
                DimensionSummary {
                    key: "originality".into(),
                    name: "Originality".into(),
                    score: 0.75,
                    comment: "mostly original".into(),
                    normalized: true,
                },
                DimensionSummary {
                    key: "views".into(),
                    name: "Views".into(),
                    score: 7.1,
                    comment: "high reach".into(),
                    normalized: false,
                },
            ],
        }
    }

    #[tokio::test]
    async fn narrates_from_chat_response() {
        let chat = Arc::new(MockChat::with_fixed_response(
            "A well-rounded KOL with strong original content.",
        ));
        let text = ChatNarrator::new(chat.clone()).narrate(&summary()).await.unwrap();
        assert_eq!(text, "A well-rounded KOL with strong original content.");

        let prompt = chat.last_request().unwrap().prompt;
        assert!(prompt.contains("alice"));
        assert!(prompt.contains("Originality (originality): score 75.00% [normalized]"));
        assert!(prompt.contains("Views (views): score 7.10 [raw]"));
        assert!(prompt.contains("Overall score (root, normalized): 62.00%"));
    }

    #[tokio::test]
    async fn empty_response_is_an_error() {
        let chat = Arc::new(MockChat::with_fixed_response("   "));
        let result = ChatNarrator::new(chat).narrate(&summary()).await;
        assert!(result.is_err());
    }
}
