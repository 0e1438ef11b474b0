//! LLM-backed scoring dimensions.
//!
//! Both evaluators send a structured judgment request to a [`ChatModel`]
//! and post-process the JSON reply. Missing or oddly typed fields fall back
//! to lenient defaults rather than failing the evaluation; a transport
//! error propagates and lets the engine degrade the score.

use std::sync::Arc;

use async_trait::async_trait;

use kolscore_core::model::Account;
use kolscore_core::traits::{ChatModel, ChatRequest, Evaluation, LeafEvaluator};

/// Bot score assumed when the model omits one. Lenient by instruction: an
/// account with no obvious bot activity rates around 70.
const DEFAULT_BOT_SCORE: f64 = 70.0;

/// Read a JSON field as f64, accepting numbers and numeric strings.
fn field_as_f64(value: &serde_json::Value, key: &str) -> Option<f64> {
    match value.get(key)? {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Human-authenticity assessment: asks the model to rate bot activity from
/// interaction statistics and tweet content, then inverts the bot score.
/// Produces calibrated [0, 1] values, so the leaf runs unnormalized.
pub struct HumanVitality {
    chat: Arc<dyn ChatModel>,
}

impl HumanVitality {
    pub fn new(chat: Arc<dyn ChatModel>) -> Self {
        Self { chat }
    }
}

#[async_trait]
impl LeafEvaluator for HumanVitality {
    async fn evaluate(&self, account: &Account) -> anyhow::Result<Evaluation> {
        if account.tweets.is_empty() {
            return Ok(Evaluation::new(0.0, "No tweet data"));
        }

        let total_views: u64 = account.tweets.iter().map(|t| t.views_count).sum();
        let avg_views = total_views as f64 / account.tweets.len() as f64;
        let views_follower_ratio = if account.followers_count > 0 {
            avg_views / account.followers_count as f64
        } else {
            0.0
        };
        let total_interactions: u64 = account.tweets.iter().map(|t| t.interactions()).sum();
        let engagement_rate = if total_views > 0 {
            total_interactions as f64 / total_views as f64
        } else {
            0.0
        };

        let prompt = format!(
            "Please evaluate the authenticity of interactions for this account. \
             Analyze the following metrics:\n\
             - Average views per tweet / followers ratio: {views_follower_ratio:.4}\n\
             - Average engagement rate (likes + retweets + replies) / views: {engagement_rate:.4}\n\
             - Followers count: {followers}\n\
             - Tweet count: {tweet_count}\n\n\
             Tweet content:\n{tweets}\n\n\
             Please evaluate if there are bot activities, fake followers, engagement \
             manipulation, or other anomalies. Provide a bot activity score (0-100), where \
             higher scores indicate more bot activity and lower authenticity. Don't be too \
             strict: if there is no obvious bot activity, around 70 points is fine. \
             Respond in JSON and use English for all comments.",
            followers = account.followers_count,
            tweet_count = account.tweets.len(),
            tweets = account.tweets_text(),
        );
        let schema = serde_json::json!({
            "bot_score": "Bot activity score, integer 0-100, higher means more bot activity",
            "anomaly_detection": "Anomaly detection results, describing discovered abnormal patterns",
            "comment": "Comment, briefly describing bot activity situation"
        });

        let response = self.chat.complete(&ChatRequest::structured(prompt, schema)).await?;
        let json = response.json.unwrap_or_default();
        let bot_score = field_as_f64(&json, "bot_score").unwrap_or_else(|| {
            tracing::warn!(account = %account.identity(), "bot_score missing; assuming default");
            DEFAULT_BOT_SCORE
        });
        let authenticity = (100.0 - bot_score) / 100.0;
        let comment = json
            .get("comment")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        Ok(Evaluation::new(authenticity, comment))
    }
}

/// Content-depth assessment: asks the model to score each tweet's depth and
/// averages the results into [0, 1]. Unnormalized.
pub struct ContentDepth {
    chat: Arc<dyn ChatModel>,
}

impl ContentDepth {
    pub fn new(chat: Arc<dyn ChatModel>) -> Self {
        Self { chat }
    }
}

#[async_trait]
impl LeafEvaluator for ContentDepth {
    async fn evaluate(&self, account: &Account) -> anyhow::Result<Evaluation> {
        if account.tweets.is_empty() {
            return Ok(Evaluation::new(0.0, "No tweet content"));
        }

        let tweets_text = account
            .tweets
            .iter()
            .enumerate()
            .map(|(i, t)| format!("Tweet {}: {}", i + 1, t.full_text))
            .collect::<Vec<_>>()
            .join("\n\n");
        let prompt = format!(
            "Please evaluate the content depth of each tweet. Content depth includes: depth \
             of analysis, quality of insights, information value provided, etc. Give each \
             tweet a depth score (0-100), where higher scores indicate deeper and more \
             insightful content. Respond in JSON and use English for all comments.\n\n\
             Tweet content:\n\n{tweets_text}"
        );
        let schema = serde_json::json!({
            "tweets": [{
                "index": "Tweet index (starting from 1)",
                "depth_score": "Content depth score, integer 0-100, higher means deeper content"
            }],
            "comment": "Comment, briefly describing content depth situation"
        });

        let response = self.chat.complete(&ChatRequest::structured(prompt, schema)).await?;
        let json = response.json.unwrap_or_default();
        let depth_scores: Vec<f64> = json
            .get("tweets")
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| field_as_f64(item, "depth_score"))
                    .collect()
            })
            .unwrap_or_default();

        if depth_scores.is_empty() {
            return Ok(Evaluation::new(0.0, "Unable to evaluate content depth"));
        }
        let avg_depth = depth_scores.iter().sum::<f64>() / depth_scores.len() as f64;
        let comment = json
            .get("comment")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Average content depth: {avg_depth:.2}"));
        Ok(Evaluation::new(avg_depth / 100.0, comment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kolscore_core::model::Tweet;
    use kolscore_providers::mock::MockChat;

    fn account_with_tweets() -> Account {
        Account {
            user_id: "1".into(),
            username: "tester".into(),
            followers_count: 100,
            tweets: vec![Tweet {
                tweet_id: "1".into(),
                author_id: "1".into(),
                full_text: "deep thoughts about markets".into(),
                views_count: 500,
                likes_count: 20,
                ..Tweet::default()
            }],
            ..Account::default()
        }
    }

    #[tokio::test]
    async fn human_vitality_inverts_bot_score() {
        let chat = Arc::new(MockChat::with_fixed_response(
            r#"{"bot_score": 30, "comment": "looks organic"}"#,
        ));
        let eval = HumanVitality::new(chat)
            .evaluate(&account_with_tweets())
            .await
            .unwrap();
        assert!((eval.score - 0.7).abs() < 1e-12);
        assert_eq!(eval.comment, "looks organic");
    }

    #[tokio::test]
    async fn human_vitality_defaults_when_bot_score_missing() {
        let chat = Arc::new(MockChat::with_fixed_response(r#"{"comment": "?"}"#));
        let eval = HumanVitality::new(chat)
            .evaluate(&account_with_tweets())
            .await
            .unwrap();
        assert!((eval.score - 0.3).abs() < 1e-12);
    }

    #[tokio::test]
    async fn human_vitality_accepts_numeric_string() {
        let chat = Arc::new(MockChat::with_fixed_response(r#"{"bot_score": "40"}"#));
        let eval = HumanVitality::new(chat)
            .evaluate(&account_with_tweets())
            .await
            .unwrap();
        assert!((eval.score - 0.6).abs() < 1e-12);
    }

    #[tokio::test]
    async fn human_vitality_without_tweets_skips_the_model() {
        let chat = Arc::new(MockChat::with_fixed_response("{}"));
        let acct = Account {
            user_id: "1".into(),
            ..Account::default()
        };
        let eval = HumanVitality::new(chat.clone()).evaluate(&acct).await.unwrap();
        assert_eq!(eval.score, 0.0);
        assert_eq!(chat.call_count(), 0);
    }

    #[tokio::test]
    async fn content_depth_averages_scores() {
        let chat = Arc::new(MockChat::with_fixed_response(
            r#"{"tweets": [{"index": 1, "depth_score": 40}, {"index": 2, "depth_score": 80}],
                "comment": "mixed depth"}"#,
        ));
        let eval = ContentDepth::new(chat)
            .evaluate(&account_with_tweets())
            .await
            .unwrap();
        assert!((eval.score - 0.6).abs() < 1e-12);
        assert_eq!(eval.comment, "mixed depth");
    }

    #[tokio::test]
    async fn content_depth_with_empty_judgment() {
        let chat = Arc::new(MockChat::with_fixed_response(r#"{"tweets": []}"#));
        let eval = ContentDepth::new(chat)
            .evaluate(&account_with_tweets())
            .await
            .unwrap();
        assert_eq!(eval.score, 0.0);
        assert_eq!(eval.comment, "Unable to evaluate content depth");
    }
}
