//! Deterministic scoring dimensions.
//!
//! These are pure functions of account attributes, lifted into the
//! [`LeafEvaluator`] contract so they compose with the suspending,
//! LLM-backed dimensions.

use async_trait::async_trait;

use kolscore_core::model::Account;
use kolscore_core::traits::{Evaluation, LeafEvaluator};

use crate::banded_comment;

/// Share of original (non-repost) tweets. Already a [0, 1] ratio, so the
/// leaf runs unnormalized.
pub struct Originality;

#[async_trait]
impl LeafEvaluator for Originality {
    async fn evaluate(&self, account: &Account) -> anyhow::Result<Evaluation> {
        if account.tweets.is_empty() {
            return Ok(Evaluation::new(0.0, "No tweet data"));
        }
        let total = account.tweets.len();
        let original = account.tweets.iter().filter(|t| !t.is_repost()).count();
        let ratio = original as f64 / total as f64;

        let comment = banded_comment(
            ratio,
            &[
                (0.8, "Excellent: Content is primarily original, almost never reposts"),
                (0.6, "Good: Mostly original content with occasional sharing"),
                (0.4, "Average: Balance of original and shared content"),
                (0.2, "Fair: Mostly shares with limited original content"),
            ],
            "Poor: Almost no original content, mainly reposts",
        );
        Ok(Evaluation::new(
            ratio,
            format!("{comment} (Original tweets: {original}/{total}, Ratio: {ratio:.2})"),
        ))
    }
}

/// Connectivity within the KOL community, measured by the account's friend
/// count. Raw count; normalized against the population by the engine.
pub struct KolInfluence;

#[async_trait]
impl LeafEvaluator for KolInfluence {
    async fn evaluate(&self, account: &Account) -> anyhow::Result<Evaluation> {
        if account.friends_count == 0 {
            return Ok(Evaluation::new(0.0, "No KOL connection data"));
        }
        Ok(Evaluation::new(
            account.friends_count as f64,
            format!("KOL connections: {}", account.friends_count),
        ))
    }
}

/// Audience interaction with content: total interactions over total views.
/// The raw value is scaled by 1000 to spread typical rates (0.01–0.1)
/// before the engine normalizes it.
pub struct Engagement;

#[async_trait]
impl LeafEvaluator for Engagement {
    async fn evaluate(&self, account: &Account) -> anyhow::Result<Evaluation> {
        if account.tweets.is_empty() {
            return Ok(Evaluation::new(0.0, "No tweet data"));
        }
        let total_interactions: u64 = account.tweets.iter().map(|t| t.interactions()).sum();
        let total_views: u64 = account.tweets.iter().map(|t| t.views_count).sum();
        if total_views == 0 {
            return Ok(Evaluation::new(0.0, "No view count data"));
        }
        let rate = total_interactions as f64 / total_views as f64;

        let comment = banded_comment(
            rate,
            &[
                (0.08, "Extremely high engagement, active audience interaction"),
                (0.06, "Good engagement, moderate audience interaction"),
                (0.04, "Average engagement"),
                (0.02, "Low engagement"),
            ],
            "Very low engagement",
        );
        Ok(Evaluation::new(rate * 1000.0, comment))
    }
}

/// Content reach: natural log of average views per tweet. The log transform
/// lets accounts of very different scales share one normalized axis.
pub struct Views;

#[async_trait]
impl LeafEvaluator for Views {
    async fn evaluate(&self, account: &Account) -> anyhow::Result<Evaluation> {
        if account.tweets.is_empty() {
            return Ok(Evaluation::new(0.0, "No tweet data"));
        }
        let total_views: u64 = account.tweets.iter().map(|t| t.views_count).sum();
        let avg_views = total_views as f64 / account.tweets.len() as f64;
        if avg_views <= 0.0 {
            return Ok(Evaluation::new(0.0, "No view count data"));
        }
        let log_views = (avg_views + 1.0).ln();

        // Thresholds are on the log scale: ln(1001) ≈ 6.9, ln(10001) ≈ 9.2.
        let comment = banded_comment(
            log_views,
            &[
                (8.5, "Extremely high views with broad reach, top tier of KOLs"),
                (7.5, "High views with good reach to the target audience"),
                (6.5, "Moderate views with stable reach, mid-tier KOL"),
                (5.5, "Low views with limited reach, niche audience"),
            ],
            "Very low views with minimal reach",
        );
        Ok(Evaluation::new(log_views, comment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kolscore_core::model::Tweet;

    fn tweet(views: u64, likes: u64) -> Tweet {
        Tweet {
            tweet_id: "1".into(),
            author_id: "a".into(),
            full_text: "text".into(),
            views_count: views,
            likes_count: likes,
            ..Tweet::default()
        }
    }

    fn account(tweets: Vec<Tweet>) -> Account {
        Account {
            user_id: "1".into(),
            username: "tester".into(),
            tweets,
            ..Account::default()
        }
    }

    #[tokio::test]
    async fn originality_counts_non_reposts() {
        let mut repost = tweet(0, 0);
        repost.is_quote_status = true;
        let acct = account(vec![tweet(0, 0), tweet(0, 0), repost, tweet(0, 0)]);

        let eval = Originality.evaluate(&acct).await.unwrap();
        assert_eq!(eval.score, 0.75);
        assert!(eval.comment.contains("3/4"));
    }

    #[tokio::test]
    async fn originality_without_tweets_is_zero() {
        let eval = Originality.evaluate(&account(vec![])).await.unwrap();
        assert_eq!(eval.score, 0.0);
        assert_eq!(eval.comment, "No tweet data");
    }

    #[tokio::test]
    async fn kol_influence_returns_raw_friend_count() {
        let mut acct = account(vec![]);
        acct.friends_count = 250;
        let eval = KolInfluence.evaluate(&acct).await.unwrap();
        assert_eq!(eval.score, 250.0);

        acct.friends_count = 0;
        let eval = KolInfluence.evaluate(&acct).await.unwrap();
        assert_eq!(eval.score, 0.0);
    }

    #[tokio::test]
    async fn engagement_scales_rate() {
        // 50 likes over 1000 views: rate 0.05, scaled to 50.
        let acct = account(vec![tweet(600, 30), tweet(400, 20)]);
        let eval = Engagement.evaluate(&acct).await.unwrap();
        assert!((eval.score - 50.0).abs() < 1e-9);
        assert!(eval.comment.contains("Average engagement"));
    }

    #[tokio::test]
    async fn engagement_without_views_is_zero() {
        let acct = account(vec![tweet(0, 5)]);
        let eval = Engagement.evaluate(&acct).await.unwrap();
        assert_eq!(eval.score, 0.0);
        assert_eq!(eval.comment, "No view count data");
    }

    #[tokio::test]
    async fn views_applies_log_transform() {
        let acct = account(vec![tweet(999, 0)]);
        let eval = Views.evaluate(&acct).await.unwrap();
        assert!((eval.score - 1000.0f64.ln()).abs() < 1e-9);
    }
}
