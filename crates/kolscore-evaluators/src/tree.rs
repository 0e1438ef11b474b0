//! The standard KOL scoring tree.

use std::sync::Arc;

use kolscore_core::traits::ChatModel;
use kolscore_core::tree::{Combinator, ScoreNode};

use crate::deterministic::{Engagement, KolInfluence, Originality, Views};
use crate::llm::{ContentDepth, HumanVitality};

/// Build the default scoring tree.
///
/// Five dimensions average under `other_factors`, then the root multiplies
/// that average by `human_vitality`: an inauthentic account scores low no
/// matter how strong its content metrics are.
pub fn default_tree(chat: Arc<dyn ChatModel>) -> ScoreNode {
    let other_factors = ScoreNode::branch(
        "other_factors",
        "Other Factors",
        vec![
            ScoreNode::leaf("originality", "Originality", Arc::new(Originality))
                .with_description(
                    "Ratio of original content to reposts. Higher ratio indicates more \
                     original content.",
                )
                .raw(),
            ScoreNode::leaf("kol_influence", "KOL Influence", Arc::new(KolInfluence))
                .with_description(
                    "Recognition and connectivity within the KOL community, based on the \
                     author's connections to other KOLs. Normalized to compare KOLs of \
                     different scales.",
                ),
            ScoreNode::leaf(
                "content_depth",
                "Content Depth",
                Arc::new(ContentDepth::new(chat.clone())),
            )
            .with_description(
                "Content analysis depth and quality: the average depth score across all \
                 tweets.",
            )
            .raw(),
            ScoreNode::leaf("engagement", "Engagement", Arc::new(Engagement))
                .with_description(
                    "Audience interaction with content, measured as total interactions over \
                     total views.",
                ),
            ScoreNode::leaf("views", "Views", Arc::new(Views)).with_description(
                "Content reach, log-transformed then normalized so KOLs of different scales \
                 share one axis.",
            ),
        ],
    )
    .with_description("Average of Originality, KOL Influence, Content Depth, Engagement, and Views");

    let human_vitality = ScoreNode::leaf(
        "human_vitality",
        "Human Vitality",
        Arc::new(HumanVitality::new(chat)),
    )
    .with_description(
        "Human authenticity assessment. Detects engagement inflation and fake followers from \
         interaction anomalies.",
    )
    .raw();

    ScoreNode::branch("root", "Overall Score", vec![other_factors, human_vitality])
        .with_description("KOL overall score = (average of the other five factors) x Human Vitality")
        .with_combinator(Combinator::Product)
}
