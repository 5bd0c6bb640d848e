//! Parsing of tagged model responses

use crate::types::RealismAssessment;
use crate::{PatsimError, Result};
use regex::Regex;
use std::sync::OnceLock;
use tracing::warn;

/// Tag holding the realism score
pub const SCORE_TAG: &str = "realism_score";
/// Tag holding the explanation
pub const EXPLANATION_TAG: &str = "explanation";
/// Tag holding suggested adjustments or improvements
pub const SUGGESTIONS_TAG: &str = "suggestions";
/// Tag holding the generated patient reply
pub const REPLY_TAG: &str = "patient_reply";

static NUMBER_RE: OnceLock<Option<Regex>> = OnceLock::new();

fn number_re() -> Option<&'static Regex> {
    NUMBER_RE
        .get_or_init(|| Regex::new(r"[-+]?(?:\d+\.?\d*|\.\d+)").ok())
        .as_ref()
}

/// Extract tag content
pub fn extract_xml_tag(xml: &str, tag: &str) -> Option<String> {
    let start_tag = format!("<{}>", tag);
    let end_tag = format!("</{}>", tag);

    if let Some(start_pos) = xml.find(&start_tag) {
        let content_start = start_pos + start_tag.len();
        if let Some(end_pos) = xml[content_start..].find(&end_tag) {
            return Some(
                xml[content_start..content_start + end_pos]
                    .trim()
                    .to_string(),
            );
        }
    }
    None
}

/// Parse a score string into [0, 1]
///
/// Text without any number yields 0.0. Numbers outside the range are
/// clamped, not rescaled.
pub fn parse_score(raw: &str) -> f32 {
    let Some(found) = number_re().and_then(|re| re.find(raw)) else {
        warn!("Invalid realism score '{}', using 0.0", raw);
        return 0.0;
    };
    match found.as_str().parse::<f32>() {
        Ok(score) if score.is_finite() => {
            if !(0.0..=1.0).contains(&score) {
                warn!("Realism score {} outside [0, 1], clamping", score);
            }
            score.clamp(0.0, 1.0)
        }
        _ => {
            warn!("Invalid realism score '{}', using 0.0", raw);
            0.0
        }
    }
}

/// Parse a mood validation or reply evaluation response
pub fn parse_assessment(response: &str) -> Result<RealismAssessment> {
    let raw_score = extract_xml_tag(response, SCORE_TAG).ok_or_else(|| {
        PatsimError::malformed(format!("response has no <{}> tag", SCORE_TAG))
    })?;

    let explanation = extract_xml_tag(response, EXPLANATION_TAG).unwrap_or_default();
    let suggestions = extract_xml_tag(response, SUGGESTIONS_TAG).filter(|s| !is_blank_answer(s));

    Ok(RealismAssessment {
        score: parse_score(&raw_score),
        explanation,
        suggestions,
    })
}

/// Parse a reply generation response
///
/// Falls back to the whole response when the model skipped the tag.
pub fn parse_reply(response: &str) -> Result<String> {
    let reply = extract_xml_tag(response, REPLY_TAG).unwrap_or_else(|| response.trim().to_string());
    if reply.is_empty() {
        return Err(PatsimError::malformed("model returned an empty patient reply"));
    }
    Ok(reply)
}

fn is_blank_answer(text: &str) -> bool {
    let lowered = text.trim().to_lowercase();
    matches!(lowered.as_str(), "" | "none" | "n/a" | "-")
}
