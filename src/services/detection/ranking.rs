// Ranking
// Turns a per-context distribution into a primary context plus ordered alternatives

use std::cmp::Ordering;

use crate::models::{ContextPrediction, ContextScores, DetectionMethod, DetectionResult};

/// Highest confidence becomes primary; the other two follow in descending order.
/// Equal confidences keep the Code, Email, Chat order.
pub fn rank(scores: &ContextScores, method: DetectionMethod) -> DetectionResult {
    let mut ordered: Vec<ContextPrediction> = scores
        .iter()
        .map(|(context, confidence)| ContextPrediction {
            context,
            confidence,
        })
        .collect();
    // sort_by is stable, which is what makes the tie-break hold.
    ordered.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(Ordering::Equal));

    let primary = ordered[0];
    DetectionResult {
        primary: primary.context,
        confidence: primary.confidence.clamp(0.0, 1.0),
        alternatives: [ordered[1], ordered[2]],
        method,
    }
}
