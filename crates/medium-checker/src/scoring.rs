/// Weighted scoring of model verdicts against the rule catalog.
///
/// Each detail contributes `score * weight`, where the weight comes from the catalog
/// or defaults to 5 for ids the catalog does not know. The final score is
/// `floor(weighted / total_weight * 10)`. Detail scores are not clamped to 0..=10.
use tracing::info;

use crate::catalog::{Checklist, ScoringRange};
use crate::model::{AnalysisDetail, FinalScore, StructuredAnalysis};

pub const DEFAULT_WEIGHT: i64 = 5;
pub const FAILED_CATEGORY: &str = "failed";
const FAILED_DESCRIPTION: &str = "analysis failed";

/// Score a decoded analysis. A missing or empty detail list yields the degraded
/// `failed` result rather than an error.
pub fn score_analysis(analysis: &StructuredAnalysis, checklist: &Checklist) -> FinalScore {
    if analysis.has_details() {
        return score_details(analysis.details(), checklist);
    }
    info!("no analysis details, returning degraded score");
    FinalScore {
        score: 0,
        category: FAILED_CATEGORY.to_string(),
        description: FAILED_DESCRIPTION.to_string(),
    }
}

pub fn score_details(details: &[AnalysisDetail], checklist: &Checklist) -> FinalScore {
    // Model scores are unbounded, so sums are carried in i128.
    let mut total_weight: i128 = 0;
    let mut weighted_score: i128 = 0;

    for detail in details {
        let weight = checklist.weight_of(&detail.rule_id).unwrap_or(DEFAULT_WEIGHT);
        total_weight += i128::from(weight);
        weighted_score += i128::from(detail.score) * i128::from(weight);
    }

    let score = if total_weight > 0 {
        saturate((weighted_score * 10).div_euclid(total_weight))
    } else {
        0
    };

    let result = categorize(score, checklist.ranges());
    info!(
        details = details.len(),
        total_weight = saturate(total_weight),
        score,
        category = %result.category,
        "analysis scored"
    );
    result
}

fn saturate(value: i128) -> i64 {
    i64::try_from(value).unwrap_or(if value < 0 { i64::MIN } else { i64::MAX })
}

/// First range in catalog order containing `score`; `failed` when none does.
pub fn categorize(score: i64, ranges: &[ScoringRange]) -> FinalScore {
    match ranges.iter().find(|range| range.contains(score)) {
        Some(range) => FinalScore {
            score,
            category: range.category.clone(),
            description: range.description.clone(),
        },
        None => FinalScore {
            score,
            category: FAILED_CATEGORY.to_string(),
            description: String::new(),
        },
    }
}
