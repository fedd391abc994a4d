/// Presentation view of an analysis: rules bucketed by verdict plus counts.
///
/// Field names on the wire follow the established front-end contract.
use serde::Serialize;
use serde_json::Value;

use crate::model::{AnalysisDetail, AnalysisResult, ComplianceStatus};

const DEFAULT_MARKER: &str = "📊";

#[derive(Debug, Clone, Serialize)]
pub struct FormattedResult {
    pub id: String,
    pub timestamp: String,
    #[serde(rename = "makale")]
    pub article: ArticleSummary,
    #[serde(rename = "puan")]
    pub score: ScoreView,
    #[serde(rename = "kural_analizi")]
    pub rules: RuleBreakdown,
    #[serde(rename = "oneri")]
    pub recommendations: Vec<String>,
    #[serde(rename = "analiz_sonucu")]
    pub analysis: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArticleSummary {
    #[serde(rename = "baslik")]
    pub title: String,
    #[serde(rename = "yazar")]
    pub author: String,
    pub url: String,
    #[serde(rename = "kelime_sayisi")]
    pub word_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoreView {
    #[serde(rename = "deger")]
    pub value: i64,
    #[serde(rename = "kategori")]
    pub category: String,
    #[serde(rename = "aciklama")]
    pub description: String,
    #[serde(rename = "emoji")]
    pub marker: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct RuleBreakdown {
    #[serde(rename = "toplam_kural")]
    pub total: usize,
    #[serde(rename = "uygun")]
    pub compliant_count: usize,
    #[serde(rename = "uygun_olmayan")]
    pub non_compliant_count: usize,
    #[serde(rename = "uygun_kurallar")]
    pub compliant: Vec<RuleView>,
    #[serde(rename = "uygun_olmayan_kurallar")]
    pub non_compliant: Vec<RuleView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RuleView {
    pub id: String,
    #[serde(rename = "baslik")]
    pub title: String,
    #[serde(rename = "durum")]
    pub status: String,
    #[serde(rename = "puan")]
    pub score: i64,
    #[serde(rename = "aciklama")]
    pub description: String,
    #[serde(rename = "ornekler")]
    pub example: String,
}

impl From<&AnalysisDetail> for RuleView {
    fn from(detail: &AnalysisDetail) -> Self {
        Self {
            id: detail.rule_id.clone(),
            title: detail.rule_title.clone(),
            status: detail.status_label.clone(),
            score: detail.score,
            description: detail.description.clone(),
            example: detail.example.clone(),
        }
    }
}

pub fn category_marker(category: &str) -> &'static str {
    match category {
        "mukemmel" => "🏆",
        "iyi" => "✅",
        "orta" => "⚠️",
        "zayif" => "❌",
        "basarisiz" | "failed" => "🚫",
        _ => DEFAULT_MARKER,
    }
}

pub fn format_for_display(result: &AnalysisResult) -> FormattedResult {
    let details = result.analysis.details();
    let (compliant, non_compliant): (Vec<&AnalysisDetail>, Vec<&AnalysisDetail>) = details
        .iter()
        .partition(|detail| detail.status == ComplianceStatus::Compliant);

    let final_score = &result.final_score;
    FormattedResult {
        id: format!("analysis_{}", result.timestamp.timestamp()),
        timestamp: result.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
        article: ArticleSummary {
            title: result.article.title.clone(),
            author: result.article.author.clone(),
            url: result.article.url.clone(),
            word_count: result.article.word_count,
        },
        score: ScoreView {
            value: final_score.score,
            category: final_score.category.clone(),
            description: final_score.description.clone(),
            marker: category_marker(&final_score.category),
        },
        rules: RuleBreakdown {
            total: details.len(),
            compliant_count: compliant.len(),
            non_compliant_count: non_compliant.len(),
            compliant: compliant.into_iter().map(RuleView::from).collect(),
            non_compliant: non_compliant.into_iter().map(RuleView::from).collect(),
        },
        recommendations: result.analysis.recommendations.clone(),
        analysis: result.analysis.raw.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ArticleRecord, FinalScore, StructuredAnalysis};
    use chrono::TimeZone;
    use serde_json::json;

    fn result(raw: Value, category: &str) -> AnalysisResult {
        AnalysisResult {
            article: ArticleRecord::new(
                "Başlık".to_string(),
                "Yazar".to_string(),
                "https://medium.com/@y/p".to_string(),
                "bir iki üç".to_string(),
            ),
            analysis: StructuredAnalysis::from_value(raw),
            final_score: FinalScore {
                score: 75,
                category: category.to_string(),
                description: "İyi".to_string(),
            },
            timestamp: chrono::Local.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_partition_preserves_order() {
        let formatted = format_for_display(&result(
            json!({
                "detaylar": [
                    {"kural_id": "a", "durum": "uygun", "puan": 9},
                    {"kural_id": "b", "durum": "kismen_uygun", "puan": 5},
                    {"kural_id": "c", "durum": "uygun", "puan": 8},
                    {"kural_id": "d", "puan": 1}
                ],
                "oneriler": ["Daha fazla kod örneği ekleyin"]
            }),
            "iyi",
        ));

        let compliant: Vec<&str> = formatted.rules.compliant.iter().map(|r| r.id.as_str()).collect();
        let others: Vec<&str> = formatted.rules.non_compliant.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(compliant, vec!["a", "c"]);
        assert_eq!(others, vec!["b", "d"]);
        assert_eq!(formatted.rules.compliant[0].status, "uygun");
        assert_eq!(formatted.rules.non_compliant[0].status, "kismen_uygun");
        assert_eq!(formatted.rules.non_compliant[1].status, "");
        assert_eq!(formatted.rules.total, 4);
        assert_eq!(formatted.rules.compliant_count, 2);
        assert_eq!(formatted.rules.non_compliant_count, 2);
        assert_eq!(formatted.recommendations, vec!["Daha fazla kod örneği ekleyin"]);
        assert_eq!(formatted.score.marker, "✅");
        assert_eq!(formatted.article.word_count, 3);
        assert_eq!(formatted.timestamp, "2024-05-01 12:30:00");
        assert!(formatted.id.starts_with("analysis_"));
    }

    #[test]
    fn test_missing_details_and_recommendations() {
        let formatted = format_for_display(&result(json!({}), "something_else"));
        assert_eq!(formatted.rules.total, 0);
        assert!(formatted.recommendations.is_empty());
        assert_eq!(formatted.score.marker, DEFAULT_MARKER);
    }

    #[test]
    fn test_free_form_status_is_echoed() {
        let formatted = format_for_display(&result(
            json!({"detaylar": [{"kural_id": "a", "durum": "Uygun Değil", "puan": 2}]}),
            "zayif",
        ));
        assert_eq!(formatted.rules.non_compliant[0].status, "Uygun Değil");
    }

    #[test]
    fn test_wire_keys() {
        let formatted = format_for_display(&result(json!({"detaylar": []}), "failed"));
        let json = serde_json::to_value(&formatted).unwrap();
        assert_eq!(json["puan"]["deger"], 75);
        assert_eq!(json["puan"]["emoji"], "🚫");
        assert_eq!(json["makale"]["baslik"], "Başlık");
        assert_eq!(json["kural_analizi"]["toplam_kural"], 0);
        assert!(json["oneri"].as_array().unwrap().is_empty());
    }
}
