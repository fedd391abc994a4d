use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

/// Article metadata and body text pulled out of a fetched page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleRecord {
    pub title: String,
    pub author: String,
    pub url: String,
    pub content: String,
    /// Whitespace-delimited tokens in `content`.
    pub word_count: usize,
}

impl ArticleRecord {
    pub fn new(title: String, author: String, url: String, content: String) -> Self {
        let word_count = content.split_whitespace().count();
        Self {
            title,
            author,
            url,
            content,
            word_count,
        }
    }
}

/// Verdict the model gives for one checklist rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    Compliant,
    PartiallyCompliant,
    NonCompliant,
    #[default]
    Unknown,
}

impl ComplianceStatus {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "uygun" | "compliant" => ComplianceStatus::Compliant,
            "kismen_uygun" | "kısmen_uygun" | "partially_compliant" => {
                ComplianceStatus::PartiallyCompliant
            }
            "uygun_degil" | "uygun_değil" | "non_compliant" => ComplianceStatus::NonCompliant,
            _ => ComplianceStatus::Unknown,
        }
    }
}

/// One per-rule entry of the model's `detaylar` list.
///
/// Every field is optional on the wire; missing or oddly typed values decay to
/// empty strings, `Unknown` status and a score of 0.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "WireDetail")]
pub struct AnalysisDetail {
    pub rule_id: String,
    pub rule_title: String,
    pub status: ComplianceStatus,
    /// `durum` exactly as the model wrote it, for display.
    pub status_label: String,
    pub score: i64,
    pub description: String,
    pub example: String,
}

#[derive(Deserialize)]
struct WireDetail {
    #[serde(rename = "kural_id", default, deserialize_with = "lenient_string")]
    rule_id: String,
    #[serde(rename = "kural_baslik", default, deserialize_with = "lenient_string")]
    rule_title: String,
    #[serde(rename = "durum", default, deserialize_with = "lenient_string")]
    status: String,
    #[serde(rename = "puan", default, deserialize_with = "lenient_score")]
    score: i64,
    #[serde(rename = "aciklama", default, deserialize_with = "lenient_string")]
    description: String,
    #[serde(rename = "ornek", default, deserialize_with = "lenient_string")]
    example: String,
}

impl From<WireDetail> for AnalysisDetail {
    fn from(wire: WireDetail) -> Self {
        Self {
            rule_id: wire.rule_id,
            rule_title: wire.rule_title,
            status: ComplianceStatus::from_label(&wire.status),
            status_label: wire.status,
            score: wire.score,
            description: wire.description,
            example: wire.example,
        }
    }
}

/// The decoded model answer.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredAnalysis {
    /// `None` when the model omitted `detaylar` or sent something other than a list.
    pub details: Option<Vec<AnalysisDetail>>,
    pub recommendations: Vec<String>,
    pub raw: Value,
}

impl StructuredAnalysis {
    pub fn from_value(raw: Value) -> Self {
        let details = raw.get("detaylar").and_then(Value::as_array).map(|entries| {
            entries
                .iter()
                .enumerate()
                .filter_map(|(index, entry)| {
                    serde_json::from_value::<AnalysisDetail>(entry.clone())
                        .inspect_err(|e| warn!(index, error = %e, "skipping malformed analysis detail"))
                        .ok()
                })
                .collect()
        });

        let recommendations = match raw.get("oneriler") {
            Some(Value::Array(items)) => items.iter().map(value_to_text).collect(),
            Some(Value::String(s)) if !s.trim().is_empty() => vec![s.clone()],
            _ => Vec::new(),
        };

        Self {
            details,
            recommendations,
            raw,
        }
    }

    pub fn details(&self) -> &[AnalysisDetail] {
        self.details.as_deref().unwrap_or(&[])
    }

    /// `false` when there is nothing to score; such an analysis degrades to `failed`.
    pub fn has_details(&self) -> bool {
        !self.details().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinalScore {
    pub score: i64,
    pub category: String,
    pub description: String,
}

/// Everything produced by one pipeline run.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub article: ArticleRecord,
    pub analysis: StructuredAnalysis,
    pub final_score: FinalScore,
    pub timestamp: chrono::DateTime<chrono::Local>,
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(value_to_text(&Value::deserialize(deserializer)?))
}

// Fractional scores are rounded; out-of-range values pass through untouched.
fn lenient_score<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let number = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f.round() as i64))
        }
        _ => None,
    };
    Ok(number.unwrap_or(0))
}
