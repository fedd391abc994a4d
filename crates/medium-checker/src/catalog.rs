/// Rule catalog and prompt templates, loaded once at startup.
///
/// The checklist file has the shape:
///
/// ```json
/// {
///   "kontrol_maddeleri": [{"id": "...", "baslik": "...", "aciklama": "...", "agirlik": 8, "anahtar_kelimeler": []}],
///   "puanlama_sistemi": {"araliklar": {"mukemmel": {"min": 90, "max": 100, "aciklama": "..."}}}
/// }
/// ```
///
/// Range order in `araliklar` is significant: the first range containing a score wins.
use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::AnalysisError;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChecklistRule {
    pub id: String,
    #[serde(rename = "baslik")]
    pub title: String,
    #[serde(rename = "aciklama", default)]
    pub description: String,
    #[serde(rename = "agirlik")]
    pub weight: i64,
    #[serde(rename = "anahtar_kelimeler", default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoringRange {
    pub category: String,
    pub min: i64,
    pub max: i64,
    pub description: String,
}

impl ScoringRange {
    pub fn contains(&self, score: i64) -> bool {
        self.min <= score && score <= self.max
    }
}

#[derive(Debug, Deserialize)]
struct RawChecklist {
    #[serde(rename = "kontrol_maddeleri", default)]
    rules: Vec<ChecklistRule>,
    #[serde(rename = "puanlama_sistemi", default)]
    scoring: RawScoring,
}

#[derive(Debug, Default, Deserialize)]
struct RawScoring {
    #[serde(rename = "araliklar", default)]
    ranges: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RawRange {
    min: i64,
    max: i64,
    #[serde(rename = "aciklama", default)]
    description: String,
}

/// Immutable, ordered rule catalog plus category ranges.
#[derive(Debug, Clone)]
pub struct Checklist {
    rules: Vec<ChecklistRule>,
    weights: HashMap<String, i64>,
    ranges: Vec<ScoringRange>,
}

impl Checklist {
    pub fn new(rules: Vec<ChecklistRule>, ranges: Vec<ScoringRange>) -> Result<Self, AnalysisError> {
        let mut weights = HashMap::with_capacity(rules.len());
        for rule in &rules {
            if !(1..=10).contains(&rule.weight) {
                return Err(AnalysisError::Catalog(format!(
                    "rule {} has weight {} outside 1..=10",
                    rule.id, rule.weight
                )));
            }
            if weights.insert(rule.id.clone(), rule.weight).is_some() {
                return Err(AnalysisError::Catalog(format!("duplicate rule id: {}", rule.id)));
            }
        }

        for range in &ranges {
            if range.min > range.max || range.min < 0 || range.max > 100 {
                return Err(AnalysisError::Catalog(format!(
                    "range {} ({}..={}) must satisfy 0 <= min <= max <= 100",
                    range.category, range.min, range.max
                )));
            }
        }

        Ok(Self {
            rules,
            weights,
            ranges,
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self, AnalysisError> {
        let raw: RawChecklist = serde_json::from_str(json)
            .map_err(|e| AnalysisError::Catalog(format!("invalid checklist JSON: {e}")))?;

        let mut ranges = Vec::with_capacity(raw.scoring.ranges.len());
        for (category, value) in raw.scoring.ranges {
            let bounds: RawRange = serde_json::from_value(value).map_err(|e| {
                AnalysisError::Catalog(format!("invalid range {category}: {e}"))
            })?;
            ranges.push(ScoringRange {
                category,
                min: bounds.min,
                max: bounds.max,
                description: bounds.description,
            });
        }

        Self::new(raw.rules, ranges)
    }

    pub fn load(path: &Path) -> Result<Self, AnalysisError> {
        let json = read_catalog_file(path)?;
        Self::from_json_str(&json)
    }

    /// Rules in catalog order.
    pub fn rules(&self) -> &[ChecklistRule] {
        &self.rules
    }

    pub fn weight_of(&self, rule_id: &str) -> Option<i64> {
        self.weights.get(rule_id).copied()
    }

    /// Category ranges in catalog order.
    pub fn ranges(&self) -> &[ScoringRange] {
        &self.ranges
    }
}

/// The analysis prompt pieces from `prompts.json` (`ana_analiz_prompt`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PromptTemplate {
    #[serde(rename = "sistem_rolu")]
    pub role: String,
    #[serde(rename = "gorev_tanimi")]
    pub task: String,
    #[serde(rename = "format_talimati")]
    pub format_instruction: String,
    /// Example of the JSON object the model must return.
    #[serde(rename = "json_sablonu", default = "empty_object")]
    pub schema: Value,
}

#[derive(Debug, Deserialize)]
struct RawPrompts {
    #[serde(rename = "ana_analiz_prompt")]
    analysis: PromptTemplate,
}

impl PromptTemplate {
    pub fn from_json_str(json: &str) -> Result<Self, AnalysisError> {
        let raw: RawPrompts = serde_json::from_str(json)
            .map_err(|e| AnalysisError::Catalog(format!("invalid prompts JSON: {e}")))?;
        Ok(raw.analysis)
    }

    pub fn load(path: &Path) -> Result<Self, AnalysisError> {
        let json = read_catalog_file(path)?;
        Self::from_json_str(&json)
    }
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

fn read_catalog_file(path: &Path) -> Result<String, AnalysisError> {
    std::fs::read_to_string(path)
        .map_err(|e| AnalysisError::Catalog(format!("failed to read {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHECKLIST: &str = r#"{
        "kontrol_maddeleri": [
            {"id": "baslik_uzunlugu", "baslik": "Başlık uzunluğu", "aciklama": "Kısa başlık", "agirlik": 6,
             "anahtar_kelimeler": ["başlık"]},
            {"id": "kod_ornegi", "baslik": "Kod örneği", "aciklama": "Kod var mı", "agirlik": 9}
        ],
        "puanlama_sistemi": {
            "araliklar": {
                "zayif": {"min": 0, "max": 49, "aciklama": "Zayıf"},
                "orta": {"min": 50, "max": 69, "aciklama": "Orta"},
                "iyi": {"min": 70, "max": 89, "aciklama": "İyi"},
                "mukemmel": {"min": 90, "max": 100, "aciklama": "Mükemmel"}
            }
        }
    }"#;

    #[test]
    fn test_load_checklist_keeps_order() {
        let checklist = Checklist::from_json_str(CHECKLIST).unwrap();
        assert_eq!(checklist.rules().len(), 2);
        assert_eq!(checklist.rules()[0].id, "baslik_uzunlugu");
        assert!(checklist.rules()[1].keywords.is_empty());
        assert_eq!(checklist.weight_of("kod_ornegi"), Some(9));
        assert_eq!(checklist.weight_of("missing"), None);

        let categories: Vec<&str> = checklist.ranges().iter().map(|r| r.category.as_str()).collect();
        assert_eq!(categories, vec!["zayif", "orta", "iyi", "mukemmel"]);
    }

    #[test]
    fn test_rejects_bad_weight() {
        let json = r#"{"kontrol_maddeleri": [{"id": "a", "baslik": "A", "agirlik": 11}]}"#;
        let err = Checklist::from_json_str(json).unwrap_err();
        assert!(err.to_string().contains("outside 1..=10"));
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let json = r#"{"kontrol_maddeleri": [
            {"id": "a", "baslik": "A", "agirlik": 1},
            {"id": "a", "baslik": "B", "agirlik": 2}
        ]}"#;
        assert!(Checklist::from_json_str(json).is_err());
    }

    #[test]
    fn test_rejects_inverted_range() {
        let json = r#"{"puanlama_sistemi": {"araliklar": {"x": {"min": 60, "max": 10}}}}"#;
        assert!(Checklist::from_json_str(json).is_err());
    }

    #[test]
    fn test_prompt_template_defaults_schema() {
        let json = r#"{"ana_analiz_prompt": {"sistem_rolu": "R", "gorev_tanimi": "G", "format_talimati": "F"}}"#;
        let template = PromptTemplate::from_json_str(json).unwrap();
        assert_eq!(template.role, "R");
        assert_eq!(template.schema, empty_object());
    }

    #[test]
    fn test_shipped_catalogs_load() {
        let checklist = Checklist::from_json_str(include_str!("../../../config/checklist.json")).unwrap();
        let categories: Vec<&str> = checklist.ranges().iter().map(|r| r.category.as_str()).collect();
        assert_eq!(categories, vec!["zayif", "orta", "iyi", "mukemmel"]);
        assert_eq!(checklist.weight_of("teknik_dogruluk"), Some(10));

        let template = PromptTemplate::from_json_str(include_str!("../../../config/prompts.json")).unwrap();
        assert!(template.schema.get("detaylar").is_some());
    }
}
