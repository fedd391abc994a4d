/// Deterministic construction of the analysis prompt.
///
/// The same article, catalog and template always produce byte-identical text, which
/// makes the prompt usable as a cache key.
use sha2::{Digest, Sha256};

use crate::catalog::{Checklist, ChecklistRule, PromptTemplate};
use crate::model::ArticleRecord;

/// Article content beyond this many characters is cut off.
pub const CONTENT_CHAR_LIMIT: usize = 3000;
/// Keywords listed per rule.
pub const KEYWORD_LIMIT: usize = 5;

const CLOSING_DIRECTIVE: &str =
    "JSON DIŞI TEK KARAKTER YAZMA. Bilinmeyen alanları boş string ('') bırak.";

pub fn build_prompt(
    article: &ArticleRecord,
    checklist: &Checklist,
    template: &PromptTemplate,
) -> String {
    let schema = serde_json::to_string_pretty(&template.schema).unwrap_or_else(|_| "{}".to_string());
    let content = truncate_chars(&article.content, CONTENT_CHAR_LIMIT);

    format!(
        "{role}\n\n\
         Görev: {task}\n\n\
         Format Talimatı: {format}\n\n\
         Makale Bilgileri:\n- Başlık: {title}\n- Yazar: {author}\n- Link: {url}\n\n\
         İçerik (özet):\n{content}\n\n\
         DEĞERLENDİRİLECEK KONTROL LİSTESİ:\n{checklist}\n\n\
         SADECE AŞAĞIDAKİ JSON ŞEMASINA UYAN TEK BİR JSON NESNESİ DÖN:\n{schema}\n\n\
         {CLOSING_DIRECTIVE}",
        role = template.role,
        task = template.task,
        format = template.format_instruction,
        title = article.title,
        author = article.author,
        url = article.url,
        checklist = render_checklist(checklist.rules()),
    )
}

/// Hex SHA-256 of the prompt text.
pub fn prompt_fingerprint(prompt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prompt.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn render_checklist(rules: &[ChecklistRule]) -> String {
    rules
        .iter()
        .enumerate()
        .map(|(i, rule)| render_rule(i + 1, rule))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_rule(ordinal: usize, rule: &ChecklistRule) -> String {
    let keywords = rule
        .keywords
        .iter()
        .take(KEYWORD_LIMIT)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "{ordinal}. {title} (ID: {id})\n   - Açıklama: {description}\n   - Ağırlık: {weight}/10\n   - Anahtar Kelimeler: {keywords}\n",
        title = rule.title,
        id = rule.id,
        description = rule.description,
        weight = rule.weight,
    )
}

fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ScoringRange;
    use serde_json::json;

    fn template() -> PromptTemplate {
        PromptTemplate {
            role: "Sen bir editörsün.".to_string(),
            task: "Makaleyi değerlendir.".to_string(),
            format_instruction: "Sadece JSON.".to_string(),
            schema: json!({"detaylar": [{"kural_id": "", "puan": 0}], "oneriler": [""]}),
        }
    }

    fn checklist() -> Checklist {
        let rule = |id: &str, keywords: &[&str]| ChecklistRule {
            id: id.to_string(),
            title: format!("Kural {id}"),
            description: format!("{id} açıklaması"),
            weight: 7,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        };
        Checklist::new(
            vec![
                rule("r1", &["a", "b", "c", "d", "e", "f", "g"]),
                rule("r2", &[]),
            ],
            vec![ScoringRange {
                category: "iyi".to_string(),
                min: 0,
                max: 100,
                description: String::new(),
            }],
        )
        .unwrap()
    }

    fn article(content: String) -> ArticleRecord {
        ArticleRecord::new(
            "Başlık".to_string(),
            "Yazar".to_string(),
            "https://medium.com/@y/p".to_string(),
            content,
        )
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let a = build_prompt(&article("içerik".to_string()), &checklist(), &template());
        let b = build_prompt(&article("içerik".to_string()), &checklist(), &template());
        assert_eq!(a, b);
        assert_eq!(prompt_fingerprint(&a), prompt_fingerprint(&b));
        assert_eq!(prompt_fingerprint(&a).len(), 64);
    }

    #[test]
    fn test_prompt_sections_in_order() {
        let prompt = build_prompt(&article("gövde metni".to_string()), &checklist(), &template());
        let positions: Vec<usize> = [
            "Sen bir editörsün.",
            "Görev: Makaleyi değerlendir.",
            "Format Talimatı: Sadece JSON.",
            "- Başlık: Başlık\n- Yazar: Yazar\n- Link: https://medium.com/@y/p",
            "İçerik (özet):\ngövde metni",
            "DEĞERLENDİRİLECEK KONTROL LİSTESİ:",
            "SADECE AŞAĞIDAKİ JSON ŞEMASINA",
            CLOSING_DIRECTIVE,
        ]
        .iter()
        .map(|needle| prompt.find(needle).unwrap_or_else(|| panic!("missing {needle}")))
        .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(prompt.ends_with(CLOSING_DIRECTIVE));
    }

    #[test]
    fn test_rule_rendering() {
        let prompt = build_prompt(&article(String::new()), &checklist(), &template());
        assert!(prompt.contains(
            "1. Kural r1 (ID: r1)\n   - Açıklama: r1 açıklaması\n   - Ağırlık: 7/10\n   - Anahtar Kelimeler: a, b, c, d, e\n\n2. Kural r2 (ID: r2)"
        ));
        assert!(!prompt.contains("a, b, c, d, e, f"));
    }

    #[test]
    fn test_schema_is_pretty_printed_in_order() {
        let prompt = build_prompt(&article(String::new()), &checklist(), &template());
        assert!(prompt.contains("{\n  \"detaylar\": [\n    {\n      \"kural_id\": \"\",\n      \"puan\": 0\n    }\n  ],\n  \"oneriler\""));
    }

    #[test]
    fn test_content_truncated_by_characters() {
        let content = "ğ".repeat(CONTENT_CHAR_LIMIT + 50);
        let prompt = build_prompt(&article(content), &checklist(), &template());
        let expected = format!("İçerik (özet):\n{}\n\n", "ğ".repeat(CONTENT_CHAR_LIMIT));
        assert!(prompt.contains(&expected));
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abcdef", 3), "abc");
    }
}
