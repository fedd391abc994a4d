/// Tolerant decoding of model output into JSON.
///
/// The backend is asked for JSON, but the request is advisory: models still wrap the
/// object in a fenced code block, surround it with prose, leave trailing commas or
/// add comments. Decoding therefore runs in layers:
///
/// 1. parse the whole text as-is;
/// 2. otherwise pick a candidate: the interior of the first fenced block, or else the
///    span from the first `{` to the last `}`;
/// 3. run the cleanup steps over the candidate, in order, and parse it.
///
/// Each layer is a plain function so it can be tested on its own.
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::model::StructuredAnalysis;

const PREVIEW_CHARS: usize = 300;
const ERROR_CONTEXT_CHARS: usize = 30;

static FENCED_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)```(?:json)?\s*(.*?)```").expect("valid regex"));
static TRAILING_COMMA_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*\}").expect("valid regex"));
static TRAILING_COMMA_ARRAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*\]").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("no JSON object found in model response")]
    NoJsonFound {
        /// Leading characters of the response.
        preview: String,
    },

    #[error("invalid JSON in model response: {message} (near `{context}`)")]
    JsonDecode { message: String, context: String },
}

type CandidateLayer = fn(&str) -> Option<&str>;
type CleanupStep = fn(&str) -> String;

/// Candidate extractors, tried in order after a direct parse fails.
const CANDIDATE_LAYERS: &[(&str, CandidateLayer)] =
    &[("fenced_block", fenced_block), ("brace_span", brace_span)];

/// Cleanup applied to the chosen candidate, in order.
const CLEANUP_STEPS: &[CleanupStep] = &[
    strip_fences,
    strip_trailing_commas_in_objects,
    strip_trailing_commas_in_arrays,
    strip_line_comments,
    strip_block_comments,
];

/// Decode model output and read it as a `StructuredAnalysis`.
pub fn parse_analysis(raw: &str) -> Result<StructuredAnalysis, DecodeError> {
    decode_response(raw).map(StructuredAnalysis::from_value)
}

/// Recover a JSON value from raw model output.
pub fn decode_response(raw: &str) -> Result<Value, DecodeError> {
    if let Some(value) = parse_direct(raw) {
        debug!(layer = "direct", "model response decoded");
        return Ok(value);
    }

    let Some((layer, candidate)) = CANDIDATE_LAYERS
        .iter()
        .find_map(|(name, layer)| layer(raw).map(|candidate| (*name, candidate)))
    else {
        warn!(preview = %preview(raw), "no JSON object in model response");
        return Err(DecodeError::NoJsonFound {
            preview: preview(raw),
        });
    };

    let cleaned = clean_candidate(candidate);
    match serde_json::from_str::<Value>(&cleaned) {
        Ok(value) => {
            debug!(layer, "model response decoded after cleanup");
            Ok(value)
        }
        Err(e) => {
            let context = error_context(&cleaned, &e);
            warn!(layer, error = %e, context = %context, "model response is not valid JSON");
            Err(DecodeError::JsonDecode {
                message: e.to_string(),
                context,
            })
        }
    }
}

pub fn parse_direct(text: &str) -> Option<Value> {
    serde_json::from_str(text).ok()
}

/// Interior of the first ```` ``` ```` block, optionally tagged `json`.
pub fn fenced_block(text: &str) -> Option<&str> {
    FENCED_BLOCK
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
}

/// Span from the first `{` to the last `}`, inclusive.
pub fn brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

pub fn clean_candidate(candidate: &str) -> String {
    CLEANUP_STEPS
        .iter()
        .fold(candidate.to_string(), |text, step| step(&text))
}

fn strip_fences(text: &str) -> String {
    text.trim().trim_matches('`').trim().to_string()
}

fn strip_trailing_commas_in_objects(text: &str) -> String {
    TRAILING_COMMA_OBJECT.replace_all(text, "}").into_owned()
}

fn strip_trailing_commas_in_arrays(text: &str) -> String {
    TRAILING_COMMA_ARRAY.replace_all(text, "]").into_owned()
}

fn strip_line_comments(text: &str) -> String {
    strip_outside_strings(text, "//", None)
}

fn strip_block_comments(text: &str) -> String {
    strip_outside_strings(text, "/*", Some("*/"))
}

/// Remove comments that start with `opener` and are not inside a JSON string.
///
/// With no `closer` the comment runs to the end of the line (the newline is kept).
/// An unterminated block comment is left untouched.
fn strip_outside_strings(text: &str, opener: &str, closer: Option<&str>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut i = 0;

    while i < text.len() {
        let rest = &text[i..];
        let Some(ch) = rest.chars().next() else {
            break;
        };

        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
        } else if ch == '"' {
            in_string = true;
        } else if rest.starts_with(opener) {
            let skip = match closer {
                None => rest.find('\n').unwrap_or(rest.len()),
                Some(closer) => match rest[opener.len()..].find(closer) {
                    Some(pos) => opener.len() + pos + closer.len(),
                    None => 0,
                },
            };
            if skip > 0 {
                i += skip;
                continue;
            }
        }

        out.push(ch);
        i += ch.len_utf8();
    }
    out
}

fn preview(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}

/// Up to 30 characters on either side of where serde_json gave up.
fn error_context(text: &str, err: &serde_json::Error) -> String {
    let mut offset = text
        .split_inclusive('\n')
        .take(err.line().saturating_sub(1))
        .map(str::len)
        .sum::<usize>()
        + err.column().saturating_sub(1);
    offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }

    let before: Vec<char> = text[..offset].chars().rev().take(ERROR_CONTEXT_CHARS).collect();
    let after = text[offset..].chars().take(ERROR_CONTEXT_CHARS);
    before.into_iter().rev().chain(after).collect()
}
