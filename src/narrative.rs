//! Optional narrative stage.
//!
//! Sends a compact summary of the finished analysis to the Gemini API and
//! parses the reply into an executive narrative with mitigations. This stage
//! is strictly best-effort: every failure mode (missing key, network error,
//! bad HTTP status, unparsable reply) degrades to `None` with a warning, and
//! the analysis result is never affected.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Environment variable holding the API key. Absent means the stage is off.
const API_KEY_ENV: &str = "GEMINI_API_KEY";

const API_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent";

/// Summary shown when the model replied with prose instead of the requested
/// JSON shape.
const UNPARSED_SUMMARY: &str =
    "Narrative could not be structured automatically; raw model output attached.";

/// What the model is asked to summarize. Built from the finished report so
/// the model never sees raw log lines.
#[derive(Debug, Clone, Serialize)]
pub struct NarrativeContext {
    pub total_records: usize,
    pub total_anomalies: usize,
    pub top_categories: Vec<(String, usize)>,
    pub highest_severity: String,
    /// A few representative reason strings.
    pub sample_reasons: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mitigation {
    pub title: String,
    /// One-line summary of the risk.
    pub summary: String,
    /// Recommended actions.
    #[serde(default)]
    pub actions: Vec<String>,
    /// Short example scenarios or log lines.
    #[serde(default)]
    pub examples: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrativeReport {
    pub summary: String,
    #[serde(default)]
    pub mitigations: Vec<Mitigation>,
    /// Raw model text, kept only when structured parsing failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

pub struct NarrativeClient {
    http: reqwest::Client,
    api_key: String,
}

impl NarrativeClient {
    /// `None` when no API key is configured.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var(API_KEY_ENV).ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        Some(Self {
            http: reqwest::Client::new(),
            api_key,
        })
    }

    /// Generate a narrative for the analysis. Never fails the caller.
    pub async fn generate(&self, context: &NarrativeContext) -> Option<NarrativeReport> {
        let prompt = build_prompt(context);
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let response = match self
            .http
            .post(format!("{API_URL}?key={}", self.api_key))
            .json(&body)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                log::warn!("narrative request failed: {e}");
                return None;
            }
        };
        if !response.status().is_success() {
            log::warn!("narrative request returned status {}", response.status());
            return None;
        }
        let payload: Value = match response.json().await {
            Ok(v) => v,
            Err(e) => {
                log::warn!("narrative response was not JSON: {e}");
                return None;
            }
        };

        let text = payload["candidates"][0]["content"]["parts"][0]["text"].as_str()?;
        Some(parse_reply(text))
    }
}

fn build_prompt(context: &NarrativeContext) -> String {
    let categories = context
        .top_categories
        .iter()
        .map(|(name, count)| format!("{name} ({count})"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "You are a security analyst. An automated engine analyzed {} log records and \
         found {} anomalies. Highest severity: {}. Threat categories: {}. \
         Example observations: {}. \
         Respond with JSON only, no markdown: {{\"summary\": \"...\", \"mitigations\": \
         [{{\"title\": \"...\", \"summary\": \"one-line risk summary\", \
         \"actions\": [\"1-2 recommended actions\"], \
         \"examples\": [\"1-2 short example scenarios or log lines\"]}}]}}",
        context.total_records,
        context.total_anomalies,
        context.highest_severity,
        categories,
        context.sample_reasons.join("; "),
    )
}

/// Parse the model's reply, tolerating markdown code fences. Structurally
/// invalid replies fall back to carrying the raw text.
pub fn parse_reply(text: &str) -> NarrativeReport {
    let stripped = strip_fences(text);
    match serde_json::from_str::<NarrativeReport>(stripped) {
        Ok(mut report) if !report.summary.trim().is_empty() => {
            report.raw = None;
            report
        }
        _ => NarrativeReport {
            summary: UNPARSED_SUMMARY.to_string(),
            mitigations: Vec::new(),
            raw: Some(text.to_string()),
        },
    }
}

/// Strip a surrounding ``` or ```json fence, if present.
fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_json() {
        let reply = r#"{"summary": "Two hosts show exfiltration patterns.",
            "mitigations": [{
                "title": "Data Exfiltration",
                "summary": "One host uploaded far more than the batch baseline.",
                "actions": ["Rate-limit uploads", "Quarantine the host"],
                "examples": ["203.0.113.9 sent 150000 bytes to exfil-drop.xyz"]}]}"#;
        let report = parse_reply(reply);
        assert_eq!(report.summary, "Two hosts show exfiltration patterns.");
        assert_eq!(report.mitigations.len(), 1);
        assert_eq!(report.mitigations[0].title, "Data Exfiltration");
        assert_eq!(report.mitigations[0].actions.len(), 2);
        assert_eq!(report.mitigations[0].examples.len(), 1);
        assert!(report.raw.is_none());
    }

    #[test]
    fn test_mitigation_lists_default_when_absent() {
        let reply = r#"{"summary": "Low risk.",
            "mitigations": [{"title": "Monitor", "summary": "Nothing urgent."}]}"#;
        let report = parse_reply(reply);
        assert_eq!(report.mitigations.len(), 1);
        assert!(report.mitigations[0].actions.is_empty());
        assert!(report.mitigations[0].examples.is_empty());
    }

    #[test]
    fn test_parse_fenced_json() {
        let reply = "```json\n{\"summary\": \"All clear.\", \"mitigations\": []}\n```";
        let report = parse_reply(reply);
        assert_eq!(report.summary, "All clear.");
        assert!(report.raw.is_none());
    }

    #[test]
    fn test_prose_falls_back_to_raw() {
        let reply = "The logs look mostly fine, although one host stands out.";
        let report = parse_reply(reply);
        assert_eq!(report.summary, UNPARSED_SUMMARY);
        assert!(report.mitigations.is_empty());
        assert_eq!(report.raw.as_deref(), Some(reply));
    }

    #[test]
    fn test_empty_summary_falls_back() {
        let reply = r#"{"summary": "  ", "mitigations": []}"#;
        let report = parse_reply(reply);
        assert_eq!(report.summary, UNPARSED_SUMMARY);
        assert!(report.raw.is_some());
    }

    #[test]
    fn test_missing_mitigations_defaulted() {
        let report = parse_reply(r#"{"summary": "One anomaly."}"#);
        assert_eq!(report.summary, "One anomaly.");
        assert!(report.mitigations.is_empty());
    }
}
