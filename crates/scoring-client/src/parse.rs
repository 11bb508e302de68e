use call_core::SentimentScores;
use serde_json::Value;

/// Parse model output leniently: accept a bare JSON object or one wrapped in
/// markdown code fences. Unparseable output degrades to all-absent scores.
pub fn parse_scores(raw: &str) -> SentimentScores {
    let value = match lenient_json(raw) {
        Some(v) => v,
        None => {
            tracing::warn!("Unparseable scoring output, treating all scores as absent");
            return SentimentScores::default();
        }
    };

    SentimentScores {
        forward_looking_sentiment: category(&value, "forward_looking_sentiment"),
        management_confidence: category(&value, "management_confidence"),
        risk_and_uncertainty: category(&value, "risk_and_uncertainty"),
        qa_sentiment: category(&value, "qa_sentiment"),
        opening_sentiment: category(&value, "opening_sentiment"),
        financial_performance_sentiment: category(&value, "financial_performance_sentiment"),
        macroeconomic_reference_sentiment: category(&value, "macroeconomic_reference_sentiment"),
    }
}

fn lenient_json(raw: &str) -> Option<Value> {
    if raw.is_empty() {
        return None;
    }
    if let Ok(v) = serde_json::from_str(raw) {
        return Some(v);
    }
    let cleaned = raw
        .trim()
        .trim_matches('`')
        .replace("```json", "")
        .replace("```", "");
    serde_json::from_str(cleaned.trim()).ok()
}

/// Scores are contractually in [-1, 1]; out-of-range numbers are clamped
/// rather than discarded.
fn category(value: &Value, key: &str) -> Option<f64> {
    value.get(key)?.as_f64().map(|s| s.clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_json_object() {
        let scores = parse_scores(r#"{"forward_looking_sentiment": 0.4, "qa_sentiment": -0.2}"#);
        assert_eq!(scores.forward_looking_sentiment, Some(0.4));
        assert_eq!(scores.qa_sentiment, Some(-0.2));
        assert_eq!(scores.management_confidence, None);
    }

    #[test]
    fn strips_markdown_fences() {
        let raw = "```json\n{\"management_confidence\": 0.9}\n```";
        let scores = parse_scores(raw);
        assert_eq!(scores.management_confidence, Some(0.9));
    }

    #[test]
    fn clamps_out_of_range_values() {
        let scores = parse_scores(r#"{"risk_and_uncertainty": 3.5, "opening_sentiment": -2.0}"#);
        assert_eq!(scores.risk_and_uncertainty, Some(1.0));
        assert_eq!(scores.opening_sentiment, Some(-1.0));
    }

    #[test]
    fn garbage_degrades_to_absent() {
        assert_eq!(parse_scores("not json at all"), SentimentScores::default());
        assert_eq!(parse_scores(""), SentimentScores::default());
    }

    #[test]
    fn non_numeric_category_is_absent() {
        let scores = parse_scores(r#"{"qa_sentiment": "positive"}"#);
        assert_eq!(scores.qa_sentiment, None);
    }
}
