/// Transcripts are truncated to this many characters before prompting.
pub const CHAR_CAP: usize = 80_000;

pub const PROMPT_HEADER: &str = r#"I will provide the transcript of an earnings call. Your job is to analyze the text only based on what is actually present in the transcript. For each of the following categories, assign a score between -1 and 1:

forward_looking_sentiment: How positive or negative is the company's outlook or projections for the future?
management_confidence: How confident does management appear about business performance and strategy?
risk_and_uncertainty: How much concern, risk, or uncertainty is conveyed (higher = more risk)?
qa_sentiment: How positive or negative is the tone during the Q&A section with analysts?
opening_sentiment: How positive or negative is the opening section or prepared remarks?
financial_performance_sentiment: Based solely on what is said in the transcript, how positively is past financial performance portrayed?
macroeconomic_reference_sentiment: If there are references to broader macroeconomic conditions, how optimistic or pessimistic are those?

If a category is not addressed clearly in the transcript, return exactly 0 for that category.

Use the following format for your output:
{
  "forward_looking_sentiment": ___,
  "management_confidence": ___,
  "risk_and_uncertainty": ___,
  "qa_sentiment": ___,
  "opening_sentiment": ___,
  "financial_performance_sentiment": ___,
  "macroeconomic_reference_sentiment": ___
}
Do not include any text or explanation; only return the JSON object. Do not guess or infer information that is not directly stated in the transcript.

Transcript:"#;

/// Prompt for one transcript, capped at [`CHAR_CAP`] characters of text.
pub fn build_prompt(transcript: &str) -> String {
    let capped: String = transcript.chars().take(CHAR_CAP).collect();
    format!("{PROMPT_HEADER}\n{capped}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_caps_transcript_length() {
        let long = "a".repeat(CHAR_CAP + 1000);
        let prompt = build_prompt(&long);
        assert_eq!(
            prompt.chars().count(),
            PROMPT_HEADER.chars().count() + 1 + CHAR_CAP
        );
    }

    #[test]
    fn prompt_keeps_short_transcripts_whole() {
        let prompt = build_prompt("short transcript");
        assert!(prompt.ends_with("short transcript"));
    }
}
