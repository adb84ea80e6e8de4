use crate::fingerprint::FingerprintResult;

const PROMPT_PREFIX: &str = "Analyze the following BuiltWith result and provide insights:";

/// Builds the insight prompt: a fixed instruction followed by the pretty
/// printed response document.
pub fn build_insight_prompt(result: &FingerprintResult) -> String {
    render(&result.to_pretty_json())
}

fn render(document: &str) -> String {
    format!("{}\n\n{}.", PROMPT_PREFIX, document)
}
