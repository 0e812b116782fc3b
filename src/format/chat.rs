//! Markdown to Slack `mrkdwn`.

use std::sync::OnceLock;

use regex::Regex;

/// Replacements in the order they are applied. Links go first so that their labels are not
/// touched by the emphasis rule.
fn rules() -> &'static [(Regex, &'static str)] {
    static RULES: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    RULES.get_or_init(|| {
        [
            // [label](url)
            (r"\[([^\]]+)\]\s*\(([^)]+)\)", "<$2|$1>"),
            // 🔗 label (url), as models sometimes write links
            (r"(🔗.*?)\s*\((https?://[^)]+)\)", "<$2|$1>"),
            (r"(?m)^#{1,3} (.+)$", "*$1*"),
            (r"\*\*(.+?)\*\*", "*$1*"),
            (r"(?m)^- ", "• "),
            (r"(?m)^  📎", "    📎"),
        ]
        .into_iter()
        .map(|(pattern, replacement)| {
            (
                Regex::new(pattern).expect("chat markup regex must compile"),
                replacement,
            )
        })
        .collect()
    })
}

pub fn to_slack_markup(markdown: &str) -> String {
    rules()
        .iter()
        .fold(markdown.to_string(), |text, (regex, replacement)| {
            regex.replace_all(&text, *replacement).into_owned()
        })
}
