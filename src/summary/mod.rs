//! Highlights of a day picked by a language model. Summarizing never fails the run: every problem
//! ends up as [SummaryOutcome::Unavailable].

pub mod gemini;

use std::{fmt::Display, sync::OnceLock, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use tracing::{info, warn};

use crate::{config::SummaryConfig, utils::text::char_prefix};

pub const HIGHLIGHT_COUNT: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Highlight {
    pub title: String,
    pub description: String,
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    highlights: Vec<Highlight>,
}

impl Summary {
    /// Keeps at most [HIGHLIGHT_COUNT] highlights.
    pub fn new(mut highlights: Vec<Highlight>) -> Self {
        highlights.truncate(HIGHLIGHT_COUNT);
        Self { highlights }
    }

    pub fn highlights(&self) -> &[Highlight] {
        &self.highlights
    }

    pub fn to_markdown(&self) -> String {
        self.highlights
            .iter()
            .enumerate()
            .map(|(index, highlight)| {
                let mut entry = format!("{}. **{}**", index + 1, highlight.title);
                if !highlight.description.is_empty() {
                    entry.push_str(&format!("\n   {}", highlight.description));
                }
                for link in &highlight.links {
                    entry.push_str(&format!("\n   - 🔗 [{}]({})", link.label, link.url));
                }
                entry
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnavailableReason {
    /// No API key.
    NotConfigured,
    /// Turned off for this run.
    Disabled,
    Failed(String),
}

impl Display for UnavailableReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnavailableReason::NotConfigured => write!(f, "no API key configured"),
            UnavailableReason::Disabled => write!(f, "summary disabled"),
            UnavailableReason::Failed(message) => write!(f, "summary failed: {message}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryOutcome {
    Ready(Summary),
    Unavailable(UnavailableReason),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

enum Backend {
    Model {
        model: Box<dyn LanguageModel>,
        max_excerpt_chars: usize,
    },
    Unavailable(UnavailableReason),
}

pub struct Summarizer {
    backend: Backend,
}

impl Summarizer {
    pub fn with_model(model: Box<dyn LanguageModel>, max_excerpt_chars: usize) -> Self {
        Self {
            backend: Backend::Model {
                model,
                max_excerpt_chars,
            },
        }
    }

    pub fn unavailable(reason: UnavailableReason) -> Self {
        Self {
            backend: Backend::Unavailable(reason),
        }
    }

    /// Gemini when a key is configured and summaries are enabled.
    pub fn from_config(config: &SummaryConfig, enabled: bool) -> Result<Self> {
        if !enabled {
            return Ok(Self::unavailable(UnavailableReason::Disabled));
        }
        let Some(api_key) = config.api_key.clone() else {
            info!("No API key configured, highlights are skipped");
            return Ok(Self::unavailable(UnavailableReason::NotConfigured));
        };
        let client = gemini::GeminiClient::new(
            api_key,
            config.model.clone(),
            Duration::from_secs(config.timeout_secs),
        )?;
        Ok(Self::with_model(Box::new(client), config.max_excerpt_chars))
    }

    pub async fn summarize(&self, document: &str) -> SummaryOutcome {
        let (model, max_excerpt_chars) = match &self.backend {
            Backend::Model {
                model,
                max_excerpt_chars,
            } => (model, *max_excerpt_chars),
            Backend::Unavailable(reason) => return SummaryOutcome::Unavailable(reason.clone()),
        };

        let prompt = build_prompt(char_prefix(document, max_excerpt_chars));
        let answer = match model.generate(&prompt).await {
            Ok(v) => v,
            Err(e) => {
                warn!("Summary failed: {e:#}");
                return SummaryOutcome::Unavailable(UnavailableReason::Failed(format!("{e:#}")));
            }
        };

        let highlights = parse_highlights(&answer);
        if highlights.is_empty() {
            warn!("No highlights could be parsed from the answer");
            return SummaryOutcome::Unavailable(UnavailableReason::Failed(
                "the answer contained no highlights".into(),
            ));
        }
        if highlights.len() < HIGHLIGHT_COUNT {
            warn!(
                "Expected {HIGHLIGHT_COUNT} highlights, got {}",
                highlights.len()
            );
        }
        SummaryOutcome::Ready(Summary::new(highlights))
    }
}

pub fn build_prompt(excerpt: &str) -> String {
    format!(
        "The following is a report of one day of activity. Based on it, summarize the \
{HIGHLIGHT_COUNT} most important activities in the format below.

Requirements:
1. Title: a clear summary of the activity (e.g. \"Implemented the login page UI\").
2. Description: one sentence about the concrete work, outcome or issue.
3. Related links: URLs directly related to the activity, omitted when there are none.
4. Numbering: 1 to {HIGHLIGHT_COUNT}, most important first.
5. Links must use the `[label](URL)` format.

Output format (required):
1. **Title**
   Description
   - 🔗 [label](URL)

2. **Title**
   Description

Report:
{excerpt}

Highlights:"
    )
}

fn entry_regex() -> &'static Regex {
    static ENTRY_RE: OnceLock<Regex> = OnceLock::new();
    ENTRY_RE.get_or_init(|| Regex::new(r"^\s*\d+[.)]\s+(.+)$").expect("entry regex must compile"))
}

fn link_line_regex() -> &'static Regex {
    static LINK_LINE_RE: OnceLock<Regex> = OnceLock::new();
    LINK_LINE_RE
        .get_or_init(|| Regex::new(r"^\s*[-*•]?\s*🔗\s*(.+)$").expect("link line regex must compile"))
}

fn markdown_link_regex() -> &'static Regex {
    static MARKDOWN_LINK_RE: OnceLock<Regex> = OnceLock::new();
    MARKDOWN_LINK_RE.get_or_init(|| {
        Regex::new(r"\[([^\]]+)\]\s*\(([^)\s]+)\)").expect("markdown link regex must compile")
    })
}

fn plain_link_regex() -> &'static Regex {
    static PLAIN_LINK_RE: OnceLock<Regex> = OnceLock::new();
    PLAIN_LINK_RE.get_or_init(|| {
        Regex::new(r"^(.*?)\s*\(?(https?://[^\s)]+)\)?$").expect("plain link regex must compile")
    })
}

fn parse_link(text: &str) -> Option<Link> {
    if let Some(captures) = markdown_link_regex().captures(text) {
        return Some(Link {
            label: captures[1].trim().to_string(),
            url: captures[2].to_string(),
        });
    }
    let captures = plain_link_regex().captures(text.trim())?;
    let url = captures[2].to_string();
    let label = captures[1].trim();
    Some(Link {
        label: if label.is_empty() { url.clone() } else { label.to_string() },
        url,
    })
}

fn clean_title(title: &str) -> String {
    title
        .replace("**", "")
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .trim()
        .to_string()
}

/// Parses the numbered format requested by [build_prompt]. Text before the first entry is
/// ignored and description lines are joined with spaces.
pub fn parse_highlights(answer: &str) -> Vec<Highlight> {
    let mut highlights: Vec<Highlight> = vec![];
    for line in answer.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if let Some(captures) = entry_regex().captures(line) {
            highlights.push(Highlight {
                title: clean_title(&captures[1]),
                description: String::new(),
                links: vec![],
            });
            continue;
        }
        let Some(current) = highlights.last_mut() else {
            continue;
        };
        if let Some(captures) = link_line_regex().captures(line) {
            if let Some(link) = parse_link(&captures[1]) {
                current.links.push(link);
            }
            continue;
        }
        let text = line.trim().trim_start_matches("- ").trim();
        if !current.description.is_empty() {
            current.description.push(' ');
        }
        current.description.push_str(text);
    }
    highlights.retain(|v| !v.title.is_empty());
    highlights
}
