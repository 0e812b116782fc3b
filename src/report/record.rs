use std::fmt::Display;

use chrono::{DateTime, Duration, Local};

/// Every data source the report knows about, in the order their groups appear in a
/// [DailyReport](super::DailyReport).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Source {
    TrackerWindows,
    TrackerWeb,
    Calendar,
    AssistantCowork,
    AssistantSessions,
    AssistantCli,
    IdePlugin,
    AgentBrain,
    Git,
}

impl Source {
    pub const ALL: [Source; 9] = [
        Source::TrackerWindows,
        Source::TrackerWeb,
        Source::Calendar,
        Source::AssistantCowork,
        Source::AssistantSessions,
        Source::AssistantCli,
        Source::IdePlugin,
        Source::AgentBrain,
        Source::Git,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Source::TrackerWindows => "tracker-windows",
            Source::TrackerWeb => "tracker-web",
            Source::Calendar => "calendar",
            Source::AssistantCowork => "assistant-cowork",
            Source::AssistantSessions => "assistant-sessions",
            Source::AssistantCli => "assistant-cli",
            Source::IdePlugin => "ide-plugin",
            Source::AgentBrain => "agent-brain",
            Source::Git => "git",
        }
    }
}

impl Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activity {
    /// Foreground application. `title` is the window title.
    AppUsage { app: String, title: String },
    WebVisit {
        url: String,
        domain: String,
        title: String,
    },
    /// A desktop assistant agent session.
    CodeSession {
        title: String,
        goal: String,
        interactions: usize,
        duration: Duration,
        files_created: Vec<String>,
        files_modified: Vec<String>,
        messages: Vec<String>,
    },
    FileEdit { repository: String, path: String },
    Commit { repository: String, subject: String },
    PluginQuery { project: String, query: String },
    /// A prompt typed into an assistant. `session` identifies the conversation if known.
    Prompt {
        text: String,
        session: Option<String>,
    },
    /// One request in a cowork transcript together with what came back.
    AssistantTask {
        intent: String,
        result: String,
        urls: Vec<String>,
    },
    Meeting { title: String, calendar: String },
}

/// A single observation made by one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityRecord {
    pub start: DateTime<Local>,
    pub end: Option<DateTime<Local>>,
    pub activity: Activity,
}

impl ActivityRecord {
    pub fn at(start: DateTime<Local>, activity: Activity) -> Self {
        Self {
            start,
            end: None,
            activity,
        }
    }

    pub fn between(start: DateTime<Local>, end: DateTime<Local>, activity: Activity) -> Self {
        Self {
            start,
            end: Some(end),
            activity,
        }
    }

    pub fn duration(&self) -> Duration {
        self.end
            .map(|end| end - self.start)
            .unwrap_or_else(Duration::zero)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceGroup {
    pub source: Source,
    pub records: Vec<ActivityRecord>,
}

impl SourceGroup {
    pub fn new(source: Source, records: Vec<ActivityRecord>) -> Self {
        Self { source, records }
    }

    pub fn empty(source: Source) -> Self {
        Self::new(source, vec![])
    }
}
