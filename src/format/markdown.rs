use std::{
    collections::BTreeMap,
    fmt::{self, Display, Formatter},
};

use chrono::Duration;

use crate::{
    config::ReportConfig,
    report::{
        analysis::{analyze_apps, analyze_domains, categorize, productive_time, AppUsage},
        record::{Activity, ActivityRecord, Source},
        DailyReport,
    },
    sources::tracker::domain_of,
    utils::{percentage::duration_percentage, text::truncate_chars, time::format_duration},
};

/// Written in place of a section's content when its sources had nothing for the day.
pub const NO_ACTIVITY: &str = "- (no activity)";

const TOP_PAGE_MAX_CHARS: usize = 40;
const COWORK_LIMIT: usize = 7;
const REPOSITORY_LIMIT: usize = 10;
const MESSAGE_MAX_CHARS: usize = 150;
const PAGE_TITLE_MAX_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct FormatOptions {
    pub top_apps: usize,
    pub top_domains: usize,
    pub productive_hours: Vec<(u32, u32)>,
}

impl From<&ReportConfig> for FormatOptions {
    fn from(value: &ReportConfig) -> Self {
        Self {
            top_apps: value.top_apps,
            top_domains: value.top_domains,
            productive_hours: value.productive_hours.clone(),
        }
    }
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self::from(&ReportConfig::default())
    }
}

/// Renders the Markdown document of `report`. The output only depends on the arguments.
pub fn render(report: &DailyReport, options: &FormatOptions) -> String {
    Document { report, options }.to_string()
}

struct Document<'a> {
    report: &'a DailyReport,
    options: &'a FormatOptions,
}

fn heading(f: &mut Formatter<'_>, title: &str, count: usize) -> fmt::Result {
    if count > 0 {
        writeln!(f, "## {title} ({count})")
    } else {
        writeln!(f, "## {title}")
    }
}

fn no_activity(f: &mut Formatter<'_>) -> fmt::Result {
    writeln!(f, "{NO_ACTIVITY}")?;
    writeln!(f)
}

fn single_line(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn more(f: &mut Formatter<'_>, indent: &str, total: usize, shown: usize) -> fmt::Result {
    if total > shown {
        writeln!(f, "{indent}- ...and {} more", total - shown)?;
    }
    Ok(())
}

impl Document<'_> {
    fn records(&self, source: Source) -> &[ActivityRecord] {
        self.report.records(source)
    }

    fn computer_time(
        &self,
        f: &mut Formatter<'_>,
        apps: &[AppUsage],
        total: Duration,
    ) -> fmt::Result {
        writeln!(f, "## 💻 Computer time")?;
        if apps.is_empty() {
            return no_activity(f);
        }

        let top = apps
            .iter()
            .take(self.options.top_apps)
            .map(|v| format!("{} {}", v.app, format_duration(v.duration)))
            .collect::<Vec<_>>()
            .join(", ");
        let productive = productive_time(
            self.records(Source::TrackerWindows),
            self.report.window(),
            &self.options.productive_hours,
        );
        let categories = categorize(apps)
            .into_iter()
            .filter(|(_, duration)| *duration > Duration::zero())
            .map(|(category, duration)| {
                format!(
                    "{category} {} ({})",
                    format_duration(duration),
                    duration_percentage(duration, total)
                )
            })
            .collect::<Vec<_>>()
            .join(", ");

        writeln!(f, "- **Total**: {}", format_duration(total))?;
        writeln!(f, "- **Top apps**: {top}")?;
        writeln!(
            f,
            "- **Productive hours**: {} ({})",
            format_duration(productive),
            duration_percentage(productive, total)
        )?;
        writeln!(f, "- **Categories**: {categories}")?;
        writeln!(f)
    }

    fn top_sites(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "## 🌐 Top sites")?;
        let domains = analyze_domains(self.records(Source::TrackerWeb));
        if domains.is_empty() {
            return no_activity(f);
        }
        for (rank, domain) in domains.iter().take(self.options.top_domains).enumerate() {
            write!(
                f,
                "{}. {} {}",
                rank + 1,
                domain.domain,
                format_duration(domain.duration)
            )?;
            if let Some(page) = &domain.top_page {
                write!(f, " ({})", truncate_chars(page, TOP_PAGE_MAX_CHARS))?;
            }
            writeln!(f)?;
        }
        writeln!(f)
    }

    fn meetings(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let meetings = self.records(Source::Calendar);
        heading(f, "📅 Meetings", meetings.len())?;
        if meetings.is_empty() {
            return no_activity(f);
        }
        for record in meetings {
            let Activity::Meeting { title, .. } = &record.activity else {
                continue;
            };
            writeln!(
                f,
                "- {}~{} {title} ({})",
                record.start.format("%H:%M"),
                record.end.unwrap_or(record.start).format("%H:%M"),
                format_duration(record.duration())
            )?;
        }
        writeln!(f)
    }

    fn cowork(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let tasks = self.records(Source::AssistantCowork);
        heading(f, "🤖 Cowork", tasks.len())?;
        if tasks.is_empty() {
            return no_activity(f);
        }
        for record in tasks.iter().take(COWORK_LIMIT) {
            let Activity::AssistantTask {
                intent,
                result,
                urls,
            } = &record.activity
            else {
                continue;
            };
            write!(f, "- {}", single_line(intent))?;
            if !result.is_empty() {
                write!(f, " → {result}")?;
            }
            writeln!(f)?;
            if !urls.is_empty() {
                let domains = urls
                    .iter()
                    .map(|v| domain_of(v))
                    .collect::<Vec<_>>()
                    .join(", ");
                writeln!(f, "  📎 {domains}")?;
            }
        }
        more(f, "", tasks.len(), COWORK_LIMIT)?;
        writeln!(f)
    }

    fn sessions(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let sessions = self.records(Source::AssistantSessions);
        heading(f, "🤖 Assistant sessions", sessions.len())?;
        if sessions.is_empty() {
            return no_activity(f);
        }
        for record in sessions {
            let Activity::CodeSession {
                title,
                goal,
                interactions,
                duration,
                files_created,
                files_modified,
                ..
            } = &record.activity
            else {
                continue;
            };
            writeln!(f, "### 📂 {title}")?;
            writeln!(
                f,
                "> ⏱️ **{}** with **{interactions}** interactions\n",
                format_duration(*duration)
            )?;
            writeln!(f, "**🎯 Goal**")?;
            writeln!(f, "{}\n", single_line(goal))?;
            if !files_created.is_empty() {
                writeln!(f, "- 🆕 **Created**: {}", files_created.join(", "))?;
            }
            if !files_modified.is_empty() {
                writeln!(f, "- 📝 **Modified**: {}", files_modified.join(", "))?;
            }
            if files_created.is_empty() && files_modified.is_empty() {
                writeln!(f, "- ⚠️ No file changes")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }

    fn cli_prompts(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let prompts = self.records(Source::AssistantCli);
        heading(f, "⌨️ Assistant CLI", prompts.len())?;
        if prompts.is_empty() {
            return no_activity(f);
        }
        for record in prompts {
            let Activity::Prompt { text, .. } = &record.activity else {
                continue;
            };
            writeln!(
                f,
                "- {} {}",
                record.start.format("%H:%M"),
                truncate_chars(&single_line(text), MESSAGE_MAX_CHARS)
            )?;
        }
        writeln!(f)
    }

    fn ide_plugin(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut projects = BTreeMap::<&str, Vec<&str>>::new();
        for record in self.records(Source::IdePlugin) {
            if let Activity::PluginQuery { project, query } = &record.activity {
                projects.entry(project).or_default().push(query);
            }
        }
        let count = projects.values().map(Vec::len).sum();
        heading(f, "🧩 IDE plugin", count)?;
        if projects.is_empty() {
            return no_activity(f);
        }
        for (project, queries) in projects {
            writeln!(f, "### 📂 {project}")?;
            for query in queries {
                writeln!(f, "- {}", single_line(query))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }

    fn repository(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let prompts = self
            .records(Source::AgentBrain)
            .iter()
            .filter_map(|v| match &v.activity {
                Activity::Prompt { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>();
        let mut commits = vec![];
        let mut files = vec![];
        for record in self.records(Source::Git) {
            match &record.activity {
                Activity::Commit {
                    repository,
                    subject,
                } => commits.push((repository.as_str(), subject.as_str())),
                Activity::FileEdit { repository, path } => {
                    files.push((repository.as_str(), path.as_str()))
                }
                _ => {}
            }
        }

        writeln!(f, "## 🛠️ Repository activity")?;
        if prompts.is_empty() && commits.is_empty() && files.is_empty() {
            return no_activity(f);
        }
        if !prompts.is_empty() {
            writeln!(f, "- 💬 **Agent prompts** ({})", prompts.len())?;
            for prompt in &prompts {
                writeln!(f, "  - {}", single_line(prompt))?;
            }
        }
        if !commits.is_empty() {
            writeln!(f, "- 📝 **Commits** ({})", commits.len())?;
            for (repository, subject) in commits.iter().take(REPOSITORY_LIMIT) {
                writeln!(f, "  - {subject} ({repository})")?;
            }
            more(f, "  ", commits.len(), REPOSITORY_LIMIT)?;
        }
        if !files.is_empty() {
            writeln!(f, "- 🛠️ **Changed files** ({})", files.len())?;
            for (repository, path) in files.iter().take(REPOSITORY_LIMIT) {
                writeln!(f, "  - `{path}` ({repository})")?;
            }
            more(f, "  ", files.len(), REPOSITORY_LIMIT)?;
        }
        writeln!(f)
    }

    fn details(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "---\n")?;
        writeln!(f, "## 📋 Detailed lists\n")?;
        let mut written = false;

        for record in self.records(Source::AssistantSessions) {
            let Activity::CodeSession {
                title, messages, ..
            } = &record.activity
            else {
                continue;
            };
            if messages.is_empty() {
                continue;
            }
            writeln!(f, "### 💬 Assistant: {title}")?;
            for (index, message) in messages.iter().enumerate() {
                writeln!(
                    f,
                    "{}. {}",
                    index + 1,
                    truncate_chars(&single_line(message), MESSAGE_MAX_CHARS)
                )?;
            }
            writeln!(f)?;
            written = true;
        }

        // First url seen for every title.
        let mut pages = BTreeMap::<&str, &str>::new();
        for record in self.records(Source::TrackerWeb) {
            if let Activity::WebVisit { url, title, .. } = &record.activity {
                let title = title.trim();
                if !title.is_empty() && !url.is_empty() {
                    pages.entry(title).or_insert(url);
                }
            }
        }
        if !pages.is_empty() {
            writeln!(f, "### 🌐 Visited pages")?;
            for (index, (title, url)) in pages.into_iter().enumerate() {
                writeln!(
                    f,
                    "{}. [{}]({url})",
                    index + 1,
                    truncate_chars(title, PAGE_TITLE_MAX_CHARS)
                )?;
            }
            writeln!(f)?;
            written = true;
        }

        if !written {
            return no_activity(f);
        }
        Ok(())
    }
}

impl Display for Document<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let window = self.report.window();
        writeln!(f, "# {} Daily Summary\n", window.date().format("%m/%d"))?;

        let (apps, total) = analyze_apps(self.records(Source::TrackerWindows));
        self.computer_time(f, &apps, total)?;
        self.top_sites(f)?;
        self.meetings(f)?;
        self.cowork(f)?;
        self.sessions(f)?;
        self.cli_prompts(f)?;
        self.ide_plugin(f)?;
        self.repository(f)?;
        self.details(f)?;
        writeln!(f, "> {}", one_liner(&apps))
    }
}

/// Rule based summary of where the time went, derived from the most used application.
pub fn one_liner(apps: &[AppUsage]) -> String {
    let Some(top) = apps.first() else {
        return "No computer activity was recorded.".into();
    };
    let name = top.app.to_lowercase();
    let duration = format_duration(top.duration);
    let matches = |keywords: &[&str]| keywords.iter().any(|v| name.contains(v));

    if matches(&["chrome", "firefox", "safari"]) {
        format!("Mostly web browsing ({duration} in {}).", top.app)
    } else if matches(&["code", "studio"]) {
        format!("Mostly coding ({duration} in {}).", top.app)
    } else if matches(&["slack", "teams"]) {
        format!("Mostly collaboration tools ({duration} in {}).", top.app)
    } else {
        format!("Most time went to {} ({duration}).", top.app)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate};

    use crate::report::{
        aggregate,
        analysis::AppUsage,
        record::{Activity, ActivityRecord, Source, SourceGroup},
        window::DayWindow,
        DailyReport,
    };

    use super::{one_liner, render, FormatOptions, NO_ACTIVITY};

    fn window() -> DayWindow {
        DayWindow::new(NaiveDate::from_ymd_opt(2026, 2, 10).unwrap()).unwrap()
    }

    fn interval(window: &DayWindow, hour: i64, minutes: i64, activity: Activity) -> ActivityRecord {
        let start = window.start() + Duration::hours(hour);
        ActivityRecord::between(start, start + Duration::minutes(minutes), activity)
    }

    fn app(window: &DayWindow, hour: i64, minutes: i64, name: &str) -> ActivityRecord {
        interval(
            window,
            hour,
            minutes,
            Activity::AppUsage {
                app: name.into(),
                title: "".into(),
            },
        )
    }

    fn populated() -> DailyReport {
        let window = window();
        let tasks = (0..9)
            .map(|i| {
                ActivityRecord::at(
                    window.start() + Duration::hours(8) + Duration::minutes(i),
                    Activity::AssistantTask {
                        intent: format!("Task number {i}"),
                        result: "Done".into(),
                        urls: vec!["https://docs.rs/chrono".into()],
                    },
                )
            })
            .collect();
        let commits = (0..12)
            .map(|i| {
                ActivityRecord::at(
                    window.start() + Duration::hours(15) + Duration::minutes(i),
                    Activity::Commit {
                        repository: "dotfiles".into(),
                        subject: format!("Commit {i}"),
                    },
                )
            })
            .collect();

        aggregate(
            window,
            vec![
                SourceGroup::new(
                    Source::TrackerWindows,
                    vec![
                        app(&window, 9, 60, "Visual Studio Code"),
                        app(&window, 13, 20, "Slack"),
                        app(&window, 14, 10, "Google Chrome"),
                    ],
                ),
                SourceGroup::new(
                    Source::TrackerWeb,
                    vec![interval(
                        &window,
                        14,
                        10,
                        Activity::WebVisit {
                            url: "https://github.com/org/repo/pull/7".into(),
                            domain: "github.com".into(),
                            title: "Fix the window clamp by someone with a long title".into(),
                        },
                    )],
                ),
                SourceGroup::new(
                    Source::Calendar,
                    vec![interval(
                        &window,
                        11,
                        30,
                        Activity::Meeting {
                            title: "Design review".into(),
                            calendar: "Work".into(),
                        },
                    )],
                ),
                SourceGroup::new(Source::AssistantCowork, tasks),
                SourceGroup::new(
                    Source::AssistantSessions,
                    vec![interval(
                        &window,
                        10,
                        90,
                        Activity::CodeSession {
                            title: "Login page".into(),
                            goal: "Add a\nlogin page".into(),
                            interactions: 2,
                            duration: Duration::minutes(90),
                            files_created: vec!["login.rs".into()],
                            files_modified: vec![],
                            messages: vec!["Add a login page".into()],
                        },
                    )],
                ),
                SourceGroup::new(Source::Git, commits),
            ],
        )
    }

    #[test]
    fn test_empty_report_marks_every_section() {
        let report = aggregate(window(), vec![]);
        let document = render(&report, &FormatOptions::default());
        assert!(document.starts_with("# 02/10 Daily Summary\n\n"));
        assert_eq!(document.matches(NO_ACTIVITY).count(), 9);
        for heading in [
            "## 💻 Computer time",
            "## 🌐 Top sites",
            "## 📅 Meetings\n",
            "## 🤖 Cowork\n",
            "## 🤖 Assistant sessions\n",
            "## ⌨️ Assistant CLI\n",
            "## 🧩 IDE plugin\n",
            "## 🛠️ Repository activity",
            "## 📋 Detailed lists",
        ] {
            assert!(document.contains(heading), "missing {heading}");
        }
        assert!(document.ends_with("> No computer activity was recorded.\n"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let report = populated();
        let options = FormatOptions::default();
        assert_eq!(render(&report, &options), render(&report.clone(), &options));
    }

    #[test]
    fn test_render_populated_sections() {
        let document = render(&populated(), &FormatOptions::default());

        assert!(document.contains("- **Total**: 1h 30m\n"));
        assert!(document.contains("- **Top apps**: Visual Studio Code 1h 0m, Slack 20m, Google Chrome 10m\n"));
        // 9-10 and 14:00-14:10.
        assert!(document.contains("- **Productive hours**: 1h 10m (78%)\n"));
        assert!(document.contains("Development 1h 0m (67%)"));
        assert!(document.contains("1. github.com 10m (Fix the window clamp by someone with a l...)\n"));
        assert!(document.contains("## 📅 Meetings (1)\n- 11:00~11:30 Design review (30m)\n"));
        assert!(document.contains("## 🤖 Cowork (9)\n- Task number 0 → Done\n  📎 docs.rs\n"));
        assert!(document.contains("- ...and 2 more\n"));
        assert!(document.contains("**🎯 Goal**\nAdd a login page\n"));
        assert!(document.contains("- 🆕 **Created**: login.rs\n"));
        assert!(document.contains("- 📝 **Commits** (12)\n"));
        assert!(document.contains("  - Commit 9 (dotfiles)\n  - ...and 2 more\n"));
        assert!(document.contains("### 💬 Assistant: Login page\n1. Add a login page\n"));
        assert!(document.contains("1. [Fix the window clamp by someone with a long title](https://github.com/org/repo/pull/7)\n"));
        assert!(document.ends_with("> Mostly coding (1h 0m in Visual Studio Code).\n"));
        assert_eq!(document.matches(NO_ACTIVITY).count(), 2);
    }

    #[test]
    fn test_one_liner_rules() {
        let usage = |app: &str| {
            vec![AppUsage {
                app: app.into(),
                duration: Duration::minutes(125),
            }]
        };
        assert_eq!(one_liner(&usage("Firefox")), "Mostly web browsing (2h 5m in Firefox).");
        assert_eq!(one_liner(&usage("Android Studio")), "Mostly coding (2h 5m in Android Studio).");
        assert_eq!(
            one_liner(&usage("Microsoft Teams")),
            "Mostly collaboration tools (2h 5m in Microsoft Teams)."
        );
        assert_eq!(one_liner(&usage("Figma")), "Most time went to Figma (2h 5m).");
    }
}
