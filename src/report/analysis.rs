use std::{collections::BTreeMap, fmt::Display};

use chrono::Duration;

use super::{
    record::{Activity, ActivityRecord},
    window::DayWindow,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppUsage {
    pub app: String,
    pub duration: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainUsage {
    pub domain: String,
    pub duration: Duration,
    /// Title of the page viewed longest on that domain.
    pub top_page: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Category {
    Development,
    Browser,
    Communication,
    Other,
}

impl Category {
    const KEYWORDS: [(Category, &'static [&'static str]); 3] = [
        (
            Category::Development,
            &[
                "code",
                "visual studio",
                "android studio",
                "terminal",
                "iterm",
                "cmd",
                "powershell",
                "intellij",
                "pycharm",
                "sublime",
            ],
        ),
        (
            Category::Browser,
            &["chrome", "firefox", "safari", "edge", "brave"],
        ),
        (
            Category::Communication,
            &["slack", "teams", "discord", "telegram", "zoom", "mail"],
        ),
    ];

    pub fn of(app: &str) -> Category {
        let app = app.to_lowercase();
        Self::KEYWORDS
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| app.contains(k)))
            .map(|(category, _)| *category)
            .unwrap_or(Category::Other)
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Development => write!(f, "Development"),
            Category::Browser => write!(f, "Browser"),
            Category::Communication => write!(f, "Communication"),
            Category::Other => write!(f, "Other"),
        }
    }
}

/// Orders by duration, longest first. Ties fall back to the name so output is stable.
fn sort_by_duration<T>(values: &mut [T], key: impl Fn(&T) -> (Duration, &str)) {
    values.sort_by(|a, b| {
        let (a_duration, a_name) = key(a);
        let (b_duration, b_name) = key(b);
        b_duration.cmp(&a_duration).then_with(|| a_name.cmp(b_name))
    });
}

/// Returns applications with their total time + total computer usage duration.
pub fn analyze_apps(records: &[ActivityRecord]) -> (Vec<AppUsage>, Duration) {
    let mut map = BTreeMap::<&str, Duration>::new();
    let mut total = Duration::zero();

    for record in records {
        let Activity::AppUsage { app, .. } = &record.activity else {
            continue;
        };
        let duration = record.duration();
        total += duration;
        *map.entry(app.as_str()).or_insert_with(Duration::zero) += duration;
    }

    let mut usages = map
        .into_iter()
        .map(|(app, duration)| AppUsage {
            app: app.to_string(),
            duration,
        })
        .collect::<Vec<_>>();
    sort_by_duration(&mut usages, |v| (v.duration, v.app.as_str()));
    (usages, total)
}

/// Returns domains by total time, each with the page that was viewed longest.
pub fn analyze_domains(records: &[ActivityRecord]) -> Vec<DomainUsage> {
    let mut map = BTreeMap::<&str, (Duration, BTreeMap<&str, Duration>)>::new();

    for record in records {
        let Activity::WebVisit { domain, title, .. } = &record.activity else {
            continue;
        };
        let duration = record.duration();
        let (total, pages) = map
            .entry(domain.as_str())
            .or_insert_with(|| (Duration::zero(), BTreeMap::new()));
        *total += duration;
        let title = title.trim();
        if !title.is_empty() {
            *pages.entry(title).or_insert_with(Duration::zero) += duration;
        }
    }

    let mut usages = map
        .into_iter()
        .map(|(domain, (duration, pages))| {
            let mut pages = pages.into_iter().collect::<Vec<_>>();
            sort_by_duration(&mut pages, |v| (v.1, v.0));
            DomainUsage {
                domain: domain.to_string(),
                duration,
                top_page: pages.first().map(|v| v.0.to_string()),
            }
        })
        .collect::<Vec<_>>();
    sort_by_duration(&mut usages, |v| (v.duration, v.domain.as_str()));
    usages
}

/// Sums application time per [Category]. Every category is present, in declaration order.
pub fn categorize(apps: &[AppUsage]) -> Vec<(Category, Duration)> {
    let mut totals = BTreeMap::from([
        (Category::Development, Duration::zero()),
        (Category::Browser, Duration::zero()),
        (Category::Communication, Duration::zero()),
        (Category::Other, Duration::zero()),
    ]);
    for app in apps {
        *totals.entry(Category::of(&app.app)).or_insert_with(Duration::zero) += app.duration;
    }
    totals.into_iter().collect()
}

/// Application time that overlaps the given hour ranges of the window's day.
pub fn productive_time(
    records: &[ActivityRecord],
    window: &DayWindow,
    hours: &[(u32, u32)],
) -> Duration {
    let ranges = hours
        .iter()
        .filter_map(|(start, end)| Some((window.at_hour(*start)?, window.at_hour(*end)?)))
        .filter(|(start, end)| start < end)
        .collect::<Vec<_>>();

    let mut total = Duration::zero();
    for record in records {
        if !matches!(record.activity, Activity::AppUsage { .. }) {
            continue;
        }
        let Some(end) = record.end else {
            continue;
        };
        for (range_start, range_end) in &ranges {
            let start = record.start.max(*range_start);
            let end = end.min(*range_end);
            if start < end {
                total += end - start;
            }
        }
    }
    total
}
