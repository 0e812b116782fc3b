//! One run: read every source, render and write the document, then summarize and notify.
//! The document is written before the summary is attempted, so the two outputs fail
//! independently.

use std::path::PathBuf;

use anyhow::Result;
use tracing::{info, instrument};

use crate::{
    config::Config,
    format::{render, FormatOptions},
    notify::{Notifier, NotifyStatus},
    persist::ReportStore,
    report::{aggregate, window::DayWindow},
    sources::{collect, default_readers, SourceReader},
    summary::{Summarizer, SummaryOutcome},
};

/// Steps that can be turned off from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSwitches {
    pub summary: bool,
    pub notify: bool,
}

#[derive(Debug)]
pub struct RunOutcome {
    pub path: PathBuf,
    pub document: String,
    pub summary: SummaryOutcome,
    pub notify: NotifyStatus,
}

pub struct Pipeline {
    readers: Vec<Box<dyn SourceReader>>,
    options: FormatOptions,
    store: ReportStore,
    summarizer: Summarizer,
    notifier: Notifier,
}

impl Pipeline {
    pub fn new(
        readers: Vec<Box<dyn SourceReader>>,
        options: FormatOptions,
        store: ReportStore,
        summarizer: Summarizer,
        notifier: Notifier,
    ) -> Self {
        Self {
            readers,
            options,
            store,
            summarizer,
            notifier,
        }
    }

    pub fn from_config(config: &Config, switches: RunSwitches) -> Result<Self> {
        Ok(Self::new(
            default_readers(config)?,
            FormatOptions::from(&config.report),
            ReportStore::new(config.report.output_dir.clone()),
            Summarizer::from_config(&config.summary, switches.summary)?,
            Notifier::from_config(&config.notify, switches.notify)?,
        ))
    }

    /// Fails only when the document cannot be written.
    #[instrument(skip_all, fields(date = %window.date()))]
    pub async fn run(&self, window: DayWindow) -> Result<RunOutcome> {
        let mut groups = Vec::with_capacity(self.readers.len());
        for reader in &self.readers {
            groups.push(collect(reader.as_ref(), &window).await);
        }
        let report = aggregate(window, groups);
        info!("Collected {} records", report.record_count());

        let document = render(&report, &self.options);
        let path = self.store.write(&window, &document).await?;

        let summary = self.summarizer.summarize(&document).await;
        let notify = self.notifier.notify(window.date(), &summary, &path).await;

        Ok(RunOutcome {
            path,
            document,
            summary,
            notify,
        })
    }
}
