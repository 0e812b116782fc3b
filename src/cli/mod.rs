use std::path::PathBuf;

use anyhow::Result;
use chrono::{Days, NaiveDate};
use clap::{CommandFactory, Parser};
use tracing::{debug, info, level_filters::LevelFilter};

use crate::{
    config::Config,
    notify::NotifyStatus,
    pipeline::{Pipeline, RunSwitches},
    report::window::DayWindow,
    summary::SummaryOutcome,
    utils::{
        clock::{Clock, DefaultClock},
        dir::create_application_default_path,
        holidays::is_holiday,
        logging::{enable_logging, enable_stdout_logging, CLI_PREFIX},
    },
};

#[derive(Parser, Debug)]
#[command(name = "dayrecap", version, long_about = None)]
#[command(about = "Writes a Markdown report of one day of activity and posts its highlights")]
pub struct Args {
    #[arg(
        value_name = "YYYYMMDD",
        value_parser = parse_report_date,
        conflicts_with = "today",
        help = "Day to report on. Defaults to yesterday"
    )]
    date: Option<NaiveDate>,
    #[arg(long, help = "Report on today instead of yesterday")]
    today: bool,
    #[arg(
        long,
        help = "Config file. By default $XDG_CONFIG_HOME/dayrecap/config.toml or $HOME/.config/dayrecap/config.toml"
    )]
    config: Option<PathBuf>,
    #[arg(long, help = "Don't ask the language model for highlights")]
    no_summary: bool,
    #[arg(long, help = "Don't post to the webhook")]
    no_notify: bool,
    #[arg(long, help = "Also print the document to stdout")]
    print: bool,
    #[arg(long, help = "Do nothing on weekends and holidays")]
    skip_holidays: bool,
    #[arg(long, help = "Mirror logs to stdout")]
    log: bool,
    #[arg(long, value_name = "LEVEL", help = "Log level, e.g. debug or trace")]
    log_filter: Option<LevelFilter>,
}

/// The only accepted date format is `YYYYMMDD`, e.g. `20260210`.
fn parse_report_date(value: &str) -> Result<NaiveDate, String> {
    if value.len() != 8 || !value.bytes().all(|v| v.is_ascii_digit()) {
        return Err(format!("Expected a date as YYYYMMDD, got {value:?}"));
    }
    NaiveDate::parse_from_str(value, "%Y%m%d").map_err(|e| format!("Invalid date {value}: {e}"))
}

/// Explicit date, otherwise today or yesterday according to `clock`.
fn resolve_date(date: Option<NaiveDate>, today: bool, clock: &dyn Clock) -> NaiveDate {
    if let Some(date) = date {
        return date;
    }
    let now = clock.time().date_naive();
    if today {
        now
    } else {
        now.checked_sub_days(Days::new(1)).unwrap_or(now)
    }
}

pub async fn run_cli() -> Result<()> {
    run(Args::parse(), &DefaultClock).await
}

pub async fn run(args: Args, clock: &dyn Clock) -> Result<()> {
    let date = resolve_date(args.date, args.today, clock);
    let window = match DayWindow::new(date) {
        Ok(v) => v,
        Err(e) => {
            return Err(Args::command()
                .error(
                    clap::error::ErrorKind::ValueValidation,
                    format!("Can't report on {date}: {e:#}"),
                )
                .into());
        }
    };

    let dotenv = dotenv::dotenv();

    let logging_level = args
        .log_filter
        .or(args.log.then_some(LevelFilter::TRACE));
    let logging = create_application_default_path()
        .and_then(|path| enable_logging(CLI_PREFIX, &path, logging_level, args.log));
    if let Err(e) = logging {
        eprintln!("Logging to files is unavailable: {e:#}");
        if let Err(e) = enable_stdout_logging(logging_level, args.log) {
            eprintln!("{e:#}");
        }
    }
    match dotenv {
        Ok(path) => debug!("Loaded environment from {path:?}"),
        Err(e) => debug!("No .env loaded: {e}"),
    }

    let config = Config::load(args.config.as_deref())?;
    if args.skip_holidays && is_holiday(date, &config.holidays) {
        info!("{date} is a day off, skipping");
        println!("{date} is a day off, nothing to do");
        return Ok(());
    }

    let pipeline = Pipeline::from_config(
        &config,
        RunSwitches {
            summary: !args.no_summary,
            notify: !args.no_notify,
        },
    )?;
    let outcome = pipeline.run(window).await?;

    if args.print {
        print!("{}", outcome.document);
    }
    println!("Report written to {}", outcome.path.display());
    match &outcome.summary {
        SummaryOutcome::Ready(summary) => {
            println!("Highlights: {}", summary.highlights().len())
        }
        SummaryOutcome::Unavailable(reason) => println!("Highlights unavailable: {reason}"),
    }
    match outcome.notify {
        NotifyStatus::Sent => println!("Notification sent"),
        NotifyStatus::Skipped(reason) => println!("Notification skipped: {reason}"),
        NotifyStatus::Failed => println!("Notification failed, see the logs"),
    }
    Ok(())
}
