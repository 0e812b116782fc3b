//! Daily activity reports. Reads what happened on one day from a local activity tracker,
//! assistant logs, Git repositories and the calendar, writes it down as Markdown, and posts
//! model-picked highlights to a chat webhook.
//!

pub mod cli;
pub mod config;
pub mod format;
pub mod notify;
pub mod persist;
pub mod pipeline;
pub mod report;
pub mod sources;
pub mod summary;
pub mod utils;
