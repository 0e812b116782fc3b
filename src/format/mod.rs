//! Rendering of a [DailyReport](crate::report::DailyReport). [markdown] builds the document,
//! [chat] adapts Markdown to the chat service's markup.

pub mod chat;
pub mod markdown;

pub use markdown::{render, FormatOptions};
