pub mod clock;
pub mod dir;
pub mod holidays;
pub mod logging;
pub mod percentage;
pub mod runtime;
pub mod text;
pub mod time;
