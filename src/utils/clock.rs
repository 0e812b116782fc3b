use chrono::{DateTime, Local};

/// Represents an entity responsible for providing dates across application. This allows the
/// "yesterday" and "today" defaults to be tested.
pub trait Clock: Sync + Send + 'static {
    fn time(&self) -> DateTime<Local>;
}

pub struct DefaultClock;

impl Clock for DefaultClock {
    fn time(&self) -> DateTime<Local> {
        Local::now()
    }
}
