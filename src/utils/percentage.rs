use std::{fmt::Display, ops::Deref};

use chrono::Duration;

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Percentage(f64);

impl Display for Percentage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.0}%", self.0)
    }
}

impl Percentage {
    pub fn new_opt(value: f64) -> Option<Percentage> {
        if value < 0. || value.is_nan() {
            None
        } else {
            Some(Percentage(value))
        }
    }
}

impl Deref for Percentage {
    type Target = f64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Share of `whole` taken by `value`. An empty whole yields 0%.
pub fn duration_percentage(value: Duration, whole: Duration) -> Percentage {
    if whole.num_seconds() <= 0 {
        return Percentage(0.);
    }
    Percentage::new_opt(value.num_seconds() as f64 / whole.num_seconds() as f64 * 100.)
        .unwrap_or(Percentage(0.))
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::{duration_percentage, Percentage};

    #[test]
    fn test_percentage_rejects_negative() {
        assert!(Percentage::new_opt(-1.).is_none());
        assert!(Percentage::new_opt(f64::NAN).is_none());
    }

    #[test]
    fn test_duration_percentage() {
        let value = duration_percentage(Duration::minutes(15), Duration::hours(1));
        assert_eq!(*value, 25.);
        assert_eq!(value.to_string(), "25%");
        assert_eq!(*duration_percentage(Duration::minutes(1), Duration::zero()), 0.);
    }
}
