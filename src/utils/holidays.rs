use chrono::{Datelike, NaiveDate, Weekday};

/// Korean public holidays including substitute days, as (month, day).
const KR_HOLIDAYS: &[(i32, &[(u32, u32)])] = &[
    (
        2025,
        &[
            (1, 1),
            (1, 28),
            (1, 29),
            (1, 30),
            (3, 1),
            (5, 5),
            (5, 6),
            (6, 6),
            (8, 15),
            (10, 3),
            (10, 5),
            (10, 6),
            (10, 7),
            (10, 8),
            (10, 9),
            (12, 25),
        ],
    ),
    (
        2026,
        &[
            (1, 1),
            (2, 17),
            (2, 18),
            (2, 19),
            (3, 1),
            (3, 2),
            (5, 5),
            (5, 25),
            (6, 6),
            (8, 15),
            (8, 17),
            (9, 24),
            (9, 25),
            (9, 26),
            (10, 3),
            (10, 9),
            (12, 25),
        ],
    ),
];

/// Weekends, built-in public holidays and any `extra` dates count as days off. Years missing
/// from the table only check weekends.
pub fn is_holiday(date: NaiveDate, extra: &[NaiveDate]) -> bool {
    if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
        return true;
    }
    if extra.contains(&date) {
        return true;
    }
    KR_HOLIDAYS
        .iter()
        .find(|(year, _)| *year == date.year())
        .is_some_and(|(_, days)| days.contains(&(date.month(), date.day())))
}
