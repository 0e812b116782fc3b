/// Cuts `value` to at most `max` characters, appending `...` when something was dropped.
pub fn truncate_chars(value: &str, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((index, _)) => format!("{}...", &value[..index]),
        None => value.to_string(),
    }
}

/// Longest prefix of `value` holding at most `max` characters.
pub fn char_prefix(value: &str, max: usize) -> &str {
    match value.char_indices().nth(max) {
        Some((index, _)) => &value[..index],
        None => value,
    }
}
