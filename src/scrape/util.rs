use std::fmt::Display;

pub fn notify_parse_fail<T: Display>(msg: &str, item: T) {
    tracing::error!("Unexpected value while parsing HTML: {} at {}", msg, item);
}

/// Text following `label` and the first of `separators` after it, trimmed.
/// Without a separator the whole remainder is taken.
pub fn look_after(text: &str, label: &str, separators: &[char]) -> Option<String> {
    let (_, rest) = text.split_once(label)?;
    let rest = match rest.find(separators) {
        Some(i) if rest[..i].trim().is_empty() => rest[i..].trim_start_matches(separators),
        _ => rest,
    };
    let rest = rest.trim();

    match rest.is_empty() {
        true => None,
        false => Some(rest.to_string()),
    }
}
