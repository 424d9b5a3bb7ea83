use chrono::{DateTime, Datelike, TimeZone};

const SI_PREFIXES: [&str; 5] = ["", "k", "M", "G", "T"];

/// Two significant digits with an SI suffix, e.g. `1234 -> "1.2k"`, `7 -> "7.0"`.
pub fn format_si(value: f64) -> String {
    if !value.is_finite() || value == 0.0 {
        return "0".to_owned();
    }

    let exponent = value.abs().log10().floor() as i32;
    let shift = 1 - exponent;
    let rounded = if shift >= 0 {
        let factor = 10_f64.powi(shift);
        (value * factor).round() / factor
    } else {
        let factor = 10_f64.powi(-shift);
        (value / factor).round() * factor
    };

    // Rounding can carry into the next power of ten, e.g. 999.6 -> 1000.
    let exponent = rounded.abs().log10().floor() as i32;
    let prefix = exponent.div_euclid(3).clamp(0, SI_PREFIXES.len() as i32 - 1);
    let scaled = rounded / 1000_f64.powi(prefix);
    let decimals = (1 - (exponent - 3 * prefix)).max(0) as usize;
    format!("{scaled:.decimals$}{}", SI_PREFIXES[prefix as usize])
}

pub fn format_month_year<Tz: TimeZone>(time: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    time.format("%b %Y").to_string()
}

pub fn same_month<Tz: TimeZone>(a: &DateTime<Tz>, b: &DateTime<Tz>) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

/// Splits `owner/name` at the first slash. No slash means no owner.
pub fn split_repo_name(full_name: &str) -> (&str, &str) {
    full_name.split_once('/').unwrap_or(("", full_name))
}

/// Greedy word wrap on character count. A two-line result is rebalanced at
/// the space closest to the middle of the text.
pub fn wrap_label(text: &str, max_chars: usize) -> Vec<String> {
    let mut words = text.split_whitespace();
    let Some(first) = words.next() else {
        return Vec::new();
    };

    let mut lines = Vec::new();
    let mut current = first.to_owned();
    for word in words {
        if current.chars().count() + 1 + word.chars().count() <= max_chars {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::replace(&mut current, word.to_owned()));
        }
    }
    lines.push(current);

    if lines.len() == 2 {
        return balanced_split(text);
    }
    lines
}

fn balanced_split(text: &str) -> Vec<String> {
    let text = text.trim();
    let middle = text.len() as f32 / 2.0;
    let split_at = text
        .char_indices()
        .filter(|(_, character)| *character == ' ')
        .map(|(index, _)| index)
        .min_by(|a, b| {
            (middle - *a as f32)
                .abs()
                .total_cmp(&(middle - *b as f32).abs())
        });

    match split_at {
        Some(index) => vec![
            text[..index].trim().to_owned(),
            text[index..].trim().to_owned(),
        ],
        None => vec![text.to_owned()],
    }
}
