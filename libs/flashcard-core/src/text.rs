//! Full-width/half-width numeral normalization.

/// Convert full-width digits (`０`-`９`) to ASCII digits, leaving every other
/// character unchanged.
pub fn to_half_width_digits(s: &str) -> String {
    s.chars().map(half_width_digit).collect()
}

/// Map one full-width digit to ASCII.
pub fn half_width_digit(c: char) -> char {
    match c {
        '０'..='９' => char::from_u32(c as u32 - '０' as u32 + '0' as u32).unwrap_or(c),
        _ => c,
    }
}

/// Whether the character is an ASCII or full-width decimal digit.
pub fn is_any_digit(c: char) -> bool {
    c.is_ascii_digit() || ('０'..='９').contains(&c)
}

/// Parse a number written in ASCII and/or full-width digits.
pub fn parse_number(s: &str) -> Option<usize> {
    let normalized = to_half_width_digits(s.trim());
    if normalized.is_empty() || !normalized.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    normalized.parse().ok()
}

/// Every number found in the text, in order of appearance.
pub fn extract_numbers(s: &str) -> Vec<usize> {
    let mut numbers = Vec::new();
    let mut current = String::new();
    for c in s.chars() {
        if is_any_digit(c) {
            current.push(half_width_digit(c));
        } else if !current.is_empty() {
            if let Ok(n) = current.parse() {
                numbers.push(n);
            }
            current.clear();
        }
    }
    if let Ok(n) = current.parse() {
        numbers.push(n);
    }
    numbers
}
