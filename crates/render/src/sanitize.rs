//! Text and attribute clean-up applied before display.

use std::collections::BTreeMap;

/// Class added to every rendered element.
pub const LINE_CLASS: &str = "cow-line";

const ZERO_WIDTH_SPACE: char = '\u{200B}';

/// Insert a zero-width space after every `...` that runs straight into the
/// next word, so browsers may wrap the line there.
pub fn sanitize_text(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());

    for (i, &c) in chars.iter().enumerate() {
        out.push(c);
        let closes_ellipsis = c == '.' && i >= 2 && chars[i - 1] == '.' && chars[i - 2] == '.';
        if !closes_ellipsis {
            continue;
        }
        // Only the dot that completes a non-overlapping run of three counts.
        let run_start = chars[..=i].iter().rev().take_while(|&&ch| ch == '.').count();
        if run_start % 3 != 0 {
            continue;
        }
        if chars.get(i + 1).is_some_and(|next| !next.is_whitespace()) {
            out.push(ZERO_WIDTH_SPACE);
        }
    }

    out
}

/// Copy of `attributes` with the line class appended to any existing class.
pub fn sanitize_attributes(attributes: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    let mut sanitized = attributes.clone();
    let class = match sanitized.get("class") {
        Some(existing) => format!("{} {}", existing, LINE_CLASS).trim().to_string(),
        None => LINE_CLASS.to_string(),
    };
    sanitized.insert("class".to_string(), class);
    sanitized
}
