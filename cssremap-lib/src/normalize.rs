//! Canonical comparison keys for CSS values.
//!
//! Two declarations match a mapping when `normalize` returns the same string for
//! both. The steps run strictly in order; each one sees the previous one's output.

use color::Srgb;

/// Shorthand properties whose tokens are compared order-insensitively.
const SHORTHAND_PROPERTIES: &[&str] = &[
    "animation",
    "background",
    "border",
    "border-block",
    "border-block-end",
    "border-block-start",
    "border-bottom",
    "border-color",
    "border-image",
    "border-inline",
    "border-inline-end",
    "border-inline-start",
    "border-left",
    "border-radius",
    "border-right",
    "border-style",
    "border-top",
    "border-width",
    "column-rule",
    "columns",
    "flex",
    "flex-flow",
    "font",
    "gap",
    "grid",
    "grid-area",
    "grid-column",
    "grid-row",
    "grid-template",
    "inset",
    "list-style",
    "margin",
    "mask",
    "offset",
    "outline",
    "overflow",
    "padding",
    "place-content",
    "place-items",
    "place-self",
    "scroll-margin",
    "scroll-padding",
    "text-decoration",
    "text-emphasis",
    "transition",
];

/// Keywords the color parser accepts that are not entries of the named-color table.
const NON_TABLE_COLORS: &[&str] = &["transparent", "currentcolor"];

pub fn is_shorthand(property: &str) -> bool {
    SHORTHAND_PROPERTIES.contains(&property)
}

/// Map a raw value of `property` to its canonical comparison key.
pub fn normalize(value: &str, property: &str) -> String {
    let value = strip_important(value);
    let value = strip_leading_zeros(value);
    let value = collapse_function_commas(&value);
    let value = named_color_hex(&value).unwrap_or(value);
    let value = if is_hex_color(&value) {
        expand_hex_color(&value)
    } else {
        value
    };

    // content strings and urls are case sensitive
    let value = if property != "content" {
        lowercase_outside_urls(&value)
    } else {
        value
    };

    if is_shorthand(property) {
        let mut tokens: Vec<&str> = value.split(' ').collect();
        tokens.sort_unstable();
        tokens.join(" ")
    } else {
        value
    }
}

/// Remove a trailing `!important` marker and surrounding whitespace.
pub fn strip_important(value: &str) -> &str {
    let trimmed = value.trim();
    match split_important(trimmed) {
        Some(rest) => rest,
        None => trimmed,
    }
}

/// Returns the value before a trailing `!important`, if there is one.
pub fn split_important(value: &str) -> Option<&str> {
    const MARKER: &str = "!important";
    let trimmed = value.trim_end();
    let split = trimmed.len().checked_sub(MARKER.len())?;
    if !trimmed.is_char_boundary(split) || !trimmed[split..].eq_ignore_ascii_case(MARKER) {
        return None;
    }
    Some(trimmed[..split].trim())
}

/// `0.5` becomes `.5`; `10.5` is left alone.
fn strip_leading_zeros(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    let mut out = String::with_capacity(value.len());
    for (i, &ch) in chars.iter().enumerate() {
        if ch == '0' {
            let prev_is_digit = i > 0 && (chars[i - 1].is_ascii_digit() || chars[i - 1] == '.');
            let next_is_point = chars.get(i + 1) == Some(&'.');
            let then_digit = chars.get(i + 2).is_some_and(|c| c.is_ascii_digit());
            if !prev_is_digit && next_is_point && then_digit {
                continue;
            }
        }
        out.push(ch);
    }
    out
}

/// Drop whitespace after commas inside `ident(...)` calls.
fn collapse_function_commas(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    // one entry per open paren: was it a function call?
    let mut parens: Vec<bool> = Vec::new();
    let mut skip_space = false;

    for ch in value.chars() {
        if skip_space && ch.is_whitespace() {
            continue;
        }
        skip_space = false;
        match ch {
            '(' => {
                let is_call = out
                    .chars()
                    .last()
                    .is_some_and(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
                parens.push(is_call);
            }
            ')' => {
                parens.pop();
            }
            ',' if parens.iter().any(|&call| call) => skip_space = true,
            _ => {}
        }
        out.push(ch);
    }
    out
}

/// Lower-case everything except the arguments of `url(...)`.
///
/// Shorthand sorting can move a url away from the front of the value, so the
/// url is protected wherever it appears.
fn lowercase_outside_urls(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = find_ascii_ci(rest, "url(") {
        out.push_str(&rest[..start].to_lowercase());
        let tail = &rest[start..];
        let end = tail.find(')').map_or(tail.len(), |i| i + 1);
        out.push_str("url(");
        out.push_str(&tail[4..end]);
        rest = &tail[end..];
    }
    out.push_str(&rest.to_lowercase());
    out
}

fn find_ascii_ci(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .char_indices()
        .map(|(i, _)| i)
        .find(|&i| {
            haystack
                .get(i..i + needle.len())
                .is_some_and(|window| window.eq_ignore_ascii_case(needle))
        })
}

/// Hex form of a named color such as `red` or `RebeccaPurple`.
fn named_color_hex(value: &str) -> Option<String> {
    if value.is_empty() || !value.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let name = value.to_ascii_lowercase();
    if NON_TABLE_COLORS.contains(&name.as_str()) {
        return None;
    }
    let parsed = color::parse_color(&name).ok()?;
    let rgba = parsed.to_alpha_color::<Srgb>().to_rgba8();
    Some(format!("#{:02x}{:02x}{:02x}", rgba.r, rgba.g, rgba.b))
}

fn is_hex_color(value: &str) -> bool {
    match value.strip_prefix('#') {
        Some(digits) => !digits.is_empty() && digits.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

/// Expand 3, 4 and 6 digit hex colors to `#rrggbbaa`.
fn expand_hex_color(value: &str) -> String {
    let digits = &value[1..];
    match digits.len() {
        3 | 4 => {
            let mut out = String::from("#");
            for ch in digits.chars() {
                out.push(ch);
                out.push(ch);
            }
            if digits.len() == 3 {
                out.push_str("ff");
            }
            out
        }
        6 => format!("{}ff", value),
        _ => value.to_string(),
    }
}
