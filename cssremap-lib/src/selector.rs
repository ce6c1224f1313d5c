use regex::Regex;

/// Result of rewriting one selector for output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rewritten {
    Selector(String),
    /// Dropped by an ignore pattern.
    Excluded,
}

/// Per-source selector configuration.
#[derive(Debug, Clone, Copy)]
pub struct SelectorRules<'a> {
    pub prefix: Option<&'a str>,
    pub exemptions: &'a [String],
    pub ignore: &'a [Regex],
    pub stylistic: bool,
}

impl SelectorRules<'_> {
    /// Apply ignore patterns, then stylistic canonicalization, then the prefix.
    pub fn rewrite(&self, selector: &str) -> Rewritten {
        if self.ignore.iter().any(|re| re.is_match(selector)) {
            return Rewritten::Excluded;
        }
        let selector = if self.stylistic {
            stylize(selector)
        } else {
            selector.to_string()
        };
        match self.prefix {
            Some(prefix) if !prefix.is_empty() => {
                Rewritten::Selector(apply_prefix(&selector, prefix, self.exemptions))
            }
            _ => Rewritten::Selector(selector),
        }
    }
}

/// Vendors whose prefixed pseudo-classes get a rule of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Vendor {
    Moz,
    Webkit,
    Ms,
}

/// The vendor of the first prefixed pseudo-class or pseudo-element, if any.
pub fn vendor_of(selector: &str) -> Option<Vendor> {
    if selector.contains(":-moz-") {
        Some(Vendor::Moz)
    } else if selector.contains(":-webkit-") {
        Some(Vendor::Webkit)
    } else if selector.contains(":-ms-") {
        Some(Vendor::Ms)
    } else {
        None
    }
}

/// True when the selector's first compound is covered by an exemption.
///
/// An exact match always counts; a class or id exemption also covers compounds
/// that start with it (".widget" covers ".widget.active").
pub fn is_exempt(selector: &str, exemptions: &[String]) -> bool {
    let Some(first) = selector.split_whitespace().next() else {
        return false;
    };
    exemptions.iter().any(|exemption| {
        first == exemption
            || (exemption.starts_with(['.', '#']) && first.starts_with(exemption.as_str()))
    })
}

pub fn apply_prefix(selector: &str, prefix: &str, exemptions: &[String]) -> String {
    if is_exempt(selector, exemptions) {
        return selector.to_string();
    }
    // "html.dark :root a" would never match; splice the prefix in place of :root
    if let Some(rest) = selector.strip_prefix(":root ") {
        if prefix.starts_with("html") {
            return format!("{} {}", prefix, rest);
        }
    }
    format!("{} {}", prefix, selector)
}

/// Cosmetic canonicalization of a selector.
///
/// Spaces around `+`, `>` and `~` combinators, single spaces elsewhere, double
/// quotes, and `::before` / `::after` for the legacy single-colon forms.
/// Attribute selectors and strings are copied without touching their operators.
pub fn stylize(selector: &str) -> String {
    let chars: Vec<char> = selector.chars().collect();
    let mut out = String::with_capacity(selector.len() + 8);
    let mut brackets = 0usize;
    let mut parens = 0usize;
    let mut i = 0;

    let push_space = |out: &mut String| {
        if !out.is_empty() && !out.ends_with(' ') {
            out.push(' ');
        }
    };

    while i < chars.len() {
        let ch = chars[i];
        match ch {
            '\\' => {
                out.push(ch);
                if let Some(&escaped) = chars.get(i + 1) {
                    out.push(escaped);
                    i += 1;
                }
            }
            '"' | '\'' => {
                out.push('"');
                i += 1;
                while i < chars.len() && chars[i] != ch {
                    match chars[i] {
                        '\\' => {
                            out.push('\\');
                            if let Some(&escaped) = chars.get(i + 1) {
                                out.push(escaped);
                                i += 1;
                            }
                        }
                        '"' => out.push_str("\\\""),
                        c => out.push(c),
                    }
                    i += 1;
                }
                out.push('"');
            }
            '[' => {
                brackets += 1;
                out.push(ch);
            }
            ']' => {
                brackets = brackets.saturating_sub(1);
                out.push(ch);
            }
            '(' => {
                parens += 1;
                out.push(ch);
            }
            ')' => {
                parens = parens.saturating_sub(1);
                out.push(ch);
            }
            '+' | '>' | '~' if brackets == 0 && parens == 0 && chars.get(i + 1) != Some(&'=') => {
                push_space(&mut out);
                out.push(ch);
                out.push(' ');
            }
            ':' if brackets == 0 && !out.ends_with(':') && is_legacy_pseudo_element(&chars[i + 1..]) => {
                out.push_str("::");
            }
            c if c.is_whitespace() => push_space(&mut out),
            c => out.push(c),
        }
        i += 1;
    }
    out.trim().to_string()
}

fn is_legacy_pseudo_element(rest: &[char]) -> bool {
    ["before", "after"].iter().any(|name| {
        let len = name.len();
        rest.len() >= len
            && rest[..len].iter().copied().eq(name.chars())
            && !rest
                .get(len)
                .is_some_and(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
    })
}
