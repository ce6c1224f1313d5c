//! Compilation of the user mapping table into a flat lookup table.
//!
//! Macro keys (`$border: <v>`, `$background: <v>`) are expanded from the
//! template tables below. Every other key becomes exactly one entry.

use crate::error::RemapError;
use crate::normalize::{normalize, split_important};
use crate::style::parse_css::canonical_source_value;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Raw mapping table in document order: "from" declaration text to "to" text.
pub type MappingTable = Vec<(String, String)>;

/// One declaration, as written on the "to" side of a mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub property: String,
    pub value: String,
    pub important: bool,
}

impl Declaration {
    /// Parse a single `property: value[ !important]` declaration.
    pub fn parse(text: &str) -> Option<Declaration> {
        let (property, value) = text.split_once(':')?;
        let property = property.trim();
        if property.is_empty() {
            return None;
        }
        let (value, important) = match split_important(value) {
            Some(rest) => (rest, true),
            None => (value.trim(), false),
        };
        Some(Declaration {
            property: property.to_string(),
            value: value.to_string(),
            important,
        })
    }

    /// Parse a `;`-separated declaration list, skipping malformed parts.
    ///
    /// Semicolons inside parentheses or strings, as in `url(data:...;base64,...)`,
    /// do not separate declarations.
    pub fn parse_list(text: &str) -> Vec<Declaration> {
        let text = text.trim().trim_end_matches(';');
        split_top_level(text)
            .into_iter()
            .filter(|part| !part.trim().is_empty())
            .filter_map(|part| {
                let decl = Declaration::parse(part);
                if decl.is_none() {
                    log::warn!("ignoring malformed replacement declaration '{}'", part.trim());
                }
                decl
            })
            .collect()
    }

    pub fn with_important(&self) -> Declaration {
        Declaration {
            important: true,
            ..self.clone()
        }
    }
}

/// Split on `;` outside parentheses and quoted strings.
fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;

    for (i, ch) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '"' | '\'' => match quote {
                Some(open) if open == ch => quote = None,
                None => quote = Some(ch),
                _ => {}
            },
            _ if quote.is_some() => {}
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ';' if depth == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.property, self.value)?;
        if self.important {
            write!(f, " !important")?;
        }
        Ok(())
    }
}

/// The canonical "from" side of a mapping.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeclarationKey {
    pub property: String,
    pub value: String,
    /// The key itself was written with `!important`: only important declarations match.
    pub important: bool,
}

#[derive(Debug, Clone)]
pub struct MappingEntry {
    pub from: DeclarationKey,
    /// The "from" text as the user (or the macro expansion) wrote it, e.g. "border: 1px solid #000".
    pub display_from: String,
    pub to: Vec<Declaration>,
}

/// A declaration template inside a macro family.
///
/// `{v}` is replaced by the macro value and `{n}` by a pixel width.
#[derive(Debug, Clone, Copy)]
pub struct Template {
    pub from: &'static str,
    pub to_property: &'static str,
    pub per_pixel: bool,
}

const fn fixed(from: &'static str, to_property: &'static str) -> Template {
    Template {
        from,
        to_property,
        per_pixel: false,
    }
}

const fn per_pixel(from: &'static str, to_property: &'static str) -> Template {
    Template {
        from,
        to_property,
        per_pixel: true,
    }
}

/// A shorthand macro such as `$border:`.
#[derive(Debug)]
pub struct MacroFamily {
    pub marker: &'static str,
    pub templates: &'static [Template],
}

const BORDER_TEMPLATES: &[Template] = &[
    fixed("border-color: {v}", "border-color"),
    fixed("border: solid {v}", "border-color"),
    fixed("border: dashed {v}", "border-color"),
    fixed("border-top-color: {v}", "border-top-color"),
    fixed("border-bottom-color: {v}", "border-bottom-color"),
    fixed("border-left-color: {v}", "border-left-color"),
    fixed("border-right-color: {v}", "border-right-color"),
    per_pixel("border: {n}px solid {v}", "border-color"),
    per_pixel("border: {n}px dashed {v}", "border-color"),
    per_pixel("border-top: {n}px solid {v}", "border-top-color"),
    per_pixel("border-top: {n}px dashed {v}", "border-top-color"),
    per_pixel("border-bottom: {n}px solid {v}", "border-bottom-color"),
    per_pixel("border-bottom: {n}px dashed {v}", "border-bottom-color"),
    per_pixel("border-left: {n}px solid {v}", "border-left-color"),
    per_pixel("border-left: {n}px dashed {v}", "border-left-color"),
    per_pixel("border-right: {n}px solid {v}", "border-right-color"),
    per_pixel("border-right: {n}px dashed {v}", "border-right-color"),
];

const BACKGROUND_TEMPLATES: &[Template] = &[
    fixed("background: {v}", "background"),
    fixed("background: {v} none", "background"),
    fixed("background: none {v}", "background"),
    fixed("background-color: {v}", "background-color"),
    fixed("background-image: {v}", "background-image"),
    fixed("background-image: {v} none", "background-image"),
    fixed("background-image: none {v}", "background-image"),
];

pub const MACRO_FAMILIES: &[MacroFamily] = &[
    MacroFamily {
        marker: "$border:",
        templates: BORDER_TEMPLATES,
    },
    MacroFamily {
        marker: "$background:",
        templates: BACKGROUND_TEMPLATES,
    },
];

impl MacroFamily {
    /// Expand into `(from text, to text)` pairs: fixed templates first, then
    /// every per-pixel template for each width in `1..=limit_special`.
    pub fn expand(&self, value: &str, replacement: &str, limit_special: u32) -> MappingTable {
        let mut out = Vec::new();
        let render = |template: &Template, width: Option<u32>| {
            let mut from = template.from.replace("{v}", value);
            if let Some(width) = width {
                from = from.replace("{n}", &width.to_string());
            }
            (from, format!("{}: {}", template.to_property, replacement))
        };

        for template in self.templates.iter().filter(|t| !t.per_pixel) {
            out.push(render(template, None));
        }
        for width in 1..=limit_special {
            for template in self.templates.iter().filter(|t| t.per_pixel) {
                out.push(render(template, Some(width)));
            }
        }
        out
    }
}

/// The compiled, immutable lookup table.
#[derive(Debug, Default)]
pub struct CompiledMappings {
    entries: Vec<MappingEntry>,
    // property -> canonical value -> entry index
    plain: HashMap<String, HashMap<String, usize>>,
    important_only: HashMap<String, HashMap<String, usize>>,
    by_from: HashMap<String, usize>,
}

impl CompiledMappings {
    pub fn compile(raw_mappings: &[(String, String)], limit_special: u32) -> CompiledMappings {
        let mut compiled = CompiledMappings::default();

        for (key, to_text) in raw_mappings {
            let key = key.trim();
            match MACRO_FAMILIES.iter().find(|family| key.starts_with(family.marker)) {
                Some(family) => {
                    let value = key[family.marker.len()..].trim();
                    let replacement = to_text.trim();
                    if value.is_empty() || replacement.is_empty() {
                        log::warn!("ignoring macro mapping '{}' with an empty value", key);
                        continue;
                    }
                    for (from, to) in family.expand(value, replacement, limit_special) {
                        compiled.push(&from, &to);
                    }
                }
                None if key.starts_with('$') => {
                    log::warn!("ignoring unknown macro mapping '{}'", key);
                }
                None => compiled.push(key, to_text),
            }
        }

        compiled.drop_displaced();
        log::debug!(
            "compiled {} mapping entries from {} mappings",
            compiled.entries.len(),
            raw_mappings.len()
        );
        compiled
    }

    fn push(&mut self, from_text: &str, to_text: &str) {
        let Some(from) = Declaration::parse(from_text) else {
            log::warn!("ignoring mapping key '{}': not a 'property: value' declaration", from_text);
            return;
        };
        if from.value.is_empty() {
            log::warn!("ignoring mapping key '{}' with an empty value", from_text);
            return;
        }
        let to = Declaration::parse_list(to_text);
        if to.is_empty() {
            log::warn!("ignoring mapping '{}' with an empty replacement", from_text);
            return;
        }

        let property = from.property.to_ascii_lowercase();
        let printed = canonical_source_value(&property, &from.value).unwrap_or_else(|| from.value.clone());
        let key = DeclarationKey {
            value: normalize(&printed, &property),
            property,
            important: from.important,
        };

        let entry = MappingEntry {
            from: key,
            display_from: from_text.trim().to_string(),
            to,
        };
        if let Some(earlier) = self.index(entry) {
            log::debug!(
                "mapping '{}' overrides the equivalent key '{}'",
                from_text.trim(),
                self.entries[earlier].display_from
            );
        }
    }

    /// Append `entry` and point its lookup slot at it. Returns the index of the
    /// equivalent entry it displaced, if any.
    fn index(&mut self, entry: MappingEntry) -> Option<usize> {
        let slot = self.entries.len();
        let index = if entry.from.important {
            &mut self.important_only
        } else {
            &mut self.plain
        };
        let displaced = index
            .entry(entry.from.property.clone())
            .or_default()
            .insert(entry.from.value.clone(), slot);
        self.by_from.insert(entry.display_from.clone(), slot);
        self.entries.push(entry);
        displaced
    }

    /// Rebuild the table without entries displaced by a later equivalent key.
    fn drop_displaced(&mut self) {
        let live: HashSet<usize> = self
            .plain
            .values()
            .chain(self.important_only.values())
            .flat_map(|by_value| by_value.values().copied())
            .collect();
        if live.len() == self.entries.len() {
            return;
        }

        let entries = std::mem::take(&mut self.entries);
        self.plain.clear();
        self.important_only.clear();
        self.by_from.clear();
        for (i, entry) in entries.into_iter().enumerate() {
            if live.contains(&i) {
                self.index(entry);
            }
        }
    }

    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when any entry maps this property.
    pub fn has_property(&self, property: &str) -> bool {
        self.plain.contains_key(property) || self.important_only.contains_key(property)
    }

    /// Entry matching a declaration whose value is already canonical.
    pub fn lookup(&self, property: &str, canonical: &str, important: bool) -> Option<&MappingEntry> {
        if important {
            if let Some(entry) = self.find(true, property, canonical) {
                return Some(entry);
            }
        }
        self.find(false, property, canonical)
    }

    fn find(&self, important_only: bool, property: &str, canonical: &str) -> Option<&MappingEntry> {
        let index = if important_only {
            &self.important_only
        } else {
            &self.plain
        };
        index
            .get(property)?
            .get(canonical)
            .map(|&i| &self.entries[i])
    }

    pub fn by_from(&self, display_from: &str) -> Option<&MappingEntry> {
        self.by_from.get(display_from).map(|&i| &self.entries[i])
    }
}

/// Read a JSON object of `"from": "to"` strings, keeping document order.
pub fn load_mappings(json_text: &str) -> Result<MappingTable, RemapError> {
    let document: serde_json::Value = serde_json::from_str(json_text)?;
    let serde_json::Value::Object(object) = document else {
        return Err(RemapError::MappingShape);
    };
    object
        .into_iter()
        .map(|(key, value)| match value {
            serde_json::Value::String(to) => Ok((key, to)),
            _ => Err(RemapError::MappingValue { key }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn table(pairs: &[(&str, &str)]) -> MappingTable {
        pairs
            .iter()
            .map(|(from, to)| (from.to_string(), to.to_string()))
            .collect()
    }

    #[test]
    fn test_border_macro_expansion() {
        let compiled = CompiledMappings::compile(&table(&[("$border: #000", "#fff")]), 3);
        // 7 fixed entries, then 5 properties x 2 styles for each width
        assert_eq!(compiled.len(), 7 + 3 * 5 * 2);

        let pixel_entries = compiled
            .entries()
            .iter()
            .filter(|e| e.display_from.contains("px "))
            .count();
        assert_eq!(pixel_entries, 3 * 5 * 2);

        for entry in compiled.entries() {
            assert_eq!(entry.to.len(), 1);
            assert_eq!(entry.to[0].value, "#fff");
            assert!(entry.to[0].property.ends_with("color"));
        }

        let top = compiled.by_from("border-top: 2px dashed #000").unwrap();
        assert_eq!(top.to[0].to_string(), "border-top-color: #fff");
    }

    #[test]
    fn test_border_macro_expansion_order() {
        let pairs = CompiledMappings::compile(&table(&[("$border: red", "blue")]), 1);
        let froms: Vec<&str> = pairs.entries().iter().map(|e| e.display_from.as_str()).collect();
        assert_eq!(
            froms,
            vec![
                "border-color: red",
                "border: solid red",
                "border: dashed red",
                "border-top-color: red",
                "border-bottom-color: red",
                "border-left-color: red",
                "border-right-color: red",
                "border: 1px solid red",
                "border: 1px dashed red",
                "border-top: 1px solid red",
                "border-top: 1px dashed red",
                "border-bottom: 1px solid red",
                "border-bottom: 1px dashed red",
                "border-left: 1px solid red",
                "border-left: 1px dashed red",
                "border-right: 1px solid red",
                "border-right: 1px dashed red",
            ]
        );
    }

    #[test]
    fn test_background_macro_expansion() {
        let family = &MACRO_FAMILIES[1];
        let expanded = family.expand("#eee", "#111", 25);
        assert_eq!(
            expanded,
            table(&[
                ("background: #eee", "background: #111"),
                ("background: #eee none", "background: #111"),
                ("background: none #eee", "background: #111"),
                ("background-color: #eee", "background-color: #111"),
                ("background-image: #eee", "background-image: #111"),
                ("background-image: #eee none", "background-image: #111"),
                ("background-image: none #eee", "background-image: #111"),
            ])
        );
    }

    #[test]
    fn test_plain_mapping_matches_both_importances() {
        let compiled = CompiledMappings::compile(&table(&[("color: red", "color: blue")]), 25);
        assert_eq!(compiled.len(), 1);
        let canonical = normalize(&canonical_source_value("color", "#f00").unwrap(), "color");
        assert!(compiled.lookup("color", &canonical, false).is_some());
        assert!(compiled.lookup("color", &canonical, true).is_some());
        assert!(compiled.has_property("color"));
        assert!(!compiled.has_property("background"));
    }

    #[test]
    fn test_important_key_matches_only_important() {
        let compiled =
            CompiledMappings::compile(&table(&[("color: red !important", "color: blue")]), 25);
        let canonical = normalize(&canonical_source_value("color", "red").unwrap(), "color");
        assert!(compiled.lookup("color", &canonical, false).is_none());
        assert!(compiled.lookup("color", &canonical, true).is_some());
    }

    #[test]
    fn test_empty_values_are_skipped() {
        let compiled = CompiledMappings::compile(
            &table(&[
                ("color: red", ""),
                ("$border: ", "#fff"),
                ("$background: #000", "  "),
                ("not a declaration", "color: blue"),
                ("$outline: red", "blue"),
            ]),
            25,
        );
        assert!(compiled.is_empty());
    }

    #[test]
    fn test_last_equivalent_key_wins() {
        let compiled = CompiledMappings::compile(
            &table(&[("color: #f00", "color: blue"), ("color: red", "color: green")]),
            25,
        );
        assert_eq!(compiled.len(), 1);
        assert_eq!(compiled.entries()[0].display_from, "color: red");
        assert!(compiled.by_from("color: #f00").is_none());

        let canonical = normalize(&canonical_source_value("color", "red").unwrap(), "color");
        let entry = compiled.lookup("color", &canonical, false).unwrap();
        assert_eq!(entry.to[0].to_string(), "color: green");
    }

    #[test]
    fn test_explicit_key_overrides_macro_entry() {
        let compiled = CompiledMappings::compile(
            &table(&[
                ("$border: #000", "#fff"),
                ("border-color: black", "border-color: red"),
            ]),
            1,
        );
        assert_eq!(compiled.len(), 7 + 5 * 2);
        assert_eq!(
            compiled.entries().last().unwrap().display_from,
            "border-color: black"
        );

        let canonical = normalize(
            &canonical_source_value("border-color", "#000").unwrap(),
            "border-color",
        );
        let entry = compiled.lookup("border-color", &canonical, false).unwrap();
        assert_eq!(entry.to[0].to_string(), "border-color: red");
        // lookup slots point at the rebuilt positions
        let top = compiled.by_from("border-top-color: #000").unwrap();
        assert_eq!(top.to[0].to_string(), "border-top-color: #fff");
    }

    #[test]
    fn test_replacement_lists() {
        let to = Declaration::parse_list(" color: blue; background: none !important; ");
        assert_eq!(
            to,
            vec![
                Declaration {
                    property: "color".to_string(),
                    value: "blue".to_string(),
                    important: false,
                },
                Declaration {
                    property: "background".to_string(),
                    value: "none".to_string(),
                    important: true,
                },
            ]
        );
        assert_eq!(to[0].with_important().to_string(), "color: blue !important");
    }

    #[test]
    fn test_replacement_semicolons_inside_urls_and_strings() {
        let to = Declaration::parse_list(
            "background: url(data:image/png;base64,BBB); content: \"a;b\"; color: red;",
        );
        let printed: Vec<String> = to.iter().map(|d| d.to_string()).collect();
        assert_eq!(
            printed,
            vec![
                "background: url(data:image/png;base64,BBB)",
                "content: \"a;b\"",
                "color: red",
            ]
        );
    }

    #[test]
    fn test_load_mappings_keeps_document_order() {
        let json = r#"{"z-index: 1": "z-index: 2", "color: red": "color: blue"}"#;
        let mappings = load_mappings(json).unwrap();
        assert_eq!(
            mappings,
            table(&[("z-index: 1", "z-index: 2"), ("color: red", "color: blue")])
        );
        assert!(matches!(load_mappings("[]"), Err(RemapError::MappingShape)));
        assert!(matches!(
            load_mappings(r#"{"color: red": 1}"#),
            Err(RemapError::MappingValue { .. })
        ));
    }
}
