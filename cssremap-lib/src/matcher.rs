//! Matching source declarations against the compiled mapping table.

use crate::error::RemapError;
use crate::mapping::CompiledMappings;
use crate::normalize::normalize;
use crate::options::{DeviceProfile, RemapOptions, SourceSpec};
use crate::selector::{Rewritten, SelectorRules};
use crate::style::media::media_matches;
use crate::style::owned_css::{OwnedItem, OwnedRule};
use crate::style::parse_css::parse_and_own_css;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Bucket identity: the mapping's "from" text plus the importance of the matched declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BucketKey {
    pub from: String,
    pub important: bool,
}

impl BucketKey {
    pub fn new(from: impl Into<String>, important: bool) -> Self {
        BucketKey {
            from: from.into(),
            important,
        }
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // keys written with `!important` already carry the marker
        if self.important && !self.from.ends_with("!important") {
            write!(f, "{} !important", self.from)
        } else {
            f.write_str(&self.from)
        }
    }
}

/// Selectors collected per bucket, remembering the order buckets were first seen.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MatchAssociation {
    buckets: HashMap<BucketKey, BTreeSet<String>>,
    order: Vec<BucketKey>,
}

impl MatchAssociation {
    pub fn new() -> Self {
        MatchAssociation::default()
    }

    /// Make sure a bucket exists, even if it never receives a selector.
    pub fn touch(&mut self, key: &BucketKey) -> &mut BTreeSet<String> {
        if !self.buckets.contains_key(key) {
            self.order.push(key.clone());
        }
        self.buckets.entry(key.clone()).or_default()
    }

    pub fn insert(&mut self, key: &BucketKey, selector: String) {
        self.touch(key).insert(selector);
    }

    /// Set union with `other`; buckets new to `self` keep `other`'s order.
    pub fn merge(&mut self, other: MatchAssociation) {
        let MatchAssociation { mut buckets, order } = other;
        for key in order {
            let selectors = buckets.remove(&key).unwrap_or_default();
            self.touch(&key).extend(selectors);
        }
    }

    pub fn get(&self, key: &BucketKey) -> Option<&BTreeSet<String>> {
        self.buckets.get(key)
    }

    /// Distinct "from" texts in first-seen order.
    pub fn first_seen_froms(&self) -> Vec<&str> {
        let mut froms: Vec<&str> = Vec::new();
        for key in &self.order {
            if !froms.contains(&key.from.as_str()) {
                froms.push(&key.from);
            }
        }
        froms
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

/// One source's contribution: parse, filter by media, match.
pub fn match_source(
    source: &SourceSpec,
    mappings: &CompiledMappings,
    opts: &RemapOptions,
) -> Result<MatchAssociation, RemapError> {
    let sheet = parse_and_own_css(&source.css)?;
    let device = source.device.as_ref().unwrap_or(&opts.device);
    let rules = SelectorRules {
        prefix: source.prefix.as_deref(),
        exemptions: &source.match_exemptions,
        ignore: &opts.ignore_selectors,
        stylistic: opts.stylistic,
    };

    let mut association = MatchAssociation::new();
    scan_items(&sheet.items, device, mappings, &rules, &mut association);
    log::debug!("source matched {} mapping buckets", association.len());
    Ok(association)
}

fn scan_items(
    items: &[OwnedItem],
    device: &DeviceProfile,
    mappings: &CompiledMappings,
    rules: &SelectorRules<'_>,
    association: &mut MatchAssociation,
) {
    for item in items {
        match item {
            OwnedItem::Rule(rule) => scan_rule(rule, mappings, rules, association),
            OwnedItem::Media(media) => {
                if media_matches(media, device) {
                    scan_items(&media.items, device, mappings, rules, association);
                } else {
                    log::debug!("skipping @media {}", media.query);
                }
            }
        }
    }
}

pub fn scan_rule(
    rule: &OwnedRule,
    mappings: &CompiledMappings,
    rules: &SelectorRules<'_>,
    association: &mut MatchAssociation,
) {
    for decl in &rule.declarations {
        if decl.value.is_empty() || !mappings.has_property(&decl.property) {
            continue;
        }
        let canonical = normalize(&decl.value, &decl.property);
        let Some(entry) = mappings.lookup(&decl.property, &canonical, decl.important) else {
            continue;
        };

        let key = BucketKey::new(entry.display_from.as_str(), decl.important);
        let bucket = association.touch(&key);
        for selector in &rule.selectors {
            if let Rewritten::Selector(selector) = rules.rewrite(selector) {
                bucket.insert(selector);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::owned_css::OwnedDeclaration;
    use pretty_assertions::assert_eq;

    fn compile(pairs: &[(&str, &str)]) -> CompiledMappings {
        let table: Vec<(String, String)> = pairs
            .iter()
            .map(|(from, to)| (from.to_string(), to.to_string()))
            .collect();
        CompiledMappings::compile(&table, 25)
    }

    fn selectors(association: &MatchAssociation, from: &str, important: bool) -> Vec<String> {
        association
            .get(&BucketKey::new(from, important))
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_match_normal_and_important() {
        let mappings = compile(&[("color: red", "color: blue")]);
        let source = SourceSpec::new("a { color: red } b { color: #f00 !important } c { color: green }");
        let association = match_source(&source, &mappings, &RemapOptions::default()).unwrap();

        assert_eq!(selectors(&association, "color: red", false), vec!["a"]);
        assert_eq!(selectors(&association, "color: red", true), vec!["b"]);
        assert_eq!(association.len(), 2);
    }

    #[test]
    fn test_media_filtering() {
        let mappings = compile(&[("color: red", "color: blue")]);
        let css = "@media (min-width: 2000px) { .wide { color: red } }";

        let narrow = match_source(&SourceSpec::new(css), &mappings, &RemapOptions::default()).unwrap();
        assert!(selectors(&narrow, "color: red", false).is_empty());

        let wide_device = DeviceProfile {
            media_type: "screen".to_string(),
            width: "2000px".to_string(),
        };
        let source = SourceSpec::new(css).with_device(wide_device);
        let wide = match_source(&source, &mappings, &RemapOptions::default()).unwrap();
        assert_eq!(selectors(&wide, "color: red", false), vec![".wide"]);
    }

    #[test]
    fn test_print_media_is_skipped() {
        let mappings = compile(&[("color: red", "color: blue")]);
        let source = SourceSpec::new("@media print { a { color: red } }");
        let association = match_source(&source, &mappings, &RemapOptions::default()).unwrap();
        assert!(association.is_empty());
    }

    #[test]
    fn test_prefix_and_ignore_applied() {
        let mappings = compile(&[("color: red", "color: blue")]);
        let opts = RemapOptions::default()
            .with_ignore_selectors([r"\.skip"])
            .unwrap();
        let source = SourceSpec::new(".a, .skip, .widget b { color: red }")
            .with_prefix("html.dark")
            .with_exemptions([".widget"]);
        let association = match_source(&source, &mappings, &opts).unwrap();
        assert_eq!(
            selectors(&association, "color: red", false),
            vec![".widget b", "html.dark .a"]
        );
    }

    #[test]
    fn test_rule_without_selectors_creates_empty_bucket() {
        let mappings = compile(&[("color: red", "color: blue")]);
        let rule = OwnedRule {
            selectors: Vec::new(),
            declarations: vec![OwnedDeclaration {
                property: "color".to_string(),
                value: "red".to_string(),
                important: false,
            }],
        };
        let selector_rules = SelectorRules {
            prefix: None,
            exemptions: &[],
            ignore: &[],
            stylistic: false,
        };
        let mut association = MatchAssociation::new();
        scan_rule(&rule, &mappings, &selector_rules, &mut association);
        assert_eq!(association.first_seen_froms(), vec!["color: red"]);
        assert!(selectors(&association, "color: red", false).is_empty());
    }

    #[test]
    fn test_merge_is_union_in_first_seen_order() {
        let mut left = MatchAssociation::new();
        left.insert(&BucketKey::new("color: red", false), "a".to_string());
        let mut right = MatchAssociation::new();
        right.insert(&BucketKey::new("z-index: 1", false), "c".to_string());
        right.insert(&BucketKey::new("color: red", false), "b".to_string());

        left.merge(right.clone());
        assert_eq!(left.first_seen_froms(), vec!["color: red", "z-index: 1"]);
        assert_eq!(selectors(&left, "color: red", false), vec!["a", "b"]);

        // the selector sets do not depend on merge order
        let mut other = right;
        let mut first = MatchAssociation::new();
        first.insert(&BucketKey::new("color: red", false), "a".to_string());
        other.merge(first);
        assert_eq!(selectors(&other, "color: red", false), vec!["a", "b"]);
    }

    #[test]
    fn test_bucket_key_display() {
        assert_eq!(BucketKey::new("color: red", true).to_string(), "color: red !important");
        assert_eq!(BucketKey::new("color: red", false).to_string(), "color: red");
        assert_eq!(
            BucketKey::new("color: red !important", true).to_string(),
            "color: red !important"
        );
    }

    #[test]
    fn test_nested_media_blocks() {
        let mappings = compile(&[("color: red", "color: blue")]);
        let css = r#"
            @media screen {
                .outer { color: red }
                @media (min-width: 2000px) { .inner { color: red } }
            }
            @media print { @media (min-width: 1px) { .paper { color: red } } }
        "#;

        let narrow = match_source(&SourceSpec::new(css), &mappings, &RemapOptions::default()).unwrap();
        assert_eq!(selectors(&narrow, "color: red", false), vec![".outer"]);

        let wide_device = DeviceProfile {
            media_type: "screen".to_string(),
            width: "2000px".to_string(),
        };
        let source = SourceSpec::new(css).with_device(wide_device);
        let wide = match_source(&source, &mappings, &RemapOptions::default()).unwrap();
        assert_eq!(selectors(&wide, "color: red", false), vec![".inner", ".outer"]);
    }

    #[test]
    fn test_color_scheme_blocks_are_skipped() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mappings = compile(&[("color: red", "color: blue")]);
        let css = r#"
            @media (prefers-color-scheme: dark) { .d { color: red } }
            @media (prefers-color-scheme: light) { .l { color: red } }
            @media (orientation: portrait) { .p { color: red } }
            @media (min-width: 10vw) { .v { color: red } }
        "#;
        let association = match_source(&SourceSpec::new(css), &mappings, &RemapOptions::default()).unwrap();
        // only the unresolvable width falls back to matching
        assert_eq!(selectors(&association, "color: red", false), vec![".v"]);
    }
}
