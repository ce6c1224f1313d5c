//! Turning merged match buckets into a tree of output rules.

use crate::mapping::{CompiledMappings, Declaration, MappingEntry};
use crate::matcher::{BucketKey, MatchAssociation};
use crate::options::{Order, RemapOptions};
use crate::output::format;
use crate::selector::{vendor_of, Vendor};
use std::collections::{BTreeMap, BTreeSet};

/// One output rule. `origins` names the mappings it came from and is only
/// filled when provenance comments are enabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedRule {
    pub origins: Vec<String>,
    pub selectors: Vec<String>,
    pub declarations: Vec<Declaration>,
}

/// Build, clean up and print the override stylesheet.
pub fn render(
    association: &MatchAssociation,
    mappings: &CompiledMappings,
    opts: &RemapOptions,
) -> String {
    let rules = post_process(build_rules(association, mappings, opts));
    log::info!("rendering {} rules", rules.len());
    format::print(&rules, opts)
}

pub fn build_rules(
    association: &MatchAssociation,
    mappings: &CompiledMappings,
    opts: &RemapOptions,
) -> Vec<RenderedRule> {
    let entries: Vec<&MappingEntry> = match opts.order {
        Order::Mappings => mappings.entries().iter().collect(),
        Order::Source => association
            .first_seen_froms()
            .into_iter()
            .filter_map(|from| mappings.by_from(from))
            .collect(),
    };

    let mut rules = Vec::new();
    for entry in entries {
        for important in [false, true] {
            let key = BucketKey::new(entry.display_from.as_str(), important);
            let Some(selectors) = association.get(&key) else {
                continue;
            };
            if selectors.is_empty() {
                continue;
            }
            let declarations = replacement(entry, important);
            let origin = key.to_string();

            if opts.combine {
                push_group(&mut rules, selectors, &declarations, &origin, opts.comments);
            } else {
                for selector in selectors {
                    rules.push(RenderedRule {
                        origins: provenance(&origin, opts.comments),
                        selectors: vec![selector.clone()],
                        declarations: declarations.clone(),
                    });
                }
            }
        }
    }
    rules
}

/// The entry's replacement declarations, marked `!important` for important buckets.
fn replacement(entry: &MappingEntry, important: bool) -> Vec<Declaration> {
    if important {
        entry.to.iter().map(Declaration::with_important).collect()
    } else {
        entry.to.clone()
    }
}

fn provenance(origin: &str, comments: bool) -> Vec<String> {
    if comments {
        vec![origin.to_string()]
    } else {
        Vec::new()
    }
}

/// One shared rule plus one rule per vendor whose prefixed selectors would
/// otherwise invalidate the shared rule.
fn push_group(
    rules: &mut Vec<RenderedRule>,
    selectors: &BTreeSet<String>,
    declarations: &[Declaration],
    origin: &str,
    comments: bool,
) {
    let mut shared = Vec::new();
    let mut by_vendor: BTreeMap<Vendor, Vec<String>> = BTreeMap::new();
    for selector in selectors {
        match vendor_of(selector) {
            Some(vendor) => by_vendor.entry(vendor).or_default().push(selector.clone()),
            None => shared.push(selector.clone()),
        }
    }

    let mut group: Vec<Vec<String>> = Vec::new();
    if !shared.is_empty() {
        group.push(shared);
    }
    group.extend(by_vendor.into_values());

    for (i, selectors) in group.into_iter().enumerate() {
        rules.push(RenderedRule {
            // the comment heads the whole group
            origins: if i == 0 {
                provenance(origin, comments)
            } else {
                Vec::new()
            },
            selectors,
            declarations: declarations.to_vec(),
        });
    }
}

/// Drop empty rules and collapse identical neighbours, merging their provenance.
pub fn post_process(rules: Vec<RenderedRule>) -> Vec<RenderedRule> {
    let mut out: Vec<RenderedRule> = Vec::with_capacity(rules.len());
    for rule in rules {
        if rule.selectors.is_empty() {
            continue;
        }
        if let Some(last) = out.last_mut() {
            if last.selectors == rule.selectors && last.declarations == rule.declarations {
                for origin in rule.origins {
                    if !last.origins.contains(&origin) {
                        last.origins.push(origin);
                    }
                }
                continue;
            }
        }
        out.push(rule);
    }
    out
}
