use crate::error::RemapError;
use crate::style::media::own_media_list;
use crate::style::owned_css::{OwnedDeclaration, OwnedItem, OwnedMedia, OwnedRule, OwnedStylesheet};
use lightningcss::printer::PrinterOptions;
use lightningcss::properties::Property;
use lightningcss::rules::{style::StyleRule, CssRule};
use lightningcss::stylesheet::{ParserOptions, StyleSheet as LightningStyleSheet};
use lightningcss::traits::ToCss;
use lightningcss::vendor_prefix::VendorPrefix;

/// Parse a raw CSS string (LightningCSS) and convert it to a fully-owned stylesheet.
pub fn parse_and_own_css(css_text: &str) -> Result<OwnedStylesheet, RemapError> {
    // Recover from single bad rules; only a sheet LightningCSS cannot read at all fails.
    let parser_opts = ParserOptions {
        error_recovery: true,
        ..ParserOptions::default()
    };

    let sheet = LightningStyleSheet::parse(css_text, parser_opts).map_err(|e| RemapError::Parse {
        message: e.to_string(),
    })?;

    let mut items = Vec::new();
    convert_rules(&sheet.rules.0, &mut items);
    Ok(OwnedStylesheet { items })
}

/// Serialize `value` the way LightningCSS serializes `property: value` inside a rule.
///
/// Mapping keys go through this so they compare against source declarations that
/// were serialized by the same printer. Returns `None` when LightningCSS rejects
/// the declaration.
pub fn canonical_source_value(property: &str, value: &str) -> Option<String> {
    let snippet = format!("a{{{}: {}}}", property, value);
    let sheet = parse_and_own_css(&snippet).ok()?;
    sheet.items.into_iter().find_map(|item| match item {
        OwnedItem::Rule(rule) => rule
            .declarations
            .into_iter()
            .find(|decl| decl.property == property)
            .map(|decl| decl.value),
        OwnedItem::Media(_) => None,
    })
}

fn convert_rules(rules: &[CssRule<'_>], out: &mut Vec<OwnedItem>) {
    for rule in rules {
        match rule {
            CssRule::Style(style_rule) => {
                out.push(OwnedItem::Rule(convert_style_rule(style_rule)));
            }
            CssRule::Media(media_rule) => {
                let query = match media_rule.query.to_css_string(PrinterOptions::default()) {
                    Ok(query) => query,
                    Err(e) => {
                        log::warn!("could not serialize media query, keeping block: {}", e);
                        String::new()
                    }
                };
                let mut items = Vec::new();
                convert_rules(&media_rule.rules.0, &mut items);
                out.push(OwnedItem::Media(OwnedMedia {
                    query,
                    queries: own_media_list(&media_rule.query),
                    items,
                }));
            }
            // @font-face, @keyframes, @supports, ... never hold remappable rules
            _ => {}
        }
    }
}

/// Helper to copy a single StyleRule's selectors + declarations into OwnedRule.
fn convert_style_rule(style_rule: &StyleRule<'_>) -> OwnedRule {
    let mut selectors_vec = Vec::new();
    for selector in &style_rule.selectors.0 {
        match selector.to_css_string(PrinterOptions::default()) {
            Ok(sel_str) if !sel_str.trim().is_empty() => selectors_vec.push(sel_str),
            Ok(_) => {}
            Err(e) => log::debug!("skipping unprintable selector: {}", e),
        }
    }

    let block = &style_rule.declarations;

    // Normal declarations first so a later `!important` duplicate wins the dedupe.
    let mut decls_vec = Vec::new();
    for property in &block.declarations {
        if let Some(decl) = convert_declaration(property, false) {
            decls_vec.push(decl);
        }
    }
    for property in &block.important_declarations {
        if let Some(decl) = convert_declaration(property, true) {
            decls_vec.push(decl);
        }
    }

    let mut rule = OwnedRule {
        selectors: selectors_vec,
        declarations: decls_vec,
    };
    rule.dedupe_declarations();
    rule
}

fn convert_declaration(property: &Property<'_>, important: bool) -> Option<OwnedDeclaration> {
    let value = match property.value_to_css_string(PrinterOptions::default()) {
        Ok(value) => value,
        Err(e) => {
            log::debug!("skipping unprintable declaration: {}", e);
            return None;
        }
    };
    Some(OwnedDeclaration {
        property: property_name(property),
        value,
        important,
    })
}

/// Property name including its vendor prefix, e.g. "-webkit-transition".
fn property_name(property: &Property<'_>) -> String {
    let id = property.property_id();
    let prefix = id.prefix();
    let vendor = if prefix.contains(VendorPrefix::WebKit) {
        "-webkit-"
    } else if prefix.contains(VendorPrefix::Moz) {
        "-moz-"
    } else if prefix.contains(VendorPrefix::Ms) {
        "-ms-"
    } else if prefix.contains(VendorPrefix::O) {
        "-o-"
    } else {
        ""
    };
    format!("{}{}", vendor, id.name())
}
