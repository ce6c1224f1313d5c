// src/style/owned_css.rs (the parsed tree, detached from LightningCSS lifetimes)
use crate::style::media::OwnedMediaQuery;

/// A fully-owned stylesheet: style rules plus the media blocks that contain them.
#[derive(Debug, Default)]
pub struct OwnedStylesheet {
    pub items: Vec<OwnedItem>,
}

#[derive(Debug, Clone)]
pub enum OwnedItem {
    Rule(OwnedRule),
    Media(OwnedMedia),
}

/// An `@media` block. `query` is the serialized prelude, e.g. "screen and (width >= 600px)".
#[derive(Debug, Clone)]
pub struct OwnedMedia {
    pub query: String,
    pub queries: Vec<OwnedMediaQuery>,
    pub items: Vec<OwnedItem>,
}

#[derive(Debug, Clone, Default)]
pub struct OwnedRule {
    /// e.g. "div", ".red", "#header"
    pub selectors: Vec<String>,
    pub declarations: Vec<OwnedDeclaration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedDeclaration {
    pub property: String,
    pub value: String,
    pub important: bool,
}

impl OwnedRule {
    /// Keep only the last declaration of each property.
    ///
    /// Important declarations are pushed after normal ones, so they win.
    pub fn dedupe_declarations(&mut self) {
        let mut seen = Vec::new();
        let mut kept = Vec::with_capacity(self.declarations.len());
        for decl in self.declarations.drain(..).rev() {
            if !seen.contains(&decl.property) {
                seen.push(decl.property.clone());
                kept.push(decl);
            }
        }
        kept.reverse();
        self.declarations = kept;
    }
}
