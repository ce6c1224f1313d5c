use crate::error::RemapError;
use regex::Regex;

/// Order in which mapping keys are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    /// Mapping table order, independent of the sources.
    #[default]
    Mappings,
    /// Order in which the sources first matched each mapping.
    Source,
}

/// The device media queries are evaluated against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceProfile {
    /// e.g. "screen", "print"
    pub media_type: String,
    /// e.g. "1024px"
    pub width: String,
}

impl Default for DeviceProfile {
    fn default() -> Self {
        DeviceProfile {
            media_type: "screen".to_string(),
            width: "1024px".to_string(),
        }
    }
}

/// One source stylesheet and its per-source selector configuration.
#[derive(Debug, Clone, Default)]
pub struct SourceSpec {
    pub css: String,
    /// Prepended to every emitted selector, e.g. "html.dark".
    pub prefix: Option<String>,
    /// Selectors whose first compound starts with one of these are left unprefixed.
    pub match_exemptions: Vec<String>,
    /// Overrides `RemapOptions::device` for this source.
    pub device: Option<DeviceProfile>,
}

impl SourceSpec {
    pub fn new(css: impl Into<String>) -> Self {
        SourceSpec {
            css: css.into(),
            ..SourceSpec::default()
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_exemptions<I, S>(mut self, exemptions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.match_exemptions = exemptions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_device(mut self, device: DeviceProfile) -> Self {
        self.device = Some(device);
        self
    }
}

/// Options for a whole remap run.
#[derive(Debug, Clone)]
pub struct RemapOptions {
    /// Spaces before each declaration inside a rule.
    pub indent_declaration: usize,
    /// Spaces before every output line.
    pub indent_css: usize,
    /// Selector lists are wrapped once a line would exceed this width.
    pub line_length: usize,
    /// Selectors matching any of these are dropped.
    pub ignore_selectors: Vec<Regex>,
    /// Highest pixel width generated for `$border:` macros.
    pub limit_special: u32,
    pub device: DeviceProfile,
    /// Emit provenance comments.
    pub comments: bool,
    /// Canonicalize combinator spacing, quotes and legacy pseudo-elements.
    pub stylistic: bool,
    pub order: Order,
    /// One rule per mapping (true) or one rule per selector (false).
    pub combine: bool,
}

impl Default for RemapOptions {
    fn default() -> Self {
        RemapOptions {
            indent_declaration: 2,
            indent_css: 0,
            line_length: 80,
            ignore_selectors: Vec::new(),
            limit_special: 25,
            device: DeviceProfile::default(),
            comments: false,
            stylistic: false,
            order: Order::Mappings,
            combine: true,
        }
    }
}

impl RemapOptions {
    /// Compile and append ignore-selector patterns.
    pub fn with_ignore_selectors<I, S>(mut self, patterns: I) -> Result<Self, RemapError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let re = Regex::new(pattern).map_err(|source| RemapError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })?;
            self.ignore_selectors.push(re);
        }
        Ok(self)
    }
}
