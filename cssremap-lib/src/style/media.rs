//! Media-query evaluation against a fixed device profile.
//!
//! LightningCSS parses the `@media` prelude; `own_media_list` keeps the parts of
//! it a `DeviceProfile` can answer. A device only knows its media type and width,
//! so every other feature is a non-match. Width bounds with no pixel value
//! (`vw`, `calc()`, `env()`) are evaluation errors, and errors count as a match.

use crate::error::MediaError;
use crate::options::DeviceProfile;
use crate::style::owned_css::OwnedMedia;
use lightningcss::media_query::{
    MediaCondition, MediaFeature, MediaFeatureComparison, MediaFeatureId, MediaFeatureName,
    MediaFeatureValue, MediaList, MediaQuery, MediaType, Operator, Qualifier, QueryFeature,
};
use lightningcss::printer::PrinterOptions;
use lightningcss::traits::{Parse, ToCss};
use lightningcss::values::length::{Length, LengthValue};

const PX_PER_EM: f32 = 16.0;

/// One query of a media query list, detached from the parser's lifetimes.
#[derive(Debug, Clone, PartialEq)]
pub struct OwnedMediaQuery {
    pub negated: bool,
    /// Lower-cased media type; `None` for `all`.
    pub media_type: Option<String>,
    pub condition: Option<OwnedCondition>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OwnedCondition {
    /// `(width)`: any non-zero width.
    AnyWidth,
    /// Every `width <op> px` pair must hold.
    Width(Vec<(MediaFeatureComparison, f32)>),
    /// A width test whose bound has no pixel value.
    UnresolvedWidth(String),
    /// A feature the device has no value for, e.g. `(prefers-color-scheme: dark)`.
    Unanswerable(String),
    Not(Box<OwnedCondition>),
    And(Vec<OwnedCondition>),
    Or(Vec<OwnedCondition>),
}

pub fn own_media_list(list: &MediaList<'_>) -> Vec<OwnedMediaQuery> {
    list.media_queries.iter().map(own_query).collect()
}

fn own_query(query: &MediaQuery<'_>) -> OwnedMediaQuery {
    let media_type = match &query.media_type {
        MediaType::All => None,
        MediaType::Print => Some("print".to_string()),
        MediaType::Screen => Some("screen".to_string()),
        MediaType::Custom(name) => Some(name.to_ascii_lowercase()),
    };
    OwnedMediaQuery {
        negated: matches!(query.qualifier, Some(Qualifier::Not)),
        media_type,
        condition: query.condition.as_ref().map(own_condition),
    }
}

fn own_condition(condition: &MediaCondition<'_>) -> OwnedCondition {
    match condition {
        MediaCondition::Feature(feature) => own_feature(feature, condition),
        MediaCondition::Not(inner) => OwnedCondition::Not(Box::new(own_condition(inner))),
        MediaCondition::Operation {
            operator,
            conditions,
        } => {
            let conditions = conditions.iter().map(own_condition).collect();
            match operator {
                Operator::And => OwnedCondition::And(conditions),
                Operator::Or => OwnedCondition::Or(conditions),
            }
        }
    }
}

fn own_feature(feature: &MediaFeature<'_>, condition: &MediaCondition<'_>) -> OwnedCondition {
    let text = || {
        condition
            .to_css_string(PrinterOptions::default())
            .unwrap_or_default()
    };
    let name = match feature {
        QueryFeature::Plain { name, .. }
        | QueryFeature::Boolean { name }
        | QueryFeature::Range { name, .. }
        | QueryFeature::Interval { name, .. } => name,
    };
    if !matches!(name, MediaFeatureName::Standard(MediaFeatureId::Width)) {
        return OwnedCondition::Unanswerable(text());
    }

    let tests = match feature {
        QueryFeature::Boolean { .. } => return OwnedCondition::AnyWidth,
        QueryFeature::Plain { value, .. } => vec![(MediaFeatureComparison::Equal, value)],
        QueryFeature::Range {
            operator, value, ..
        } => vec![(*operator, value)],
        // `start <op> width` is `width <flipped op> start`
        QueryFeature::Interval {
            start,
            start_operator,
            end,
            end_operator,
            ..
        } => vec![(flip(*start_operator), start), (*end_operator, end)],
    };

    let mut constraints = Vec::with_capacity(tests.len());
    for (op, value) in tests {
        match feature_px(value) {
            Some(px) => constraints.push((op, px)),
            None => return OwnedCondition::UnresolvedWidth(text()),
        }
    }
    OwnedCondition::Width(constraints)
}

fn feature_px(value: &MediaFeatureValue<'_>) -> Option<f32> {
    match value {
        MediaFeatureValue::Length(length) => length_px(length),
        _ => None,
    }
}

fn length_px(length: &Length) -> Option<f32> {
    match length {
        Length::Value(LengthValue::Em(n)) | Length::Value(LengthValue::Rem(n)) => Some(n * PX_PER_EM),
        other => other.to_px(),
    }
}

fn flip(op: MediaFeatureComparison) -> MediaFeatureComparison {
    match op {
        MediaFeatureComparison::LessThan => MediaFeatureComparison::GreaterThan,
        MediaFeatureComparison::LessThanEqual => MediaFeatureComparison::GreaterThanEqual,
        MediaFeatureComparison::GreaterThan => MediaFeatureComparison::LessThan,
        MediaFeatureComparison::GreaterThanEqual => MediaFeatureComparison::LessThanEqual,
        MediaFeatureComparison::Equal => MediaFeatureComparison::Equal,
    }
}

fn compare(width: f32, op: MediaFeatureComparison, bound: f32) -> bool {
    match op {
        MediaFeatureComparison::LessThan => width < bound,
        MediaFeatureComparison::LessThanEqual => width <= bound,
        MediaFeatureComparison::GreaterThan => width > bound,
        MediaFeatureComparison::GreaterThanEqual => width >= bound,
        MediaFeatureComparison::Equal => width == bound,
    }
}

/// True when `media` applies to `device`. Evaluation failures count as a match.
pub fn media_matches(media: &OwnedMedia, device: &DeviceProfile) -> bool {
    match evaluate(&media.queries, device) {
        Ok(matches) => matches,
        Err(e) => {
            log::warn!("including @media {} ({})", media.query, e);
            true
        }
    }
}

/// Evaluate a media query list; an empty list matches every device.
pub fn evaluate(queries: &[OwnedMediaQuery], device: &DeviceProfile) -> Result<bool, MediaError> {
    if queries.is_empty() {
        return Ok(true);
    }
    let width = device_width(&device.width)?;
    let media_type = device.media_type.to_ascii_lowercase();

    // every query is evaluated so that an error anywhere fails the whole list
    let mut any = false;
    for query in queries {
        any |= query.matches(&media_type, width)?;
    }
    Ok(any)
}

fn device_width(text: &str) -> Result<f32, MediaError> {
    Length::parse_string(text.trim())
        .ok()
        .and_then(|length| length_px(&length))
        .ok_or_else(|| MediaError::InvalidLength(text.to_string()))
}

impl OwnedMediaQuery {
    fn matches(&self, media_type: &str, width: f32) -> Result<bool, MediaError> {
        let type_matches = self.media_type.as_deref().map_or(true, |t| t == media_type);
        let condition = match &self.condition {
            Some(condition) => condition.evaluate(width)?,
            None => true,
        };
        Ok((type_matches && condition) != self.negated)
    }
}

impl OwnedCondition {
    fn evaluate(&self, width: f32) -> Result<bool, MediaError> {
        match self {
            OwnedCondition::AnyWidth => Ok(width > 0.0),
            OwnedCondition::Width(constraints) => Ok(constraints
                .iter()
                .all(|(op, bound)| compare(width, *op, *bound))),
            OwnedCondition::UnresolvedWidth(text) => Err(MediaError::UnresolvedLength(text.clone())),
            OwnedCondition::Unanswerable(_) => Ok(false),
            OwnedCondition::Not(inner) => Ok(!inner.evaluate(width)?),
            OwnedCondition::And(conditions) => {
                let mut all = true;
                for condition in conditions {
                    all &= condition.evaluate(width)?;
                }
                Ok(all)
            }
            OwnedCondition::Or(conditions) => {
                let mut any = false;
                for condition in conditions {
                    any |= condition.evaluate(width)?;
                }
                Ok(any)
            }
        }
    }
}
