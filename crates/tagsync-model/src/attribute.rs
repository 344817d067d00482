//! Attributes: the value of one framework widget on one entry

use crate::ids::{ClientId, ServerId, WidgetId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Value of one framework widget on one entry
///
/// Attribute identity (`client_id`, `id`) belongs to the entry that owns it and
/// never migrates to another entry. Only `data` is ever copied between entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    /// Client identifier of this attribute row
    pub client_id: ClientId,
    /// Server identifier, absent until persisted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ServerId>,
    /// Widget this attribute answers
    pub widget_id: WidgetId,
    /// Widget-typed value
    pub data: AttributeData,
}

impl Attribute {
    /// Create a new, never persisted attribute
    #[inline]
    #[must_use]
    pub fn new(widget_id: WidgetId, data: AttributeData) -> Self {
        Self {
            client_id: ClientId::generate(),
            id: None,
            widget_id,
            data,
        }
    }

    /// With server id
    #[inline]
    #[must_use]
    pub fn with_id(mut self, id: ServerId) -> Self {
        self.id = Some(id);
        self
    }
}

/// Widget-typed attribute value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AttributeData {
    /// Calendar date
    Date(NaiveDate),
    /// Numeric value
    Number(f64),
    /// Key of the selected scale option
    Scale(String),
    /// Free text
    Text(String),
    /// Conditional widget holding candidate sub-widget values
    Conditional(ConditionalData),
}

impl AttributeData {
    /// Kind of data held, to compare against a widget's kind
    #[must_use]
    pub fn kind(&self) -> DataKind {
        match self {
            Self::Date(_) => DataKind::Date,
            Self::Number(_) => DataKind::Number,
            Self::Scale(_) => DataKind::Scale,
            Self::Text(_) => DataKind::Text,
            Self::Conditional(_) => DataKind::Conditional,
        }
    }

    /// Whether the value counts as "not filled in"
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) | Self::Scale(s) => s.trim().is_empty(),
            Self::Conditional(c) => c.active_value().is_none(),
            Self::Date(_) | Self::Number(_) => false,
        }
    }
}

/// Discriminant of [`AttributeData`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    /// Date
    Date,
    /// Number
    Number,
    /// Scale
    Scale,
    /// Text
    Text,
    /// Conditional
    Conditional,
}

/// Conditional widget value
///
/// Values for every candidate sub-widget are kept so switching back and forth
/// does not lose input; only the active one is meaningful.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConditionalData {
    /// Currently active sub-widget
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<WidgetId>,
    /// Candidate values keyed by sub-widget
    #[serde(default)]
    pub values: BTreeMap<WidgetId, AttributeData>,
}

impl ConditionalData {
    /// Value of the active sub-widget, if any
    #[must_use]
    pub fn active_value(&self) -> Option<&AttributeData> {
        self.active.as_ref().and_then(|w| self.values.get(w))
    }
}

/// Change to a single widget's value on an entry
#[derive(Debug, Clone, PartialEq)]
pub struct AttributePatch {
    /// Target widget
    pub widget_id: WidgetId,
    /// New value; `None` clears the attribute
    pub data: Option<AttributeData>,
}

impl AttributePatch {
    /// Set a widget value
    #[inline]
    #[must_use]
    pub fn set(widget_id: impl Into<WidgetId>, data: AttributeData) -> Self {
        Self {
            widget_id: widget_id.into(),
            data: Some(data),
        }
    }

    /// Clear a widget value
    #[inline]
    #[must_use]
    pub fn clear(widget_id: impl Into<WidgetId>) -> Self {
        Self {
            widget_id: widget_id.into(),
            data: None,
        }
    }
}
