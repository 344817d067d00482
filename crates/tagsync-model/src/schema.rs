//! Framework schema consumed by the validator
//!
//! The framework editor that produces these lives elsewhere; this is only the
//! shape the tagging engine reads.

use crate::attribute::DataKind;
use crate::ids::WidgetId;
use serde::{Deserialize, Serialize};

/// Versioned tag schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Framework {
    /// Framework id
    pub id: u64,
    /// Title
    pub title: String,
    /// Widgets (fields) in display order
    pub widgets: Vec<Widget>,
}

impl Framework {
    /// Create an empty framework
    #[inline]
    #[must_use]
    pub fn new(id: u64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            widgets: Vec::new(),
        }
    }

    /// With widget
    #[inline]
    #[must_use]
    pub fn with_widget(mut self, widget: Widget) -> Self {
        self.widgets.push(widget);
        self
    }

    /// Look up a widget by id
    #[must_use]
    pub fn widget(&self, id: &WidgetId) -> Option<&Widget> {
        self.widgets.iter().find(|w| &w.id == id)
    }
}

/// One schema field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Widget {
    /// Widget id
    pub id: WidgetId,
    /// Label
    pub title: String,
    /// Whether a value is mandatory
    #[serde(default)]
    pub required: bool,
    /// Type and type-specific constraints
    pub kind: WidgetKind,
}

impl Widget {
    /// Create optional widget
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<WidgetId>, title: impl Into<String>, kind: WidgetKind) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            required: false,
            kind,
        }
    }

    /// Mark as required
    #[inline]
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Widget type with constraints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WidgetKind {
    /// Date input
    Date,
    /// Number input with optional bounds
    Number {
        /// Inclusive minimum
        #[serde(default)]
        min: Option<f64>,
        /// Inclusive maximum
        #[serde(default)]
        max: Option<f64>,
    },
    /// Single selection from a scale
    Scale {
        /// Allowed option keys
        options: Vec<String>,
    },
    /// Free text
    Text,
    /// One of several sub-widgets, chosen by the user
    Conditional {
        /// Candidate sub-widgets
        widgets: Vec<Widget>,
    },
}

impl WidgetKind {
    /// Data kind this widget accepts
    #[must_use]
    pub fn data_kind(&self) -> DataKind {
        match self {
            Self::Date => DataKind::Date,
            Self::Number { .. } => DataKind::Number,
            Self::Scale { .. } => DataKind::Scale,
            Self::Text => DataKind::Text,
            Self::Conditional { .. } => DataKind::Conditional,
        }
    }
}
