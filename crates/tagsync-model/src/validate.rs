//! Validation of entry payloads against a framework
//!
//! The [`Validator`] contract is shared by local form validation and by the
//! synchronizer when it maps remote rejections, so both land in the same
//! error slot with the same shape:
//!
//! ```text
//! { message?, fields: { "excerpt": {..}, "attributes": { <widget_id>: {..} } } }
//! ```

use crate::attribute::{AttributeData, ConditionalData};
use crate::entry::EntryPayload;
use crate::error_tree::ErrorTree;
use crate::schema::{Framework, Widget, WidgetKind};

/// Field key for attribute errors
pub const ATTRIBUTES_FIELD: &str = "attributes";

/// Schema validator contract (synchronous, pure)
pub trait Validator: Send + Sync {
    /// Validate a payload, returning the cleaned payload or an error tree
    ///
    /// # Errors
    /// Returns the error tree describing every failing field.
    fn validate(&self, payload: EntryPayload, framework: &Framework)
        -> Result<EntryPayload, ErrorTree>;

    /// Re-key a remote error so it matches the local error tree shape
    fn transform_remote_error(
        &self,
        framework: &Framework,
        payload: &EntryPayload,
        error: ErrorTree,
    ) -> ErrorTree;
}

/// Default validator driven by [`WidgetKind`] constraints
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameworkValidator;

impl FrameworkValidator {
    /// Create validator
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn check_value(widget: &Widget, data: &AttributeData) -> Option<String> {
        if data.kind() != widget.kind.data_kind() {
            return Some(format!(
                "expected {:?} value, got {:?}",
                widget.kind.data_kind(),
                data.kind()
            ));
        }
        match (&widget.kind, data) {
            (WidgetKind::Number { min, max }, AttributeData::Number(n)) => {
                if !n.is_finite() {
                    Some("value must be a finite number".to_string())
                } else if let Some(m) = min.filter(|m| n < m) {
                    Some(format!("value must be at least {m}"))
                } else if let Some(m) = max.filter(|m| n > m) {
                    Some(format!("value must be at most {m}"))
                } else {
                    None
                }
            }
            (WidgetKind::Scale { options }, AttributeData::Scale(key)) => {
                (!options.iter().any(|o| o == key)).then(|| format!("unknown option '{key}'"))
            }
            (WidgetKind::Conditional { widgets }, AttributeData::Conditional(cond)) => {
                Self::check_conditional(widgets, cond)
            }
            _ => None,
        }
    }

    fn check_conditional(widgets: &[Widget], cond: &ConditionalData) -> Option<String> {
        let active = cond.active.as_ref()?;
        let Some(sub) = widgets.iter().find(|w| &w.id == active) else {
            return Some(format!("unknown conditional widget '{active}'"));
        };
        match cond.values.get(active) {
            Some(value) => Self::check_value(sub, value),
            None if sub.required => Some("this field is required".to_string()),
            None => None,
        }
    }
}

impl Validator for FrameworkValidator {
    fn validate(
        &self,
        mut payload: EntryPayload,
        framework: &Framework,
    ) -> Result<EntryPayload, ErrorTree> {
        let mut attribute_errors = ErrorTree::new();

        for attribute in &payload.attributes {
            let key = attribute.widget_id.to_string();
            match framework.widget(&attribute.widget_id) {
                None => attribute_errors.insert(key, ErrorTree::message("unknown widget")),
                Some(widget) => {
                    if let Some(msg) = Self::check_value(widget, &attribute.data) {
                        attribute_errors.insert(key, ErrorTree::message(msg));
                    }
                }
            }
        }

        for widget in framework.widgets.iter().filter(|w| w.required) {
            let filled = payload
                .attributes
                .iter()
                .any(|a| a.widget_id == widget.id && !a.data.is_empty());
            if !filled {
                attribute_errors.insert(
                    widget.id.to_string(),
                    ErrorTree::message("this field is required"),
                );
            }
        }

        if !attribute_errors.is_empty() {
            return Err(ErrorTree::new().with_field(ATTRIBUTES_FIELD, attribute_errors));
        }

        // Empty optional values are not sent
        payload.attributes.retain(|a| !a.data.is_empty());
        Ok(payload)
    }

    fn transform_remote_error(
        &self,
        _framework: &Framework,
        payload: &EntryPayload,
        mut error: ErrorTree,
    ) -> ErrorTree {
        // The server reports attribute errors by position in the sent array
        let Some(by_index) = error.fields.remove(ATTRIBUTES_FIELD) else {
            return error;
        };

        let mut by_widget = ErrorTree {
            message: by_index.message,
            ..ErrorTree::default()
        };
        for (key, child) in by_index.fields {
            let widget_key = key
                .parse::<usize>()
                .ok()
                .and_then(|i| payload.attributes.get(i))
                .map_or(key, |a| a.widget_id.to_string());
            by_widget.insert(widget_key, child);
        }
        error.insert(ATTRIBUTES_FIELD, by_widget);
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::Attribute;
    use crate::ids::{ClientId, WidgetId};
    use pretty_assertions::assert_eq;

    fn framework() -> Framework {
        Framework::new(1, "test")
            .with_widget(Widget::new("sector", "Sector", WidgetKind::Text).required())
            .with_widget(Widget::new(
                "severity",
                "Severity",
                WidgetKind::Number {
                    min: Some(0.0),
                    max: Some(5.0),
                },
            ))
            .with_widget(Widget::new(
                "reliability",
                "Reliability",
                WidgetKind::Scale {
                    options: vec!["low".into(), "high".into()],
                },
            ))
    }

    fn payload(attributes: Vec<Attribute>) -> EntryPayload {
        EntryPayload {
            id: None,
            client_id: ClientId::from("e1"),
            order: 0,
            excerpt: None,
            attributes,
        }
    }

    #[test]
    fn accepts_valid_payload() {
        let p = payload(vec![
            Attribute::new("sector".into(), AttributeData::Text("health".into())),
            Attribute::new("severity".into(), AttributeData::Number(3.0)),
        ]);
        let validated = FrameworkValidator::new().validate(p.clone(), &framework());
        assert_eq!(validated, Ok(p));
    }

    #[test]
    fn reports_missing_required_and_bounds() {
        let p = payload(vec![
            Attribute::new("severity".into(), AttributeData::Number(9.0)),
            Attribute::new("reliability".into(), AttributeData::Scale("medium".into())),
        ]);
        let err = FrameworkValidator::new()
            .validate(p, &framework())
            .unwrap_err();
        let attrs = err.field(ATTRIBUTES_FIELD).unwrap();

        assert!(attrs.field("sector").is_some());
        assert_eq!(
            attrs.field("severity").unwrap().message.as_deref(),
            Some("value must be at most 5")
        );
        assert_eq!(
            attrs.field("reliability").unwrap().message.as_deref(),
            Some("unknown option 'medium'")
        );
    }

    #[test]
    fn rejects_kind_mismatch_and_unknown_widget() {
        let p = payload(vec![
            Attribute::new("sector".into(), AttributeData::Number(1.0)),
            Attribute::new("ghost".into(), AttributeData::Text("x".into())),
        ]);
        let err = FrameworkValidator::new()
            .validate(p, &framework())
            .unwrap_err();
        let attrs = err.field(ATTRIBUTES_FIELD).unwrap();
        assert!(attrs.field("sector").is_some());
        assert_eq!(
            attrs.field("ghost").unwrap().message.as_deref(),
            Some("unknown widget")
        );
    }

    #[test]
    fn remote_error_is_rekeyed_by_widget() {
        let p = payload(vec![
            Attribute::new("sector".into(), AttributeData::Text("a".into())),
            Attribute::new("severity".into(), AttributeData::Number(1.0)),
        ]);
        let remote = ErrorTree::message("rejected").with_field(
            ATTRIBUTES_FIELD,
            ErrorTree::new().with_field("1", ErrorTree::message("stale value")),
        );

        let mapped = FrameworkValidator::new().transform_remote_error(&framework(), &p, remote);

        assert_eq!(mapped.message.as_deref(), Some("rejected"));
        let attrs = mapped.field(ATTRIBUTES_FIELD).unwrap();
        assert_eq!(
            attrs
                .field(WidgetId::from("severity").as_str())
                .and_then(|e| e.message.as_deref()),
            Some("stale value")
        );
    }
}
