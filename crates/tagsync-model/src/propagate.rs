//! Attribute propagation ("apply to all" / "apply below")
//!
//! Only the value travels between entries. Each target keeps its own attribute
//! `client_id` and server `id`, so a later save can never write one entry's
//! value into another entry's persisted row.

use crate::attribute::Attribute;
use crate::ids::{ClientId, WidgetId};
use crate::registry::EntityRegistry;

/// Copy one entry's widget value onto its siblings
///
/// An absent value on the source clears the widget on the targets. With
/// `below_only`, entries before the source are left alone. Returns the client
/// ids of the entries that changed (each is marked stale).
///
/// A missing source is a caller error: it is logged and nothing changes.
pub fn apply_to_all(
    registry: &mut EntityRegistry,
    source: &ClientId,
    widget_id: &WidgetId,
    below_only: bool,
) -> Vec<ClientId> {
    let Some(source_position) = registry.position(source) else {
        tracing::warn!(%source, %widget_id, "apply to all: source entry not found");
        return Vec::new();
    };
    let reference = registry
        .get(source)
        .and_then(|e| e.attribute(widget_id))
        .map(|a| a.data.clone());

    let mut modified = Vec::new();
    for (position, target) in registry.iter_mut().enumerate() {
        if position == source_position || (below_only && position < source_position) {
            continue;
        }

        let existing = target
            .attributes
            .iter()
            .position(|a| &a.widget_id == widget_id);
        let changed = match (existing, &reference) {
            (Some(i), Some(data)) => {
                let attribute = &mut target.attributes[i];
                if attribute.data == *data {
                    false
                } else {
                    attribute.data = data.clone();
                    true
                }
            }
            (Some(i), None) => {
                target.attributes.remove(i);
                true
            }
            (None, Some(data)) => {
                target
                    .attributes
                    .push(Attribute::new(widget_id.clone(), data.clone()));
                true
            }
            (None, None) => false,
        };

        if changed {
            target.stale = true;
            modified.push(target.client_id.clone());
        }
    }

    tracing::debug!(
        %source,
        %widget_id,
        below_only,
        modified = modified.len(),
        "attribute propagated"
    );
    modified
}
