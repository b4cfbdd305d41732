//! Deck construction and naming

use std::collections::HashSet;

use chrono::Utc;
use uuid::Uuid;

use super::models::{Deck, Note};
use crate::rules::CardOptions;

/// Stylesheet shipped with every generated deck
pub const DECK_STYLE: &str = include_str!("../../templates/deck.css");

/// Wrap notes into a deck with a fresh identity. Pure; performs no I/O.
pub fn assemble(name: String, notes: Vec<Note>, style: &str, settings: &CardOptions) -> Deck {
    log::info!("Assembled deck '{}' with {} notes", name, notes.len());
    Deck {
        id: Uuid::new_v4(),
        name,
        notes,
        style: style.to_string(),
        settings: settings.clone(),
        created_at: Utc::now(),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Combine a parent lineage and a local name through the naming template.
///
/// Falls back to whichever part is present; `None` when both are absent.
pub fn combine_names(template: &str, parent: Option<&str>, local: Option<&str>) -> Option<String> {
    match (non_empty(parent), non_empty(local)) {
        (Some(parent), Some(local)) => Some(
            template
                .replace("{parent}", parent)
                .replace("{name}", local),
        ),
        (Some(only), None) | (None, Some(only)) => Some(only.to_string()),
        (None, None) => None,
    }
}

/// Hands out deck names that are unique within one conversion run
#[derive(Debug, Clone)]
pub struct DeckNamer {
    template: String,
    used: HashSet<String>,
}

impl DeckNamer {
    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
            used: HashSet::new(),
        }
    }

    /// Name without collision handling; see [`combine_names`] for the fallbacks
    pub fn base_name(
        &self,
        parent: Option<&str>,
        local: Option<&str>,
        first_page_title: Option<&str>,
        node_id: &str,
    ) -> String {
        combine_names(&self.template, parent, local)
            .or_else(|| non_empty(first_page_title).map(str::to_string))
            .unwrap_or_else(|| node_id.to_string())
    }

    /// Resolve a name and reserve it, suffixing ` (n)` on collision
    pub fn resolve(
        &mut self,
        parent: Option<&str>,
        local: Option<&str>,
        first_page_title: Option<&str>,
        node_id: &str,
    ) -> String {
        let base = self.base_name(parent, local, first_page_title, node_id);
        let mut name = base.clone();
        let mut counter = 2;
        while self.used.contains(&name) {
            name = format!("{} ({})", base, counter);
            counter += 1;
        }
        self.used.insert(name.clone());
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::default_deck_name_template;

    #[test]
    fn test_combine_names() {
        let t = default_deck_name_template();
        assert_eq!(
            combine_names(&t, Some("Biology"), Some("Cells")),
            Some("Biology::Cells".to_string())
        );
        assert_eq!(combine_names(&t, None, Some("Cells")), Some("Cells".to_string()));
        assert_eq!(combine_names(&t, Some("Biology"), Some("  ")), Some("Biology".to_string()));
        assert_eq!(combine_names(&t, None, None), None);
    }

    #[test]
    fn test_custom_template() {
        assert_eq!(
            combine_names("{parent} / {name}", Some("A"), Some("B")),
            Some("A / B".to_string())
        );
    }

    #[test]
    fn test_fallback_to_first_page_title_then_id() {
        let namer = DeckNamer::new(&default_deck_name_template());
        assert_eq!(namer.base_name(None, None, Some("Home"), "abc"), "Home");
        assert_eq!(namer.base_name(None, None, None, "abc"), "abc");
    }

    #[test]
    fn test_resolve_suffixes_collisions() {
        let mut namer = DeckNamer::new(&default_deck_name_template());
        assert_eq!(namer.resolve(Some("P"), Some("X"), None, "1"), "P::X");
        assert_eq!(namer.resolve(Some("P"), Some("X"), None, "2"), "P::X (2)");
        assert_eq!(namer.resolve(Some("P"), Some("X"), None, "3"), "P::X (3)");
        assert_eq!(namer.resolve(Some("P"), Some("Y"), None, "4"), "P::Y");
    }

    #[test]
    fn test_assemble_generates_fresh_identity() {
        let options = CardOptions::default();
        let a = assemble("D".into(), Vec::new(), DECK_STYLE, &options);
        let b = assemble("D".into(), Vec::new(), DECK_STYLE, &options);
        assert_ne!(a.id, b.id);
        assert!(a.style.contains(".card"));
        assert_eq!(a.settings, options);
    }
}
