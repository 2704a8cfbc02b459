//! Boutique records and search.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::BoutiqueId;

/// A boutique as stored in the `boutiques` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Boutique {
    pub id: BoutiqueId,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Boutique {
    /// Coordinates as `(latitude, longitude)` when both are known.
    #[must_use]
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }

    /// Case-insensitive match of `term` against name and address.
    #[must_use]
    pub fn matches(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        term.is_empty()
            || self.name.to_lowercase().contains(&term)
            || self
                .address
                .as_deref()
                .is_some_and(|address| address.to_lowercase().contains(&term))
    }
}

/// Boutiques matching `term`, in source order.
#[must_use]
pub fn search<'a>(boutiques: &'a [Boutique], term: &str) -> Vec<&'a Boutique> {
    boutiques.iter().filter(|b| b.matches(term)).collect()
}

/// Column values written when an admin creates or edits a boutique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoutiqueDraft {
    pub name: String,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl BoutiqueDraft {
    /// Whether the draft can be written: a non-blank name and coordinates
    /// within the valid latitude/longitude ranges.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.name.trim().is_empty()
            && self.latitude.is_none_or(|lat| (-90.0..=90.0).contains(&lat))
            && self.longitude.is_none_or(|lng| (-180.0..=180.0).contains(&lng))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boutique(name: &str, address: Option<&str>) -> Boutique {
        Boutique {
            id: BoutiqueId::random(),
            name: name.to_string(),
            address: address.map(String::from),
            latitude: Some(46.2),
            longitude: Some(6.14),
            created_at: None,
        }
    }

    #[test]
    fn test_search_name_and_address() {
        let boutiques = vec![
            boutique("Geneva - Rue du Rhône", Some("12 Rue du Rhône, 1204 Geneva")),
            boutique("Paris - Place Vendôme", Some("8 Place Vendôme, 75001 Paris")),
            boutique("Tokyo Ginza", None),
        ];

        assert_eq!(search(&boutiques, "geneva").len(), 1);
        assert_eq!(search(&boutiques, "75001").len(), 1);
        assert_eq!(search(&boutiques, "GINZA").len(), 1);
        assert_eq!(search(&boutiques, "  ").len(), 3);
        assert!(search(&boutiques, "london").is_empty());
    }

    #[test]
    fn test_coordinates() {
        let mut b = boutique("Geneva", None);
        assert_eq!(b.coordinates(), Some((46.2, 6.14)));
        b.longitude = None;
        assert_eq!(b.coordinates(), None);
    }

    #[test]
    fn test_draft_validation() {
        let mut draft = BoutiqueDraft {
            name: "Dubai Mall".to_string(),
            address: None,
            latitude: Some(25.2),
            longitude: Some(55.3),
        };
        assert!(draft.is_valid());
        draft.latitude = Some(95.0);
        assert!(!draft.is_valid());
        draft.latitude = None;
        draft.name = " ".to_string();
        assert!(!draft.is_valid());
    }
}
