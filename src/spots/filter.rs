//! In-memory filtering over an already fetched spot list: free-text search
//! across name/description/location plus amenity-tag filtering. Kind and
//! category are narrowed in SQL before this runs.

use serde::Deserialize;

use crate::db::Spot;

#[derive(Debug, Default, Clone, Deserialize)]
pub struct SpotFilter {
    pub q: Option<String>,
    pub tags: Vec<String>,
}

impl SpotFilter {
    pub fn is_empty(&self) -> bool {
        self.q.as_deref().is_none_or(str::is_empty) && self.tags.is_empty()
    }

    pub fn matches(&self, spot: &Spot) -> bool {
        self.matches_search(spot) && self.matches_tags(spot)
    }

    fn matches_search(&self, spot: &Spot) -> bool {
        let Some(q) = self.q.as_deref().filter(|q| !q.is_empty()) else {
            return true;
        };
        let q = q.to_lowercase();

        spot.name.to_lowercase().contains(&q)
            || spot.description.to_lowercase().contains(&q)
            || spot.location.to_lowercase().contains(&q)
    }

    // every selected tag must be present, not any
    fn matches_tags(&self, spot: &Spot) -> bool {
        self.tags
            .iter()
            .all(|tag| spot.amenities.iter().any(|a| a == tag))
    }

    pub fn apply(&self, spots: Vec<Spot>) -> Vec<Spot> {
        if self.is_empty() {
            return spots;
        }
        spots.into_iter().filter(|s| self.matches(s)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SpotKind;

    fn spot(name: &str, location: &str, amenities: &[&str]) -> Spot {
        Spot {
            id: name.to_lowercase().replace(' ', "-"),
            name: name.into(),
            description: "a place to focus".into(),
            location: location.into(),
            category: "General".into(),
            kind: SpotKind::Study,
            capacity: 10,
            amenities: amenities.iter().map(|s| s.to_string()).collect(),
            created_by: "alice".into(),
            created_at: "2026-01-01T00:00:00.000Z".into(),
        }
    }

    #[test]
    fn empty_filter_matches_everything() {
        let f = SpotFilter::default();
        assert!(f.matches(&spot("Library", "Building A", &[])));
    }

    #[test]
    fn search_is_case_insensitive_across_fields() {
        let f = SpotFilter { q: Some("library".into()), tags: vec![] };
        assert!(f.matches(&spot("Central LIBRARY", "Building A", &[])));

        let f = SpotFilter { q: Some("building a".into()), tags: vec![] };
        assert!(f.matches(&spot("Quiet Corner", "Building A", &[])));

        let f = SpotFilter { q: Some("focus".into()), tags: vec![] };
        assert!(f.matches(&spot("Quiet Corner", "Building A", &[])));

        let f = SpotFilter { q: Some("gym".into()), tags: vec![] };
        assert!(!f.matches(&spot("Quiet Corner", "Building A", &[])));
    }

    #[test]
    fn tag_filter_requires_every_selected_tag() {
        let s = spot("Lab", "Basement", &["WiFi", "Whiteboard"]);

        let f = SpotFilter { q: None, tags: vec!["WiFi".into()] };
        assert!(f.matches(&s));

        let f = SpotFilter { q: None, tags: vec!["WiFi".into(), "Whiteboard".into()] };
        assert!(f.matches(&s));

        // AND semantics: one missing tag fails the whole spot
        let f = SpotFilter { q: None, tags: vec!["WiFi".into(), "Parking".into()] };
        assert!(!f.matches(&s));
    }

    #[test]
    fn apply_keeps_only_matches() {
        let spots = vec![
            spot("Library", "Building A", &["WiFi"]),
            spot("Union Lounge", "Union", &[]),
        ];
        let f = SpotFilter { q: None, tags: vec!["WiFi".into()] };
        let out = f.apply(spots);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "Library");
    }
}
