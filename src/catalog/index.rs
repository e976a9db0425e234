use std::collections::HashMap;

use crate::catalog::schema::{Criterion, Tool, MAX_RATING};

/// Canonical form used for both criterion ids and names.
pub fn canonical_key(raw: &str) -> String {
    raw.trim()
        .to_ascii_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect::<String>()
        .split('_')
        .filter(|piece| !piece.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Per-tool rating lookup built once, keyed by canonical criterion id with a
/// secondary canonical-name index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RatingTable {
    by_id: HashMap<String, u8>,
    by_name: HashMap<String, u8>,
}

impl RatingTable {
    pub fn from_tool(tool: &Tool) -> Self {
        let mut table = Self::default();
        for rating in &tool.criteria {
            let ranking = rating.ranking.min(MAX_RATING);
            // first entry wins on duplicate ids
            table
                .by_id
                .entry(canonical_key(&rating.id))
                .or_insert(ranking);
            table
                .by_name
                .entry(canonical_key(&rating.name))
                .or_insert(ranking);
        }
        table
    }

    /// Tool rating for `criterion`: by id, then by name, then 0.
    pub fn rating_for(&self, criterion: &Criterion) -> u8 {
        self.lookup(&criterion.id)
            .or_else(|| self.by_name.get(&canonical_key(&criterion.name)).copied())
            .unwrap_or(0)
    }

    /// Lookup by a bare criterion identifier (id first, then name).
    pub fn rating_by_key(&self, key: &str) -> u8 {
        let canonical = canonical_key(key);
        self.by_id
            .get(&canonical)
            .or_else(|| self.by_name.get(&canonical))
            .copied()
            .unwrap_or(0)
    }

    fn lookup(&self, id: &str) -> Option<u8> {
        self.by_id.get(&canonical_key(id)).copied()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalizes_ids_and_names() {
        assert_eq!(canonical_key("  Ease of Use "), "ease_of_use");
        assert_eq!(canonical_key("ease-of-use"), "ease_of_use");
        assert_eq!(canonical_key("Reporting & Analytics"), "reporting_analytics");
    }

    #[test]
    fn falls_back_from_id_to_name_to_zero() {
        let tool = Tool::new("t", "T")
            .with_rating("scalability", "Scalability", 4)
            .with_rating("legacy-id", "Ease of Use", 3);
        let table = RatingTable::from_tool(&tool);

        let by_id = Criterion::new("scalability", "Something Else", 3);
        let by_name = Criterion::new("ease_of_use", "Ease of Use", 3);
        let missing = Criterion::new("security", "Security", 3);

        assert_eq!(table.rating_for(&by_id), 4);
        assert_eq!(table.rating_for(&by_name), 3);
        assert_eq!(table.rating_for(&missing), 0);
        assert_eq!(table.rating_by_key("Legacy ID"), 3);
    }

    #[test]
    fn caps_ratings_at_five() {
        let mut tool = Tool::new("t", "T");
        tool.criteria.push(crate::catalog::ToolCriterionRating {
            id: "x".to_string(),
            name: "X".to_string(),
            ranking: 9,
            description: None,
        });
        let table = RatingTable::from_tool(&tool);
        assert_eq!(table.rating_by_key("x"), 5);
    }
}
