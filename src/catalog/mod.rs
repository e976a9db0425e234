pub mod defaults;
pub mod index;
pub mod schema;

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub use index::{canonical_key, RatingTable};
pub use schema::{
    clamp_importance, Criterion, RatingAssignment, RatingParseError, Tag, TagKind, Tool,
    ToolCriterionRating,
};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed reading catalog {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed parsing catalog {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("catalog {0} contains no tools")]
    Empty(PathBuf),
    #[error("unknown criterion: {0}")]
    UnknownCriterion(String),
    #[error("unknown tool: {0}")]
    UnknownTool(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CatalogFile {
    #[serde(default)]
    pub tools: Vec<Tool>,
    #[serde(default)]
    pub criteria: Vec<Criterion>,
}

/// Tool list plus the rating tables derived from it. Tools are immutable for
/// the lifetime of a catalog; rebuild it to pick up admin edits.
#[derive(Debug, Clone)]
pub struct Catalog {
    tools: Vec<Tool>,
    tables: Vec<RatingTable>,
    criteria: Vec<Criterion>,
}

impl Catalog {
    pub fn new(tools: Vec<Tool>, criteria: Vec<Criterion>) -> Self {
        let tables = tools.iter().map(RatingTable::from_tool).collect();
        Self {
            tools,
            tables,
            criteria,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(defaults::default_tools(), defaults::default_criteria())
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let data = fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: CatalogFile =
            serde_json::from_str(&data).map_err(|source| CatalogError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        if file.tools.is_empty() {
            return Err(CatalogError::Empty(path.to_path_buf()));
        }
        let criteria = if file.criteria.is_empty() {
            warn!(
                "catalog {} has no criteria, using built-in criteria",
                path.display()
            );
            defaults::default_criteria()
        } else {
            file.criteria
        };
        debug!(
            "loaded {} tools and {} criteria from {}",
            file.tools.len(),
            criteria.len(),
            path.display()
        );
        Ok(Self::new(file.tools, criteria))
    }

    /// Loads from `path` when given, otherwise the built-in catalog.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, CatalogError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::with_defaults()),
        }
    }

    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    /// Default criteria as shipped with the catalog.
    pub fn criteria(&self) -> &[Criterion] {
        &self.criteria
    }

    pub fn entries(&self) -> impl Iterator<Item = (&Tool, &RatingTable)> {
        self.tools.iter().zip(self.tables.iter())
    }

    pub fn tool(&self, id_or_name: &str) -> Option<&Tool> {
        let key = canonical_key(id_or_name);
        self.tools
            .iter()
            .find(|tool| canonical_key(&tool.id) == key)
            .or_else(|| self.tools.iter().find(|tool| canonical_key(&tool.name) == key))
    }

    pub fn table_for(&self, tool_id: &str) -> Option<&RatingTable> {
        self.tools
            .iter()
            .position(|tool| tool.id == tool_id)
            .map(|idx| &self.tables[idx])
    }

    pub fn methodologies(&self) -> Vec<String> {
        let set: BTreeSet<String> = self
            .tools
            .iter()
            .flat_map(|tool| tool.methodologies())
            .map(|name| name.to_string())
            .collect();
        set.into_iter().collect()
    }

    /// Criteria from the catalog with `assignments` applied on top.
    pub fn criteria_with(
        &self,
        assignments: &[RatingAssignment],
    ) -> Result<Vec<Criterion>, CatalogError> {
        let mut criteria = self.criteria.clone();
        apply_ratings(&mut criteria, assignments)?;
        Ok(criteria)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Sets importance on matching criteria (id or name, canonicalized).
pub fn apply_ratings(
    criteria: &mut [Criterion],
    assignments: &[RatingAssignment],
) -> Result<(), CatalogError> {
    for assignment in assignments {
        let key = canonical_key(&assignment.criterion);
        let Some(criterion) = criteria
            .iter_mut()
            .find(|c| canonical_key(&c.id) == key || canonical_key(&c.name) == key)
        else {
            return Err(CatalogError::UnknownCriterion(assignment.criterion.clone()));
        };
        criterion.set_rating(assignment.rating);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn default_catalog_exposes_methodologies() {
        let catalog = Catalog::with_defaults();
        let methodologies = catalog.methodologies();
        assert!(methodologies.contains(&"Agile".to_string()));
        assert!(methodologies.contains(&"Waterfall".to_string()));
    }

    #[test]
    fn finds_tools_by_id_or_name() {
        let catalog = Catalog::with_defaults();
        assert_eq!(catalog.tool("jira").map(|t| t.id.as_str()), Some("jira"));
        assert_eq!(
            catalog.tool("Microsoft Project").map(|t| t.id.as_str()),
            Some("ms_project")
        );
        assert!(catalog.tool("nope").is_none());
        assert!(catalog.table_for("jira").is_some());
    }

    #[test]
    fn applies_rating_assignments() {
        let catalog = Catalog::with_defaults();
        let criteria = catalog
            .criteria_with(&[
                "scalability=5".parse().expect("assignment"),
                "Ease of Use=1".parse().expect("assignment"),
            ])
            .expect("known criteria");
        let scalability = criteria.iter().find(|c| c.id == "scalability").expect("c");
        let ease = criteria.iter().find(|c| c.id == "ease_of_use").expect("c");
        assert_eq!(scalability.user_rating, 5);
        assert_eq!(ease.user_rating, 1);
    }

    #[test]
    fn rejects_unknown_criterion() {
        let catalog = Catalog::with_defaults();
        let err = catalog
            .criteria_with(&["vibes=3".parse().expect("assignment")])
            .unwrap_err();
        assert!(matches!(err, CatalogError::UnknownCriterion(name) if name == "vibes"));
    }

    #[test]
    fn loads_catalog_file_and_falls_back_to_default_criteria() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"{{"tools":[{{"id":"a","name":"Alpha","tags":[{{"name":"Agile","type":"Methodology"}}],"criteria":[{{"id":"scalability","name":"Scalability","ranking":4}}]}}]}}"#
        )
        .expect("write catalog");

        let catalog = Catalog::load(file.path()).expect("catalog loads");
        assert_eq!(catalog.tools().len(), 1);
        assert_eq!(catalog.criteria().len(), defaults::default_criteria().len());
        assert!(catalog.tools()[0].has_methodology("agile"));
    }

    #[test]
    fn empty_catalog_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{"tools":[]}}"#).expect("write catalog");
        assert!(matches!(
            Catalog::load(file.path()),
            Err(CatalogError::Empty(_))
        ));
    }
}
