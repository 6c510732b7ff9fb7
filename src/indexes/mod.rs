//! Atlas Search index catalog
//!
//! The lab's exercises rely on four indexes over the `books` collection.
//! They are declared here once and can be printed as shell commands or
//! created through the driver. The HTTP server never creates them.

use mongodb::Database;
use mongodb::bson::{Bson, Document, doc};
use tracing::info;

use crate::error::{ExecutionError, Result};
use crate::formatter::JsonConverter;

/// Collection the indexes are defined on
pub const INDEXED_COLLECTION: &str = "books";

/// Embedding size of the `embeddings` field
pub const EMBEDDING_DIMENSIONS: i32 = 1408;

/// Kind of Atlas index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchIndexKind {
    Search,
    VectorSearch,
}

impl SearchIndexKind {
    /// Value of the `type` field in `createSearchIndexes`
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchIndexKind::Search => "search",
            SearchIndexKind::VectorSearch => "vectorSearch",
        }
    }
}

/// One index definition
#[derive(Debug, Clone, PartialEq)]
pub struct SearchIndexDefinition {
    pub name: &'static str,
    pub kind: SearchIndexKind,
    pub definition: Document,
}

impl SearchIndexDefinition {
    /// `db.books.createSearchIndex(...)` for mongosh
    pub fn to_shell_command(&self) -> String {
        let body = serde_json::to_string_pretty(&JsonConverter::convert_document(&self.definition))
            .unwrap_or_else(|_| self.definition.to_string());

        match self.kind {
            SearchIndexKind::Search => format!(
                "db.{INDEXED_COLLECTION}.createSearchIndex('{}', {});",
                self.name, body
            ),
            SearchIndexKind::VectorSearch => format!(
                "db.{INDEXED_COLLECTION}.createSearchIndex('{}', '{}', {});",
                self.name,
                self.kind.as_str(),
                body
            ),
        }
    }

    fn to_command_entry(&self) -> Document {
        doc! {
            "name": self.name,
            "type": self.kind.as_str(),
            "definition": self.definition.clone(),
        }
    }
}

/// The lab's index catalog
pub struct SearchIndexCatalog;

impl SearchIndexCatalog {
    /// All definitions, in creation order
    pub fn definitions() -> Vec<SearchIndexDefinition> {
        vec![
            // Used by most interactive exercises
            SearchIndexDefinition {
                name: "fulltextsearch_dynamic",
                kind: SearchIndexKind::Search,
                definition: doc! {
                    "mappings": { "dynamic": true }
                },
            },
            SearchIndexDefinition {
                name: "fulltextsearch",
                kind: SearchIndexKind::Search,
                definition: doc! {
                    "mappings": {
                        "dynamic": false,
                        "fields": {
                            "title": { "type": "string" },
                            "synopsis": { "type": "string" },
                            "genres": { "type": "string" },
                        }
                    }
                },
            },
            SearchIndexDefinition {
                name: "facetsIndexName",
                kind: SearchIndexKind::Search,
                definition: doc! {
                    "mappings": {
                        "dynamic": false,
                        "fields": {
                            "genres": [{ "type": "string" }, { "type": "stringFacet" }],
                            "year": { "type": "number" },
                        }
                    }
                },
            },
            SearchIndexDefinition {
                name: "vectorsearch",
                kind: SearchIndexKind::VectorSearch,
                definition: doc! {
                    "fields": [{
                        "type": "vector",
                        "path": "embeddings",
                        "numDimensions": EMBEDDING_DIMENSIONS,
                        "similarity": "cosine",
                    }]
                },
            },
        ]
    }

    /// Whole catalog as a mongosh script
    pub fn to_shell_script() -> String {
        let mut script = String::from(
            "// Atlas Search indexes for the search lab; run in mongosh against the lab database\n",
        );
        for (i, definition) in Self::definitions().iter().enumerate() {
            script.push_str(&format!(
                "\n// {}. {}\n{}\n",
                i + 1,
                definition.name,
                definition.to_shell_command()
            ));
        }
        script
    }

    /// Create every index with one `createSearchIndexes` command.
    ///
    /// Returns the names the server reports as created.
    pub async fn apply(db: &Database) -> Result<Vec<String>> {
        let indexes: Vec<Document> = Self::definitions()
            .iter()
            .map(SearchIndexDefinition::to_command_entry)
            .collect();

        info!(
            "Creating {} search index(es) on '{}.{}'",
            indexes.len(),
            db.name(),
            INDEXED_COLLECTION
        );

        let reply = db
            .run_command(doc! {
                "createSearchIndexes": INDEXED_COLLECTION,
                "indexes": indexes,
            })
            .await?;

        Self::created_names(&reply)
    }

    fn created_names(reply: &Document) -> Result<Vec<String>> {
        let created = reply.get_array("indexesCreated").map_err(|_| {
            ExecutionError::QueryFailed(format!(
                "unexpected createSearchIndexes reply: {reply}"
            ))
        })?;

        Ok(created
            .iter()
            .filter_map(|entry| match entry {
                Bson::Document(d) => d.get_str("name").ok().map(str::to_string),
                _ => None,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_names_and_kinds() {
        let defs = SearchIndexCatalog::definitions();
        let names: Vec<&str> = defs.iter().map(|d| d.name).collect();
        assert_eq!(
            names,
            vec![
                "fulltextsearch_dynamic",
                "fulltextsearch",
                "facetsIndexName",
                "vectorsearch"
            ]
        );
        assert_eq!(defs[3].kind, SearchIndexKind::VectorSearch);
        assert!(defs[..3].iter().all(|d| d.kind == SearchIndexKind::Search));
    }

    #[test]
    fn test_vector_definition() {
        let defs = SearchIndexCatalog::definitions();
        let field = defs[3].definition.get_array("fields").unwrap()[0]
            .as_document()
            .unwrap()
            .clone();
        assert_eq!(field.get_str("path").unwrap(), "embeddings");
        assert_eq!(field.get_i32("numDimensions").unwrap(), 1408);
        assert_eq!(field.get_str("similarity").unwrap(), "cosine");
    }

    #[test]
    fn test_facet_definition() {
        let defs = SearchIndexCatalog::definitions();
        let fields = defs[2]
            .definition
            .get_document("mappings")
            .unwrap()
            .get_document("fields")
            .unwrap();
        assert_eq!(fields.get_array("genres").unwrap().len(), 2);
        assert_eq!(
            fields.get_document("year").unwrap().get_str("type").unwrap(),
            "number"
        );
    }

    #[test]
    fn test_shell_script() {
        let script = SearchIndexCatalog::to_shell_script();
        assert!(script.contains("db.books.createSearchIndex('fulltextsearch_dynamic', {"));
        assert!(script.contains("db.books.createSearchIndex('vectorsearch', 'vectorSearch', {"));
        assert!(script.contains("\"numDimensions\": 1408"));
        assert_eq!(script.matches("createSearchIndex(").count(), 4);
    }

    #[test]
    fn test_created_names() {
        let reply = doc! {
            "ok": 1,
            "indexesCreated": [
                { "id": "a1", "name": "fulltextsearch" },
                { "id": "a2", "name": "vectorsearch" },
            ]
        };
        assert_eq!(
            SearchIndexCatalog::created_names(&reply).unwrap(),
            vec!["fulltextsearch", "vectorsearch"]
        );
        assert!(SearchIndexCatalog::created_names(&doc! { "ok": 1 }).is_err());
    }
}
