//! Dataverse metadata models
//!
//! Serde models for the Web API responses we consume, plus the offline
//! snapshot format accepted by `--input`.

use serde::{Deserialize, Serialize};

/// Generic OData collection envelope.
#[derive(Debug, Deserialize)]
pub struct ODataCollection<T> {
    pub value: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub struct SolutionRecord {
    #[serde(rename = "solutionid")]
    pub solution_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SolutionComponentRecord {
    #[serde(rename = "objectid")]
    pub object_id: String,
}

#[derive(Debug, Deserialize)]
pub struct EntityDefinitionRecord {
    #[serde(rename = "MetadataId")]
    pub metadata_id: String,
    #[serde(rename = "LogicalName")]
    pub logical_name: String,
}

/// `EntityDefinitions(LogicalName='…')` expanded with its N:1 relationships.
#[derive(Debug, Deserialize)]
pub struct EntityWithRelationships {
    #[serde(rename = "LogicalName")]
    pub logical_name: String,
    #[serde(rename = "ManyToOneRelationships", default)]
    pub many_to_one: Vec<ManyToOneRelationship>,
}

#[derive(Debug, Deserialize)]
pub struct ManyToOneRelationship {
    #[serde(rename = "ReferencingEntity")]
    pub referencing_entity: String,
    #[serde(rename = "ReferencedEntity")]
    pub referenced_entity: String,
    #[serde(rename = "ReferencingAttribute")]
    pub referencing_attribute: String,
}

/// Snapshot of the lookup topology for a working set of tables. This is
/// what the graph builder consumes, whether it came from the Web API or
/// from a JSON file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataSnapshot {
    pub tables: Vec<TableMetadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableMetadata {
    pub logical_name: String,
    #[serde(default)]
    pub lookups: Vec<LookupColumn>,
}

/// A lookup (foreign-key) column and the table it points at.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupColumn {
    pub logical_name: String,
    pub target_table: String,
}

impl TableMetadata {
    /// Flatten an expanded entity definition into the snapshot shape.
    /// Relationships where this table is not the referencing side are
    /// ignored (the expand can include inherited entries).
    pub fn from_relationships(entity: EntityWithRelationships) -> Self {
        let logical_name = entity.logical_name;
        let lookups = entity
            .many_to_one
            .into_iter()
            .filter(|rel| {
                rel.referencing_entity.eq_ignore_ascii_case(&logical_name)
                    && !rel.referencing_attribute.is_empty()
                    && !rel.referenced_entity.is_empty()
            })
            .map(|rel| LookupColumn {
                logical_name: rel.referencing_attribute,
                target_table: rel.referenced_entity,
            })
            .collect();
        Self {
            logical_name,
            lookups,
        }
    }
}
