//! Dataverse Web API client
//!
//! A slim, metadata-only client: enough to resolve a solution's table set
//! and each table's lookup columns. Authentication is a pre-acquired
//! bearer token from the environment; there is no retry or rate limiting
//! here because a planning run makes a handful of requests at most.

pub mod models;

use std::collections::HashSet;

use anyhow::{Context, Result, anyhow, bail};
use serde::de::DeserializeOwned;

use self::models::{
    EntityDefinitionRecord, EntityWithRelationships, MetadataSnapshot, ODataCollection,
    SolutionComponentRecord, SolutionRecord, TableMetadata,
};

const API_PATH: &str = "api/data/v9.2";

/// Solution component type for tables in the `solutioncomponents` entity.
const COMPONENT_TYPE_ENTITY: u32 = 1;

pub struct DataverseClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl DataverseClient {
    /// Build a client from `DATAVERSE_URL` and `DATAVERSE_TOKEN`.
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("DATAVERSE_URL")
            .context("DATAVERSE_URL is not set (e.g. https://yourorg.crm.dynamics.com)")?;
        let token = std::env::var("DATAVERSE_TOKEN")
            .context("DATAVERSE_TOKEN is not set (a bearer token for the environment)")?;

        Ok(Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path_and_query: &str) -> Result<T> {
        let url = format!("{}/{}/{}", self.base_url, API_PATH, path_and_query);
        log::debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .header("OData-MaxVersion", "4.0")
            .header("OData-Version", "4.0")
            .header("Accept", "application/json")
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("request to {} returned {}: {}", url, status, body);
        }

        response
            .json::<T>()
            .await
            .with_context(|| format!("failed to decode response from {}", url))
    }

    /// Logical names of the tables contained in a solution, sorted.
    pub async fn solution_tables(&self, unique_name: &str) -> Result<Vec<String>> {
        let filter = urlencoding::encode(&format!("uniquename eq '{}'", unique_name)).into_owned();
        let solutions: ODataCollection<SolutionRecord> = self
            .get_json(&format!("solutions?$select=solutionid&$filter={}", filter))
            .await?;
        let solution = solutions
            .value
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("solution '{}' was not found", unique_name))?;

        let filter = urlencoding::encode(&format!(
            "_solutionid_value eq {} and componenttype eq {}",
            solution.solution_id, COMPONENT_TYPE_ENTITY
        ))
        .into_owned();
        let components: ODataCollection<SolutionComponentRecord> = self
            .get_json(&format!(
                "solutioncomponents?$select=objectid&$filter={}",
                filter
            ))
            .await?;
        if components.value.is_empty() {
            bail!("solution '{}' contains no tables", unique_name);
        }
        let wanted: HashSet<String> = components
            .value
            .into_iter()
            .map(|c| c.object_id.to_ascii_lowercase())
            .collect();

        // solutioncomponents only carries metadata ids, so map them back
        // through the entity definition list
        let definitions: ODataCollection<EntityDefinitionRecord> = self
            .get_json("EntityDefinitions?$select=LogicalName,MetadataId")
            .await?;
        let mut names: Vec<String> = definitions
            .value
            .into_iter()
            .filter(|d| wanted.contains(&d.metadata_id.to_ascii_lowercase()))
            .map(|d| d.logical_name)
            .collect();
        names.sort();
        Ok(names)
    }

    /// Lookup columns of one table, from its N:1 relationships.
    pub async fn table_lookups(&self, logical_name: &str) -> Result<TableMetadata> {
        let path = format!(
            "EntityDefinitions(LogicalName='{}')?$select=LogicalName\
             &$expand=ManyToOneRelationships($select=ReferencingEntity,ReferencedEntity,ReferencingAttribute)",
            urlencoding::encode(logical_name)
        );
        let entity: EntityWithRelationships = self.get_json(&path).await?;
        Ok(TableMetadata::from_relationships(entity))
    }

    /// Fetch the lookup topology of the whole working set concurrently.
    pub async fn snapshot(&self, tables: &[String]) -> Result<MetadataSnapshot> {
        let fetches = tables.iter().map(|t| self.table_lookups(t));
        let tables = futures::future::try_join_all(fetches).await?;
        Ok(MetadataSnapshot { tables })
    }
}
