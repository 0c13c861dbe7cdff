use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, IF_MATCH};
use reqwest::{Client, Method, StatusCode, Url};
use serde::Deserialize;

use crate::codec::{TableEntity, PARTITION_KEY, ROW_KEY};
use crate::filter::TableFilter;

const API_VERSION: &str = "2019-02-02";
const NEXT_PARTITION_KEY: &str = "x-ms-continuation-NextPartitionKey";
const NEXT_ROW_KEY: &str = "x-ms-continuation-NextRowKey";

/// Errors returned by a [`TableClient`].
#[derive(Debug)]
pub enum TableError {
    /// 404 from the service.
    NotFound,
    /// 409 from the service.
    Conflict,
    /// Any other unsuccessful status.
    Status { status: u16, message: String },
    /// Transport or decoding failure.
    Http(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for TableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableError::NotFound => write!(f, "Table entity not found"),
            TableError::Conflict => write!(f, "Table entity already exists"),
            TableError::Status { status, message } => {
                write!(f, "Table service returned {status}: {message}")
            }
            TableError::Http(err) => write!(f, "Table service request failed: {err}"),
        }
    }
}

impl std::error::Error for TableError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TableError::Http(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for TableError {
    fn from(err: reqwest::Error) -> Self {
        TableError::Http(Box::new(err))
    }
}

/// Minimal entity operations against a partitioned table service.
#[async_trait]
pub trait TableClient: Send + Sync + 'static {
    async fn get_entity(&self, table: &str, partition_key: &str, row_key: &str)
        -> Result<Option<TableEntity>, TableError>;

    /// Fails with [`TableError::Conflict`] if the keys are taken.
    async fn insert_entity(&self, table: &str, entity: TableEntity) -> Result<(), TableError>;

    /// Unconditional replace. Fails with [`TableError::NotFound`] if absent.
    async fn update_entity(&self, table: &str, entity: TableEntity) -> Result<(), TableError>;

    async fn delete_entity(&self, table: &str, partition_key: &str, row_key: &str) -> Result<(), TableError>;

    /// Every entity matching `filter`, following continuation tokens.
    async fn query_entities(&self, table: &str, filter: &TableFilter) -> Result<Vec<TableEntity>, TableError>;
}

fn key_of(entity: &TableEntity, key: &str) -> String {
    entity
        .get(key)
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default()
        .to_string()
}

// ── HTTP ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    value: Vec<TableEntity>,
}

/// Azure Table Storage REST client authenticated with a SAS token.
#[derive(Clone)]
pub struct HttpTableClient {
    client: Client,
    endpoint: Url,
    sas: String,
}

impl fmt::Debug for HttpTableClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTableClient")
            .field("endpoint", &self.endpoint.as_str())
            .finish()
    }
}

impl HttpTableClient {
    /// `endpoint` is the service base URL (`https://{account}.table.core.windows.net`);
    /// `sas` is the token with or without its leading `?`.
    pub fn new(endpoint: &str, sas: &str) -> Result<Self, TableError> {
        let endpoint = Url::parse(endpoint.trim_end_matches('/'))
            .map_err(|e| TableError::Http(Box::new(e)))?;

        let mut headers = HeaderMap::new();
        headers.insert("x-ms-version", HeaderValue::from_static(API_VERSION));
        headers.insert("dataserviceversion", HeaderValue::from_static("3.0;NetFx"));
        headers.insert("maxdataserviceversion", HeaderValue::from_static("3.0;NetFx"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json;odata=minimalmetadata"));
        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            endpoint,
            sas: sas.trim_start_matches('?').to_string(),
        })
    }

    fn url(&self, resource: &str) -> Result<Url, TableError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| TableError::Status {
                status: 0,
                message: format!("endpoint '{}' cannot carry a path", self.endpoint),
            })?
            .pop_if_empty()
            .push(resource);
        if !self.sas.is_empty() {
            url.set_query(Some(&self.sas));
        }
        Ok(url)
    }

    fn entity_url(&self, table: &str, partition_key: &str, row_key: &str) -> Result<Url, TableError> {
        self.url(&format!(
            "{table}(PartitionKey='{}',RowKey='{}')",
            partition_key.replace('\'', "''"),
            row_key.replace('\'', "''")
        ))
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, TableError> {
        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::NOT_FOUND => Err(TableError::NotFound),
            StatusCode::CONFLICT => Err(TableError::Conflict),
            status => {
                let message = response.text().await.unwrap_or_default();
                Err(TableError::Status {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }

    async fn send_entity(&self, method: Method, url: Url, entity: &TableEntity) -> Result<(), TableError> {
        let mut request = self
            .client
            .request(method.clone(), url)
            .header(CONTENT_TYPE, "application/json")
            .json(entity);
        if method == Method::POST {
            request = request.header("Prefer", "return-no-content");
        } else {
            request = request.header(IF_MATCH, "*");
        }
        Self::check(request.send().await?).await?;
        Ok(())
    }
}

#[async_trait]
impl TableClient for HttpTableClient {
    async fn get_entity(
        &self,
        table: &str,
        partition_key: &str,
        row_key: &str,
    ) -> Result<Option<TableEntity>, TableError> {
        let url = self.entity_url(table, partition_key, row_key)?;
        match Self::check(self.client.get(url).send().await?).await {
            Ok(response) => Ok(Some(response.json().await?)),
            Err(TableError::NotFound) => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn insert_entity(&self, table: &str, entity: TableEntity) -> Result<(), TableError> {
        let url = self.url(table)?;
        self.send_entity(Method::POST, url, &entity).await
    }

    async fn update_entity(&self, table: &str, entity: TableEntity) -> Result<(), TableError> {
        let url = self.entity_url(table, &key_of(&entity, PARTITION_KEY), &key_of(&entity, ROW_KEY))?;
        self.send_entity(Method::PUT, url, &entity).await
    }

    async fn delete_entity(&self, table: &str, partition_key: &str, row_key: &str) -> Result<(), TableError> {
        let url = self.entity_url(table, partition_key, row_key)?;
        let request = self.client.delete(url).header(IF_MATCH, "*");
        Self::check(request.send().await?).await?;
        Ok(())
    }

    async fn query_entities(&self, table: &str, filter: &TableFilter) -> Result<Vec<TableEntity>, TableError> {
        let rendered = filter.render();
        let mut entities = Vec::new();
        let mut continuation: Option<(String, String)> = None;

        loop {
            let mut url = self.url(&format!("{table}()"))?;
            {
                let mut pairs = url.query_pairs_mut();
                if let Some(expr) = &rendered {
                    pairs.append_pair("$filter", expr);
                }
                if let Some((partition, row)) = &continuation {
                    pairs.append_pair("NextPartitionKey", partition);
                    if !row.is_empty() {
                        pairs.append_pair("NextRowKey", row);
                    }
                }
            }

            let response = Self::check(self.client.get(url).send().await?).await?;
            let header = |name: &str| {
                response
                    .headers()
                    .get(name)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string)
            };
            let next = header(NEXT_PARTITION_KEY).map(|pk| (pk, header(NEXT_ROW_KEY).unwrap_or_default()));

            let page: QueryResponse = response.json().await?;
            entities.extend(page.value);

            match next {
                Some(token) => continuation = Some(token),
                None => break,
            }
        }
        Ok(entities)
    }
}

// ── In-process ──────────────────────────────────────────────────────────────

/// In-process table service with the same keyed semantics, for tests.
#[derive(Clone, Default)]
pub struct MemoryTableClient {
    tables: Arc<DashMap<String, BTreeMap<(String, String), TableEntity>>>,
}

impl MemoryTableClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw stored entities of one table, in key order.
    pub fn entities(&self, table: &str) -> Vec<TableEntity> {
        self.tables
            .get(table)
            .map(|t| t.values().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TableClient for MemoryTableClient {
    async fn get_entity(
        &self,
        table: &str,
        partition_key: &str,
        row_key: &str,
    ) -> Result<Option<TableEntity>, TableError> {
        Ok(self
            .tables
            .get(table)
            .and_then(|t| t.get(&(partition_key.to_string(), row_key.to_string())).cloned()))
    }

    async fn insert_entity(&self, table: &str, entity: TableEntity) -> Result<(), TableError> {
        let key = (key_of(&entity, PARTITION_KEY), key_of(&entity, ROW_KEY));
        let mut rows = self.tables.entry(table.to_string()).or_default();
        if rows.contains_key(&key) {
            return Err(TableError::Conflict);
        }
        rows.insert(key, entity);
        Ok(())
    }

    async fn update_entity(&self, table: &str, entity: TableEntity) -> Result<(), TableError> {
        let key = (key_of(&entity, PARTITION_KEY), key_of(&entity, ROW_KEY));
        let mut rows = self.tables.get_mut(table).ok_or(TableError::NotFound)?;
        match rows.get_mut(&key) {
            Some(existing) => {
                *existing = entity;
                Ok(())
            }
            None => Err(TableError::NotFound),
        }
    }

    async fn delete_entity(&self, table: &str, partition_key: &str, row_key: &str) -> Result<(), TableError> {
        self.tables
            .get_mut(table)
            .and_then(|mut rows| rows.remove(&(partition_key.to_string(), row_key.to_string())))
            .map(|_| ())
            .ok_or(TableError::NotFound)
    }

    async fn query_entities(&self, table: &str, filter: &TableFilter) -> Result<Vec<TableEntity>, TableError> {
        Ok(self
            .tables
            .get(table)
            .map(|rows| rows.values().filter(|e| filter.matches(e)).cloned().collect())
            .unwrap_or_default())
    }
}
