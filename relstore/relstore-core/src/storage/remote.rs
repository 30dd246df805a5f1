//! RemoteStore - hosted libSQL over HTTP.
//!
//! TigerStyle: one logical statement per round trip, no hidden retries.
//!
//! Speaks the Hrana-over-HTTP v2 pipeline protocol: every statement is sent
//! as `POST {base}/v2/pipeline` carrying an `execute` request followed by a
//! `close`, authorised with a bearer token.
//!
//! ```text
//! → {"requests":[{"type":"execute","stmt":{"sql":..,"args":[..],"want_rows":true}},
//!                {"type":"close"}]}
//! ← {"results":[{"type":"ok","response":{"type":"execute","result":{cols,rows,..}}},
//!               {"type":"ok","response":{"type":"close"}}]}
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::backend::{BackendKind, ReleaseStore};
use super::error::{StorageError, StorageResult};
use super::row::{encode_additional_data, ReleaseRow};
use super::schema::{self, MigrationReport, SchemaTarget, SELECT_COLUMNS};
use crate::clock::{Clock, SystemClock};
use crate::constants::{RELEASES_TABLE, REMOTE_PIPELINE_PATH, REMOTE_TIMEOUT_MS};
use crate::release::{NewRelease, Release, ReleaseFields, ReleaseId, ReleasePatch, ReleaseStatus};

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Serialize)]
struct PipelineRequest<'a> {
    requests: Vec<StreamRequest<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum StreamRequest<'a> {
    Execute { stmt: Stmt<'a> },
    Close,
}

#[derive(Debug, Serialize)]
struct Stmt<'a> {
    sql: &'a str,
    args: Vec<Value>,
    want_rows: bool,
}

/// A single SQL value as Hrana encodes it. Integers travel as strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Value {
    Null,
    Integer { value: String },
    Float { value: f64 },
    Text { value: String },
    Blob { base64: String },
}

impl Value {
    fn text(s: impl Into<String>) -> Self {
        Self::Text { value: s.into() }
    }

    fn integer(i: i64) -> Self {
        Self::Integer {
            value: i.to_string(),
        }
    }

    fn optional_text(s: Option<String>) -> Self {
        s.map_or(Self::Null, |v| Self::text(v))
    }
}

#[derive(Debug, Deserialize)]
struct PipelineResponse {
    results: Vec<StreamResult>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum StreamResult {
    Ok { response: StreamResponse },
    Error { error: RemoteFailure },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum StreamResponse {
    Execute { result: StmtResult },
    Close,
}

#[derive(Debug, Default, Deserialize)]
struct StmtResult {
    #[serde(default)]
    cols: Vec<Col>,
    #[serde(default)]
    rows: Vec<Vec<Value>>,
    #[serde(default)]
    affected_row_count: u64,
    #[serde(default)]
    last_insert_rowid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Col {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RemoteFailure {
    message: String,
    #[serde(default)]
    code: Option<String>,
}

impl StmtResult {
    /// Rows as column-name lookups.
    fn named_rows(&self) -> Vec<HashMap<&str, &Value>> {
        let names: Vec<&str> = self
            .cols
            .iter()
            .map(|c| c.name.as_deref().unwrap_or_default())
            .collect();
        self.rows
            .iter()
            .map(|row| names.iter().copied().zip(row.iter()).collect())
            .collect()
    }
}

fn value_as_text(value: Option<&&Value>, column: &str) -> StorageResult<Option<String>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Text { value }) | Some(Value::Integer { value }) => Ok(Some(value.clone())),
        Some(Value::Float { value }) => Ok(Some(value.to_string())),
        Some(Value::Blob { .. }) => Err(StorageError::corrupt(format!(
            "column {column}: unexpected blob"
        ))),
    }
}

fn named_row_to_release(row: &HashMap<&str, &Value>) -> StorageResult<Release> {
    let text = |column: &str| value_as_text(row.get(column), column);

    let id = text("id")?
        .and_then(|raw| raw.parse::<i64>().ok())
        .ok_or_else(|| StorageError::corrupt("row without integer id"))?;

    ReleaseRow {
        id,
        organization: text("organization")?,
        app_name: text("appName")?,
        platform: text("platform")?,
        version: text("version")?,
        branch: text("branch")?,
        status: text("status")?,
        tag: text("tag")?,
        upload_date: text("uploadDate")?,
        force_update: text("forceUpdate")?,
        additional_data: text("additionalData")?,
    }
    .into_release()
}

/// Pipeline endpoint for a database URL. `libsql://` becomes `https://`.
#[must_use]
pub fn pipeline_url(database_url: &str) -> String {
    let trimmed = database_url.trim().trim_end_matches('/');
    let base = match trimmed.strip_prefix("libsql://") {
        Some(rest) => format!("https://{rest}"),
        None => trimmed.to_string(),
    };
    format!("{base}/{REMOTE_PIPELINE_PATH}")
}

// =============================================================================
// RemoteStore
// =============================================================================

/// Remote libSQL storage backend for production use.
pub struct RemoteStore {
    client: reqwest::Client,
    pipeline_url: String,
    auth_token: String,
    clock: Arc<dyn Clock>,
    migration: MigrationReport,
}

impl std::fmt::Debug for RemoteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteStore")
            .field("pipeline_url", &self.pipeline_url)
            .field("auth_token", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl RemoteStore {
    /// Connect and migrate the remote table.
    ///
    /// # Errors
    /// Returns error if the client cannot be built or the migration fails.
    pub async fn connect(database_url: &str, auth_token: &str) -> StorageResult<Self> {
        Self::connect_with_clock(database_url, auth_token, Arc::new(SystemClock)).await
    }

    /// Connect using the given clock for default upload dates.
    pub async fn connect_with_clock(
        database_url: &str,
        auth_token: &str,
        clock: Arc<dyn Clock>,
    ) -> StorageResult<Self> {
        // Preconditions
        assert!(!database_url.trim().is_empty(), "database url cannot be empty");

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(REMOTE_TIMEOUT_MS))
            .build()
            .map_err(|e| StorageError::connection(format!("failed to build http client: {e}")))?;

        let mut store = Self {
            client,
            pipeline_url: pipeline_url(database_url),
            auth_token: auth_token.to_string(),
            clock,
            migration: MigrationReport::default(),
        };
        store.migration = schema::migrate(&store).await?;

        tracing::debug!(url = %store.pipeline_url, "Connected to remote database");
        Ok(store)
    }

    /// What the migration changed when this store connected.
    #[must_use]
    pub fn migration_report(&self) -> &MigrationReport {
        &self.migration
    }

    /// Run one statement in its own pipeline request.
    async fn execute(&self, sql: &str, args: Vec<Value>) -> StorageResult<StmtResult> {
        let body = PipelineRequest {
            requests: vec![
                StreamRequest::Execute {
                    stmt: Stmt {
                        sql,
                        args,
                        want_rows: true,
                    },
                },
                StreamRequest::Close,
            ],
        };

        let response = self
            .client
            .post(&self.pipeline_url)
            .bearer_auth(&self.auth_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| StorageError::connection(format!("pipeline request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(StorageError::remote(format!("HTTP {status}: {detail}")));
        }

        let parsed: PipelineResponse = response
            .json()
            .await
            .map_err(|e| StorageError::remote(format!("malformed pipeline response: {e}")))?;

        match parsed.results.into_iter().next() {
            Some(StreamResult::Ok {
                response: StreamResponse::Execute { result },
            }) => Ok(result),
            Some(StreamResult::Ok { .. }) => {
                Err(StorageError::remote("unexpected response to execute"))
            }
            Some(StreamResult::Error { error }) => Err(StorageError::remote(match error.code {
                Some(code) => format!("{} ({code})", error.message),
                None => error.message,
            })),
            None => Err(StorageError::remote("empty pipeline response")),
        }
    }

    fn field_args(fields: &ReleaseFields) -> StorageResult<Vec<Value>> {
        Ok(vec![
            Value::text(fields.organization.as_str()),
            Value::text(fields.app_name.as_str()),
            Value::text(fields.platform.as_str()),
            Value::text(fields.version.as_str()),
            Value::text(fields.branch.as_str()),
            Value::text(fields.status.as_str()),
            Value::text(fields.tag.as_str()),
            Value::text(fields.upload_date.as_str()),
            Value::text(fields.force_update.as_str()),
            Value::optional_text(encode_additional_data(fields.additional_data.as_ref())?),
        ])
    }
}

#[async_trait]
impl SchemaTarget for RemoteStore {
    async fn execute_sql(&self, sql: &str) -> StorageResult<u64> {
        Ok(self.execute(sql, Vec::new()).await?.affected_row_count)
    }

    async fn column_names(&self) -> StorageResult<Vec<String>> {
        let result = self
            .execute(
                &format!("SELECT name FROM pragma_table_info('{RELEASES_TABLE}')"),
                Vec::new(),
            )
            .await?;

        result
            .rows
            .iter()
            .map(|row| {
                value_as_text(row.first().as_ref(), "name")?
                    .ok_or_else(|| StorageError::schema("table info row without name"))
            })
            .collect()
    }
}

// =============================================================================
// ReleaseStore Implementation
// =============================================================================

#[async_trait]
impl ReleaseStore for RemoteStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Remote
    }

    async fn get_all_releases(&self) -> StorageResult<Vec<Release>> {
        let result = self
            .execute(
                &format!("SELECT {SELECT_COLUMNS} FROM releases ORDER BY uploadDate DESC, id DESC"),
                Vec::new(),
            )
            .await?;

        result.named_rows().iter().map(named_row_to_release).collect()
    }

    async fn get_release_by_id(&self, id: ReleaseId) -> StorageResult<Option<Release>> {
        let result = self
            .execute(
                &format!("SELECT {SELECT_COLUMNS} FROM releases WHERE id = ?"),
                vec![Value::integer(id)],
            )
            .await?;

        result
            .named_rows()
            .first()
            .map(named_row_to_release)
            .transpose()
    }

    async fn create_release(&self, release: NewRelease) -> StorageResult<Release> {
        let fields = release.resolve(self.clock.as_ref());

        let result = self
            .execute(
                "INSERT INTO releases (organization, appName, platform, version, branch, status, \
                 tag, uploadDate, forceUpdate, additionalData) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                Self::field_args(&fields)?,
            )
            .await?;

        let id = result
            .last_insert_rowid
            .as_deref()
            .and_then(|raw| raw.parse::<i64>().ok())
            .ok_or_else(|| StorageError::remote("insert did not report a row id"))?;

        self.get_release_by_id(id)
            .await?
            .ok_or_else(|| StorageError::write(format!("release {id} missing after insert")))
    }

    async fn update_release(
        &self,
        id: ReleaseId,
        patch: ReleasePatch,
    ) -> StorageResult<Option<Release>> {
        let Some(mut release) = self.get_release_by_id(id).await? else {
            return Ok(None);
        };
        patch.apply(&mut release);

        let mut args = Self::field_args(&ReleaseFields::from(release))?;
        args.push(Value::integer(id));

        let result = self
            .execute(
                "UPDATE releases SET organization = ?, appName = ?, platform = ?, version = ?, \
                 branch = ?, status = ?, tag = ?, uploadDate = ?, forceUpdate = ?, \
                 additionalData = ? WHERE id = ?",
                args,
            )
            .await?;

        if result.affected_row_count == 0 {
            return Ok(None);
        }
        self.get_release_by_id(id).await
    }

    async fn delete_release(&self, id: ReleaseId) -> StorageResult<bool> {
        let result = self
            .execute("DELETE FROM releases WHERE id = ?", vec![Value::integer(id)])
            .await?;
        Ok(result.affected_row_count > 0)
    }

    /// One round trip per distinct id. Not atomic: a failure part-way leaves
    /// earlier ids updated and surfaces the error.
    async fn update_multiple_release_status(
        &self,
        ids: &[ReleaseId],
        status: ReleaseStatus,
    ) -> StorageResult<u64> {
        let mut seen = Vec::with_capacity(ids.len());
        let mut updated = 0u64;

        for id in ids {
            if seen.contains(id) {
                continue;
            }
            seen.push(*id);

            let result = self
                .execute(
                    "UPDATE releases SET status = ? WHERE id = ?",
                    vec![Value::text(status.as_str()), Value::integer(*id)],
                )
                .await?;
            if result.affected_row_count > 0 {
                updated += 1;
            }
        }

        // Postcondition
        assert!(updated as usize <= seen.len(), "cannot update more than requested");
        Ok(updated)
    }

    async fn count_releases(&self) -> StorageResult<u64> {
        let result = self
            .execute("SELECT COUNT(*) AS total FROM releases", Vec::new())
            .await?;

        let total = result
            .rows
            .first()
            .and_then(|row| row.first())
            .and_then(|v| match v {
                Value::Integer { value } => value.parse::<u64>().ok(),
                _ => None,
            })
            .ok_or_else(|| StorageError::remote("count returned no integer"))?;
        Ok(total)
    }
}
