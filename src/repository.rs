use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::{PgPool, Postgres, query_builder::QueryBuilder, types::Json};
use std::{
    cmp::Ordering,
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering as AtomicOrdering},
    },
};
use thiserror::Error;
use tokio::sync::RwLock;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

/// A stored document: a JSON object whose `_id` field is assigned by the store.
pub type Document = Map<String, Value>;

/// Name of the identifier field on every stored document.
pub const ID_FIELD: &str = "_id";

/// Collection
///
/// The four collections the API reads and writes. The wire names are kept stable because
/// they double as the partition key in the Postgres adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    DonationRequests,
    Blogs,
    Funds,
}

impl Collection {
    pub fn name(self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::DonationRequests => "donationRequests",
            Collection::Blogs => "blogCollections",
            Collection::Funds => "funds",
        }
    }
}

/// Builds a document (or an equality filter) from a `json!` object literal.
/// Non-object values yield an empty document.
pub fn document(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Generates a fresh 24-character hex identifier.
pub fn new_document_id() -> String {
    Uuid::new_v4().simple().to_string()[..24].to_string()
}

/// True when `candidate` has the shape of a store-assigned identifier.
pub fn is_document_id(candidate: &str) -> bool {
    candidate.len() == 24 && candidate.chars().all(|c| c.is_ascii_hexdigit())
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortBy {
    pub field: String,
    pub descending: bool,
}

/// FindOptions
///
/// Sort, skip and limit for `find_many`. The default is insertion order, no paging.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub sort: Option<SortBy>,
    pub skip: u64,
    pub limit: Option<u64>,
}

impl FindOptions {
    pub fn sorted_desc(field: &str) -> Self {
        Self {
            sort: Some(SortBy {
                field: field.to_string(),
                descending: true,
            }),
            ..Self::default()
        }
    }

    pub fn paged(mut self, skip: u64, limit: u64) -> Self {
        self.skip = skip;
        self.limit = Some(limit);
        self
    }
}

// --- Operation Results (wire shape mirrors the document-store driver) ---

#[derive(Debug, Clone, PartialEq, Serialize, TS, ToSchema)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InsertOneResult {
    pub acknowledged: bool,
    pub inserted_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS, ToSchema)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    pub acknowledged: bool,
    pub matched_count: u64,
    pub modified_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS, ToSchema)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    pub acknowledged: bool,
    pub deleted_count: u64,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("malformed document: {0}")]
    Malformed(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Repository Trait
///
/// The document-store contract the handlers and the role resolver depend on. Filters are
/// equality matches on top-level fields (`_id` included); `update_one` merges the given
/// fields into the first matching document, like a `$set`.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn find_one(
        &self,
        collection: Collection,
        filter: Document,
    ) -> StoreResult<Option<Document>>;

    async fn find_many(
        &self,
        collection: Collection,
        filter: Document,
        options: FindOptions,
    ) -> StoreResult<Vec<Document>>;

    /// Fast, possibly approximate, collection size.
    async fn estimated_count(&self, collection: Collection) -> StoreResult<u64>;

    /// Exact number of documents matching `filter`.
    async fn count(&self, collection: Collection, filter: Document) -> StoreResult<u64>;

    /// Sum of a numeric field across the collection. Non-numeric values are skipped and an
    /// empty collection sums to zero.
    async fn sum(&self, collection: Collection, field: &str) -> StoreResult<f64>;

    async fn insert_one(&self, collection: Collection, doc: Document) -> StoreResult<InsertOneResult>;

    async fn update_one(
        &self,
        collection: Collection,
        filter: Document,
        set: Document,
    ) -> StoreResult<UpdateResult>;

    async fn delete_one(&self, collection: Collection, filter: Document) -> StoreResult<DeleteResult>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer access across the application state.
pub type RepositoryState = Arc<dyn Repository>;

// --- Postgres adapter ---

/// PostgresRepository
///
/// Stores every collection in a single JSONB table, partitioned by the `collection` column.
/// Equality filters become a `body @> $filter` containment check.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the documents table and its indexes if they are missing. Safe to call at startup.
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                collection TEXT NOT NULL,
                body JSONB NOT NULL,
                inserted_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS documents_collection_idx ON documents (collection)")
            .execute(&self.pool)
            .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS documents_body_idx ON documents USING GIN (body jsonb_path_ops)",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, collection: Collection, mut filter: Document) {
    builder.push(" WHERE collection = ");
    builder.push_bind(collection.name());
    if let Some(id) = filter.remove(ID_FIELD) {
        builder.push(" AND id = ");
        builder.push_bind(id.as_str().unwrap_or_default().to_string());
    }
    if !filter.is_empty() {
        builder.push(" AND body @> ");
        builder.push_bind(Json(Value::Object(filter)));
    }
}

fn from_row((id, Json(body)): (String, Json<Value>)) -> StoreResult<Document> {
    match body {
        Value::Object(mut doc) => {
            doc.insert(ID_FIELD.to_string(), Value::String(id));
            Ok(doc)
        }
        other => Err(StoreError::Malformed(format!(
            "document {id} is not an object: {other}"
        ))),
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn find_one(
        &self,
        collection: Collection,
        filter: Document,
    ) -> StoreResult<Option<Document>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT id, body FROM documents");
        push_filter(&mut builder, collection, filter);
        builder.push(" ORDER BY inserted_at LIMIT 1");

        builder
            .build_query_as::<(String, Json<Value>)>()
            .fetch_optional(&self.pool)
            .await?
            .map(from_row)
            .transpose()
    }

    async fn find_many(
        &self,
        collection: Collection,
        filter: Document,
        options: FindOptions,
    ) -> StoreResult<Vec<Document>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT id, body FROM documents");
        push_filter(&mut builder, collection, filter);

        match options.sort {
            Some(sort) => {
                // `->` keeps the jsonb type so numbers order numerically.
                builder.push(" ORDER BY body -> ");
                builder.push_bind(sort.field);
                builder.push(if sort.descending { " DESC" } else { " ASC" });
                builder.push(", inserted_at");
            }
            None => {
                builder.push(" ORDER BY inserted_at");
            }
        }
        if let Some(limit) = options.limit {
            builder.push(" LIMIT ");
            builder.push_bind(limit as i64);
        }
        if options.skip > 0 {
            builder.push(" OFFSET ");
            builder.push_bind(options.skip as i64);
        }

        builder
            .build_query_as::<(String, Json<Value>)>()
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(from_row)
            .collect()
    }

    async fn estimated_count(&self, collection: Collection) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE collection = $1")
            .bind(collection.name())
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn count(&self, collection: Collection, filter: Document) -> StoreResult<u64> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM documents");
        push_filter(&mut builder, collection, filter);
        let count = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn sum(&self, collection: Collection, field: &str) -> StoreResult<f64> {
        let total: f64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(
                CASE WHEN jsonb_typeof(body -> $2) = 'number' THEN (body ->> $2)::float8 END
            ), 0)::float8
            FROM documents
            WHERE collection = $1
            "#,
        )
        .bind(collection.name())
        .bind(field)
        .fetch_one(&self.pool)
        .await?;
        Ok(total)
    }

    async fn insert_one(
        &self,
        collection: Collection,
        mut doc: Document,
    ) -> StoreResult<InsertOneResult> {
        doc.remove(ID_FIELD);
        let id = new_document_id();
        sqlx::query("INSERT INTO documents (id, collection, body) VALUES ($1, $2, $3)")
            .bind(&id)
            .bind(collection.name())
            .bind(Json(Value::Object(doc)))
            .execute(&self.pool)
            .await?;
        Ok(InsertOneResult {
            acknowledged: true,
            inserted_id: id,
        })
    }

    async fn update_one(
        &self,
        collection: Collection,
        filter: Document,
        mut set: Document,
    ) -> StoreResult<UpdateResult> {
        set.remove(ID_FIELD);
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("WITH target AS (SELECT id, body FROM documents");
        push_filter(&mut builder, collection, filter);
        builder.push(" ORDER BY inserted_at LIMIT 1 FOR UPDATE), updated AS (UPDATE documents d SET body = d.body || ");
        builder.push_bind(Json(Value::Object(set)));
        builder.push(
            " FROM target WHERE d.id = target.id RETURNING target.body <> d.body AS changed) SELECT changed FROM updated",
        );

        let changed = builder
            .build_query_scalar::<bool>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(UpdateResult {
            acknowledged: true,
            matched_count: u64::from(changed.is_some()),
            modified_count: u64::from(changed.unwrap_or(false)),
        })
    }

    async fn delete_one(&self, collection: Collection, filter: Document) -> StoreResult<DeleteResult> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("DELETE FROM documents WHERE id IN (SELECT id FROM documents");
        push_filter(&mut builder, collection, filter);
        builder.push(" ORDER BY inserted_at LIMIT 1)");

        let result = builder.build().execute(&self.pool).await?;
        Ok(DeleteResult {
            acknowledged: true,
            deleted_count: result.rows_affected(),
        })
    }
}

// --- In-memory adapter (tests and local experiments) ---

/// MemoryRepository
///
/// A process-local `Repository` used by the test-suite. It also counts every call so tests
/// can assert that a rejected request never reached the store.
#[derive(Default)]
pub struct MemoryRepository {
    collections: RwLock<HashMap<Collection, Vec<Document>>>,
    operations: AtomicUsize,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of store operations performed so far.
    pub fn operation_count(&self) -> usize {
        self.operations.load(AtomicOrdering::SeqCst)
    }

    fn record(&self) {
        self.operations.fetch_add(1, AtomicOrdering::SeqCst);
    }
}

fn matches(doc: &Document, filter: &Document) -> bool {
    filter.iter().all(|(key, expected)| doc.get(key) == Some(expected))
}

fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Number(_)) => 1,
        Some(Value::String(_)) => 2,
        Some(Value::Bool(_)) => 3,
        Some(_) => 4,
    }
}

fn compare_field(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn find_one(
        &self,
        collection: Collection,
        filter: Document,
    ) -> StoreResult<Option<Document>> {
        self.record();
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .and_then(|docs| docs.iter().find(|doc| matches(doc, &filter)))
            .cloned())
    }

    async fn find_many(
        &self,
        collection: Collection,
        filter: Document,
        options: FindOptions,
    ) -> StoreResult<Vec<Document>> {
        self.record();
        let collections = self.collections.read().await;
        let mut found: Vec<Document> = collections
            .get(&collection)
            .map(|docs| docs.iter().filter(|doc| matches(doc, &filter)).cloned().collect())
            .unwrap_or_default();

        if let Some(sort) = &options.sort {
            // Stable sort keeps insertion order among equal keys.
            found.sort_by(|a, b| {
                let ordering = compare_field(a.get(&sort.field), b.get(&sort.field));
                if sort.descending { ordering.reverse() } else { ordering }
            });
        }

        let limit = options.limit.map_or(usize::MAX, |l| l as usize);
        Ok(found
            .into_iter()
            .skip(options.skip as usize)
            .take(limit)
            .collect())
    }

    async fn estimated_count(&self, collection: Collection) -> StoreResult<u64> {
        self.record();
        let collections = self.collections.read().await;
        Ok(collections.get(&collection).map_or(0, |docs| docs.len() as u64))
    }

    async fn count(&self, collection: Collection, filter: Document) -> StoreResult<u64> {
        self.record();
        let collections = self.collections.read().await;
        Ok(collections.get(&collection).map_or(0, |docs| {
            docs.iter().filter(|doc| matches(doc, &filter)).count() as u64
        }))
    }

    async fn sum(&self, collection: Collection, field: &str) -> StoreResult<f64> {
        self.record();
        let collections = self.collections.read().await;
        Ok(collections.get(&collection).map_or(0.0, |docs| {
            docs.iter()
                .filter_map(|doc| doc.get(field).and_then(Value::as_f64))
                .sum()
        }))
    }

    async fn insert_one(
        &self,
        collection: Collection,
        mut doc: Document,
    ) -> StoreResult<InsertOneResult> {
        self.record();
        let id = new_document_id();
        doc.insert(ID_FIELD.to_string(), Value::String(id.clone()));
        self.collections
            .write()
            .await
            .entry(collection)
            .or_default()
            .push(doc);
        Ok(InsertOneResult {
            acknowledged: true,
            inserted_id: id,
        })
    }

    async fn update_one(
        &self,
        collection: Collection,
        filter: Document,
        mut set: Document,
    ) -> StoreResult<UpdateResult> {
        self.record();
        set.remove(ID_FIELD);
        let mut collections = self.collections.write().await;
        let Some(doc) = collections
            .get_mut(&collection)
            .and_then(|docs| docs.iter_mut().find(|doc| matches(doc, &filter)))
        else {
            return Ok(UpdateResult {
                acknowledged: true,
                matched_count: 0,
                modified_count: 0,
            });
        };

        let mut modified = false;
        for (key, value) in set {
            if doc.get(&key) != Some(&value) {
                modified = true;
                doc.insert(key, value);
            }
        }
        Ok(UpdateResult {
            acknowledged: true,
            matched_count: 1,
            modified_count: u64::from(modified),
        })
    }

    async fn delete_one(&self, collection: Collection, filter: Document) -> StoreResult<DeleteResult> {
        self.record();
        let mut collections = self.collections.write().await;
        let deleted = match collections.get_mut(&collection) {
            Some(docs) => match docs.iter().position(|doc| matches(doc, &filter)) {
                Some(index) => {
                    docs.remove(index);
                    1
                }
                None => 0,
            },
            None => 0,
        };
        Ok(DeleteResult {
            acknowledged: true,
            deleted_count: deleted,
        })
    }
}
