use crate::connection::{resolve_collection, ConnectionSource};
use crate::entity::Entity;
use crate::errors::{ErrorKind, RepoError, RepoResult};
use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::options::IndexOptions;
use mongodb::{Collection, Database, IndexModel};
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;

/// A trait for administrative operations on one collection.
///
/// # Purpose
///
/// `RepositoryManagerProvider` keeps DDL-like concerns (dropping the
/// collection, managing indexes, namespace introspection) separate from data
/// operations. Index key specifications and options are opaque driver
/// vocabulary, deliberately leaked at this boundary rather than abstracted.
///
/// Every operation is stateless relative to prior calls; all of them target
/// the same fixed collection handle established at construction.
#[async_trait]
pub trait RepositoryManagerProvider: Send + Sync {
    /// Returns the fully qualified, database-scoped collection name
    /// (`database.collection`).
    fn name(&self) -> String;

    /// Removes the entire collection, schema and data, from the database.
    async fn drop_collection(&self) -> RepoResult<()>;

    /// Removes every secondary index on the collection. The default
    /// identifier index is managed by the server and is not affected.
    async fn drop_all_indexes(&self) -> RepoResult<()>;

    /// Lists current indexes as opaque driver descriptors.
    async fn list_indexes(&self) -> RepoResult<Vec<IndexModel>>;

    /// Idempotently creates an index: when an index with an equivalent key
    /// specification already exists, nothing happens.
    async fn ensure_index(&self, keys: Document, options: Option<IndexOptions>) -> RepoResult<()>;

    /// Reports whether the collection is capped, from the server's
    /// collection metadata. A collection that does not exist yet is not
    /// capped.
    async fn is_capped(&self) -> RepoResult<bool>;
}

/// Driver-backed manager implementation.
pub(crate) struct DefaultRepositoryManager<T>
where
    T: Entity,
{
    database: Database,
    collection: Collection<T>,
}

impl<T> DefaultRepositoryManager<T>
where
    T: Entity,
{
    pub(crate) fn new(database: Database, collection: Collection<T>) -> DefaultRepositoryManager<T> {
        DefaultRepositoryManager {
            database,
            collection,
        }
    }
}

#[async_trait]
impl<T> RepositoryManagerProvider for DefaultRepositoryManager<T>
where
    T: Entity,
{
    fn name(&self) -> String {
        self.collection.namespace().to_string()
    }

    async fn drop_collection(&self) -> RepoResult<()> {
        self.collection.drop().await?;
        Ok(())
    }

    async fn drop_all_indexes(&self) -> RepoResult<()> {
        self.collection.drop_indexes().await?;
        Ok(())
    }

    async fn list_indexes(&self) -> RepoResult<Vec<IndexModel>> {
        let cursor = self.collection.list_indexes().await?;
        let indexes = cursor.try_collect().await?;
        Ok(indexes)
    }

    async fn ensure_index(&self, keys: Document, options: Option<IndexOptions>) -> RepoResult<()> {
        let existing = self.list_indexes().await?;
        if has_equivalent_index(&existing, &keys) {
            return Ok(());
        }
        let model = IndexModel::builder().keys(keys).options(options).build();
        self.collection.create_index(model).await?;
        Ok(())
    }

    async fn is_capped(&self) -> RepoResult<bool> {
        let command = doc! {
            "listCollections": 1,
            "filter": { "name": self.collection.name() },
        };
        let reply = self.database.run_command(command).await?;
        let batch = reply
            .get_document("cursor")
            .and_then(|cursor| cursor.get_array("firstBatch"))
            .map_err(|e| {
                log::error!("Unexpected listCollections reply shape: {}", e);
                RepoError::new_with_cause(
                    "Unexpected listCollections reply shape",
                    ErrorKind::InternalError,
                    e,
                )
            })?;
        let spec = match batch.first() {
            Some(Bson::Document(spec)) => spec,
            _ => return Ok(false),
        };
        let capped = spec
            .get_document("options")
            .map(|options| options.get_bool("capped").unwrap_or(false))
            .unwrap_or(false);
        Ok(capped)
    }
}

/// True when an index with the same key specification already exists.
/// Only the key document is compared; index options are not interpreted.
fn has_equivalent_index(existing: &[IndexModel], keys: &Document) -> bool {
    existing.iter().any(|model| same_key_spec(&model.keys, keys))
}

/// Key-specification equality, numeric-type-insensitive: the server reports
/// directions in whatever numeric width they were created with, so
/// `{"name": 1.0}` and `{"name": 1}` describe the same index. Key order
/// matters, as it does to the server.
fn same_key_spec(left: &Document, right: &Document) -> bool {
    if left.len() != right.len() {
        return false;
    }
    left.iter().zip(right.iter()).all(|((ln, lv), (rn, rv))| {
        ln == rn
            && match (as_direction(lv), as_direction(rv)) {
                (Some(l), Some(r)) => l == r,
                (None, None) => lv == rv,
                _ => false,
            }
    })
}

fn as_direction(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(v) => Some(f64::from(*v)),
        Bson::Int64(v) => Some(*v as f64),
        Bson::Double(v) => Some(*v),
        _ => None,
    }
}

/// A typed facade for administrative operations on one collection.
///
/// # Purpose
///
/// `RepositoryManager<T>` is the administrative counterpart of
/// [`Repository<T>`](crate::Repository): same construction surface, same
/// single-handle invariant, but its operations act on the collection as a
/// whole rather than on entities.
///
/// # Examples
///
/// ```ignore
/// let manager = RepositoryManager::<Widget>::connect("mongodb://localhost:27017/inventory").await?;
///
/// manager.ensure_index(doc! { "name": 1 }, None).await?;
/// assert!(manager.name().ends_with(".widgets"));
/// ```
pub struct RepositoryManager<T>
where
    T: Entity,
{
    inner: Arc<dyn RepositoryManagerProvider>,
    _entity: PhantomData<fn() -> T>,
}

impl<T> RepositoryManager<T>
where
    T: Entity,
{
    /// Creates a facade wrapping the given provider implementation.
    pub fn new<P: RepositoryManagerProvider + 'static>(provider: P) -> Self {
        RepositoryManager {
            inner: Arc::new(provider),
            _entity: PhantomData,
        }
    }

    /// Resolves the connection descriptor and binds the manager to the
    /// entity's default collection.
    pub async fn connect(source: impl Into<ConnectionSource>) -> RepoResult<Self> {
        let (database, collection) = resolve_collection::<T>(source.into(), None).await?;
        Ok(RepositoryManager::new(DefaultRepositoryManager::new(
            database, collection,
        )))
    }

    /// Resolves the connection descriptor and binds the manager to an
    /// explicitly named collection.
    pub async fn connect_with_name(
        source: impl Into<ConnectionSource>,
        collection_name: &str,
    ) -> RepoResult<Self> {
        let (database, collection) =
            resolve_collection::<T>(source.into(), Some(collection_name)).await?;
        Ok(RepositoryManager::new(DefaultRepositoryManager::new(
            database, collection,
        )))
    }

    /// Builds a manager over already-resolved database and collection
    /// handles.
    pub fn from_collection(database: Database, collection: Collection<T>) -> Self {
        RepositoryManager::new(DefaultRepositoryManager::new(database, collection))
    }
}

impl<T> Clone for RepositoryManager<T>
where
    T: Entity,
{
    fn clone(&self) -> Self {
        RepositoryManager {
            inner: self.inner.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T> Deref for RepositoryManager<T>
where
    T: Entity,
{
    type Target = Arc<dyn RepositoryManagerProvider>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
