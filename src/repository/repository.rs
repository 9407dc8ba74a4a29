use crate::connection::{resolve_collection, ConnectionSource};
use crate::entity::Entity;
use crate::errors::RepoResult;
use crate::repository::cursor::EntityCursor;
use crate::repository::default_repository::DefaultRepository;
use async_trait::async_trait;
use mongodb::bson::Document;
use mongodb::options::FindOptions;
use mongodb::Collection;
use std::ops::Deref;
use std::sync::Arc;

/// A trait for implementing typed data operations over one collection.
///
/// # Purpose
///
/// `RepositoryProvider` defines the complete data surface for persisting,
/// querying, and removing strongly-typed entities: point lookups by
/// identifier, single and bulk writes, predicate-based deletes, counts, and
/// lazy enumeration. Query predicates are opaque driver filter documents by
/// design; this crate does not abstract the driver's query language.
///
/// # Characteristics
///
/// - **Generic over the entity type**: works with any type implementing
///   [`Entity`]
/// - **Pure delegation**: every operation maps 1:1 onto a driver call; no
///   retries, caching, or error translation happen at this layer
/// - **Not-found is not an error**: point lookups and deletes treat "no rows
///   matched" as a normal outcome
/// - **Thread-safe**: requires `Send + Sync` for shared use
///
/// # Relationship to related types
///
/// - [`Repository<T>`]: the facade wrapper that implements `Deref` to this
///   trait
/// - `DefaultRepository<T>`: the driver-backed implementation
#[async_trait]
pub trait RepositoryProvider<T>: Send + Sync
where
    T: Entity,
{
    /// Retrieves a single entity by its identifier.
    ///
    /// The identifier is resolved through the entity's key kind first, so a
    /// hex string identifier for an object-id keyed entity matches the stored
    /// object id rather than a raw string value.
    ///
    /// Returns `Ok(None)` when no document matches; fails only when query
    /// execution itself errors.
    async fn get_by_id(&self, id: &T::Key) -> RepoResult<Option<T>>;

    /// Inserts a single entity.
    ///
    /// Returns the entity, annotated with the driver-assigned identifier when
    /// it had none.
    async fn add(&self, entity: T) -> RepoResult<T>;

    /// Inserts multiple entities as one driver bulk write.
    ///
    /// Atomicity follows the driver's bulk-write semantics; this layer adds
    /// no guarantee of its own.
    async fn add_many(&self, entities: Vec<T>) -> RepoResult<()>;

    /// Replaces the document whose identifier equals the entity's identifier,
    /// inserting it when absent (upsert).
    ///
    /// The replacement is total: fields absent from the entity are not
    /// preserved from the old document. No optimistic-concurrency check is
    /// performed; last writer wins. Fails with `NotIdentifiable` when the
    /// entity carries no identifier.
    async fn update(&self, entity: T) -> RepoResult<T>;

    /// Upserts each entity in turn.
    ///
    /// Strictly sequential and not transactional: a failure partway through
    /// leaves prior upserts committed and subsequent ones unapplied.
    async fn update_many(&self, entities: Vec<T>) -> RepoResult<()> {
        for entity in entities {
            self.update(entity).await?;
        }
        Ok(())
    }

    /// Removes the single document matching the identifier.
    ///
    /// Matching nothing is a success, not an error.
    async fn delete(&self, id: &T::Key) -> RepoResult<()>;

    /// Removes the single document matching the entity's identifier.
    async fn delete_entity(&self, entity: &T) -> RepoResult<()>;

    /// Removes every entity matching the filter.
    ///
    /// Defined as the composition "find matching, then delete each by
    /// identifier" rather than a single bulk delete, so the filter must be
    /// expressible over the entity's own fields and must not depend on
    /// concurrent mutation during the scan.
    async fn delete_where(&self, filter: Document) -> RepoResult<()> {
        let matched = self.find(filter).await?.to_vec().await?;
        for entity in &matched {
            self.delete_entity(entity).await?;
        }
        Ok(())
    }

    /// Removes every document in the collection.
    async fn delete_all(&self) -> RepoResult<()>;

    /// Returns the total document count in the collection.
    async fn count(&self) -> RepoResult<u64>;

    /// Returns the count of documents matching the filter.
    async fn count_where(&self, filter: Document) -> RepoResult<u64>;

    /// Returns true iff at least one document matches the filter.
    async fn exists(&self, filter: Document) -> RepoResult<bool> {
        Ok(self.count_where(filter).await? > 0)
    }

    /// Finds all entities matching the filter as a lazy cursor.
    async fn find(&self, filter: Document) -> RepoResult<EntityCursor<T>>;

    /// Finds matching entities with driver-level sort/skip/limit/projection
    /// options applied.
    async fn find_with_options(
        &self,
        filter: Document,
        options: FindOptions,
    ) -> RepoResult<EntityCursor<T>>;

    /// Enumerates the whole collection as a lazy cursor.
    async fn find_all(&self) -> RepoResult<EntityCursor<T>> {
        self.find(Document::new()).await
    }
}

/// A typed facade for data operations on one collection.
///
/// # Purpose
///
/// `Repository<T>` wraps an implementation of [`RepositoryProvider<T>`]
/// (normally the driver-backed default) and exposes all repository operations
/// through `Deref`, so provider methods read as if defined directly on the
/// facade.
///
/// # Characteristics
///
/// - **One collection handle per instance**: the handle's identity is fixed
///   at construction and never re-resolved
/// - **Cheap to clone**: cloning increments an `Arc` reference count; clones
///   share the same handle
/// - **Runtime polymorphism**: wraps `Arc<dyn RepositoryProvider<T>>` so
///   alternative implementations can stand in
///
/// # Examples
///
/// ```ignore
/// let repo = Repository::<Widget>::connect("mongodb://localhost:27017/inventory").await?;
///
/// let widget = repo.add(Widget::new("gear")).await?;
/// let found = repo.get_by_id(&widget.id().unwrap()).await?;
/// assert!(found.is_some());
/// ```
pub struct Repository<T>
where
    T: Entity,
{
    inner: Arc<dyn RepositoryProvider<T>>,
}

impl<T> Repository<T>
where
    T: Entity,
{
    /// Creates a facade wrapping the given provider implementation.
    pub fn new<P: RepositoryProvider<T> + 'static>(provider: P) -> Self {
        Repository {
            inner: Arc::new(provider),
        }
    }

    /// Resolves the connection descriptor and binds the repository to the
    /// entity's default collection.
    ///
    /// Resolution happens exactly once, here; malformed descriptors, missing
    /// database names, and unreachable servers fail immediately.
    pub async fn connect(source: impl Into<ConnectionSource>) -> RepoResult<Self> {
        let (_, collection) = resolve_collection::<T>(source.into(), None).await?;
        Ok(Repository::new(DefaultRepository::new(collection)))
    }

    /// Resolves the connection descriptor and binds the repository to an
    /// explicitly named collection.
    pub async fn connect_with_name(
        source: impl Into<ConnectionSource>,
        collection_name: &str,
    ) -> RepoResult<Self> {
        let (_, collection) =
            resolve_collection::<T>(source.into(), Some(collection_name)).await?;
        Ok(Repository::new(DefaultRepository::new(collection)))
    }

    /// Builds a repository over an already-resolved collection handle.
    pub fn from_collection(collection: Collection<T>) -> Self {
        Repository::new(DefaultRepository::new(collection))
    }
}

impl<T> Clone for Repository<T>
where
    T: Entity,
{
    fn clone(&self) -> Self {
        Repository {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Deref for Repository<T>
where
    T: Entity,
{
    type Target = Arc<dyn RepositoryProvider<T>>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
