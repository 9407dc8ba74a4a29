//! # mongo-repository - Typed repositories over MongoDB collections
//!
//! A thin, generic repository layer on top of the MongoDB driver. It lets
//! application code perform CRUD and query operations against typed entities
//! without repeating collection-lookup and filter-construction boilerplate.
//! Every operation is a near 1:1 delegation to driver calls; durability,
//! indexing, query execution, and transport all belong to the driver.
//!
//! ## Key features
//!
//! - **Typed facades**: [`Repository<T>`] for data operations,
//!   [`RepositoryManager<T>`] for administrative ones
//! - **Generic identity**: entity keys are any [`EntityKey`] type, with a
//!   dedicated resolution path for the driver's 12-byte [`ObjectId`] -
//!   identifiers supplied in hex string form are parsed before filtering
//! - **One-shot resolution**: a connection descriptor is resolved to a bound
//!   collection handle exactly once, at construction
//! - **Transparent failures**: driver errors propagate unchanged; absence of
//!   a match is a normal outcome, never an error
//! - **Lazy enumeration**: query results stream through [`EntityCursor`],
//!   composable with the `futures` combinators
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use mongo_repository::{doc, Entity, ObjectId, Repository};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Widget {
//!     #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
//!     id: Option<ObjectId>,
//!     name: String,
//! }
//!
//! impl Entity for Widget {
//!     type Key = ObjectId;
//!
//!     fn id(&self) -> Option<ObjectId> {
//!         self.id
//!     }
//!
//!     fn set_id(&mut self, id: ObjectId) {
//!         self.id = Some(id);
//!     }
//! }
//!
//! # async fn example() -> mongo_repository::RepoResult<()> {
//! let repo = Repository::<Widget>::connect("mongodb://localhost:27017/inventory").await?;
//!
//! let widget = repo.add(Widget { id: None, name: "gear".into() }).await?;
//! let found = repo.get_by_id(&widget.id().unwrap()).await?;
//! assert!(found.is_some());
//!
//! repo.delete_where(doc! { "name": "gear" }).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## What this crate is not
//!
//! Connection pooling, transaction management, schema migration, query
//! optimization, and index strategy are all the driver's or the server's
//! business. No retries, caching, or concurrency coordination happen here;
//! in particular, bulk updates are sequential and non-atomic, and writes are
//! last-writer-wins.
//!
//! ## Module organization
//!
//! - [`connection`] - Connection descriptors and collection resolution
//! - [`entity`] - The entity contract and identifier resolution
//! - [`errors`] - Error types and result definitions
//! - [`repository`] - The repository and manager facades

pub mod connection;
pub mod entity;
pub mod errors;
pub mod repository;

pub use connection::ConnectionSource;
pub use entity::{Entity, EntityKey, KeyKind};
pub use errors::{ErrorKind, RepoError, RepoResult};
pub use repository::{
    EntityCursor, Repository, RepositoryManager, RepositoryManagerProvider, RepositoryProvider,
};

// Driver vocabulary that intentionally crosses the boundary: filters, index
// specifications, and connection settings are the driver's own types.
pub use mongodb::bson::oid::ObjectId;
pub use mongodb::bson::{doc, Bson, Document};
pub use mongodb::options::{ClientOptions, FindOptions, IndexOptions};
pub use mongodb::{Collection, Database, IndexModel};
