//! Typed repositories and managers over driver collections.
//!
//! This module provides the two facades of the crate:
//!
//! - [`Repository`] for data operations: entity-keyed CRUD, counts, and lazy
//!   enumeration
//! - [`RepositoryManager`] for administrative operations: dropping the
//!   collection, index management, and namespace introspection
//!
//! Both wrap a single collection handle resolved once at construction, and
//! both expose their operations through a provider trait so alternative
//! implementations (such as in-memory test doubles) can stand in.
//!
//! # Creating repositories
//!
//! ```ignore
//! use mongo_repository::{Repository, RepositoryManager};
//!
//! let repo = Repository::<Widget>::connect("mongodb://localhost:27017/inventory").await?;
//! let manager = RepositoryManager::<Widget>::connect("mongodb://localhost:27017/inventory").await?;
//! ```

mod cursor;
mod default_repository;
mod manager;
#[allow(clippy::module_inception)]
mod repository;

pub use cursor::*;
pub use manager::{RepositoryManager, RepositoryManagerProvider};
pub use repository::{Repository, RepositoryProvider};
