use crate::connection::default_collection_name;
use crate::errors::{ErrorKind, RepoError, RepoResult};
use mongodb::bson::oid::ObjectId;
use mongodb::bson::Bson;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Trait that defines the structural contract for a repository entity.
///
/// # Purpose
/// The only requirement placed on stored types: they must serialize to a
/// document, and they must expose a single identifying field of a declared
/// key type. No behavior or validation belongs here; entities are pure data
/// consumed and returned by the driver.
///
/// # Characteristics
/// - The key type is declared through the associated `Key` type
/// - The identifying field is conventionally serialized as `_id` (override
///   `id_field` when a different field carries the identity)
/// - The logical collection name defaults to the pluralized snake-case type
///   name; override `collection_name` for an explicit name
///
/// # Usage
/// ```ignore
/// use mongo_repository::{Entity, ObjectId};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// pub struct Widget {
///     #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
///     id: Option<ObjectId>,
///     name: String,
/// }
///
/// impl Entity for Widget {
///     type Key = ObjectId;
///
///     fn id(&self) -> Option<ObjectId> {
///         self.id
///     }
///
///     fn set_id(&mut self, id: ObjectId) {
///         self.id = Some(id);
///     }
/// }
/// ```
pub trait Entity: Serialize + DeserializeOwned + Unpin + Send + Sync + 'static {
    /// Associated type for entity identifiers.
    type Key: EntityKey;

    /// Returns the entity's identifier value, if one has been assigned.
    fn id(&self) -> Option<Self::Key>;

    /// Annotates the entity with a driver-assigned identifier after insertion.
    fn set_id(&mut self, id: Self::Key);

    /// Returns the logical collection name for this entity type.
    ///
    /// # Behavior
    /// - Defaults to the pluralized snake-case type name (e.g. `Widget` maps
    ///   to `widgets`, `Category` to `categories`)
    /// - Override to pin the name explicitly
    fn collection_name() -> String {
        default_collection_name::<Self>()
    }

    /// Returns the document field holding the entity identity.
    ///
    /// Defaults to `_id`, the driver's identifier field.
    fn id_field() -> &'static str {
        "_id"
    }

    /// Returns how identifier values of this entity resolve to filter values.
    ///
    /// # Behavior
    /// - Defaults to the declared key type's kind
    /// - An entity that handles object identifiers in their hex string form
    ///   (declared key type `String`) overrides this to `KeyKind::ObjectId` so
    ///   that string identifiers are parsed before being used in filters
    ///
    /// # Usage
    /// An override to `KeyKind::ObjectId` changes only how filters are built;
    /// the identifier field must also serialize as an object identifier so
    /// that stored documents and filters agree on the `_id` representation:
    ///
    /// ```ignore
    /// #[derive(Serialize, Deserialize)]
    /// pub struct Account {
    ///     #[serde(
    ///         rename = "_id",
    ///         with = "mongodb::bson::serde_helpers::hex_string_as_object_id"
    ///     )]
    ///     id: String,
    /// }
    ///
    /// impl Entity for Account {
    ///     type Key = String;
    ///     // ...
    ///     fn key_kind() -> KeyKind {
    ///         KeyKind::ObjectId
    ///     }
    /// }
    /// ```
    fn key_kind() -> KeyKind {
        Self::Key::KIND
    }
}

/// How a key type maps to the driver's identifier representation.
///
/// `ObjectId` keys get a dedicated resolution path: values supplied in hex
/// string form are parsed into proper object identifiers before filtering.
/// `Plain` keys pass through to the driver's native value representation
/// unchanged.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum KeyKind {
    /// The built-in 12-byte object identifier type
    ObjectId,
    /// Any other comparable identifier type (string, integer)
    Plain,
}

/// Trait for types usable as entity identifiers.
///
/// A key must translate to a BSON filter value and back; the reverse direction
/// annotates entities with driver-assigned identifiers after insertion.
pub trait EntityKey: Clone + Send + Sync + 'static {
    /// The resolution kind for this key type.
    const KIND: KeyKind;

    /// Converts the key into its BSON filter value.
    fn to_bson(&self) -> Bson;

    /// Reconstructs a key from a BSON identifier value.
    fn from_bson(value: Bson) -> RepoResult<Self>;
}

impl EntityKey for ObjectId {
    const KIND: KeyKind = KeyKind::ObjectId;

    fn to_bson(&self) -> Bson {
        Bson::ObjectId(*self)
    }

    fn from_bson(value: Bson) -> RepoResult<Self> {
        match value {
            Bson::ObjectId(oid) => Ok(oid),
            Bson::String(s) => Ok(ObjectId::parse_str(&s)?),
            other => {
                log::error!("Cannot build an ObjectId key from {:?}", other);
                Err(RepoError::new(
                    "Identifier value is not an object id",
                    ErrorKind::InvalidId,
                ))
            }
        }
    }
}

impl EntityKey for String {
    const KIND: KeyKind = KeyKind::Plain;

    fn to_bson(&self) -> Bson {
        Bson::String(self.clone())
    }

    fn from_bson(value: Bson) -> RepoResult<Self> {
        match value {
            Bson::String(s) => Ok(s),
            // keeps string <-> object id translation total for entities that
            // store driver-assigned identifiers in hex string form
            Bson::ObjectId(oid) => Ok(oid.to_hex()),
            other => {
                log::error!("Cannot build a String key from {:?}", other);
                Err(RepoError::new(
                    "Identifier value is not a string",
                    ErrorKind::InvalidId,
                ))
            }
        }
    }
}

impl EntityKey for i32 {
    const KIND: KeyKind = KeyKind::Plain;

    fn to_bson(&self) -> Bson {
        Bson::Int32(*self)
    }

    fn from_bson(value: Bson) -> RepoResult<Self> {
        match value {
            Bson::Int32(n) => Ok(n),
            other => {
                log::error!("Cannot build an i32 key from {:?}", other);
                Err(RepoError::new(
                    "Identifier value is not a 32-bit integer",
                    ErrorKind::InvalidId,
                ))
            }
        }
    }
}

impl EntityKey for i64 {
    const KIND: KeyKind = KeyKind::Plain;

    fn to_bson(&self) -> Bson {
        Bson::Int64(*self)
    }

    fn from_bson(value: Bson) -> RepoResult<Self> {
        match value {
            Bson::Int64(n) => Ok(n),
            Bson::Int32(n) => Ok(n as i64),
            other => {
                log::error!("Cannot build an i64 key from {:?}", other);
                Err(RepoError::new(
                    "Identifier value is not a 64-bit integer",
                    ErrorKind::InvalidId,
                ))
            }
        }
    }
}

/// Resolves identifier values to the representation used in equality filters.
///
/// # Purpose
/// Captures the entity's key kind once at repository construction, so the
/// object-identifier special case lives in one place instead of being
/// re-derived per call.
///
/// # Behavior
/// - Kind `ObjectId`: hex strings are parsed into object identifiers
///   (`InvalidId` on malformed input); proper object identifiers pass through;
///   any other value is rejected
/// - Kind `Plain`: the raw value passes through unchanged
#[derive(Debug, Clone, Copy)]
pub(crate) struct IdResolver {
    kind: KeyKind,
}

impl IdResolver {
    pub(crate) fn new(kind: KeyKind) -> Self {
        IdResolver { kind }
    }

    pub(crate) fn resolve(&self, value: Bson) -> RepoResult<Bson> {
        match self.kind {
            KeyKind::Plain => Ok(value),
            KeyKind::ObjectId => match value {
                Bson::ObjectId(oid) => Ok(Bson::ObjectId(oid)),
                Bson::String(s) => match ObjectId::parse_str(&s) {
                    Ok(oid) => Ok(Bson::ObjectId(oid)),
                    Err(e) => {
                        log::error!("Identifier '{}' is not a valid object id: {}", s, e);
                        Err(RepoError::new_with_cause(
                            &format!("Identifier '{}' is not a valid object id", s),
                            ErrorKind::InvalidId,
                            e,
                        ))
                    }
                },
                other => {
                    log::error!("Identifier {:?} cannot be resolved to an object id", other);
                    Err(RepoError::new(
                        "Identifier cannot be resolved to an object id",
                        ErrorKind::InvalidId,
                    ))
                }
            },
        }
    }
}
