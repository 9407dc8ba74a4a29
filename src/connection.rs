use crate::entity::Entity;
use crate::errors::{ErrorKind, RepoError, RepoResult};
use mongodb::bson::doc;
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection, Database};

/// A connection descriptor for repository construction.
///
/// # Purpose
/// Repositories and managers are built from either a raw connection string or
/// externally supplied driver settings. The descriptor is resolved exactly
/// once, at construction time; the resulting collection handle is held for the
/// object's lifetime and never re-resolved.
///
/// # Usage
/// ```ignore
/// use mongo_repository::{ConnectionSource, Repository};
///
/// // from a connection string
/// let repo = Repository::<Widget>::connect("mongodb://localhost:27017/inventory").await?;
///
/// // from pre-parsed driver settings
/// let options = ClientOptions::parse("mongodb://localhost:27017/inventory").await?;
/// let repo = Repository::<Widget>::connect(options).await?;
/// ```
#[derive(Debug, Clone)]
pub enum ConnectionSource {
    /// A raw connection string or URL, parsed during resolution
    Uri(String),
    /// Pre-resolved driver settings
    Settings(Box<ClientOptions>),
}

impl From<&str> for ConnectionSource {
    fn from(uri: &str) -> Self {
        ConnectionSource::Uri(uri.to_string())
    }
}

impl From<String> for ConnectionSource {
    fn from(uri: String) -> Self {
        ConnectionSource::Uri(uri)
    }
}

impl From<ClientOptions> for ConnectionSource {
    fn from(options: ClientOptions) -> Self {
        ConnectionSource::Settings(Box::new(options))
    }
}

/// Resolves a connection descriptor to a bound collection handle.
///
/// # Arguments
/// * `source` - The connection descriptor
/// * `explicit_name` - Collection name override; when absent the name is
///   derived from the entity type
///
/// # Returns
/// The target database handle and the typed collection handle.
///
/// # Behavior
/// - A malformed connection string fails with `InvalidConnectionString`
/// - A descriptor without a default database name fails with
///   `MissingDatabaseName`
/// - The server is pinged so that an unreachable deployment surfaces here,
///   at construction, rather than on first use
pub(crate) async fn resolve_collection<T>(
    source: ConnectionSource,
    explicit_name: Option<&str>,
) -> RepoResult<(Database, Collection<T>)>
where
    T: Entity,
{
    let options = match source {
        ConnectionSource::Uri(uri) => ClientOptions::parse(&uri).await.map_err(|e| {
            log::error!("Malformed connection string '{}': {}", uri, e);
            RepoError::new_with_cause(
                &format!("Malformed connection string '{}'", uri),
                ErrorKind::InvalidConnectionString,
                e,
            )
        })?,
        ConnectionSource::Settings(options) => *options,
    };

    let database_name = match options.default_database.clone() {
        Some(name) => name,
        None => {
            log::error!("Connection descriptor carries no default database name");
            return Err(RepoError::new(
                "Connection descriptor carries no default database name",
                ErrorKind::MissingDatabaseName,
            ));
        }
    };

    let client = Client::with_options(options)?;
    let database = client.database(&database_name);

    // the driver connects lazily; ping so resolution failures are not
    // deferred to the first data operation
    database.run_command(doc! { "ping": 1 }).await?;

    let collection_name = match explicit_name {
        Some(name) => name.to_string(),
        None => T::collection_name(),
    };

    let collection = database.collection::<T>(&collection_name);
    Ok((database, collection))
}

/// Derives the default collection name for an entity type.
///
/// The last path segment of the type name is snake-cased and pluralized:
/// `Widget` becomes `widgets`, `Category` becomes `categories`,
/// `UserProfile` becomes `user_profiles`.
pub(crate) fn default_collection_name<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    let base = base.rsplit("::").next().unwrap_or(base);
    pluralize(&to_snake_case(base))
}

fn to_snake_case(name: &str) -> String {
    let mut result = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for ch in name.chars() {
        if ch.is_uppercase() {
            if prev_lower {
                result.push('_');
            }
            for lower in ch.to_lowercase() {
                result.push(lower);
            }
            prev_lower = false;
        } else {
            result.push(ch);
            prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        }
    }
    result
}

fn pluralize(name: &str) -> String {
    if let Some(stem) = name.strip_suffix('y') {
        if !matches!(stem.chars().last(), None | Some('a' | 'e' | 'i' | 'o' | 'u')) {
            return format!("{}ies", stem);
        }
    }
    if name.ends_with('s')
        || name.ends_with('x')
        || name.ends_with('z')
        || name.ends_with("ch")
        || name.ends_with("sh")
    {
        return format!("{}es", name);
    }
    format!("{}s", name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::oid::ObjectId;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    struct Widget {
        #[serde(rename = "_id")]
        id: Option<ObjectId>,
    }

    impl Entity for Widget {
        type Key = ObjectId;

        fn id(&self) -> Option<ObjectId> {
            self.id
        }

        fn set_id(&mut self, id: ObjectId) {
            self.id = Some(id);
        }
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct UserProfile {
        #[serde(rename = "_id")]
        id: Option<ObjectId>,
    }

    impl Entity for UserProfile {
        type Key = ObjectId;

        fn id(&self) -> Option<ObjectId> {
            self.id
        }

        fn set_id(&mut self, id: ObjectId) {
            self.id = Some(id);
        }
    }

    #[test]
    fn test_default_collection_name_pluralizes() {
        assert_eq!(default_collection_name::<Widget>(), "widgets");
        assert_eq!(default_collection_name::<UserProfile>(), "user_profiles");
    }

    #[test]
    fn test_pluralize_rules() {
        assert_eq!(pluralize("widget"), "widgets");
        assert_eq!(pluralize("category"), "categories");
        assert_eq!(pluralize("day"), "days");
        assert_eq!(pluralize("boss"), "bosses");
        assert_eq!(pluralize("box"), "boxes");
        assert_eq!(pluralize("batch"), "batches");
        assert_eq!(pluralize("dish"), "dishes");
    }

    #[test]
    fn test_to_snake_case() {
        assert_eq!(to_snake_case("Widget"), "widget");
        assert_eq!(to_snake_case("UserProfile"), "user_profile");
        assert_eq!(to_snake_case("HTTPRoute"), "httproute");
        assert_eq!(to_snake_case("Order2Line"), "order2_line");
    }

    #[test]
    fn test_connection_source_from_str() {
        let source = ConnectionSource::from("mongodb://localhost:27017/inventory");
        assert!(matches!(source, ConnectionSource::Uri(uri) if uri.contains("inventory")));
    }

    #[test]
    fn test_connection_source_from_options() {
        let source = ConnectionSource::from(ClientOptions::default());
        assert!(matches!(source, ConnectionSource::Settings(_)));
    }

    #[tokio::test]
    async fn test_resolve_fails_on_malformed_connection_string() {
        let result =
            resolve_collection::<Widget>(ConnectionSource::from("definitely not a uri"), None)
                .await;
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().kind(),
            &ErrorKind::InvalidConnectionString
        );
    }

    #[tokio::test]
    async fn test_resolve_fails_without_database_name() {
        let result =
            resolve_collection::<Widget>(ConnectionSource::from(ClientOptions::default()), None)
                .await;
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), &ErrorKind::MissingDatabaseName);
    }
}
