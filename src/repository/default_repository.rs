use crate::entity::{Entity, EntityKey, IdResolver};
use crate::errors::{ErrorKind, RepoError, RepoResult};
use crate::repository::cursor::EntityCursor;
use crate::repository::repository::RepositoryProvider;
use async_trait::async_trait;
use mongodb::bson::{Bson, Document};
use mongodb::options::FindOptions;
use mongodb::Collection;

/// Driver-backed repository implementation.
///
/// Holds exactly one collection handle for its whole lifetime; the handle's
/// identity is immutable after construction. Every operation delegates to the
/// corresponding driver call, and driver errors surface unchanged.
pub(crate) struct DefaultRepository<T>
where
    T: Entity,
{
    collection: Collection<T>,
    resolver: IdResolver,
}

impl<T> DefaultRepository<T>
where
    T: Entity,
{
    pub(crate) fn new(collection: Collection<T>) -> DefaultRepository<T> {
        DefaultRepository {
            collection,
            resolver: IdResolver::new(T::key_kind()),
        }
    }

    fn id_filter(&self, id: Bson) -> RepoResult<Document> {
        let resolved = self.resolver.resolve(id)?;
        let mut filter = Document::new();
        filter.insert(T::id_field(), resolved);
        Ok(filter)
    }

    fn entity_id_filter(&self, entity: &T) -> RepoResult<Document> {
        match entity.id() {
            Some(key) => self.id_filter(key.to_bson()),
            None => {
                log::error!("Entity in collection '{}' has no id value", self.collection.name());
                Err(RepoError::new(
                    "Entity has no id value",
                    ErrorKind::NotIdentifiable,
                ))
            }
        }
    }
}

#[async_trait]
impl<T> RepositoryProvider<T> for DefaultRepository<T>
where
    T: Entity,
{
    async fn get_by_id(&self, id: &T::Key) -> RepoResult<Option<T>> {
        let filter = self.id_filter(id.to_bson())?;
        let found = self.collection.find_one(filter).await?;
        Ok(found)
    }

    async fn add(&self, mut entity: T) -> RepoResult<T> {
        let had_id = entity.id().is_some();
        let result = self.collection.insert_one(&entity).await?;
        if !had_id {
            match T::Key::from_bson(result.inserted_id) {
                Ok(key) => entity.set_id(key),
                // annotation is best effort; the insert itself succeeded
                Err(e) => log::warn!(
                    "Driver-assigned id does not fit the entity key type: {}",
                    e
                ),
            }
        }
        Ok(entity)
    }

    async fn add_many(&self, entities: Vec<T>) -> RepoResult<()> {
        // the driver rejects empty batches
        if entities.is_empty() {
            return Ok(());
        }
        self.collection.insert_many(&entities).await?;
        Ok(())
    }

    async fn update(&self, entity: T) -> RepoResult<T> {
        let filter = self.entity_id_filter(&entity)?;
        self.collection
            .find_one_and_replace(filter, &entity)
            .upsert(true)
            .await?;
        Ok(entity)
    }

    async fn delete(&self, id: &T::Key) -> RepoResult<()> {
        let filter = self.id_filter(id.to_bson())?;
        self.collection.delete_one(filter).await?;
        Ok(())
    }

    async fn delete_entity(&self, entity: &T) -> RepoResult<()> {
        let filter = self.entity_id_filter(entity)?;
        self.collection.delete_one(filter).await?;
        Ok(())
    }

    async fn delete_all(&self) -> RepoResult<()> {
        self.collection.delete_many(Document::new()).await?;
        Ok(())
    }

    async fn count(&self) -> RepoResult<u64> {
        let count = self.collection.count_documents(Document::new()).await?;
        Ok(count)
    }

    async fn count_where(&self, filter: Document) -> RepoResult<u64> {
        let count = self.collection.count_documents(filter).await?;
        Ok(count)
    }

    async fn exists(&self, filter: Document) -> RepoResult<bool> {
        let count = self.collection.count_documents(filter).limit(1).await?;
        Ok(count > 0)
    }

    async fn find(&self, filter: Document) -> RepoResult<EntityCursor<T>> {
        let cursor = self.collection.find(filter).await?;
        Ok(EntityCursor::from_driver(cursor))
    }

    async fn find_with_options(
        &self,
        filter: Document,
        options: FindOptions,
    ) -> RepoResult<EntityCursor<T>> {
        let cursor = self.collection.find(filter).with_options(options).await?;
        Ok(EntityCursor::from_driver(cursor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::KeyKind;
    use mongodb::bson::oid::ObjectId;
    use mongodb::options::ClientOptions;
    use mongodb::Client;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Widget {
        #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
        id: Option<ObjectId>,
        name: String,
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

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct HexKeyed {
        #[serde(
            rename = "_id",
            with = "mongodb::bson::serde_helpers::hex_string_as_object_id"
        )]
        id: String,
    }

    impl Entity for HexKeyed {
        type Key = String;

        fn id(&self) -> Option<String> {
            Some(self.id.clone())
        }

        fn set_id(&mut self, id: String) {
            self.id = id;
        }

        fn key_kind() -> KeyKind {
            KeyKind::ObjectId
        }
    }

    // handle construction needs no live server; only operations do
    async fn offline_collection<T: Entity>(name: &str) -> Collection<T> {
        let options = ClientOptions::parse("mongodb://localhost:27017/widget_test")
            .await
            .unwrap();
        let client = Client::with_options(options).unwrap();
        client.database("widget_test").collection::<T>(name)
    }

    #[tokio::test]
    async fn test_id_filter_targets_the_id_field() {
        let repo = DefaultRepository::new(offline_collection::<Widget>("widgets").await);
        let oid = ObjectId::new();
        let filter = repo.id_filter(Bson::ObjectId(oid)).unwrap();
        assert_eq!(filter.len(), 1);
        assert_eq!(filter.get("_id"), Some(&Bson::ObjectId(oid)));
    }

    #[tokio::test]
    async fn test_id_filter_resolves_hex_string_keys() {
        let repo = DefaultRepository::new(offline_collection::<HexKeyed>("hex_keyed").await);
        let filter = repo
            .id_filter(Bson::String("507f1f77bcf86cd799439011".to_string()))
            .unwrap();
        let expected = ObjectId::parse_str("507f1f77bcf86cd799439011").unwrap();
        assert_eq!(filter.get("_id"), Some(&Bson::ObjectId(expected)));
    }

    #[tokio::test]
    async fn test_hex_keyed_filter_matches_stored_id_representation() {
        let repo = DefaultRepository::new(offline_collection::<HexKeyed>("hex_keyed").await);
        let entity = HexKeyed {
            id: "507f1f77bcf86cd799439011".to_string(),
        };
        let stored = mongodb::bson::to_document(&entity).unwrap();
        let filter = repo.entity_id_filter(&entity).unwrap();
        // a filter that does not match what insert wrote can never hit
        assert!(matches!(filter.get("_id"), Some(Bson::ObjectId(_))));
        assert_eq!(stored.get("_id"), filter.get("_id"));
    }

    #[tokio::test]
    async fn test_id_filter_rejects_malformed_hex_string() {
        let repo = DefaultRepository::new(offline_collection::<HexKeyed>("hex_keyed").await);
        let result = repo.id_filter(Bson::String("nope".to_string()));
        assert_eq!(result.unwrap_err().kind(), &ErrorKind::InvalidId);
    }

    #[tokio::test]
    async fn test_entity_id_filter_requires_an_id() {
        let repo = DefaultRepository::new(offline_collection::<Widget>("widgets").await);
        let entity = Widget {
            id: None,
            name: "gear".to_string(),
        };
        let result = repo.entity_id_filter(&entity);
        assert_eq!(result.unwrap_err().kind(), &ErrorKind::NotIdentifiable);
    }
}
