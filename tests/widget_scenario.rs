//! End-to-end repository scenario against an in-memory provider.
//!
//! The provider implements `RepositoryProvider` over a plain vector, so the
//! facade's provided methods (sequential bulk update, find-then-delete
//! composition, existence checks) run with their real semantics and without
//! a live server.

use async_trait::async_trait;
use futures::stream;
use mongo_repository::{
    Bson, Document, Entity, EntityCursor, FindOptions, RepoResult, Repository, RepositoryProvider,
};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

#[ctor::ctor]
fn init_logging() {
    colog::init();
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Widget {
    #[serde(rename = "_id")]
    id: Option<i32>,
    name: String,
}

impl Widget {
    fn new(id: i32, name: &str) -> Self {
        Widget {
            id: Some(id),
            name: name.to_string(),
        }
    }
}

impl Entity for Widget {
    type Key = i32;

    fn id(&self) -> Option<i32> {
        self.id
    }

    fn set_id(&mut self, id: i32) {
        self.id = Some(id);
    }
}

#[derive(Default)]
struct VecProvider {
    store: Mutex<Vec<Widget>>,
}

impl VecProvider {
    fn matches(filter: &Document, widget: &Widget) -> bool {
        if filter.is_empty() {
            return true;
        }
        match filter.get("name") {
            Some(Bson::String(name)) => widget.name == *name,
            _ => false,
        }
    }
}

#[async_trait]
impl RepositoryProvider<Widget> for VecProvider {
    async fn get_by_id(&self, id: &i32) -> RepoResult<Option<Widget>> {
        let store = self.store.lock().unwrap();
        Ok(store.iter().find(|w| w.id == Some(*id)).cloned())
    }

    async fn add(&self, entity: Widget) -> RepoResult<Widget> {
        self.store.lock().unwrap().push(entity.clone());
        Ok(entity)
    }

    async fn add_many(&self, entities: Vec<Widget>) -> RepoResult<()> {
        self.store.lock().unwrap().extend(entities);
        Ok(())
    }

    async fn update(&self, entity: Widget) -> RepoResult<Widget> {
        let mut store = self.store.lock().unwrap();
        match store.iter_mut().find(|w| w.id == entity.id) {
            Some(slot) => *slot = entity.clone(),
            None => store.push(entity.clone()),
        }
        Ok(entity)
    }

    async fn delete(&self, id: &i32) -> RepoResult<()> {
        self.store.lock().unwrap().retain(|w| w.id != Some(*id));
        Ok(())
    }

    async fn delete_entity(&self, entity: &Widget) -> RepoResult<()> {
        self.store.lock().unwrap().retain(|w| w.id != entity.id);
        Ok(())
    }

    async fn delete_all(&self) -> RepoResult<()> {
        self.store.lock().unwrap().clear();
        Ok(())
    }

    async fn count(&self) -> RepoResult<u64> {
        Ok(self.store.lock().unwrap().len() as u64)
    }

    async fn count_where(&self, filter: Document) -> RepoResult<u64> {
        let store = self.store.lock().unwrap();
        Ok(store.iter().filter(|w| Self::matches(&filter, w)).count() as u64)
    }

    async fn find(&self, filter: Document) -> RepoResult<EntityCursor<Widget>> {
        let matched: Vec<_> = self
            .store
            .lock()
            .unwrap()
            .iter()
            .filter(|w| Self::matches(&filter, w))
            .cloned()
            .map(Ok)
            .collect();
        Ok(EntityCursor::new(stream::iter(matched)))
    }

    async fn find_with_options(
        &self,
        filter: Document,
        _options: FindOptions,
    ) -> RepoResult<EntityCursor<Widget>> {
        self.find(filter).await
    }
}

#[tokio::test]
async fn widget_lifecycle_scenario() {
    let repo = Repository::new(VecProvider::default());

    repo.add(Widget::new(1, "a")).await.unwrap();
    repo.add(Widget::new(2, "b")).await.unwrap();
    assert_eq!(repo.count().await.unwrap(), 2);

    repo.delete(&1).await.unwrap();
    assert_eq!(repo.count().await.unwrap(), 1);
    assert!(repo.get_by_id(&1).await.unwrap().is_none());
    assert_eq!(repo.get_by_id(&2).await.unwrap(), Some(Widget::new(2, "b")));
}

#[tokio::test]
async fn widget_upsert_and_enumeration() {
    let repo = Repository::new(VecProvider::default());

    repo.update_many(vec![Widget::new(1, "a"), Widget::new(2, "b")])
        .await
        .unwrap();
    assert_eq!(repo.count().await.unwrap(), 2);

    // replacement is total, not a merge
    repo.update(Widget::new(2, "bb")).await.unwrap();
    assert_eq!(repo.get_by_id(&2).await.unwrap().unwrap().name, "bb");

    let all = repo.find_all().await.unwrap().to_vec().await.unwrap();
    assert_eq!(all.len(), 2);

    repo.delete_all().await.unwrap();
    assert_eq!(repo.count().await.unwrap(), 0);
}
