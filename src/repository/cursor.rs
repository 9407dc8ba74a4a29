use crate::entity::Entity;
use crate::errors::{RepoError, RepoResult};
use futures::stream::{Stream, TryStreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};

/// A lazy, typed cursor over entities matching a query.
///
/// # Purpose
/// Exposes query results as a stream so callers can compose further filtering
/// and projection without the repository knowing about it. Documents are
/// fetched and deserialized only as the cursor is driven; re-issuing the
/// originating `find` restarts the enumeration.
///
/// # Characteristics
/// - Implements [`futures::Stream`] with `Item = RepoResult<T>` for combinator
///   composition
/// - `first` and `to_vec` are conveniences that consume the cursor
/// - Driver errors raised mid-iteration surface unchanged as stream items
pub struct EntityCursor<T> {
    inner: Pin<Box<dyn Stream<Item = RepoResult<T>> + Send>>,
}

impl<T> EntityCursor<T>
where
    T: Entity,
{
    /// Wraps any fallible entity stream in a cursor.
    pub fn new(stream: impl Stream<Item = RepoResult<T>> + Send + 'static) -> Self {
        EntityCursor {
            inner: Box::pin(stream),
        }
    }

    pub(crate) fn from_driver(cursor: mongodb::Cursor<T>) -> Self {
        EntityCursor::new(cursor.map_err(RepoError::from))
    }

    /// Advances the cursor, returning the next entity if any remain.
    pub async fn try_next(&mut self) -> RepoResult<Option<T>> {
        self.inner.try_next().await
    }

    /// Consumes the cursor and returns its first entity, if any.
    pub async fn first(mut self) -> RepoResult<Option<T>> {
        self.try_next().await
    }

    /// Drains the cursor into a vector.
    pub async fn to_vec(self) -> RepoResult<Vec<T>> {
        self.inner.try_collect().await
    }
}

impl<T> Stream for EntityCursor<T>
where
    T: Entity,
{
    type Item = RepoResult<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().inner.as_mut().poll_next(cx)
    }
}
