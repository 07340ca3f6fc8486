//! Generic SeaORM repository helper shared by domain crates.
//!
//! Domain crates define their own entities and wrap this in a thin,
//! domain-specific repository that adds query methods beyond CRUD.

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, DeleteResult, EntityTrait, IntoActiveModel, PrimaryKeyTrait,
};
use uuid::Uuid;

use crate::common::{DatabaseError, DatabaseResult};

/// Marker for entities keyed by a UUID primary key.
///
/// SeaORM entities whose `PrimaryKey` resolves to `Uuid` implement this
/// automatically via the blanket impl below; domain crates never implement
/// it by hand.
pub trait UuidEntity: EntityTrait
where
    <Self as EntityTrait>::PrimaryKey: PrimaryKeyTrait<ValueType = Uuid>,
{
}

impl<E> UuidEntity for E
where
    E: EntityTrait,
    E::PrimaryKey: PrimaryKeyTrait<ValueType = Uuid>,
{
}

/// Thin CRUD wrapper around a SeaORM entity and a shared connection.
///
/// Intentionally minimal: domain crates compose their own query methods on
/// top rather than growing this into a generic query builder.
#[derive(Clone)]
pub struct BaseRepository<E: UuidEntity> {
    db: DatabaseConnection,
    _entity: std::marker::PhantomData<E>,
}

impl<E: UuidEntity> BaseRepository<E> {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            _entity: std::marker::PhantomData,
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<E::Model>> {
        E::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(DatabaseError::from)
    }

    pub async fn find_all(&self) -> DatabaseResult<Vec<E::Model>> {
        E::find().all(&self.db).await.map_err(DatabaseError::from)
    }

    pub async fn insert<A>(&self, model: A) -> DatabaseResult<E::Model>
    where
        A: ActiveModelTrait<Entity = E> + Send,
    {
        model.insert(&self.db).await.map_err(DatabaseError::from)
    }

    pub async fn update<A>(&self, model: A) -> DatabaseResult<E::Model>
    where
        A: ActiveModelTrait<Entity = E> + Send,
    {
        model.update(&self.db).await.map_err(DatabaseError::from)
    }

    pub async fn delete_by_id(&self, id: Uuid) -> DatabaseResult<DeleteResult> {
        E::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(DatabaseError::from)
    }

    pub async fn save_model(&self, model: E::Model) -> DatabaseResult<E::Model>
    where
        E::Model: IntoActiveModel<E::ActiveModel>,
    {
        model
            .into_active_model()
            .update(&self.db)
            .await
            .map_err(DatabaseError::from)
    }
}

/// Repositories that expose a typed existence check beyond the generic find.
#[async_trait]
pub trait ExistsBy<K: Send + Sync> {
    async fn exists_by(&self, key: K) -> DatabaseResult<bool>;
}
