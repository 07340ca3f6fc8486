use crate::entities::dataset::{self, Entity as DatasetEntity};
use crate::entities::server::{self, Entity as ServerEntity};
use crate::entities::theme::{self, Entity as ThemeEntity};
use crate::error::{CatalogError, CatalogResult};
use chrono::Utc;
use database::repository::BaseRepository;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, Condition, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use uuid::Uuid;

/// Axis-aligned bounding box in EPSG:4326, matching the storage convention
/// used for `dataset.bbox_*` columns.
#[derive(Clone, Copy, Debug)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

#[derive(Clone, Copy, Debug)]
pub enum SpatialPredicate {
    Intersects,
    Contains,
    Within,
}

#[derive(Clone)]
pub struct ServerRepository {
    base: BaseRepository<ServerEntity>,
}

impl ServerRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        self.base.db()
    }

    pub async fn find_by_id(&self, id: Uuid) -> CatalogResult<server::Model> {
        self.base
            .find_by_id(id)
            .await?
            .ok_or(CatalogError::ServerNotFound(id))
    }

    pub async fn find_all(&self) -> CatalogResult<Vec<server::Model>> {
        Ok(self.base.find_all().await?)
    }

    pub async fn insert(&self, model: server::ActiveModel) -> CatalogResult<server::Model> {
        Ok(self.base.insert(model).await?)
    }

    pub async fn update(&self, model: server::ActiveModel) -> CatalogResult<server::Model> {
        Ok(self.base.update(model).await?)
    }

    pub async fn set_health(
        &self,
        id: Uuid,
        health: server::ServerHealth,
    ) -> CatalogResult<server::Model> {
        let mut model: server::ActiveModel = self.find_by_id(id).await?.into();
        model.health = Set(health);
        model.updated_at = Set(Utc::now().into());
        Ok(self.base.update(model).await?)
    }
}

#[derive(Clone)]
pub struct DatasetRepository {
    base: BaseRepository<DatasetEntity>,
}

impl DatasetRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        self.base.db()
    }

    pub async fn find_by_id(&self, id: Uuid) -> CatalogResult<dataset::Model> {
        self.base
            .find_by_id(id)
            .await?
            .ok_or(CatalogError::DatasetNotFound(id))
    }

    pub async fn insert(&self, model: dataset::ActiveModel) -> CatalogResult<dataset::Model> {
        Ok(self.base.insert(model).await?)
    }

    pub async fn update(&self, model: dataset::ActiveModel) -> CatalogResult<dataset::Model> {
        Ok(self.base.update(model).await?)
    }

    /// Upserts a dataset keyed by (server_id, access_url), the natural key
    /// for crawl discovery. Returns the stored model and whether a new row
    /// was created (vs. an existing one updated).
    pub async fn upsert_by_access_url(
        &self,
        server_id: Uuid,
        access_url: &str,
        build: impl FnOnce(Option<&dataset::Model>) -> dataset::ActiveModel,
    ) -> CatalogResult<(dataset::Model, bool)> {
        let existing = DatasetEntity::find()
            .filter(dataset::Column::ServerId.eq(server_id))
            .filter(dataset::Column::AccessUrl.eq(access_url))
            .one(self.db())
            .await
            .map_err(database::common::DatabaseError::from)?;

        let is_new = existing.is_none();
        let active = build(existing.as_ref());
        let saved = if is_new {
            self.insert(active).await?
        } else {
            self.update(active).await?
        };
        Ok((saved, is_new))
    }

    /// Lists datasets matching a spatial predicate against their stored
    /// bbox. Datasets with no recorded bbox never match.
    pub async fn list_by_bbox(
        &self,
        bbox: BoundingBox,
        predicate: SpatialPredicate,
    ) -> CatalogResult<Vec<dataset::Model>> {
        let mut condition = Condition::all()
            .add(dataset::Column::BboxMinX.is_not_null())
            .add(dataset::Column::BboxMinY.is_not_null())
            .add(dataset::Column::BboxMaxX.is_not_null())
            .add(dataset::Column::BboxMaxY.is_not_null());

        condition = match predicate {
            SpatialPredicate::Intersects => condition
                .add(dataset::Column::BboxMinX.lte(bbox.max_x))
                .add(dataset::Column::BboxMaxX.gte(bbox.min_x))
                .add(dataset::Column::BboxMinY.lte(bbox.max_y))
                .add(dataset::Column::BboxMaxY.gte(bbox.min_y)),
            SpatialPredicate::Contains => condition
                .add(dataset::Column::BboxMinX.lte(bbox.min_x))
                .add(dataset::Column::BboxMaxX.gte(bbox.max_x))
                .add(dataset::Column::BboxMinY.lte(bbox.min_y))
                .add(dataset::Column::BboxMaxY.gte(bbox.max_y)),
            SpatialPredicate::Within => condition
                .add(dataset::Column::BboxMinX.gte(bbox.min_x))
                .add(dataset::Column::BboxMaxX.lte(bbox.max_x))
                .add(dataset::Column::BboxMinY.gte(bbox.min_y))
                .add(dataset::Column::BboxMaxY.lte(bbox.max_y)),
        };

        Ok(DatasetEntity::find()
            .filter(condition)
            .order_by_asc(dataset::Column::Name)
            .all(self.db())
            .await
            .map_err(database::common::DatabaseError::from)?)
    }

    /// Free-text search across name, description, keywords and themes.
    pub async fn search_text(&self, query: &str, limit: u64) -> CatalogResult<Vec<dataset::Model>> {
        let pattern = format!("%{}%", query.to_lowercase());
        let condition = Condition::any()
            .add(Expr::cust("lower(name)").like(pattern.as_str()))
            .add(Expr::cust("lower(coalesce(description, ''))").like(pattern.as_str()))
            .add(Expr::cust("lower(array_to_string(keywords, ' '))").like(pattern.as_str()))
            .add(Expr::cust("lower(array_to_string(themes, ' '))").like(pattern.as_str()));

        Ok(DatasetEntity::find()
            .filter(dataset::Column::Active.eq(true))
            .filter(condition)
            .order_by_asc(dataset::Column::Name)
            .limit(limit)
            .all(self.db())
            .await
            .map_err(database::common::DatabaseError::from)?)
    }

    /// Counts active datasets per theme code (a dataset with N themes
    /// contributes to N facet counts).
    pub async fn theme_facet_counts(&self) -> CatalogResult<Vec<(String, i64)>> {
        let datasets = DatasetEntity::find()
            .filter(dataset::Column::Active.eq(true))
            .all(self.db())
            .await
            .map_err(database::common::DatabaseError::from)?;

        let mut counts: std::collections::BTreeMap<String, i64> = std::collections::BTreeMap::new();
        for d in &datasets {
            for theme in &d.themes {
                *counts.entry(theme.clone()).or_insert(0) += 1;
            }
        }
        Ok(counts.into_iter().collect())
    }

    pub async fn count_for_server(&self, server_id: Uuid) -> CatalogResult<u64> {
        Ok(DatasetEntity::find()
            .filter(dataset::Column::ServerId.eq(server_id))
            .count(self.db())
            .await
            .map_err(database::common::DatabaseError::from)?)
    }
}

#[derive(Clone)]
pub struct ThemeRepository {
    db: DatabaseConnection,
}

impl ThemeRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_all(&self) -> CatalogResult<Vec<theme::Model>> {
        Ok(ThemeEntity::find()
            .all(&self.db)
            .await
            .map_err(database::common::DatabaseError::from)?)
    }

    pub async fn find_by_code(&self, code: &str) -> CatalogResult<Option<theme::Model>> {
        Ok(ThemeEntity::find_by_id(code.to_string())
            .one(&self.db)
            .await
            .map_err(database::common::DatabaseError::from)?)
    }
}
