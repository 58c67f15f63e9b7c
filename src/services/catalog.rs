use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, Func, LikeExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, FromQueryResult, JoinType, ModelTrait,
    Order, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::db::DbPool;
use crate::entities::{category, product};
use crate::errors::ServiceError;

/// Product as rendered over the API: entity columns plus the resolved
/// category name. `category` carries the category id.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductView {
    pub id: Uuid,
    pub title: String,
    pub image_url: String,
    pub new_price: Decimal,
    pub prev_price: Option<Decimal>,
    pub company: String,
    pub category: Uuid,
    pub category_name: Option<String>,
    pub reviews: String,
    pub rating: i32,
    pub quantity: i32,
    pub is_new: bool,
    pub has_discount: bool,
    pub created_at: DateTime<Utc>,
}

impl From<(product::Model, Option<category::Model>)> for ProductView {
    fn from((product, category): (product::Model, Option<category::Model>)) -> Self {
        Self {
            id: product.id,
            title: product.title,
            image_url: product.image_url,
            new_price: product.new_price,
            prev_price: product.prev_price,
            company: product.company,
            category: product.category_id,
            category_name: category.map(|c| c.name),
            reviews: product.reviews,
            rating: product.rating,
            quantity: product.quantity,
            is_new: product.is_new,
            has_discount: product.has_discount,
            created_at: product.created_at,
        }
    }
}

/// Query parameters accepted by the product list endpoint. Numeric
/// bounds deserialize strictly, so malformed input is rejected at the
/// extractor instead of being silently ignored.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ProductFilter {
    /// Inclusive lower bound on `new_price`
    pub price_min: Option<Decimal>,
    /// Inclusive upper bound on `new_price`
    pub price_max: Option<Decimal>,
    /// Case-insensitive exact match on the category name
    pub category: Option<String>,
    /// Case-insensitive substring match on title or company
    pub search: Option<String>,
    /// Sort field, `-` prefix for descending
    pub ordering: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateProductInput {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Title must be between 1 and 255 characters"
    ))]
    pub title: String,
    #[serde(default)]
    pub image_url: String,
    pub new_price: Decimal,
    pub prev_price: Option<Decimal>,
    #[validate(length(max = 100, message = "Company cannot exceed 100 characters"))]
    #[serde(default)]
    pub company: String,
    pub category: Uuid,
    #[serde(default)]
    pub reviews: String,
    #[validate(range(min = 0, max = 5, message = "Rating must be between 0 and 5"))]
    #[serde(default)]
    pub rating: i32,
    #[serde(default)]
    pub quantity: i32,
    #[serde(default)]
    pub is_new: bool,
    #[serde(default)]
    pub has_discount: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProductInput {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Title must be between 1 and 255 characters"
    ))]
    pub title: Option<String>,
    pub image_url: Option<String>,
    pub new_price: Option<Decimal>,
    pub prev_price: Option<Decimal>,
    #[validate(length(max = 100, message = "Company cannot exceed 100 characters"))]
    pub company: Option<String>,
    pub category: Option<Uuid>,
    pub reviews: Option<String>,
    #[validate(range(min = 0, max = 5, message = "Rating must be between 0 and 5"))]
    pub rating: Option<i32>,
    pub quantity: Option<i32>,
    pub is_new: Option<bool>,
    pub has_discount: Option<bool>,
}

/// Category with its live product count.
#[derive(Debug, Clone, Serialize, Deserialize, FromQueryResult, ToSchema)]
pub struct CategoryView {
    pub id: Uuid,
    pub name: String,
    pub product_count: i64,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CategoryInput {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,
}

/// Read/write access to products and categories.
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DbPool>,
}

impl CatalogService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Lists products with optional filtering, search, and ordering.
    /// Unfiltered listings come back newest first.
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        filter: &ProductFilter,
    ) -> Result<Vec<ProductView>, ServiceError> {
        let mut query = product::Entity::find().find_also_related(category::Entity);

        if let Some(min) = filter.price_min {
            query = query.filter(product::Column::NewPrice.gte(min));
        }
        if let Some(max) = filter.price_max {
            query = query.filter(product::Column::NewPrice.lte(max));
        }
        if let Some(name) = filter.category.as_deref().filter(|s| !s.is_empty()) {
            query = query.filter(
                Expr::expr(Func::lower(Expr::col((
                    category::Entity,
                    category::Column::Name,
                ))))
                .eq(name.to_lowercase()),
            );
        }
        if let Some(term) = filter.search.as_deref().filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", escape_like(&term.to_lowercase()));
            query = query.filter(
                Condition::any()
                    .add(
                        Expr::expr(Func::lower(Expr::col((
                            product::Entity,
                            product::Column::Title,
                        ))))
                        .like(LikeExpr::new(pattern.as_str()).escape('\\')),
                    )
                    .add(
                        Expr::expr(Func::lower(Expr::col((
                            product::Entity,
                            product::Column::Company,
                        ))))
                        .like(LikeExpr::new(pattern.as_str()).escape('\\')),
                    ),
            );
        }

        let (column, direction) = match filter.ordering.as_deref() {
            Some(raw) => parse_ordering(raw)?,
            None => (product::Column::CreatedAt, Order::Desc),
        };
        query = query.order_by(column, direction);

        let rows = query.all(&*self.db).await?;
        Ok(rows.into_iter().map(ProductView::from).collect())
    }

    #[instrument(skip(self))]
    pub async fn get_product(&self, id: Uuid) -> Result<ProductView, ServiceError> {
        product::Entity::find_by_id(id)
            .find_also_related(category::Entity)
            .one(&*self.db)
            .await?
            .map(ProductView::from)
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))
    }

    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn create_product(
        &self,
        input: CreateProductInput,
    ) -> Result<ProductView, ServiceError> {
        let category = self.require_category(input.category).await?;

        let model = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(input.title),
            image_url: Set(input.image_url),
            new_price: Set(input.new_price),
            prev_price: Set(input.prev_price),
            company: Set(input.company),
            category_id: Set(input.category),
            reviews: Set(input.reviews),
            rating: Set(input.rating),
            quantity: Set(input.quantity),
            is_new: Set(input.is_new),
            has_discount: Set(input.has_discount),
            ..Default::default()
        };

        let product = model.insert(&*self.db).await?;
        info!("Created product: {}", product.id);
        Ok(ProductView::from((product, Some(category))))
    }

    #[instrument(skip(self, input))]
    pub async fn update_product(
        &self,
        id: Uuid,
        input: UpdateProductInput,
    ) -> Result<ProductView, ServiceError> {
        let existing = product::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))?;

        if let Some(category_id) = input.category {
            self.require_category(category_id).await?;
        }

        let mut model: product::ActiveModel = existing.into();
        if let Some(title) = input.title {
            model.title = Set(title);
        }
        if let Some(image_url) = input.image_url {
            model.image_url = Set(image_url);
        }
        if let Some(new_price) = input.new_price {
            model.new_price = Set(new_price);
        }
        if let Some(prev_price) = input.prev_price {
            model.prev_price = Set(Some(prev_price));
        }
        if let Some(company) = input.company {
            model.company = Set(company);
        }
        if let Some(category_id) = input.category {
            model.category_id = Set(category_id);
        }
        if let Some(reviews) = input.reviews {
            model.reviews = Set(reviews);
        }
        if let Some(rating) = input.rating {
            model.rating = Set(rating);
        }
        if let Some(quantity) = input.quantity {
            model.quantity = Set(quantity);
        }
        if let Some(is_new) = input.is_new {
            model.is_new = Set(is_new);
        }
        if let Some(has_discount) = input.has_discount {
            model.has_discount = Set(has_discount);
        }

        let updated = model.update(&*self.db).await?;
        self.get_product(updated.id).await
    }

    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = product::Entity::delete_by_id(id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Product {} not found", id)));
        }
        info!("Deleted product: {}", id);
        Ok(())
    }

    /// Lists categories alphabetically with their product counts.
    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<CategoryView>, ServiceError> {
        let categories = category::Entity::find()
            .select_only()
            .column(category::Column::Id)
            .column(category::Column::Name)
            .column_as(product::Column::Id.count(), "product_count")
            .join(JoinType::LeftJoin, category::Relation::Products.def())
            .group_by(category::Column::Id)
            .group_by(category::Column::Name)
            .order_by(category::Column::Name, Order::Asc)
            .into_model::<CategoryView>()
            .all(&*self.db)
            .await?;
        Ok(categories)
    }

    #[instrument(skip(self))]
    pub async fn get_category(&self, id: Uuid) -> Result<CategoryView, ServiceError> {
        let category = self.require_category(id).await?;
        let product_count = category
            .find_related(product::Entity)
            .count(&*self.db)
            .await? as i64;
        Ok(CategoryView {
            id: category.id,
            name: category.name,
            product_count,
        })
    }

    #[instrument(skip(self))]
    pub async fn create_category(&self, input: CategoryInput) -> Result<CategoryView, ServiceError> {
        let exists = category::Entity::find()
            .filter(category::Column::Name.eq(input.name.as_str()))
            .one(&*self.db)
            .await?;
        if exists.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Category '{}' already exists",
                input.name
            )));
        }

        let model = category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
        };
        let created = model.insert(&*self.db).await?;
        info!("Created category: {}", created.id);
        Ok(CategoryView {
            id: created.id,
            name: created.name,
            product_count: 0,
        })
    }

    #[instrument(skip(self))]
    pub async fn update_category(
        &self,
        id: Uuid,
        input: CategoryInput,
    ) -> Result<CategoryView, ServiceError> {
        let existing = self.require_category(id).await?;

        let clash = category::Entity::find()
            .filter(category::Column::Name.eq(input.name.as_str()))
            .filter(category::Column::Id.ne(id))
            .one(&*self.db)
            .await?;
        if clash.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Category '{}' already exists",
                input.name
            )));
        }

        let mut model: category::ActiveModel = existing.into();
        model.name = Set(input.name);
        model.update(&*self.db).await?;
        self.get_category(id).await
    }

    /// Deletes a category; its products go with it via the cascade.
    #[instrument(skip(self))]
    pub async fn delete_category(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = category::Entity::delete_by_id(id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Category {} not found",
                id
            )));
        }
        info!("Deleted category: {}", id);
        Ok(())
    }

    async fn require_category(&self, id: Uuid) -> Result<category::Model, ServiceError> {
        category::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::InvalidInput(format!("Category {} does not exist", id)))
    }
}

/// Escapes LIKE metacharacters so a search term matches literally.
fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Maps an `ordering` query value to a sortable column. Only fields the
/// API documents are accepted; anything else is a validation error.
fn parse_ordering(raw: &str) -> Result<(product::Column, Order), ServiceError> {
    let (field, direction) = match raw.strip_prefix('-') {
        Some(field) => (field, Order::Desc),
        None => (raw, Order::Asc),
    };

    let column = match field {
        "new_price" => product::Column::NewPrice,
        "rating" => product::Column::Rating,
        "title" => product::Column::Title,
        "created_at" => product::Column::CreatedAt,
        other => {
            return Err(ServiceError::InvalidInput(format!(
                "Unknown ordering field: {}",
                other
            )))
        }
    };

    Ok((column, direction))
}
