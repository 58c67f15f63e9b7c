use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, Order as SortOrder,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::db::DbPool;
use crate::entities::{delivery_address, order, order_item, product};
use crate::errors::ServiceError;

/// One line of an order as rendered over the API. `product` is the
/// product id; `price` is the unit price captured at purchase time.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItemView {
    pub product: Uuid,
    pub quantity: i32,
    pub price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderView {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItemView>,
}

impl OrderView {
    fn from_rows(order: order::Model, items: Vec<order_item::Model>) -> Self {
        Self {
            id: order.id,
            created_at: order.created_at,
            items: items
                .into_iter()
                .map(|item| OrderItemView {
                    product: item.product_id,
                    quantity: item.quantity,
                    price: item.price,
                })
                .collect(),
        }
    }
}

/// Requested order line. The client never supplies a price; the unit
/// price is read from the product row when the order is created.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct OrderItemInput {
    pub product: Uuid,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateOrderInput {
    #[validate(length(min = 1, message = "Order must contain at least one item"))]
    pub items: Vec<OrderItemInput>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AddressInput {
    #[validate(length(min = 1, max = 255, message = "Address is required"))]
    pub address: String,
    #[validate(length(min = 1, max = 100, message = "City is required"))]
    pub city: String,
    #[validate(length(min = 1, max = 20, message = "Postal code is required"))]
    pub postal_code: String,
    #[validate(length(min = 1, max = 30, message = "Phone is required"))]
    pub phone: String,
}

/// Checkout payload: delivery details plus the requested items, applied
/// in one transaction.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct PlaceOrderInput {
    #[validate(length(min = 1, max = 255, message = "Address is required"))]
    pub address: String,
    #[validate(length(min = 1, max = 100, message = "City is required"))]
    pub city: String,
    #[validate(length(min = 1, max = 20, message = "Postal code is required"))]
    pub postal_code: String,
    #[validate(length(min = 1, max = 30, message = "Phone is required"))]
    pub phone: String,
    #[validate(length(min = 1, message = "Order must contain at least one item"))]
    pub items: Vec<OrderItemInput>,
}

/// Orders and delivery addresses, always scoped to the calling user
/// except for the staff-only full listing.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DbPool>,
}

impl OrderService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Creates an order for the user, pricing each line from the
    /// current product row inside a transaction.
    #[instrument(skip(self, input), fields(item_count = input.items.len()))]
    pub async fn create_order(
        &self,
        user_id: Uuid,
        input: CreateOrderInput,
    ) -> Result<OrderView, ServiceError> {
        let txn = self.db.begin().await?;
        let view = create_order_on(&txn, user_id, &input.items).await?;
        txn.commit().await?;

        info!("Created order {} for user {}", view.id, user_id);
        Ok(view)
    }

    /// Lists the user's own orders, oldest first.
    #[instrument(skip(self))]
    pub async fn list_orders(&self, user_id: Uuid) -> Result<Vec<OrderView>, ServiceError> {
        let rows = order::Entity::find()
            .filter(order::Column::UserId.eq(user_id))
            .order_by(order::Column::CreatedAt, SortOrder::Asc)
            .find_with_related(order_item::Entity)
            .all(&*self.db)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(order, items)| OrderView::from_rows(order, items))
            .collect())
    }

    /// Fetches one of the user's orders. Another user's order id is
    /// indistinguishable from a missing one.
    #[instrument(skip(self))]
    pub async fn get_order(&self, user_id: Uuid, order_id: Uuid) -> Result<OrderView, ServiceError> {
        let mut rows = order::Entity::find()
            .filter(order::Column::Id.eq(order_id))
            .filter(order::Column::UserId.eq(user_id))
            .find_with_related(order_item::Entity)
            .all(&*self.db)
            .await?;

        match rows.pop() {
            Some((order, items)) => Ok(OrderView::from_rows(order, items)),
            None => Err(ServiceError::NotFound(format!(
                "Order {} not found",
                order_id
            ))),
        }
    }

    /// Deletes one of the user's orders; items go with it via the cascade.
    #[instrument(skip(self))]
    pub async fn delete_order(&self, user_id: Uuid, order_id: Uuid) -> Result<(), ServiceError> {
        let result = order::Entity::delete_many()
            .filter(order::Column::Id.eq(order_id))
            .filter(order::Column::UserId.eq(user_id))
            .exec(&*self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Order {} not found",
                order_id
            )));
        }
        info!("Deleted order {} for user {}", order_id, user_id);
        Ok(())
    }

    /// Staff-only listing of every order, newest first.
    #[instrument(skip(self))]
    pub async fn list_all_orders(&self) -> Result<Vec<OrderView>, ServiceError> {
        let rows = order::Entity::find()
            .order_by(order::Column::CreatedAt, SortOrder::Desc)
            .find_with_related(order_item::Entity)
            .all(&*self.db)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(order, items)| OrderView::from_rows(order, items))
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn count_orders(&self, user_id: Uuid) -> Result<u64, ServiceError> {
        let count = order::Entity::find()
            .filter(order::Column::UserId.eq(user_id))
            .count(&*self.db)
            .await?;
        Ok(count)
    }

    /// Returns the user's delivery address, if one has been saved.
    #[instrument(skip(self))]
    pub async fn get_address(
        &self,
        user_id: Uuid,
    ) -> Result<Option<delivery_address::Model>, ServiceError> {
        let address = delivery_address::Entity::find()
            .filter(delivery_address::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?;
        Ok(address)
    }

    /// Creates or updates the user's single delivery address.
    #[instrument(skip(self, input))]
    pub async fn upsert_address(
        &self,
        user_id: Uuid,
        input: AddressInput,
    ) -> Result<delivery_address::Model, ServiceError> {
        upsert_address_on(&*self.db, user_id, &input).await
    }

    /// Checkout: saves the delivery address and creates the order in a
    /// single transaction, so a failed order never leaves a half-saved
    /// address change behind.
    #[instrument(skip(self, input), fields(item_count = input.items.len()))]
    pub async fn place_order(
        &self,
        user_id: Uuid,
        input: PlaceOrderInput,
    ) -> Result<OrderView, ServiceError> {
        let address = AddressInput {
            address: input.address,
            city: input.city,
            postal_code: input.postal_code,
            phone: input.phone,
        };

        let txn = self.db.begin().await?;
        upsert_address_on(&txn, user_id, &address).await?;
        let view = create_order_on(&txn, user_id, &input.items).await?;
        txn.commit().await?;

        info!("Placed order {} for user {}", view.id, user_id);
        Ok(view)
    }
}

async fn create_order_on<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    items: &[OrderItemInput],
) -> Result<OrderView, ServiceError> {
    if items.is_empty() {
        return Err(ServiceError::ValidationError(
            "Order must contain at least one item".to_string(),
        ));
    }

    let order = order::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        ..Default::default()
    }
    .insert(conn)
    .await?;

    let mut views = Vec::with_capacity(items.len());
    for item in items {
        if item.quantity < 1 {
            return Err(ServiceError::ValidationError(
                "Quantity must be at least 1".to_string(),
            ));
        }

        let product = product::Entity::find_by_id(item.product)
            .one(conn)
            .await?
            .ok_or_else(|| {
                ServiceError::InvalidInput(format!("Product {} does not exist", item.product))
            })?;

        let row = order_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(product.id),
            quantity: Set(item.quantity),
            price: Set(product.new_price),
        }
        .insert(conn)
        .await?;

        views.push(row);
    }

    Ok(OrderView::from_rows(order, views))
}

async fn upsert_address_on<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    input: &AddressInput,
) -> Result<delivery_address::Model, ServiceError> {
    let existing = delivery_address::Entity::find()
        .filter(delivery_address::Column::UserId.eq(user_id))
        .one(conn)
        .await?;

    let saved = match existing {
        Some(current) => {
            let mut model: delivery_address::ActiveModel = current.into();
            model.address = Set(input.address.clone());
            model.city = Set(input.city.clone());
            model.postal_code = Set(input.postal_code.clone());
            model.phone = Set(input.phone.clone());
            model.update(conn).await?
        }
        None => {
            delivery_address::ActiveModel {
                id: Set(Uuid::new_v4()),
                user_id: Set(user_id),
                address: Set(input.address.clone()),
                city: Set(input.city.clone()),
                postal_code: Set(input.postal_code.clone()),
                phone: Set(input.phone.clone()),
            }
            .insert(conn)
            .await?
        }
    };

    Ok(saved)
}
