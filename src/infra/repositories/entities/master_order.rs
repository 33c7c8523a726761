use sea_orm::entity::prelude::*;

use domain::{MasterOrder, OrderStatus};

use crate::errors::AppError;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "master_orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub order_number: String,
    pub product_name: String,
    pub product_code: Option<String>,
    pub quantity: i32,
    pub order_date: Date,
    pub due_date: Date,
    pub status: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for MasterOrder {
    type Error = AppError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let status: OrderStatus = model
            .status
            .parse()
            .map_err(|e| AppError::internal(format!("order {}: {}", model.id, e)))?;

        Ok(MasterOrder {
            id: model.id,
            order_number: model.order_number,
            product_name: model.product_name,
            product_code: model.product_code,
            quantity: model.quantity,
            order_date: model.order_date,
            due_date: model.due_date,
            status,
            notes: model.notes,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
