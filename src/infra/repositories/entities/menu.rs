use sea_orm::entity::prelude::*;

use domain::Menu;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "menus")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub title: String,
    pub route: Option<String>,
    pub icon: Option<String>,
    pub permission: Option<String>,
    pub position: i32,
    pub is_active: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Menu {
    fn from(model: Model) -> Self {
        Menu {
            id: model.id,
            parent_id: model.parent_id,
            title: model.title,
            route: model.route,
            icon: model.icon,
            permission: model.permission,
            position: model.position,
            is_active: model.is_active,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
