use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Identity key. Uniqueness is case-insensitive, enforced by a NOCASE
    /// unique index created in the initial migration.
    pub email: String,

    /// Argon2id password hash
    pub password_hash: String,

    pub first_name: String,

    pub last_name: String,

    /// Sellers may create and manage products.
    pub is_seller: bool,

    pub is_active: bool,

    pub is_staff: bool,

    pub is_superuser: bool,

    pub date_joined: DateTimeUtc,

    pub last_login: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::products::Entity")]
    Products,

    #[sea_orm(has_one = "super::auth_tokens::Entity")]
    AuthTokens,
}

impl Related<super::products::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Products.def()
    }
}

impl Related<super::auth_tokens::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AuthTokens.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
