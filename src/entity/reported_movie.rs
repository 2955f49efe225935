use sea_orm::entity::prelude::*;

pub const APPROVAL_PENDING: &str = "PENDING";
pub const APPROVAL_APPROVED: &str = "APPROVED";
pub const APPROVAL_REJECTED: &str = "REJECTED";

pub const APPROVAL_CHOICES: [&str; 3] = [APPROVAL_PENDING, APPROVAL_APPROVED, APPROVAL_REJECTED];

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "t_reported_movie")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub movie_id: i32,
    pub reported_by: i32,
    #[sea_orm(column_type = "Text")]
    pub reason: String,
    pub acknowledged: bool,
    pub admin_approval: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
