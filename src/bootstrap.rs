use log::{info, warn};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use crate::config::AppConfig;
use crate::entity::user::{self, ROLE_ADMIN};
use crate::error::AppError;
use crate::routes::user::{create_account, CreateAccountRequest};

/// Creates the configured administrator when the store has none yet.
/// Returns whether an account was created.
pub async fn ensure_admin(db: &DatabaseConnection, config: &AppConfig) -> Result<bool, AppError> {
    let Some(admin) = config.bootstrap_admin.as_ref() else {
        return Ok(false);
    };
    let existing = user::Entity::find()
        .filter(user::Column::Role.eq(ROLE_ADMIN))
        .one(db)
        .await?;
    if existing.is_some() {
        return Ok(false);
    }

    let request = CreateAccountRequest {
        first_name: None,
        last_name: None,
        email: Some(admin.email.clone()),
        username: Some(admin.username.clone()),
        password: Some(admin.password.clone()),
        phone_number: None,
    };
    match create_account(db, &request, ROLE_ADMIN).await {
        Ok(created) => {
            info!("bootstrap admin {} created", created.username);
            Ok(true)
        }
        Err(e) => {
            warn!("bootstrap admin rejected: {:?}", e);
            Err(e)
        }
    }
}
