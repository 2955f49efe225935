//! Ownership and role checks consulted before any mutation reaches the store.

use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, Select};

use crate::auth::AuthUser;
use crate::entity::{movie, rating, user};
use crate::error::AppError;

/// Row visibility for list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    All,
    Owner(i32),
}

impl Scope {
    pub fn for_user(auth: &AuthUser) -> Self {
        if auth.is_admin() {
            Scope::All
        } else {
            Scope::Owner(auth.user_id)
        }
    }

    pub fn apply<E: EntityTrait>(self, select: Select<E>, owner: E::Column) -> Select<E> {
        match self {
            Scope::All => select,
            Scope::Owner(id) => select.filter(owner.eq(id)),
        }
    }
}

pub fn ensure_movie_owner(auth: &AuthUser, movie: &movie::Model) -> Result<(), AppError> {
    if movie.created_by == Some(auth.user_id) {
        Ok(())
    } else {
        Err(AppError::not_permitted(
            "You are only permitted to update movies that you own",
        ))
    }
}

pub fn ensure_rating_owner(auth: &AuthUser, rating: &rating::Model) -> Result<(), AppError> {
    if rating.user_id == auth.user_id {
        Ok(())
    } else {
        Err(AppError::not_permitted(
            "You are only permitted to update rank for the movies that you own",
        ))
    }
}

pub fn ensure_admin(auth: &AuthUser, msg: &str) -> Result<(), AppError> {
    if auth.is_admin() {
        Ok(())
    } else {
        Err(AppError::not_permitted(msg))
    }
}

pub fn ensure_self(auth: &AuthUser, target: &user::Model) -> Result<(), AppError> {
    if target.id == auth.user_id {
        Ok(())
    } else {
        Err(AppError::not_permitted("Access denied"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use sea_orm::{DbBackend, QueryTrait};

    fn principal(id: i32, role: &str) -> AuthUser {
        AuthUser {
            user_id: id,
            role: role.to_string(),
            username: format!("user{}", id),
        }
    }

    fn movie_by(created_by: Option<i32>) -> movie::Model {
        let now = Utc::now();
        movie::Model {
            id: 1,
            name: "Iron Man".into(),
            description: "An epic science fiction adventure".into(),
            released_at: NaiveDate::from_ymd_opt(2008, 5, 2).unwrap(),
            duration: 126,
            genre: "Science Fiction".into(),
            language: "English".into(),
            created_by,
            avg_rating: 0.0,
            total_rating: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn only_creator_updates_movie() {
        let movie = movie_by(Some(3));
        assert!(ensure_movie_owner(&principal(3, user::ROLE_USER), &movie).is_ok());
        assert!(ensure_movie_owner(&principal(4, user::ROLE_USER), &movie).is_err());
        // admins get no bypass and orphaned movies have no owner
        assert!(ensure_movie_owner(&principal(4, user::ROLE_ADMIN), &movie).is_err());
        assert!(ensure_movie_owner(&principal(3, user::ROLE_USER), &movie_by(None)).is_err());
    }

    #[test]
    fn only_rater_updates_rating() {
        let now = Utc::now();
        let rating = rating::Model {
            id: 9,
            user_id: 5,
            movie_id: 1,
            rating: 3,
            created_at: now,
            updated_at: now,
        };
        assert!(ensure_rating_owner(&principal(5, user::ROLE_USER), &rating).is_ok());
        assert!(ensure_rating_owner(&principal(6, user::ROLE_ADMIN), &rating).is_err());
    }

    #[test]
    fn admin_gate() {
        assert!(ensure_admin(&principal(1, user::ROLE_ADMIN), "no").is_ok());
        assert!(ensure_admin(&principal(1, user::ROLE_USER), "no").is_err());
    }

    #[test]
    fn scope_filters_non_admins() {
        assert_eq!(Scope::for_user(&principal(1, user::ROLE_ADMIN)), Scope::All);
        assert_eq!(Scope::for_user(&principal(2, user::ROLE_USER)), Scope::Owner(2));

        let all = Scope::All
            .apply(rating::Entity::find(), rating::Column::UserId)
            .build(DbBackend::Sqlite)
            .to_string();
        assert!(!all.contains("WHERE"));

        let own = Scope::Owner(2)
            .apply(rating::Entity::find(), rating::Column::UserId)
            .build(DbBackend::Sqlite)
            .to_string();
        assert!(own.contains(r#""t_rating"."user_id" = 2"#));
    }
}
