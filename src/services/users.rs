//! User management service

use crate::{
    error::{AppError, AppResult},
    models::{
        user::{ChangePassword, CreateUser, NewUser, Role, UpdateUser, User},
        Pagination,
    },
    repository::Repository,
};

use super::credentials;

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
}

impl UsersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Register a regular member
    pub async fn register(&self, user: CreateUser) -> AppResult<User> {
        self.create_with_role(user, Role::User).await
    }

    /// Create the first administrator. Refused once any admin exists.
    pub async fn create_admin(&self, user: CreateUser) -> AppResult<User> {
        if self.repository.users.admin_exists().await? {
            return Err(AppError::Conflict("An admin account already exists".to_string()));
        }
        self.create_with_role(user, Role::Admin).await
    }

    async fn create_with_role(&self, user: CreateUser, role: Role) -> AppResult<User> {
        self.ensure_unique(Some(&user.email), Some(&user.username), None)
            .await?;

        let new_user = NewUser {
            password_hash: credentials::hash_password(&user.password)?,
            name: user.name,
            username: user.username,
            email: user.email,
            address: user.address,
            phone: user.phone,
            role,
        };

        let created = self.repository.users.create(&new_user).await?;
        tracing::info!(user_id = created.id, role = %created.role, "User created");
        Ok(created)
    }

    async fn ensure_unique(
        &self,
        email: Option<&str>,
        username: Option<&str>,
        exclude_id: Option<i32>,
    ) -> AppResult<()> {
        if let Some(email) = email {
            if self.repository.users.email_exists(email, exclude_id).await? {
                return Err(AppError::Conflict("Email already registered".to_string()));
            }
        }
        if let Some(username) = username {
            if self.repository.users.username_exists(username, exclude_id).await? {
                return Err(AppError::Conflict("Username already taken".to_string()));
            }
        }
        Ok(())
    }

    pub async fn list(&self, page: Pagination) -> AppResult<Vec<User>> {
        self.repository.users.list(page).await
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        self.repository.users.get_by_id(id).await
    }

    pub async fn update(&self, id: i32, update: UpdateUser) -> AppResult<User> {
        self.repository.users.get_by_id(id).await?;
        self.ensure_unique(update.email.as_deref(), update.username.as_deref(), Some(id))
            .await?;
        self.repository.users.update(id, &update).await
    }

    /// Replace the password after checking the current one
    pub async fn change_password(&self, id: i32, change: ChangePassword) -> AppResult<()> {
        let user = self.repository.users.get_by_id(id).await?;

        if !credentials::verify_password(&change.password, &user.password_hash)? {
            return Err(AppError::Validation("Incorrect current password".to_string()));
        }

        let hash = credentials::hash_password(&change.new_password)?;
        self.repository.users.update_password(id, &hash).await
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        if !self.repository.users.delete(id).await? {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }
        tracing::info!(user_id = id, "User deleted");
        Ok(())
    }
}
