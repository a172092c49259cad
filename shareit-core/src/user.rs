use serde::{Deserialize, Serialize};
use shareit_shared::Masked;
use tracing::{debug, info, warn};

use crate::repository::Repositories;
use crate::{non_blank, require_non_blank, CoreError, CoreResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
}

/// Partial update; absent or blank fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
}

fn validate_email(email: &str) -> CoreResult<()> {
    if !email.contains('@') {
        return Err(CoreError::ValidationError(format!("'{}' is not a valid email", Masked(email))));
    }
    Ok(())
}

pub struct UserService {
    repos: Repositories,
}

impl UserService {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    pub async fn create_user(&self, new_user: NewUser) -> CoreResult<User> {
        require_non_blank("name", &new_user.name)?;
        require_non_blank("email", &new_user.email)?;
        validate_email(&new_user.email)?;

        if self.repos.users.find_by_email(&new_user.email).await?.is_some() {
            warn!(email = %Masked(&new_user.email), "Signup with an email already in use");
            return Err(CoreError::AlreadyExists("User with this email already exists".to_string()));
        }

        let user = self.repos.users.create_user(&new_user).await?;
        info!(user_id = user.id, email = %Masked(&user.email), "User created");
        Ok(user)
    }

    pub async fn get_user(&self, id: i64) -> CoreResult<User> {
        let user = self.repos.user_or_not_found(id).await?;
        debug!(user_id = id, "User fetched");
        Ok(user)
    }

    pub async fn update_user(&self, id: i64, patch: UserPatch) -> CoreResult<User> {
        let mut user = self.repos.user_or_not_found(id).await?;

        if let Some(email) = non_blank(patch.email) {
            validate_email(&email)?;
            if let Some(holder) = self.repos.users.find_by_email(&email).await? {
                if holder.id != id {
                    warn!(user_id = id, email = %Masked(&email), "Email change collides with another account");
                    return Err(CoreError::AlreadyExists("User with this email already exists".to_string()));
                }
            }
            user.email = email;
        }
        if let Some(name) = non_blank(patch.name) {
            user.name = name;
        }

        let updated = self.repos.users.update_user(&user).await?;
        info!(user_id = id, "User updated");
        Ok(updated)
    }

    /// Removes the user and returns the row as it was.
    pub async fn delete_user(&self, id: i64) -> CoreResult<User> {
        let user = self.repos.user_or_not_found(id).await?;
        self.repos.users.delete_user(id).await?;
        info!(user_id = id, "User deleted");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    fn service() -> UserService {
        UserService::new(MemoryStore::new().repositories())
    }

    fn signup(name: &str, email: &str) -> NewUser {
        NewUser { name: name.to_string(), email: email.to_string() }
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected() {
        let svc = service();
        svc.create_user(signup("Ann", "ann@example.com")).await.unwrap();

        let err = svc.create_user(signup("Other Ann", "ann@example.com")).await.unwrap_err();
        assert!(matches!(err, CoreError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_signup_requires_name_and_valid_email() {
        let svc = service();
        assert!(matches!(
            svc.create_user(signup(" ", "x@example.com")).await,
            Err(CoreError::ValidationError(_))
        ));
        assert!(matches!(
            svc.create_user(signup("Bob", "not-an-email")).await,
            Err(CoreError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_partial_update_keeps_blank_fields() {
        let svc = service();
        let user = svc.create_user(signup("Ann", "ann@example.com")).await.unwrap();

        let updated = svc
            .update_user(user.id, UserPatch { name: Some("Anna".into()), email: Some("  ".into()) })
            .await
            .unwrap();
        assert_eq!(updated.name, "Anna");
        assert_eq!(updated.email, "ann@example.com");

        let updated = svc
            .update_user(user.id, UserPatch { name: None, email: Some("anna@example.com".into()) })
            .await
            .unwrap();
        assert_eq!(updated.name, "Anna");
        assert_eq!(updated.email, "anna@example.com");
    }

    #[tokio::test]
    async fn test_update_to_someone_elses_email_conflicts() {
        let svc = service();
        let ann = svc.create_user(signup("Ann", "ann@example.com")).await.unwrap();
        svc.create_user(signup("Bob", "bob@example.com")).await.unwrap();

        let err = svc
            .update_user(ann.id, UserPatch { name: None, email: Some("bob@example.com".into()) })
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::AlreadyExists(_)));

        // Re-submitting one's own email is not a conflict.
        svc.update_user(ann.id, UserPatch { name: None, email: Some("ann@example.com".into()) })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_returns_removed_user() {
        let svc = service();
        let user = svc.create_user(signup("Ann", "ann@example.com")).await.unwrap();

        let removed = svc.delete_user(user.id).await.unwrap();
        assert_eq!(removed, user);
        assert!(matches!(svc.get_user(user.id).await, Err(CoreError::NotFound(_))));
        assert!(matches!(svc.delete_user(user.id).await, Err(CoreError::NotFound(_))));
    }
}
