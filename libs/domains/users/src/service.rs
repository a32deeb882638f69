//! User Service - business logic layer
//!
//! Each operation is a single-shot transaction over the repository; there
//! is no cross-request state here beyond the store itself. Failures are
//! surfaced synchronously - no internal retries.

use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use axum_helpers::JwtAuth;

use crate::error::{UserError, UserResult};
use crate::models::{LoginRequest, LoginResponse, RegisterRequest, UpdateUser, User, UserResponse};
use crate::password;
use crate::repository::UserRepository;

/// Account service orchestrating the repository, the credential hasher,
/// and the token issuer
#[derive(Clone)]
pub struct UserService<R: UserRepository> {
    repository: Arc<R>,
    tokens: JwtAuth,
}

/// Canonical form of an email: trimmed and lower-cased. Every lookup and
/// every write goes through this, which is what makes the unique index
/// behave case-insensitively.
fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl<R: UserRepository> UserService<R> {
    pub fn new(repository: R, tokens: JwtAuth) -> Self {
        Self {
            repository: Arc::new(repository),
            tokens,
        }
    }

    /// Register a new restaurant owner
    #[instrument(skip(self, input), fields(restaurant = %input.restaurant_name))]
    pub async fn register(&self, input: RegisterRequest) -> UserResult<UserResponse> {
        input
            .validate()
            .map_err(|e| UserError::Validation(e.to_string()))?;

        let email = normalize_email(&input.email);

        // Fast path; the store's unique index still backs this up against
        // a concurrent registration
        if self.repository.find_by_email(&email).await?.is_some() {
            return Err(UserError::DuplicateEmail(email));
        }

        let password_hash = password::hash(input.password).await?;

        let user = User::new(
            input.owner_name,
            input.restaurant_name,
            email,
            password_hash,
            input.location,
        );

        let created = self.repository.insert(user).await?;
        Ok(created.into())
    }

    /// Verify credentials and issue a session token
    ///
    /// The new token is persisted onto the user record, overwriting the
    /// previous one.
    #[instrument(skip(self, input))]
    pub async fn login(&self, input: LoginRequest) -> UserResult<LoginResponse> {
        if input.email.trim().is_empty() || input.password.is_empty() {
            return Err(UserError::MissingFields);
        }

        let email = normalize_email(&input.email);

        let mut user = self
            .repository
            .find_by_email(&email)
            .await?
            .ok_or(UserError::UnknownEmail)?;

        if !password::verify(input.password, user.password_hash.clone()).await? {
            return Err(UserError::InvalidCredentials);
        }

        let token = self
            .tokens
            .issue(&user.id.to_string(), &user.email)
            .map_err(|e| UserError::Token(e.to_string()))?;

        user.token = Some(token.clone());
        let updated = self.repository.update(user).await?;

        tracing::info!(user_id = %updated.id, "Login successful");
        Ok(LoginResponse {
            token,
            user: updated.into(),
        })
    }

    /// All users as projections
    #[instrument(skip(self))]
    pub async fn list_users(&self) -> UserResult<Vec<UserResponse>> {
        let users = self.repository.list_all().await?;
        Ok(users.into_iter().map(|u| u.into()).collect())
    }

    /// Get a user by ID
    #[instrument(skip(self))]
    pub async fn get_user(&self, id: Uuid) -> UserResult<UserResponse> {
        let user = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id))?;

        Ok(user.into())
    }

    /// Apply a partial update
    #[instrument(skip(self, input))]
    pub async fn update_user(&self, id: Uuid, mut input: UpdateUser) -> UserResult<UserResponse> {
        input
            .validate()
            .map_err(|e| UserError::Validation(e.to_string()))?;

        let mut user = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id))?;

        // Hash-if-present: the one place an incoming password becomes a
        // digest on the update path
        let new_password_hash = match input.password.take() {
            Some(plaintext) => Some(password::hash(plaintext).await?),
            None => None,
        };

        if let Some(raw_email) = input.email.take() {
            let email = normalize_email(&raw_email);
            if email != user.email && self.repository.email_exists(&email).await? {
                return Err(UserError::DuplicateEmail(email));
            }
            input.email = Some(email);
        }

        user.apply_update(input, new_password_hash);

        let updated = self.repository.update(user).await?;
        Ok(updated.into())
    }

    /// Delete a user by ID
    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: Uuid) -> UserResult<()> {
        let deleted = self.repository.delete(id).await?;

        if !deleted {
            return Err(UserError::NotFound(id));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GeometryType, Location};
    use crate::repository::InMemoryUserRepository;
    use axum_helpers::JwtConfig;

    fn service() -> UserService<InMemoryUserRepository> {
        let jwt = JwtAuth::new(&JwtConfig::new("service-test-secret-with-32-chars!!!!"));
        UserService::new(InMemoryUserRepository::new(), jwt)
    }

    fn sample_location() -> Location {
        Location {
            place_name: "Lisbon".to_string(),
            coordinates: vec![-9.1393, 38.7223],
            bounding_box: vec![-9.23, 38.69, -9.09, 38.79],
            region: Some("Lisboa".to_string()),
            country: Some("Portugal".to_string()),
            relevance: 0.95,
            geometry_type: GeometryType::Point,
        }
    }

    fn register_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            owner_name: "Jane Doe".to_string(),
            restaurant_name: "Janes Diner".to_string(),
            email: email.to_string(),
            password: "Secret1A".to_string(),
            location: sample_location(),
        }
    }

    fn login_request(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_normalizes_email_and_hashes_password() {
        let service = service();

        let created = service
            .register(register_request("  Jane@X.com "))
            .await
            .unwrap();
        assert_eq!(created.email, "jane@x.com");

        let stored = service
            .repository
            .find_by_email("jane@x.com")
            .await
            .unwrap()
            .unwrap();
        assert_ne!(stored.password_hash, "Secret1A");
        assert!(password::verify_blocking("Secret1A", &stored.password_hash).unwrap());
        assert_eq!(stored.token, None);
    }

    #[tokio::test]
    async fn test_register_rejects_invalid_input() {
        let service = service();

        let mut input = register_request("jane@x.com");
        input.owner_name = "J4ne".to_string();

        let result = service.register(input).await;
        assert!(matches!(result, Err(UserError::Validation(_))));
    }

    #[tokio::test]
    async fn test_register_twice_with_same_email_conflicts() {
        let service = service();
        service.register(register_request("jane@x.com")).await.unwrap();

        let result = service.register(register_request("JANE@X.COM")).await;
        assert!(matches!(result, Err(UserError::DuplicateEmail(_))));
    }

    #[tokio::test]
    async fn test_login_succeeds_case_insensitively_and_persists_token() {
        let service = service();
        let created = service
            .register(register_request("Jane@X.com"))
            .await
            .unwrap();

        let response = service
            .login(login_request("JANE@x.com", "Secret1A"))
            .await
            .unwrap();

        assert_eq!(response.user.id, created.id);

        // Token is stored on the record, overwriting the previous value
        let stored = service
            .repository
            .find_by_id(created.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.token.as_deref(), Some(response.token.as_str()));

        // The issued token carries the subject and email
        let jwt = JwtAuth::new(&JwtConfig::new("service-test-secret-with-32-chars!!!!"));
        let claims = jwt.verify(&response.token).unwrap();
        assert_eq!(claims.sub, created.id.to_string());
        assert_eq!(claims.email, "jane@x.com");
    }

    #[tokio::test]
    async fn test_login_overwrites_previous_token() {
        let service = service();
        let created = service
            .register(register_request("jane@x.com"))
            .await
            .unwrap();

        let first = service
            .login(login_request("jane@x.com", "Secret1A"))
            .await
            .unwrap();
        let second = service
            .login(login_request("jane@x.com", "Secret1A"))
            .await
            .unwrap();

        let stored = service
            .repository
            .find_by_id(created.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.token.as_deref(), Some(second.token.as_str()));
        // The first response's token is simply no longer the stored one
        // (the strings may coincide if issued within the same second)
        let _ = first;
    }

    #[tokio::test]
    async fn test_login_unknown_email_vs_wrong_password() {
        let service = service();
        service.register(register_request("jane@x.com")).await.unwrap();

        let unknown = service
            .login(login_request("nobody@x.com", "Secret1A"))
            .await;
        assert!(matches!(unknown, Err(UserError::UnknownEmail)));

        let wrong = service
            .login(login_request("jane@x.com", "WrongPass1"))
            .await;
        assert!(matches!(wrong, Err(UserError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_login_with_empty_fields_is_missing_fields() {
        let service = service();

        let result = service.login(login_request("", "Secret1A")).await;
        assert!(matches!(result, Err(UserError::MissingFields)));

        let result = service.login(login_request("jane@x.com", "")).await;
        assert!(matches!(result, Err(UserError::MissingFields)));
    }

    #[tokio::test]
    async fn test_login_does_not_leak_sensitive_fields() {
        let service = service();
        service.register(register_request("jane@x.com")).await.unwrap();

        let response = service
            .login(login_request("jane@x.com", "Secret1A"))
            .await
            .unwrap();

        let value = serde_json::to_value(&response).unwrap();
        let user_keys: Vec<&String> = value["user"].as_object().unwrap().keys().collect();
        assert!(!user_keys.iter().any(|k| k.to_lowercase().contains("password")));
        assert!(!user_keys.iter().any(|k| k.to_lowercase().contains("token")));
    }

    #[tokio::test]
    async fn test_get_user_returns_projection_or_not_found() {
        let service = service();
        let created = service
            .register(register_request("jane@x.com"))
            .await
            .unwrap();

        let fetched = service.get_user(created.id).await.unwrap();
        assert_eq!(fetched.email, "jane@x.com");

        let missing = service.get_user(Uuid::new_v4()).await;
        assert!(matches!(missing, Err(UserError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_users_includes_everyone() {
        let service = service();
        service.register(register_request("jane@x.com")).await.unwrap();
        service.register(register_request("john@x.com")).await.unwrap();

        let all = service.list_users().await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_update_password_only_changes_nothing_else() {
        let service = service();
        let created = service
            .register(register_request("jane@x.com"))
            .await
            .unwrap();

        let updated = service
            .update_user(
                created.id,
                UpdateUser {
                    password: Some("NewSecret2B".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.owner_name, created.owner_name);
        assert_eq!(updated.email, created.email);
        assert_eq!(updated.location, created.location);

        // New password verifies, the old one no longer does
        assert!(service
            .login(login_request("jane@x.com", "NewSecret2B"))
            .await
            .is_ok());
        let old = service.login(login_request("jane@x.com", "Secret1A")).await;
        assert!(matches!(old, Err(UserError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_update_normalizes_and_checks_email() {
        let service = service();
        service.register(register_request("jane@x.com")).await.unwrap();
        let other = service
            .register(register_request("john@x.com"))
            .await
            .unwrap();

        // Taking someone else's email conflicts, regardless of case
        let result = service
            .update_user(
                other.id,
                UpdateUser {
                    email: Some("JANE@x.com".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(UserError::DuplicateEmail(_))));

        // A fresh email is normalized before storage
        let updated = service
            .update_user(
                other.id,
                UpdateUser {
                    email: Some("  John.New@X.com ".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.email, "john.new@x.com");
    }

    #[tokio::test]
    async fn test_update_keeping_own_email_is_fine() {
        let service = service();
        let created = service
            .register(register_request("jane@x.com"))
            .await
            .unwrap();

        let updated = service
            .update_user(
                created.id,
                UpdateUser {
                    email: Some("Jane@X.com".to_string()),
                    restaurant_name: Some("Janes New Diner".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.email, "jane@x.com");
        assert_eq!(updated.restaurant_name, "Janes New Diner");
    }

    #[tokio::test]
    async fn test_update_rejects_invalid_fields() {
        let service = service();
        let created = service
            .register(register_request("jane@x.com"))
            .await
            .unwrap();

        let result = service
            .update_user(
                created.id,
                UpdateUser {
                    owner_name: Some("J4ne D0e".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(UserError::Validation(_))));
    }

    #[tokio::test]
    async fn test_update_missing_user_is_not_found() {
        let service = service();

        let result = service
            .update_user(
                Uuid::new_v4(),
                UpdateUser {
                    restaurant_name: Some("Ghost Diner".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(UserError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_user_then_gone() {
        let service = service();
        let created = service
            .register(register_request("jane@x.com"))
            .await
            .unwrap();

        service.delete_user(created.id).await.unwrap();

        let missing = service.get_user(created.id).await;
        assert!(matches!(missing, Err(UserError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_nonexistent_is_not_found_not_a_crash() {
        let service = service();
        let result = service.delete_user(Uuid::new_v4()).await;
        assert!(matches!(result, Err(UserError::NotFound(_))));
    }
}
