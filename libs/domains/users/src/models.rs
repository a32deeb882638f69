use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Letters and spaces only
static LETTERS_AND_SPACES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z ]+$").unwrap());

/// Letters, digits, and spaces only
static LETTERS_DIGITS_AND_SPACES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9 ]+$").unwrap());

/// Custom validator for owner names
fn validate_owner_name(name: &str) -> Result<(), ValidationError> {
    if !LETTERS_AND_SPACES.is_match(name) {
        let mut err = ValidationError::new("owner_name_characters");
        err.message = Some("Owner's name should only contain letters and spaces".into());
        return Err(err);
    }
    Ok(())
}

/// Custom validator for restaurant names
fn validate_restaurant_name(name: &str) -> Result<(), ValidationError> {
    if !LETTERS_DIGITS_AND_SPACES.is_match(name) {
        let mut err = ValidationError::new("restaurant_name_characters");
        err.message =
            Some("Restaurant name should only contain letters, numbers, and spaces".into());
        return Err(err);
    }
    Ok(())
}

/// Geometry type of a geocoded location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, ToSchema)]
pub enum GeometryType {
    #[default]
    Point,
    Polygon,
    MultiPolygon,
}

/// Restaurant location - embedded in the user record, not independently
/// addressable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[validate(length(min = 1, message = "Place name is required"))]
    pub place_name: String,
    /// `[longitude, latitude]`
    #[validate(length(
        min = 2,
        max = 2,
        message = "Coordinates must have exactly two values [longitude, latitude]"
    ))]
    pub coordinates: Vec<f64>,
    #[validate(length(
        min = 4,
        max = 4,
        message = "BoundingBox must contain exactly four values"
    ))]
    pub bounding_box: Vec<f64>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[validate(range(min = 0.0, max = 1.0, message = "Relevance must be between 0 and 1"))]
    pub relevance: f64,
    #[serde(default)]
    pub geometry_type: GeometryType,
}

/// User entity - one restaurant-owner account, stored in the `users`
/// collection
///
/// The `email` field is always stored lower-cased and trimmed; a unique
/// index on it is the authoritative duplicate-email enforcement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique identifier (stored as _id in MongoDB)
    #[serde(rename = "_id", alias = "id")]
    pub id: Uuid,
    pub owner_name: String,
    pub restaurant_name: String,
    pub email: String,
    /// Salted one-way digest; the plaintext password is never persisted
    pub password_hash: String,
    pub location: Location,
    /// Last-issued session token, overwritten on each successful login.
    /// An audit field only - nothing reads it for authorization.
    pub token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User projection returned by the API - no password hash, no token
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub owner_name: String,
    pub restaurant_name: String,
    pub email: String,
    pub location: Location,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            owner_name: user.owner_name,
            restaurant_name: user.restaurant_name,
            email: user.email,
            location: user.location,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// DTO for registering a new user
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(
        length(
            min = 5,
            max = 255,
            message = "Owner's name must be between 5 and 255 characters"
        ),
        custom(function = "validate_owner_name")
    )]
    pub owner_name: String,
    #[validate(
        length(
            min = 3,
            max = 255,
            message = "Restaurant name must be between 3 and 255 characters"
        ),
        custom(function = "validate_restaurant_name")
    )]
    pub restaurant_name: String,
    #[validate(email(message = "Email is not valid"))]
    pub email: String,
    #[validate(custom(function = "validate_password_strength"))]
    pub password: String,
    #[validate(nested)]
    pub location: Location,
}

/// DTO for updating an existing user - only present fields are re-validated
/// and applied
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUser {
    #[validate(
        length(
            min = 5,
            max = 255,
            message = "Owner's name must be between 5 and 255 characters"
        ),
        custom(function = "validate_owner_name")
    )]
    pub owner_name: Option<String>,
    #[validate(
        length(
            min = 3,
            max = 255,
            message = "Restaurant name must be between 3 and 255 characters"
        ),
        custom(function = "validate_restaurant_name")
    )]
    pub restaurant_name: Option<String>,
    #[validate(email(message = "Email is not valid"))]
    pub email: Option<String>,
    #[validate(custom(function = "validate_password_strength"))]
    pub password: Option<String>,
    #[validate(nested)]
    pub location: Option<Location>,
}

/// DTO for user login
///
/// No field-shape rules here: a login attempt with a malformed email is an
/// unknown account (401), not a validation failure.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response after a successful login
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserResponse,
}

/// Password policy: at least 8 characters with one uppercase letter, one
/// lowercase letter, and one digit
fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    let strong = password.len() >= 8
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_digit());

    if strong {
        Ok(())
    } else {
        let mut err = ValidationError::new("password_strength");
        err.message = Some(
            "Password must be at least 8 characters long and contain at least one uppercase \
             letter, one lowercase letter, and one number"
                .into(),
        );
        Err(err)
    }
}

impl User {
    /// Create a new user record (the password must already be hashed)
    pub fn new(
        owner_name: String,
        restaurant_name: String,
        email: String,
        password_hash: String,
        location: Location,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            owner_name,
            restaurant_name,
            email,
            password_hash,
            location,
            token: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a partial update (the new password, if any, must already be
    /// hashed and the new email, if any, already normalized)
    pub fn apply_update(&mut self, update: UpdateUser, new_password_hash: Option<String>) {
        if let Some(owner_name) = update.owner_name {
            self.owner_name = owner_name;
        }
        if let Some(restaurant_name) = update.restaurant_name {
            self.restaurant_name = restaurant_name;
        }
        if let Some(email) = update.email {
            self.email = email;
        }
        if let Some(hash) = new_password_hash {
            self.password_hash = hash;
        }
        if let Some(location) = update.location {
            self.location = location;
        }
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    fn register_request() -> RegisterRequest {
        RegisterRequest {
            owner_name: "Jane Doe".to_string(),
            restaurant_name: "Janes Diner".to_string(),
            email: "jane@x.com".to_string(),
            password: "Secret1A".to_string(),
            location: sample_location(),
        }
    }

    #[test]
    fn test_valid_registration_passes() {
        assert!(register_request().validate().is_ok());
    }

    #[test]
    fn test_owner_name_rejects_digits_and_punctuation() {
        let mut input = register_request();
        input.owner_name = "Jane D0e".to_string();
        assert!(input.validate().is_err());

        input.owner_name = "Jane-Doe".to_string();
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_owner_name_length_bounds() {
        let mut input = register_request();
        input.owner_name = "Jane".to_string(); // 4 chars, minimum is 5
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_restaurant_name_allows_digits() {
        let mut input = register_request();
        input.restaurant_name = "Diner 24".to_string();
        assert!(input.validate().is_ok());

        input.restaurant_name = "Diner!".to_string();
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_email_syntax() {
        let mut input = register_request();
        input.email = "not-an-email".to_string();
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_password_strength_matrix() {
        for weak in ["short1A", "alllowercase1", "ALLUPPERCASE1", "NoDigitsHere"] {
            let mut input = register_request();
            input.password = weak.to_string();
            assert!(input.validate().is_err(), "expected {weak:?} to be rejected");
        }

        let mut input = register_request();
        input.password = "Secret1A".to_string();
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_location_shape_violations() {
        let mut input = register_request();
        input.location.coordinates = vec![1.0];
        assert!(input.validate().is_err());

        let mut input = register_request();
        input.location.bounding_box = vec![1.0, 2.0, 3.0];
        assert!(input.validate().is_err());

        let mut input = register_request();
        input.location.relevance = 1.5;
        assert!(input.validate().is_err());

        let mut input = register_request();
        input.location.place_name = String::new();
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_validation_collects_all_violations() {
        let mut input = register_request();
        input.owner_name = "J1".to_string();
        input.password = "weak".to_string();
        let errors = input.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("owner_name"));
        assert!(errors.field_errors().contains_key("password"));
    }

    #[test]
    fn test_update_validates_only_present_fields() {
        let update = UpdateUser {
            restaurant_name: Some("New Diner".to_string()),
            ..Default::default()
        };
        assert!(update.validate().is_ok());

        let update = UpdateUser {
            password: Some("weak".to_string()),
            ..Default::default()
        };
        assert!(update.validate().is_err());
    }

    #[test]
    fn test_geometry_type_defaults_to_point() {
        let json = serde_json::json!({
            "placeName": "Lisbon",
            "coordinates": [-9.1393, 38.7223],
            "boundingBox": [-9.23, 38.69, -9.09, 38.79],
            "relevance": 0.5
        });
        let location: Location = serde_json::from_value(json).unwrap();
        assert_eq!(location.geometry_type, GeometryType::Point);
        assert_eq!(location.region, None);
        assert_eq!(location.country, None);
    }

    #[test]
    fn test_geometry_type_rejects_unknown_variant() {
        let json = serde_json::json!({
            "placeName": "Lisbon",
            "coordinates": [-9.1393, 38.7223],
            "boundingBox": [-9.23, 38.69, -9.09, 38.79],
            "relevance": 0.5,
            "geometryType": "Sphere"
        });
        assert!(serde_json::from_value::<Location>(json).is_err());
    }

    #[test]
    fn test_user_serializes_with_wire_field_names() {
        let user = User::new(
            "Jane Doe".to_string(),
            "Janes Diner".to_string(),
            "jane@x.com".to_string(),
            "hash".to_string(),
            sample_location(),
        );
        let value = serde_json::to_value(&user).unwrap();
        assert!(value.get("_id").is_some());
        assert!(value.get("ownerName").is_some());
        assert!(value.get("restaurantName").is_some());
        assert!(value.get("passwordHash").is_some());
    }

    #[test]
    fn test_projection_excludes_sensitive_fields() {
        let mut user = User::new(
            "Jane Doe".to_string(),
            "Janes Diner".to_string(),
            "jane@x.com".to_string(),
            "hash".to_string(),
            sample_location(),
        );
        user.token = Some("some.jwt.token".to_string());

        let projection: UserResponse = user.into();
        let value = serde_json::to_value(&projection).unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();

        assert!(value.get("id").is_some());
        assert!(!keys.iter().any(|k| k.to_lowercase().contains("password")));
        assert!(!keys.iter().any(|k| k.to_lowercase().contains("token")));
    }

    #[test]
    fn test_apply_update_touches_only_present_fields() {
        let mut user = User::new(
            "Jane Doe".to_string(),
            "Janes Diner".to_string(),
            "jane@x.com".to_string(),
            "hash".to_string(),
            sample_location(),
        );
        let original_email = user.email.clone();

        user.apply_update(
            UpdateUser {
                restaurant_name: Some("New Diner".to_string()),
                ..Default::default()
            },
            None,
        );

        assert_eq!(user.restaurant_name, "New Diner");
        assert_eq!(user.owner_name, "Jane Doe");
        assert_eq!(user.email, original_email);
        assert_eq!(user.password_hash, "hash");
    }
}
