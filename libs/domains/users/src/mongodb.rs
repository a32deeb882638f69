//! MongoDB implementation of UserRepository

use async_trait::async_trait;
use mongodb::{
    bson::{doc, to_bson, Bson},
    Collection, Database, IndexModel,
};
use tracing::instrument;
use uuid::Uuid;

use crate::error::{UserError, UserResult};
use crate::models::User;
use crate::repository::UserRepository;

/// Server-side error code for a unique-index violation.
const DUPLICATE_KEY: i32 = 11000;

/// MongoDB implementation of the UserRepository
///
/// Email uniqueness is enforced by a unique index on `email` (see
/// [`create_indexes`](Self::create_indexes)); the service-level lookup is
/// only a fast path. Emails are stored normalized, so exact-match filters
/// behave case-insensitively.
pub struct MongoUserRepository {
    collection: Collection<User>,
}

impl MongoUserRepository {
    /// Create a new MongoUserRepository on the `users` collection
    ///
    /// # Example
    /// ```ignore
    /// let client = Client::with_uri_str("mongodb://localhost:27017").await?;
    /// let db = client.database("owners");
    /// let repo = MongoUserRepository::new(db);
    /// ```
    pub fn new(db: Database) -> Self {
        let collection = db.collection::<User>("users");
        Self { collection }
    }

    /// Create a new MongoUserRepository with a custom collection name
    pub fn with_collection(db: Database, collection_name: &str) -> Self {
        let collection = db.collection::<User>(collection_name);
        Self { collection }
    }

    /// Create indexes; the unique email index is the authoritative
    /// duplicate-email enforcement (the lookup-then-insert in the service
    /// is not atomic)
    pub async fn create_indexes(&self) -> UserResult<()> {
        use mongodb::options::IndexOptions;

        let indexes = vec![IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build()];

        self.collection.create_indexes(indexes).await?;
        Ok(())
    }

    /// Whether a driver error is a unique-index violation
    fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
        use mongodb::error::{ErrorKind, WriteFailure};

        match &*err.kind {
            ErrorKind::Write(WriteFailure::WriteError(write_error)) => {
                write_error.code == DUPLICATE_KEY
            }
            ErrorKind::Command(command_error) => command_error.code == DUPLICATE_KEY,
            _ => false,
        }
    }

    fn id_filter(id: Uuid) -> mongodb::bson::Document {
        doc! { "_id": to_bson(&id).unwrap_or(Bson::Null) }
    }
}

#[async_trait]
impl UserRepository for MongoUserRepository {
    #[instrument(skip(self, user), fields(email = %user.email))]
    async fn insert(&self, user: User) -> UserResult<User> {
        match self.collection.insert_one(&user).await {
            Ok(_) => {
                tracing::info!(user_id = %user.id, "User created successfully");
                Ok(user)
            }
            // A concurrent registration can slip between the service's
            // lookup and this insert; the unique index catches it here
            Err(e) if Self::is_duplicate_key(&e) => Err(UserError::DuplicateEmail(user.email)),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> UserResult<Option<User>> {
        let user = self.collection.find_one(Self::id_filter(id)).await?;
        Ok(user)
    }

    #[instrument(skip(self, email))]
    async fn find_by_email(&self, email: &str) -> UserResult<Option<User>> {
        let user = self.collection.find_one(doc! { "email": email }).await?;
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn list_all(&self) -> UserResult<Vec<User>> {
        use futures_util::TryStreamExt;

        let options = mongodb::options::FindOptions::builder()
            .sort(doc! { "createdAt": 1 })
            .build();

        let cursor = self.collection.find(doc! {}).with_options(options).await?;
        let users: Vec<User> = cursor.try_collect().await?;

        Ok(users)
    }

    #[instrument(skip(self, user), fields(user_id = %user.id))]
    async fn update(&self, user: User) -> UserResult<User> {
        let result = self
            .collection
            .replace_one(Self::id_filter(user.id), &user)
            .await
            .map_err(|e| {
                if Self::is_duplicate_key(&e) {
                    UserError::DuplicateEmail(user.email.clone())
                } else {
                    e.into()
                }
            })?;

        if result.matched_count == 0 {
            return Err(UserError::NotFound(user.id));
        }

        tracing::info!(user_id = %user.id, "User updated successfully");
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Uuid) -> UserResult<bool> {
        let result = self.collection.delete_one(Self::id_filter(id)).await?;

        if result.deleted_count > 0 {
            tracing::info!(user_id = %id, "User deleted successfully");
        }
        Ok(result.deleted_count > 0)
    }

    #[instrument(skip(self, email))]
    async fn email_exists(&self, email: &str) -> UserResult<bool> {
        let count = self
            .collection
            .count_documents(doc! { "email": email })
            .await?;
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_write_errors_are_not_duplicate_keys() {
        let err = mongodb::error::Error::custom("boom");
        assert!(!MongoUserRepository::is_duplicate_key(&err));
    }

    #[test]
    fn test_id_filter_targets_underscore_id() {
        let filter = MongoUserRepository::id_filter(Uuid::nil());
        assert!(filter.contains_key("_id"));
    }

    // CRUD behavior against a live server is covered by the ignored
    // integration test below; everything else runs against the in-memory
    // repository in service tests.
    #[tokio::test]
    #[ignore] // Requires actual MongoDB
    async fn test_insert_roundtrip() {
        use crate::models::{GeometryType, Location};

        let client = mongodb::Client::with_uri_str("mongodb://localhost:27017")
            .await
            .unwrap();
        let repo =
            MongoUserRepository::with_collection(client.database("owners_test"), "users_test");
        repo.create_indexes().await.unwrap();

        let user = User::new(
            "Jane Doe".to_string(),
            "Janes Diner".to_string(),
            format!("{}@x.com", Uuid::new_v4()),
            "hashed".to_string(),
            Location {
                place_name: "Lisbon".to_string(),
                coordinates: vec![-9.1393, 38.7223],
                bounding_box: vec![-9.23, 38.69, -9.09, 38.79],
                region: None,
                country: None,
                relevance: 0.9,
                geometry_type: GeometryType::Point,
            },
        );

        let created = repo.insert(user).await.unwrap();
        let fetched = repo.find_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.email, created.email);

        assert!(repo.delete(created.id).await.unwrap());
    }
}
