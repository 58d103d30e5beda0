use async_trait::async_trait;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::options::ReturnDocument;
use mongodb::Collection;

use super::{is_duplicate_key, MongoDB, StoreError};
use crate::models::{NewUser, User, UserChanges, UserProfile};

pub const COLLECTION: &str = "users";

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Safe projection for "current user" style reads.
    async fn get_by_id(&self, id: &ObjectId) -> Result<Option<UserProfile>, StoreError>;

    /// Full record, including the stored session token. Only auth gating needs it.
    async fn get_record(&self, id: &ObjectId) -> Result<Option<User>, StoreError>;

    async fn get_by_verification_token(&self, token: &str) -> Result<Option<User>, StoreError>;

    /// Marks the holder of `token` as verified and clears the token in one
    /// write. Only one caller can redeem a given token.
    async fn redeem_verification_token(&self, token: &str) -> Result<Option<User>, StoreError>;

    /// Inserts an unverified user. Fails with `StoreError::DuplicateEmail`
    /// when the email is already registered.
    async fn create(&self, user: NewUser) -> Result<User, StoreError>;

    async fn update(&self, id: &ObjectId, changes: UserChanges) -> Result<Option<User>, StoreError>;

    async fn ping(&self) -> bool;
}

pub struct MongoUserStore {
    db: MongoDB,
    collection: Collection<User>,
}

impl MongoUserStore {
    pub fn new(db: &MongoDB) -> Self {
        Self {
            db: db.clone(),
            collection: db.collection::<User>(COLLECTION),
        }
    }
}

#[async_trait]
impl UserStore for MongoUserStore {
    async fn get_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.collection.find_one(doc! { "email": email }).await?)
    }

    async fn get_by_id(&self, id: &ObjectId) -> Result<Option<UserProfile>, StoreError> {
        let profile = self
            .collection
            .clone_with_type::<UserProfile>()
            .find_one(doc! { "_id": id })
            .projection(doc! { "email": 1, "subscription": 1, "avatarURL": 1 })
            .await?;

        Ok(profile)
    }

    async fn get_record(&self, id: &ObjectId) -> Result<Option<User>, StoreError> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    async fn get_by_verification_token(&self, token: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .collection
            .find_one(doc! { "verificationToken": token })
            .await?)
    }

    async fn redeem_verification_token(&self, token: &str) -> Result<Option<User>, StoreError> {
        let redeemed = self
            .collection
            .find_one_and_update(
                doc! { "verificationToken": token },
                doc! { "$set": UserChanges::verified().to_set_document() },
            )
            .return_document(ReturnDocument::After)
            .await?;

        Ok(redeemed)
    }

    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let user = user.into_user(ObjectId::new());

        match self.collection.insert_one(&user).await {
            Ok(_) => Ok(user),
            Err(e) if is_duplicate_key(&e) => Err(StoreError::DuplicateEmail),
            Err(e) => Err(e.into()),
        }
    }

    async fn update(&self, id: &ObjectId, changes: UserChanges) -> Result<Option<User>, StoreError> {
        let set = changes.to_set_document();
        if set.is_empty() {
            return self.get_record(id).await;
        }

        let updated = self
            .collection
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": set })
            .return_document(ReturnDocument::After)
            .await?;

        Ok(updated)
    }

    async fn ping(&self) -> bool {
        self.db.ping().await
    }
}
