use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::options::ReturnDocument;
use mongodb::Collection;

use super::{MongoDB, StoreError};
use crate::models::{owned_filter, Contact, ContactChanges, NewContact};

pub const COLLECTION: &str = "contacts";

/// Contact persistence. Every lookup and mutation is scoped by `owner`:
/// a contact that exists under another owner is reported exactly like a
/// missing one (`None`).
#[async_trait]
pub trait ContactStore: Send + Sync {
    async fn list(&self, owner: &ObjectId) -> Result<Vec<Contact>, StoreError>;

    async fn get_by_id(&self, id: &ObjectId, owner: &ObjectId) -> Result<Option<Contact>, StoreError>;

    async fn create(&self, contact: NewContact) -> Result<Contact, StoreError>;

    /// Merges `changes` into the owned contact and returns the updated record.
    async fn update(
        &self,
        id: &ObjectId,
        owner: &ObjectId,
        changes: ContactChanges,
    ) -> Result<Option<Contact>, StoreError>;

    /// Deletes the owned contact, returning what was removed.
    async fn remove(&self, id: &ObjectId, owner: &ObjectId) -> Result<Option<Contact>, StoreError>;
}

pub struct MongoContactStore {
    collection: Collection<Contact>,
}

impl MongoContactStore {
    pub fn new(db: &MongoDB) -> Self {
        Self {
            collection: db.collection::<Contact>(COLLECTION),
        }
    }
}

#[async_trait]
impl ContactStore for MongoContactStore {
    async fn list(&self, owner: &ObjectId) -> Result<Vec<Contact>, StoreError> {
        let cursor = self.collection.find(doc! { "owner": owner }).await?;
        let contacts: Vec<Contact> = cursor.try_collect().await?;
        Ok(contacts)
    }

    async fn get_by_id(&self, id: &ObjectId, owner: &ObjectId) -> Result<Option<Contact>, StoreError> {
        Ok(self.collection.find_one(owned_filter(id, owner)).await?)
    }

    async fn create(&self, contact: NewContact) -> Result<Contact, StoreError> {
        let contact = Contact {
            id: ObjectId::new(),
            name: contact.name,
            email: contact.email,
            phone: contact.phone,
            favorite: contact.favorite,
            owner: contact.owner,
        };

        self.collection.insert_one(&contact).await?;
        Ok(contact)
    }

    async fn update(
        &self,
        id: &ObjectId,
        owner: &ObjectId,
        changes: ContactChanges,
    ) -> Result<Option<Contact>, StoreError> {
        if changes.is_empty() {
            return self.get_by_id(id, owner).await;
        }

        let updated = self
            .collection
            .find_one_and_update(owned_filter(id, owner), doc! { "$set": changes.to_set_document() })
            .return_document(ReturnDocument::After)
            .await?;

        Ok(updated)
    }

    async fn remove(&self, id: &ObjectId, owner: &ObjectId) -> Result<Option<Contact>, StoreError> {
        Ok(self.collection.find_one_and_delete(owned_filter(id, owner)).await?)
    }
}
