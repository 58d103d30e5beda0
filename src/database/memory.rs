//! In-memory stores backing the route tests. They honour the same owner
//! scoping and email uniqueness as the MongoDB stores.

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{ContactStore, StoreError, UserStore};
use crate::models::{Contact, ContactChanges, NewContact, NewUser, User, UserChanges, UserProfile};

#[derive(Default)]
pub struct MemoryContactStore {
    contacts: RwLock<HashMap<ObjectId, Contact>>,
}

#[async_trait]
impl ContactStore for MemoryContactStore {
    async fn list(&self, owner: &ObjectId) -> Result<Vec<Contact>, StoreError> {
        let contacts = self.contacts.read().await;
        Ok(contacts.values().filter(|c| &c.owner == owner).cloned().collect())
    }

    async fn get_by_id(&self, id: &ObjectId, owner: &ObjectId) -> Result<Option<Contact>, StoreError> {
        let contacts = self.contacts.read().await;
        Ok(contacts.get(id).filter(|c| &c.owner == owner).cloned())
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
        self.contacts.write().await.insert(contact.id, contact.clone());
        Ok(contact)
    }

    async fn update(
        &self,
        id: &ObjectId,
        owner: &ObjectId,
        changes: ContactChanges,
    ) -> Result<Option<Contact>, StoreError> {
        let mut contacts = self.contacts.write().await;
        Ok(contacts.get_mut(id).filter(|c| &c.owner == owner).map(|contact| {
            changes.apply(contact);
            contact.clone()
        }))
    }

    async fn remove(&self, id: &ObjectId, owner: &ObjectId) -> Result<Option<Contact>, StoreError> {
        let mut contacts = self.contacts.write().await;
        match contacts.get(id) {
            Some(c) if &c.owner == owner => Ok(contacts.remove(id)),
            _ => Ok(None),
        }
    }
}

#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<ObjectId, User>>,
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn get_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn get_by_id(&self, id: &ObjectId) -> Result<Option<UserProfile>, StoreError> {
        let users = self.users.read().await;
        Ok(users.get(id).map(UserProfile::from))
    }

    async fn get_record(&self, id: &ObjectId) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn get_by_verification_token(&self, token: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.verification_token.as_deref() == Some(token))
            .cloned())
    }

    async fn redeem_verification_token(&self, token: &str) -> Result<Option<User>, StoreError> {
        let mut users = self.users.write().await;
        Ok(users
            .values_mut()
            .find(|u| u.verification_token.as_deref() == Some(token))
            .map(|user| {
                UserChanges::verified().apply(user);
                user.clone()
            }))
    }

    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::DuplicateEmail);
        }
        let user = user.into_user(ObjectId::new());
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, id: &ObjectId, changes: UserChanges) -> Result<Option<User>, StoreError> {
        let mut users = self.users.write().await;
        Ok(users.get_mut(id).map(|user| {
            changes.apply(user);
            user.clone()
        }))
    }

    async fn ping(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_contact(owner: ObjectId) -> NewContact {
        NewContact {
            name: "A".into(),
            email: "a@x.com".into(),
            phone: "1".into(),
            favorite: false,
            owner,
        }
    }

    #[tokio::test]
    async fn contacts_are_invisible_to_other_owners() {
        let store = MemoryContactStore::default();
        let owner = ObjectId::new();
        let stranger = ObjectId::new();
        let created = store.create(new_contact(owner)).await.unwrap();

        assert_eq!(store.get_by_id(&created.id, &owner).await.unwrap(), Some(created.clone()));
        assert!(store.get_by_id(&created.id, &stranger).await.unwrap().is_none());
        assert!(store.list(&stranger).await.unwrap().is_empty());
        assert!(store
            .update(&created.id, &stranger, ContactChanges::favorite(true))
            .await
            .unwrap()
            .is_none());
        assert!(store.remove(&created.id, &stranger).await.unwrap().is_none());
        assert_eq!(store.list(&owner).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn removing_a_missing_contact_is_not_an_error() {
        let store = MemoryContactStore::default();
        let removed = store.remove(&ObjectId::new(), &ObjectId::new()).await;
        assert!(matches!(removed, Ok(None)));
    }

    #[tokio::test]
    async fn duplicate_emails_are_rejected() {
        let store = MemoryUserStore::default();
        let new_user = || NewUser {
            email: "dup@example.com".into(),
            password_hash: "hash".into(),
            avatar_url: "url".into(),
            verification_token: uuid::Uuid::new_v4().to_string(),
        };

        store.create(new_user()).await.unwrap();
        let second = store.create(new_user()).await;
        assert!(matches!(second, Err(StoreError::DuplicateEmail)));
    }

    #[tokio::test]
    async fn verification_tokens_redeem_once() {
        let store = MemoryUserStore::default();
        let user = store
            .create(NewUser {
                email: "ann@example.com".into(),
                password_hash: "hash".into(),
                avatar_url: "url".into(),
                verification_token: "tok".into(),
            })
            .await
            .unwrap();

        let (first, second) = futures::join!(
            store.redeem_verification_token("tok"),
            store.redeem_verification_token("tok")
        );
        let redeemed: Vec<User> = [first.unwrap(), second.unwrap()].into_iter().flatten().collect();

        assert_eq!(redeemed.len(), 1);
        assert_eq!(redeemed[0].id, user.id);
        assert!(redeemed[0].verify);
        assert!(redeemed[0].verification_token.is_none());
        assert!(store.get_by_verification_token("tok").await.unwrap().is_none());
    }
}
