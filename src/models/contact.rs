use mongodb::bson::{doc, oid::ObjectId, Document};
use serde::{Deserialize, Serialize};

/// Contact stored in the `contacts` collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub favorite: bool,
    /// `_id` of the owning user; every query filters on it
    pub owner: ObjectId,
}

/// Contact about to be inserted. The id is assigned by the store.
#[derive(Debug, Clone)]
pub struct NewContact {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub favorite: bool,
    pub owner: ObjectId,
}

/// Partial update: only `Some` fields are written, the rest are kept.
#[derive(Debug, Clone, Default)]
pub struct ContactChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub favorite: Option<bool>,
}

impl ContactChanges {
    pub fn favorite(favorite: bool) -> Self {
        Self {
            favorite: Some(favorite),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.phone.is_none() && self.favorite.is_none()
    }

    /// `$set` body for the supplied fields.
    pub fn to_set_document(&self) -> Document {
        let mut set = Document::new();
        if let Some(name) = &self.name { set.insert("name", name); }
        if let Some(email) = &self.email { set.insert("email", email); }
        if let Some(phone) = &self.phone { set.insert("phone", phone); }
        if let Some(favorite) = self.favorite { set.insert("favorite", favorite); }
        set
    }

    pub fn apply(&self, contact: &mut Contact) {
        if let Some(name) = &self.name { contact.name = name.clone(); }
        if let Some(email) = &self.email { contact.email = email.clone(); }
        if let Some(phone) = &self.phone { contact.phone = phone.clone(); }
        if let Some(favorite) = self.favorite { contact.favorite = favorite; }
    }
}

/// Body of `POST /contacts` and `PUT /contacts/{id}`
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct ContactInput {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub favorite: bool,
}

impl ContactInput {
    pub fn into_new_contact(self, owner: ObjectId) -> NewContact {
        NewContact {
            name: self.name,
            email: self.email,
            phone: self.phone,
            favorite: self.favorite,
            owner,
        }
    }
}

impl From<ContactInput> for ContactChanges {
    fn from(input: ContactInput) -> Self {
        ContactChanges {
            name: Some(input.name),
            email: Some(input.email),
            phone: Some(input.phone),
            favorite: Some(input.favorite),
        }
    }
}

/// Body of `PATCH /contacts/{id}/favorite`
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct FavoriteInput {
    pub favorite: bool,
}

/// Contact as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ContactResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub favorite: bool,
    pub owner: String,
}

impl From<Contact> for ContactResponse {
    fn from(c: Contact) -> Self {
        ContactResponse {
            id: c.id.to_hex(),
            name: c.name,
            email: c.email,
            phone: c.phone,
            favorite: c.favorite,
            owner: c.owner.to_hex(),
        }
    }
}

/// Filter scoping a single contact to its owner.
pub fn owned_filter(id: &ObjectId, owner: &ObjectId) -> Document {
    doc! { "_id": id, "owner": owner }
}
