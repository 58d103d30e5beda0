use mongodb::bson::{oid::ObjectId, Bson, Document};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Subscription {
    #[default]
    Starter,
    Pro,
    Business,
}

impl Subscription {
    pub fn as_str(&self) -> &'static str {
        match self {
            Subscription::Starter => "starter",
            Subscription::Pro => "pro",
            Subscription::Business => "business",
        }
    }
}

/// User stored in the `users` collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub email: String,
    /// bcrypt hash, never the plaintext
    pub password: String,
    #[serde(rename = "avatarURL")]
    pub avatar_url: String,
    #[serde(default)]
    pub subscription: Subscription,
    /// Current session token; `None` after logout
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub verify: bool,
    #[serde(rename = "verificationToken", default)]
    pub verification_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub avatar_url: String,
    pub verification_token: String,
}

impl NewUser {
    pub fn into_user(self, id: ObjectId) -> User {
        User {
            id,
            email: self.email,
            password: self.password_hash,
            avatar_url: self.avatar_url,
            subscription: Subscription::default(),
            token: None,
            verify: false,
            verification_token: Some(self.verification_token),
        }
    }
}

/// Field merge for a user. The outer `Option` says whether to touch the
/// field, the inner one (for nullable fields) is the new value.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub token: Option<Option<String>>,
    pub verify: Option<bool>,
    pub verification_token: Option<Option<String>>,
    pub avatar_url: Option<String>,
    pub subscription: Option<Subscription>,
}

impl UserChanges {
    pub fn session(token: Option<String>) -> Self {
        Self {
            token: Some(token),
            ..Default::default()
        }
    }

    pub fn verified() -> Self {
        Self {
            verify: Some(true),
            verification_token: Some(None),
            ..Default::default()
        }
    }

    pub fn avatar(url: String) -> Self {
        Self {
            avatar_url: Some(url),
            ..Default::default()
        }
    }

    pub fn to_set_document(&self) -> Document {
        let mut set = Document::new();
        if let Some(token) = &self.token {
            set.insert("token", nullable(token));
        }
        if let Some(verify) = self.verify {
            set.insert("verify", verify);
        }
        if let Some(verification_token) = &self.verification_token {
            set.insert("verificationToken", nullable(verification_token));
        }
        if let Some(avatar_url) = &self.avatar_url {
            set.insert("avatarURL", avatar_url);
        }
        if let Some(subscription) = self.subscription {
            set.insert("subscription", subscription.as_str());
        }
        set
    }

    pub fn apply(&self, user: &mut User) {
        if let Some(token) = &self.token { user.token = token.clone(); }
        if let Some(verify) = self.verify { user.verify = verify; }
        if let Some(verification_token) = &self.verification_token {
            user.verification_token = verification_token.clone();
        }
        if let Some(avatar_url) = &self.avatar_url { user.avatar_url = avatar_url.clone(); }
        if let Some(subscription) = self.subscription { user.subscription = subscription; }
    }
}

fn nullable(value: &Option<String>) -> Bson {
    value.as_ref().map(|v| Bson::String(v.clone())).unwrap_or(Bson::Null)
}

/// Safe projection of a user: no password hash, no tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub email: String,
    #[serde(default)]
    pub subscription: Subscription,
    #[serde(rename = "avatarURL", default)]
    pub avatar_url: String,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        UserProfile {
            id: user.id,
            email: user.email.clone(),
            subscription: user.subscription,
            avatar_url: user.avatar_url.clone(),
        }
    }
}

/// Body of `POST /users/signup` and `POST /users/login`
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Body of `POST /users/verify`
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct ResendVerificationRequest {
    pub email: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct UserSummary {
    pub email: String,
    pub subscription: Subscription,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CurrentUserResponse {
    pub id: String,
    pub email: String,
    pub subscription: Subscription,
    #[serde(rename = "avatarURL")]
    pub avatar_url: String,
}

impl From<UserProfile> for CurrentUserResponse {
    fn from(p: UserProfile) -> Self {
        CurrentUserResponse {
            id: p.id.to_hex(),
            email: p.email,
            subscription: p.subscription,
            avatar_url: p.avatar_url,
        }
    }
}
