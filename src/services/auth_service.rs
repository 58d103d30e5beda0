use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::utils::error::ApiError;

// JWT Claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // user _id (hex)
    pub iat: usize,
    pub exp: usize,
    pub jti: String,
    pub aud: String,
    pub iss: String,
}

/// Password hashing and session-token signing.
#[derive(Clone)]
pub struct AuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
    ttl: Duration,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            issuer: config.jwt_issuer.clone(),
            audience: config.jwt_audience.clone(),
            ttl: Duration::minutes(config.jwt_ttl_minutes),
            bcrypt_cost: config.bcrypt_cost,
        }
    }

    /// Signs a session token for `user_id`. Each call yields a distinct token.
    pub fn issue_token(&self, user_id: &ObjectId) -> Result<String, ApiError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_hex(),
            iat: now.timestamp() as usize,
            exp: (now + self.ttl).timestamp() as usize,
            jti: Uuid::new_v4().to_string(),
            aud: self.audience.clone(),
            iss: self.issuer.clone(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| ApiError::Internal(format!("Failed to generate token: {}", e)))
    }

    /// Checks signature, expiry, issuer and audience.
    pub fn verify_token(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[&self.audience]);
        validation.set_issuer(&[&self.issuer]);

        decode::<Claims>(token, &self.decoding_key, &validation).map(|data| data.claims)
    }

    pub async fn hash_password(&self, password: String) -> Result<String, ApiError> {
        let cost = self.bcrypt_cost;
        tokio::task::spawn_blocking(move || hash(password, cost))
            .await
            .map_err(|e| ApiError::Internal(format!("Hashing task failed: {}", e)))?
            .map_err(|e| ApiError::Internal(format!("Failed to hash password: {}", e)))
    }

    pub async fn verify_password(&self, password: String, password_hash: String) -> Result<bool, ApiError> {
        tokio::task::spawn_blocking(move || verify(password, &password_hash))
            .await
            .map_err(|e| ApiError::Internal(format!("Password verification task failed: {}", e)))?
            .map_err(|e| ApiError::Internal(format!("Password verification error: {}", e)))
    }
}
