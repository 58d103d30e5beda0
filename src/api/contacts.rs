use actix_web::{delete, get, http::StatusCode, patch, post, put, web, HttpResponse};
use mongodb::bson::oid::ObjectId;
use serde_json::{json, Value};

use super::validated_body;
use crate::middleware::AuthUser;
use crate::models::{ContactChanges, ContactInput, ContactResponse, FavoriteInput};
use crate::state::AppState;
use crate::utils::{error::ApiError, response};
use crate::validation::{CONTACT, FAVORITE};

/// Ids that are not ObjectIds cannot match anything: same 404 as a missing contact.
fn contact_id(raw: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(raw).map_err(|_| ApiError::not_found())
}

fn contact_data(contact: impl Into<ContactResponse>) -> Value {
    json!({ "contact": contact.into() })
}

/// GET /contacts - Contacts owned by the caller
#[utoipa::path(
    get,
    path = "/contacts",
    tag = "Contacts",
    responses(
        (status = 200, description = "Contacts owned by the caller", body = [ContactResponse]),
        (status = 401, description = "Not authorized")
    ),
    security(("bearer_auth" = []))
)]
#[get("")]
pub async fn list_contacts(user: AuthUser, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let contacts: Vec<ContactResponse> = state
        .contacts
        .list(&user.id)
        .await?
        .into_iter()
        .map(ContactResponse::from)
        .collect();

    log::info!("📋 GET /contacts - {} contacts for {}", contacts.len(), user.email);

    Ok(response::ok(json!({ "contacts": contacts })))
}

/// GET /contacts/{id}
#[utoipa::path(
    get,
    path = "/contacts/{id}",
    tag = "Contacts",
    params(("id" = String, Path, description = "Contact id")),
    responses(
        (status = 200, description = "The contact", body = ContactResponse),
        (status = 401, description = "Not authorized"),
        (status = 404, description = "No such contact for this user")
    ),
    security(("bearer_auth" = []))
)]
#[get("/{id}")]
pub async fn get_contact(
    user: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = contact_id(&path)?;

    let contact = state
        .contacts
        .get_by_id(&id, &user.id)
        .await?
        .ok_or_else(ApiError::not_found)?;

    Ok(response::ok(contact_data(contact)))
}

/// POST /contacts - Creates a contact owned by the caller
#[utoipa::path(
    post,
    path = "/contacts",
    tag = "Contacts",
    request_body = ContactInput,
    responses(
        (status = 201, description = "Contact created", body = ContactResponse),
        (status = 400, description = "Missing or invalid fields"),
        (status = 401, description = "Not authorized")
    ),
    security(("bearer_auth" = []))
)]
#[post("")]
pub async fn create_contact(
    user: AuthUser,
    state: web::Data<AppState>,
    body: Option<web::Json<Value>>,
) -> Result<HttpResponse, ApiError> {
    let input: ContactInput = validated_body(body, &CONTACT)?;

    let contact = state.contacts.create(input.into_new_contact(user.id)).await?;

    log::info!("✅ Contact {} created for {}", contact.id, user.email);

    Ok(response::created(contact_data(contact)))
}

/// PUT /contacts/{id} - Replaces every field of the contact
#[utoipa::path(
    put,
    path = "/contacts/{id}",
    tag = "Contacts",
    params(("id" = String, Path, description = "Contact id")),
    request_body = ContactInput,
    responses(
        (status = 200, description = "Contact updated", body = ContactResponse),
        (status = 400, description = "Missing or invalid fields"),
        (status = 401, description = "Not authorized"),
        (status = 404, description = "No such contact for this user")
    ),
    security(("bearer_auth" = []))
)]
#[put("/{id}")]
pub async fn replace_contact(
    user: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: Option<web::Json<Value>>,
) -> Result<HttpResponse, ApiError> {
    let input: ContactInput = validated_body(body, &CONTACT)?;
    let id = contact_id(&path)?;

    let contact = state
        .contacts
        .update(&id, &user.id, ContactChanges::from(input))
        .await?
        .ok_or_else(ApiError::not_found)?;

    log::info!("✏️  Contact {} updated by {}", id, user.email);

    Ok(response::ok(contact_data(contact)))
}

/// PATCH /contacts/{id}/favorite - Touches `favorite` only
#[utoipa::path(
    patch,
    path = "/contacts/{id}/favorite",
    tag = "Contacts",
    params(("id" = String, Path, description = "Contact id")),
    request_body = FavoriteInput,
    responses(
        (status = 200, description = "Favorite flag updated", body = ContactResponse),
        (status = 400, description = "Missing or invalid `favorite`"),
        (status = 401, description = "Not authorized"),
        (status = 404, description = "No such contact for this user")
    ),
    security(("bearer_auth" = []))
)]
#[patch("/{id}/favorite")]
pub async fn update_favorite(
    user: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: Option<web::Json<Value>>,
) -> Result<HttpResponse, ApiError> {
    let input: FavoriteInput = validated_body(body, &FAVORITE)?;
    let id = contact_id(&path)?;

    let contact = state
        .contacts
        .update(&id, &user.id, ContactChanges::favorite(input.favorite))
        .await?
        .ok_or_else(ApiError::not_found)?;

    Ok(response::ok(contact_data(contact)))
}

/// DELETE /contacts/{id}
#[utoipa::path(
    delete,
    path = "/contacts/{id}",
    tag = "Contacts",
    params(("id" = String, Path, description = "Contact id")),
    responses(
        (status = 200, description = "Contact deleted"),
        (status = 401, description = "Not authorized"),
        (status = 404, description = "No such contact for this user")
    ),
    security(("bearer_auth" = []))
)]
#[delete("/{id}")]
pub async fn delete_contact(
    user: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = contact_id(&path)?;

    state
        .contacts
        .remove(&id, &user.id)
        .await?
        .ok_or_else(ApiError::not_found)?;

    log::info!("🗑️ Contact {} deleted by {}", id, user.email);

    Ok(response::status(StatusCode::OK, "contact deleted"))
}
