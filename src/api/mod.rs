pub mod contacts;
pub mod health;
pub mod swagger;
pub mod users;

use actix_web::{web, HttpResponse, ResponseError};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::utils::error::ApiError;
use crate::validation::Schema;

/// Registers every API route. Shared by `main` and the route tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health::health_check))
        .service(
            web::scope("/contacts")
                .service(contacts::list_contacts)
                .service(contacts::get_contact)
                .service(contacts::create_contact)
                .service(contacts::replace_contact)
                .service(contacts::update_favorite)
                .service(contacts::delete_contact),
        )
        .service(
            web::scope("/users")
                .service(users::signup)
                .service(users::login)
                .service(users::logout)
                .service(users::current)
                .service(users::update_avatar)
                .service(users::verify_email)
                .service(users::resend_verification),
        )
        .default_service(web::to(not_found));
}

pub async fn not_found() -> HttpResponse {
    ApiError::not_found().error_response()
}

/// Missing, non-JSON or `null` bodies are "invalid input"; anything else
/// goes through `schema` before being deserialized.
pub(crate) fn validated_body<T: DeserializeOwned>(
    body: Option<web::Json<Value>>,
    schema: &Schema,
) -> Result<T, ApiError> {
    let body = body
        .map(web::Json::into_inner)
        .filter(|value| !value.is_null())
        .ok_or_else(ApiError::invalid_input)?;

    schema.validate(&body)?;

    serde_json::from_value(body).map_err(|e| ApiError::BadRequest(e.to_string()))
}
