use utoipa::OpenApi;
use utoipa::openapi::security::{SecurityScheme, HttpAuthScheme, HttpBuilder};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Contacts Service API",
        version = "1.0.0",
        description = "Personal contact book with email-verified user accounts.\n\n**Authentication:** `/contacts` and most `/users` endpoints require the JWT returned by `POST /users/login` as a Bearer token."
    ),
    paths(
        // Contacts
        crate::api::contacts::list_contacts,
        crate::api::contacts::get_contact,
        crate::api::contacts::create_contact,
        crate::api::contacts::replace_contact,
        crate::api::contacts::update_favorite,
        crate::api::contacts::delete_contact,

        // Users
        crate::api::users::signup,
        crate::api::users::login,
        crate::api::users::logout,
        crate::api::users::current,
        crate::api::users::update_avatar,
        crate::api::users::verify_email,
        crate::api::users::resend_verification,

        // Health
        crate::api::health::health_check,
    ),
    components(
        schemas(
            crate::models::ContactInput,
            crate::models::FavoriteInput,
            crate::models::ContactResponse,
            crate::models::Credentials,
            crate::models::ResendVerificationRequest,
            crate::models::UserSummary,
            crate::models::CurrentUserResponse,
            crate::models::Subscription,
            crate::api::health::HealthResponse,
        )
    ),
    tags(
        (name = "Contacts", description = "Contacts owned by the authenticated user. Other users' contacts are reported as not found."),
        (name = "Users", description = "Signup, email verification, login/logout, profile and avatar."),
        (name = "Health", description = "Liveness and database reachability."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Token from POST /users/login"))
                        .build()
                ),
            );
        }
    }
}
