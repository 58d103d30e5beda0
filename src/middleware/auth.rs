use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;
use mongodb::bson::oid::ObjectId;

use crate::state::AppState;
use crate::utils::error::ApiError;

/// Identity of the caller, resolved from `Authorization: Bearer <jwt>`.
///
/// Taking `AuthUser` as a handler argument is what makes a route
/// authenticated. Resolution goes through these steps:
///
/// 1. no usable bearer header → rejected
/// 2. JWT signature / expiry / issuer / audience check → rejected on failure
/// 3. the user in `sub` must exist and its stored session token must equal
///    the presented one (cleared on logout, replaced on the next login)
///
/// Every rejection is the same generic 401; the reason is only logged.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: ObjectId,
    pub email: String,
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<AppState>>().cloned();
        let token = bearer_token(req).map(str::to_owned);

        Box::pin(async move {
            let state = state.ok_or_else(|| ApiError::Internal("AppState is not registered".to_string()))?;
            let token = token.ok_or_else(|| {
                log::debug!("🔒 Missing or malformed Authorization header");
                ApiError::not_authorized()
            })?;
            authenticate(&state, token).await
        })
    }
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme == "Bearer" && !token.is_empty()).then_some(token)
}

async fn authenticate(state: &AppState, token: String) -> Result<AuthUser, ApiError> {
    let claims = state.auth.verify_token(&token).map_err(|e| {
        log::warn!("🔒 Rejected token: {}", e);
        ApiError::not_authorized()
    })?;

    let user_id = ObjectId::parse_str(&claims.sub).map_err(|_| {
        log::warn!("🔒 Token subject is not a user id: {}", claims.sub);
        ApiError::not_authorized()
    })?;

    let user = state.users.get_record(&user_id).await?.ok_or_else(|| {
        log::warn!("🔒 Token for unknown user {}", user_id);
        ApiError::not_authorized()
    })?;

    if user.token.as_deref() != Some(token.as_str()) {
        log::warn!("🔒 Stale session token for user {}", user_id);
        return Err(ApiError::not_authorized());
    }

    Ok(AuthUser {
        id: user.id,
        email: user.email,
    })
}
