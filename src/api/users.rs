use actix_multipart::Multipart;
use actix_web::{get, patch, post, web, HttpResponse};
use futures::TryStreamExt;
use serde_json::{json, Value};
use uuid::Uuid;

use super::validated_body;
use crate::middleware::AuthUser;
use crate::models::{Credentials, CurrentUserResponse, NewUser, ResendVerificationRequest, UserChanges, UserSummary};
use crate::services::email_service::{verification_link, EmailMessage};
use crate::state::AppState;
use crate::utils::{error::ApiError, gravatar, response};
use crate::validation::{CREDENTIALS, VERIFY_EMAIL};

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn wrong_credentials() -> ApiError {
    ApiError::Unauthorized("Email or password is wrong".to_string())
}

fn user_not_found() -> ApiError {
    ApiError::NotFound("User not found".to_string())
}

async fn send_verification(state: &AppState, email: &str, token: &str) -> Result<(), ApiError> {
    let link = verification_link(&state.config.api_base_url, token);
    state.mailer.send(&EmailMessage::verification(email, &link)).await?;
    Ok(())
}

/// POST /users/signup - Creates an unverified user and mails the verification link
#[utoipa::path(
    post,
    path = "/users/signup",
    tag = "Users",
    request_body = Credentials,
    responses(
        (status = 201, description = "User created", body = UserSummary),
        (status = 400, description = "Missing or invalid fields"),
        (status = 409, description = "Email is already in use")
    )
)]
#[post("/signup")]
pub async fn signup(state: web::Data<AppState>, body: Option<web::Json<Value>>) -> Result<HttpResponse, ApiError> {
    let credentials: Credentials = validated_body(body, &CREDENTIALS)?;
    let email = normalize_email(&credentials.email);

    log::info!("📝 POST /users/signup - email: {}", email);

    if state.users.get_by_email(&email).await?.is_some() {
        log::warn!("❌ Signup rejected, email in use: {}", email);
        return Err(ApiError::Conflict("Email is already in use".to_string()));
    }

    let password_hash = state.auth.hash_password(credentials.password).await?;
    let verification_token = Uuid::new_v4().to_string();

    let user = state
        .users
        .create(NewUser {
            avatar_url: gravatar::avatar_url(&email),
            email,
            password_hash,
            verification_token: verification_token.clone(),
        })
        .await?;

    // the user can ask for a resend through POST /users/verify
    if let Err(e) = send_verification(&state, &user.email, &verification_token).await {
        log::error!("❌ Verification email to {} failed: {}", user.email, e);
    }

    log::info!("✅ User {} registered", user.email);

    Ok(response::created(json!({
        "user": UserSummary {
            email: user.email,
            subscription: user.subscription,
        }
    })))
}

/// POST /users/login
#[utoipa::path(
    post,
    path = "/users/login",
    tag = "Users",
    request_body = Credentials,
    responses(
        (status = 200, description = "Session token issued"),
        (status = 400, description = "Missing or invalid fields"),
        (status = 401, description = "Wrong credentials or unverified email")
    )
)]
#[post("/login")]
pub async fn login(state: web::Data<AppState>, body: Option<web::Json<Value>>) -> Result<HttpResponse, ApiError> {
    let credentials: Credentials = validated_body(body, &CREDENTIALS)?;
    let email = normalize_email(&credentials.email);

    log::info!("🔐 POST /users/login - email: {}", email);

    let user = state.users.get_by_email(&email).await?.ok_or_else(|| {
        log::warn!("❌ Login failed, unknown email: {}", email);
        wrong_credentials()
    })?;

    if !state.auth.verify_password(credentials.password, user.password.clone()).await? {
        log::warn!("❌ Login failed, wrong password: {}", email);
        return Err(wrong_credentials());
    }

    if !user.verify {
        log::warn!("❌ Login refused, email not verified: {}", email);
        return Err(ApiError::Unauthorized("Email is not verified".to_string()));
    }

    let token = state.auth.issue_token(&user.id)?;
    let user = state
        .users
        .update(&user.id, UserChanges::session(Some(token.clone())))
        .await?
        .ok_or_else(wrong_credentials)?;

    log::info!("✅ Login successful: {}", email);

    Ok(response::ok(json!({
        "token": token,
        "user": UserSummary {
            email: user.email,
            subscription: user.subscription,
        }
    })))
}

/// GET /users/logout - Clears the stored session token
#[utoipa::path(
    get,
    path = "/users/logout",
    tag = "Users",
    responses(
        (status = 204, description = "Session cleared"),
        (status = 401, description = "Not authorized")
    ),
    security(("bearer_auth" = []))
)]
#[get("/logout")]
pub async fn logout(user: AuthUser, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    state.users.update(&user.id, UserChanges::session(None)).await?;

    log::info!("👋 Logout: {}", user.email);

    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    get,
    path = "/users/current",
    tag = "Users",
    responses(
        (status = 200, description = "The authenticated user", body = CurrentUserResponse),
        (status = 401, description = "Not authorized")
    ),
    security(("bearer_auth" = []))
)]
#[get("/current")]
pub async fn current(user: AuthUser, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let profile = state
        .users
        .get_by_id(&user.id)
        .await?
        .ok_or_else(ApiError::not_authorized)?;

    Ok(response::ok(json!({ "user": CurrentUserResponse::from(profile) })))
}

/// Reads the `avatar` part, skipping any other fields. Bigger than `limit` is a 400.
async fn read_avatar_field(mut payload: Multipart, limit: usize) -> Result<Vec<u8>, ApiError> {
    let bad_upload = |e: actix_multipart::MultipartError| ApiError::BadRequest(format!("invalid upload: {}", e));

    while let Some(mut field) = payload.try_next().await.map_err(bad_upload)? {
        if field.name() != Some("avatar") {
            while field.try_next().await.map_err(bad_upload)?.is_some() {}
            continue;
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = field.try_next().await.map_err(bad_upload)? {
            if bytes.len() + chunk.len() > limit {
                return Err(ApiError::BadRequest("avatar is too large".to_string()));
            }
            bytes.extend_from_slice(&chunk);
        }

        if !bytes.is_empty() {
            return Ok(bytes);
        }
    }

    Err(ApiError::BadRequest("avatar is required".to_string()))
}

/// PATCH /users/avatars - Multipart upload (`avatar` field), stored as 250x250
#[utoipa::path(
    patch,
    path = "/users/avatars",
    tag = "Users",
    request_body(content_type = "multipart/form-data", description = "Image in the `avatar` field"),
    responses(
        (status = 200, description = "Avatar replaced"),
        (status = 400, description = "Missing, oversized or undecodable image"),
        (status = 401, description = "Not authorized")
    ),
    security(("bearer_auth" = []))
)]
#[patch("/avatars")]
pub async fn update_avatar(
    user: AuthUser,
    state: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let bytes = read_avatar_field(payload, state.config.max_avatar_bytes).await?;

    log::info!("🖼️  PATCH /users/avatars - {} bytes from {}", bytes.len(), user.email);

    let avatar_url = state.avatars.store(&user.id, bytes).await?;
    state
        .users
        .update(&user.id, UserChanges::avatar(avatar_url.clone()))
        .await?
        .ok_or_else(ApiError::not_authorized)?;

    Ok(response::ok(json!({ "avatarURL": avatar_url })))
}

/// GET /users/verify/{verification_token} - Single-use token
#[utoipa::path(
    get,
    path = "/users/verify/{verification_token}",
    tag = "Users",
    params(("verification_token" = String, Path, description = "Token sent by email")),
    responses(
        (status = 200, description = "Email verified"),
        (status = 404, description = "Unknown or already used token")
    )
)]
#[get("/verify/{verification_token}")]
pub async fn verify_email(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let user = state
        .users
        .redeem_verification_token(&path)
        .await?
        .ok_or_else(user_not_found)?;

    log::info!("✅ Email verified: {}", user.email);

    Ok(response::ok(json!({ "message": "Verification successful" })))
}

/// POST /users/verify - Sends the verification email again
#[utoipa::path(
    post,
    path = "/users/verify",
    tag = "Users",
    request_body = ResendVerificationRequest,
    responses(
        (status = 200, description = "Verification email sent"),
        (status = 400, description = "Invalid body or already verified"),
        (status = 404, description = "Unknown email")
    )
)]
#[post("/verify")]
pub async fn resend_verification(
    state: web::Data<AppState>,
    body: Option<web::Json<Value>>,
) -> Result<HttpResponse, ApiError> {
    let request: ResendVerificationRequest = validated_body(body, &VERIFY_EMAIL)?;
    let email = normalize_email(&request.email);

    let user = state.users.get_by_email(&email).await?.ok_or_else(user_not_found)?;

    if user.verify {
        return Err(ApiError::BadRequest("Verification has already been passed".to_string()));
    }

    let token = match user.verification_token {
        Some(token) => token,
        None => {
            let token = Uuid::new_v4().to_string();
            state
                .users
                .update(&user.id, UserChanges {
                    verification_token: Some(Some(token.clone())),
                    ..Default::default()
                })
                .await?;
            token
        }
    };

    send_verification(&state, &user.email, &token).await?;

    log::info!("📧 Verification email re-sent to {}", user.email);

    Ok(response::ok(json!({ "message": "Verification email sent" })))
}

#[cfg(test)]
mod tests {
    use crate::api::configure;
    use crate::services::avatar_service::{testing::png_bytes, AVATAR_SIZE};
    use crate::services::email_service::testing::RecordingMailer;
    use crate::state::testing::{bearer, context, context_with_mailer, seed_user};
    use actix_web::{test, App};
    use serde_json::{json, Value};

    fn credentials(email: &str, password: &str) -> Value {
        json!({ "email": email, "password": password })
    }

    /// Token from the last verification link the mailer saw.
    fn last_verification_token(mailer: &RecordingMailer) -> String {
        let message = mailer.messages().pop().unwrap();
        let start = message.html.find("/users/verify/").unwrap() + "/users/verify/".len();
        let rest = &message.html[start..];
        rest[..rest.find('"').unwrap()].to_string()
    }

    #[actix_web::test]
    async fn signup_verify_login_current_logout() {
        let ctx = context();
        let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/users/signup")
            .set_json(credentials("Ann@Example.com", "secret"))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), 201);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["data"]["user"], json!({ "email": "ann@example.com", "subscription": "starter" }));

        assert_eq!(ctx.mailer.messages().len(), 1);
        assert_eq!(ctx.mailer.messages()[0].to, "ann@example.com");

        // not verified yet
        let req = test::TestRequest::post()
            .uri("/users/login")
            .set_json(credentials("ann@example.com", "secret"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 401);

        let token = last_verification_token(&ctx.mailer);
        let req = test::TestRequest::get().uri(&format!("/users/verify/{}", token)).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 200);

        let req = test::TestRequest::post()
            .uri("/users/login")
            .set_json(credentials("ann@example.com", "secret"))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), 200);
        let body: Value = test::read_body_json(res).await;
        let session = body["data"]["token"].as_str().unwrap().to_string();
        assert_eq!(body["data"]["user"]["email"], "ann@example.com");

        let req = test::TestRequest::get()
            .uri("/users/current")
            .insert_header(bearer(&session))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let user = &body["data"]["user"];
        assert_eq!(user["email"], "ann@example.com");
        assert_eq!(user["subscription"], "starter");
        assert!(user["avatarURL"].as_str().unwrap().starts_with("https://www.gravatar.com/avatar/"));
        assert!(user.get("password").is_none());
        assert!(user.get("token").is_none());

        let req = test::TestRequest::get()
            .uri("/users/logout")
            .insert_header(bearer(&session))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), 204);
        assert!(test::read_body(res).await.is_empty());

        let req = test::TestRequest::get()
            .uri("/users/current")
            .insert_header(bearer(&session))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 401);
    }

    #[actix_web::test]
    async fn duplicate_signup_is_a_conflict() {
        let ctx = context();
        let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure)).await;
        seed_user(&ctx.state, "ann@example.com", "pw", true).await;

        let req = test::TestRequest::post()
            .uri("/users/signup")
            .set_json(credentials("ANN@example.com", "other"))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), 409);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body, json!({ "message": "Email is already in use", "code": 409 }));
    }

    #[actix_web::test]
    async fn signup_validates_before_creating() {
        let ctx = context();
        let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/users/signup")
            .set_json(json!({ "email": "ann@example.com" }))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), 400);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["status"], "\"password\" is required");
        assert_eq!(body["error"]["constraint"], "required");

        assert!(ctx.state.users.get_by_email("ann@example.com").await.unwrap().is_none());
        assert!(ctx.mailer.messages().is_empty());
    }

    #[actix_web::test]
    async fn signup_survives_mail_failure() {
        let ctx = context_with_mailer(RecordingMailer::failing());
        let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/users/signup")
            .set_json(credentials("ann@example.com", "secret"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 201);

        let user = ctx.state.users.get_by_email("ann@example.com").await.unwrap().unwrap();
        assert!(!user.verify);
        assert!(user.verification_token.is_some());
        assert_ne!(user.password, "secret");
    }

    #[actix_web::test]
    async fn wrong_password_is_unauthorized() {
        let ctx = context();
        let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure)).await;
        seed_user(&ctx.state, "ann@example.com", "right", true).await;

        for body in [credentials("ann@example.com", "wrong"), credentials("nobody@example.com", "right")] {
            let req = test::TestRequest::post().uri("/users/login").set_json(body).to_request();
            let res = test::call_service(&app, req).await;
            assert_eq!(res.status(), 401);
            let body: Value = test::read_body_json(res).await;
            assert_eq!(body, json!({ "message": "Email or password is wrong", "code": 401 }));
        }
    }

    #[actix_web::test]
    async fn unverified_accounts_cannot_log_in() {
        let ctx = context();
        let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure)).await;
        seed_user(&ctx.state, "ann@example.com", "pw", false).await;

        let req = test::TestRequest::post()
            .uri("/users/login")
            .set_json(credentials("ann@example.com", "pw"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 401);
    }

    #[actix_web::test]
    async fn a_newer_login_supersedes_the_old_token() {
        let ctx = context();
        let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure)).await;
        let (_, old_token) = seed_user(&ctx.state, "ann@example.com", "pw", true).await;

        let req = test::TestRequest::post()
            .uri("/users/login")
            .set_json(credentials("ann@example.com", "pw"))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let new_token = body["data"]["token"].as_str().unwrap().to_string();
        assert_ne!(new_token, old_token);

        let req = test::TestRequest::get().uri("/users/current").insert_header(bearer(&old_token)).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 401);

        let req = test::TestRequest::get().uri("/users/current").insert_header(bearer(&new_token)).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 200);
    }

    #[actix_web::test]
    async fn verification_tokens_are_single_use() {
        let ctx = context();
        let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/users/signup")
            .set_json(credentials("ann@example.com", "secret"))
            .to_request();
        test::call_service(&app, req).await;
        let token = last_verification_token(&ctx.mailer);

        let req = test::TestRequest::get().uri(&format!("/users/verify/{}", token)).to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["message"], "Verification successful");

        let req = test::TestRequest::get().uri(&format!("/users/verify/{}", token)).to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), 404);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body, json!({ "status": "User not found", "code": 404 }));

        let user = ctx.state.users.get_by_email("ann@example.com").await.unwrap().unwrap();
        assert!(user.verify);
        assert!(user.verification_token.is_none());
    }

    #[actix_web::test]
    async fn concurrent_redemptions_succeed_once() {
        let ctx = context();
        let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure)).await;
        let (pending, _) = seed_user(&ctx.state, "ann@example.com", "pw", false).await;
        let uri = format!("/users/verify/{}", pending.verification_token.unwrap());

        let (a, b) = futures::join!(
            test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()),
            test::call_service(&app, test::TestRequest::get().uri(&uri).to_request())
        );

        let mut statuses = [a.status().as_u16(), b.status().as_u16()];
        statuses.sort_unstable();
        assert_eq!(statuses, [200, 404]);
    }

    #[actix_web::test]
    async fn resend_verification_states() {
        let ctx = context();
        let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure)).await;
        seed_user(&ctx.state, "done@example.com", "pw", true).await;
        let (pending, _) = seed_user(&ctx.state, "pending@example.com", "pw", false).await;

        let req = test::TestRequest::post()
            .uri("/users/verify")
            .set_json(json!({ "email": "pending@example.com" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 200);
        assert_eq!(
            last_verification_token(&ctx.mailer),
            pending.verification_token.clone().unwrap()
        );

        let req = test::TestRequest::post()
            .uri("/users/verify")
            .set_json(json!({ "email": "done@example.com" }))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), 400);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["status"], "Verification has already been passed");

        let req = test::TestRequest::post()
            .uri("/users/verify")
            .set_json(json!({ "email": "ghost@example.com" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 404);

        let req = test::TestRequest::post().uri("/users/verify").set_json(json!({})).to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), 400);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["status"], "\"email\" is required");
    }

    #[actix_web::test]
    async fn resend_reports_mail_failure() {
        let ctx = context_with_mailer(RecordingMailer::failing());
        let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure)).await;
        seed_user(&ctx.state, "pending@example.com", "pw", false).await;

        let req = test::TestRequest::post()
            .uri("/users/verify")
            .set_json(json!({ "email": "pending@example.com" }))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), 500);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body, json!({ "message": "Internal server error", "code": 500 }));
    }

    fn multipart(field: &str, bytes: &[u8]) -> (String, Vec<u8>) {
        let boundary = "contacts-test-boundary";
        let mut body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"a.png\"\r\n\
             Content-Type: image/png\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
        (format!("multipart/form-data; boundary={boundary}"), body)
    }

    #[actix_web::test]
    async fn avatar_upload_resizes_and_updates_the_user() {
        let ctx = context();
        let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure)).await;
        let (user, token) = seed_user(&ctx.state, "ann@example.com", "pw", true).await;

        let (content_type, body) = multipart("avatar", &png_bytes(640, 480));
        let req = test::TestRequest::patch()
            .uri("/users/avatars")
            .insert_header(bearer(&token))
            .insert_header(("Content-Type", content_type))
            .set_payload(body)
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), 200);

        let body: Value = test::read_body_json(res).await;
        let url = body["data"]["avatarURL"].as_str().unwrap().to_string();
        assert!(url.starts_with("http://localhost:3000/avatars/"));
        assert!(url.contains(&user.id.to_hex()));

        let file_name = url.rsplit('/').next().unwrap();
        let stored = image::open(ctx.state.avatars.avatars_dir().join(file_name)).unwrap();
        assert_eq!((stored.width(), stored.height()), (AVATAR_SIZE, AVATAR_SIZE));

        let record = ctx.state.users.get_record(&user.id).await.unwrap().unwrap();
        assert_eq!(record.avatar_url, url);
    }

    #[actix_web::test]
    async fn avatar_upload_rejects_missing_or_bogus_files() {
        let ctx = context();
        let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure)).await;
        let (_, token) = seed_user(&ctx.state, "ann@example.com", "pw", true).await;

        let (content_type, body) = multipart("picture", &png_bytes(10, 10));
        let req = test::TestRequest::patch()
            .uri("/users/avatars")
            .insert_header(bearer(&token))
            .insert_header(("Content-Type", content_type))
            .set_payload(body)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 400);

        let (content_type, body) = multipart("avatar", b"definitely not an image");
        let req = test::TestRequest::patch()
            .uri("/users/avatars")
            .insert_header(bearer(&token))
            .insert_header(("Content-Type", content_type))
            .set_payload(body)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 400);
    }

    #[actix_web::test]
    async fn avatar_upload_requires_a_session() {
        let ctx = context();
        let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure)).await;

        let (content_type, body) = multipart("avatar", &png_bytes(10, 10));
        let req = test::TestRequest::patch()
            .uri("/users/avatars")
            .insert_header(("Content-Type", content_type))
            .set_payload(body)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 401);
    }
}
