pub mod auth_service;
pub mod avatar_service;
pub mod email_service;
