use actix_web::{http::StatusCode, HttpResponse};
use serde::Serialize;
use serde_json::json;

/// `{"status":"success","code":...,"data":...}`
pub fn success<T: Serialize>(code: StatusCode, data: T) -> HttpResponse {
    HttpResponse::build(code).json(json!({
        "status": "success",
        "code": code.as_u16(),
        "data": data,
    }))
}

pub fn ok<T: Serialize>(data: T) -> HttpResponse {
    success(StatusCode::OK, data)
}

pub fn created<T: Serialize>(data: T) -> HttpResponse {
    success(StatusCode::CREATED, data)
}

/// Envelope without payload, e.g. `{"status":"contact deleted","code":200}`
pub fn status(code: StatusCode, status: &str) -> HttpResponse {
    HttpResponse::build(code).json(json!({
        "status": status,
        "code": code.as_u16(),
    }))
}
