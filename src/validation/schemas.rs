use super::{FieldRule, Schema};

/// Full contact body: `POST /contacts`, `PUT /contacts/{id}`
pub static CONTACT: Schema = Schema {
    fields: &[
        FieldRule::string("name"),
        FieldRule::email("email"),
        FieldRule::string("phone"),
        FieldRule::boolean("favorite"),
    ],
    allow_unknown: false,
};

/// `PATCH /contacts/{id}/favorite`
pub static FAVORITE: Schema = Schema {
    fields: &[FieldRule::boolean("favorite")],
    allow_unknown: false,
};

/// Signup and login
pub static CREDENTIALS: Schema = Schema {
    fields: &[FieldRule::email("email"), FieldRule::string("password")],
    allow_unknown: false,
};

/// Resend of the verification email
pub static VERIFY_EMAIL: Schema = Schema {
    fields: &[FieldRule::email("email")],
    allow_unknown: false,
};
