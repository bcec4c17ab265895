//! Response envelope conventions.
//!
//! Every call returns a JSON object carrying a numeric `code`. Two codes are
//! sentinels the dispatcher rewrites:
//!
//! | Code  | Meaning          | Rewrite                                      |
//! |-------|------------------|----------------------------------------------|
//! | `301` | not logged in    | `msg` set to [`NOT_LOGGED_IN_MSG`]           |
//! | `502` | bad credentials  | `/login` reply replaced by a fixed envelope  |

use serde_json::{Value, json};

/// Success.
pub const CODE_OK: i64 = 200;
/// The call needs a logged-in session.
pub const CODE_NOT_LOGGED_IN: i64 = 301;
/// Login rejected the account or password.
pub const CODE_BAD_CREDENTIALS: i64 = 502;
/// Produced locally when a scraped page is unusable.
pub const CODE_UPSTREAM_ERROR: i64 = 500;

/// `msg` of every not-logged-in envelope.
pub const NOT_LOGGED_IN_MSG: &str = "未登录";
/// `msg` and `message` of the rewritten bad-credentials envelope.
pub const BAD_CREDENTIALS_MSG: &str = "账号或密码错误";
/// `message` of `/check/music` for an unplayable track.
pub const NO_RIGHTS_MSG: &str = "亲爱的,暂无版权";

/// Read `code` from an envelope; numeric strings are accepted too.
pub fn code(envelope: &Value) -> Option<i64> {
    match envelope.get("code")? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// `true` for a `301` envelope.
pub fn is_not_logged_in(envelope: &Value) -> bool {
    code(envelope) == Some(CODE_NOT_LOGGED_IN)
}

/// `{code: 301, msg: NOT_LOGGED_IN_MSG}`.
pub fn not_logged_in() -> Value {
    json!({ "code": CODE_NOT_LOGGED_IN, "msg": NOT_LOGGED_IN_MSG })
}

/// Fixed `/login` reply for a `502`.
pub fn bad_credentials() -> Value {
    json!({
        "msg": BAD_CREDENTIALS_MSG,
        "code": CODE_BAD_CREDENTIALS,
        "message": BAD_CREDENTIALS_MSG,
    })
}

/// `{code: 500, msg}`.
pub fn upstream_error(msg: impl Into<String>) -> Value {
    json!({ "code": CODE_UPSTREAM_ERROR, "msg": msg.into() })
}

/// Replace the `msg` of a not-logged-in envelope with the fixed text.
pub(crate) fn normalize_not_logged_in(envelope: &mut Value) {
    if is_not_logged_in(envelope) {
        if let Some(obj) = envelope.as_object_mut() {
            obj.insert("msg".into(), NOT_LOGGED_IN_MSG.into());
        }
    }
}
