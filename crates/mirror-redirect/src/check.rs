//! Check endpoint wire type.

use serde::{Deserialize, Serialize};

/// Body of a `GET /check` response: `{"ok": true, "url": "..."}` or `{"ok": false}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl CheckResponse {
    pub fn found(url: impl Into<String>) -> Self {
        Self {
            ok: true,
            url: Some(url.into()),
        }
    }

    pub fn not_found() -> Self {
        Self { ok: false, url: None }
    }
}

impl From<Option<String>> for CheckResponse {
    fn from(url: Option<String>) -> Self {
        url.map_or_else(Self::not_found, Self::found)
    }
}
