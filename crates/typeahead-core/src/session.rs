//! Session identity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::AppContext;

/// Process-lifetime identity for one browsing context
///
/// Generated once at first start, persisted with the context record, and
/// stable across restarts until an explicit clear. The `session_id`
/// never changes for a loaded session; `user_id` may be attached later
/// when the embedding application learns who the user is.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub session_id: String,
    pub app_context: AppContext,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Mint a fresh session
    pub fn new(app_context: AppContext, user_id: Option<String>) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            app_context,
            user_id,
            created_at: Utc::now(),
        }
    }
}
