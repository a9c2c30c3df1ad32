//! Toast notifications.
//!
//! Handlers push a toast into the session before redirecting; the next full
//! page render takes and displays them once.

use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use super::session_keys;

/// Visual style of a toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToastKind {
    Success,
    Error,
    Info,
}

impl ToastKind {
    /// CSS modifier class used by the layout.
    #[must_use]
    pub const fn css_class(&self) -> &'static str {
        match self {
            Self::Success => "toast-success",
            Self::Error => "toast-error",
            Self::Info => "toast-info",
        }
    }
}

/// A one-shot message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
}

impl Toast {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Error,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Info,
            message: message.into(),
        }
    }

    /// Queue this toast for the next rendered page.
    ///
    /// Failures are logged and swallowed; a lost toast must not fail the request.
    pub async fn push(self, session: &Session) {
        let mut toasts: Vec<Self> = session
            .get(session_keys::TOASTS)
            .await
            .ok()
            .flatten()
            .unwrap_or_default();
        toasts.push(self);
        if let Err(e) = session.insert(session_keys::TOASTS, toasts).await {
            tracing::warn!(error = %e, "Failed to queue toast");
        }
    }

    /// Take every queued toast, leaving the queue empty.
    pub async fn take_all(session: &Session) -> Vec<Self> {
        session
            .remove::<Vec<Self>>(session_keys::TOASTS)
            .await
            .ok()
            .flatten()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn test_toasts_are_shown_once() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);

        Toast::success("Added to cart").push(&session).await;
        Toast::error("Out of stock").push(&session).await;

        let toasts = Toast::take_all(&session).await;
        assert_eq!(
            toasts,
            vec![Toast::success("Added to cart"), Toast::error("Out of stock")]
        );
        assert!(Toast::take_all(&session).await.is_empty());
    }
}
