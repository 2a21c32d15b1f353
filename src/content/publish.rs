//! Publication state
//!
//! Content rows carry both a `status` string and a `published` flag. Writes
//! may supply either; the other is derived so the two never disagree.

use crate::error::{validation_error, AppError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Draft,
    Published,
    Archived,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Draft => "draft",
            Status::Published => "published",
            Status::Archived => "archived",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(Status::Draft),
            "published" => Ok(Status::Published),
            "archived" => Ok(Status::Archived),
            other => Err(validation_error(format!(
                "Invalid status '{}' (expected draft, published or archived)",
                other
            ))),
        }
    }
}

/// Reconciled status and published flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishState {
    pub status: Status,
    pub published: bool,
}

impl PublishState {
    pub fn draft() -> Self {
        Self { status: Status::Draft, published: false }
    }

    fn from_status(status: Status) -> Self {
        Self { status, published: status == Status::Published }
    }
}

/// Derive a consistent state from whatever the caller supplied.
///
/// Returns `None` when neither value was given. When both are given the
/// status wins.
pub fn reconcile(status: Option<&str>, published: Option<bool>) -> Result<Option<PublishState>, AppError> {
    match (status, published) {
        (Some(s), _) => Ok(Some(PublishState::from_status(s.parse()?))),
        (None, Some(true)) => Ok(Some(PublishState::from_status(Status::Published))),
        (None, Some(false)) => Ok(Some(PublishState::from_status(Status::Draft))),
        (None, None) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_status_only() {
        assert_eq!(
            reconcile(Some("published"), None).unwrap(),
            Some(PublishState { status: Status::Published, published: true })
        );
        assert_eq!(
            reconcile(Some("Draft"), None).unwrap(),
            Some(PublishState { status: Status::Draft, published: false })
        );
        assert_eq!(
            reconcile(Some("archived"), None).unwrap(),
            Some(PublishState { status: Status::Archived, published: false })
        );
    }

    #[test]
    fn test_published_only() {
        assert_eq!(reconcile(None, Some(true)).unwrap().unwrap().status, Status::Published);
        assert_eq!(reconcile(None, Some(false)).unwrap().unwrap().status, Status::Draft);
    }

    #[test]
    fn test_status_wins_over_flag() {
        let state = reconcile(Some("draft"), Some(true)).unwrap().unwrap();
        assert_eq!(state, PublishState::draft());
    }

    #[test]
    fn test_neither_and_invalid() {
        assert_eq!(reconcile(None, None).unwrap(), None);
        assert!(reconcile(Some("live"), None).is_err());
    }
}
