//! Bulk actions over a list of ids

use super::registry::Resource;
use crate::error::{validation_error, AppError};
use serde::{Deserialize, Serialize};

/// Largest id list accepted in one request
pub const MAX_BULK_IDS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkAction {
    Publish,
    Unpublish,
    Feature,
    Unfeature,
    Delete,
}

impl BulkAction {
    /// Reject actions the resource has no columns for
    pub fn check_applicable(&self, resource: &Resource) -> Result<(), AppError> {
        let ok = match self {
            BulkAction::Publish | BulkAction::Unpublish => resource.publishable,
            BulkAction::Feature | BulkAction::Unfeature => resource.featurable,
            BulkAction::Delete => true,
        };
        if ok {
            Ok(())
        } else {
            Err(validation_error(format!(
                "Action '{}' is not supported for {}",
                self.as_str(),
                resource.name
            )))
        }
    }

    /// SET clause for update actions; `None` for delete
    pub fn set_clause(&self) -> Option<&'static str> {
        match self {
            BulkAction::Publish => Some(
                "status = 'published', published = TRUE, published_at = COALESCE(published_at, NOW())",
            ),
            BulkAction::Unpublish => Some("status = 'draft', published = FALSE"),
            BulkAction::Feature => Some("featured = TRUE"),
            BulkAction::Unfeature => Some("featured = FALSE"),
            BulkAction::Delete => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BulkAction::Publish => "publish",
            BulkAction::Unpublish => "unpublish",
            BulkAction::Feature => "feature",
            BulkAction::Unfeature => "unfeature",
            BulkAction::Delete => "delete",
        }
    }
}

/// Deduplicate ids (keeping first-seen order) and enforce limits
pub fn normalize_ids(ids: &[i32]) -> Result<Vec<i32>, AppError> {
    if ids.is_empty() {
        return Err(validation_error("`ids` must contain at least one id"));
    }
    if let Some(bad) = ids.iter().find(|id| **id <= 0) {
        return Err(validation_error(format!("Invalid id {}", bad)));
    }

    let mut seen = std::collections::HashSet::new();
    let unique: Vec<i32> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();

    if unique.len() > MAX_BULK_IDS {
        return Err(validation_error(format!(
            "At most {} ids can be processed at once",
            MAX_BULK_IDS
        )));
    }
    Ok(unique)
}

/// Result of a bulk action
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkOutcome {
    pub action: BulkAction,
    pub requested: usize,
    pub affected: Vec<i32>,
    pub missing: Vec<i32>,
    pub partial: bool,
}

impl BulkOutcome {
    pub fn new(action: BulkAction, requested: &[i32], affected: Vec<i32>) -> Self {
        let missing: Vec<i32> = requested
            .iter()
            .copied()
            .filter(|id| !affected.contains(id))
            .collect();
        Self {
            action,
            requested: requested.len(),
            partial: !missing.is_empty(),
            affected,
            missing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::registry::find;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_actions() {
        let action: BulkAction = serde_json::from_str("\"unfeature\"").unwrap();
        assert_eq!(action, BulkAction::Unfeature);
        assert!(serde_json::from_str::<BulkAction>("\"archive\"").is_err());
    }

    #[test]
    fn test_applicability() {
        let articles = find("articles").unwrap();
        let quizzes = find("quizzes").unwrap();
        let guests = find("guests").unwrap();

        assert!(BulkAction::Feature.check_applicable(articles).is_ok());
        assert!(BulkAction::Feature.check_applicable(quizzes).is_err());
        assert!(BulkAction::Publish.check_applicable(quizzes).is_ok());
        assert!(BulkAction::Publish.check_applicable(guests).is_err());
        assert!(BulkAction::Delete.check_applicable(guests).is_ok());
    }

    #[test]
    fn test_normalize_ids() {
        assert_eq!(normalize_ids(&[3, 1, 3, 2, 1]).unwrap(), vec![3, 1, 2]);
        assert!(normalize_ids(&[]).is_err());
        assert!(normalize_ids(&[1, 0]).is_err());
        let too_many: Vec<i32> = (1..=(MAX_BULK_IDS as i32 + 1)).collect();
        assert!(normalize_ids(&too_many).is_err());
    }

    #[test]
    fn test_outcome_reports_missing() {
        let outcome = BulkOutcome::new(BulkAction::Publish, &[1, 2, 3], vec![1, 3]);
        assert_eq!(outcome.requested, 3);
        assert_eq!(outcome.missing, vec![2]);
        assert!(outcome.partial);

        let full = BulkOutcome::new(BulkAction::Delete, &[4], vec![4]);
        assert!(!full.partial);
    }

    #[test]
    fn test_set_clauses() {
        assert!(BulkAction::Delete.set_clause().is_none());
        assert!(BulkAction::Publish.set_clause().unwrap().contains("published = TRUE"));
    }
}
