//! Slug generation and uniqueness resolution

use crate::error::AppError;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use std::future::Future;

/// Longest slug we store
pub const MAX_SLUG_LEN: usize = 200;

/// Room left for a `-<suffix>` when a collision forces one
const MAX_BASE_LEN: usize = MAX_SLUG_LEN - 20;

static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"));

/// Lowercase ASCII slug with runs of other characters collapsed to `-`
pub fn slugify(input: &str) -> String {
    let lower = input.to_lowercase().replace('&', " and ").replace('+', " plus ");
    let collapsed = NON_ALNUM.replace_all(&lower, "-");
    let trimmed = collapsed.trim_matches('-');
    truncate(trimmed, MAX_SLUG_LEN)
}

fn truncate(slug: &str, max: usize) -> String {
    if slug.len() <= max {
        return slug.to_string();
    }
    // slugs are ASCII so byte slicing is safe
    slug[..max].trim_end_matches('-').to_string()
}

/// Find a free slug starting from `base`.
///
/// Tries `base`, `base-1`, `base-2`, ... for `max_attempts` candidates and
/// falls back to `base-<unix millis>` once the cap is hit. `exists` reports
/// whether a candidate is already taken.
pub async fn ensure_unique_slug<F, Fut>(
    base: &str,
    max_attempts: u32,
    mut exists: F,
) -> Result<String, AppError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<bool, AppError>>,
{
    let base = truncate(base, MAX_SLUG_LEN);
    if max_attempts > 0 && !exists(base.clone()).await? {
        return Ok(base);
    }

    // only suffixed candidates need the shorter stem
    let stem = truncate(&base, MAX_BASE_LEN);
    for attempt in 1..max_attempts {
        let candidate = format!("{}-{}", stem, attempt);
        if !exists(candidate.clone()).await? {
            return Ok(candidate);
        }
    }

    Ok(format!("{}-{}", stem, Utc::now().timestamp_millis()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("  Rust & Tokio: Async 101  "), "rust-and-tokio-async-101");
        assert_eq!(slugify("C++ Basics"), "c-plus-plus-basics");
        assert_eq!(slugify("---"), "");
        assert_eq!(slugify("nmap -sV"), "nmap-sv");
    }

    #[test]
    fn test_slugify_truncates() {
        let long = "a".repeat(500);
        assert_eq!(slugify(&long).len(), MAX_SLUG_LEN);
    }

    #[test]
    fn test_unique_slug_free_base() {
        let taken: HashSet<String> = HashSet::new();
        let slug = tokio_test::block_on(ensure_unique_slug("intro", 10, |c| {
            let hit = taken.contains(&c);
            async move { Ok(hit) }
        }))
        .unwrap();
        assert_eq!(slug, "intro");
    }

    #[tokio::test]
    async fn test_unique_slug_appends_counter() {
        let taken: HashSet<String> = ["intro", "intro-1", "intro-2"].iter().map(|s| s.to_string()).collect();
        let slug = ensure_unique_slug("intro", 10, |c| {
            let hit = taken.contains(&c);
            async move { Ok(hit) }
        })
        .await
        .unwrap();
        assert_eq!(slug, "intro-3");
    }

    #[tokio::test]
    async fn test_unique_slug_falls_back_to_timestamp() {
        let mut calls = 0;
        let slug = ensure_unique_slug("busy", 3, |_| {
            calls += 1;
            async { Ok(true) }
        })
        .await
        .unwrap();
        assert_eq!(calls, 3);
        let suffix = slug.strip_prefix("busy-").expect("prefix");
        assert!(suffix.parse::<i64>().unwrap() > 1_600_000_000_000);
    }

    #[tokio::test]
    async fn test_long_free_slug_is_kept_whole() {
        let base = "b".repeat(195);
        let slug = ensure_unique_slug(&base, 5, |_| async { Ok(false) }).await.unwrap();
        assert_eq!(slug, base);
    }

    #[tokio::test]
    async fn test_long_taken_slug_is_shortened_for_suffix() {
        let base = "b".repeat(MAX_SLUG_LEN);
        let slug = ensure_unique_slug(&base, 5, |c| {
            let hit = c == base;
            async move { Ok(hit) }
        })
        .await
        .unwrap();
        assert_eq!(slug, format!("{}-1", "b".repeat(MAX_BASE_LEN)));
        assert!(slug.len() <= MAX_SLUG_LEN);
    }

    #[tokio::test]
    async fn test_unique_slug_propagates_lookup_errors() {
        let result = ensure_unique_slug("x", 3, |_| async {
            Err(AppError::Internal("lookup failed".into()))
        })
        .await;
        assert!(result.is_err());
    }
}
