//! HuggingFace model import
//!
//! Fetches model metadata from the Hub API and maps it onto an `ai-models`
//! row body.

use crate::error::{validation_error, AppError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

pub const HUB_URL: &str = "https://huggingface.co";

/// `owner/name`, or a bare canonical name such as `gpt2`
static REPO_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[A-Za-z0-9][A-Za-z0-9_.-]{0,95}/)?[A-Za-z0-9][A-Za-z0-9_.-]{0,95}$")
        .expect("valid repo id regex")
});

/// Model info as returned by `GET /api/models/{repo_id}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HfModelInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default, rename = "modelId")]
    pub model_id: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub pipeline_tag: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub downloads: Option<i64>,
    #[serde(default)]
    pub likes: Option<i64>,
    #[serde(default)]
    pub library_name: Option<String>,
    #[serde(default, rename = "cardData")]
    pub card_data: Option<Value>,
    #[serde(default, rename = "lastModified")]
    pub last_modified: Option<String>,
    #[serde(default)]
    pub gated: Option<Value>,
}

impl HfModelInfo {
    /// Repository id; older payloads only carry `modelId`
    pub fn repo_id(&self) -> &str {
        if self.id.is_empty() {
            self.model_id.as_deref().unwrap_or_default()
        } else {
            &self.id
        }
    }
}

/// Trim and check a repo id, rejecting anything that could escape the path
pub fn validate_repo_id(repo_id: &str) -> Result<String, AppError> {
    let repo_id = repo_id.trim().trim_matches('/');
    if repo_id.contains("..") || !REPO_ID.is_match(repo_id) {
        return Err(validation_error(format!(
            "Invalid HuggingFace repository id '{}', expected owner/name",
            repo_id
        )));
    }
    Ok(repo_id.to_string())
}

/// Public URL of a model page
pub fn model_url(repo_id: &str) -> String {
    format!("{}/{}", HUB_URL, repo_id)
}

pub async fn fetch_model_info(
    client: &reqwest::Client,
    repo_id: &str,
    token: Option<&str>,
) -> Result<HfModelInfo, AppError> {
    let url = format!("{}/api/models/{}", HUB_URL, repo_id);
    debug!("Fetching HuggingFace model info: {}", url);

    let mut request = client.get(&url);
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }

    let response = request.send().await.map_err(|e| {
        let e = e.without_url();
        warn!("HuggingFace request for {} failed: {}", repo_id, e);
        AppError::Upstream(format!("HuggingFace request failed: {}", e))
    })?;

    let status = response.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(AppError::NotFound(format!(
            "Model '{}' not found on HuggingFace",
            repo_id
        )));
    }
    if !status.is_success() {
        warn!("HuggingFace responded with {} for {}", status, repo_id);
        return Err(AppError::Upstream(format!(
            "HuggingFace responded with {}",
            status
        )));
    }

    response
        .json::<HfModelInfo>()
        .await
        .map_err(|e| AppError::Upstream(format!("Unexpected HuggingFace response: {}", e.without_url())))
}

/// License from card data, falling back to a `license:` tag
fn license_of(info: &HfModelInfo) -> Option<String> {
    let from_card = info
        .card_data
        .as_ref()
        .and_then(|card| card.get("license"))
        .and_then(|license| match license {
            Value::String(s) => Some(s.clone()),
            Value::Array(items) => items.first().and_then(|v| v.as_str()).map(str::to_string),
            _ => None,
        });
    from_card.or_else(|| {
        info.tags
            .iter()
            .find_map(|tag| tag.strip_prefix("license:").map(str::to_string))
    })
}

/// Parameter count tag such as `7b` or `125m`, when the name carries one
fn parameters_of(info: &HfModelInfo) -> Option<String> {
    static PARAMS: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?i)(?:^|[-_.])(\d+(?:\.\d+)?[bm])(?:$|[-_.])").expect("valid params regex"));
    let repo_id = info.repo_id();
    let name = repo_id.rsplit('/').next().unwrap_or(repo_id);
    PARAMS
        .captures(name)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_uppercase())
}

/// Plain tags only; `key:value` tags go into metadata
fn plain_tags(info: &HfModelInfo) -> Vec<String> {
    info.tags
        .iter()
        .filter(|tag| !tag.contains(':'))
        .cloned()
        .collect()
}

/// Build an `ai-models` create body from hub metadata
pub fn map_model(info: &HfModelInfo, publish: bool) -> Value {
    let repo_id = info.repo_id();
    let (owner, name) = match repo_id.split_once('/') {
        Some((owner, name)) => (Some(owner.to_string()), name.to_string()),
        None => (None, repo_id.to_string()),
    };
    let provider = info.author.clone().or(owner);
    let description = info.pipeline_tag.as_ref().map(|task| {
        format!(
            "{} model{} imported from HuggingFace.",
            task.replace('-', " "),
            provider
                .as_ref()
                .map(|p| format!(" by {}", p))
                .unwrap_or_default()
        )
    });

    json!({
        "name": name,
        "provider": provider,
        "description": description,
        "model_type": info.pipeline_tag,
        "parameters": parameters_of(info),
        "license": license_of(info),
        "library": info.library_name,
        "source_url": model_url(repo_id),
        "tags": plain_tags(info),
        "downloads": info.downloads.unwrap_or(0),
        "likes": info.likes.unwrap_or(0),
        "metadata": {
            "source": "huggingface",
            "repo_id": repo_id,
            "hub_tags": info.tags,
            "last_modified": info.last_modified,
            "gated": info.gated,
            "card_data": info.card_data,
        },
        "status": if publish { "published" } else { "draft" },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> HfModelInfo {
        serde_json::from_value(json!({
            "id": "meta-llama/Llama-2-7b-hf",
            "author": "meta-llama",
            "pipeline_tag": "text-generation",
            "tags": ["transformers", "pytorch", "llama", "license:llama2", "en"],
            "downloads": 1200,
            "likes": 42,
            "library_name": "transformers",
            "cardData": {"license": "llama2", "language": ["en"]},
            "lastModified": "2024-04-17T08:40:48.000Z"
        }))
        .unwrap()
    }

    #[test]
    fn test_validate_repo_id() {
        assert_eq!(validate_repo_id(" openai/whisper-large-v3 ").unwrap(), "openai/whisper-large-v3");
        assert_eq!(validate_repo_id("gpt2").unwrap(), "gpt2");
        assert!(validate_repo_id("").is_err());
        assert!(validate_repo_id("a/b/c").is_err());
        assert!(validate_repo_id("../etc/passwd").is_err());
        assert!(validate_repo_id("owner/na me").is_err());
    }

    #[test]
    fn test_map_model() {
        let body = map_model(&sample(), false);
        assert_eq!(body["name"], "Llama-2-7b-hf");
        assert_eq!(body["provider"], "meta-llama");
        assert_eq!(body["model_type"], "text-generation");
        assert_eq!(body["parameters"], "7B");
        assert_eq!(body["license"], "llama2");
        assert_eq!(body["library"], "transformers");
        assert_eq!(body["source_url"], "https://huggingface.co/meta-llama/Llama-2-7b-hf");
        assert_eq!(body["downloads"], 1200);
        assert_eq!(body["status"], "draft");
        assert_eq!(body["tags"], json!(["transformers", "pytorch", "llama", "en"]));
        assert_eq!(body["metadata"]["repo_id"], "meta-llama/Llama-2-7b-hf");
    }

    #[test]
    fn test_map_model_minimal_payload() {
        let info: HfModelInfo = serde_json::from_value(json!({"modelId": "gpt2"})).unwrap();
        let body = map_model(&info, true);
        assert_eq!(body["name"], "gpt2");
        assert_eq!(body["provider"], Value::Null);
        assert_eq!(body["license"], Value::Null);
        assert_eq!(body["likes"], 0);
        assert_eq!(body["status"], "published");
    }

    #[test]
    fn test_license_falls_back_to_tag() {
        let mut info = sample();
        info.card_data = None;
        assert_eq!(license_of(&info).as_deref(), Some("llama2"));
    }
}
