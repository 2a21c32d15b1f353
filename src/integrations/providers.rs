//! Third-party providers
//!
//! Each provider declares the config keys it needs, which of them are
//! secrets, and how to probe its API to test a configuration.

use crate::error::{validation_error, AppError};
use crate::models::SECRET_MASK;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Matomo,
    Plausible,
    Fathom,
    AzureAd,
    Office365,
    Teams,
    Huggingface,
}

/// Config keys a provider understands
#[derive(Debug, Serialize)]
pub struct ProviderSpec {
    pub provider: Provider,
    pub label: &'static str,
    pub category: &'static str,
    pub required: &'static [&'static str],
    pub optional: &'static [&'static str],
    pub secrets: &'static [&'static str],
}

pub const ALL_PROVIDERS: &[Provider] = &[
    Provider::Matomo,
    Provider::Plausible,
    Provider::Fathom,
    Provider::AzureAd,
    Provider::Office365,
    Provider::Teams,
    Provider::Huggingface,
];

/// Keys whose values must be http(s) URLs
const URL_KEYS: &[&str] = &["url", "webhook_url"];

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Matomo => "matomo",
            Provider::Plausible => "plausible",
            Provider::Fathom => "fathom",
            Provider::AzureAd => "azure_ad",
            Provider::Office365 => "office365",
            Provider::Teams => "teams",
            Provider::Huggingface => "huggingface",
        }
    }

    pub fn spec(&self) -> ProviderSpec {
        let (label, category, required, optional, secrets): (
            &'static str,
            &'static str,
            &'static [&'static str],
            &'static [&'static str],
            &'static [&'static str],
        ) = match self {
            Provider::Matomo => (
                "Matomo",
                "analytics",
                &["url", "site_id", "token_auth"],
                &[],
                &["token_auth"],
            ),
            Provider::Plausible => (
                "Plausible",
                "analytics",
                &["domain", "api_key"],
                &["url"],
                &["api_key"],
            ),
            Provider::Fathom => ("Fathom", "analytics", &["site_id", "api_key"], &[], &["api_key"]),
            Provider::AzureAd => (
                "Microsoft Entra ID (Azure AD)",
                "microsoft",
                &["tenant_id", "client_id", "client_secret"],
                &[],
                &["client_secret"],
            ),
            Provider::Office365 => (
                "Office 365 mail",
                "microsoft",
                &["tenant_id", "client_id", "client_secret", "sender"],
                &[],
                &["client_secret"],
            ),
            Provider::Teams => (
                "Microsoft Teams webhook",
                "microsoft",
                &["webhook_url"],
                &["channel_name"],
                &["webhook_url"],
            ),
            Provider::Huggingface => (
                "Hugging Face",
                "ai",
                &["api_token"],
                &["organization"],
                &["api_token"],
            ),
        };
        ProviderSpec {
            provider: *self,
            label,
            category,
            required,
            optional,
            secrets,
        }
    }

    fn is_secret(&self, key: &str) -> bool {
        self.spec().secrets.contains(&key)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_PROVIDERS
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| AppError::Internal(format!("Unknown provider '{}' in database", s)))
    }
}

/// Config value as a non-empty string (numbers are accepted, e.g. site ids)
fn config_str<'a>(config: &'a Map<String, Value>, key: &str) -> Option<std::borrow::Cow<'a, str>> {
    match config.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(std::borrow::Cow::Borrowed(s.trim())),
        Some(Value::Number(n)) => Some(std::borrow::Cow::Owned(n.to_string())),
        _ => None,
    }
}

fn required_str(config: &Map<String, Value>, key: &str) -> Result<String, AppError> {
    config_str(config, key)
        .map(|s| s.into_owned())
        .ok_or_else(|| validation_error(format!("Config key `{}` is required", key)))
}

/// Check required keys, value types and URL formats
pub fn validate_config(provider: Provider, config: &Value) -> Result<(), AppError> {
    let map = config
        .as_object()
        .ok_or_else(|| validation_error("`config` must be a JSON object"))?;
    let spec = provider.spec();

    for key in spec.required {
        required_str(map, key)?;
    }
    for (key, value) in map {
        if !spec.required.contains(&key.as_str()) && !spec.optional.contains(&key.as_str()) {
            return Err(validation_error(format!(
                "Unknown config key `{}` for {}",
                key, spec.label
            )));
        }
        if value.is_object() || value.is_array() {
            return Err(validation_error(format!("Config key `{}` must be a scalar", key)));
        }
        if provider.is_secret(key) && value.as_str() == Some(SECRET_MASK) {
            return Err(validation_error(format!(
                "Config key `{}` holds the masked placeholder, send the real secret",
                key
            )));
        }
    }
    for key in URL_KEYS {
        if let Some(value) = config_str(map, key) {
            let parsed = url::Url::parse(&value)
                .map_err(|_| validation_error(format!("Config key `{}` must be a valid URL", key)))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(validation_error(format!("Config key `{}` must be an http(s) URL", key)));
            }
        }
    }
    Ok(())
}

/// Copy of the config with secret values replaced by the mask
pub fn mask_config(provider: Provider, config: &Value) -> Value {
    let Some(map) = config.as_object() else {
        return json!({});
    };
    let masked: Map<String, Value> = map
        .iter()
        .map(|(key, value)| {
            let is_set = !value.is_null() && value.as_str() != Some("");
            if provider.is_secret(key) && is_set {
                (key.clone(), Value::String(SECRET_MASK.to_string()))
            } else {
                (key.clone(), value.clone())
            }
        })
        .collect();
    Value::Object(masked)
}

/// First 8 hex chars of the SHA-256 of each stored secret
pub fn secret_fingerprints(provider: Provider, config: &Value) -> BTreeMap<String, String> {
    let mut fingerprints = BTreeMap::new();
    let Some(map) = config.as_object() else {
        return fingerprints;
    };
    for key in provider.spec().secrets {
        if let Some(value) = config_str(map, key) {
            let digest = Sha256::digest(value.as_bytes());
            let hex: String = digest.iter().take(4).map(|b| format!("{:02x}", b)).collect();
            fingerprints.insert(key.to_string(), hex);
        }
    }
    fingerprints
}

/// Merge an incoming config into the stored one.
///
/// Keys are replaced one by one, `null` removes a key and a masked secret
/// keeps the stored value.
pub fn merge_config(provider: Provider, existing: &Value, incoming: &Value) -> Result<Value, AppError> {
    let incoming = incoming
        .as_object()
        .ok_or_else(|| validation_error("`config` must be a JSON object"))?;
    let mut merged = existing.as_object().cloned().unwrap_or_default();

    for (key, value) in incoming {
        if value.is_null() {
            merged.remove(key);
        } else if provider.is_secret(key) && value.as_str() == Some(SECRET_MASK) {
            continue;
        } else {
            merged.insert(key.clone(), value.clone());
        }
    }
    Ok(Value::Object(merged))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeMethod {
    Get,
    Post,
}

/// HTTP request used to test a provider configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeRequest {
    pub method: ProbeMethod,
    pub url: String,
    pub bearer: Option<String>,
    pub query: Vec<(String, String)>,
    pub form: Option<Vec<(String, String)>>,
    pub json: Option<Value>,
}

impl ProbeRequest {
    fn get(url: String) -> Self {
        Self {
            method: ProbeMethod::Get,
            url,
            bearer: None,
            query: Vec::new(),
            form: None,
            json: None,
        }
    }

    fn post(url: String) -> Self {
        Self {
            method: ProbeMethod::Post,
            ..Self::get(url)
        }
    }
}

fn pair(key: &str, value: impl Into<String>) -> (String, String) {
    (key.to_string(), value.into())
}

/// Client-credentials token request against Microsoft identity platform
fn microsoft_token_probe(map: &Map<String, Value>) -> Result<ProbeRequest, AppError> {
    let tenant = required_str(map, "tenant_id")?;
    let mut probe = ProbeRequest::post(format!(
        "https://login.microsoftonline.com/{}/oauth2/v2.0/token",
        tenant
    ));
    probe.form = Some(vec![
        pair("client_id", required_str(map, "client_id")?),
        pair("client_secret", required_str(map, "client_secret")?),
        pair("scope", "https://graph.microsoft.com/.default"),
        pair("grant_type", "client_credentials"),
    ]);
    Ok(probe)
}

/// Build the probe request for a provider config
pub fn probe_request(provider: Provider, config: &Value, site_name: &str) -> Result<ProbeRequest, AppError> {
    let map = config
        .as_object()
        .ok_or_else(|| validation_error("`config` must be a JSON object"))?;

    let probe = match provider {
        Provider::Matomo => {
            let base = required_str(map, "url")?;
            let mut probe = ProbeRequest::post(format!("{}/index.php", base.trim_end_matches('/')));
            probe.query = vec![
                pair("module", "API"),
                pair("method", "SitesManager.getSiteFromId"),
                pair("idSite", required_str(map, "site_id")?),
                pair("format", "json"),
            ];
            probe.form = Some(vec![pair("token_auth", required_str(map, "token_auth")?)]);
            probe
        }
        Provider::Plausible => {
            let base = config_str(map, "url")
                .map(|s| s.into_owned())
                .unwrap_or_else(|| "https://plausible.io".to_string());
            let mut probe = ProbeRequest::get(format!(
                "{}/api/v1/stats/aggregate",
                base.trim_end_matches('/')
            ));
            probe.query = vec![
                pair("site_id", required_str(map, "domain")?),
                pair("period", "day"),
                pair("metrics", "visitors"),
            ];
            probe.bearer = Some(required_str(map, "api_key")?);
            probe
        }
        Provider::Fathom => {
            let mut probe = ProbeRequest::get(format!(
                "https://api.usefathom.com/v1/sites/{}",
                required_str(map, "site_id")?
            ));
            probe.bearer = Some(required_str(map, "api_key")?);
            probe
        }
        Provider::AzureAd | Provider::Office365 => microsoft_token_probe(map)?,
        Provider::Teams => {
            let mut probe = ProbeRequest::post(required_str(map, "webhook_url")?);
            probe.json = Some(json!({
                "@type": "MessageCard",
                "@context": "https://schema.org/extensions",
                "summary": format!("{} integration test", site_name),
                "text": format!("✅ Test message from the {} admin panel.", site_name),
            }));
            probe
        }
        Provider::Huggingface => {
            let mut probe = ProbeRequest::get("https://huggingface.co/api/whoami-v2".to_string());
            probe.bearer = Some(required_str(map, "api_token")?);
            probe
        }
    };
    Ok(probe)
}

/// Response of a probe
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    pub ok: bool,
    pub status: Option<u16>,
    pub message: String,
}

/// Send a probe. Transport failures are reported as a failed outcome.
pub async fn execute_probe(client: &reqwest::Client, probe: &ProbeRequest) -> ProbeOutcome {
    let mut request = match probe.method {
        ProbeMethod::Get => client.get(&probe.url),
        ProbeMethod::Post => client.post(&probe.url),
    };
    if !probe.query.is_empty() {
        request = request.query(&probe.query);
    }
    if let Some(token) = &probe.bearer {
        request = request.bearer_auth(token);
    }
    if let Some(form) = &probe.form {
        request = request.form(form);
    }
    if let Some(body) = &probe.json {
        request = request.json(body);
    }

    match request.send().await {
        Ok(response) => {
            let status = response.status();
            if status.is_success() {
                ProbeOutcome {
                    ok: true,
                    status: Some(status.as_u16()),
                    message: "Connection successful".to_string(),
                }
            } else {
                let body = response.text().await.unwrap_or_default();
                let snippet: String = body.chars().take(200).collect();
                ProbeOutcome {
                    ok: false,
                    status: Some(status.as_u16()),
                    message: format!("Provider responded with {}: {}", status, snippet.trim()),
                }
            }
        }
        // the URL may carry a secret (Teams webhooks)
        Err(e) => ProbeOutcome {
            ok: false,
            status: None,
            message: format!("Request failed: {}", e.without_url()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_validate_required_keys() {
        let ok = json!({"url": "https://stats.example.com", "site_id": 3, "token_auth": "abc"});
        assert!(validate_config(Provider::Matomo, &ok).is_ok());

        let missing = json!({"url": "https://stats.example.com", "site_id": 3});
        assert!(validate_config(Provider::Matomo, &missing).is_err());

        let blank = json!({"webhook_url": "  "});
        assert!(validate_config(Provider::Teams, &blank).is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_keys_and_bad_urls() {
        let unknown = json!({"api_token": "hf_x", "extra": true});
        assert!(validate_config(Provider::Huggingface, &unknown).is_err());

        let bad_url = json!({"webhook_url": "ftp://teams.example.com/hook"});
        assert!(validate_config(Provider::Teams, &bad_url).is_err());

        assert!(validate_config(Provider::Fathom, &json!([1, 2])).is_err());
    }

    #[test]
    fn test_validate_rejects_masked_secret() {
        let config = json!({"domain": "hackerthink.com", "api_key": SECRET_MASK});
        let err = validate_config(Provider::Plausible, &config).unwrap_err();
        assert!(err.to_string().contains("api_key"));

        // a masked value on update keeps the stored secret and validates
        let existing = json!({"domain": "hackerthink.com", "api_key": "real"});
        let merged = merge_config(Provider::Plausible, &existing, &config).unwrap();
        assert!(validate_config(Provider::Plausible, &merged).is_ok());

        // with nothing stored the secret is still missing
        let merged = merge_config(Provider::Plausible, &json!({}), &config).unwrap();
        assert!(validate_config(Provider::Plausible, &merged).is_err());
    }

    #[tokio::test]
    async fn test_failed_probe_does_not_echo_webhook_url() {
        let config = json!({"webhook_url": "http://127.0.0.1:1/webhookb2/SECRET-TOKEN-123"});
        let probe = probe_request(Provider::Teams, &config, "HackerThink").unwrap();
        let outcome = execute_probe(&reqwest::Client::new(), &probe).await;

        assert!(!outcome.ok);
        assert_eq!(outcome.status, None);
        assert!(outcome.message.starts_with("Request failed"));
        assert!(!outcome.message.contains("SECRET-TOKEN-123"), "{}", outcome.message);
        assert!(!outcome.message.contains("webhookb2"), "{}", outcome.message);
    }

    #[test]
    fn test_mask_config_hides_secrets_only() {
        let config = json!({"domain": "hackerthink.com", "api_key": "secret"});
        let masked = mask_config(Provider::Plausible, &config);
        assert_eq!(masked, json!({"domain": "hackerthink.com", "api_key": SECRET_MASK}));
    }

    #[test]
    fn test_merge_keeps_masked_secret() {
        let existing = json!({"domain": "old.com", "api_key": "secret", "url": "https://p.example.com"});
        let incoming = json!({"domain": "new.com", "api_key": SECRET_MASK, "url": null});
        let merged = merge_config(Provider::Plausible, &existing, &incoming).unwrap();
        assert_eq!(merged, json!({"domain": "new.com", "api_key": "secret"}));
    }

    #[test]
    fn test_fingerprints_are_stable() {
        let config = json!({"api_token": "hf_abc"});
        let a = secret_fingerprints(Provider::Huggingface, &config);
        let b = secret_fingerprints(Provider::Huggingface, &config);
        assert_eq!(a, b);
        assert_eq!(a["api_token"].len(), 8);
    }

    #[test]
    fn test_provider_round_trip_names() {
        for provider in ALL_PROVIDERS {
            assert_eq!(provider.as_str().parse::<Provider>().unwrap(), *provider);
        }
        assert!("segment".parse::<Provider>().is_err());
    }

    #[test]
    fn test_matomo_probe() {
        let config = json!({"url": "https://stats.example.com/", "site_id": 7, "token_auth": "tok"});
        let probe = probe_request(Provider::Matomo, &config, "HackerThink").unwrap();
        assert_eq!(probe.method, ProbeMethod::Post);
        assert_eq!(probe.url, "https://stats.example.com/index.php");
        assert!(probe.query.contains(&("idSite".to_string(), "7".to_string())));
        assert_eq!(probe.form, Some(vec![("token_auth".to_string(), "tok".to_string())]));
    }

    #[test]
    fn test_plausible_probe_defaults_to_cloud() {
        let config = json!({"domain": "hackerthink.com", "api_key": "key"});
        let probe = probe_request(Provider::Plausible, &config, "HackerThink").unwrap();
        assert_eq!(probe.url, "https://plausible.io/api/v1/stats/aggregate");
        assert_eq!(probe.bearer.as_deref(), Some("key"));
    }

    #[test]
    fn test_microsoft_probe_uses_client_credentials() {
        let config = json!({"tenant_id": "t1", "client_id": "c1", "client_secret": "s1"});
        let probe = probe_request(Provider::AzureAd, &config, "HackerThink").unwrap();
        assert_eq!(probe.url, "https://login.microsoftonline.com/t1/oauth2/v2.0/token");
        let form = probe.form.unwrap();
        assert!(form.contains(&("grant_type".to_string(), "client_credentials".to_string())));
    }

    #[test]
    fn test_teams_probe_posts_message_card() {
        let config = json!({"webhook_url": "https://example.webhook.office.com/abc"});
        let probe = probe_request(Provider::Teams, &config, "HackerThink").unwrap();
        assert_eq!(probe.method, ProbeMethod::Post);
        assert_eq!(probe.json.unwrap()["@type"], "MessageCard");
    }
}
