//! Static third-party API catalog.

use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::collab::Discoverer;
use crate::model::{AuthMethod, Endpoint};

/// Everything the catalog knows about one API.
#[derive(Debug, Clone)]
pub struct ApiEntry {
    pub base_url: String,
    pub auth_method: AuthMethod,
    /// Requests per minute; 0 means unknown.
    pub rate_limit: u32,
    /// `(operation, method, path)`.
    pub operations: Vec<(String, String, String)>,
    pub documentation_url: String,
}

impl ApiEntry {
    fn endpoints(&self, api_name: &str) -> Vec<Endpoint> {
        self.operations
            .iter()
            .map(|(op, method, path)| Endpoint {
                name: format!("{}.{}", api_name, op),
                base_url: self.base_url.clone(),
                path: path.clone(),
                method: method.clone(),
                auth_method: self.auth_method,
            })
            .collect()
    }
}

fn entry(
    base_url: &str,
    auth_method: AuthMethod,
    rate_limit: u32,
    ops: &[(&str, &str, &str)],
    docs: &str,
) -> ApiEntry {
    ApiEntry {
        base_url: base_url.to_string(),
        auth_method,
        rate_limit,
        operations: ops
            .iter()
            .map(|(o, m, p)| (o.to_string(), m.to_string(), p.to_string()))
            .collect(),
        documentation_url: docs.to_string(),
    }
}

/// In-memory API catalog seeded with a handful of well-known services.
#[derive(Debug)]
pub struct StaticCatalog {
    apis: RwLock<BTreeMap<String, ApiEntry>>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        let mut apis = BTreeMap::new();
        apis.insert(
            "telegram".to_string(),
            entry(
                "https://api.telegram.org",
                AuthMethod::BearerToken,
                30,
                &[("sendMessage", "POST", "/sendMessage"), ("getUpdates", "GET", "/getUpdates")],
                "https://core.telegram.org/bots/api",
            ),
        );
        apis.insert(
            "gmail".to_string(),
            entry(
                "https://gmail.googleapis.com",
                AuthMethod::OAuth2,
                250,
                &[("send", "POST", "/gmail/v1/users/me/messages/send"), ("list", "GET", "/gmail/v1/users/me/messages")],
                "https://developers.google.com/gmail/api",
            ),
        );
        apis.insert(
            "slack".to_string(),
            entry(
                "https://slack.com/api",
                AuthMethod::BearerToken,
                50,
                &[("postMessage", "POST", "/chat.postMessage")],
                "https://api.slack.com/methods",
            ),
        );
        apis.insert(
            "weather".to_string(),
            entry(
                "https://api.openweathermap.org",
                AuthMethod::ApiKey,
                60,
                &[("current", "GET", "/data/2.5/weather"), ("forecast", "GET", "/data/2.5/forecast")],
                "https://openweathermap.org/api",
            ),
        );
        apis.insert(
            "github".to_string(),
            entry(
                "https://api.github.com",
                AuthMethod::BearerToken,
                5000,
                &[("repos", "GET", "/user/repos"), ("issues", "GET", "/issues")],
                "https://docs.github.com/rest",
            ),
        );
        apis.insert(
            "google_ads".to_string(),
            entry(
                "https://googleads.googleapis.com",
                AuthMethod::OAuth2,
                15,
                &[("campaigns", "POST", "/v16/customers/campaigns:search")],
                "https://developers.google.com/google-ads/api",
            ),
        );
        Self { apis: RwLock::new(apis) }
    }

    pub fn register_api(&self, name: &str, api: ApiEntry) {
        if let Ok(mut apis) = self.apis.write() {
            apis.insert(name.to_string(), api);
        }
    }

    pub fn known_apis(&self) -> Vec<String> {
        self.apis.read().map(|a| a.keys().cloned().collect()).unwrap_or_default()
    }

    pub fn rate_limit(&self, api_name: &str) -> u32 {
        self.apis
            .read()
            .ok()
            .and_then(|a| a.get(api_name).map(|e| e.rate_limit))
            .unwrap_or(0)
    }

    pub fn documentation(&self, api_name: &str) -> Option<String> {
        self.apis.read().ok()?.get(api_name).map(|e| e.documentation_url.clone())
    }
}

impl Default for StaticCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Discoverer for StaticCatalog {
    /// Exact name first; otherwise every API whose name contains the query
    /// or is contained in it.
    fn search(&self, api_name: &str) -> Vec<Endpoint> {
        let Ok(apis) = self.apis.read() else {
            return Vec::new();
        };
        if let Some(api) = apis.get(api_name) {
            return api.endpoints(api_name);
        }
        let query = api_name.to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }
        apis.iter()
            .filter(|(name, _)| name.contains(&query) || query.contains(name.as_str()))
            .flat_map(|(name, api)| api.endpoints(name))
            .collect()
    }

    fn get_auth_method(&self, api_name: &str) -> AuthMethod {
        self.apis
            .read()
            .ok()
            .and_then(|a| a.get(api_name).map(|e| e.auth_method))
            .unwrap_or(AuthMethod::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_known_api() {
        let c = StaticCatalog::new();
        let eps = c.search("telegram");
        assert!(eps.iter().any(|e| e.name == "telegram.sendMessage"));
    }

    #[test]
    fn test_search_unknown_api_is_empty() {
        assert!(StaticCatalog::new().search("quantum").is_empty());
        assert!(StaticCatalog::new().search("").is_empty());
    }

    #[test]
    fn test_search_fuzzy_containment() {
        let eps = StaticCatalog::new().search("telegram_bot");
        assert!(!eps.is_empty());
    }

    #[test]
    fn test_auth_methods() {
        let c = StaticCatalog::new();
        assert_eq!(c.get_auth_method("github"), AuthMethod::BearerToken);
        assert_eq!(c.get_auth_method("gmail"), AuthMethod::OAuth2);
        assert_eq!(c.get_auth_method("unknown"), AuthMethod::None);
    }

    #[test]
    fn test_rate_limits_and_docs() {
        let c = StaticCatalog::new();
        assert_eq!(c.rate_limit("telegram"), 30);
        assert_eq!(c.rate_limit("unknown"), 0);
        assert!(c.documentation("github").unwrap().contains("github"));
        assert!(c.documentation("unknown").is_none());
    }

    #[test]
    fn test_register_custom_api() {
        let c = StaticCatalog::new();
        c.register_api(
            "billing",
            entry("https://billing.local", AuthMethod::None, 0, &[("invoices", "GET", "/invoices")], ""),
        );
        assert_eq!(c.search("billing").len(), 1);
        assert!(c.known_apis().contains(&"billing".to_string()));
    }
}
