//! Credential bookkeeping: stored secrets and outstanding key requests.

use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

use crate::collab::CredentialManager;

/// In-memory credential store.  Secrets are never logged.
#[derive(Debug, Default)]
pub struct CredentialStore {
    secrets: Mutex<HashMap<String, String>>,
    pending: Mutex<BTreeSet<String>>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a secret and clear any pending request for the service.
    /// Empty secrets are refused.
    pub fn store_credential(&self, service: &str, secret: &str) -> bool {
        if secret.is_empty() {
            return false;
        }
        if let Ok(mut secrets) = self.secrets.lock() {
            secrets.insert(service.to_string(), secret.to_string());
        } else {
            return false;
        }
        if let Ok(mut pending) = self.pending.lock() {
            pending.remove(service);
        }
        true
    }

    pub fn remove_credential(&self, service: &str) -> bool {
        self.secrets.lock().map(|mut s| s.remove(service).is_some()).unwrap_or(false)
    }

    pub fn is_pending(&self, service: &str) -> bool {
        self.pending.lock().map(|p| p.contains(service)).unwrap_or(false)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub fn credential_count(&self) -> usize {
        self.secrets.lock().map(|s| s.len()).unwrap_or(0)
    }
}

impl CredentialManager for CredentialStore {
    fn has_credential(&self, service: &str) -> bool {
        self.secrets.lock().map(|s| s.contains_key(service)).unwrap_or(false)
    }

    fn request_api_key(&self, service: &str) {
        if let Ok(mut pending) = self.pending.lock() {
            if pending.insert(service.to_string()) {
                tracing::info!(target: "hotforge::credentials", service = %service, "api key requested");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_then_store_clears_pending() {
        let cm = CredentialStore::new();
        cm.request_api_key("weather");
        assert_eq!(cm.pending_count(), 1);
        assert!(cm.store_credential("weather", "sk-123"));
        assert_eq!(cm.pending_count(), 0);
        assert!(cm.has_credential("weather"));
    }

    #[test]
    fn test_repeat_request_is_single_pending_entry() {
        let cm = CredentialStore::new();
        cm.request_api_key("svc");
        cm.request_api_key("svc");
        assert_eq!(cm.pending_count(), 1);
        assert!(cm.is_pending("svc"));
    }

    #[test]
    fn test_empty_secret_refused() {
        let cm = CredentialStore::new();
        assert!(!cm.store_credential("svc", ""));
        assert!(!cm.has_credential("svc"));
    }

    #[test]
    fn test_remove_credential() {
        let cm = CredentialStore::new();
        cm.store_credential("svc", "k");
        assert!(cm.remove_credential("svc"));
        assert!(!cm.remove_credential("svc"));
        assert_eq!(cm.credential_count(), 0);
    }
}
