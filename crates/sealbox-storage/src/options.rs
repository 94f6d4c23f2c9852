use serde::{Deserialize, Serialize};

/// Keychain addressing shared by the keyring backend and key provider.
/// Passed explicitly at construction instead of living in global state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyringOptions {
    /// Keychain service every credential is filed under.
    pub service: String,
    /// Account holding the JSON index of stored keys (the keychain cannot
    /// enumerate credentials on every platform).
    pub index_account: String,
    /// Account holding the data key of the encrypted file backend.
    pub data_key_account: String,
}

impl Default for KeyringOptions {
    fn default() -> Self {
        Self {
            service: "sealbox".to_string(),
            index_account: "__sealbox_index__".to_string(),
            data_key_account: "__sealbox_data_key__".to_string(),
        }
    }
}

impl KeyringOptions {
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            ..Self::default()
        }
    }

    /// Accounts the backends manage themselves and never hand to callers.
    pub fn is_reserved(&self, account: &str) -> bool {
        account == self.index_account || account == self.data_key_account
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let options: KeyringOptions =
            serde_json::from_str(r#"{"service":"acme"}"#).expect("parse");
        assert_eq!(options.service, "acme");
        assert_eq!(options.index_account, "__sealbox_index__");
        assert!(options.is_reserved("__sealbox_data_key__"));
        assert!(!options.is_reserved("profile:token"));
    }
}
