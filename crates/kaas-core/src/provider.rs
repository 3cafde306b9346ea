use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::PROVIDER_OLLAMA;
use crate::error::KaasError;

/// Providers a model configuration can be created for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Provider {
    #[default]
    #[serde(rename = "Ollama")]
    Ollama,
}

impl Provider {
    pub const ALL: &'static [Provider] = &[Provider::Ollama];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Ollama => PROVIDER_OLLAMA,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = KaasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Provider::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| KaasError::UnsupportedProvider(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_supported() {
        assert_eq!("Ollama".parse::<Provider>().unwrap(), Provider::Ollama);
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!(matches!(
            "CUSTOM".parse::<Provider>(),
            Err(KaasError::UnsupportedProvider(p)) if p == "CUSTOM"
        ));
        assert!("ollama".parse::<Provider>().is_err());
    }

    #[test]
    fn test_serde_name() {
        assert_eq!(serde_json::to_string(&Provider::Ollama).unwrap(), "\"Ollama\"");
    }
}
