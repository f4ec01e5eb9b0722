//! Profils de protocole et sélection de l'URL selon le mode

use serde::Deserialize;

use crate::credentials::{Environment, ModeFlags};

/// Les trois URLs fixes d'un déploiement
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Endpoints {
    pub test: String,
    pub pre_live: String,
    pub live: String,
}

impl Endpoints {
    pub fn for_environment(&self, environment: Environment) -> &str {
        match environment {
            Environment::PreLive => &self.pre_live,
            Environment::Test => &self.test,
            Environment::Live => &self.live,
        }
    }
}

/// Choisit l'URL d'envoi : pre-live, sinon test, sinon live
pub fn select_endpoint<'a>(flags: &ModeFlags, endpoints: &'a Endpoints) -> &'a str {
    endpoints.for_environment(flags.environment())
}

/// Variante versionnée du protocole en ligne
///
/// Les deux déploiements connus ne diffèrent que par la version annoncée,
/// l'élément racine, l'espace de noms et le jeu d'URLs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GatewayProfile {
    #[serde(default)]
    pub name: String,
    pub version: String,
    pub root_element: String,
    pub namespace: String,
    pub endpoints: Endpoints,
}

impl GatewayProfile {
    /// Protocole cnpOnline 12.1
    pub fn cnp() -> Self {
        Self {
            name: "cnp".to_string(),
            version: "12.1".to_string(),
            root_element: "cnpOnlineRequest".to_string(),
            namespace: "http://www.vantivcnp.com/schema".to_string(),
            endpoints: Endpoints {
                test: "https://www.testvantivcnp.com/sandbox/communicator/online".to_string(),
                pre_live: "https://www.testvantivcnp.com/sandbox/communicator/online".to_string(),
                live: "https://transact.vantivcnp.com/vap/communicator/online".to_string(),
            },
        }
    }

    /// Ancien protocole litleOnline 9.4
    pub fn litle() -> Self {
        Self {
            name: "litle".to_string(),
            version: "9.4".to_string(),
            root_element: "litleOnlineRequest".to_string(),
            namespace: "http://www.litle.com/schema".to_string(),
            endpoints: Endpoints {
                test: "https://www.testlitle.com/sandbox/communicator/online".to_string(),
                pre_live: "https://transact-prelive.litle.com/vap/communicator/online".to_string(),
                live: "https://transact.litle.com/vap/communicator/online".to_string(),
            },
        }
    }

    /// Profil intégré par nom (`cnp` ou `litle`)
    pub fn builtin(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "cnp" => Some(Self::cnp()),
            "litle" => Some(Self::litle()),
            _ => None,
        }
    }

    pub fn endpoint_for(&self, flags: &ModeFlags) -> &str {
        select_endpoint(flags, &self.endpoints)
    }

    /// Remplace toutes les URLs, par exemple vers un simulateur local
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.endpoints = Endpoints {
            test: url.clone(),
            pre_live: url.clone(),
            live: url,
        };
        self
    }
}

impl Default for GatewayProfile {
    fn default() -> Self {
        Self::cnp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoints() -> Endpoints {
        Endpoints {
            test: "https://test.example".to_string(),
            pre_live: "https://prelive.example".to_string(),
            live: "https://live.example".to_string(),
        }
    }

    #[test]
    fn test_live_by_default() {
        assert_eq!(
            select_endpoint(&ModeFlags::default(), &endpoints()),
            "https://live.example"
        );
    }

    #[test]
    fn test_test_mode() {
        assert_eq!(
            select_endpoint(&ModeFlags::test(), &endpoints()),
            "https://test.example"
        );
    }

    #[test]
    fn test_pre_live_wins_over_test() {
        let flags = ModeFlags {
            test_mode: true,
            pre_live_mode: true,
        };
        assert_eq!(select_endpoint(&flags, &endpoints()), "https://prelive.example");

        let mut flags = ModeFlags::pre_live();
        flags.test_mode = true;
        assert_eq!(select_endpoint(&flags, &endpoints()), "https://prelive.example");
    }

    #[test]
    fn test_builtin_profiles() {
        let cnp = GatewayProfile::builtin("CNP").unwrap();
        assert_eq!(cnp.version, "12.1");
        assert_eq!(
            cnp.endpoint_for(&ModeFlags::live()),
            "https://transact.vantivcnp.com/vap/communicator/online"
        );

        let litle = GatewayProfile::builtin("litle").unwrap();
        assert_eq!(litle.version, "9.4");
        assert_eq!(litle.root_element, "litleOnlineRequest");
        assert!(GatewayProfile::builtin("unknown").is_none());
    }

    #[test]
    fn test_with_base_url() {
        let profile = GatewayProfile::cnp().with_base_url("http://127.0.0.1:1234/online");
        assert_eq!(profile.endpoint_for(&ModeFlags::test()), "http://127.0.0.1:1234/online");
        assert_eq!(profile.endpoint_for(&ModeFlags::live()), "http://127.0.0.1:1234/online");
    }
}
