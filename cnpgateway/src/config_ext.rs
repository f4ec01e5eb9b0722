//! Extension pour lire la configuration de la passerelle depuis cnpconfig
//!
//! Ce module fournit le trait `GatewayConfigExt`, qui ajoute à
//! `cnpconfig::Config` la lecture de la section `gateway` :
//!
//! ```yaml
//! gateway:
//!   profile: cnp
//!   base_url: ""
//!   mode: { test: true, pre_live: false }
//!   merchant: { merchant_id: "M1", username: "u", password: "encrypted:..." }
//!   http: { timeout_secs: 10, user_agent: "Moliza/5.0" }
//!   profiles:
//!     cnp: { version: "12.1", endpoints: { test: "https://..." } }
//! ```

use std::time::Duration;

use anyhow::{Result, anyhow};
use cnpconfig::Config;
use serde_yaml::Value;

use crate::credentials::{GatewayCredentials, ModeFlags};
use crate::endpoint::{Endpoints, GatewayProfile};
use crate::transport::{DEFAULT_TIMEOUT, HttpSettings};

/// Profil utilisé quand `gateway.profile` est absent
pub const DEFAULT_PROFILE: &str = "cnp";

/// Trait d'extension pour la configuration de la passerelle CNP
///
/// # Exemple
///
/// ```rust,ignore
/// use cnpconfig::Config;
/// use cnpgateway::GatewayConfigExt;
///
/// let config = Config::load_config("")?;
/// let credentials = config.get_gateway_credentials()?;
/// let profile = config.get_gateway_profile()?;
/// ```
pub trait GatewayConfigExt {
    /// Identifiants marchands (sans orderId, propre à chaque requête)
    ///
    /// Les champs absents restent vides; la validation de la requête les
    /// signalera. Un mot de passe `encrypted:...` est déchiffré.
    fn get_gateway_credentials(&self) -> Result<GatewayCredentials>;

    /// Définit les identifiants marchands principaux
    fn set_gateway_credentials(&self, merchant_id: &str, username: &str, password: &str)
    -> Result<()>;

    /// Drapeaux test / pre-live
    fn get_gateway_mode(&self) -> ModeFlags;

    fn set_gateway_mode(&self, mode: ModeFlags) -> Result<()>;

    /// Profil de protocole, profil intégré surchargé par la configuration
    ///
    /// # Errors
    ///
    /// Retourne une erreur si le profil n'est pas intégré et que la
    /// configuration ne le décrit pas entièrement.
    fn get_gateway_profile(&self) -> Result<GatewayProfile>;

    /// Délai et User-Agent des appels HTTP
    fn get_gateway_http(&self) -> HttpSettings;
}

impl GatewayConfigExt for Config {
    fn get_gateway_credentials(&self) -> Result<GatewayCredentials> {
        let merchant = |key: &str| -> Result<String> {
            Ok(self
                .get_string(&["gateway", "merchant", key])?
                .unwrap_or_default())
        };

        Ok(GatewayCredentials {
            merchant_id: merchant("merchant_id")?,
            username: merchant("username")?,
            password: self
                .get_password(&["gateway", "merchant", "password"])?
                .unwrap_or_default(),
            report_group: merchant("report_group")?,
            customer_id: merchant("customer_id")?,
            order_id: String::new(),
        })
    }

    fn set_gateway_credentials(
        &self,
        merchant_id: &str,
        username: &str,
        password: &str,
    ) -> Result<()> {
        for (key, value) in [
            ("merchant_id", merchant_id),
            ("username", username),
            ("password", password),
        ] {
            self.set_value(
                &["gateway", "merchant", key],
                Value::String(value.to_string()),
            )?;
        }
        Ok(())
    }

    fn get_gateway_mode(&self) -> ModeFlags {
        ModeFlags {
            test_mode: self.get_bool(&["gateway", "mode", "test"], false),
            pre_live_mode: self.get_bool(&["gateway", "mode", "pre_live"], false),
        }
    }

    fn set_gateway_mode(&self, mode: ModeFlags) -> Result<()> {
        self.set_value(&["gateway", "mode", "test"], Value::Bool(mode.test_mode))?;
        self.set_value(
            &["gateway", "mode", "pre_live"],
            Value::Bool(mode.pre_live_mode),
        )
    }

    fn get_gateway_profile(&self) -> Result<GatewayProfile> {
        let name = self
            .get_string(&["gateway", "profile"])?
            .unwrap_or_else(|| DEFAULT_PROFILE.to_string())
            .to_lowercase();

        let mut profile = GatewayProfile::builtin(&name).unwrap_or_else(|| GatewayProfile {
            name: name.clone(),
            version: String::new(),
            root_element: String::new(),
            namespace: String::new(),
            endpoints: Endpoints {
                test: String::new(),
                pre_live: String::new(),
                live: String::new(),
            },
        });

        let overrides: [(&[&str], &mut String); 6] = [
            (&["version"], &mut profile.version),
            (&["root_element"], &mut profile.root_element),
            (&["namespace"], &mut profile.namespace),
            (&["endpoints", "test"], &mut profile.endpoints.test),
            (&["endpoints", "pre_live"], &mut profile.endpoints.pre_live),
            (&["endpoints", "live"], &mut profile.endpoints.live),
        ];
        for (leaf, target) in overrides {
            let mut path = vec!["gateway", "profiles", name.as_str()];
            path.extend_from_slice(leaf);
            if let Some(value) = self.get_string(&path)? {
                *target = value;
            }
        }

        if let Some(base_url) = self.get_string(&["gateway", "base_url"])? {
            profile = profile.with_base_url(base_url);
        }

        let missing = [
            ("version", &profile.version),
            ("root_element", &profile.root_element),
            ("namespace", &profile.namespace),
            ("endpoints.test", &profile.endpoints.test),
            ("endpoints.pre_live", &profile.endpoints.pre_live),
            ("endpoints.live", &profile.endpoints.live),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field);

        if let Some(field) = missing {
            return Err(anyhow!(
                "Gateway profile '{}' is incomplete: gateway.profiles.{}.{} is not set",
                name,
                name,
                field
            ));
        }

        tracing::debug!(profile = %profile.name, version = %profile.version, "Gateway profile loaded");
        Ok(profile)
    }

    fn get_gateway_http(&self) -> HttpSettings {
        let timeout = self.get_u64(&["gateway", "http", "timeout_secs"], DEFAULT_TIMEOUT.as_secs());
        let user_agent = match self.get_string(&["gateway", "http", "user_agent"]) {
            Ok(user_agent) => user_agent,
            Err(e) => {
                tracing::warn!("{}, using the HTTP client's default User-Agent", e);
                None
            }
        };

        HttpSettings {
            timeout: Duration::from_secs(timeout),
            user_agent,
        }
    }
}
