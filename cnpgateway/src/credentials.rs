//! Identifiants marchands et mode d'environnement

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifiants et références fournis par le marchand pour une requête
///
/// Les champs vides sont considérés comme absents lors de la validation.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GatewayCredentials {
    pub merchant_id: String,
    pub username: String,
    pub password: String,
    pub report_group: String,
    pub customer_id: String,
    pub order_id: String,
}

impl GatewayCredentials {
    pub fn new(
        merchant_id: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            merchant_id: merchant_id.into(),
            username: username.into(),
            password: password.into(),
            ..Default::default()
        }
    }

    pub fn with_report_group(mut self, report_group: impl Into<String>) -> Self {
        self.report_group = report_group.into();
        self
    }

    pub fn with_customer_id(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = customer_id.into();
        self
    }

    pub fn with_order_id(mut self, order_id: impl Into<String>) -> Self {
        self.order_id = order_id.into();
        self
    }

    /// Noms des paramètres obligatoires encore vides, dans l'ordre de validation
    pub(crate) fn missing_required(&self) -> Option<&'static str> {
        [
            ("merchantId", &self.merchant_id),
            ("username", &self.username),
            ("password", &self.password),
            ("orderId", &self.order_id),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
    }
}

// Le mot de passe ne doit jamais apparaître dans les logs
impl fmt::Debug for GatewayCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayCredentials")
            .field("merchant_id", &self.merchant_id)
            .field("username", &self.username)
            .field("password", &"***")
            .field("report_group", &self.report_group)
            .field("customer_id", &self.customer_id)
            .field("order_id", &self.order_id)
            .finish()
    }
}

/// Environnement ciblé par une requête
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Test,
    PreLive,
    Live,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Test => write!(f, "test"),
            Environment::PreLive => write!(f, "pre-live"),
            Environment::Live => write!(f, "live"),
        }
    }
}

/// Drapeaux de mode; live quand aucun n'est positionné
///
/// `pre_live_mode` l'emporte toujours sur `test_mode`, quel que soit l'ordre
/// dans lequel ils ont été positionnés.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ModeFlags {
    #[serde(alias = "test")]
    pub test_mode: bool,
    #[serde(alias = "pre_live")]
    pub pre_live_mode: bool,
}

impl ModeFlags {
    pub fn live() -> Self {
        Self::default()
    }

    pub fn test() -> Self {
        Self {
            test_mode: true,
            pre_live_mode: false,
        }
    }

    pub fn pre_live() -> Self {
        Self {
            test_mode: false,
            pre_live_mode: true,
        }
    }

    pub fn environment(&self) -> Environment {
        if self.pre_live_mode {
            Environment::PreLive
        } else if self.test_mode {
            Environment::Test
        } else {
            Environment::Live
        }
    }
}
