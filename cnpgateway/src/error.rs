//! Gestion des erreurs pour le client CNP

use thiserror::Error;

/// Type Result personnalisé pour cnpgateway
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Erreurs possibles lors d'une autorisation
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Requête incomplète, détectée avant tout accès réseau
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Échec de transport ou réponse inexploitable
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Le document XML n'a pas pu être sérialisé
    #[error("XML serialization error: {0}")]
    Serialization(#[from] xmltree::Error),

    /// Configuration incomplète ou invalide
    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),
}

impl GatewayError {
    /// Erreur de validation pour un paramètre obligatoire absent
    pub fn missing_parameter(name: &str) -> Self {
        GatewayError::Validation(format!("The {} parameter is required", name))
    }

    /// Vérifie si l'erreur a été levée avant l'envoi de la requête
    pub fn is_validation(&self) -> bool {
        matches!(self, GatewayError::Validation(_))
    }

    /// Vérifie si l'erreur provient du transport HTTP
    pub fn is_transport(&self) -> bool {
        matches!(self, GatewayError::Transport(_))
    }
}

/// Erreurs de la couche HTTP
#[derive(Error, Debug)]
pub enum TransportError {
    /// Connexion, timeout, DNS, TLS...
    #[error("HTTP request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: ureq::Error,
    },

    /// Statut HTTP hors 2xx, transmis tel quel
    #[error("{url} answered with HTTP status {status}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    /// Corps de réponse illisible ou hors schéma
    #[error("Invalid gateway response: {0}")]
    InvalidResponse(String),
}
