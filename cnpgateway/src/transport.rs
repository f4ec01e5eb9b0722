//! Couche HTTP : un POST synchrone, corps texte en entrée et en sortie
//!
//! Le trait [`Transport`] isole le client de la bibliothèque HTTP; les tests
//! y branchent un transport enregistreur, la production utilise
//! [`UreqTransport`].

use std::time::Duration;

use tracing::{debug, warn};
use ureq::Agent;

use crate::error::TransportError;

/// User-Agent historique attendu par certains pare-feux marchands
pub const DEFAULT_USER_AGENT: &str = "Moliza/5.0";

/// Délai global par défaut d'un appel
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Requête POST prête à partir
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Réponse brute, quel que soit son statut
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub trait Transport {
    /// Envoie la requête et retourne la réponse complète
    ///
    /// Les statuts hors 2xx ne sont pas des erreurs à ce niveau.
    fn post(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn post(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).post(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn post(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).post(request)
    }
}

/// Réglages HTTP du client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    pub timeout: Duration,
    /// `None` laisse ureq envoyer son propre User-Agent
    pub user_agent: Option<String>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: Some(DEFAULT_USER_AGENT.to_string()),
        }
    }
}

/// Transport ureq bloquant
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: Agent,
}

impl UreqTransport {
    pub fn new(settings: &HttpSettings) -> Self {
        // Les 4xx/5xx doivent rester lisibles : pas d'Error::StatusCode
        let config = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(settings.timeout))
            .build();

        Self {
            agent: config.into(),
        }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(&HttpSettings::default())
    }
}

impl Transport for UreqTransport {
    fn post(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let http_error = |source: ureq::Error| TransportError::Http {
            url: request.url.clone(),
            source,
        };

        let mut builder = self.agent.post(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        debug!(url = %request.url, bytes = request.body.len(), "POST");
        let mut response = builder.send(request.body.as_str()).map_err(|e| {
            warn!(url = %request.url, error = %e, "HTTP request failed");
            http_error(e)
        })?;

        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(http_error)?;

        debug!(url = %request.url, status, bytes = body.len(), "Response received");
        Ok(HttpResponse { status, body })
    }
}
