//! Client cnpOnline : préparation, envoi et lecture d'une autorisation
//!
//! ```no_run
//! use cnpgateway::{AuthorizationRequest, Card, CnpClient, GatewayCredentials, GatewayProfile};
//!
//! let client = CnpClient::new(GatewayProfile::cnp(), Default::default());
//! let request = AuthorizationRequest::new(
//!     GatewayCredentials::new("M1", "user", "pass").with_order_id("O1"),
//! )
//! .with_test_mode(true)
//! .with_amount(1000)
//! .with_card(Card::new("4111111111111111", 9, 25).with_cvv("123"));
//!
//! let response = client.authorize(&request)?;
//! println!("{} {}", response.response_code(), response.message());
//! # Ok::<(), cnpgateway::GatewayError>(())
//! ```

use std::fmt;

use cnpconfig::Config;
use tracing::{debug, info, warn};

use crate::config_ext::GatewayConfigExt;
use crate::endpoint::GatewayProfile;
use crate::error::{Result, TransportError};
use crate::payload::build_payload;
use crate::request::AuthorizationRequest;
use crate::response::GatewayResponse;
use crate::transport::{HttpRequest, HttpResponse, HttpSettings, Transport, UreqTransport};
use crate::xml::XmlDocument;

/// Content-Type de toutes les requêtes
pub const CONTENT_TYPE: &str = "text/xml; charset=utf-8";

/// Requête validée et nettoyée, avec son URL de destination
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    document: XmlDocument,
    endpoint: String,
    user_agent: Option<String>,
}

impl PreparedRequest {
    pub fn document(&self) -> &XmlDocument {
        &self.document
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Corps XML tel qu'il sera envoyé
    pub fn to_xml_string(&self) -> Result<String> {
        Ok(self.document.to_xml_string()?)
    }

    /// Ligne de commande curl équivalente à l'envoi
    ///
    /// Contient le mot de passe et le numéro de carte en clair : à réserver
    /// au débogage en sandbox.
    pub fn to_curl(&self) -> Result<String> {
        let mut command = format!("curl {}", shell_quote(&self.endpoint));
        if let Some(user_agent) = &self.user_agent {
            command.push_str(&format!(" -A {}", shell_quote(user_agent)));
        }
        command.push_str(&format!(
            " -H {} -X POST -d {}",
            shell_quote(&format!("Content-Type: {}", CONTENT_TYPE)),
            shell_quote(&self.to_xml_string()?)
        ));
        Ok(command)
    }
}

impl fmt::Display for PreparedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let xml = self.document.to_xml_string().map_err(|_| fmt::Error)?;
        f.write_str(&xml)
    }
}

// 'a'b' -> 'a'\''b'
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Client synchrone pour un profil de protocole donné
///
/// Le transport est injecté : [`UreqTransport`] en production, n'importe
/// quelle implémentation de [`Transport`] dans les tests.
pub struct CnpClient<T: Transport = UreqTransport> {
    profile: GatewayProfile,
    transport: T,
    user_agent: Option<String>,
}

impl CnpClient<UreqTransport> {
    pub fn new(profile: GatewayProfile, settings: HttpSettings) -> Self {
        let transport = UreqTransport::new(&settings);
        Self::with_transport(profile, transport, settings.user_agent)
    }

    /// Client configuré par la section `gateway` de la configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let profile = config.get_gateway_profile()?;
        Ok(Self::new(profile, config.get_gateway_http()))
    }
}

impl<T: Transport> CnpClient<T> {
    pub fn with_transport(profile: GatewayProfile, transport: T, user_agent: Option<String>) -> Self {
        Self {
            profile,
            transport,
            user_agent,
        }
    }

    pub fn profile(&self) -> &GatewayProfile {
        &self.profile
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Valide, construit et nettoie le document, puis choisit l'URL
    pub fn prepare(&self, request: &AuthorizationRequest) -> Result<PreparedRequest> {
        let document = build_payload(request, &self.profile)?;
        let endpoint = self.profile.endpoint_for(&request.mode).to_string();

        debug!(
            profile = %self.profile.name,
            environment = %request.mode.environment(),
            endpoint = %endpoint,
            "Endpoint selected"
        );

        Ok(PreparedRequest {
            document,
            endpoint,
            user_agent: self.user_agent.clone(),
        })
    }

    /// Envoie le document et retourne la réponse HTTP brute
    ///
    /// Un statut hors 2xx devient [`TransportError::Status`]; aucune
    /// nouvelle tentative n'est faite.
    pub fn send_raw(&self, document: &XmlDocument, endpoint: &str) -> Result<HttpResponse> {
        let mut headers = vec![("Content-Type".to_string(), CONTENT_TYPE.to_string())];
        if let Some(user_agent) = &self.user_agent {
            headers.push(("User-Agent".to_string(), user_agent.clone()));
        }

        let request = HttpRequest {
            url: endpoint.to_string(),
            headers,
            body: document.to_xml_string()?,
        };

        info!(endpoint = %endpoint, "Sending request to gateway");
        let response = self.transport.post(&request)?;

        if !response.is_success() {
            warn!(endpoint = %endpoint, status = response.status, "Gateway answered with an error status");
            return Err(TransportError::Status {
                url: endpoint.to_string(),
                status: response.status,
                body: response.body,
            }
            .into());
        }
        Ok(response)
    }

    /// Envoie le document et lit la réponse de la passerelle
    pub fn send(&self, document: &XmlDocument, endpoint: &str) -> Result<GatewayResponse> {
        let response = self.send_raw(document, endpoint)?;
        let parsed = GatewayResponse::parse(&response.body)?;

        if !parsed.is_successful() {
            warn!(
                code = parsed.response_code(),
                message = parsed.message(),
                "Transaction not approved"
            );
        }
        Ok(parsed)
    }

    /// Envoie une requête déjà préparée
    pub fn submit(&self, prepared: &PreparedRequest) -> Result<GatewayResponse> {
        self.send(&prepared.document, &prepared.endpoint)
    }

    /// Autorisation complète : préparation puis envoi
    pub fn authorize(&self, request: &AuthorizationRequest) -> Result<GatewayResponse> {
        let prepared = self.prepare(request)?;
        let response = self.submit(&prepared)?;
        info!(
            transaction_id = %request.transaction_id,
            code = response.response_code(),
            reference = response.transaction_reference().unwrap_or_default(),
            "Gateway response received"
        );
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{GatewayCredentials, ModeFlags};
    use crate::payment::Card;
    use std::cell::RefCell;

    const APPROVED: &str = r#"<cnpOnlineResponse version="12.1" response="0" message="Valid Format" xmlns="http://www.vantivcnp.com/schema"><authorizationResponse id="ididid" reportGroup="RG"><cnpTxnId>1</cnpTxnId><orderId>O1</orderId><response>000</response><responseTime>2018-01-01T12:00:00</responseTime><message>Approved</message><authCode>11111</authCode></authorizationResponse></cnpOnlineResponse>"#;

    /// Transport qui enregistre les requêtes et rejoue une réponse fixe
    struct RecordingTransport {
        status: u16,
        body: String,
        requests: RefCell<Vec<HttpRequest>>,
    }

    impl RecordingTransport {
        fn new(status: u16, body: &str) -> Self {
            Self {
                status,
                body: body.to_string(),
                requests: RefCell::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.requests.borrow().len()
        }
    }

    impl Transport for RecordingTransport {
        fn post(&self, request: &HttpRequest) -> std::result::Result<HttpResponse, TransportError> {
            self.requests.borrow_mut().push(request.clone());
            Ok(HttpResponse {
                status: self.status,
                body: self.body.clone(),
            })
        }
    }

    fn client(transport: RecordingTransport) -> CnpClient<RecordingTransport> {
        CnpClient::with_transport(GatewayProfile::cnp(), transport, Some("Moliza/5.0".to_string()))
    }

    fn request() -> AuthorizationRequest {
        AuthorizationRequest::new(
            GatewayCredentials::new("M1", "u", "p").with_order_id("O1"),
        )
        .with_amount(1000)
        .with_card(Card::new("4111111111111111", 9, 25).with_cvv("123"))
        .with_transaction_id("ididid")
    }

    #[test]
    fn test_authorize_posts_payload() {
        let client = client(RecordingTransport::new(200, APPROVED));
        let response = client.authorize(&request().with_test_mode(true)).unwrap();

        assert!(response.is_successful());
        assert_eq!(response.auth_code(), Some("11111"));

        let requests = client.transport().requests.borrow();
        assert_eq!(requests.len(), 1);
        let sent = &requests[0];
        assert_eq!(
            sent.url,
            "https://www.testvantivcnp.com/sandbox/communicator/online"
        );
        assert_eq!(sent.header("Content-Type"), Some("text/xml; charset=utf-8"));
        assert_eq!(sent.header("User-Agent"), Some("Moliza/5.0"));
        assert!(sent.body.contains("<amount>1000</amount>"));
        assert!(sent.body.contains(
            "<card><type>VI</type><number>4111111111111111</number><expDate>0925</expDate><cardValidationNum>123</cardValidationNum></card>"
        ));
        assert!(!sent.body.contains("billToAddress"));
    }

    #[test]
    fn test_validation_failure_makes_no_call() {
        let client = client(RecordingTransport::new(200, APPROVED));

        let mut incomplete = request();
        incomplete.amount = None;
        let err = client.authorize(&incomplete).unwrap_err();
        assert!(err.is_validation());

        let mut no_payment = request();
        no_payment.payment = None;
        assert!(client.authorize(&no_payment).unwrap_err().is_validation());

        assert_eq!(client.transport().calls(), 0);
    }

    #[test]
    fn test_error_status_is_transport_error() {
        let client = client(RecordingTransport::new(503, "Service Unavailable"));
        let err = client.authorize(&request()).unwrap_err();

        assert!(err.is_transport());
        match err {
            crate::GatewayError::Transport(TransportError::Status { status, body, .. }) => {
                assert_eq!(status, 503);
                assert_eq!(body, "Service Unavailable");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(client.transport().calls(), 1);
    }

    #[test]
    fn test_unparseable_body_is_transport_error() {
        let client = client(RecordingTransport::new(200, "not xml at all"));
        let err = client.authorize(&request()).unwrap_err();
        assert!(err.is_transport());
    }

    #[test]
    fn test_prepare_selects_endpoint() {
        let client = client(RecordingTransport::new(200, APPROVED));

        let live = client.prepare(&request()).unwrap();
        assert_eq!(
            live.endpoint(),
            "https://transact.vantivcnp.com/vap/communicator/online"
        );

        let both = request().with_mode(ModeFlags {
            test_mode: true,
            pre_live_mode: true,
        });
        let prepared = client.prepare(&both).unwrap();
        assert_eq!(prepared.endpoint(), GatewayProfile::cnp().endpoints.pre_live);
        assert_eq!(client.transport().calls(), 0);
    }

    #[test]
    fn test_curl_command() {
        let client = client(RecordingTransport::new(200, APPROVED));
        let prepared = client.prepare(&request().with_test_mode(true)).unwrap();
        let curl = prepared.to_curl().unwrap();

        assert!(curl.starts_with(
            "curl 'https://www.testvantivcnp.com/sandbox/communicator/online' -A 'Moliza/5.0' -H 'Content-Type: text/xml; charset=utf-8' -X POST -d '<?xml"
        ));
        assert!(curl.ends_with("</cnpOnlineRequest>'"));
        assert_eq!(prepared.to_string(), prepared.to_xml_string().unwrap());
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("plain"), "'plain'");
        assert_eq!(shell_quote("O'Brien"), r"'O'\''Brien'");
    }
}
