//! # cnpgateway - Client d'autorisation Vantiv/Worldpay cnpOnline
//!
//! Cette crate construit les requêtes XML d'autorisation du protocole
//! cnpOnline (et de son ancêtre litleOnline), choisit l'URL selon le mode
//! test / pre-live / live, envoie la requête en HTTP et lit la réponse.
//!
//! ## Vue d'ensemble
//!
//! Le chemin d'une autorisation :
//!
//! ```text
//! AuthorizationRequest ──validate──▶ payload::build ──▶ xml::cleanup::clean
//!        │                                                    │
//!        └──── ModeFlags ──▶ endpoint::select_endpoint ───────┤
//!                                                             ▼
//!                         CnpClient::send ──▶ Transport::post ──▶ GatewayResponse::parse
//! ```
//!
//! - Les requêtes invalides (montant, moyen de paiement ou identifiants
//!   manquants) sont rejetées avant toute construction XML.
//! - Les champs optionnels vides sont d'abord émis, puis retirés par un
//!   nettoyage itéré jusqu'au point fixe : la passerelle refuse les éléments
//!   présents mais vides.
//! - Le transport HTTP est injecté via le trait [`Transport`].
//!
//! ## Structure des modules
//!
//! ```text
//! cnpgateway/
//! ├── src/
//! │   ├── lib.rs          # Module principal (ce fichier)
//! │   ├── client.rs       # CnpClient, PreparedRequest
//! │   ├── config_ext.rs   # Lecture de la section `gateway` de cnpconfig
//! │   ├── credentials.rs  # Identifiants marchands, drapeaux de mode
//! │   ├── endpoint.rs     # Profils de protocole, sélection d'URL
//! │   ├── error.rs        # Gestion des erreurs
//! │   ├── payload.rs      # Construction du document de requête
//! │   ├── payment.rs      # Carte, token, détection de marque
//! │   ├── request.rs      # AuthorizationRequest et validation
//! │   ├── response.rs     # Lecture des réponses
//! │   ├── transport.rs    # Trait Transport, implémentation ureq
//! │   └── xml/
//! │       ├── mod.rs      # XmlDocument
//! │       └── cleanup.rs  # Suppression des éléments vides
//! ```
//!
//! ## Utilisation
//!
//! ```rust,no_run
//! use cnpconfig::Config;
//! use cnpgateway::{AuthorizationRequest, Card, CnpClient, GatewayConfigExt};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::load_config("")?;
//!     let client = CnpClient::from_config(&config)?;
//!
//!     let request = AuthorizationRequest::new(
//!         config.get_gateway_credentials()?.with_order_id("order-42"),
//!     )
//!     .with_mode(config.get_gateway_mode())
//!     .with_amount(1999)
//!     .with_card(Card::new("4111111111111111", 12, 2030).with_cvv("123"));
//!
//!     let response = client.authorize(&request)?;
//!     if response.is_successful() {
//!         println!("Approved: {:?}", response.transaction_reference());
//!     } else {
//!         println!("Declined: {}", response.message());
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config_ext;
pub mod credentials;
pub mod endpoint;
pub mod error;
pub mod payload;
pub mod payment;
pub mod request;
pub mod response;
pub mod transport;
pub mod xml;

pub use client::{CONTENT_TYPE, CnpClient, PreparedRequest};
pub use config_ext::GatewayConfigExt;
pub use credentials::{Environment, GatewayCredentials, ModeFlags};
pub use endpoint::{Endpoints, GatewayProfile, select_endpoint};
pub use error::{GatewayError, Result, TransportError};
pub use payment::{Card, CardBrand, PaymentMethod};
pub use request::{AuthorizationRequest, TransactionType, generate_transaction_id};
pub use response::{GatewayResponse, TransactionResult};
pub use transport::{HttpRequest, HttpResponse, HttpSettings, Transport, UreqTransport};
pub use xml::XmlDocument;
