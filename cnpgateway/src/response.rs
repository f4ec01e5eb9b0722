//! Lecture des réponses cnpOnlineResponse / litleOnlineResponse
//!
//! Exemple de réponse approuvée :
//!
//! ```xml
//! <cnpOnlineResponse version="12.1" response="0" message="Valid Format"
//!                    xmlns="http://www.vantivcnp.com/schema">
//!   <authorizationResponse id="ididid" reportGroup="RG" customerId="C1">
//!     <cnpTxnId>84568456</cnpTxnId>
//!     <orderId>O1</orderId>
//!     <response>000</response>
//!     <responseTime>2018-01-01T12:00:00</responseTime>
//!     <message>Approved</message>
//!     <authCode>123457</authCode>
//!   </authorizationResponse>
//! </cnpOnlineResponse>
//! ```
//!
//! L'attribut `response` de la racine vaut `0` quand le XML reçu était
//! valide; le code `000` de la transaction signifie « approuvée ».

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::TransportError;
use crate::request::TransactionType;

/// Code racine : requête bien formée
pub const RESPONSE_VALID: &str = "0";
/// Code transaction : approuvée
pub const TRANSACTION_APPROVED: &str = "000";

// Structures brutes, au plus près du XML reçu

#[derive(Debug, Deserialize)]
struct OnlineResponseXml {
    #[serde(rename = "@version", default)]
    version: String,
    #[serde(rename = "@response")]
    response: Option<String>,
    #[serde(rename = "@message", default)]
    message: String,
    #[serde(rename = "authorizationResponse")]
    authorization_response: Option<TransactionResponseXml>,
    #[serde(rename = "saleResponse")]
    sale_response: Option<TransactionResponseXml>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionResponseXml {
    #[serde(rename = "@id", default)]
    id: String,
    #[serde(rename = "@reportGroup", default)]
    report_group: String,
    #[serde(rename = "@customerId")]
    customer_id: Option<String>,
    #[serde(alias = "litleTxnId")]
    cnp_txn_id: Option<String>,
    order_id: Option<String>,
    #[serde(default)]
    response: String,
    response_time: Option<String>,
    #[serde(default)]
    message: String,
    auth_code: Option<String>,
    token_response: Option<TokenResponseXml>,
    fraud_result: Option<FraudResultXml>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponseXml {
    #[serde(alias = "litleToken")]
    cnp_token: Option<String>,
    token_response_code: Option<String>,
    token_message: Option<String>,
    bin: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FraudResultXml {
    avs_result: Option<String>,
    card_validation_result: Option<String>,
}

/// Résultat d'une transaction d'autorisation ou de vente
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionResult {
    pub transaction_type: TransactionType,
    pub id: String,
    pub report_group: String,
    pub customer_id: Option<String>,
    /// Référence de la transaction chez Vantiv (`cnpTxnId` ou `litleTxnId`)
    pub txn_id: Option<String>,
    pub order_id: Option<String>,
    pub response: String,
    pub response_time: Option<String>,
    pub message: String,
    pub auth_code: Option<String>,
    pub token: Option<String>,
    pub token_response_code: Option<String>,
    pub token_message: Option<String>,
    pub bin: Option<String>,
    pub avs_result: Option<String>,
    pub card_validation_result: Option<String>,
}

impl TransactionResult {
    fn from_xml(transaction_type: TransactionType, raw: TransactionResponseXml) -> Self {
        let (token, token_response_code, token_message, bin) = match raw.token_response {
            Some(token) => (
                token.cnp_token,
                token.token_response_code,
                token.token_message,
                token.bin,
            ),
            None => (None, None, None, None),
        };
        let (avs_result, card_validation_result) = match raw.fraud_result {
            Some(fraud) => (fraud.avs_result, fraud.card_validation_result),
            None => (None, None),
        };

        Self {
            transaction_type,
            id: raw.id,
            report_group: raw.report_group,
            customer_id: raw.customer_id,
            txn_id: non_empty(raw.cnp_txn_id),
            order_id: raw.order_id,
            response: raw.response.trim().to_string(),
            response_time: raw.response_time,
            message: raw.message,
            auth_code: non_empty(raw.auth_code),
            token: non_empty(token),
            token_response_code,
            token_message,
            bin,
            avs_result,
            card_validation_result,
        }
    }
}

/// Réponse de la passerelle à une requête en ligne
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatewayResponse {
    pub version: String,
    /// Code racine (`0` : XML accepté)
    pub response: String,
    /// Message racine, utile quand la requête a été rejetée en bloc
    pub root_message: String,
    pub transaction: Option<TransactionResult>,
}

impl GatewayResponse {
    /// Lit le corps XML d'une réponse
    ///
    /// # Errors
    ///
    /// [`TransportError::InvalidResponse`] si le corps n'est pas du XML ou
    /// n'a pas d'attribut `response` à la racine.
    pub fn parse(body: &str) -> Result<Self, TransportError> {
        let raw: OnlineResponseXml = quick_xml::de::from_str(body)
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))?;

        let response = raw
            .response
            .map(|code| code.trim().to_string())
            .filter(|code| !code.is_empty())
            .ok_or_else(|| {
                TransportError::InvalidResponse(
                    "missing response attribute on the root element".to_string(),
                )
            })?;

        let transaction = match (raw.authorization_response, raw.sale_response) {
            (Some(auth), _) => Some(TransactionResult::from_xml(
                TransactionType::Authorization,
                auth,
            )),
            (None, Some(sale)) => Some(TransactionResult::from_xml(TransactionType::Sale, sale)),
            (None, None) => None,
        };

        let parsed = Self {
            version: raw.version,
            response,
            root_message: raw.message,
            transaction,
        };
        debug!(
            response = %parsed.response,
            code = parsed.response_code(),
            successful = parsed.is_successful(),
            "Gateway response parsed"
        );
        Ok(parsed)
    }

    /// Requête acceptée et transaction approuvée
    pub fn is_successful(&self) -> bool {
        self.response == RESPONSE_VALID
            && self
                .transaction
                .as_ref()
                .is_some_and(|transaction| transaction.response == TRANSACTION_APPROVED)
    }

    /// Code de la transaction, ou code racine en son absence
    pub fn response_code(&self) -> &str {
        self.transaction
            .as_ref()
            .map(|transaction| transaction.response.as_str())
            .unwrap_or(&self.response)
    }

    /// Message de la transaction, ou message racine en son absence
    pub fn message(&self) -> &str {
        self.transaction
            .as_ref()
            .map(|transaction| transaction.message.as_str())
            .filter(|message| !message.is_empty())
            .unwrap_or(&self.root_message)
    }

    pub fn transaction_reference(&self) -> Option<&str> {
        self.transaction.as_ref()?.txn_id.as_deref()
    }

    pub fn auth_code(&self) -> Option<&str> {
        self.transaction.as_ref()?.auth_code.as_deref()
    }

    /// Token de carte renvoyé par la passerelle, s'il y en a un
    pub fn token(&self) -> Option<&str> {
        self.transaction.as_ref()?.token.as_deref()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
