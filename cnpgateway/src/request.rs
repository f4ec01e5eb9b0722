//! Requête d'autorisation et sa validation
//!
//! Une [`AuthorizationRequest`] réunit les identifiants marchands, le mode,
//! le montant et le moyen de paiement. La validation est faite avant toute
//! construction de document : une requête invalide ne produit jamais de XML
//! ni d'accès réseau.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::credentials::{GatewayCredentials, ModeFlags};
use crate::error::{GatewayError, Result};
use crate::payment::{Card, PaymentMethod};

/// Longueur maximale de l'attribut `id` d'une transaction
pub const TRANSACTION_ID_MAX_LEN: usize = 25;

/// Type de transaction en ligne
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Réserve le montant sans le capturer
    #[default]
    Authorization,
    /// Autorisation et capture en une seule requête
    Sale,
}

impl TransactionType {
    /// Nom de l'élément de transaction dans la requête
    pub fn element_name(&self) -> &'static str {
        match self {
            TransactionType::Authorization => "authorization",
            TransactionType::Sale => "sale",
        }
    }

    /// Nom de l'élément de réponse correspondant
    pub fn response_element(&self) -> &'static str {
        match self {
            TransactionType::Authorization => "authorizationResponse",
            TransactionType::Sale => "saleResponse",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.element_name())
    }
}

/// Identifiant de transaction aléatoire, tronqué à 25 caractères
pub fn generate_transaction_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(TRANSACTION_ID_MAX_LEN);
    id
}

/// Requête d'autorisation (ou de vente) par carte ou par token
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorizationRequest {
    pub credentials: GatewayCredentials,
    pub mode: ModeFlags,
    /// Montant en unités mineures (centimes)
    pub amount: Option<u64>,
    pub payment: Option<PaymentMethod>,
    pub transaction_type: TransactionType,
    pub transaction_id: String,
}

impl AuthorizationRequest {
    /// Nouvelle requête, en mode live, avec un identifiant de transaction frais
    pub fn new(credentials: GatewayCredentials) -> Self {
        Self {
            credentials,
            mode: ModeFlags::default(),
            amount: None,
            payment: None,
            transaction_type: TransactionType::default(),
            transaction_id: generate_transaction_id(),
        }
    }

    pub fn with_amount(mut self, amount: u64) -> Self {
        self.amount = Some(amount);
        self
    }

    /// Paie par carte; remplace un éventuel token
    pub fn with_card(mut self, card: Card) -> Self {
        self.payment = Some(PaymentMethod::Card(card));
        self
    }

    /// Paie par token; remplace une éventuelle carte
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.payment = Some(PaymentMethod::Token(token.into()));
        self
    }

    pub fn with_mode(mut self, mode: ModeFlags) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_test_mode(mut self, enabled: bool) -> Self {
        self.mode.test_mode = enabled;
        self
    }

    pub fn with_pre_live_mode(mut self, enabled: bool) -> Self {
        self.mode.pre_live_mode = enabled;
        self
    }

    pub fn with_transaction_type(mut self, transaction_type: TransactionType) -> Self {
        self.transaction_type = transaction_type;
        self
    }

    pub fn with_transaction_id(mut self, id: impl Into<String>) -> Self {
        self.transaction_id = id.into();
        self
    }

    pub fn with_order_id(mut self, order_id: impl Into<String>) -> Self {
        self.credentials.order_id = order_id.into();
        self
    }

    /// Vérifie que la requête est complète
    ///
    /// Ordre des contrôles : montant, moyen de paiement, puis merchantId,
    /// username, password et orderId. Seule la première erreur est rapportée.
    pub fn validate(&self) -> Result<()> {
        self.checked().map(|_| ())
    }

    /// Montant et moyen de paiement d'une requête validée
    pub(crate) fn checked(&self) -> Result<(u64, &PaymentMethod)> {
        let amount = self
            .amount
            .ok_or_else(|| GatewayError::missing_parameter("amount"))?;

        let payment = self
            .payment
            .as_ref()
            .filter(|payment| payment.is_present())
            .ok_or_else(|| {
                GatewayError::Validation(
                    "Please specify a payment method as either card or token.".to_string(),
                )
            })?;

        if let Some(name) = self.credentials.missing_required() {
            return Err(GatewayError::missing_parameter(name));
        }

        if self.transaction_id.trim().is_empty() {
            return Err(GatewayError::missing_parameter("transactionId"));
        }
        if self.transaction_id.chars().count() > TRANSACTION_ID_MAX_LEN {
            return Err(GatewayError::Validation(format!(
                "The transactionId parameter must be at most {} characters",
                TRANSACTION_ID_MAX_LEN
            )));
        }

        Ok((amount, payment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> GatewayCredentials {
        GatewayCredentials::new("M1", "user", "pass").with_order_id("O1")
    }

    fn message(err: GatewayError) -> String {
        match err {
            GatewayError::Validation(message) => message,
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_generated_transaction_id() {
        let id = generate_transaction_id();
        assert_eq!(id.len(), TRANSACTION_ID_MAX_LEN);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, generate_transaction_id());
    }

    #[test]
    fn test_amount_checked_first() {
        let request = AuthorizationRequest::new(GatewayCredentials::default());
        assert_eq!(
            message(request.validate().unwrap_err()),
            "The amount parameter is required"
        );
    }

    #[test]
    fn test_payment_checked_before_credentials() {
        let request = AuthorizationRequest::new(GatewayCredentials::default()).with_amount(1000);
        assert_eq!(
            message(request.validate().unwrap_err()),
            "Please specify a payment method as either card or token."
        );

        let request = request.with_token("   ");
        assert_eq!(
            message(request.validate().unwrap_err()),
            "Please specify a payment method as either card or token."
        );
    }

    #[test]
    fn test_card_without_number_is_no_payment() {
        let request = AuthorizationRequest::new(credentials())
            .with_amount(1000)
            .with_card(Card::default());
        assert_eq!(
            message(request.validate().unwrap_err()),
            "Please specify a payment method as either card or token."
        );

        let request = request.with_card(Card::new("", 9, 25).with_cvv("123"));
        assert_eq!(
            message(request.validate().unwrap_err()),
            "Please specify a payment method as either card or token."
        );
    }

    #[test]
    fn test_credentials_checked_last() {
        let request = AuthorizationRequest::new(GatewayCredentials::new("M1", "", "pass"))
            .with_amount(1000)
            .with_token("1111000100360004");
        assert_eq!(
            message(request.validate().unwrap_err()),
            "The username parameter is required"
        );

        let request = request.with_order_id("");
        assert_eq!(
            message(request.validate().unwrap_err()),
            "The username parameter is required"
        );
    }

    #[test]
    fn test_zero_amount_is_accepted() {
        let request = AuthorizationRequest::new(credentials())
            .with_amount(0)
            .with_token("1111000100360004");
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_transaction_id_length() {
        let request = AuthorizationRequest::new(credentials())
            .with_amount(100)
            .with_token("1111000100360004")
            .with_transaction_id("x".repeat(26));
        assert!(request.validate().unwrap_err().is_validation());

        let request = request.with_transaction_id("ididid");
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_last_payment_method_wins() {
        let request = AuthorizationRequest::new(credentials())
            .with_card(Card::new("4111111111111111", 9, 25))
            .with_token("1111000100360004");
        assert_eq!(request.payment.as_ref().map(|p| p.kind()), Some("token"));
    }

    #[test]
    fn test_mode_setters() {
        let request = AuthorizationRequest::new(credentials())
            .with_pre_live_mode(true)
            .with_test_mode(true);
        assert!(request.mode.test_mode);
        assert!(request.mode.pre_live_mode);
        assert_eq!(TransactionType::Sale.response_element(), "saleResponse");
    }
}
