//! Fichier YAML décrivant une requête d'autorisation
//!
//! ```yaml
//! order_id: "O1"
//! amount: 1000            # centimes
//! transaction_type: sale  # authorization par défaut
//! card:
//!   number: "4111111111111111"
//!   expiry_month: 9
//!   expiry_year: 2025
//!   cvv: "123"
//!   billing_name: "John Doe"
//! # ou bien
//! # token: "1111000100360004"
//! ```
//!
//! Les identifiants marchands et le mode viennent de la configuration;
//! `customer_id`, `report_group` et `mode` peuvent être surchargés ici.

use std::{fs, path::Path};

use anyhow::{Context, Result, bail};
use cnpconfig::Config;
use cnpgateway::{AuthorizationRequest, Card, GatewayConfigExt, ModeFlags, TransactionType};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RequestFile {
    pub order_id: String,
    pub amount: Option<u64>,
    pub transaction_id: Option<String>,
    pub transaction_type: TransactionType,
    pub customer_id: Option<String>,
    pub report_group: Option<String>,
    pub mode: Option<ModeFlags>,
    pub card: Option<Card>,
    pub token: Option<String>,
}

impl RequestFile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read request file {}", path.display()))?;
        Self::from_yaml_str(&text)
            .with_context(|| format!("Invalid request file {}", path.display()))
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Combine le fichier avec les identifiants et le mode configurés
    pub fn into_request(self, config: &Config) -> Result<AuthorizationRequest> {
        let mut credentials = config.get_gateway_credentials()?.with_order_id(self.order_id);
        if let Some(customer_id) = self.customer_id {
            credentials.customer_id = customer_id;
        }
        if let Some(report_group) = self.report_group {
            credentials.report_group = report_group;
        }

        let mut request = AuthorizationRequest::new(credentials)
            .with_mode(self.mode.unwrap_or_else(|| config.get_gateway_mode()))
            .with_transaction_type(self.transaction_type);

        if let Some(amount) = self.amount {
            request = request.with_amount(amount);
        }
        if let Some(id) = self.transaction_id {
            request = request.with_transaction_id(id);
        }

        request = match (self.card, self.token) {
            (Some(_), Some(_)) => bail!("A request file gives either a card or a token, not both"),
            (Some(card), None) => request.with_card(card),
            (None, Some(token)) => request.with_token(token),
            (None, None) => request,
        };
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cnpgateway::{CardBrand, PaymentMethod};

    fn config() -> Config {
        Config::from_yaml_str(
            r#"
gateway:
  mode:
    test: true
  merchant:
    merchant_id: M1
    username: u
    password: p
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_card_request() {
        let file = RequestFile::from_yaml_str(
            r#"
order_id: O1
amount: 1000
transaction_id: ididid
card:
  number: "4111111111111111"
  expiry_month: 9
  expiry_year: 2025
  cvv: "123"
  brand: visa
"#,
        )
        .unwrap();

        let request = file.into_request(&config()).unwrap();
        assert_eq!(request.amount, Some(1000));
        assert_eq!(request.transaction_id, "ididid");
        assert_eq!(request.credentials.merchant_id, "M1");
        assert_eq!(request.credentials.order_id, "O1");
        assert_eq!(request.credentials.report_group, "Default Report Group");
        assert_eq!(request.mode, ModeFlags::test());
        assert!(request.validate().is_ok());
        match &request.payment {
            Some(PaymentMethod::Card(card)) => {
                assert_eq!(card.brand(), Some(CardBrand::Visa));
                assert_eq!(card.expiry_date(), "0925");
            }
            other => panic!("unexpected payment: {:?}", other),
        }
    }

    #[test]
    fn test_token_sale_with_overrides() {
        let file = RequestFile::from_yaml_str(
            r#"
order_id: O2
amount: 250
transaction_type: sale
report_group: Web
mode:
  pre_live: true
token: "1111000100360004"
"#,
        )
        .unwrap();

        let request = file.into_request(&config()).unwrap();
        assert_eq!(request.transaction_type, TransactionType::Sale);
        assert_eq!(request.credentials.report_group, "Web");
        assert_eq!(request.mode, ModeFlags::pre_live());
        assert_eq!(
            request.payment,
            Some(PaymentMethod::Token("1111000100360004".to_string()))
        );
    }

    #[test]
    fn test_card_and_token_rejected() {
        let file = RequestFile::from_yaml_str(
            "order_id: O1\namount: 1\ntoken: abc\ncard:\n  number: \"4111111111111111\"\n",
        )
        .unwrap();
        assert!(file.into_request(&config()).is_err());
    }

    #[test]
    fn test_missing_amount_left_to_validation() {
        let file = RequestFile::from_yaml_str("order_id: O1\ntoken: abc\n").unwrap();
        let request = file.into_request(&config()).unwrap();
        let err = request.validate().unwrap_err();
        assert_eq!(err.to_string(), "Invalid request: The amount parameter is required");
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(RequestFile::from_yaml_str("amount: 1\ncurrency: EUR\n").is_err());
    }
}
