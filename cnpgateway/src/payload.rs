//! Construction du document cnpOnlineRequest
//!
//! Structure produite (les éléments vides sont retirés par
//! [`crate::xml::cleanup`]) :
//!
//! ```text
//! <cnpOnlineRequest xmlns=".." version=".." merchantId="..">
//!   <authentication><user/><password/></authentication>
//!   <authorization id=".." customerId=".." reportGroup="..">
//!     <orderId/><amount/><orderSource>ecommerce</orderSource>
//!     <billToAddress>..</billToAddress><card>..</card>   (carte)
//!     <token><litleToken/></token>                        (token)
//!   </authorization>
//! </cnpOnlineRequest>
//! ```

use tracing::debug;
use xmltree::Element;

use crate::endpoint::GatewayProfile;
use crate::error::Result;
use crate::payment::{Card, PaymentMethod};
use crate::request::AuthorizationRequest;
use crate::xml::{XmlDocument, add_child, add_text_child, cleanup, set_attribute};

/// Origine déclarée de toutes les transactions
pub const ORDER_SOURCE: &str = "ecommerce";

/// Construit le document brut, éléments vides compris
///
/// La requête est validée d'abord; aucune construction partielle n'a lieu
/// en cas d'erreur.
pub fn build(request: &AuthorizationRequest, profile: &GatewayProfile) -> Result<XmlDocument> {
    let (amount, payment) = request.checked()?;
    let credentials = &request.credentials;

    let mut document = XmlDocument::new(
        &profile.root_element,
        &[
            ("xmlns", profile.namespace.as_str()),
            ("version", profile.version.as_str()),
            ("merchantId", credentials.merchant_id.as_str()),
        ],
    );

    let mut authentication = Element::new("authentication");
    add_text_child(&mut authentication, "user", &credentials.username);
    add_text_child(&mut authentication, "password", &credentials.password);
    add_child(document.root_mut(), authentication);

    let mut transaction = Element::new(request.transaction_type.element_name());
    set_attribute(&mut transaction, "id", &request.transaction_id);
    set_attribute(&mut transaction, "customerId", &credentials.customer_id);
    set_attribute(&mut transaction, "reportGroup", &credentials.report_group);
    add_text_child(&mut transaction, "orderId", &credentials.order_id);
    add_text_child(&mut transaction, "amount", &amount.to_string());
    add_text_child(&mut transaction, "orderSource", ORDER_SOURCE);

    match payment {
        PaymentMethod::Card(card) => {
            add_child(&mut transaction, bill_to_address(card));
            add_child(&mut transaction, card_element(card));
        }
        PaymentMethod::Token(token) => {
            let mut element = Element::new("token");
            add_text_child(&mut element, "litleToken", token);
            add_child(&mut transaction, element);
        }
    }
    add_child(document.root_mut(), transaction);

    debug!(
        transaction_id = %request.transaction_id,
        transaction_type = %request.transaction_type,
        payment = payment.kind(),
        amount,
        "Payload built"
    );
    Ok(document)
}

/// Construit puis nettoie le document prêt à l'envoi
pub fn build_payload(
    request: &AuthorizationRequest,
    profile: &GatewayProfile,
) -> Result<XmlDocument> {
    build(request, profile).map(cleanup::clean)
}

fn bill_to_address(card: &Card) -> Element {
    let mut address = Element::new("billToAddress");
    for (name, value) in [
        ("name", &card.billing_name),
        ("addressLine1", &card.billing_address1),
        ("city", &card.billing_city),
        ("state", &card.billing_state),
        ("zip", &card.billing_postcode),
        ("country", &card.billing_country),
        ("email", &card.email),
        ("phone", &card.billing_phone),
    ] {
        add_text_child(&mut address, name, value);
    }
    address
}

fn card_element(card: &Card) -> Element {
    let brand = card.brand();
    let code = brand.and_then(|brand| brand.vantiv_code());
    if code.is_none() {
        debug!(brand = ?brand, last_four = %card.last_four(), "No card type code, type omitted");
    }

    let mut element = Element::new("card");
    add_text_child(&mut element, "type", code.unwrap_or_default());
    add_text_child(&mut element, "number", &card.digits());
    add_text_child(&mut element, "expDate", &card.expiry_date());
    add_text_child(&mut element, "cardValidationNum", &card.cvv);
    element
}

impl AuthorizationRequest {
    /// Document nettoyé pour ce profil de protocole
    pub fn build_payload(&self, profile: &GatewayProfile) -> Result<XmlDocument> {
        build_payload(self, profile)
    }
}
