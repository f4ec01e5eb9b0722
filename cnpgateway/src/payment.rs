//! Moyens de paiement : carte bancaire ou token Vantiv

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::fmt;

/// Marques de carte reconnues
///
/// Seules six marques ont un code `type` côté Vantiv; les autres sont
/// acceptées mais envoyées sans type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardBrand {
    Visa,
    Mastercard,
    Discover,
    Amex,
    DinersClub,
    Jcb,
    Switch,
    Solo,
    Dankort,
    Maestro,
    Forbrugsforeningen,
    Laser,
}

// Ordre de test identique à celui de la détection : visa avant maestro, etc.
static BRAND_PATTERNS: Lazy<Vec<(CardBrand, Regex)>> = Lazy::new(|| {
    [
        (CardBrand::Visa, r"^4\d{12}(\d{3})?$"),
        (
            CardBrand::Mastercard,
            r"^(5[1-5]\d{4}|677189)\d{10}$|^2(?:2(?:2[1-9]|[3-9]\d)|[3-6]\d\d|7(?:[01]\d|20))\d{12}$",
        ),
        (CardBrand::Discover, r"^(6011|65\d{2}|64[4-9]\d)\d{12}|(62\d{14})$"),
        (CardBrand::Amex, r"^3[47]\d{13}$"),
        (CardBrand::DinersClub, r"^3(0[0-5]|[68]\d)\d{11}$"),
        (CardBrand::Jcb, r"^35(28|29|[3-8]\d)\d{12}$"),
        (CardBrand::Switch, r"^6759\d{12}(\d{2,3})?$"),
        (CardBrand::Solo, r"^6767\d{12}(\d{2,3})?$"),
        (CardBrand::Dankort, r"^5019\d{12}$"),
        (CardBrand::Maestro, r"^(5[06-8]|6\d)\d{10,17}$"),
        (CardBrand::Forbrugsforeningen, r"^600722\d{10}$"),
        (CardBrand::Laser, r"^(6304|6706|6709|6771)\d{8}(\d{4}|\d{6,7})?$"),
    ]
    .into_iter()
    .filter_map(|(brand, pattern)| Regex::new(pattern).ok().map(|re| (brand, re)))
    .collect()
});

impl CardBrand {
    /// Détecte la marque à partir du numéro de carte
    ///
    /// Les espaces et tirets sont ignorés.
    pub fn detect(number: &str) -> Option<CardBrand> {
        let digits: String = number.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            return None;
        }

        BRAND_PATTERNS
            .iter()
            .filter(|(brand, _)| {
                // 677189 est une Mastercard, pas une Laser
                *brand != CardBrand::Laser || !digits.starts_with("677189")
            })
            .find(|(_, re)| re.is_match(&digits))
            .map(|(brand, _)| *brand)
    }

    /// Code `type` à deux lettres attendu par Vantiv
    pub fn vantiv_code(&self) -> Option<&'static str> {
        match self {
            CardBrand::Amex => Some("AX"),
            CardBrand::DinersClub => Some("DC"),
            CardBrand::Discover => Some("DI"),
            CardBrand::Jcb => Some("JC"),
            CardBrand::Mastercard => Some("MC"),
            CardBrand::Visa => Some("VI"),
            _ => None,
        }
    }
}

impl fmt::Display for CardBrand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CardBrand::Visa => "visa",
            CardBrand::Mastercard => "mastercard",
            CardBrand::Discover => "discover",
            CardBrand::Amex => "amex",
            CardBrand::DinersClub => "diners_club",
            CardBrand::Jcb => "jcb",
            CardBrand::Switch => "switch",
            CardBrand::Solo => "solo",
            CardBrand::Dankort => "dankort",
            CardBrand::Maestro => "maestro",
            CardBrand::Forbrugsforeningen => "forbrugsforeningen",
            CardBrand::Laser => "laser",
        };
        f.write_str(name)
    }
}

/// Carte bancaire et adresse de facturation
///
/// Tous les champs de facturation sont optionnels : une chaîne vide produit
/// un élément vide, retiré avant l'envoi.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Card {
    pub number: String,
    pub expiry_month: Option<u32>,
    pub expiry_year: Option<u32>,
    pub cvv: String,
    /// Marque explicite; détectée depuis le numéro si absente
    pub brand: Option<CardBrand>,
    pub billing_name: String,
    pub billing_address1: String,
    pub billing_city: String,
    pub billing_state: String,
    pub billing_postcode: String,
    pub billing_country: String,
    pub email: String,
    pub billing_phone: String,
}

impl Card {
    pub fn new(number: impl Into<String>, expiry_month: u32, expiry_year: u32) -> Self {
        Self {
            number: number.into(),
            expiry_month: Some(expiry_month),
            expiry_year: Some(expiry_year),
            ..Default::default()
        }
    }

    pub fn with_cvv(mut self, cvv: impl Into<String>) -> Self {
        self.cvv = cvv.into();
        self
    }

    pub fn with_brand(mut self, brand: CardBrand) -> Self {
        self.brand = Some(brand);
        self
    }

    pub fn with_billing_name(mut self, name: impl Into<String>) -> Self {
        self.billing_name = name.into();
        self
    }

    pub fn with_billing_address(
        mut self,
        address1: impl Into<String>,
        city: impl Into<String>,
        state: impl Into<String>,
        postcode: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        self.billing_address1 = address1.into();
        self.billing_city = city.into();
        self.billing_state = state.into();
        self.billing_postcode = postcode.into();
        self.billing_country = country.into();
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    pub fn with_billing_phone(mut self, phone: impl Into<String>) -> Self {
        self.billing_phone = phone.into();
        self
    }

    /// Marque explicite, ou détectée depuis le numéro
    pub fn brand(&self) -> Option<CardBrand> {
        self.brand.or_else(|| CardBrand::detect(&self.number))
    }

    /// Date d'expiration au format MMYY, vide si incomplète
    pub fn expiry_date(&self) -> String {
        match (self.expiry_month, self.expiry_year) {
            (Some(month), Some(year)) => format!("{:02}{:02}", month, year % 100),
            _ => String::new(),
        }
    }

    /// Numéro réduit à ses chiffres, tel qu'envoyé à la passerelle
    pub fn digits(&self) -> String {
        self.number.chars().filter(|c| c.is_ascii_digit()).collect()
    }

    /// Quatre derniers chiffres, pour les logs
    pub fn last_four(&self) -> String {
        let digits = self.digits();
        let start = digits.len().saturating_sub(4);
        digits[start..].to_string()
    }
}

// Numéro et CVV masqués
impl fmt::Debug for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Card")
            .field("number", &format_args!("****{}", self.last_four()))
            .field("expiry", &self.expiry_date())
            .field("brand", &self.brand())
            .field("billing_name", &self.billing_name)
            .finish_non_exhaustive()
    }
}

/// Moyen de paiement d'une requête : exactement l'un des deux
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentMethod {
    Card(Card),
    Token(String),
}

impl PaymentMethod {
    /// Un token vide ou une carte sans numéro ne comptent pas
    pub(crate) fn is_present(&self) -> bool {
        match self {
            PaymentMethod::Card(card) => !card.digits().is_empty(),
            PaymentMethod::Token(token) => !token.trim().is_empty(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PaymentMethod::Card(_) => "card",
            PaymentMethod::Token(_) => "token",
        }
    }
}

impl From<Card> for PaymentMethod {
    fn from(card: Card) -> Self {
        PaymentMethod::Card(card)
    }
}
