/// Draft transaction form and its field-level validation.
use std::collections::BTreeMap;
use std::fmt;

use ethers::types::U256;
use serde::{Deserialize, Serialize};

use crate::display;

/// Smallest amount accepted by the form: 0.0001 ETH in wei.
pub const MIN_AMOUNT_WEI: u128 = 100_000_000_000_000;
pub const MIN_KEYWORD_LEN: usize = 2;
pub const MIN_MESSAGE_LEN: usize = 3;

/// The user-edited, not-yet-submitted transaction form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftTransaction {
    pub address_to: String,
    pub amount: String,
    pub keyword: String,
    pub message: String,
}

impl DraftTransaction {
    pub fn new(
        address_to: impl Into<String>,
        amount: impl Into<String>,
        keyword: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            address_to: address_to.into(),
            amount: amount.into(),
            keyword: keyword.into(),
            message: message.into(),
        }
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        let value = value.into();
        match field {
            Field::AddressTo => self.address_to = value,
            Field::Amount => self.amount = value,
            Field::Keyword => self.keyword = value,
            Field::Message => self.message = value,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.address_to.is_empty()
            && self.amount.is_empty()
            && self.keyword.is_empty()
            && self.message.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    AddressTo,
    Amount,
    Keyword,
    Message,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddressTo => write!(f, "addressTo"),
            Self::Amount => write!(f, "amount"),
            Self::Keyword => write!(f, "keyword"),
            Self::Message => write!(f, "message"),
        }
    }
}

impl std::str::FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "to" | "address" | "addressto" | "address_to" => Ok(Self::AddressTo),
            "amount" => Ok(Self::Amount),
            "keyword" => Ok(Self::Keyword),
            "message" | "msg" => Ok(Self::Message),
            other => Err(format!(
                "Unknown field '{other}'. Use 'to', 'amount', 'keyword' or 'message'."
            )),
        }
    }
}

/// Field-level validation messages, ordered by field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors(BTreeMap<Field, String>);

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.0.iter().map(|(f, m)| (*f, m.as_str()))
    }

    fn insert(&mut self, field: Field, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|(k, v)| format!("{k}: {v}")).collect();
        write!(f, "{}", parts.join("; "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Validation {
    pub valid: bool,
    pub field_errors: FieldErrors,
}

/// `0x` followed by exactly 40 hex digits, either case.
pub fn is_valid_address(address: &str) -> bool {
    is_prefixed_hex(address, 40)
}

/// `0x` followed by exactly 64 hex digits.
pub fn is_valid_tx_hash(hash: &str) -> bool {
    is_prefixed_hex(hash, 64)
}

fn is_prefixed_hex(value: &str, digits: usize) -> bool {
    match value.strip_prefix("0x") {
        Some(hex) => hex.len() == digits && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

/// A positive decimal ETH amount that converts to a non-zero wei value.
pub fn is_valid_amount(amount: &str) -> bool {
    matches!(display::parse_eth_amount(amount), Ok(wei) if !wei.is_zero())
}

/// Validate every field independently and collect all problems.
#[must_use]
pub fn validate(draft: &DraftTransaction) -> Validation {
    let mut errors = FieldErrors::default();

    let address = draft.address_to.trim();
    if address.is_empty() {
        errors.insert(Field::AddressTo, "Address is required");
    } else if !is_valid_address(address) {
        errors.insert(Field::AddressTo, "Invalid Ethereum address");
    }

    let amount = draft.amount.trim();
    if amount.is_empty() {
        errors.insert(Field::Amount, "Amount is required");
    } else {
        match display::parse_eth_amount(amount) {
            Ok(wei) if wei.is_zero() => {
                errors.insert(Field::Amount, "Amount must be greater than 0");
            }
            Ok(wei) if wei < U256::from(MIN_AMOUNT_WEI) => {
                errors.insert(Field::Amount, "Minimum amount is 0.0001 ETH");
            }
            Ok(_) => {}
            Err(_) => {
                errors.insert(Field::Amount, "Amount must be greater than 0");
            }
        }
    }

    // Blank input is rejected, but the length minimum counts the raw text.
    if draft.keyword.trim().is_empty() {
        errors.insert(Field::Keyword, "Keyword is required");
    } else if draft.keyword.chars().count() < MIN_KEYWORD_LEN {
        errors.insert(Field::Keyword, "Keyword must be at least 2 characters");
    }

    if draft.message.trim().is_empty() {
        errors.insert(Field::Message, "Message is required");
    } else if draft.message.chars().count() < MIN_MESSAGE_LEN {
        errors.insert(Field::Message, "Message must be at least 3 characters");
    }

    Validation {
        valid: errors.is_empty(),
        field_errors: errors,
    }
}
