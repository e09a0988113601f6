use rand::Rng;
use rust_decimal::Decimal;
use serde::Serialize;

use super::id::TransactionId;
use super::options::ScriptVariant;

pub const ACCOUNT_CODE_LEN: usize = 5;
pub const TRANSACTION_NO_LEN: usize = 5;
pub const DESCRIPTION_LEN: usize = 10;

pub const ACCOUNT_NUMBER_MIN: u64 = 1_000_000_000;
pub const ACCOUNT_NUMBER_MAX: u64 = 9_999_999_999;

/// Amounts are whole cents strictly between 1.00 and 1000.00.
const AMOUNT_CENTS_MIN: i64 = 101;
const AMOUNT_CENTS_MAX: i64 = 99_999;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AccountId {
    Code(String),
    Number(u64),
}

/// Two-decimal amount, sent either as a JSON number or as a decimal string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Amount {
    Number(
        #[serde(serialize_with = "rust_decimal::serde::arbitrary_precision::serialize")] Decimal,
    ),
    Text(Decimal),
}

impl Amount {
    pub fn value(&self) -> Decimal {
        match *self {
            Self::Number(d) | Self::Text(d) => d,
        }
    }
}

/// Body of create and update requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<TransactionId>,
    pub source_account_id: AccountId,
    pub target_account_id: AccountId,
    pub transaction_no: String,
    pub amount: Amount,
    pub description: String,
}

impl TransactionRecord {
    pub fn random<R: Rng + ?Sized>(variant: ScriptVariant, rng: &mut R) -> Self {
        let source_account_id = random_account_id(variant, rng);
        let target_account_id = random_account_id(variant, rng);
        let transaction_no = random_lowercase(rng, TRANSACTION_NO_LEN);
        let amount = match variant {
            ScriptVariant::Basic => Amount::Number(random_amount(rng)),
            ScriptVariant::Extended => Amount::Text(random_amount(rng)),
        };
        let description = random_lowercase(rng, DESCRIPTION_LEN);

        Self {
            id: None,
            source_account_id,
            target_account_id,
            transaction_no,
            amount,
            description,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: TransactionId) -> Self {
        self.id = Some(id);
        self
    }
}

pub fn random_account_id<R: Rng + ?Sized>(variant: ScriptVariant, rng: &mut R) -> AccountId {
    match variant {
        ScriptVariant::Basic => AccountId::Code(random_lowercase(rng, ACCOUNT_CODE_LEN)),
        ScriptVariant::Extended => {
            AccountId::Number(rng.random_range(ACCOUNT_NUMBER_MIN..=ACCOUNT_NUMBER_MAX))
        }
    }
}

pub fn random_lowercase<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| char::from(rng.random_range(b'a'..=b'z')))
        .collect()
}

pub fn random_amount<R: Rng + ?Sized>(rng: &mut R) -> Decimal {
    Decimal::new(rng.random_range(AMOUNT_CENTS_MIN..=AMOUNT_CENTS_MAX), 2)
}
