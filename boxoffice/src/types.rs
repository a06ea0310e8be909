//! Domain primitives for the ticketing core.
//!
//! All identifiers and validated strings use smart constructors so that a
//! value, once built, is valid everywhere it flows. Raw input is parsed into
//! these types at the system boundary; the service and storage layers never
//! re-validate.

use chrono::{DateTime, Utc};
use nutype::nutype;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use uuid::Uuid;

/// Identifier of a sellable event (a show, a concert, a conference day).
///
/// Format: `EVT-{UPPERCASE_ALPHANUMERIC}`.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 50, regex = r"^EVT-[A-Z0-9]+$"),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        Display,
        AsRef,
        Deref,
        Serialize,
        Deserialize,
        TryFrom
    )
)]
pub struct EventId(String);

impl EventId {
    /// Generate a new event id from a v7 UUID.
    pub fn generate() -> Self {
        Self::try_new(format!("EVT-{}", new_id_suffix())).expect("generated EventId should be valid")
    }
}

/// Identifier of a single admission.
///
/// Format: `TKT-{UPPERCASE_ALPHANUMERIC}`.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 50, regex = r"^TKT-[A-Z0-9]+$"),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        Display,
        AsRef,
        Deref,
        Serialize,
        Deserialize,
        TryFrom
    )
)]
pub struct TicketId(String);

impl TicketId {
    /// Generate a new ticket id from a v7 UUID.
    pub fn generate() -> Self {
        Self::try_new(format!("TKT-{}", new_id_suffix())).expect("generated TicketId should be valid")
    }
}

/// Identifier of an order. Doubles as the external reference handed to the
/// payment gateway, so settlement callbacks can be correlated back to us.
///
/// Format: `ORD-{UPPERCASE_ALPHANUMERIC}`.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 50, regex = r"^ORD-[A-Z0-9]+$"),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        Display,
        AsRef,
        Deref,
        Serialize,
        Deserialize,
        TryFrom
    )
)]
pub struct OrderId(String);

impl OrderId {
    /// Generate a new order id from a v7 UUID.
    pub fn generate() -> Self {
        Self::try_new(format!("ORD-{}", new_id_suffix())).expect("generated OrderId should be valid")
    }
}

/// Identifier of our local payment record (not the gateway's).
///
/// Format: `PAY-{UPPERCASE_ALPHANUMERIC}`.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 50, regex = r"^PAY-[A-Z0-9]+$"),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        Display,
        AsRef,
        Deref,
        Serialize,
        Deserialize,
        TryFrom
    )
)]
pub struct PaymentId(String);

impl PaymentId {
    /// Generate a new payment id from a v7 UUID.
    pub fn generate() -> Self {
        Self::try_new(format!("PAY-{}", new_id_suffix()))
            .expect("generated PaymentId should be valid")
    }
}

fn new_id_suffix() -> String {
    Uuid::now_v7().simple().to_string().to_uppercase()
}

/// Identifier of a registered user. Orders from guest checkouts carry none.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 255),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        Display,
        AsRef,
        Deref,
        Serialize,
        Deserialize,
        TryFrom
    )
)]
pub struct UserId(String);

/// The payment id assigned by the external gateway.
///
/// Opaque to us; the gateway may assign a fresh one for a retried attempt on
/// the same order, so this is kept for correlation and audit, never used as
/// an idempotency key.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 255),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        Display,
        AsRef,
        Deref,
        Serialize,
        Deserialize,
        TryFrom
    )
)]
pub struct GatewayPaymentId(String);

/// Opaque checkout handle returned by the gateway when an intent is created.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 255),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        Display,
        AsRef,
        Deref,
        Serialize,
        Deserialize,
        TryFrom
    )
)]
pub struct IntentId(String);

/// Identifier carried by an inbound gateway webhook notification.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 255),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        Display,
        AsRef,
        Deref,
        Serialize,
        Deserialize,
        TryFrom
    )
)]
pub struct NotificationId(String);

/// Single-use card token produced by the client-side card-collection form.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 255),
    derive(Debug, Clone, PartialEq, Eq, AsRef, Deref, Serialize, Deserialize, TryFrom)
)]
pub struct CardToken(String);

/// Number of installments for a card charge.
#[nutype(
    validate(greater_or_equal = 1, less_or_equal = 36),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Display,
        Into,
        Serialize,
        Deserialize,
        TryFrom
    )
)]
pub struct Installments(u32);

/// Payment method label reported by the gateway (e.g. `credit_card`).
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 64),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Display,
        AsRef,
        Deref,
        Serialize,
        Deserialize,
        TryFrom
    )
)]
pub struct PaymentMethod(String);

/// Human-readable title of a sellable event.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 200),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Display,
        AsRef,
        Deref,
        Serialize,
        Deserialize,
        TryFrom
    )
)]
pub struct EventTitle(String);

/// A person's given name or surname.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 100),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Display,
        AsRef,
        Deref,
        Serialize,
        Deserialize,
        TryFrom
    )
)]
pub struct PersonName(String);

/// Email address with basic format validation.
#[nutype(
    sanitize(trim),
    validate(
        not_empty,
        len_char_max = 255,
        regex = r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$"
    ),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        Display,
        AsRef,
        Deref,
        Serialize,
        Deserialize,
        TryFrom
    )
)]
pub struct EmailAddress(String);

/// National identity document number.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 32, regex = r"^[A-Za-z0-9.-]+$"),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Display,
        AsRef,
        Deref,
        Serialize,
        Deserialize,
        TryFrom
    )
)]
pub struct NationalId(String);

/// Phone number in loose international notation.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 32, regex = r"^[0-9+()\s-]+$"),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Display,
        AsRef,
        Deref,
        Serialize,
        Deserialize,
        TryFrom
    )
)]
pub struct PhoneNumber(String);

/// The buyer identity captured when a ticket is issued.
///
/// A snapshot, not a live reference: later edits to a user account never
/// change what is printed on an already-sold ticket. Name, surname, email and
/// national id are mandatory; the phone number is optional. Presence of the
/// mandatory fields is guaranteed by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyerSnapshot {
    /// Buyer's given name.
    pub name: PersonName,
    /// Buyer's surname.
    pub surname: PersonName,
    /// Contact email, also used as the payer email for gateway calls.
    pub email: EmailAddress,
    /// Optional contact phone.
    pub phone: Option<PhoneNumber>,
    /// National identity document number.
    pub national_id: NationalId,
}

impl BuyerSnapshot {
    /// Create a buyer snapshot from already-validated parts.
    pub const fn new(
        name: PersonName,
        surname: PersonName,
        email: EmailAddress,
        phone: Option<PhoneNumber>,
        national_id: NationalId,
    ) -> Self {
        Self {
            name,
            surname,
            email,
            phone,
            national_id,
        }
    }
}

/// Error raised when a monetary amount fails validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid money amount: {0}")]
pub struct MoneyError(pub String);

/// Monetary amount in a single implicit currency.
///
/// Uses `Decimal` for precise arithmetic. Must be non-negative with at most
/// two decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(Decimal);

impl Money {
    /// Maximum representable amount (100 million).
    pub const MAX_AMOUNT: Decimal = Decimal::from_parts(100_000_000, 0, 0, false, 0);

    /// Create money from a whole number of cents.
    pub fn from_cents(cents: u64) -> Result<Self, MoneyError> {
        let cents = i64::try_from(cents)
            .map_err(|_| MoneyError(format!("amount of {cents} cents is out of range")))?;
        Self::new(Decimal::new(cents, 2))
    }

    /// Create money from a decimal amount.
    pub fn new(amount: Decimal) -> Result<Self, MoneyError> {
        if amount.is_sign_negative() {
            return Err(MoneyError(format!("amount cannot be negative: {amount}")));
        }
        if amount.scale() > 2 {
            return Err(MoneyError(format!(
                "amount cannot have more than 2 decimal places: {amount}"
            )));
        }
        if amount > Self::MAX_AMOUNT {
            return Err(MoneyError(format!(
                "amount {} exceeds maximum {}",
                amount,
                Self::MAX_AMOUNT
            )));
        }
        Ok(Self(amount))
    }

    /// The zero amount.
    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// The underlying decimal value.
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// The amount as a whole number of cents.
    pub fn to_cents(&self) -> u64 {
        (self.0 * Decimal::from(100)).to_u64().unwrap_or(0)
    }

    /// Add two amounts, rejecting overflow past the maximum.
    pub fn checked_add(self, other: Self) -> Result<Self, MoneyError> {
        Self::new(self.0 + other.0)
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

/// Revision of a stored record, used for optimistic concurrency control.
///
/// Revisions start at 0 for a record that has never been written and
/// increment on every committed write.
#[nutype(
    validate(greater_or_equal = 0),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        Display,
        Into,
        Serialize,
        Deserialize
    )
)]
pub struct Revision(u64);

impl Revision {
    /// The revision of a record that does not exist yet.
    pub fn initial() -> Self {
        Self::try_new(0).expect("0 is always a valid revision")
    }

    /// The revision after this one.
    #[must_use]
    pub fn next(self) -> Self {
        let current: u64 = self.into();
        Self::try_new(current + 1).expect("next revision should always be valid")
    }
}

/// Moment a record was created, in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Wrap an existing UTC datetime.
    pub const fn new(datetime: DateTime<Utc>) -> Self {
        Self(datetime)
    }

    /// The current moment.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// The underlying datetime.
    pub const fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(datetime: DateTime<Utc>) -> Self {
        Self::new(datetime)
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
