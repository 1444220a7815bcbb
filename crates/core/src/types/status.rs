//! Status enums for various entities.

use serde::{Deserialize, Serialize};

/// How the customer pays the courier at the door.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodPaymentType {
    /// Cash handed over on delivery.
    Cash,
    /// Card terminal at the door.
    Card,
}

impl CodPaymentType {
    /// Human-readable label used in order notes.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Cash => "Cash on Delivery",
            Self::Card => "Card on Delivery",
        }
    }

    /// Tag value encoded onto the platform order.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Cash => "COD-Cash",
            Self::Card => "COD-Card",
        }
    }
}

impl std::fmt::Display for CodPaymentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cash => write!(f, "cash"),
            Self::Card => write!(f, "card"),
        }
    }
}

impl std::str::FromStr for CodPaymentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(Self::Cash),
            "card" => Ok(Self::Card),
            _ => Err(format!("invalid COD payment type: {s}")),
        }
    }
}

/// Lifecycle status of a locally persisted order copy.
///
/// The platform order is the source of truth; this only tracks what the
/// gateway knows locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Created and awaiting payment on delivery.
    #[default]
    Pending,
    /// Courier collected payment.
    Paid,
    /// Cancelled before fulfillment.
    Cancelled,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Paid => write!(f, "paid"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}
