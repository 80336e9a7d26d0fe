use super::money::{Money, Quantity};
use super::product::{ProductId, Sku};
use crate::error::ShopError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub Uuid);

impl OrderId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for OrderId {
    type Err = ShopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| ShopError::validation(format!("Invalid order id '{s}'")))
    }
}

/// Order lifecycle. Status changes after creation are not validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderStatus {
    Created,
    PaymentPending,
    Paid,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Paid | Self::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::PaymentPending => "paymentPending",
            Self::Paid => "paid",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

impl FromStr for OrderStatus {
    type Err = ShopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '-' | '_'))
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "created" => Ok(Self::Created),
            "paymentpending" => Ok(Self::PaymentPending),
            "paid" => Ok(Self::Paid),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            _ => Err(ShopError::validation(format!("Unknown order status '{s}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentProvider {
    #[default]
    None,
    Paypal,
    Stripe,
}

impl PaymentProvider {
    /// Providers whose payment is settled before the order is placed.
    pub fn settles_immediately(&self) -> bool {
        matches!(self, Self::Paypal)
    }

    /// Status a freshly created order starts in.
    pub fn initial_status(&self) -> OrderStatus {
        if self.settles_immediately() {
            OrderStatus::Paid
        } else {
            OrderStatus::PaymentPending
        }
    }
}

/// Customer and shipping fields as submitted at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomerDetails {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub street: String,
    pub house_number: String,
    pub address_line2: Option<String>,
    pub city_name: String,
    pub postal_code: String,
    pub country_code: String,
}

fn required(value: &str, message: &str) -> Result<String, ShopError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ShopError::validation(message))
    } else {
        Ok(trimmed.to_string())
    }
}

fn optional(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl CustomerDetails {
    /// Checks required fields in declaration order and returns trimmed
    /// snapshots. The first missing field is reported.
    pub fn to_snapshots(&self) -> Result<(CustomerSnapshot, ShippingAddress), ShopError> {
        let first_name = required(&self.first_name, "Customer first name is required")?;
        let last_name = required(&self.last_name, "Customer last name is required")?;
        let email = required(&self.email, "Customer email is required")?;
        let street = required(&self.street, "Shipping street is required")?;
        let house_number = required(&self.house_number, "Shipping house number is required")?;
        let city_name = required(&self.city_name, "Shipping city is required")?;
        let postal_code = required(&self.postal_code, "Shipping postal code is required")?;
        let country_code =
            required(&self.country_code, "Shipping country code is required")?.to_uppercase();

        let customer = CustomerSnapshot {
            id: Uuid::new_v4(),
            first_name,
            last_name,
            email,
            phone: optional(&self.phone),
        };
        let address = ShippingAddress {
            street,
            house_number,
            address_line2: optional(&self.address_line2),
            city_name,
            postal_code,
            country_code,
        };
        Ok((customer, address))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSnapshot {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub street: String,
    pub house_number: String,
    pub address_line2: Option<String>,
    pub city_name: String,
    pub postal_code: String,
    pub country_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemRequest {
    pub sku: String,
    pub quantity: i64,
}

/// Items to preview. Any other fields, such as a full order's customer, are
/// ignored.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartRequest {
    #[serde(default)]
    pub items: Vec<CartItemRequest>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub customer: CustomerDetails,
    #[serde(default)]
    pub items: Vec<CartItemRequest>,
    #[serde(default)]
    pub payment_provider: PaymentProvider,
}

/// An order line with product name, SKU and unit price frozen at order time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub sku: Sku,
    pub quantity: Quantity,
    pub unit_net_price: Money,
    pub line_net: Money,
    pub tax_amount: Money,
    pub line_total_gross: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub customer: CustomerSnapshot,
    pub shipping_address: ShippingAddress,
    pub items: Vec<OrderLine>,
    pub status: OrderStatus,
    pub payment_provider: PaymentProvider,
    pub subtotal_net: Money,
    pub tax_amount: Money,
    pub shipping_cost: Money,
    pub total_gross: Money,
    pub created_at: DateTime<Utc>,
}

/// Cart preview line, same amounts an order line would get.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub sku: Sku,
    pub name: String,
    pub quantity: Quantity,
    pub unit_net_price: Money,
    pub line_net: Money,
    pub tax_amount: Money,
    pub line_total_gross: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartInfo {
    pub items: Vec<CartLine>,
    pub subtotal_net: Money,
    pub tax_amount: Money,
    pub shipping_cost: Money,
    pub total_gross: Money,
}
