//! Core types for the broker gateway

use crate::error::{GatewayError, Result};
use crate::services::extract::{as_number, as_text};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Order as submitted by a caller. Either `transaction_type` or `side`, and
/// either `quantity` or `qty`, must be present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    #[serde(default = "default_exchange")]
    pub exchange: String,
    #[serde(default = "default_product")]
    pub product: String,
    #[serde(default)]
    pub transaction_type: Option<String>,
    /// Alias for `transaction_type`
    #[serde(default)]
    pub side: Option<String>,
    #[serde(default)]
    pub quantity: Option<i64>,
    /// Alias for `quantity`
    #[serde(default)]
    pub qty: Option<i64>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default = "default_order_type")]
    pub order_type: String,
    #[serde(default = "default_validity")]
    pub validity: String,
    #[serde(default)]
    pub disclosed_quantity: i64,
    #[serde(default)]
    pub trigger_price: Option<f64>,
    #[serde(default)]
    pub tag: Option<String>,
}

fn default_exchange() -> String {
    "NFO".to_string()
}

fn default_product() -> String {
    "MIS".to_string()
}

fn default_order_type() -> String {
    "MARKET".to_string()
}

fn default_validity() -> String {
    "DAY".to_string()
}

/// Canonical order, serialized as the brokerage wire payload.
/// Absent optional fields are left out of the payload entirely.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderIntent {
    pub symbol: String,
    pub exchange: String,
    #[serde(rename = "productType")]
    pub product: String,
    pub transaction_type: String,
    pub quantity: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    pub order_type: String,
    pub validity: String,
    pub disclosed_quantity: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl OrderRequest {
    /// Collapse synonym pairs into one canonical value each
    pub fn normalize(self) -> Result<OrderIntent> {
        let symbol = self.symbol.trim().to_string();
        if symbol.is_empty() {
            return Err(GatewayError::InvalidRequest("symbol is required".to_string()));
        }

        let transaction_type = self
            .transaction_type
            .filter(|t| !t.trim().is_empty())
            .or(self.side.filter(|s| !s.trim().is_empty()))
            .map(|t| t.trim().to_uppercase())
            .ok_or_else(|| GatewayError::InvalidRequest("transaction_type or side is required".to_string()))?;

        let quantity = self
            .quantity
            .filter(|q| *q != 0)
            .or(self.qty)
            .filter(|q| *q > 0)
            .ok_or_else(|| GatewayError::InvalidRequest("a positive quantity or qty is required".to_string()))?;

        Ok(OrderIntent {
            symbol,
            exchange: self.exchange,
            product: self.product,
            transaction_type,
            quantity,
            price: self.price,
            order_type: self.order_type,
            validity: self.validity,
            disclosed_quantity: self.disclosed_quantity,
            trigger_price: self.trigger_price,
            tag: self.tag.filter(|t| !t.is_empty()),
        })
    }
}

impl OrderIntent {
    /// Day limit sell with the default exchange and product
    pub fn limit_sell(symbol: &str, quantity: i64, price: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            exchange: default_exchange(),
            product: default_product(),
            transaction_type: "SELL".to_string(),
            quantity,
            price: Some(price),
            order_type: "LIMIT".to_string(),
            validity: default_validity(),
            disclosed_quantity: 0,
            trigger_price: None,
            tag: None,
        }
    }
}

/// Order acknowledgement returned by the brokerage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderAck {
    pub order_id: String,
    pub status: String,
}

/// Open brokerage holding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub symbol: String,
    pub quantity: i64,
    pub average_buy_price: f64,
}

const SYMBOL_FIELDS: &[&str] = &["symbol", "tradingsymbol"];
const QUANTITY_FIELDS: &[&str] = &["qty", "quantity"];
const AVG_PRICE_FIELDS: &[&str] = &["buy_price", "avgPrice", "avg_buy_price"];

impl Position {
    /// Parse one raw position row. `None` unless symbol, a positive quantity
    /// and a positive average price all resolve from some synonym.
    pub fn from_row(row: &Value) -> Option<Self> {
        let object = row.as_object()?;
        // An empty or zero synonym falls through to the next one
        let number = |fields: &[&str], usable: fn(f64) -> bool| {
            fields
                .iter()
                .find_map(|f| object.get(*f).and_then(as_number).filter(|n| usable(*n)))
        };

        let symbol = SYMBOL_FIELDS.iter().find_map(|f| object.get(*f).and_then(as_text))?;
        let quantity = number(QUANTITY_FIELDS, |q| q >= 1.0)?;
        let average_buy_price = number(AVG_PRICE_FIELDS, |p| p > 0.0)?;

        Some(Self {
            symbol,
            quantity: quantity.trunc() as i64,
            average_buy_price,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Funds {
    pub available: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profit {
    pub day_profit: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Expenses {
    pub brokerage: f64,
    pub taxes: f64,
    pub other: f64,
    pub total: f64,
}

impl Expenses {
    pub fn new(brokerage: f64, taxes: f64, other: f64) -> Self {
        Self {
            brokerage,
            taxes,
            other,
            total: brokerage + taxes + other,
        }
    }
}

/// Segment/exchange/product selector for the user limits endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsQuery {
    #[serde(default = "default_segment")]
    pub seg: String,
    #[serde(default = "default_limits_exchange")]
    pub exch: String,
    #[serde(default = "default_limits_product")]
    pub prod: String,
}

impl Default for LimitsQuery {
    fn default() -> Self {
        Self {
            seg: default_segment(),
            exch: default_limits_exchange(),
            prod: default_limits_product(),
        }
    }
}

/// Pre-trade margin check, sent verbatim as the `jData` payload.
/// Field names follow the brokerage's wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarginRequest {
    pub brk_name: String,
    pub brnch_id: String,
    pub ex_seg: String,
    pub prc: String,
    pub prc_tp: String,
    pub prod: String,
    pub qty: String,
    pub tok: String,
    pub trns_tp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sl_abs_or_tks: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sl_val: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sqr_off_abs_or_tks: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sqr_off_val: Option<String>,
    #[serde(default, rename = "trailSL", skip_serializing_if = "Option::is_none")]
    pub trail_sl: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trg_prc: Option<String>,
    #[serde(default, rename = "tSLTks", skip_serializing_if = "Option::is_none")]
    pub t_sl_tks: Option<String>,
}

fn default_segment() -> String {
    "CASH".to_string()
}

fn default_limits_exchange() -> String {
    "NSE".to_string()
}

fn default_limits_product() -> String {
    "ALL".to_string()
}
