use super::{parse_decimal, parse_time, CsvExchange, ExchangeError, ExchangeRecord};
use crate::orders::RawOrder;
use cointaxes_derive::CsvSchema;
use rust_decimal::Decimal;
use serde::Deserialize;

// Timestamp,Transaction Type,Asset,Quantity Transacted,Spot Price Currency,Spot Price at Transaction,Subtotal,Total (inclusive of fees),Fees,Notes
// 2018-03-01T10:00:00Z,Buy,LTC,10,USD,200.00,1990.00,2000.00,10.00,Bought 10 LTC for $2000.00 USD

pub type Coinbase = CsvExchange<Record>;

/// A row of the Coinbase transaction history report
#[derive(Debug, Deserialize, Clone, CsvSchema)]
pub struct Record {
    #[serde(rename = "Timestamp")]
    timestamp: String,
    /// Buy, Sell, Send, Receive, ...
    #[serde(rename = "Transaction Type")]
    transaction_type: String,
    #[serde(rename = "Asset")]
    asset: String,
    #[serde(rename = "Quantity Transacted")]
    quantity: String,
    #[serde(rename = "Spot Price Currency")]
    spot_price_currency: String,
    #[serde(rename = "Spot Price at Transaction")]
    spot_price: String,
    /// Amount paid for a buy, or received for a sell, including fees
    #[serde(
        rename = "Total (inclusive of fees)",
        alias = "Total (inclusive of fees and/or spread)"
    )]
    total: Option<String>,
    #[serde(rename = "Fees", alias = "Fees and/or Spread")]
    fees: Option<String>,
    #[serde(rename = "Notes")]
    notes: Option<String>,
}

impl ExchangeRecord for Record {
    const EXCHANGE: &'static str = "coinbase";

    fn into_order(self) -> Result<Option<RawOrder>, ExchangeError> {
        let side = self.transaction_type.to_lowercase();
        if side != "buy" && side != "sell" {
            log::debug!(
                "Skipping coinbase {} of {} {}",
                self.transaction_type,
                self.quantity,
                self.asset
            );
            return Ok(None);
        }

        let time = parse_time(&self.timestamp, &["%Y-%m-%d %H:%M:%S UTC", "%Y-%m-%d %H:%M:%S"])?;
        let total = self.total.as_deref().unwrap_or_default();
        if total.is_empty() {
            return Err(ExchangeError::InvalidRecord(format!(
                "coinbase {} at {} has no total",
                self.transaction_type, self.timestamp
            )));
        }
        let cost = parse_decimal(total)?.abs();
        let fees = match self.fees.as_deref() {
            Some(fees) if !fees.is_empty() => parse_decimal(fees)?,
            _ => Decimal::ZERO,
        };
        log::debug!(
            "coinbase {} {} {} total {} fees {} {}",
            side,
            self.quantity,
            self.asset,
            cost,
            fees,
            self.notes.as_deref().unwrap_or_default()
        );

        Ok(Some(RawOrder {
            time,
            product: self.asset,
            side,
            cost,
            amount: parse_decimal(&self.quantity)?,
            price: parse_decimal(&self.spot_price)?,
            currency: self.spot_price_currency,
        }))
    }
}
