use super::{parse_time, CsvExchange, ExchangeError, ExchangeRecord};
use crate::assets::split_pair;
use crate::orders::RawOrder;
use cointaxes_derive::CsvSchema;
use rust_decimal::Decimal;
use serde::Deserialize;

pub type Poloniex = CsvExchange<Record>;

/// A row of the Poloniex trade history export
#[derive(Debug, Deserialize, Clone, CsvSchema)]
pub struct Record {
    #[serde(rename = "Date")]
    date: String,
    /// Market, asset first, e.g. XMR/BTC
    #[serde(rename = "Market")]
    market: String,
    /// Buy or Sell
    #[serde(rename = "Type")]
    order_type: String,
    #[serde(rename = "Price")]
    price: Decimal,
    #[serde(rename = "Amount")]
    amount: Decimal,
    #[serde(rename = "Total")]
    total: Decimal,
    #[serde(rename = "Order Number")]
    order_number: Option<String>,
    /// Quote asset received by a sell after fees
    #[serde(rename = "Base Total Less Fee")]
    base_total_less_fee: Option<Decimal>,
    /// Asset received by a buy after fees
    #[serde(rename = "Quote Total Less Fee")]
    quote_total_less_fee: Option<Decimal>,
}

impl ExchangeRecord for Record {
    const EXCHANGE: &'static str = "poloniex";

    fn into_order(self) -> Result<Option<RawOrder>, ExchangeError> {
        let time = parse_time(&self.date, &["%Y-%m-%d %H:%M:%S"])?;

        let (base, quote) = split_pair(&self.market).ok_or_else(|| {
            ExchangeError::InvalidRecord(format!(
                "order {} has invalid market {}",
                self.order_number.as_deref().unwrap_or("-"),
                self.market
            ))
        })?;

        // note that poloniex labels the asset received after fees as the "quote" total
        let side = self.order_type.to_lowercase();
        let (cost, amount) = match side.as_str() {
            "buy" => (
                self.total,
                self.quote_total_less_fee.unwrap_or(self.amount).abs(),
            ),
            "sell" => (
                self.base_total_less_fee.unwrap_or(self.total).abs(),
                self.amount,
            ),
            _ => (self.total, self.amount),
        };

        Ok(Some(RawOrder {
            time,
            product: base,
            side,
            cost,
            amount,
            price: self.price,
            currency: quote,
        }))
    }
}
