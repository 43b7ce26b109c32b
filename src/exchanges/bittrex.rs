use super::{parse_time, CsvExchange, ExchangeError, ExchangeRecord};
use crate::assets::split_pair;
use crate::orders::RawOrder;
use cointaxes_derive::CsvSchema;
use rust_decimal::Decimal;
use serde::Deserialize;

pub type Bittrex = CsvExchange<Record>;

const DATE_FORMATS: &[&str] = &["%m/%d/%Y %I:%M:%S %p", "%m/%d/%Y %H:%M", "%Y-%m-%d %H:%M:%S"];

/// A row of the Bittrex order history export
#[derive(Debug, Deserialize, Clone, CsvSchema)]
pub struct Record {
    #[serde(rename = "OrderUuid")]
    order_id: String,
    /// Market, quote first, e.g. BTC-LTC
    #[serde(rename = "Exchange")]
    exchange: String,
    /// LIMIT_BUY or LIMIT_SELL
    #[serde(rename = "Type")]
    order_type: String,
    /// Quantity of the market asset
    #[serde(rename = "Quantity")]
    quantity: Decimal,
    #[serde(rename = "Limit")]
    limit: Decimal,
    /// Commission in the quote asset
    #[serde(rename = "CommissionPaid")]
    commission_paid: Decimal,
    /// Quote asset total excluding commission
    #[serde(rename = "Price")]
    price: Decimal,
    #[serde(rename = "Opened")]
    opened: Option<String>,
    #[serde(rename = "Closed")]
    closed: String,
}

impl ExchangeRecord for Record {
    const EXCHANGE: &'static str = "bittrex";

    fn into_order(self) -> Result<Option<RawOrder>, ExchangeError> {
        let time = parse_time(&self.closed, DATE_FORMATS)?;

        // bittrex names markets quote first
        let (quote, base) = split_pair(&self.exchange).ok_or_else(|| {
            ExchangeError::InvalidRecord(format!(
                "order {} has invalid market {}",
                self.order_id, self.exchange
            ))
        })?;

        let side = self.order_type.to_lowercase();
        let cost = match side.as_str() {
            "limit_buy" => self.price + self.commission_paid,
            "limit_sell" => self.price - self.commission_paid,
            _ => self.price,
        };
        let unit_price = if self.quantity.is_zero() {
            self.limit
        } else {
            self.price / self.quantity
        };
        log::debug!(
            "bittrex order {} opened {} closed {}",
            self.order_id,
            self.opened.as_deref().unwrap_or("-"),
            self.closed
        );

        Ok(Some(RawOrder {
            time,
            product: base,
            side,
            cost,
            amount: self.quantity,
            price: unit_price,
            currency: quote,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchanges::csv_to_orders;
    use crate::orders::Side;
    use rust_decimal_macros::dec;

    const CSV: &str = "\
OrderUuid,Exchange,Type,Quantity,Limit,CommissionPaid,Price,Opened,Closed
a1,BTC-LTC,LIMIT_SELL,2.0,0.02,0.0001,0.04,04/01/2018 09:00:00 AM,04/01/2018 09:05:00 AM
a2,BTC-BCC,LIMIT_BUY,1.0,0.1,0.00025,0.1,12/01/2017 1:00:00 PM,12/01/2017 1:30:00 PM
";

    #[test]
    fn reads_orders_quote_first() {
        let orders = csv_to_orders::<Record, _>(CSV.as_bytes()).unwrap();
        assert_eq!(orders.len(), 2);

        // sorted by time
        let bch = &orders[0];
        assert_eq!(bch.product, "BCH");
        assert_eq!(bch.currency, "BTC");
        assert_eq!(Side::parse(&bch.side), Some(Side::Buy));
        assert_eq!(bch.cost, dec!(0.10025));
        assert_eq!(bch.time.to_rfc3339(), "2017-12-01T13:30:00+00:00");

        let ltc = &orders[1];
        assert_eq!(ltc.product, "LTC");
        assert_eq!(Side::parse(&ltc.side), Some(Side::Sell));
        assert_eq!(ltc.cost, dec!(0.0399));
        assert_eq!(ltc.amount, dec!(2.0));
        assert_eq!(ltc.price, dec!(0.02));
    }

    #[test]
    fn unknown_order_type_passed_through_for_normalizer() {
        let csv = "\
OrderUuid,Exchange,Type,Quantity,Limit,CommissionPaid,Price,Opened,Closed
a3,BTC-LTC,CONDITIONAL,1.0,0.02,0,0.02,,04/01/2018 09:05:00 AM
";
        let orders = csv_to_orders::<Record, _>(csv.as_bytes()).unwrap();
        assert_eq!(orders[0].side, "conditional");
        assert_eq!(Side::parse(&orders[0].side), None);
    }
}
