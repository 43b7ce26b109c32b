use super::{parse_time, CsvExchange, ExchangeError, ExchangeRecord};
use crate::assets::split_pair;
use crate::orders::RawOrder;
use cointaxes_derive::CsvSchema;
use rust_decimal::Decimal;
use serde::Deserialize;

// portfolio,trade id,product,side,created at,size,size unit,price,fee,total,price/fee/total unit
// default,155157,ETH-USD,SELL,2018-11-20T21:39:45.667Z,5.41307455,ETH,101.86,1.65,549.72,USD

pub type Gdax = CsvExchange<Record>;

/// A fill from the Coinbase Pro (formerly GDAX) fills report
#[derive(Debug, Deserialize, Clone, CsvSchema)]
pub struct Record {
    #[serde(rename = "trade id")]
    trade_id: String,
    /// Trading pair, base first, e.g. ETH-BTC
    product: String,
    /// BUY or SELL
    side: String,
    /// Fill time, RFC 3339
    #[serde(rename = "created at")]
    created_at: String,
    /// Quantity of the base asset
    size: Decimal,
    #[serde(rename = "size unit")]
    size_unit: String,
    /// Price of one unit of the base asset in the quote asset
    price: Decimal,
    fee: Decimal,
    /// Quote asset total including the fee, negative for buys
    total: Decimal,
    #[serde(rename = "price/fee/total unit")]
    unit: String,
}

impl ExchangeRecord for Record {
    const EXCHANGE: &'static str = "gdax";

    fn into_order(self) -> Result<Option<RawOrder>, ExchangeError> {
        let time = parse_time(&self.created_at, &["%Y-%m-%d %H:%M:%S%.f"])?;
        let (base, quote) = split_pair(&self.product).ok_or_else(|| {
            ExchangeError::InvalidRecord(format!(
                "trade {} has invalid product {}",
                self.trade_id, self.product
            ))
        })?;
        if !self.unit.eq_ignore_ascii_case(&quote) {
            return Err(ExchangeError::InvalidRecord(format!(
                "trade {} totals are in {}, expected {}",
                self.trade_id, self.unit, quote
            )));
        }
        log::debug!(
            "gdax trade {}: {} {} {} fee {}",
            self.trade_id,
            self.side,
            self.size,
            self.size_unit,
            self.fee
        );

        Ok(Some(RawOrder {
            time,
            product: base,
            side: self.side.to_lowercase(),
            cost: self.total.abs(),
            amount: self.size,
            price: self.price,
            currency: quote,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchanges::csv_to_orders;
    use rust_decimal_macros::dec;

    const HEADER: &str = "portfolio,trade id,product,side,created at,size,size unit,price,fee,total,price/fee/total unit\n";

    #[test]
    fn reads_usd_and_coin_fills() {
        let csv = format!(
            "{}{}{}",
            HEADER,
            "default,1,BTC-USD,BUY,2018-01-05T15:00:00.000Z,0.5,BTC,15000.00,7.50,-7507.50,USD\n",
            "default,2,ETH-BTC,SELL,2018-02-01T12:00:00.000Z,2.0,ETH,0.1,0.0005,0.1995,BTC\n"
        );
        let orders = csv_to_orders::<Record, _>(csv.as_bytes()).unwrap();
        assert_eq!(orders.len(), 2);

        let btc = &orders[0];
        assert_eq!(btc.product, "BTC");
        assert_eq!(btc.side, "buy");
        assert_eq!(btc.cost, dec!(7507.50));
        assert_eq!(btc.amount, dec!(0.5));
        assert_eq!(btc.currency, "USD");

        let eth = &orders[1];
        assert_eq!(eth.product, "ETH");
        assert_eq!(eth.side, "sell");
        assert_eq!(eth.cost, dec!(0.1995));
        assert_eq!(eth.currency, "BTC");
    }

    #[test]
    fn missing_columns_reported_together() {
        let csv = "trade id,product,side\n1,BTC-USD,BUY\n";
        let err = csv_to_orders::<Record, _>(csv.as_bytes()).unwrap_err();
        let message = err.to_string();
        assert!(
            message.contains("'created at' (Fill time, RFC 3339)"),
            "{}",
            message
        );
        assert!(message.contains("'price/fee/total unit'"), "{}", message);
    }

    #[test]
    fn zero_size_fill_rejected() {
        let csv = format!(
            "{}default,1,BTC-USD,BUY,2018-01-05T15:00:00Z,0,BTC,15000.00,0,-1,USD\n",
            HEADER
        );
        let err = csv_to_orders::<Record, _>(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, ExchangeError::Order(_)));
    }
}
