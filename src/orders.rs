use crate::assets::{canonical_symbol, USD};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::fmt;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum OrderError {
    #[error("order is missing a {0}")]
    MissingField(&'static str),
    #[error("{product} order at {time} has non-positive amount {amount}")]
    NonPositiveAmount {
        product: String,
        time: DateTime<Utc>,
        amount: Decimal,
    },
    #[error("{product} order at {time} has non-positive cost {cost}")]
    NonPositiveCost {
        product: String,
        time: DateTime<Utc>,
        cost: Decimal,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Parse an exchange buy/sell indicator, e.g. "BUY", "sell", "LIMIT_BUY"
    pub fn parse(indicator: &str) -> Option<Side> {
        match indicator.trim().to_lowercase().as_str() {
            "buy" | "limit_buy" | "market_buy" => Some(Side::Buy),
            "sell" | "limit_sell" | "market_sell" => Some(Side::Sell),
            _ => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

/// An order as read from an exchange export, before normalization.
///
/// `side` is the exchange's indicator verbatim: unrecognised indicators are
/// reported and dropped by the normalizer rather than at ingestion.
#[derive(Debug, Clone, PartialEq)]
pub struct RawOrder {
    pub time: DateTime<Utc>,
    /// Traded asset symbol
    pub product: String,
    pub side: String,
    /// Amount paid or received, in `currency`
    pub cost: Decimal,
    /// Quantity of `product`
    pub amount: Decimal,
    /// Price per unit of `product`, in `currency`
    pub price: Decimal,
    /// Settlement currency
    pub currency: String,
}

impl RawOrder {
    /// Check the required fields of an ingested order
    pub fn validated(self) -> Result<Self, OrderError> {
        if self.product.trim().is_empty() {
            return Err(OrderError::MissingField("product"));
        }
        if self.currency.trim().is_empty() {
            return Err(OrderError::MissingField("settlement currency"));
        }
        if self.amount <= Decimal::ZERO {
            return Err(OrderError::NonPositiveAmount {
                product: self.product,
                time: self.time,
                amount: self.amount,
            });
        }
        if self.cost <= Decimal::ZERO {
            return Err(OrderError::NonPositiveCost {
                product: self.product,
                time: self.time,
                cost: self.cost,
            });
        }
        Ok(self)
    }

    pub fn is_buy(&self) -> bool {
        Side::parse(&self.side) == Some(Side::Buy)
    }
}

/// A USD settled order
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub time: DateTime<Utc>,
    pub product: String,
    pub side: Side,
    /// USD paid (buy) or received (sell)
    pub cost: Decimal,
    pub amount: Decimal,
    /// USD per unit
    pub price: Decimal,
    pub currency: String,
}

impl Order {
    pub fn usd(
        time: DateTime<Utc>,
        product: &str,
        side: Side,
        cost: Decimal,
        amount: Decimal,
        price: Decimal,
    ) -> Self {
        Order {
            time,
            product: canonical_symbol(product),
            side,
            cost,
            amount,
            price,
            currency: USD.to_string(),
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.time.date_naive()
    }

    /// USD cost of a single unit, derived from the totals rather than the quoted price
    pub fn unit_cost(&self) -> Decimal {
        if self.amount.is_zero() {
            Decimal::ZERO
        } else {
            self.cost / self.amount
        }
    }
}

/// Stable sort by order time: orders at the same instant keep their input order
pub fn sort_by_time(orders: &mut [Order]) {
    orders.sort_by_key(|o| o.time);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn raw(amount: Decimal, cost: Decimal) -> RawOrder {
        RawOrder {
            time: Utc.with_ymd_and_hms(2018, 1, 1, 0, 0, 0).unwrap(),
            product: "BTC".to_string(),
            side: "buy".to_string(),
            cost,
            amount,
            price: dec!(10000),
            currency: "USD".to_string(),
        }
    }

    #[test]
    fn side_indicators() {
        assert_eq!(Side::parse("BUY"), Some(Side::Buy));
        assert_eq!(Side::parse(" sell "), Some(Side::Sell));
        assert_eq!(Side::parse("LIMIT_SELL"), Some(Side::Sell));
        assert_eq!(Side::parse("transfer"), None);
    }

    #[test]
    fn validation_accepts_positive_amounts() {
        assert!(raw(dec!(1), dec!(10000)).validated().is_ok());
    }

    #[test]
    fn validation_rejects_zero_amount() {
        let err = raw(dec!(0), dec!(10000)).validated().unwrap_err();
        assert!(matches!(err, OrderError::NonPositiveAmount { .. }));
    }

    #[test]
    fn validation_rejects_negative_cost() {
        let err = raw(dec!(1), dec!(-5)).validated().unwrap_err();
        assert!(matches!(err, OrderError::NonPositiveCost { .. }));
    }

    #[test]
    fn validation_rejects_missing_currency() {
        let mut order = raw(dec!(1), dec!(1));
        order.currency = String::new();
        assert_eq!(
            order.validated().unwrap_err(),
            OrderError::MissingField("settlement currency")
        );
    }

    #[test]
    fn sort_is_stable_for_equal_times() {
        let t1 = Utc.with_ymd_and_hms(2018, 1, 2, 0, 0, 0).unwrap();
        let t0 = Utc.with_ymd_and_hms(2018, 1, 1, 0, 0, 0).unwrap();
        let mut orders = vec![
            Order::usd(t1, "ETH", Side::Buy, dec!(1), dec!(1), dec!(1)),
            Order::usd(t1, "BTC", Side::Buy, dec!(2), dec!(1), dec!(2)),
            Order::usd(t0, "LTC", Side::Buy, dec!(3), dec!(1), dec!(3)),
        ];
        sort_by_time(&mut orders);
        let products: Vec<_> = orders.iter().map(|o| o.product.as_str()).collect();
        assert_eq!(products, vec!["LTC", "ETH", "BTC"]);
    }

    #[test]
    fn unit_cost_uses_totals() {
        let t = Utc.with_ymd_and_hms(2018, 1, 1, 0, 0, 0).unwrap();
        let order = Order::usd(t, "BTC", Side::Buy, dec!(5000), dec!(0.5), dec!(9999));
        assert_eq!(order.unit_cost(), dec!(10000));
    }
}
