//! Conversion of coin-to-coin orders into USD settled orders

use crate::assets::{canonical_symbol, is_fiat, pair, USD};
use crate::orders::{Order, RawOrder, Side};
use crate::prices::{PriceError, PriceSource};
use rust_decimal::Decimal;

#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("cannot value {product} order settled in {currency}")]
    MissingPrice {
        product: String,
        currency: String,
        #[source]
        source: PriceError,
    },
    #[error("cannot value {product} order settled in {currency} at a {currency}-USD price of {price}")]
    NonPositivePrice {
        product: String,
        currency: String,
        price: Decimal,
    },
    #[error("{product} order settled in {currency}: only USD is supported as a fiat cost basis")]
    UnsupportedFiat { product: String, currency: String },
}

/// Normalized orders, all USD settled
#[derive(Debug, Default)]
pub struct Normalized {
    pub buys: Vec<Order>,
    pub sells: Vec<Order>,
    /// Orders dropped because their buy/sell indicator was not recognised
    pub dropped: usize,
}

/// Convert an exchange's orders to USD settled buys and sells.
///
/// Orders settled in another crypto asset (e.g. BTC) are split into two: the
/// traded asset at its USD value, and the opposite side of the settlement
/// asset, valued with the settlement asset's USD price at the time of the order.
/// Orders are classified by their own buy/sell indicator, not by which input
/// list they arrive in.
pub fn normalize<P>(
    prices: &P,
    buys: Vec<RawOrder>,
    sells: Vec<RawOrder>,
) -> Result<Normalized, NormalizeError>
where
    P: PriceSource + ?Sized,
{
    let mut normalized = Normalized::default();
    for order in buys.into_iter().chain(sells) {
        normalized.push(prices, order)?;
    }
    Ok(normalized)
}

impl Normalized {
    fn push<P>(&mut self, prices: &P, order: RawOrder) -> Result<(), NormalizeError>
    where
        P: PriceSource + ?Sized,
    {
        let side = match Side::parse(&order.side) {
            Some(side) => side,
            None => {
                log::warn!(
                    "Dropping {} order at {} with unknown buy/sell type '{}'",
                    order.product,
                    order.time,
                    order.side
                );
                self.dropped += 1;
                return Ok(());
            }
        };

        let product = canonical_symbol(&order.product);
        let currency = canonical_symbol(&order.currency);

        if currency == USD {
            let order = Order::usd(
                order.time,
                &product,
                side,
                order.cost,
                order.amount,
                order.price,
            );
            self.add(order);
            return Ok(());
        }

        if is_fiat(&currency) {
            return Err(NormalizeError::UnsupportedFiat { product, currency });
        }

        let quote_usd = prices
            .price(order.time, &pair(&currency, USD))
            .map_err(|source| NormalizeError::MissingPrice {
                product: product.clone(),
                currency: currency.clone(),
                source,
            })?;
        if quote_usd <= Decimal::ZERO {
            return Err(NormalizeError::NonPositivePrice {
                product,
                currency,
                price: quote_usd,
            });
        }
        let cost_usd = order.cost * quote_usd;
        let unit_price_usd = cost_usd / order.amount;

        log::debug!(
            "Converting {} {} {} for {} {} to {} USD at {} {}-USD",
            side,
            order.amount,
            product,
            order.cost,
            currency,
            cost_usd,
            quote_usd,
            currency
        );

        let traded = Order::usd(
            order.time,
            &product,
            side,
            cost_usd,
            order.amount,
            unit_price_usd,
        );
        let settlement_side = match side {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        };
        let settlement = Order::usd(
            order.time,
            &currency,
            settlement_side,
            cost_usd,
            order.cost,
            quote_usd,
        );
        self.add(traded);
        self.add(settlement);
        Ok(())
    }

    fn add(&mut self, order: Order) {
        match order.side {
            Side::Buy => self.buys.push(order),
            Side::Sell => self.sells.push(order),
        }
    }
}
