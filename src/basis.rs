//! Cost basis matching of sells against prior buys

use crate::orders::Order;
use chrono::{Datelike, Months, NaiveDate};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::cmp::Reverse;
use std::fmt;

/// Selection order of candidate buy lots when more than one could cover a sell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BasisPolicy {
    /// Highest cost per unit first, minimising the realized gain
    #[default]
    Highest,
    /// Earliest acquisition first
    Fifo,
    /// Latest acquisition first
    Lifo,
}

impl fmt::Display for BasisPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BasisPolicy::Highest => write!(f, "highest cost"),
            BasisPolicy::Fifo => write!(f, "FIFO"),
            BasisPolicy::Lifo => write!(f, "LIFO"),
        }
    }
}

/// Holding period classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Term {
    /// Held one year or less
    Short,
    /// Held more than one year
    Long,
}

impl Term {
    /// Lots with no known acquisition date are treated as short term
    pub fn classify(acquired: Option<NaiveDate>, disposed: NaiveDate) -> Term {
        let Some(acquired) = acquired else {
            return Term::Short;
        };
        match acquired.checked_add_months(Months::new(12)) {
            Some(anniversary) if disposed > anniversary => Term::Long,
            _ => Term::Short,
        }
    }

    pub fn display(&self) -> &'static str {
        match self {
            Term::Short => "Short-term",
            Term::Long => "Long-term",
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// A slice of a sell covered by a single buy lot
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedLot {
    pub product: String,
    pub quantity: Decimal,
    /// `None` when no buy lot was available to cover the quantity
    pub acquired: Option<NaiveDate>,
    pub disposed: NaiveDate,
    pub proceeds: Decimal,
    pub basis: Decimal,
}

impl MatchedLot {
    pub fn gain(&self) -> Decimal {
        self.proceeds - self.basis
    }

    pub fn term(&self) -> Term {
        Term::classify(self.acquired, self.disposed)
    }
}

/// Problems found while matching, reported rather than aborting the run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// The buy lots could not cover a sell; the uncovered quantity has zero basis
    InsufficientCostBasis {
        product: String,
        disposed: NaiveDate,
        available: Decimal,
        uncovered: Decimal,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::InsufficientCostBasis {
                product,
                disposed,
                available,
                uncovered,
            } => write!(
                f,
                "sell of {} {} on {} only had {} covered by prior buys, the remaining {} has zero cost basis",
                available + uncovered,
                product,
                disposed,
                available,
                uncovered
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    pub proceeds: Decimal,
    pub basis: Decimal,
    pub gain: Decimal,
}

/// Matched lots for the sells of a single tax year
#[derive(Debug, Clone)]
pub struct BasisReport {
    pub year: i32,
    pub policy: BasisPolicy,
    pub lots: Vec<MatchedLot>,
    pub warnings: Vec<Warning>,
}

impl BasisReport {
    pub fn lots_for(&self, term: Term) -> impl Iterator<Item = &MatchedLot> {
        self.lots.iter().filter(move |lot| lot.term() == term)
    }

    /// Totals, optionally restricted to one holding term
    pub fn totals(&self, term: Option<Term>) -> Totals {
        self.lots
            .iter()
            .filter(|lot| term.map_or(true, |t| lot.term() == t))
            .fold(Totals::default(), |acc, lot| Totals {
                proceeds: acc.proceeds + lot.proceeds,
                basis: acc.basis + lot.basis,
                gain: acc.gain + lot.gain(),
            })
    }
}

/// An unconsumed portion of a buy order
struct BuyLot<'a> {
    order: &'a Order,
    remaining: Decimal,
    remaining_cost: Decimal,
}

impl BuyLot<'_> {
    /// Take up to `quantity` from the lot, returning the quantity and basis taken
    fn take(&mut self, quantity: Decimal) -> (Decimal, Decimal) {
        if quantity >= self.remaining {
            let taken = (self.remaining, self.remaining_cost);
            self.remaining = Decimal::ZERO;
            self.remaining_cost = Decimal::ZERO;
            taken
        } else {
            let cost = self.order.cost * quantity / self.order.amount;
            self.remaining -= quantity;
            self.remaining_cost -= cost;
            (quantity, cost)
        }
    }
}

/// Match sells against prior buys, producing lots for the sells in `tax_year`.
///
/// Sells are replayed in time order from the first sell so that buy lots
/// consumed in earlier years are not matched again. A buy can only cover a
/// sell of the same product at or after the buy's time. Quantity that no buy
/// covers is reported as a zero basis lot with an `InsufficientCostBasis`
/// warning.
pub fn cost_basis(sells: &[Order], buys: &[Order], policy: BasisPolicy, tax_year: i32) -> BasisReport {
    let mut lots: Vec<BuyLot> = buys
        .iter()
        .filter(|b| b.date().year() <= tax_year)
        .map(|order| BuyLot {
            order,
            remaining: order.amount,
            remaining_cost: order.cost,
        })
        .collect();

    let mut sells: Vec<&Order> = sells
        .iter()
        .filter(|s| s.date().year() <= tax_year)
        .collect();
    sells.sort_by_key(|s| s.time);

    let mut report = BasisReport {
        year: tax_year,
        policy,
        lots: Vec::new(),
        warnings: Vec::new(),
    };

    for sell in sells {
        let in_year = sell.date().year() == tax_year;
        let mut candidates: Vec<usize> = lots
            .iter()
            .enumerate()
            .filter(|(_, lot)| {
                lot.order.product == sell.product
                    && lot.order.time <= sell.time
                    && lot.remaining > Decimal::ZERO
            })
            .map(|(idx, _)| idx)
            .collect();
        sort_candidates(&mut candidates, &lots, policy);

        let mut to_match = sell.amount;
        let mut proceeds_left = sell.cost;
        for idx in candidates {
            if to_match <= Decimal::ZERO {
                break;
            }
            let lot = &mut lots[idx];
            let (quantity, basis) = lot.take(to_match);
            to_match -= quantity;
            let proceeds = if to_match.is_zero() {
                proceeds_left
            } else {
                sell.cost * quantity / sell.amount
            };
            proceeds_left -= proceeds;

            log::debug!(
                "Matched {} {} sold {} against buy of {} at {} (basis {})",
                quantity,
                sell.product,
                sell.date(),
                lot.order.date(),
                lot.order.unit_cost(),
                basis
            );

            if in_year {
                report.lots.push(MatchedLot {
                    product: sell.product.clone(),
                    quantity,
                    acquired: Some(lot.order.date()),
                    disposed: sell.date(),
                    proceeds,
                    basis,
                });
            }
        }

        if to_match > Decimal::ZERO {
            let warning = Warning::InsufficientCostBasis {
                product: sell.product.clone(),
                disposed: sell.date(),
                available: sell.amount - to_match,
                uncovered: to_match,
            };
            log::warn!("{}", warning);
            if in_year {
                report.lots.push(MatchedLot {
                    product: sell.product.clone(),
                    quantity: to_match,
                    acquired: None,
                    disposed: sell.date(),
                    proceeds: proceeds_left,
                    basis: Decimal::ZERO,
                });
                report.warnings.push(warning);
            }
        }
    }

    log::info!(
        "Matched {} lots for {} using {} basis, gain {}, {} warnings",
        report.lots.len(),
        tax_year,
        policy,
        report.totals(None).gain,
        report.warnings.len()
    );
    report
}

fn sort_candidates(candidates: &mut [usize], lots: &[BuyLot], policy: BasisPolicy) {
    match policy {
        BasisPolicy::Highest => candidates.sort_by(|a, b| {
            let (a, b) = (lots[*a].order, lots[*b].order);
            b.unit_cost()
                .cmp(&a.unit_cost())
                .then_with(|| a.time.cmp(&b.time))
        }),
        BasisPolicy::Fifo => candidates.sort_by_key(|idx| lots[*idx].order.time),
        BasisPolicy::Lifo => candidates.sort_by_key(|idx| Reverse(lots[*idx].order.time)),
    }
}
