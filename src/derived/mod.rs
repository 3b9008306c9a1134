//! Values computed from stored item fields, never persisted.
//!
//! Filtering, sorting and the API payloads all go through these functions so
//! a number shown to the user is the same number a filter or sort acted on.
//! Every function is total: when a precondition does not hold the result is
//! `None`, never a panic.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::ItemRecord;

/// Trading post listing fee plus exchange fee, charged to the seller.
pub fn sell_tax_rate() -> Decimal {
    Decimal::new(15, 2)
}

/// Fee charged on top of a buy order.
pub fn buy_tax_rate() -> Decimal {
    Decimal::new(5, 2)
}

fn positive(value: Option<Decimal>) -> Option<Decimal> {
    value.filter(|v| *v > Decimal::ZERO)
}

// Decimal operators panic on overflow; the checked forms map it to `None`.
fn sum(a: Option<Decimal>, b: Option<Decimal>) -> Option<Decimal> {
    a?.checked_add(b?)
}

fn diff(a: Option<Decimal>, b: Option<Decimal>) -> Option<Decimal> {
    a?.checked_sub(b?)
}

// ---------------------------------------------------------------------------
// Flip economics
// ---------------------------------------------------------------------------

/// Cost of filling a buy order at `buy_price`, fee included.
pub fn buy_cost(item: &ItemRecord) -> Option<Decimal> {
    positive(item.buy_price)?.checked_mul(Decimal::ONE + buy_tax_rate())
}

/// `sell_price * 0.85 - buy_price * 1.05`, only when both prices are positive.
pub fn profit(item: &ItemRecord) -> Option<Decimal> {
    let sell = positive(item.sell_price)?;
    let cost = buy_cost(item)?;
    sell.checked_mul(Decimal::ONE - sell_tax_rate())?.checked_sub(cost)
}

/// Profit as a percentage of the fee-inclusive buy cost.
pub fn roi(item: &ItemRecord) -> Option<Decimal> {
    let profit = profit(item)?;
    let cost = buy_cost(item)?;
    profit.checked_div(cost)?.checked_mul(Decimal::ONE_HUNDRED)
}

pub fn sell_tax(item: &ItemRecord) -> Option<Decimal> {
    positive(item.sell_price)?.checked_mul(sell_tax_rate())
}

pub fn buy_tax(item: &ItemRecord) -> Option<Decimal> {
    item.buy_price?.checked_mul(buy_tax_rate())
}

/// Sell tax plus buy tax; just the buy tax when there is no sell price.
pub fn total_tax(item: &ItemRecord) -> Option<Decimal> {
    match sell_tax(item) {
        Some(sell) => sell.checked_add(buy_tax(item)?),
        None => buy_tax(item),
    }
}

// ---------------------------------------------------------------------------
// 1-day totals (buy side + sell side)
// ---------------------------------------------------------------------------

pub fn total_sold(item: &ItemRecord) -> Option<Decimal> {
    sum(item.one_d_buy_sold, item.one_d_sell_sold)
}

pub fn total_value(item: &ItemRecord) -> Option<Decimal> {
    sum(item.one_d_buy_value, item.one_d_sell_value)
}

pub fn total_listed(item: &ItemRecord) -> Option<Decimal> {
    sum(item.one_d_buy_listed, item.one_d_sell_listed)
}

pub fn total_delisted(item: &ItemRecord) -> Option<Decimal> {
    sum(item.one_d_buy_delisted, item.one_d_sell_delisted)
}

pub fn total_delisted_value(item: &ItemRecord) -> Option<Decimal> {
    item.one_d_sell_delisted_value
}

// ---------------------------------------------------------------------------
// Day-over-day change: 1-day window minus 2-day window
// ---------------------------------------------------------------------------

pub fn buy_sold_change(item: &ItemRecord) -> Option<Decimal> {
    diff(item.one_d_buy_sold, item.two_d_buy_sold)
}

pub fn sell_sold_change(item: &ItemRecord) -> Option<Decimal> {
    diff(item.one_d_sell_sold, item.two_d_sell_sold)
}

pub fn total_sold_change(item: &ItemRecord) -> Option<Decimal> {
    sum(buy_sold_change(item), sell_sold_change(item))
}

pub fn buy_value_change(item: &ItemRecord) -> Option<Decimal> {
    diff(item.one_d_buy_value, item.two_d_buy_value)
}

pub fn sell_value_change(item: &ItemRecord) -> Option<Decimal> {
    diff(item.one_d_sell_value, item.two_d_sell_value)
}

pub fn total_value_change(item: &ItemRecord) -> Option<Decimal> {
    sum(buy_value_change(item), sell_value_change(item))
}

pub fn buy_listed_change(item: &ItemRecord) -> Option<Decimal> {
    diff(item.one_d_buy_listed, item.two_d_buy_listed)
}

pub fn sell_listed_change(item: &ItemRecord) -> Option<Decimal> {
    diff(item.one_d_sell_listed, item.two_d_sell_listed)
}

pub fn total_listed_change(item: &ItemRecord) -> Option<Decimal> {
    sum(buy_listed_change(item), sell_listed_change(item))
}

pub fn buy_delisted_change(item: &ItemRecord) -> Option<Decimal> {
    diff(item.one_d_buy_delisted, item.two_d_buy_delisted)
}

pub fn sell_delisted_change(item: &ItemRecord) -> Option<Decimal> {
    diff(item.one_d_sell_delisted, item.two_d_sell_delisted)
}

pub fn total_delisted_change(item: &ItemRecord) -> Option<Decimal> {
    sum(buy_delisted_change(item), sell_delisted_change(item))
}

// ---------------------------------------------------------------------------
// Materialized view
// ---------------------------------------------------------------------------

/// All derived values of one item, for API payloads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedFields {
    pub profit: Option<Decimal>,
    pub roi: Option<Decimal>,
    pub sell_tax: Option<Decimal>,
    pub buy_tax: Option<Decimal>,
    pub total_tax: Option<Decimal>,
    pub total_sold: Option<Decimal>,
    pub total_value: Option<Decimal>,
    pub total_listed: Option<Decimal>,
    pub total_delisted: Option<Decimal>,
    pub total_delisted_value: Option<Decimal>,
    pub buy_sold_change: Option<Decimal>,
    pub sell_sold_change: Option<Decimal>,
    pub total_sold_change: Option<Decimal>,
    pub buy_value_change: Option<Decimal>,
    pub sell_value_change: Option<Decimal>,
    pub total_value_change: Option<Decimal>,
    pub buy_listed_change: Option<Decimal>,
    pub sell_listed_change: Option<Decimal>,
    pub total_listed_change: Option<Decimal>,
    pub buy_delisted_change: Option<Decimal>,
    pub sell_delisted_change: Option<Decimal>,
    pub total_delisted_change: Option<Decimal>,
}

impl DerivedFields {
    pub fn compute(item: &ItemRecord) -> Self {
        Self {
            profit: profit(item),
            roi: roi(item),
            sell_tax: sell_tax(item),
            buy_tax: buy_tax(item),
            total_tax: total_tax(item),
            total_sold: total_sold(item),
            total_value: total_value(item),
            total_listed: total_listed(item),
            total_delisted: total_delisted(item),
            total_delisted_value: total_delisted_value(item),
            buy_sold_change: buy_sold_change(item),
            sell_sold_change: sell_sold_change(item),
            total_sold_change: total_sold_change(item),
            buy_value_change: buy_value_change(item),
            sell_value_change: sell_value_change(item),
            total_value_change: total_value_change(item),
            buy_listed_change: buy_listed_change(item),
            sell_listed_change: sell_listed_change(item),
            total_listed_change: total_listed_change(item),
            buy_delisted_change: buy_delisted_change(item),
            sell_delisted_change: sell_delisted_change(item),
            total_delisted_change: total_delisted_change(item),
        }
    }
}

/// A stored record with its derived fields flattened alongside, the shape
/// every item-returning endpoint serializes.
#[derive(Debug, Clone, Serialize)]
pub struct ItemView<'a> {
    #[serde(flatten)]
    pub record: &'a ItemRecord,
    #[serde(flatten)]
    pub derived: DerivedFields,
}

impl<'a> ItemView<'a> {
    pub fn new(record: &'a ItemRecord) -> Self {
        Self {
            record,
            derived: DerivedFields::compute(record),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
