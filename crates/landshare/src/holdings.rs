//! Unit holdings and portfolio figures derived from the trade history
//!
//! Holdings are never stored. A buyer gains the traded units and a seller
//! loses them; an open listing already counts against its seller.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::types::{Parcel, PriceBook, Side, Trade};

/// Net units of each parcel held by `address`
pub fn holdings(trades: &[Trade], address: &str) -> BTreeMap<String, i64> {
    let mut units: BTreeMap<String, i64> = BTreeMap::new();
    for trade in trades {
        let delta = trade.holding_delta(address);
        if delta != 0 {
            *units.entry(trade.parcel_id.clone()).or_default() += delta;
        }
    }
    units
}

pub fn owned_units(trades: &[Trade], address: &str, parcel_id: &str) -> i64 {
    trades
        .iter()
        .filter(|t| t.parcel_id == parcel_id)
        .map(|t| t.holding_delta(address))
        .sum()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    pub total_invested: f64,
    pub portfolio_value: f64,
    pub land_parcels: usize,
    pub total_return_pct: f64,
}

/// One parcel the address holds units of
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Investment {
    pub parcel_id: String,
    pub location: String,
    pub units: i64,
    pub avg_buy_price: f64,
    pub invested: f64,
    pub current_value: f64,
    pub return_pct: f64,
    pub trades: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Portfolio {
    pub summary: PortfolioSummary,
    pub investments: Vec<Investment>,
}

fn return_pct(value: f64, invested: f64) -> f64 {
    if invested > 0.0 {
        (value - invested) / invested * 100.0
    } else {
        0.0
    }
}

/// Money spent buying minus money received selling
fn net_invested<'a>(trades: impl Iterator<Item = &'a Trade>, address: &str) -> f64 {
    trades.fold(0.0, |acc, trade| {
        let mut acc = acc;
        if trade.is_buyer(address) {
            acc += trade.total;
        }
        if trade.is_seller(address) && !trade.is_listing() {
            acc -= trade.total;
        }
        acc
    })
}

/// Build the portfolio of `address`. Prices missing from `prices` use `default_price`.
pub fn portfolio(
    trades: &[Trade],
    parcels: &[Parcel],
    prices: &PriceBook,
    address: &str,
    default_price: f64,
) -> Portfolio {
    let price_of = |parcel_id: &str| {
        prices
            .get(parcel_id)
            .map(|entry| entry.current_price)
            .unwrap_or(default_price)
    };

    let held = holdings(trades, address);

    let mut investments = Vec::new();
    for (parcel_id, &units) in &held {
        if units <= 0 {
            continue;
        }
        let Some(parcel) = parcels.iter().find(|p| &p.id == parcel_id) else {
            continue;
        };

        let parcel_trades: Vec<&Trade> = trades
            .iter()
            .filter(|t| &t.parcel_id == parcel_id && t.involves(address))
            .collect();
        let buy_prices: Vec<f64> = parcel_trades
            .iter()
            .filter(|t| t.is_buyer(address) && t.side == Side::Buy)
            .map(|t| t.price_per_unit)
            .collect();
        let avg_buy_price = if buy_prices.is_empty() {
            0.0
        } else {
            buy_prices.iter().sum::<f64>() / buy_prices.len() as f64
        };

        let invested = units as f64 * avg_buy_price;
        let current_value = units as f64 * price_of(parcel_id);

        investments.push(Investment {
            parcel_id: parcel_id.clone(),
            location: parcel.location.clone(),
            units,
            avg_buy_price,
            invested,
            current_value,
            return_pct: return_pct(current_value, invested),
            trades: parcel_trades.len(),
        });
    }

    let total_invested = net_invested(trades.iter(), address);
    let portfolio_value: f64 = held
        .iter()
        .filter(|(_, units)| **units > 0)
        .map(|(parcel_id, units)| *units as f64 * price_of(parcel_id))
        .sum();

    Portfolio {
        summary: PortfolioSummary {
            total_invested,
            portfolio_value,
            land_parcels: held.values().filter(|units| **units > 0).count(),
            total_return_pct: return_pct(portfolio_value, total_invested),
        },
        investments,
    }
}
