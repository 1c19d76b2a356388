use std::sync::Arc;

use crate::cli::Context;
use landshare::error::Result;
use landshare::market::SellOrder;
use landshare::settlement::RecordedSettlement;
use landshare::types::Trade;

fn print_trade(trade: &Trade) {
    match trade.buyer() {
        Some(buyer) => {
            println!("🔁 Trade {} on parcel {}", trade.id, trade.parcel_id);
            println!("   Buyer: {}", buyer);
        }
        None => println!("📋 Listing {} on parcel {}", trade.id, trade.parcel_id),
    }
    println!("   Seller: {}", trade.seller);
    println!(
        "   Units: {} at {} LAND ({} total, {})",
        trade.units, trade.price_per_unit, trade.total, trade.side
    );
    if let Some(tx_hash) = trade.tx_hash().filter(|hash| !hash.is_empty()) {
        println!("   Tx: {}", tx_hash);
    }
    println!("   Time: {}", trade.timestamp);
}

fn print_order(order: &SellOrder) {
    println!(
        "📋 Order {} for {} ({})",
        order.order.id, order.location, order.order.parcel_id
    );
    if let Some(acres) = order.acres {
        println!("   Acres: {}", acres);
    }
    println!("   Seller: {}", order.order.seller);
    println!(
        "   Units: {} at {} LAND per unit",
        order.order.units, order.order.price_per_unit
    );
}

pub async fn handle_buy_command(
    ctx: &Context,
    buyer: String,
    parcel_id: String,
    units: u64,
    balance: f64,
    tx_hash: String,
) -> Result<()> {
    let market = ctx.marketplace(Arc::new(RecordedSettlement::new(balance, tx_hash)));
    let trade = market.buy_parcel(&buyer, &parcel_id, units).await?;

    println!("✅ Purchase recorded");
    println!();
    print_trade(&trade);
    Ok(())
}

pub async fn handle_buy_order_command(
    ctx: &Context,
    buyer: String,
    order_id: String,
    units: u64,
    balance: f64,
    tx_hash: String,
) -> Result<()> {
    let market = ctx.marketplace(Arc::new(RecordedSettlement::new(balance, tx_hash)));
    let trade = market.buy_from_order(&buyer, &order_id, units).await?;

    println!("✅ Purchase from order {} recorded", order_id);
    println!();
    print_trade(&trade);
    Ok(())
}

pub async fn handle_list_command(
    ctx: &Context,
    seller: String,
    parcel_id: String,
    units: u64,
    price: f64,
) -> Result<()> {
    let listing = ctx
        .admin_marketplace()
        .list_for_sale(&seller, &parcel_id, units, price)
        .await?;

    println!("✅ Sell order created");
    println!();
    print_trade(&listing);
    Ok(())
}

pub async fn handle_cancel_command(ctx: &Context, owner: String, order_id: String) -> Result<()> {
    ctx.admin_marketplace()
        .cancel_order(&owner, &order_id)
        .await?;
    println!("🗑️  Order {} cancelled", order_id);
    Ok(())
}

pub async fn handle_orders_command(ctx: &Context, address: Option<String>, mine: bool) -> Result<()> {
    let market = ctx.admin_marketplace();
    let address = address.unwrap_or_default();
    let orders = if mine {
        market.user_sell_orders(&address).await
    } else {
        market.available_sell_orders(&address).await
    };

    if orders.is_empty() {
        println!("📭 No open sell orders");
        return Ok(());
    }
    for order in &orders {
        print_order(order);
        println!();
    }
    Ok(())
}

pub async fn handle_trades_command(ctx: &Context, address: Option<String>) -> Result<()> {
    let trades = match address {
        Some(address) => ctx.store.user_trades(&address).await,
        None => ctx.store.get_trades().await.to_vec(),
    };

    if trades.is_empty() {
        println!("📭 No trades recorded");
        return Ok(());
    }
    for trade in &trades {
        print_trade(trade);
        println!();
    }
    Ok(())
}

pub async fn handle_portfolio_command(ctx: &Context, address: String) -> Result<()> {
    let portfolio = ctx.admin_marketplace().portfolio(&address).await;
    let summary = &portfolio.summary;

    println!("📊 Portfolio of {}", address);
    println!("   Total invested: {:.2} LAND", summary.total_invested);
    println!("   Portfolio value: {:.2} LAND", summary.portfolio_value);
    println!("   Land parcels: {}", summary.land_parcels);
    println!("   Total return: {:.2}%", summary.total_return_pct);

    for investment in &portfolio.investments {
        println!();
        println!("🏞️  {} ({})", investment.location, investment.parcel_id);
        println!("   Units: {}", investment.units);
        println!("   Average buy price: {:.2} LAND", investment.avg_buy_price);
        println!("   Invested: {:.2} LAND", investment.invested);
        println!("   Current value: {:.2} LAND", investment.current_value);
        println!("   Return: {:.2}%", investment.return_pct);
        println!("   Trades: {}", investment.trades);
    }
    Ok(())
}
