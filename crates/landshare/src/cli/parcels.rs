use crate::cli::{Context, PriceCommands};
use landshare::error::Result;
use landshare::market::TokenizeRequest;
use landshare::types::Parcel;

fn print_parcel(parcel: &Parcel, price: f64) {
    println!("🏞️  {} ({})", parcel.location, parcel.id);
    println!("   Acres: {}", parcel.acres);
    println!(
        "   Units: {} of {} available",
        parcel.available_units(),
        parcel.units
    );
    println!("   Price: {} LAND per unit", price);
    if !parcel.metadata_uri.is_empty() {
        println!("   Metadata: {}", parcel.metadata_uri);
    }
    println!("   Created: {}", parcel.created_at);
}

pub async fn handle_parcels_command(ctx: &Context, refresh: bool) -> Result<()> {
    let parcels = if refresh {
        ctx.store.refresh_parcels().await
    } else {
        ctx.store.get_parcels().await
    };

    if parcels.is_empty() {
        println!("📭 No parcels have been tokenized yet");
        return Ok(());
    }

    println!("📋 {} tokenized parcels", parcels.len());
    println!();
    for parcel in parcels.iter() {
        let price = ctx
            .store
            .price_or_default(&parcel.id, ctx.config.default_price)
            .await;
        print_parcel(parcel, price);
        println!();
    }
    Ok(())
}

pub async fn handle_tokenize_command(
    ctx: &Context,
    location: String,
    acres: f64,
    units: u64,
    price: Option<f64>,
) -> Result<()> {
    let market = ctx.admin_marketplace();
    let parcel = market
        .tokenize_parcel(TokenizeRequest {
            location,
            acres,
            units,
            price_per_unit: price,
        })
        .await?;

    println!("✅ Land tokenized successfully");
    println!();
    let price = ctx
        .store
        .price_or_default(&parcel.id, ctx.config.default_price)
        .await;
    print_parcel(&parcel, price);
    if !parcel.ipfs_hash.is_empty() {
        println!("   IPFS Hash: {}", parcel.ipfs_hash);
    }
    Ok(())
}

pub async fn handle_remove_parcel_command(ctx: &Context, parcel_id: String) -> Result<()> {
    ctx.admin_marketplace().remove_parcel(&parcel_id).await?;
    println!("🗑️  Parcel {} removed", parcel_id);
    Ok(())
}

pub async fn handle_price_command(ctx: &Context, command: PriceCommands) -> Result<()> {
    match command {
        PriceCommands::Get { parcel_id: Some(parcel_id) } => {
            let prices = ctx.store.get_prices().await;
            match prices.get(&parcel_id) {
                Some(entry) => {
                    println!("💲 {} LAND per unit", entry.current_price);
                    println!("   Last updated: {}", entry.last_updated);
                }
                None => println!(
                    "💲 {} LAND per unit (default, no price set)",
                    ctx.config.default_price
                ),
            }
        }
        PriceCommands::Get { parcel_id: None } => {
            let prices = ctx.store.get_prices().await;
            if prices.is_empty() {
                println!("📭 No prices have been set");
            }
            for (parcel_id, entry) in prices.iter() {
                println!(
                    "💲 {}: {} LAND per unit (updated {})",
                    parcel_id, entry.current_price, entry.last_updated
                );
            }
        }
        PriceCommands::Set { parcel_id, price } => {
            ctx.admin_marketplace().set_price(&parcel_id, price).await?;
            println!("✅ Price of {} set to {} LAND per unit", parcel_id, price);
        }
    }
    Ok(())
}

pub fn handle_fee_command(ctx: &Context, value: Option<String>) -> Result<()> {
    match value {
        Some(value) => {
            ctx.admin_marketplace().set_platform_fee(&value)?;
            println!("✅ Platform fee set to {}%", value.trim());
        }
        None => {
            let fee = ctx.store.platform_fee();
            if fee.is_empty() {
                println!("📭 No platform fee has been set");
            } else {
                println!("💼 Platform fee: {}%", fee);
            }
        }
    }
    Ok(())
}
