mod cli;

use clap::Parser;
use dotenvy::dotenv;
use landshare::error::Result;

use crate::cli::{Cli, Commands, Context};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file from current directory
    dotenv().ok();

    monitoring::init_logging()?;

    let cli = Cli::parse();
    let ctx = Context::open(cli.data_dir, cli.offline)?;

    let result = match cli.command {
        Commands::Parcels { refresh } => cli::parcels::handle_parcels_command(&ctx, refresh).await,

        Commands::Tokenize {
            location,
            acres,
            units,
            price,
        } => cli::parcels::handle_tokenize_command(&ctx, location, acres, units, price).await,

        Commands::RemoveParcel { parcel_id } => {
            cli::parcels::handle_remove_parcel_command(&ctx, parcel_id).await
        }

        Commands::Price { command } => cli::parcels::handle_price_command(&ctx, command).await,

        Commands::Fee { value } => cli::parcels::handle_fee_command(&ctx, value),

        Commands::Buy {
            buyer,
            parcel_id,
            units,
            balance,
            tx_hash,
        } => cli::trade::handle_buy_command(&ctx, buyer, parcel_id, units, balance, tx_hash).await,

        Commands::BuyOrder {
            buyer,
            order_id,
            units,
            balance,
            tx_hash,
        } => {
            cli::trade::handle_buy_order_command(&ctx, buyer, order_id, units, balance, tx_hash)
                .await
        }

        Commands::List {
            seller,
            parcel_id,
            units,
            price,
        } => cli::trade::handle_list_command(&ctx, seller, parcel_id, units, price).await,

        Commands::Cancel { owner, order_id } => {
            cli::trade::handle_cancel_command(&ctx, owner, order_id).await
        }

        Commands::Orders { address, mine } => {
            cli::trade::handle_orders_command(&ctx, address, mine).await
        }

        Commands::Trades { address } => cli::trade::handle_trades_command(&ctx, address).await,

        Commands::Portfolio { address } => {
            cli::trade::handle_portfolio_command(&ctx, address).await
        }

        Commands::Refresh => cli::sync::handle_refresh_command(&ctx).await,

        Commands::Metadata { hash, contract } => {
            cli::metadata::handle_metadata_command(&ctx, hash, contract).await
        }

        Commands::Watch => cli::sync::handle_watch_command(&ctx).await,
    };

    // Local writes are already durable; let the mirror catch up before exiting
    ctx.finish().await;

    if let Err(e) = &result {
        if e.is_precondition() {
            eprintln!("❌ {}", e);
            std::process::exit(2);
        }
    }
    result
}
