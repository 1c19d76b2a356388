use serde::Serialize;
use serde_json::Value;
use storage::PinataClient;

use crate::cli::Context;
use landshare::constants::{FRACTIONALIZATION_ADDRESS, LAND_TOKEN_ADDRESS};
use landshare::error::{LandshareError, Result};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MetadataLookup {
    success: bool,
    metadata: Value,
    ipfs_url: String,
}

/// Accepts `land` and `fractionalization` for the known contracts
fn resolve_contract(contract: Option<String>) -> String {
    match contract.as_deref().map(str::to_lowercase).as_deref() {
        None | Some("land") => LAND_TOKEN_ADDRESS.to_string(),
        Some("fractionalization") => FRACTIONALIZATION_ADDRESS.to_string(),
        Some(_) => contract.unwrap_or_default(),
    }
}

/// Pinned metadata by content hash, or the newest pin tagged with a contract address
pub async fn lookup_metadata(
    client: &PinataClient,
    hash: Option<String>,
    contract: Option<String>,
) -> Result<(String, Value)> {
    let hash = match hash {
        Some(hash) => hash,
        None => {
            let contract = resolve_contract(contract);
            client
                .find_pin_by_contract_address(&contract)
                .await?
                .ok_or_else(|| {
                    LandshareError::Storage(format!("No metadata found for contract {}", contract))
                })?
        }
    };

    let metadata = client.fetch_json(&hash).await?;
    Ok((client.gateway_url(&hash), metadata))
}

pub async fn handle_metadata_command(
    ctx: &Context,
    hash: Option<String>,
    contract: Option<String>,
) -> Result<()> {
    let client = PinataClient::new(ctx.pinata.clone())?;
    let (ipfs_url, metadata) = lookup_metadata(&client, hash, contract).await?;

    let output = MetadataLookup {
        success: true,
        metadata,
        ipfs_url,
    };
    let rendered = serde_json::to_string_pretty(&output)
        .map_err(|e| LandshareError::Other(e.into()))?;
    println!("{}", rendered);
    Ok(())
}
