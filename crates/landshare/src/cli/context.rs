use std::path::PathBuf;
use std::sync::Arc;
use storage::PinataConfig;
use tracing::info;

use landshare::config::LandshareConfig;
use landshare::error::Result;
use landshare::market::Marketplace;
use landshare::mirror::PinataMirror;
use landshare::settlement::{PaperLedger, Settlement};
use landshare::store::Store;

/// Configuration and store shared by every command
pub struct Context {
    pub config: LandshareConfig,
    pub pinata: PinataConfig,
    pub store: Arc<Store>,
}

impl Context {
    pub fn open(data_dir: Option<PathBuf>, offline: bool) -> Result<Self> {
        let mut config = LandshareConfig::from_env();
        if let Some(data_dir) = data_dir {
            config = config.with_data_dir(data_dir);
        }

        let pinata = PinataConfig::from_env();
        let remote = if offline {
            info!("Offline mode, the Pinata mirror is not used");
            None
        } else {
            PinataMirror::from_config(pinata.clone())?
        };

        let store = Arc::new(Store::open(&config, remote)?);
        Ok(Self {
            config,
            pinata,
            store,
        })
    }

    pub fn marketplace(&self, settlement: Arc<dyn Settlement>) -> Marketplace {
        Marketplace::new(
            self.store.clone(),
            settlement,
            &self.config.treasury_address,
            self.config.default_price,
        )
    }

    /// Marketplace for commands that never move tokens
    pub fn admin_marketplace(&self) -> Marketplace {
        self.marketplace(Arc::new(PaperLedger::new()))
    }

    /// Wait for background publishes to the mirror
    pub async fn finish(&self) {
        self.store.flush().await;
    }
}
