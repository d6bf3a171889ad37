use std::sync::Arc;

use mongodb::Client;
use tracing::{info, warn};

use crate::config::{AppConfig, StoreBackend};
use crate::database::memory_store::MemoryStore;
use crate::database::mongo_store::MongoStore;
use crate::database::store::MarketStore;
use crate::errors::Result;

pub async fn connect_mongo(database_url: &str, database_name: &str) -> Result<MongoStore> {
    let client = Client::with_uri_str(database_url).await?;
    let db = client.database(database_name);

    // Verify the database is reachable by listing collections
    match db.list_collection_names().await {
        Ok(collections) => {
            info!("✅ Connected to database: {}", database_name);
            info!("📂 Collections found: {:?}", collections);

            for expected in ["users", "products", "orders", "transactions"] {
                if !collections.iter().any(|c| c == expected) {
                    warn!("⚠️ '{}' collection not found, it will be created on first write", expected);
                }
            }
        }
        Err(e) => {
            warn!("❌ Database '{}' may not exist or is inaccessible: {}", database_name, e);
        }
    }

    let store = MongoStore::new(client, db);
    store.ensure_indexes().await?;
    Ok(store)
}

pub async fn open_store(config: &AppConfig) -> Result<Arc<dyn MarketStore>> {
    match config.store_backend {
        StoreBackend::Mongo => {
            let store = connect_mongo(&config.database_url, &config.database_name).await?;
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            warn!("Using the in-memory store: data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
