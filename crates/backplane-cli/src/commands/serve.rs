use std::net::SocketAddr;
use std::sync::Arc;

use backplane_auth::{ACCESS_TTL_SECONDS, AuthClient, TokenSigner};
use backplane_engine::EngineConfig;
use backplane_http::build_router;
use backplane_store::{CacheStore, MemoryKv, MemoryObjects, MemoryRecords, SessionStore};
use tracing::info;

use crate::support::{CliError, load_manifest};

/// Serve the API over in-memory backends.
pub fn run(manifest_path: &str, addr: &str, secret: &str) -> Result<(), CliError> {
    let addr: SocketAddr = addr
        .parse()
        .map_err(|_| CliError::BadAddress(addr.to_string()))?;
    let manifest = load_manifest(manifest_path)?;

    let kv = Arc::new(MemoryKv::new());
    let signer = TokenSigner::new(secret.as_bytes().to_vec(), ACCESS_TTL_SECONDS)
        .with_issuer(manifest.app_name());
    let auth = AuthClient::new(signer).with_sessions(SessionStore::new(kv.clone()));

    let engine = Arc::new(
        EngineConfig::new(manifest)
            .with_records(Arc::new(MemoryRecords::new()))
            .with_kv(kv.clone())
            .with_objects(Arc::new(MemoryObjects::new()))
            .with_cache(Arc::new(CacheStore::new(kv)))
            .with_auth(Arc::new(auth))
            .build(),
    );
    let router = build_router(engine);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!(%addr, "listening");
        axum::serve(listener, router).await?;
        Ok(())
    })
}
