//! Service entry point: parses the process-wide `Config`, wires up logging,
//! the registry, and the schema cache, then serves line-delimited JSON
//! requests over stdio or a TCP listener.

use clap::Parser;
use mctsd::dispatcher::Host;
use mctsd::{dispatcher, schema::SchemaCache, Config, Registry};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    mctsd::init_logging(&config.log_dir)?;

    let host = Arc::new(Host {
        registry: Registry::new(),
        schema: SchemaCache::load(&config.schema_dir)?,
    });

    match config.listen {
        Some(addr) => {
            let listener = tokio::net::TcpListener::bind(addr).await?;
            log::info!("listening on {addr}");
            loop {
                let (socket, peer) = listener.accept().await?;
                log::info!("accepted connection from {peer}");
                let host = host.clone();
                tokio::spawn(async move {
                    let (reader, writer) = socket.into_split();
                    if let Err(e) = dispatcher::serve(reader, writer, host).await {
                        log::warn!("connection {peer} ended: {e}");
                    }
                });
            }
        }
        None => {
            log::info!("serving requests on stdio");
            dispatcher::serve(tokio::io::stdin(), tokio::io::stdout(), host).await
        }
    }
}
