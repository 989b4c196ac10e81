use anyhow::Result;

use crate::cli::ServeArgs;
use crate::telemetry;

pub mod http;
pub mod server;

/// Launch the HTTP service using the provided CLI arguments.
pub async fn serve(args: ServeArgs) -> Result<()> {
    telemetry::init()?;
    let config = server::ServeConfig::try_from_args(args)?;
    let server = server::LookupServer::new(config);
    server.run().await
}
