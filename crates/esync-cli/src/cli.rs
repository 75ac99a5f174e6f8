use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "esyncd", about = "Per-tenant image embedding sync service", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP API server.
    Serve,

    /// Run a single-tenant sync. Reads `UUID`/`DRIVE_URL`/`USE_EMBED_V4` from
    /// the environment when the corresponding flag is omitted, matching the
    /// Dispatcher's worker contract.
    Sync {
        #[arg(long, env = "UUID")]
        uuid: Option<uuid::Uuid>,

        #[arg(long, env = "DRIVE_URL")]
        drive_url: Option<String>,

        #[arg(long, env = "USE_EMBED_V4")]
        use_embed_v4: Option<bool>,
    },
}
