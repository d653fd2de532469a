use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "wa-relay")]
#[command(about = "HTTP relay for sending WhatsApp messages through a bridged session")]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "relay.toml")]
    pub config: String,

    /// Override server.port
    #[arg(long)]
    pub port: Option<u16>,

    /// Override bridge.url
    #[arg(long)]
    pub bridge_url: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,
}
