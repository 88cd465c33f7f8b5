use clap::Parser;

#[derive(Parser)]
#[command(name = "doh-race-proxy", about = "DNS-over-HTTPS racing reverse proxy")]
pub struct Cli {
    /// Address the DoH endpoint listens on.
    #[arg(short, long, default_value = "0.0.0.0:8080")]
    pub listen: String,

    /// Address the admin endpoint (health/ready/metrics) listens on.
    #[arg(long, default_value = "0.0.0.0:9091")]
    pub admin_listen: String,
}

/// Process-start configuration, resolved once in `main`/`bootstrap` and
/// never hot-reloaded — unlike the teacher's `GatewayConfig`, this proxy has
/// no business config to watch, so a plain struct (not an `ArcSwap`) is
/// enough.
pub struct ProxyConfig {
    pub listen: String,
    pub admin_listen: String,
}

impl From<Cli> for ProxyConfig {
    fn from(cli: Cli) -> Self {
        Self {
            listen: cli.listen,
            admin_listen: cli.admin_listen,
        }
    }
}
