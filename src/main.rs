#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use anyhow::Result;
use clap::Parser;
use doh_race_proxy::config::{Cli, ProxyConfig};
use doh_race_proxy::server::{bootstrap, runtime};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = ProxyConfig::from(cli);

    let worker_threads = runtime::get_container_cpu_limit();

    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .enable_all()
        .build()?;

    rt.block_on(bootstrap::run(config))
}
