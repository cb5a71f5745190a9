use anyhow::Context;
use clap::Parser;
use sni_fetch::cli::Cli;
use sni_fetch::engine::Engine;
use sni_fetch::output::OutputChannel;
use sni_fetch::targets::{FileSupplier, TargetSupplier};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .init();

    let cli = Cli::parse();
    let cfg = cli.into_config()?;

    let supplier: Box<dyn TargetSupplier> = match &cfg.input {
        Some(path) => Box::new(FileSupplier::new(path)),
        None => lookup_supplier()?,
    };
    let set = supplier
        .resolve_targets(cfg.query)
        .await
        .with_context(|| format!("failed to resolve targets for {}", cfg.query))?;
    tracing::info!(subnet = %set.subnet, domains = set.domains.len(), "probing");

    let sink = OutputChannel::new(cfg.output.clone())?;
    let engine = Engine::from_config(&cfg, sink.clone())?;
    engine.run(set.into_targets()).await?;
    sink.shutdown().await?;

    Ok(())
}

#[cfg(feature = "bgp")]
fn lookup_supplier() -> anyhow::Result<Box<dyn TargetSupplier>> {
    Ok(Box::new(sni_fetch::targets::HeNetSupplier::new()?))
}

#[cfg(not(feature = "bgp"))]
fn lookup_supplier() -> anyhow::Result<Box<dyn TargetSupplier>> {
    anyhow::bail!("built without the `bgp` feature; pass --input with a domain list")
}
