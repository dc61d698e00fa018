//! # Demo: vending
//!
//! Runs a controller on an in-process broker and drives it through a short day:
//! two purchases (the second one drains the stock and raises alerts), a jam, fault
//! recovery, a restock in maintenance and a graceful shutdown.
//!
//! ## Flow
//! ```text
//! select ─► payment_confirmed ─► dispense_confirmed          (x2, soda runs out)
//! select ─► payment_confirmed ─► dispense_error("jam")       (water, Fault)
//! fault_cleared ─► reset ─► maintenance_enter ─► restock ─► maintenance_exit
//! shutdown
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=info cargo run --example vending --features logging
//! ```

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;
use vmc::{
    Catalog, ChannelKind, Config, LogChannel, LogWriter, MemoryTransport, NotifyChannel,
    Subscribe, VmcBuilder,
};

const CATALOG: &str = r#"{
    "machine": { "name": "Lobby Snacks", "serial_number": "VM-001", "location": "Building A" },
    "products": [
        { "id": "soda",  "name": "Soda",  "price": 1.50, "inventory_count": 2, "restock_threshold": 1 },
        { "id": "water", "name": "Water", "price": 1.00, "inventory_count": -1 }
    ],
    "contacts": [
        { "name": "Owner", "email": "owner@example.com", "phone": "+15550100", "preferred": ["email", "sms"] }
    ]
}"#;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut cfg = Config::default();
    cfg.payment_timeout = Duration::from_secs(5);
    cfg.dispense_watchdog = Duration::from_secs(2);
    cfg.grace = Duration::from_secs(3);

    let broker = Arc::new(MemoryTransport::new());
    let channels: Vec<Arc<dyn NotifyChannel>> = vec![
        Arc::new(LogChannel::new(ChannelKind::Email)),
        Arc::new(LogChannel::new(ChannelKind::Sms)),
    ];
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];

    let vmc = VmcBuilder::new(cfg)
        .with_catalog(Catalog::from_json(CATALOG)?)
        .with_transport(broker.clone())
        .with_channels(channels)
        .with_subscribers(subs)
        .build();
    let gw = vmc.gateway();

    for _ in 0..2 {
        println!("{:?}", gw.select("soda").await);
        println!("{:?}", gw.payment_confirmed(150).await);
        println!("{:?}", gw.dispense_confirmed().await);
    }
    println!("sold out: {:?}", gw.select("soda").await);

    gw.select("water").await;
    gw.payment_confirmed(100).await;
    println!("jam: {:?}", gw.dispense_error("jam").await);
    println!("reset too early: {:?}", gw.reset().await);
    gw.fault_cleared().await;
    println!("reset: {:?}", gw.reset().await);

    let restock = r#"{"command":"restock","product_id":"soda","amount":10}"#;
    gw.maintenance_enter().await;
    println!("restock: {:?}", gw.submit_json(restock).await?);
    gw.maintenance_exit().await;

    tokio::time::sleep(Duration::from_millis(100)).await;
    if let Some(retained) = broker.retained("vmc/status") {
        println!("retained status: {}", String::from_utf8_lossy(&retained));
    }

    vmc.shutdown().await?;
    for line in vmc.recent_events(20) {
        println!("{} #{:<4} {}", line.at.format("%H:%M:%S%.3f"), line.seq, line.line);
    }
    Ok(())
}
