//! Run the connection manager against a scripted mock dongle.
//!
//! Demonstrates the full wiring: start, event loop, observer channel, and
//! the shutdown path that disconnects an active connection before exit.
//!
//! ```sh
//! cargo run --example monitor
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;

use hrbelt_core::link::event_channel;
use hrbelt_core::mock::MockLink;
use hrbelt_core::{ConnectionManager, LinkEvent, ManagerConfig, MonitorEvent};

#[tokio::main]
async fn main() -> hrbelt_core::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let target = "00:18:31:F0:EE:BE".parse().unwrap();
    let (tx, mut rx) = event_channel(64);
    let link = Arc::new(MockLink::new(tx));

    let mut manager = ConnectionManager::new(
        Arc::clone(&link) as Arc<dyn hrbelt_core::DongleLink>,
        ManagerConfig::new(target),
    );
    let mut events = manager.subscribe();

    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                MonitorEvent::Measurement { sample, .. } => {
                    println!("{} BPM", sample.bpm);
                }
                other => println!("event: {other:?}"),
            }
        }
    });

    // Script a belt session the way the dongle would deliver it.
    let script = link.event_sender();
    tokio::spawn(async move {
        let events = [
            LinkEvent::ScanResponse {
                rssi: -58,
                packet_type: 0,
                address: target,
                address_type: 1,
                bond: 0xFF,
                data: b"HRBelt".to_vec(),
            },
            LinkEvent::ConnectionStatus {
                conn: 0,
                flags: 1,
                address: target,
                address_type: 1,
                interval: 0x3C,
                timeout: 0x64,
                latency: 0,
                bonding: 0xFF,
            },
            LinkEvent::GroupFound {
                conn: 0,
                start: 10,
                end: 15,
                uuid: vec![0x0D, 0x18],
            },
            LinkEvent::ProcedureCompleted {
                conn: 0,
                result: 0,
                att_handle: 0,
            },
            LinkEvent::FindInformationFound {
                conn: 0,
                att_handle: 12,
                uuid: vec![0x37, 0x2A],
            },
            LinkEvent::FindInformationFound {
                conn: 0,
                att_handle: 13,
                uuid: vec![0x02, 0x29],
            },
            LinkEvent::ProcedureCompleted {
                conn: 0,
                result: 0,
                att_handle: 0,
            },
        ];
        for event in events {
            sleep(Duration::from_millis(100)).await;
            if script.send(event).await.is_err() {
                return;
            }
        }
        // Stream measurements until shutdown.
        let mut bpm = 64u8;
        loop {
            sleep(Duration::from_millis(800)).await;
            bpm = 60 + (bpm + 3) % 30;
            let notification = LinkEvent::AttributeValue {
                conn: 0,
                reason: 1,
                att_handle: 12,
                offset: 0,
                value: vec![0x00, bpm],
            };
            if script.send(notification).await.is_err() {
                return;
            }
        }
    });

    manager.start().await?;

    tokio::select! {
        result = manager.run(&mut rx) => result?,
        _ = tokio::signal::ctrl_c() => {
            println!("shutting down");
        }
    }

    // Disconnect before exit if a connection is still up.
    if manager.connection_handle() >= 0 {
        println!("disconnecting (handle {})", manager.connection_handle());
    }
    manager.stop().await
}
