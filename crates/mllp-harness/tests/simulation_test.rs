//! End-to-end sessions over turmoil's simulated network.
//!
//! A `Responder` host answers MLLP requests; the client host drives a real
//! `Client` over `TurmoilTransport`:
//! - Plain request/reply and telemetry ordering
//! - Replies trickling in as tiny chunks
//! - Recovery after the peer drops the connection
//! - A reply slower than the deadline times out and forces a reconnect
//! - Recovery after a network partition heals

use std::{sync::Arc, time::Duration};

use mllp_client::{Client, ClientConfig, ClientError, Endpoint, ErrorReason, SendOptions};
use mllp_core::telemetry::ConnectionStatus;
use mllp_harness::{RecordingTelemetry, Responder, SimEnv, TurmoilTransport};

const PORT: u16 = 2575;

fn start_client(config: ClientConfig) -> Client {
    Client::start(TurmoilTransport, SimEnv::new(), Endpoint::new("server", PORT), config)
}

/// Poll until the session reports a usable connection.
async fn wait_connected(
    client: &Client,
    within: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    let deadline = tokio::time::Instant::now() + within;
    while !client.is_connected().await {
        if tokio::time::Instant::now() >= deadline {
            return Err("session did not connect in time".into());
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    Ok(())
}

fn to_box_err(err: ClientError) -> Box<dyn std::error::Error> {
    Box::new(err)
}

#[test]
fn request_reply_round_trip() {
    let mut sim = turmoil::Builder::new().build();
    let telemetry = RecordingTelemetry::new();

    sim.host("server", || Responder::acking(PORT).serve());

    let recorded = telemetry.clone();
    sim.client("client", async move {
        let config = ClientConfig { telemetry: Arc::new(recorded), ..ClientConfig::default() };
        let client = start_client(config);
        wait_connected(&client, Duration::from_secs(5)).await?;

        let reply = client.send("MSH|1", SendOptions::default()).await.map_err(to_box_err)?;
        assert_eq!(&reply[..], b"MSA|AA|MSH|1");

        let reply = client.send("MSH|2", SendOptions::default()).await.map_err(to_box_err)?;
        assert_eq!(&reply[..], b"MSA|AA|MSH|2");

        client.stop().await.map_err(to_box_err)?;
        Ok(())
    });

    sim.run().unwrap();

    let statuses = telemetry.statuses();
    assert_eq!(
        statuses,
        vec![
            ConnectionStatus::Connecting,
            ConnectionStatus::Connected,
            ConnectionStatus::Disconnected,
        ]
    );
    assert_eq!(telemetry.sends(), 2);
}

#[test]
fn chunked_replies_are_reassembled() {
    let mut sim = turmoil::Builder::new().rng_seed(7).build();

    sim.host("server", || Responder::acking(PORT).chunked(42).serve());

    sim.client("client", async {
        let client = start_client(ClientConfig::default());
        wait_connected(&client, Duration::from_secs(5)).await?;

        for n in 0..5 {
            let request = format!("MSH|{n}");
            let reply =
                client.send(request.clone(), SendOptions::default()).await.map_err(to_box_err)?;
            assert_eq!(reply, format!("MSA|AA|{request}").as_bytes());
        }
        Ok(())
    });

    sim.run().unwrap();
}

#[test]
fn recovers_after_peer_drops_connection() {
    let mut sim = turmoil::Builder::new().simulation_duration(Duration::from_secs(60)).build();

    sim.host("server", || Responder::acking(PORT).close_after(1).serve());

    sim.client("client", async {
        let client = start_client(ClientConfig::default());
        wait_connected(&client, Duration::from_secs(5)).await?;
        let options = SendOptions::default().reply_timeout(Duration::from_secs(5));

        client.send("MSH|1", options).await.map_err(to_box_err)?;

        // The server has hung up; the next transaction fails, and the
        // session re-establishes the connection on its own.
        assert!(client.send("MSH|2", options).await.is_err());
        wait_connected(&client, Duration::from_secs(10)).await?;

        let reply = client.send("MSH|3", options).await.map_err(to_box_err)?;
        assert_eq!(&reply[..], b"MSA|AA|MSH|3");
        Ok(())
    });

    sim.run().unwrap();
}

#[test]
fn slow_reply_times_out_and_reconnects() {
    let mut sim = turmoil::Builder::new().simulation_duration(Duration::from_secs(60)).build();
    let telemetry = RecordingTelemetry::new();

    sim.host("server", || Responder::acking(PORT).reply_delay(Duration::from_secs(3)).serve());

    let recorded = telemetry.clone();
    sim.client("client", async move {
        let config = ClientConfig { telemetry: Arc::new(recorded), ..ClientConfig::default() };
        let client = start_client(config);
        wait_connected(&client, Duration::from_secs(5)).await?;

        let short = SendOptions::default().reply_timeout(Duration::from_secs(1));
        let err = client.send("MSH|1", short).await.unwrap_err();
        assert_eq!(err, ClientError::receive(ErrorReason::Timeout));

        // The timed-out connection was replaced; its late reply never
        // reaches the next transaction.
        wait_connected(&client, Duration::from_secs(5)).await?;
        let patient = SendOptions::default().reply_timeout(Duration::from_secs(5));
        let reply = client.send("MSH|2", patient).await.map_err(to_box_err)?;
        assert_eq!(&reply[..], b"MSA|AA|MSH|2");
        Ok(())
    });

    sim.run().unwrap();

    let connects =
        telemetry.statuses().iter().filter(|s| **s == ConnectionStatus::Connected).count();
    assert_eq!(connects, 2);
}

#[test]
fn recovers_after_partition_heals() {
    let mut sim = turmoil::Builder::new().simulation_duration(Duration::from_secs(120)).build();

    sim.host("server", || Responder::acking(PORT).serve());

    sim.client("client", async {
        let client = start_client(ClientConfig::default());
        wait_connected(&client, Duration::from_secs(5)).await?;
        let options = SendOptions::default().reply_timeout(Duration::from_secs(2));

        turmoil::partition("client", "server");
        assert!(client.send("MSH|1", options).await.is_err());
        assert!(!client.is_connected().await);

        turmoil::repair("client", "server");
        wait_connected(&client, Duration::from_secs(30)).await?;

        let reply = client.send("MSH|2", options).await.map_err(to_box_err)?;
        assert_eq!(&reply[..], b"MSA|AA|MSH|2");
        Ok(())
    });

    sim.run().unwrap();
}
