//! td-monitor: Live consumer for the Network Rail TD and TRUST feeds.
//!
//! Connects to the public STOMP broker, subscribes to one feed, and prints
//! decoded events. With no criteria the whole berth-movement stream is
//! summarized; with `--area`/`--berth`/`--train-id` only matching events
//! are surfaced, in detail.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use log::{debug, info, warn};

use td_core::config::{load_credentials, AckMode, DisplayMode, SessionConfig};
use td_core::{classify_destination, decode_body, present, FeedKind, FilterCriteria, RawFrame};
use td_stomp::{Delivery, StompClient, StompConfig, StompError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FeedArg {
    /// Train describer (berth-level) feed
    Td,
    /// TRUST train movement feed
    Trust,
}

impl From<FeedArg> for FeedKind {
    fn from(arg: FeedArg) -> Self {
        match arg {
            FeedArg::Td => FeedKind::TrainDescriber,
            FeedArg::Trust => FeedKind::TrainMovement,
        }
    }
}

#[derive(Parser)]
#[command(name = "td-monitor", version, about = "Network Rail TD/TRUST feed monitor")]
struct Cli {
    /// STOMP broker host
    #[arg(long, default_value = "publicdatafeeds.networkrail.co.uk")]
    host: String,

    /// STOMP broker port
    #[arg(long, default_value = "61618")]
    port: u16,

    /// Path to credentials file: a JSON array ["username", "passcode"]
    #[arg(long, env = "TD_SECRETS", default_value = "secrets.json")]
    secrets: PathBuf,

    /// Feed to subscribe to
    #[arg(long, value_enum, default_value = "td")]
    feed: FeedArg,

    /// Durable subscription with per-frame acknowledgement
    #[arg(long)]
    durable: bool,

    /// Area id to watch (repeatable)
    #[arg(long = "area")]
    areas: Vec<String>,

    /// Berth id to watch (repeatable)
    #[arg(long = "berth")]
    berths: Vec<String>,

    /// Train id to watch (repeatable; reserved for TRUST schema support)
    #[arg(long = "train-id")]
    train_ids: Vec<String>,

    /// Heartbeat interval in milliseconds (0 disables)
    #[arg(long, default_value = "5000")]
    heartbeat_ms: u64,
}

enum Step {
    Frame(std::result::Result<Option<Delivery>, StompError>),
    Interrupt,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let credentials = load_credentials(&cli.secrets)
        .with_context(|| format!("loading credentials from {}", cli.secrets.display()))?;
    let criteria = FilterCriteria::new(cli.areas, cli.berths, cli.train_ids);
    let session = SessionConfig::new(cli.feed.into(), cli.durable, criteria);

    let stomp = StompConfig {
        host: cli.host,
        port: cli.port,
        login: credentials.username.clone(),
        passcode: credentials.passcode.clone(),
        // The client-id header is part of the durable subscription; it must
        // be unique to the account
        client_id: match session.ack_mode {
            AckMode::ClientIndividual => Some(credentials.username.clone()),
            AckMode::Auto => None,
        },
        heartbeat_ms: cli.heartbeat_ms,
    };

    let mut client = StompClient::connect(&stomp)
        .await
        .with_context(|| format!("connecting to {}:{}", stomp.host, stomp.port))?;

    let topic = session.feed.topic();
    let subscription_name = session.subscription_name(&credentials.username);
    client
        .subscribe(
            topic,
            "1",
            session.ack_mode.header_value(),
            subscription_name.as_deref(),
        )
        .await
        .with_context(|| format!("subscribing to {topic}"))?;
    info!(
        "subscribed to {} feed at {topic} ({} ack)",
        session.feed,
        session.ack_mode.header_value()
    );

    loop {
        let step = tokio::select! {
            result = client.next() => Step::Frame(result),
            _ = tokio::signal::ctrl_c() => Step::Interrupt,
        };
        match step {
            Step::Frame(Ok(Some(delivery))) => {
                let frame = RawFrame {
                    destination: delivery.destination,
                    ack_token: delivery.ack_id,
                    body: delivery.body,
                };
                handle_frame(&frame, &session);
                if session.ack_mode == AckMode::ClientIndividual {
                    acknowledge(&client, &frame).await;
                }
            }
            Step::Frame(Ok(None)) => {
                info!("connection closed by broker");
                break;
            }
            Step::Frame(Err(e)) => return Err(e).context("reading from broker"),
            Step::Interrupt => {
                info!("interrupted, disconnecting");
                client.disconnect().await.ok();
                break;
            }
        }
    }
    Ok(())
}

/// Dispatch one delivered frame: route by destination, decode, then render
/// each event according to the session's display mode.
fn handle_frame(frame: &RawFrame, session: &SessionConfig) {
    match classify_destination(&frame.destination) {
        None => warn!("unrecognized destination: {}", frame.destination),
        Some(FeedKind::TrainMovement) => {
            // Routed but not decoded; the TRUST schema is out of scope here
            debug!("TRUST frame, {} bytes", frame.body.len());
        }
        Some(FeedKind::TrainDescriber) => match decode_body(&frame.body) {
            Err(e) => warn!("undecodable TD frame: {e}"),
            Ok(events) => {
                for event in &events {
                    match session.display {
                        DisplayMode::Summary => {
                            if let Some(line) = present::summary_line(event) {
                                println!("{line}");
                            }
                        }
                        DisplayMode::Filtered => {
                            if session.criteria.matches(event) {
                                println!("{}", present::filtered_line(event));
                            }
                        }
                    }
                }
            }
        },
    }
}

/// Per-frame acknowledgement for durable mode. Failure is logged, not
/// fatal; the broker will redeliver.
async fn acknowledge(client: &StompClient, frame: &RawFrame) {
    match &frame.ack_token {
        Some(token) => {
            if let Err(e) = client.ack(token).await {
                warn!("ack failed for {token}: {e}");
            }
        }
        None => warn!("frame from {} carried no ack token", frame.destination),
    }
}
