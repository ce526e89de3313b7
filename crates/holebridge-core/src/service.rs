// ── Bridge service ──
//
// Async lifecycle around the synchronous `Bridge`: one task drives the
// rumqttc event loop, one worker task owns every bridge call. Poll
// ticks and inbound messages meet in the worker's `select!`, so they
// never interleave.

use std::sync::Arc;
use std::time::Duration;

use rumqttc::{AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Packet, QoS};
use secrecy::ExposeSecret;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Mutex, mpsc};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::bridge::Bridge;
use crate::config::{BridgeConfig, BrokerConfig};
use crate::error::CoreError;
use crate::repository::PiholeRepository;
use crate::runner::CommandRunner;
use crate::transport::{MqttPublisher, Publisher};

const REQUEST_CHANNEL_SIZE: usize = 256;
const INBOX_CHANNEL_SIZE: usize = 64;
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Work handed from the event loop to the worker.
#[derive(Debug)]
enum Work {
    /// Broker accepted the session. Triggers a full resync.
    Connected,
    Message { topic: String, payload: Vec<u8> },
    Poll,
}

type SharedBridge<R, P> = Arc<Mutex<Bridge<R, P>>>;

// ── Service ─────────────────────────────────────────────────────────

/// Runs the bridge against a broker until cancelled.
pub struct Service {
    config: BridgeConfig,
    cancel: CancellationToken,
}

impl Service {
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that stops the service when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Resolve the device identity, connect, and serve until cancelled.
    ///
    /// Returns early only when the identity cannot be determined.
    /// Broker failures are retried forever.
    pub async fn run<R>(self, runner: R) -> Result<(), CoreError>
    where
        R: CommandRunner + 'static,
    {
        let Self { config, cancel } = self;

        let repo = PiholeRepository::new(runner, config.store.clone());
        let overrides = config.device.clone();
        let (repo, identity) = tokio::task::spawn_blocking(move || {
            let identity = repo.detect_identity(&overrides);
            (repo, identity)
        })
        .await
        .map_err(|e| CoreError::Internal(e.to_string()))?;
        let identity = identity?;
        info!(mac = %identity.mac, sw_version = %identity.sw_version, "device identity resolved");

        let (client, eventloop) = AsyncClient::new(mqtt_options(&config.broker), REQUEST_CHANNEL_SIZE);
        let bridge = Arc::new(Mutex::new(Bridge::new(
            repo,
            MqttPublisher::new(client.clone()),
            identity,
            config.topics.clone(),
        )));

        let (inbox_tx, inbox_rx) = mpsc::channel(INBOX_CHANNEL_SIZE);
        let subscriptions = config.topics.subscriptions();

        info!(
            host = %config.broker.host,
            port = config.broker.port,
            interval_secs = config.poll_interval.as_secs(),
            "starting bridge"
        );

        let events = tokio::spawn(event_loop_task(
            eventloop,
            client.clone(),
            subscriptions,
            inbox_tx,
            cancel.clone(),
        ));
        let worker = tokio::spawn(worker_task(
            bridge,
            inbox_rx,
            config.poll_interval,
            cancel.clone(),
        ));

        cancel.cancelled().await;
        let _ = client.try_disconnect();
        for handle in [events, worker] {
            if let Err(e) = handle.await {
                error!(error = %e, "bridge task ended abnormally");
            }
        }
        info!("bridge stopped");
        Ok(())
    }
}

fn mqtt_options(broker: &BrokerConfig) -> MqttOptions {
    let mut options = MqttOptions::new(&broker.client_id, &broker.host, broker.port);
    options.set_keep_alive(broker.keep_alive);
    options.set_clean_session(true);
    if let Some(credentials) = &broker.credentials {
        options.set_credentials(&credentials.username, credentials.password.expose_secret());
    }
    options
}

// ── Background tasks ────────────────────────────────────────────────

/// Drive the MQTT connection and forward what matters to the worker.
///
/// rumqttc reconnects on the next `poll` after an error, so the loop
/// only waits and tries again.
async fn event_loop_task(
    mut eventloop: EventLoop,
    client: AsyncClient,
    subscriptions: Vec<String>,
    inbox: mpsc::Sender<Work>,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            event = eventloop.poll() => event,
        };

        match event {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                if ack.code != ConnectReturnCode::Success {
                    warn!(code = ?ack.code, "broker refused connection");
                    continue;
                }
                info!("connected to broker");
                for filter in &subscriptions {
                    if let Err(e) = client.try_subscribe(filter.as_str(), QoS::AtMostOnce) {
                        warn!(%filter, error = %e, "subscribe failed");
                    }
                }
                if inbox.send(Work::Connected).await.is_err() {
                    break;
                }
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                if !forward_message(&inbox, publish.topic, publish.payload.to_vec()) {
                    break;
                }
            }
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "broker connection error");
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(RECONNECT_DELAY) => {}
                }
            }
        }
    }
    debug!("event loop task stopped");
}

/// Queue an inbound message without waiting. A full inbox drops the
/// message so the event loop keeps servicing keep-alives while the
/// worker is stuck. Returns `false` once the worker is gone.
fn forward_message(inbox: &mpsc::Sender<Work>, topic: String, payload: Vec<u8>) -> bool {
    let dropped_topic = topic.clone();
    match inbox.try_send(Work::Message { topic, payload }) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            warn!(topic = %dropped_topic, "worker busy, dropping inbound message");
            true
        }
        Err(TrySendError::Closed(_)) => false,
    }
}

/// Serialize every bridge call. Polling starts with the first session.
async fn worker_task<R, P>(
    bridge: SharedBridge<R, P>,
    mut inbox: mpsc::Receiver<Work>,
    poll_interval: Duration,
    cancel: CancellationToken,
) where
    R: CommandRunner + 'static,
    P: Publisher + 'static,
{
    let mut interval = tokio::time::interval(poll_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await; // consume the immediate first tick
    let mut connected = false;

    loop {
        let work = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            work = inbox.recv() => {
                let Some(work) = work else { break };
                work
            }
            _ = interval.tick(), if connected => Work::Poll,
        };

        if matches!(work, Work::Connected) {
            connected = true;
            interval.reset();
        }
        run_blocking(&bridge, work).await;
    }
    debug!("worker task stopped");
}

async fn run_blocking<R, P>(bridge: &SharedBridge<R, P>, work: Work)
where
    R: CommandRunner + 'static,
    P: Publisher + 'static,
{
    let bridge = Arc::clone(bridge);
    let result = tokio::task::spawn_blocking(move || {
        let mut bridge = bridge.blocking_lock();
        match work {
            Work::Connected => {
                bridge.resync();
            }
            Work::Poll => {
                bridge.poll();
            }
            Work::Message { topic, payload } => {
                bridge.handle_message(&topic, &payload);
            }
        }
    })
    .await;

    if let Err(e) = result {
        error!(error = %e, "bridge work panicked");
    }
}
