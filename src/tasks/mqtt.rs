//! MQTT remote control listener.

use std::time::Duration;

use anyhow::Result;
use rumqttc::{AsyncClient, Event, Incoming, MqttOptions, QoS, SubscribeFilter};
use tokio::select;
use tokio::sync::mpsc::Sender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::MqttSettings;
use crate::control::{Topic, Topics};
use crate::events::ControlMessage;

const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Listen for control topics and forward them to the presentation loop.
///
/// Broker failures are logged and retried; the show keeps running on local
/// controls meanwhile.
pub async fn run(
    settings: MqttSettings,
    control: Sender<ControlMessage>,
    cancel: CancellationToken,
) -> Result<()> {
    let topics = Topics::new(&settings.id);
    let mut options = MqttOptions::new(&settings.client_id, &settings.server, settings.port);
    options.set_keep_alive(Duration::from_secs(60));
    options.set_clean_session(true);
    if let Some(login) = &settings.login {
        options.set_credentials(login, settings.password.clone().unwrap_or_default());
    }

    let (client, mut eventloop) = AsyncClient::new(options, 32);
    info!(
        server = %settings.server,
        port = settings.port,
        "connecting to MQTT broker"
    );

    loop {
        select! {
            _ = cancel.cancelled() => break,
            event = eventloop.poll() => match event {
                Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                    info!("connected to MQTT broker");
                    on_connect(&client, &topics);
                }
                Ok(Event::Incoming(Incoming::Publish(publish))) => {
                    match topics.parse(&publish.topic, &publish.payload[..]) {
                        Some(msg) => {
                            if control.send(msg).await.is_err() {
                                debug!("presentation loop gone; stopping MQTT listener");
                                break;
                            }
                        }
                        None => debug!(topic = %publish.topic, "ignoring unknown topic"),
                    }
                }
                Ok(_) => {}
                Err(err) => {
                    warn!("MQTT connection error: {err}");
                    if pause_unless_cancelled(&cancel, RETRY_DELAY).await {
                        break;
                    }
                }
            }
        }
    }

    if let Err(err) = client.try_disconnect() {
        debug!("MQTT disconnect failed: {err}");
    }
    Ok(())
}

/// Subscribe to every control topic and un-pause the show.
fn on_connect(client: &AsyncClient, topics: &Topics) {
    let filters = topics
        .iter()
        .map(|(_, name)| SubscribeFilter::new(name, QoS::AtMostOnce));
    if let Err(err) = client.try_subscribe_many(filters) {
        warn!("MQTT subscribe failed: {err}");
    }
    if let Err(err) = client.try_publish(
        topics.full_name(Topic::Paused),
        QoS::AtMostOnce,
        false,
        "off",
    ) {
        warn!("MQTT publish failed: {err}");
    }
}

/// Sleep for `delay`, returning `true` early if `cancel` fires first.
async fn pause_unless_cancelled(cancel: &CancellationToken, delay: Duration) -> bool {
    select! {
        _ = cancel.cancelled() => true,
        _ = tokio::time::sleep(delay) => false,
    }
}
