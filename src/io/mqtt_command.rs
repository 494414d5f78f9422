//! MQTT listener for operator commands
//!
//! Subscribes to the command topic and routes recognized commands into
//! the controller's input channel. Commands carry the target device id;
//! anything addressed elsewhere is ignored.

use crate::domain::types::{InputEvent, RemoteCommand};
use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Wire shape of a command message
#[derive(Debug, Deserialize)]
struct CommandMessage {
    command: String,
    device_id: String,
}

/// Parse one command payload, filtering on the local device id
fn parse_command(payload: &[u8], device_id: &str) -> Option<RemoteCommand> {
    let msg: CommandMessage = match serde_json::from_slice(payload) {
        Ok(msg) => msg,
        Err(e) => {
            warn!(error = %e, "command_parse_failed");
            return None;
        }
    };

    if msg.device_id != device_id {
        debug!(target = %msg.device_id, "command_for_other_device");
        return None;
    }

    match msg.command.as_str() {
        "open_door" => Some(RemoteCommand::OpenDoor),
        "get_status" => Some(RemoteCommand::GetStatus),
        other => {
            warn!(command = %other, "command_unknown");
            None
        }
    }
}

/// Start the MQTT command listener and route commands to the channel
///
/// Commands are sent via try_send to avoid blocking the MQTT eventloop;
/// drops are counted and logged.
pub async fn start_command_listener(
    config: &Config,
    event_tx: mpsc::Sender<InputEvent>,
    metrics: Arc<Metrics>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let client_id = format!("{}-command", config.device_id());
    let mut mqttoptions = MqttOptions::new(client_id, config.mqtt_host(), config.mqtt_port());
    mqttoptions.set_keep_alive(Duration::from_secs(30));

    // Set credentials if configured
    if let (Some(username), Some(password)) = (config.mqtt_username(), config.mqtt_password()) {
        mqttoptions.set_credentials(username, password);
    }

    let (client, mut eventloop) = AsyncClient::new(mqttoptions, 100);
    client.subscribe(config.command_topic(), QoS::AtLeastOnce).await?;

    info!(
        topic = %config.command_topic(),
        host = %config.mqtt_host(),
        port = %config.mqtt_port(),
        "command_listener_subscribed"
    );

    let device_id = config.device_id().to_string();

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("command_listener_shutdown");
                    return Ok(());
                }
            }
            event = eventloop.poll() => {
                match event {
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        let Some(command) = parse_command(&publish.payload, &device_id) else {
                            continue;
                        };
                        info!(command = ?command, "command_received");
                        let input = InputEvent::Command { command, received_at: Instant::now() };
                        if let Err(e) = event_tx.try_send(input) {
                            metrics.record_input_dropped();
                            warn!(error = %e, "command_dropped");
                        }
                    }
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!("command_listener_connected");
                        // Re-subscribe after reconnect
                        if let Err(e) =
                            client.subscribe(config.command_topic(), QoS::AtLeastOnce).await
                        {
                            warn!(error = %e, "command_resubscribe_failed");
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "command_listener_error");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_open_door() {
        let payload = br#"{"command": "open_door", "device_id": "access-ctl-001"}"#;
        assert_eq!(parse_command(payload, "access-ctl-001"), Some(RemoteCommand::OpenDoor));
    }

    #[test]
    fn test_parse_get_status() {
        let payload = br#"{"command": "get_status", "device_id": "access-ctl-001"}"#;
        assert_eq!(parse_command(payload, "access-ctl-001"), Some(RemoteCommand::GetStatus));
    }

    #[test]
    fn test_other_device_ignored() {
        let payload = br#"{"command": "open_door", "device_id": "access-ctl-002"}"#;
        assert_eq!(parse_command(payload, "access-ctl-001"), None);
    }

    #[test]
    fn test_unknown_command_ignored() {
        let payload = br#"{"command": "self_destruct", "device_id": "access-ctl-001"}"#;
        assert_eq!(parse_command(payload, "access-ctl-001"), None);
    }

    #[test]
    fn test_malformed_json_ignored() {
        assert_eq!(parse_command(b"not json", "access-ctl-001"), None);
    }
}
