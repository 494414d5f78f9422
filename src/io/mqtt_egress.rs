//! MQTT publisher for controller egress
//!
//! Publishes to the backend topics:
//! - access-control/record - Decision audit records (QoS 1)
//! - access-control/alarm - Lockout/tamper/actuator alarms (QoS 1)
//! - access-control/status - Status snapshots and liveness (QoS 0)

use crate::infra::config::Config;
use crate::io::egress_channel::{EgressMessage, EgressSender};
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

/// MQTT publisher actor
///
/// Receives messages from the egress channel and publishes to MQTT topics.
pub struct MqttPublisher {
    client: AsyncClient,
    rx: mpsc::Receiver<EgressMessage>,
    record_topic: String,
    alarm_topic: String,
    status_topic: String,
}

impl MqttPublisher {
    /// Create a new MQTT publisher
    ///
    /// Connects to the broker at the configured MQTT host/port. An
    /// `online` liveness marker is published through `egress` on every
    /// (re)connect.
    pub fn new(config: &Config, rx: mpsc::Receiver<EgressMessage>, egress: EgressSender) -> Self {
        let client_id = format!("{}-egress", config.device_id());
        let mut mqttoptions = MqttOptions::new(client_id, config.mqtt_host(), config.mqtt_port());
        mqttoptions.set_keep_alive(Duration::from_secs(30));
        mqttoptions.set_clean_session(true);

        // Set credentials if configured
        if let (Some(username), Some(password)) = (config.mqtt_username(), config.mqtt_password()) {
            mqttoptions.set_credentials(username, password);
        }

        let (client, eventloop) = AsyncClient::new(mqttoptions, 100);

        // Spawn the eventloop handler
        tokio::spawn(async move {
            let mut eventloop = eventloop;
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!("mqtt_egress_connected");
                        if !egress.send_liveness("online") {
                            warn!("liveness_egress_dropped");
                        }
                    }
                    Ok(Event::Incoming(Packet::PubAck(_))) => {
                        // QoS 1 acknowledgement received
                        debug!("mqtt_egress_puback");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "mqtt_egress_error");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        });

        Self {
            client,
            rx,
            record_topic: config.record_topic().to_string(),
            alarm_topic: config.alarm_topic().to_string(),
            status_topic: config.status_topic().to_string(),
        }
    }

    /// Run the publisher loop
    ///
    /// Processes messages from the channel and publishes to MQTT.
    /// Runs until shutdown, then drains whatever is still queued so no
    /// decision record is lost on an orderly stop.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            record = %self.record_topic,
            alarm = %self.alarm_topic,
            status = %self.status_topic,
            "mqtt_egress_started"
        );

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("mqtt_egress_shutdown");
                        // Drain remaining messages
                        while let Ok(msg) = self.rx.try_recv() {
                            self.publish_message(msg).await;
                        }
                        return;
                    }
                }
                Some(msg) = self.rx.recv() => {
                    self.publish_message(msg).await;
                }
            }
        }
    }

    async fn publish_message(&self, msg: EgressMessage) {
        match msg {
            EgressMessage::AccessRecord(payload) => {
                // QoS 1 for records (at-least-once delivery); event_id
                // lets the backend dedup re-deliveries
                if let Ok(json) = serde_json::to_string(&payload) {
                    if let Err(e) = self
                        .client
                        .publish(&self.record_topic, QoS::AtLeastOnce, false, json.as_bytes())
                        .await
                    {
                        error!(error = %e, "mqtt_egress_record_failed");
                    }
                }
            }
            EgressMessage::Alarm(payload) => {
                // QoS 1 for alarms, they must reach the backend
                if let Ok(json) = serde_json::to_string(&payload) {
                    if let Err(e) = self
                        .client
                        .publish(&self.alarm_topic, QoS::AtLeastOnce, false, json.as_bytes())
                        .await
                    {
                        error!(error = %e, "mqtt_egress_alarm_failed");
                    }
                }
            }
            EgressMessage::Status(payload) => {
                // QoS 0 for periodic snapshots (fire-and-forget)
                if let Ok(json) = serde_json::to_string(&payload) {
                    if let Err(e) = self
                        .client
                        .publish(&self.status_topic, QoS::AtMostOnce, false, json.as_bytes())
                        .await
                    {
                        debug!(error = %e, "mqtt_egress_status_failed");
                    }
                }
            }
            EgressMessage::Liveness(payload) => {
                if let Ok(json) = serde_json::to_string(&payload) {
                    if let Err(e) = self
                        .client
                        .publish(&self.status_topic, QoS::AtMostOnce, false, json.as_bytes())
                        .await
                    {
                        debug!(error = %e, "mqtt_egress_liveness_failed");
                    }
                }
            }
        }
    }
}
