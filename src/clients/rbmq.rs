use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;
use lapin::{
    BasicProperties, Channel, Connection, ConnectionProperties, Consumer,
    options::{
        BasicAckOptions, BasicConsumeOptions, BasicPublishOptions, BasicQosOptions,
        BasicRejectOptions, ConfirmSelectOptions, QueueDeclareOptions,
    },
    publisher_confirm::Confirmation,
    types::{AMQPValue, FieldTable, ShortString},
};
use tracing::{debug, info};

use crate::{
    clients::queue::MessagePublisher,
    config::Config,
    models::message::{DlqMessage, Envelope},
};

pub const GROUP_ID_HEADER: &str = "x-group-id";

const CONSUMER_TAG: &str = "mailer_worker";

pub struct RabbitMqClient {
    _connection: Connection,
    channel: Channel,
    email_queue_name: String,
    failed_queue_name: String,
}

impl RabbitMqClient {
    pub async fn connect(config: &Config) -> Result<Self, Error> {
        info!("Connecting to RabbitMQ");

        let connection = Connection::connect(&config.rabbitmq_url, ConnectionProperties::default())
            .await
            .map_err(|e| anyhow!("Failed to connect to RabbitMQ: {}", e))?;

        let channel = connection
            .create_channel()
            .await
            .map_err(|e| anyhow!("RabbitMQ channel creation failed: {}", e))?;

        channel
            .basic_qos(config.prefetch_count, BasicQosOptions::default())
            .await
            .map_err(|e| anyhow!("Failed to set up QoS: {}", e))?;

        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await
            .map_err(|e| anyhow!("Failed to enable publisher confirms: {}", e))?;

        for queue_name in [&config.email_queue_name, &config.failed_queue_name] {
            channel
                .queue_declare(
                    queue_name,
                    QueueDeclareOptions {
                        durable: true,
                        ..Default::default()
                    },
                    FieldTable::default(),
                )
                .await
                .map_err(|e| anyhow!("Failed to declare queue {}: {}", queue_name, e))?;
        }

        info!(
            email_queue = %config.email_queue_name,
            failed_queue = %config.failed_queue_name,
            prefetch_count = config.prefetch_count,
            "RabbitMQ channel ready"
        );

        Ok(Self {
            _connection: connection,
            channel,
            email_queue_name: config.email_queue_name.clone(),
            failed_queue_name: config.failed_queue_name.clone(),
        })
    }

    pub async fn create_consumer(&self) -> Result<Consumer, Error> {
        let consumer = self
            .channel
            .basic_consume(
                &self.email_queue_name,
                CONSUMER_TAG,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| anyhow!("Failed to create consumer: {}", e))?;

        info!(queue = %self.email_queue_name, "Consumer created for queue");

        Ok(consumer)
    }

    pub async fn acknowledge(&self, delivery_tag: u64) -> Result<(), Error> {
        self.channel
            .basic_ack(delivery_tag, BasicAckOptions::default())
            .await
            .map_err(|e| anyhow!("Failed to acknowledge message: {}", e))?;

        Ok(())
    }

    pub async fn reject(&self, delivery_tag: u64, requeue: bool) -> Result<(), Error> {
        self.channel
            .basic_reject(delivery_tag, BasicRejectOptions { requeue })
            .await
            .map_err(|e| anyhow!("Failed to reject message: {}", e))?;

        Ok(())
    }

    pub async fn publish_to_dlq(&self, message: &DlqMessage) -> Result<(), Error> {
        let payload = serde_json::to_vec(message)?;

        let confirmation = self
            .channel
            .basic_publish(
                "",
                &self.failed_queue_name,
                BasicPublishOptions::default(),
                &payload,
                BasicProperties::default().with_delivery_mode(2),
            )
            .await
            .map_err(|e| anyhow!("Failed to publish message to dlq: {}", e))?
            .await
            .map_err(|e| anyhow!("Broker did not confirm dlq message: {}", e))?;

        ensure_confirmed(confirmation, &self.failed_queue_name)
    }
}

#[async_trait]
impl MessagePublisher for RabbitMqClient {
    async fn publish(&self, envelope: &Envelope) -> Result<(), Error> {
        let payload = envelope.payload()?;

        let mut headers = FieldTable::default();
        headers.insert(
            ShortString::from(GROUP_ID_HEADER),
            AMQPValue::LongString(envelope.group_id.clone().into()),
        );

        let properties = BasicProperties::default()
            .with_delivery_mode(2)
            .with_content_type(ShortString::from("application/json"))
            .with_message_id(ShortString::from(envelope.message_id.clone()))
            .with_correlation_id(ShortString::from(envelope.message_id.clone()))
            .with_headers(headers);

        let confirmation = self
            .channel
            .basic_publish(
                "",
                &self.email_queue_name,
                BasicPublishOptions::default(),
                &payload,
                properties,
            )
            .await
            .map_err(|e| anyhow!("Failed to publish message: {}", e))?
            .await
            .map_err(|e| anyhow!("Broker did not confirm message: {}", e))?;

        ensure_confirmed(confirmation, &self.email_queue_name)?;

        debug!(
            message_id = %envelope.message_id,
            group_id = %envelope.group_id,
            "Message published"
        );

        Ok(())
    }

    async fn health_check(&self) -> Result<(), Error> {
        if self.channel.status().connected() {
            Ok(())
        } else {
            Err(anyhow!("RabbitMQ channel is not connected"))
        }
    }
}

/// Only a plain broker ack counts as a stored message. Nacks, returns and
/// channels without confirms enabled are all failures.
pub fn ensure_confirmed(confirmation: Confirmation, queue_name: &str) -> Result<(), Error> {
    match confirmation {
        Confirmation::Ack(None) => Ok(()),
        Confirmation::Ack(Some(_)) => Err(anyhow!("Broker returned message for {}", queue_name)),
        Confirmation::Nack(_) => Err(anyhow!("Broker nacked message for {}", queue_name)),
        Confirmation::NotRequested => Err(anyhow!(
            "Publisher confirms are not enabled, cannot tell if {} stored the message",
            queue_name
        )),
    }
}
