use std::{fs, sync::Arc, time::Duration};

use anyhow::{Error, Result, anyhow};
use chrono::{SecondsFormat, Utc};
use futures_util::StreamExt;
use lapin::message::Delivery as AmqpDelivery;
use tracing::{error, info, warn};

use crate::{
    clients::{
        mailer::RecoveringMailer, rbmq::RabbitMqClient, smtp::SmtpMailer,
        template::HandlebarsRenderer,
    },
    config::Config,
    consumer::{Consumer, HEADER_IMAGE_CONTENT_ID},
    error::ConsumeError,
    models::{
        email::InlineImage,
        message::{DlqMessage, FailedPayload, SendRequest},
    },
    registry::TemplateRegistry,
    utils::retry_with_backoff,
    validator::RequestValidator,
};

/// Long-running consume loop: one message in flight, acked once it has been
/// sent or parked on the failed queue.
pub async fn run_consumer(config: Config) -> Result<(), Error> {
    let registry = Arc::new(TemplateRegistry::from_file(&config.email_config_path)?);
    let renderer = Arc::new(HandlebarsRenderer::new(config.template_path.clone()));
    let validator = Arc::new(RequestValidator::new(
        registry.clone(),
        renderer.clone(),
        config.app_env.clone(),
    ));

    let smtp = SmtpMailer::new(
        config.mailer_url.clone(),
        Duration::from_secs(config.mailer_timeout_seconds),
    )?;

    let mut consumer = Consumer::new(
        config.consumer_settings(),
        registry,
        validator,
        renderer,
        RecoveringMailer::new(Box::new(smtp)),
    );

    if let Some(path) = &config.header_image_path {
        let bytes = fs::read(path)
            .map_err(|e| anyhow!("Failed to read header image {}: {}", path.display(), e))?;
        consumer = consumer.with_header_image(InlineImage {
            content_id: HEADER_IMAGE_CONTENT_ID.to_string(),
            content_type: "image/png".to_string(),
            bytes,
        });
    }

    let rabbitmq = retry_with_backoff(&config.retry_config(), || RabbitMqClient::connect(&config)).await?;
    let mut deliveries = rabbitmq.create_consumer().await?;

    info!(env = %config.app_env, "Consumer is ready");

    while let Some(delivery) = deliveries.next().await {
        match delivery {
            Ok(delivery) => process_delivery(&mut consumer, &rabbitmq, delivery).await?,
            Err(e) => {
                error!(error = %e, "Consumer stream error");
                return Err(anyhow!("Consumer stream error: {}", e));
            }
        }
    }

    warn!("Consumer stream ended");

    Ok(())
}

async fn process_delivery(
    consumer: &mut Consumer,
    rabbitmq: &RabbitMqClient,
    delivery: AmqpDelivery,
) -> Result<(), Error> {
    match consumer.handle_payload(&delivery.data).await {
        Ok(outcome) => {
            info!(%outcome, "Message processed");
            rabbitmq.acknowledge(delivery.delivery_tag).await
        }
        Err(e) => {
            let dlq_message = failed_message(&delivery.data, &e);

            match rabbitmq.publish_to_dlq(&dlq_message).await {
                Ok(()) => rabbitmq.acknowledge(delivery.delivery_tag).await,
                Err(dlq_error) => {
                    error!(error = %dlq_error, "Could not park failed message, requeueing");
                    rabbitmq.reject(delivery.delivery_tag, true).await
                }
            }
        }
    }
}

pub fn failed_message(payload: &[u8], error: &ConsumeError) -> DlqMessage {
    let original_message = match serde_json::from_slice::<SendRequest>(payload) {
        Ok(request) => FailedPayload::Decoded(request),
        Err(_) => FailedPayload::Raw(String::from_utf8_lossy(payload).into_owned()),
    };

    DlqMessage {
        original_message,
        failure_reason: error.to_string(),
        retryable: !error.is_permanent(),
        failed_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }
}
