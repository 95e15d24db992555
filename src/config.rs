use std::path::PathBuf;

use anyhow::{Error, Result, anyhow};
use dotenvy::dotenv;
use serde::Deserialize;

use crate::{consumer::ConsumerSettings, models::retry::RetryConfig};

pub const PRODUCTION_ENV: &str = "production";

#[derive(Clone, Deserialize, Debug)]
pub struct Config {
    pub app_env: String,

    #[serde(default = "default_server_port")]
    pub server_port: u16,
    pub send_secret: String,

    pub sender_address: String,
    pub mailer_url: String,
    #[serde(default = "default_mailer_timeout_seconds")]
    pub mailer_timeout_seconds: u64,

    pub rabbitmq_url: String,
    #[serde(default = "default_email_queue_name")]
    pub email_queue_name: String,
    #[serde(default = "default_failed_queue_name")]
    pub failed_queue_name: String,
    #[serde(default = "default_prefetch_count")]
    pub prefetch_count: u16,

    #[serde(default = "default_template_path")]
    pub template_path: PathBuf,
    #[serde(default = "default_email_config_path")]
    pub email_config_path: PathBuf,
    pub header_image_path: Option<PathBuf>,

    pub log_hash_pepper: String,
    #[serde(default)]
    pub suppressed_recipient_markers: Vec<String>,

    #[serde(default = "default_max_retry_attempts")]
    pub max_retry_attempts: u32,
    #[serde(default = "default_initial_retry_delay_ms")]
    pub initial_retry_delay_ms: u64,
    #[serde(default = "default_max_retry_delay_ms")]
    pub max_retry_delay_ms: u64,
    #[serde(default = "default_retry_backoff_multiplier")]
    pub retry_backoff_multiplier: u64,
}

impl Config {
    pub fn load() -> Result<Self, Error> {
        dotenv().ok();

        let config = envy::from_env::<Self>()
            .map_err(|e| anyhow!("Invalid or missing environmental variable: {}", e))?;
        Ok(config)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_retry_attempts,
            initial_delay_ms: self.initial_retry_delay_ms,
            max_delay_ms: self.max_retry_delay_ms,
            backoff_multiplier: self.retry_backoff_multiplier,
        }
    }

    pub fn consumer_settings(&self) -> ConsumerSettings {
        ConsumerSettings {
            app_env: self.app_env.clone(),
            sender_address: self.sender_address.clone(),
            log_hash_pepper: self.log_hash_pepper.clone(),
            suppressed_recipient_markers: self.suppressed_recipient_markers.clone(),
        }
    }
}

fn default_server_port() -> u16 {
    8080
}

fn default_mailer_timeout_seconds() -> u64 {
    8
}

fn default_email_queue_name() -> String {
    "email".to_string()
}

fn default_failed_queue_name() -> String {
    "email.failed".to_string()
}

fn default_prefetch_count() -> u16 {
    1
}

fn default_template_path() -> PathBuf {
    PathBuf::from("templates")
}

fn default_email_config_path() -> PathBuf {
    PathBuf::from("config/emails.json")
}

fn default_max_retry_attempts() -> u32 {
    5
}

fn default_initial_retry_delay_ms() -> u64 {
    500
}

fn default_max_retry_delay_ms() -> u64 {
    10_000
}

fn default_retry_backoff_multiplier() -> u64 {
    2
}
