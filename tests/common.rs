use std::{
    collections::VecDeque,
    io,
    path::PathBuf,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use mailer::{
    clients::{mailer::MailTransport, template::HandlebarsRenderer},
    config::Config,
    consumer::ConsumerSettings,
    error::TransportError,
    models::{
        email::Email,
        message::{SendRequest, SendRequestPayload},
        template::TemplateConfig,
    },
    registry::TemplateRegistry,
};
use serde_json::{Map, Value, json};

pub const SEND_SECRET: &str = "test-send-secret";
pub const PEPPER: &str = "test-pepper";
pub const SENDER: &str = "Big Give <noreply@example.com>";

pub fn manifest_path(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(relative)
}

pub fn registry() -> Arc<TemplateRegistry> {
    Arc::new(TemplateRegistry::from_file(manifest_path("config/emails.json")).unwrap())
}

pub fn renderer() -> Arc<HandlebarsRenderer> {
    Arc::new(HandlebarsRenderer::new(manifest_path("templates")))
}

pub fn fixture_renderer() -> Arc<HandlebarsRenderer> {
    Arc::new(HandlebarsRenderer::new(manifest_path("tests/fixtures/templates")))
}

/// Registry for the fixture templates in `tests/fixtures/templates`.
pub fn fixture_registry() -> Arc<TemplateRegistry> {
    Arc::new(
        TemplateRegistry::new(vec![
            TemplateConfig {
                template_key: "greeting".to_string(),
                subject: "Hello %s, from %s (%s again)".to_string(),
                subject_params: vec!["name".to_string(), "team".to_string(), "name".to_string()],
                required_params: vec!["name".to_string()],
            },
            TemplateConfig {
                template_key: "broken".to_string(),
                subject: "Broken".to_string(),
                subject_params: vec![],
                required_params: vec![],
            },
            TemplateConfig {
                template_key: "no-file".to_string(),
                subject: "Nothing here".to_string(),
                subject_params: vec![],
                required_params: vec![],
            },
        ])
        .unwrap(),
    )
}

pub fn full_donor_params() -> Map<String, Value> {
    let params = json!({
        "campaignName": "The campaign",
        "campaignThankYouMessage": "TYVM\n\nLove, the charity xx",
        "charityName": "The charity",
        "currencyCode": "GBP",
        "donationAmount": 400.01,
        "donationDatetime": "2021-05-01T00:00:00Z",
        "donorFirstName": "Patti",
        "donorLastName": "Smith",
        "giftAidAmountClaimed": 100.00,
        "matchedAmount": 200.01,
        "paymentMethodType": "card",
        "tipAmount": 10,
        "totalChargedAmount": 415.01,
        "totalCharityValueAmount": 600.02,
        "transactionId": "d290f1ee-6c54-4b01-90e6-d701748f0851",
    });

    match params {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

pub fn donor_request(env: &str) -> SendRequest {
    SendRequest::new(
        SendRequestPayload {
            template_key: "donor-donation-success".to_string(),
            recipient_email_address: "patti@example.com".to_string(),
            params: full_donor_params(),
            sending_application: None,
        },
        env,
    )
}

pub fn settings(env: &str) -> ConsumerSettings {
    ConsumerSettings {
        app_env: env.to_string(),
        sender_address: SENDER.to_string(),
        log_hash_pepper: PEPPER.to_string(),
        suppressed_recipient_markers: vec!["+suppress".to_string()],
    }
}

pub fn test_config(rabbitmq_url: &str) -> Config {
    Config {
        app_env: "test".to_string(),
        server_port: 0,
        send_secret: SEND_SECRET.to_string(),
        sender_address: SENDER.to_string(),
        mailer_url: "smtp://localhost:1025".to_string(),
        mailer_timeout_seconds: 8,
        rabbitmq_url: rabbitmq_url.to_string(),
        email_queue_name: format!("email.test.{}", uuid::Uuid::new_v4()),
        failed_queue_name: format!("email.failed.test.{}", uuid::Uuid::new_v4()),
        prefetch_count: 1,
        template_path: manifest_path("templates"),
        email_config_path: manifest_path("config/emails.json"),
        header_image_path: None,
        log_hash_pepper: PEPPER.to_string(),
        suppressed_recipient_markers: vec![],
        max_retry_attempts: 10,
        initial_retry_delay_ms: 500,
        max_retry_delay_ms: 5_000,
        retry_backoff_multiplier: 2,
    }
}

/// Scripted result for one call to `MockMailTransport::send`.
#[derive(Debug, Clone)]
pub enum SendOutcome {
    Accept(usize),
    Fail(String),
    Invalid(String),
}

/// Counters shared between a test and the mock transport it hands over.
#[derive(Clone, Default)]
pub struct MailLog {
    pub sent: Arc<Mutex<Vec<Email>>>,
    pub send_attempts: Arc<AtomicUsize>,
    pub pings: Arc<AtomicUsize>,
    pub restarts: Arc<AtomicUsize>,
}

impl MailLog {
    pub fn sent(&self) -> Vec<Email> {
        self.sent.lock().unwrap().clone()
    }

    pub fn send_attempts(&self) -> usize {
        self.send_attempts.load(Ordering::SeqCst)
    }

    pub fn restarts(&self) -> usize {
        self.restarts.load(Ordering::SeqCst)
    }
}

pub struct MockMailTransport {
    log: MailLog,
    alive: bool,
    restart_fails: bool,
    script: Mutex<VecDeque<SendOutcome>>,
}

impl MockMailTransport {
    /// A live connection that accepts every send.
    pub fn new(log: MailLog) -> Self {
        Self {
            log,
            alive: true,
            restart_fails: false,
            script: Mutex::new(VecDeque::new()),
        }
    }

    /// Queues outcomes for successive sends; once drained every send is accepted.
    pub fn with_script(self, outcomes: impl IntoIterator<Item = SendOutcome>) -> Self {
        self.script.lock().unwrap().extend(outcomes);
        self
    }

    pub fn stale(mut self) -> Self {
        self.alive = false;
        self
    }

    pub fn unrestartable(mut self) -> Self {
        self.restart_fails = true;
        self
    }
}

#[async_trait]
impl MailTransport for MockMailTransport {
    async fn ping(&self) -> bool {
        self.log.pings.fetch_add(1, Ordering::SeqCst);
        self.alive
    }

    async fn restart(&mut self) -> Result<(), TransportError> {
        self.log.restarts.fetch_add(1, Ordering::SeqCst);

        if self.restart_fails {
            return Err(TransportError::Start("connection refused".to_string()));
        }

        self.alive = true;
        Ok(())
    }

    async fn send(&self, email: &Email) -> Result<usize, TransportError> {
        self.log.send_attempts.fetch_add(1, Ordering::SeqCst);

        let outcome = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(SendOutcome::Accept(1));

        match outcome {
            SendOutcome::Accept(count) => {
                if count > 0 {
                    self.log.sent.lock().unwrap().push(email.clone());
                }
                Ok(count)
            }
            SendOutcome::Fail(message) => Err(TransportError::Send(message)),
            SendOutcome::Invalid(message) => Err(TransportError::Message(message)),
        }
    }
}

/// In-memory log sink for asserting on what was written to the logs.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    /// Routes this thread's logs here until the guard is dropped.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let sink = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || sink.clone())
            .finish();

        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
