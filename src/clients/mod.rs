pub mod health;
pub mod mailer;
pub mod memory;
pub mod queue;
pub mod rbmq;
pub mod smtp;
pub mod template;
