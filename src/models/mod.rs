pub mod email;
pub mod health;
pub mod message;
pub mod response;
pub mod retry;
pub mod status;
pub mod template;
