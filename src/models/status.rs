use std::fmt::{Display, Formatter, Result};

use serde::{Deserialize, Serialize};

/// Terminal success states of a consumed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delivery {
    Sent,
    Suppressed,
}

impl Display for Delivery {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            Delivery::Sent => write!(f, "sent"),
            Delivery::Suppressed => write!(f, "suppressed"),
        }
    }
}
