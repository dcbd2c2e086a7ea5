//! Status - liveness

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Liveness payload for `/healthz`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub ok: bool,
    pub time: DateTime<Utc>,
}

impl Health {
    pub fn alive(time: DateTime<Utc>) -> Self {
        Self { ok: true, time }
    }
}
