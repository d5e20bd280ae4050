// src/rate_limit.rs
use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone, Copy)]
struct Window {
    started_at: DateTime<Utc>,
    count: u32,
}

/// Fixed-window request counter per client key.
#[derive(Debug)]
pub struct RateLimiter {
    limit: u32,
    window: Duration,
    clients: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn per_minute(limit: u32) -> Self {
        Self::new(limit, Duration::seconds(60))
    }

    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit: limit.max(1),
            window,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Count one request. `Err` carries the seconds until the window resets.
    pub fn check(&self, client: &str, now: DateTime<Utc>) -> Result<(), u64> {
        let mut map = self.clients.lock().unwrap_or_else(|p| p.into_inner());

        // keep the map from growing with one-off clients
        if map.len() > 10_000 {
            let window = self.window;
            map.retain(|_, w| now - w.started_at < window);
        }

        let w = map.entry(client.to_string()).or_insert(Window {
            started_at: now,
            count: 0,
        });
        if now - w.started_at >= self.window {
            *w = Window {
                started_at: now,
                count: 0,
            };
        }
        if w.count >= self.limit {
            let left = (w.started_at + self.window - now).num_seconds().max(1);
            return Err(left as u64);
        }
        w.count += 1;
        Ok(())
    }
}
