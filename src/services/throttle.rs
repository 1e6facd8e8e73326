use std::{
    collections::HashMap,
    sync::Mutex,
    time::{Duration, Instant},
};

use rand::Rng;

// Each acquisition reserves a slot at least `min..=max` ms after the previous
// slot for the same key and sleeps until its slot arrives. The first
// acquisition for a key passes immediately.
pub struct RateGate {
    min_interval_ms: u64,
    max_interval_ms: u64,
    slots: Mutex<HashMap<String, Instant>>,
}

impl RateGate {
    pub fn new(min_interval_ms: u64, max_interval_ms: u64) -> Self {
        RateGate {
            min_interval_ms,
            max_interval_ms,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub async fn wait(&self, key: &str) {
        let pause = {
            let mut slots = self.slots.lock().expect("rate gate lock poisoned");
            let now = Instant::now();
            let start = match slots.get(key) {
                Some(ready) if *ready > now => *ready,
                _ => now,
            };
            let interval = rand::thread_rng().gen_range(self.min_interval_ms..=self.max_interval_ms);
            slots.insert(key.to_string(), start + Duration::from_millis(interval));
            start.saturating_duration_since(now)
        };
        if !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
    }
}
