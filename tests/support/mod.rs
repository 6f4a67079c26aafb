use std::sync::{Arc, Mutex};

use refdata::Transport;

/// Transport that fails a configured number of times before succeeding,
/// recording every successful delivery.
pub struct FlakyTransport {
    failures_left: usize,
    pub delivered: Arc<Mutex<Vec<(String, String)>>>,
}

impl FlakyTransport {
    pub fn failing(times: usize) -> Self {
        FlakyTransport {
            failures_left: times,
            delivered: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn reliable() -> Self {
        Self::failing(0)
    }

    pub fn delivered_count(&self) -> usize {
        self.delivered.lock().unwrap().len()
    }
}

impl Transport for FlakyTransport {
    type Error = String;

    fn send(&mut self, topic: &str, payload: &str) -> Result<(), Self::Error> {
        if self.failures_left > 0 {
            self.failures_left -= 1;
            return Err("transport unavailable".to_string());
        }
        self.delivered
            .lock()
            .unwrap()
            .push((topic.to_string(), payload.to_string()));
        Ok(())
    }
}

/// Transport that never succeeds.
pub struct DeadTransport;

impl Transport for DeadTransport {
    type Error = String;

    fn send(&mut self, _topic: &str, _payload: &str) -> Result<(), Self::Error> {
        Err("broker unreachable".to_string())
    }
}
