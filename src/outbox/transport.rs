use std::fmt;
use std::sync::{Arc, Mutex};

#[cfg(feature = "emitter")]
use event_emitter_rs::EventEmitter;

/// Message transport consumed by the outbox worker.
///
/// `send` must complete or fail within a bounded time: the drain loop
/// processes claims sequentially, and a transport that blocks forever would
/// starve every event behind the stuck one. A transient failure is fine —
/// the worker retries per its policy.
pub trait Transport {
    type Error: fmt::Display;

    fn send(&mut self, topic: &str, payload: &str) -> Result<(), Self::Error>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTransportError {
    BufferPoisoned,
}

impl fmt::Display for LogTransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogTransportError::BufferPoisoned => write!(f, "log transport buffer poisoned"),
        }
    }
}

impl std::error::Error for LogTransportError {}

/// Transport that writes deliveries to stdout or a shared buffer. Useful in
/// tests and as a dead-simple sink during development.
pub struct LogTransport {
    buffer: Option<Arc<Mutex<Vec<String>>>>,
}

impl Default for LogTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl LogTransport {
    pub fn new() -> Self {
        LogTransport { buffer: None }
    }

    pub fn with_buffer(buffer: Arc<Mutex<Vec<String>>>) -> Self {
        LogTransport {
            buffer: Some(buffer),
        }
    }
}

impl Transport for LogTransport {
    type Error = LogTransportError;

    fn send(&mut self, topic: &str, payload: &str) -> Result<(), Self::Error> {
        let line = format!("[{}] {}", topic, payload);
        if let Some(buffer) = &self.buffer {
            let mut buffer = buffer
                .lock()
                .map_err(|_| LogTransportError::BufferPoisoned)?;
            buffer.push(line);
        } else {
            println!("{}", line);
        }
        Ok(())
    }
}

/// Transport that emits to in-process subscribers via an `EventEmitter`,
/// keyed by topic.
#[cfg(feature = "emitter")]
pub struct LocalEmitterTransport {
    emitter: EventEmitter,
}

#[cfg(feature = "emitter")]
impl LocalEmitterTransport {
    pub fn new(emitter: EventEmitter) -> Self {
        LocalEmitterTransport { emitter }
    }
}

#[cfg(feature = "emitter")]
impl Transport for LocalEmitterTransport {
    type Error = std::convert::Infallible;

    fn send(&mut self, topic: &str, payload: &str) -> Result<(), Self::Error> {
        self.emitter.emit(topic, payload.to_string());
        Ok(())
    }
}
