use std::sync::{Arc, Mutex};
use log::Level;

/// Optional observability hooks. Runs take an `Option<Arc<dyn Stream>>`; `None`
/// silences every hook.
pub trait Stream: Send + Sync {
    fn stream_message(&self, path: &str, message: &str);

    fn stream_progress(&self, path: &str, done: usize, total: usize);

    fn stream_scalar(&self, path: &str, scalar: f64);
}

pub type SharedStream = Option<Arc<dyn Stream>>;

impl Stream for Option<Arc<dyn Stream>> {
    fn stream_message(&self, path: &str, message: &str) {
        match self {
            Some(stream) => stream.stream_message(path, message),
            None => {}
        }
    }

    fn stream_progress(&self, path: &str, done: usize, total: usize) {
        match self {
            Some(stream) => stream.stream_progress(path, done, total),
            None => {}
        }
    }

    fn stream_scalar(&self, path: &str, scalar: f64) {
        match self {
            Some(stream) => stream.stream_scalar(path, scalar),
            None => {}
        }
    }
}

/// Forwards hooks to the `log` facade.
#[derive(Debug, Clone)]
pub struct LogStream {
    level: Level,
}

impl LogStream {
    pub fn new(level: Level) -> Self {
        LogStream { level }
    }
}

impl Default for LogStream {
    fn default() -> Self {
        LogStream::new(Level::Info)
    }
}

impl Stream for LogStream {
    fn stream_message(&self, path: &str, message: &str) {
        log::log!(self.level, "[{}] {}", path, message);
    }

    fn stream_progress(&self, path: &str, done: usize, total: usize) {
        let percent = if total == 0 { 100.0 } else { done as f64 / total as f64 * 100.0 };
        log::log!(self.level, "[{}] {:.1}% ({}/{})", path, percent, done, total);
    }

    fn stream_scalar(&self, path: &str, scalar: f64) {
        log::log!(self.level, "[{}] {}", path, scalar);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Message { path: String, message: String },
    Progress { path: String, done: usize, total: usize },
    Scalar { path: String, value: f64 },
}

/// Keeps every event in memory, e.g. to export run counters.
#[derive(Debug, Default)]
pub struct RecordingStream {
    events: Mutex<Vec<StreamEvent>>,
}

impl RecordingStream {
    pub fn new() -> Self {
        RecordingStream::default()
    }

    fn push(&self, event: StreamEvent) {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).push(event);
    }

    pub fn events(&self) -> Vec<StreamEvent> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).clone()
    }

    pub fn scalar(&self, path: &str) -> Option<f64> {
        self.events().into_iter().rev().find_map(|event| match event {
            StreamEvent::Scalar { path: p, value } if p == path => Some(value),
            _ => None,
        })
    }

    pub fn progress(&self, path: &str) -> Vec<(usize, usize)> {
        self.events().into_iter().filter_map(|event| match event {
            StreamEvent::Progress { path: p, done, total } if p == path => Some((done, total)),
            _ => None,
        }).collect()
    }
}

impl Stream for RecordingStream {
    fn stream_message(&self, path: &str, message: &str) {
        self.push(StreamEvent::Message { path: path.to_string(), message: message.to_string() });
    }

    fn stream_progress(&self, path: &str, done: usize, total: usize) {
        self.push(StreamEvent::Progress { path: path.to_string(), done, total });
    }

    fn stream_scalar(&self, path: &str, scalar: f64) {
        self.push(StreamEvent::Scalar { path: path.to_string(), value: scalar });
    }
}
