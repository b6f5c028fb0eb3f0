use std::io::Write;
use std::sync::{Arc, Mutex};

/// Thin platform abstraction for everything the interpreter hands to the
/// host: console output and the clock. Swapping it lets tests and embedders
/// capture output while keeping the call sites stable.
pub trait Platform: Send + Sync {
    fn write_stdout(&self, text: &str);
    fn write_stderr(&self, text: &str);
    fn now_ms(&self) -> i128;
}

pub struct StdPlatform;

impl Platform for StdPlatform {
    fn write_stdout(&self, text: &str) {
        let mut stdout = std::io::stdout().lock();
        let _ = stdout.write_all(text.as_bytes());
        let _ = stdout.flush();
    }

    fn write_stderr(&self, text: &str) {
        let _ = std::io::stderr().lock().write_all(text.as_bytes());
    }

    fn now_ms(&self) -> i128 {
        let now = std::time::SystemTime::now();
        now.duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as i128)
            .unwrap_or(0)
    }
}

/// Records output in memory. Clones share the same buffers, so a test can keep
/// one handle and give the other to the interpreter.
#[derive(Clone, Default)]
pub struct CapturePlatform {
    stdout: Arc<Mutex<String>>,
    stderr: Arc<Mutex<String>>,
    clock_ms: Arc<Mutex<i128>>,
}

impl CapturePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stdout(&self) -> String {
        read(&self.stdout)
    }

    pub fn stderr(&self) -> String {
        read(&self.stderr)
    }

    /// Moves the fake clock forward.
    pub fn advance(&self, millis: i128) {
        let mut clock = self.clock_ms.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *clock += millis;
    }
}

fn read(buffer: &Mutex<String>) -> String {
    buffer
        .lock()
        .map(|text| text.clone())
        .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
}

fn append(buffer: &Mutex<String>, text: &str) {
    buffer
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .push_str(text);
}

impl Platform for CapturePlatform {
    fn write_stdout(&self, text: &str) {
        append(&self.stdout, text);
    }

    fn write_stderr(&self, text: &str) {
        append(&self.stderr, text);
    }

    fn now_ms(&self) -> i128 {
        *self.clock_ms.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_clones_share_buffers() {
        let platform = CapturePlatform::new();
        let handle = platform.clone();
        platform.write_stdout("hello");
        platform.write_stderr("oops");
        handle.advance(250);
        assert_eq!(handle.stdout(), "hello");
        assert_eq!(handle.stderr(), "oops");
        assert_eq!(platform.now_ms(), 250);
    }
}
