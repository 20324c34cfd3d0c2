//! Clipboard reading through the platform's clipboard command
//!
//! Each read runs a short-lived child process and is bounded by a timeout,
//! so a wedged clipboard owner cannot stall a run.

use std::io::{self, Read};
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::CaptureError;

const WAIT_POLL: Duration = Duration::from_millis(5);

/// Reads clipboard text by running an external command
#[derive(Debug, Clone)]
pub struct ClipboardReader {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ClipboardReader {
    pub fn new(program: impl Into<String>, args: &[&str], timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
            timeout,
        }
    }

    /// Pick the clipboard command for the current platform/session
    pub fn detect(timeout: Duration) -> Self {
        #[cfg(target_os = "macos")]
        {
            Self::new("pbpaste", &[], timeout)
        }

        #[cfg(target_os = "windows")]
        {
            Self::new(
                "powershell",
                &["-NoProfile", "-NonInteractive", "-Command", "Get-Clipboard -Raw"],
                timeout,
            )
        }

        #[cfg(not(any(target_os = "macos", target_os = "windows")))]
        {
            if is_wayland_session() {
                Self::new("wl-paste", &["--no-newline"], timeout)
            } else {
                Self::new("xclip", &["-selection", "clipboard", "-o"], timeout)
            }
        }
    }

    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run the clipboard command and return its stdout
    pub fn read(&self) -> Result<String, CaptureError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| CaptureError::Spawn {
                command: self.program.clone(),
                source,
            })?;

        // Drain both pipes while waiting so a chatty child cannot block on a full pipe
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CaptureError::Unavailable("stdout not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| CaptureError::Unavailable("stderr not captured".to_string()))?;
        let stdout_reader = drain(stdout);
        let stderr_reader = drain(stderr);

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => {
                    warn!("Clipboard command {} timed out, killing it", self.program);
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(CaptureError::Timeout(self.timeout));
                }
                Ok(None) => thread::sleep(WAIT_POLL),
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(CaptureError::Unavailable(e.to_string()));
                }
            }
        };

        let bytes = collect(stdout_reader)?;

        if !status.success() {
            let stderr = collect(stderr_reader).unwrap_or_default();
            return Err(CaptureError::Command {
                command: self.program.clone(),
                stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
            });
        }

        let text = String::from_utf8_lossy(&bytes).into_owned();
        debug!("Read {} bytes from clipboard", text.len());
        Ok(text)
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut bytes = Vec::new();
        pipe.read_to_end(&mut bytes).map(|_| bytes)
    })
}

fn collect(reader: JoinHandle<io::Result<Vec<u8>>>) -> Result<Vec<u8>, CaptureError> {
    reader
        .join()
        .map_err(|_| CaptureError::Unavailable("clipboard reader thread panicked".to_string()))?
        .map_err(|e| CaptureError::Unavailable(e.to_string()))
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn is_wayland_session() -> bool {
    if let Ok(session_type) = std::env::var("XDG_SESSION_TYPE") {
        match session_type.to_lowercase().as_str() {
            "wayland" => return true,
            "x11" => return false,
            _ => {}
        }
    }
    std::env::var_os("WAYLAND_DISPLAY").is_some()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_read_stdout() {
        let reader = ClipboardReader::new("sh", &["-c", "printf 'hello\\nworld'"], Duration::from_secs(5));
        assert_eq!(reader.read().unwrap(), "hello\nworld");
    }

    #[test]
    fn test_failed_command_reports_stderr() {
        let reader = ClipboardReader::new(
            "sh",
            &["-c", "echo 'Nothing is copied' >&2; exit 1"],
            Duration::from_secs(5),
        );
        match reader.read() {
            Err(CaptureError::Command { stderr, .. }) => assert_eq!(stderr, "Nothing is copied"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_large_stderr_does_not_stall() {
        // Far more than a pipe buffer holds
        let reader = ClipboardReader::new(
            "sh",
            &["-c", "head -c 300000 /dev/zero | tr '\\0' x >&2; exit 2"],
            Duration::from_secs(10),
        );
        let started = Instant::now();
        match reader.read() {
            Err(CaptureError::Command { stderr, .. }) => assert_eq!(stderr.len(), 300_000),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_timeout_kills_command() {
        let reader = ClipboardReader::new("sleep", &["5"], Duration::from_millis(100));
        let started = Instant::now();
        assert!(matches!(reader.read(), Err(CaptureError::Timeout(_))));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_missing_program() {
        let reader = ClipboardReader::new("ocr-sync-no-such-clipboard-tool", &[], Duration::from_secs(1));
        assert!(matches!(reader.read(), Err(CaptureError::Spawn { .. })));
    }

    #[test]
    fn test_command_line() {
        let reader = ClipboardReader::new("xclip", &["-selection", "clipboard", "-o"], Duration::from_secs(1));
        assert_eq!(reader.command_line(), "xclip -selection clipboard -o");
    }
}
