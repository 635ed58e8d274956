use crate::clean::accept_code;
use crate::config::ScannerConfig;

/// Gate between a continuously decoding camera and the scan session.
///
/// A detection is accepted once; the pipeline then stays paused until
/// `scan_next`, and the accepted code stays suppressed until `reopen`.
#[derive(Debug, Clone)]
pub struct CameraGate {
    min_code_len: usize,
    last_accepted: Option<String>,
    paused: bool,
}

impl CameraGate {
    pub fn new(config: &ScannerConfig) -> Self {
        Self {
            min_code_len: config.min_code_len,
            last_accepted: None,
            paused: false,
        }
    }

    pub fn on_detection(&mut self, raw: &str) -> Option<String> {
        if self.paused {
            return None;
        }
        let code = accept_code(raw, self.min_code_len)?;
        if self.last_accepted.as_deref() == Some(code.as_str()) {
            return None;
        }
        self.last_accepted = Some(code.clone());
        self.paused = true;
        Some(code)
    }

    /// Resume decoding; the last accepted code is still ignored.
    pub fn scan_next(&mut self) {
        self.paused = false;
    }

    /// Start over: resume decoding and forget the last accepted code.
    pub fn reopen(&mut self) {
        self.paused = false;
        self.last_accepted = None;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }
}

impl Default for CameraGate {
    fn default() -> Self {
        Self::new(&ScannerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_once_then_pauses() {
        let mut gate = CameraGate::default();
        assert_eq!(gate.on_detection("4006381333931"), Some("4006381333931".into()));
        assert!(gate.is_paused());
        assert_eq!(gate.on_detection("4006381333931"), None);
        assert_eq!(gate.on_detection("999"), None);
    }

    #[test]
    fn scan_next_keeps_suppressing_the_held_code() {
        let mut gate = CameraGate::default();
        gate.on_detection("ABC123");
        gate.scan_next();
        assert_eq!(gate.on_detection("ABC123"), None);
        assert!(!gate.is_paused());
        assert_eq!(gate.on_detection("XYZ789"), Some("XYZ789".into()));
    }

    #[test]
    fn reopen_forgets_the_last_code() {
        let mut gate = CameraGate::default();
        gate.on_detection("ABC123");
        gate.reopen();
        assert_eq!(gate.on_detection("ABC123"), Some("ABC123".into()));
    }

    #[test]
    fn noise_detections_are_ignored_without_pausing() {
        let mut gate = CameraGate::default();
        assert_eq!(gate.on_detection("#!"), None);
        assert!(!gate.is_paused());
    }
}
