//! Per-page interception state
//!
//! Created once when the page's content context loads and reset only by
//! navigation. Updated non-atomically; a page context is single-threaded.

#[derive(Debug, Clone)]
pub struct InterceptionState {
    enabled: bool,
    last_popup_attempt_ms: Option<u64>,
    blocked_attempts: u32,
}

impl InterceptionState {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            last_popup_attempt_ms: None,
            blocked_attempts: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Record a new-window attempt at `now_ms`.
    ///
    /// Returns true when the previous attempt happened less than `window_ms`
    /// earlier. The timestamp is stored either way.
    pub fn record_popup_attempt(&mut self, now_ms: u64, window_ms: u64) -> bool {
        let rapid = self
            .last_popup_attempt_ms
            .map(|last| now_ms.saturating_sub(last) < window_ms)
            .unwrap_or(false);
        self.last_popup_attempt_ms = Some(now_ms);
        rapid
    }

    pub fn last_popup_attempt_ms(&self) -> Option<u64> {
        self.last_popup_attempt_ms
    }

    pub fn record_block(&mut self) {
        self.blocked_attempts = self.blocked_attempts.saturating_add(1);
    }

    pub fn blocked_attempts(&self) -> u32 {
        self.blocked_attempts
    }
}

impl Default for InterceptionState {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_attempt_is_never_rapid() {
        let mut state = InterceptionState::default();
        assert!(!state.record_popup_attempt(0, 3_000));
        assert_eq!(state.last_popup_attempt_ms(), Some(0));
    }

    #[test]
    fn test_rapid_fire_window_is_exclusive() {
        let mut state = InterceptionState::default();
        state.record_popup_attempt(10_000, 3_000);
        assert!(state.record_popup_attempt(12_999, 3_000));
        // measured from the previous attempt, which was just recorded
        assert!(!state.record_popup_attempt(15_999, 3_000));
    }

    #[test]
    fn test_block_counter() {
        let mut state = InterceptionState::new(false);
        assert!(!state.is_enabled());
        state.record_block();
        state.record_block();
        assert_eq!(state.blocked_attempts(), 2);
    }
}
