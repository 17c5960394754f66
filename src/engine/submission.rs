use super::{BlockReason, InterceptionEngine, PageContext, Verdict};
use crate::reporter::ReportKind;

impl InterceptionEngine {
    /// Decide a programmatic `form.submit()`.
    ///
    /// Only streaming hosts are policed; elsewhere every submission goes through.
    pub fn evaluate_form_submission(&mut self, page: &PageContext, action: Option<&str>) -> Verdict {
        if !self.is_enabled() || !self.classifier.is_streaming_host(&page.host) {
            return Verdict::Allow;
        }

        let action = action.unwrap_or("");
        if !self.scorer.is_suspicious_url(action, "") {
            return Verdict::Allow;
        }

        log::info!("🚫 Blocked form submission to: {}", action);
        self.report(
            ReportKind::FormBlocked,
            action.to_string(),
            Some(BlockReason::SuspiciousFormAction),
        );
        Verdict::Block(BlockReason::SuspiciousFormAction)
    }
}
