use indicatif::{ProgressBar, ProgressStyle};
use mailverify_lib::{CheckStatus, Event, EventSink, Step, VerificationResult};

const BAR_TEMPLATE: &str = "{bar:40.cyan/blue} {pos}/{len} [{elapsed_precise}, eta {eta}]";

/// Renders pipeline events as status lines on stderr, with a progress bar
/// for batch runs.
pub struct StatusPrinter {
    /// also print every step as it starts
    pub steps: bool,
    bar: Option<ProgressBar>,
}

impl StatusPrinter {
    pub fn new(steps: bool) -> Self {
        Self { steps, bar: None }
    }

    /// Printer driving a bar of `total` addresses on stderr.
    pub fn with_progress(steps: bool, total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::with_template(BAR_TEMPLATE) {
            bar.set_style(style.progress_chars("=> "));
        }
        Self::with_bar(steps, bar)
    }

    pub fn with_bar(steps: bool, bar: ProgressBar) -> Self {
        Self {
            steps,
            bar: Some(bar),
        }
    }

    /// Leaves the bar on screen at its last position.
    pub fn finish(&self, cancelled: bool) {
        match &self.bar {
            Some(bar) if cancelled => bar.abandon_with_message("cancelled"),
            Some(bar) => bar.finish(),
            None => {}
        }
    }

    fn line(&self, line: &str) {
        // `println` is a no-op on a hidden bar, `suspend` is not
        match &self.bar {
            Some(bar) => bar.suspend(|| eprintln!("{line}")),
            None => eprintln!("{line}"),
        }
    }
}

impl EventSink for StatusPrinter {
    fn emit(&self, event: &Event<'_>) {
        match *event {
            Event::StepStarted { address, step } if self.steps => {
                self.line(&format!("{address}: Checking - {step}..."));
            }
            Event::StepCompleted {
                address,
                step: Step::Smtp,
                status: CheckStatus::Fail,
                detail,
            } => {
                self.line(&format!(
                    "{address}: Warning - SMTP check failed: {}",
                    detail.unwrap_or_default()
                ));
            }
            Event::StepCompleted {
                address,
                step: Step::Mx,
                status: CheckStatus::Fail,
                detail,
            } => {
                self.line(&format!(
                    "{address}: Failed - No valid MX records: {}",
                    detail.unwrap_or_default()
                ));
            }
            Event::Verified { result } => self.line(&verdict_line(result)),
            Event::Progress { .. } => {
                if let Some(bar) = &self.bar {
                    bar.inc(1);
                }
            }
            _ => {}
        }
    }
}

pub fn verdict_line(result: &VerificationResult) -> String {
    let status = if result.is_valid() { "Valid" } else { "Invalid" };
    if !result.syntax_valid {
        return format!(
            "{}: {status} - {}",
            result.address,
            result.error_detail.as_deref().unwrap_or("invalid syntax")
        );
    }
    let disposable = if result.disposable_checked() {
        result.is_disposable.to_string()
    } else {
        "n/a".to_string()
    };
    format!(
        "{}: {status} - MX: {}, SMTP: {}, Disposable: {disposable}",
        result.address, result.mx_check, result.smtp_check
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_template_is_valid() {
        assert!(ProgressStyle::with_template(BAR_TEMPLATE).is_ok());
    }

    #[test]
    fn progress_events_advance_the_bar() {
        let bar = ProgressBar::hidden();
        bar.set_length(3);
        let printer = StatusPrinter::with_bar(false, bar.clone());
        for completed in 1..=3 {
            printer.emit(&Event::Progress { completed, total: 3 });
        }
        assert_eq!(bar.position(), 3);
        printer.finish(false);
        assert!(bar.is_finished());
    }

    #[test]
    fn cancelled_run_abandons_the_bar() {
        let bar = ProgressBar::hidden();
        bar.set_length(5);
        let printer = StatusPrinter::with_bar(false, bar.clone());
        printer.emit(&Event::Progress { completed: 1, total: 5 });
        printer.finish(true);
        assert!(bar.is_finished());
        assert_eq!(bar.position(), 1);
    }
}
