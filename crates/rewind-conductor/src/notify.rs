use rewind_core::RepoOutcome;

/// Operator-facing progress lines.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str);
}

/// Prints to stdout.
pub struct StdoutNotifier;

#[async_trait::async_trait]
impl Notifier for StdoutNotifier {
    async fn notify(&self, message: &str) {
        println!("{message}");
    }
}

/// Collects messages in memory (for testing).
pub struct CollectNotifier {
    messages: std::sync::Mutex<Vec<String>>,
}

impl Default for CollectNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl CollectNotifier {
    pub fn new() -> Self {
        Self {
            messages: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Notifier for CollectNotifier {
    async fn notify(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

/// `[3/12] hw1-Doe-Jane: completed (5.00)` or `... : clone failed: <reason>`.
pub fn progress_line(done: usize, total: usize, name: &str, outcome: &RepoOutcome) -> String {
    let label = outcome.kind().label();
    match (outcome.average_insertions(), outcome.reason()) {
        (Some(avg), _) => format!("[{done}/{total}] {name}: {label} ({avg:.2})"),
        (None, Some(reason)) => format!("[{done}/{total}] {name}: {label}: {reason}"),
        (None, None) => format!("[{done}/{total}] {name}: {label}"),
    }
}
