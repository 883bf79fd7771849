use crate::app::ports::{Notification, NotificationLevel, Notifier};
use std::io::{self, Write};
use std::sync::Mutex;
use tracing::{error, info, warn};

/// Prints notifications to the terminal, one line each
pub struct ConsoleNotifier {
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleNotifier {
    pub fn stdout() -> Self {
        Self::with_writer(io::stdout())
    }

    /// For when stdout is reserved for machine-readable output
    pub fn stderr() -> Self {
        Self::with_writer(io::stderr())
    }

    pub fn with_writer(out: impl Write + Send + 'static) -> Self {
        Self { out: Mutex::new(Box::new(out)) }
    }
}

fn render(notification: &Notification) -> String {
    match notification.level {
        NotificationLevel::Success => format!("✅ {}", notification.message),
        NotificationLevel::Warning => format!("⚠️  {}", notification.message),
        NotificationLevel::Error => format!("❌ {}", notification.message),
    }
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Success => info!("{}", notification.message),
            NotificationLevel::Warning => warn!("{}", notification.message),
            NotificationLevel::Error => error!("{}", notification.message),
        }
        let mut out = self.out.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Err(e) = writeln!(out, "{}", render(&notification)) {
            warn!("Could not print notification: {}", e);
        }
    }
}

/// Keeps every notification in memory, in the order received
#[derive(Default)]
pub struct RecordingNotifier {
    received: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.received
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.notifications().into_iter().map(|n| n.message).collect()
    }

    pub fn count(&self, level: NotificationLevel) -> usize {
        self.notifications().iter().filter(|n| n.level == level).count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.received
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(notification);
    }
}
