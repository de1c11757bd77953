//! Leveled log records for guard decisions.
//!
//! Guards log through the [`GuardLogger`] trait on two channels:
//! [`LogChannel::Security`] for blocked or rejected input and
//! [`LogChannel::Auth`] for session outcomes. [`TracingLogger`] forwards
//! records to `tracing` with the channel name as the event target, and
//! [`LogTrail`] keeps them in memory.

mod trail;

use std::fmt;

use tracing::Level;

pub use trail::LogTrail;

/// Which log stream a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogChannel {
    /// Security-relevant events: rate-limit blocks, rejected redirects
    Security,
    /// Authentication outcomes
    Auth,
}

impl LogChannel {
    /// The channel name, also used as the `tracing` target.
    pub fn as_str(self) -> &'static str {
        match self {
            LogChannel::Security => "security",
            LogChannel::Auth => "auth",
        }
    }
}

impl fmt::Display for LogChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One log entry: channel, level, message and context fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Stream the record belongs to
    pub channel: LogChannel,
    /// Severity
    pub level: Level,
    /// Human-readable message
    pub message: String,
    /// Context fields in insertion order
    pub fields: Vec<(&'static str, String)>,
}

impl LogRecord {
    /// Creates a record with no fields.
    pub fn new(channel: LogChannel, level: Level, message: impl Into<String>) -> Self {
        Self {
            channel,
            level,
            message: message.into(),
            fields: Vec::new(),
        }
    }

    /// Appends a context field.
    pub fn field(mut self, key: &'static str, value: impl fmt::Display) -> Self {
        self.fields.push((key, value.to_string()));
        self
    }

    /// Appends a context field when `value` is present.
    pub fn field_opt(self, key: &'static str, value: Option<impl fmt::Display>) -> Self {
        match value {
            Some(value) => self.field(key, value),
            None => self,
        }
    }

    /// Returns the value of field `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.channel, self.message)?;
        for (key, value) in &self.fields {
            write!(f, " {}={}", key, value)?;
        }
        Ok(())
    }
}

/// Sink for guard log records.
pub trait GuardLogger: Send + Sync {
    /// Emits one record.
    fn log(&self, record: LogRecord);
}

/// Forwards records to `tracing`.
///
/// The event target is the channel name (`security` or `auth`), so a
/// subscriber filter such as `security=warn,auth=info` selects them.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

macro_rules! emit {
    ($target:literal, $level:expr, $message:expr, $fields:expr) => {{
        let level = $level;
        if level == Level::ERROR {
            tracing::error!(target: $target, fields = %$fields, "{}", $message);
        } else if level == Level::WARN {
            tracing::warn!(target: $target, fields = %$fields, "{}", $message);
        } else if level == Level::INFO {
            tracing::info!(target: $target, fields = %$fields, "{}", $message);
        } else if level == Level::DEBUG {
            tracing::debug!(target: $target, fields = %$fields, "{}", $message);
        } else {
            tracing::trace!(target: $target, fields = %$fields, "{}", $message);
        }
    }};
}

impl GuardLogger for TracingLogger {
    fn log(&self, record: LogRecord) {
        let fields = FieldList(&record.fields);
        match record.channel {
            LogChannel::Security => emit!("security", record.level, record.message, fields),
            LogChannel::Auth => emit!("auth", record.level, record.message, fields),
        }
    }
}

struct FieldList<'a>(&'a [(&'static str, String)]);

impl fmt::Display for FieldList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}={}", key, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use tracing::{Event, Subscriber};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    use super::*;

    #[test]
    fn record_builder_keeps_field_order() {
        let record = LogRecord::new(LogChannel::Auth, Level::WARN, "Session check failed")
            .field("location", "/billing")
            .field("status", 401);

        assert_eq!(record.get("location"), Some("/billing"));
        assert_eq!(record.get("status"), Some("401"));
        assert_eq!(record.get("missing"), None);
        assert_eq!(
            record.to_string(),
            "[auth] Session check failed location=/billing status=401"
        );
    }

    #[test]
    fn channel_names() {
        assert_eq!(LogChannel::Security.as_str(), "security");
        assert_eq!(LogChannel::Auth.to_string(), "auth");
    }

    #[test]
    fn field_list_renders_space_separated_pairs() {
        let fields = vec![("a", "1".to_string()), ("b", "2".to_string())];

        assert_eq!(FieldList(&fields).to_string(), "a=1 b=2");
        assert_eq!(FieldList(&[]).to_string(), "");
    }

    #[test]
    fn field_opt_skips_missing_values() {
        let record = LogRecord::new(LogChannel::Auth, Level::INFO, "Guest check")
            .field_opt("location", None::<&str>)
            .field_opt("to", Some("/dashboard"));

        assert_eq!(record.get("location"), None);
        assert_eq!(record.get("to"), Some("/dashboard"));
        assert_eq!(record.fields.len(), 1);
    }

    #[derive(Clone, Default)]
    struct CaptureLayer {
        events: Arc<Mutex<Vec<(String, Level)>>>,
    }

    impl<S: Subscriber> Layer<S> for CaptureLayer {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            let metadata = event.metadata();
            self.events
                .lock()
                .unwrap()
                .push((metadata.target().to_string(), *metadata.level()));
        }
    }

    #[test]
    fn tracing_logger_maps_channel_to_target_and_level() {
        let capture = CaptureLayer::default();
        let subscriber = tracing_subscriber::registry().with(capture.clone());
        let levels = [Level::ERROR, Level::WARN, Level::INFO, Level::DEBUG, Level::TRACE];

        tracing::subscriber::with_default(subscriber, || {
            let logger = TracingLogger;
            for level in levels {
                logger.log(LogRecord::new(LogChannel::Security, level, "blocked").field("k", "v"));
                logger.log(LogRecord::new(LogChannel::Auth, level, "checked"));
            }
        });

        let expected: Vec<(String, Level)> = levels
            .iter()
            .flat_map(|level| {
                [
                    ("security".to_string(), *level),
                    ("auth".to_string(), *level),
                ]
            })
            .collect();
        assert_eq!(*capture.events.lock().unwrap(), expected);
    }
}
