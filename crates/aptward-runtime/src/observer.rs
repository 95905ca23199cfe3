use serde::Serialize;

/// Whether a notification reports progress on a unit or its completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Before,
    After,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressNotification {
    pub event_name: String,
    pub phase: Phase,
    pub percent: Option<f64>,
    pub label: Option<String>,
}

impl ProgressNotification {
    pub fn is_terminal(&self) -> bool {
        self.phase == Phase::After
    }
}

/// Receives progress notifications from the stream parser.
///
/// Notifications for one event name arrive in order, with the terminal one
/// last. Transport to a UI or bus is the implementor's business.
pub trait ProgressObserver {
    fn notify(&mut self, notification: ProgressNotification);
}

impl<F> ProgressObserver for F
where
    F: FnMut(ProgressNotification),
{
    fn notify(&mut self, notification: ProgressNotification) {
        self(notification);
    }
}

/// Collects every notification, in arrival order.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    pub notifications: Vec<ProgressNotification>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_event<'a>(
        &'a self,
        event_name: &'a str,
    ) -> impl Iterator<Item = &'a ProgressNotification> + 'a {
        self.notifications
            .iter()
            .filter(move |n| n.event_name == event_name)
    }
}

impl ProgressObserver for RecordingObserver {
    fn notify(&mut self, notification: ProgressNotification) {
        self.notifications.push(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(name: &str) -> ProgressNotification {
        ProgressNotification {
            event_name: name.to_owned(),
            phase: Phase::Before,
            percent: Some(10.0),
            label: None,
        }
    }

    #[test]
    fn closures_are_observers() {
        let mut seen = 0;
        {
            let mut obs = |_: ProgressNotification| seen += 1;
            obs.notify(update("a"));
            obs.notify(update("b"));
        }
        assert_eq!(seen, 2);
    }

    #[test]
    fn recording_filters_by_event() {
        let mut rec = RecordingObserver::new();
        rec.notify(update("a"));
        rec.notify(update("b"));
        rec.notify(update("a"));
        assert_eq!(rec.for_event("a").count(), 2);
    }

    #[test]
    fn phase_serializes_lowercase() {
        let json = serde_json::to_value(update("a")).unwrap();
        assert_eq!(json["phase"], "before");
        assert_eq!(json["event_name"], "a");
    }
}
