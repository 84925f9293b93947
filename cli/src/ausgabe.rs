//! Darstellung der Client-Ereignisse auf stdout

use charm_protocol::{format_dauer, Event};

/// Eine Zeile pro Ereignis, als Text oder JSON
pub fn formatieren(event: &Event, json: bool) -> String {
    if json {
        return serde_json::to_string(event).unwrap_or_else(|e| {
            tracing::warn!(fehler = %e, "Ereignis nicht serialisierbar");
            format!("{event:?}")
        });
    }

    match event {
        Event::TaskActivated { task_id, name } => format!("Task {task_id} aktiviert: {name}"),
        Event::TaskDeactivated { task_id, name } => {
            format!("Task {task_id} deaktiviert: {name}")
        }
        Event::RecentTask {
            task_id,
            name,
            index,
        } => format!("{:>3}. {task_id} {name}", index + 1),
        Event::TaskStatus { task_id, seconds } => {
            format!("Task {task_id} laeuft seit {}", format_dauer(*seconds))
        }
        Event::ConnectionEstablished => "Verbunden".to_string(),
        Event::ConnectionClosed => "Verbindung geschlossen".to_string(),
        Event::ConnectionLost => "Verbindung verloren, neuer Versuch folgt".to_string(),
        Event::DiscoveryStarted => "Suche Server per Broadcast ...".to_string(),
        Event::DiscoveryFound { host } => format!("Server gefunden: {host}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use charm_protocol::TaskId;

    #[test]
    fn text_ausgabe() {
        let event = Event::TaskStatus {
            task_id: TaskId(42),
            seconds: 125,
        };
        assert_eq!(formatieren(&event, false), "Task 0042 laeuft seit 02:05");

        let event = Event::RecentTask {
            task_id: TaskId(1),
            name: "Email".into(),
            index: 0,
        };
        assert_eq!(formatieren(&event, false), "  1. 0001 Email");
    }

    #[test]
    fn json_ausgabe() {
        let event = Event::TaskActivated {
            task_id: TaskId(42),
            name: "Coding".into(),
        };
        let zeile = formatieren(&event, true);
        let wert: serde_json::Value = serde_json::from_str(&zeile).unwrap();
        assert_eq!(wert["type"], "task_activated");
        assert_eq!(wert["task_id"], 42);
        assert_eq!(wert["name"], "Coding");
    }
}
