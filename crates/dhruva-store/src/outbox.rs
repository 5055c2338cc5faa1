use crate::error::StoreError;
use dhruva_core::notification::NotificationEvent;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

/// Append-only JSON-lines file of rendered notifications for the delivery
/// worker.
pub struct Outbox {
    path: PathBuf,
}

impl Outbox {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn append(&self, events: &[NotificationEvent]) -> Result<(), StoreError> {
        if events.is_empty() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut buf = Vec::new();
        for event in events {
            serde_json::to_writer(&mut buf, event)?;
            buf.push(b'\n');
        }
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(&buf)?;
        file.sync_all()?;
        for event in events {
            tracing::info!(case = %event.case_id, trigger = %event.trigger_type, "notification queued");
        }
        Ok(())
    }

    pub fn read_all(&self) -> Result<Vec<NotificationEvent>, StoreError> {
        let file = match fs::File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut events = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            events.push(serde_json::from_str(&line)?);
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use dhruva_core::case::CaseId;
    use dhruva_core::notification::TriggerType;

    fn event(trigger: TriggerType) -> NotificationEvent {
        NotificationEvent {
            case_id: CaseId::parse("PGRS-2025-GTR-00001").unwrap(),
            trigger_type: trigger,
            rendered_message_en: "Your case #PGRS-2025-GTR-00001 is 5 days old".into(),
            rendered_message_te: "మీ కేసు #PGRS-2025-GTR-00001".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn appends_across_calls() {
        let dir = tempfile::tempdir().unwrap();
        let outbox = Outbox::new(dir.path().join("outbox").join("notifications.jsonl"));
        assert!(outbox.read_all().unwrap().is_empty());

        outbox.append(&[event(TriggerType::Sla50Percent)]).unwrap();
        outbox
            .append(&[event(TriggerType::SlaApproaching), event(TriggerType::NoUpdateNDays)])
            .unwrap();

        let all = outbox.read_all().unwrap();
        let kinds: Vec<TriggerType> = all.iter().map(|e| e.trigger_type).collect();
        assert_eq!(
            kinds,
            vec![
                TriggerType::Sla50Percent,
                TriggerType::SlaApproaching,
                TriggerType::NoUpdateNDays
            ]
        );
        assert_eq!(all[0].rendered_message_te, "మీ కేసు #PGRS-2025-GTR-00001");
    }

    #[test]
    fn empty_append_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notifications.jsonl");
        Outbox::new(&path).append(&[]).unwrap();
        assert!(!path.exists());
    }
}
