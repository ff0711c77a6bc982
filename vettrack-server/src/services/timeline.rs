//! Merged per-pet timeline of health entries, consultations and reminders
//!
//! Window rules, relative to `now`:
//! - health entries: within the last 30 days, or urgency High/Emergency
//! - consultations: within the last 60 days
//! - reminders: due in the future, or completed and due within the last 7 days

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use vettrack_common::db::{Consultation, HealthHistoryEntry, Reminder};

const HEALTH_WINDOW_DAYS: i64 = 30;
const CONSULTATION_WINDOW_DAYS: i64 = 60;
const COMPLETED_REMINDER_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TimelineItem {
    Health {
        id: i64,
        date: DateTime<Utc>,
        symptoms: String,
        diagnosis: Vec<String>,
        recommendation: Option<String>,
        urgency_level: Option<String>,
        possible_causes: Vec<String>,
    },
    Consultation {
        id: i64,
        date: DateTime<Utc>,
        summary: String,
        room_id: String,
    },
    Reminder {
        id: i64,
        date: DateTime<Utc>,
        title: String,
        completed: bool,
    },
}

impl TimelineItem {
    pub fn date(&self) -> DateTime<Utc> {
        match self {
            TimelineItem::Health { date, .. }
            | TimelineItem::Consultation { date, .. }
            | TimelineItem::Reminder { date, .. } => *date,
        }
    }
}

fn is_urgent(urgency_level: Option<&str>) -> bool {
    urgency_level
        .map(|u| u.trim().to_ascii_lowercase())
        .is_some_and(|u| u == "high" || u == "emergency")
}

pub fn build_timeline(
    now: DateTime<Utc>,
    history: &[HealthHistoryEntry],
    consultations: &[Consultation],
    reminders: &[Reminder],
) -> Vec<TimelineItem> {
    let health_cutoff = now - Duration::days(HEALTH_WINDOW_DAYS);
    let consultation_cutoff = now - Duration::days(CONSULTATION_WINDOW_DAYS);
    let reminder_cutoff = now - Duration::days(COMPLETED_REMINDER_WINDOW_DAYS);

    let health = history
        .iter()
        .filter(|h| h.date >= health_cutoff || is_urgent(h.urgency_level.as_deref()))
        .map(|h| TimelineItem::Health {
            id: h.id,
            date: h.date,
            symptoms: h.symptoms.clone(),
            diagnosis: h.diagnosis.clone(),
            recommendation: h.recommendation.clone(),
            urgency_level: h.urgency_level.clone(),
            possible_causes: h.possible_causes.clone(),
        });

    let consults = consultations
        .iter()
        .filter(|c| c.date >= consultation_cutoff)
        .map(|c| TimelineItem::Consultation {
            id: c.id,
            date: c.date,
            summary: c.summary.clone(),
            room_id: c.room_id.clone(),
        });

    let upcoming = reminders
        .iter()
        .filter(|r| r.due_date >= now || (r.completed && r.due_date >= reminder_cutoff))
        .map(|r| TimelineItem::Reminder {
            id: r.id,
            date: r.due_date,
            title: r.title.clone(),
            completed: r.completed,
        });

    let mut timeline: Vec<TimelineItem> = health.chain(consults).chain(upcoming).collect();
    timeline.sort_by(|a, b| b.date().cmp(&a.date()));
    timeline
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: i64, days_ago: i64, urgency: Option<&str>, now: DateTime<Utc>) -> HealthHistoryEntry {
        HealthHistoryEntry {
            id,
            pet_id: 1,
            date: now - Duration::days(days_ago),
            symptoms: format!("entry {}", id),
            diagnosis: vec!["Something".into()],
            recommendation: None,
            urgency_level: urgency.map(String::from),
            possible_causes: Vec::new(),
        }
    }

    fn reminder(id: i64, due_in_days: i64, completed: bool, now: DateTime<Utc>) -> Reminder {
        Reminder {
            id,
            pet_id: 1,
            title: format!("reminder {}", id),
            due_date: now + Duration::days(due_in_days),
            completed,
            completed_date: None,
            created_at: now,
        }
    }

    fn consultation(id: i64, days_ago: i64, now: DateTime<Utc>) -> Consultation {
        Consultation {
            id,
            pet_id: 1,
            user_id: 1,
            date: now - Duration::days(days_ago),
            summary: String::new(),
            room_id: "room".into(),
        }
    }

    fn ids(items: &[TimelineItem]) -> Vec<(String, i64)> {
        items
            .iter()
            .map(|item| match item {
                TimelineItem::Health { id, .. } => ("health".to_string(), *id),
                TimelineItem::Consultation { id, .. } => ("consultation".to_string(), *id),
                TimelineItem::Reminder { id, .. } => ("reminder".to_string(), *id),
            })
            .collect()
    }

    #[test]
    fn test_health_window_and_urgent_entries() {
        let now = Utc::now();
        let history = vec![
            entry(1, 5, Some("Low"), now),
            entry(2, 45, Some("Low"), now),
            entry(3, 90, Some("High"), now),
            entry(4, 120, Some("Emergency"), now),
            entry(5, 200, None, now),
        ];

        let timeline = build_timeline(now, &history, &[], &[]);
        assert_eq!(
            ids(&timeline),
            vec![
                ("health".to_string(), 1),
                ("health".to_string(), 3),
                ("health".to_string(), 4)
            ]
        );
    }

    #[test]
    fn test_reminder_and_consultation_windows() {
        let now = Utc::now();
        let reminders = vec![
            reminder(1, 3, false, now),
            reminder(2, -3, true, now),
            reminder(3, -3, false, now),
            reminder(4, -10, true, now),
        ];
        let consultations = vec![consultation(1, 10, now), consultation(2, 61, now)];

        let timeline = build_timeline(now, &[], &consultations, &reminders);
        assert_eq!(
            ids(&timeline),
            vec![
                ("reminder".to_string(), 1),
                ("reminder".to_string(), 2),
                ("consultation".to_string(), 1)
            ]
        );
    }

    #[test]
    fn test_sorted_newest_first_and_tagged() {
        let now = Utc::now();
        let timeline = build_timeline(
            now,
            &[entry(1, 2, None, now)],
            &[consultation(7, 1, now)],
            &[reminder(9, 1, false, now)],
        );

        let dates: Vec<_> = timeline.iter().map(TimelineItem::date).collect();
        let mut sorted = dates.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(dates, sorted);

        let json = serde_json::to_value(&timeline).unwrap();
        assert_eq!(json[0]["type"], "reminder");
        assert_eq!(json[1]["type"], "consultation");
        assert_eq!(json[2]["type"], "health");
    }
}
