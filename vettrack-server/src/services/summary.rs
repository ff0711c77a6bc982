//! Plain-text consultation export

use vettrack_common::db::{Consultation, HealthHistoryEntry, PetProfile};

const DATE_FORMAT: &str = "%m/%d/%Y";

/// Download name for a pet's consultation summary
pub fn export_file_name(pet_name: &str) -> String {
    format!("{}_consultation.txt", super::uploads::sanitize_filename(pet_name))
}

/// Render the consultation summary document
///
/// `history` is written in the order given.
pub fn consultation_export(
    pet: &PetProfile,
    consultation: &Consultation,
    history: &[HealthHistoryEntry],
) -> String {
    let mut lines: Vec<String> = vec![
        "VETERINARY CONSULTATION SUMMARY".into(),
        String::new(),
        format!("Pet: {} ({} • {} • {} years)", pet.name, pet.species, pet.breed, pet.age),
        format!("Date: {}", consultation.date.format(DATE_FORMAT)),
        String::new(),
        "CONSULTATION NOTES:".into(),
    ];

    if consultation.summary.trim().is_empty() {
        lines.push("No notes recorded".into());
    } else {
        lines.extend(consultation.summary.lines().map(String::from));
    }
    lines.push(String::new());

    lines.push("MEDICAL HISTORY:".into());
    if history.is_empty() {
        lines.push("No previous medical notes".into());
    }
    for entry in history {
        lines.push(format!("Date: {}", entry.date.format(DATE_FORMAT)));
        lines.push(format!("Symptoms: {}", entry.symptoms));
        if !entry.diagnosis.is_empty() {
            lines.push(format!("Diagnosis: {}", entry.diagnosis.join(", ")));
        }
        if let Some(recommendation) = entry.recommendation.as_deref().filter(|r| !r.is_empty()) {
            lines.push(format!("Recommendation: {}", recommendation));
        }
        lines.push(String::new());
    }

    lines.push("Generated by VetTrack AI".into());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn pet() -> PetProfile {
        PetProfile {
            id: 3,
            user_id: 1,
            name: "Biscuit".into(),
            species: "Dog".into(),
            breed: "Corgi".into(),
            age: 6,
            medical_notes: None,
            profile_picture: None,
            created_at: Utc::now(),
        }
    }

    fn consultation(summary: &str) -> Consultation {
        Consultation {
            id: 1,
            pet_id: 3,
            user_id: 1,
            date: Utc.with_ymd_and_hms(2024, 3, 9, 14, 0, 0).unwrap(),
            summary: summary.into(),
            room_id: "room".into(),
        }
    }

    #[test]
    fn test_empty_export() {
        let text = consultation_export(&pet(), &consultation(""), &[]);
        assert!(text.starts_with("VETERINARY CONSULTATION SUMMARY\n"));
        assert!(text.contains("Pet: Biscuit (Dog • Corgi • 6 years)"));
        assert!(text.contains("Date: 03/09/2024"));
        assert!(text.contains("CONSULTATION NOTES:\nNo notes recorded"));
        assert!(text.contains("MEDICAL HISTORY:\nNo previous medical notes"));
        assert!(text.ends_with("Generated by VetTrack AI"));
    }

    #[test]
    fn test_export_with_history() {
        let history = vec![HealthHistoryEntry {
            id: 1,
            pet_id: 3,
            date: Utc.with_ymd_and_hms(2024, 2, 1, 8, 0, 0).unwrap(),
            symptoms: "Limping".into(),
            diagnosis: vec!["Sprain".into(), "Arthritis".into()],
            recommendation: Some("Rest".into()),
            urgency_level: Some("Low".into()),
            possible_causes: Vec::new(),
        }];

        let text = consultation_export(&pet(), &consultation("Line one\nLine two"), &history);
        assert!(text.contains("CONSULTATION NOTES:\nLine one\nLine two\n"));
        assert!(text.contains("Date: 02/01/2024\nSymptoms: Limping\nDiagnosis: Sprain, Arthritis\nRecommendation: Rest"));
        assert!(!text.contains("No previous medical notes"));
    }

    #[test]
    fn test_export_file_name() {
        assert_eq!(export_file_name("Mr Whiskers"), "Mr_Whiskers_consultation.txt");
    }
}
