//! Sentences handed to the TTS endpoint

/// One-shot greeting played after login
pub fn welcome_greeting(full_name: &str) -> String {
    format!("Welcome back, {}!", full_name.trim())
}

/// Spoken summary of an analysis
///
/// Mismatch warnings (entries starting with ⚠) are read first as-is; at most
/// three conditions are listed.
pub fn analysis_announcement(pet_name: &str, diagnosis: &[String], urgency_level: &str) -> String {
    let (warnings, conditions): (Vec<&String>, Vec<&String>) =
        diagnosis.iter().partition(|d| d.starts_with('⚠'));

    let mut sentence = String::new();
    for warning in warnings {
        sentence.push_str(warning.trim_start_matches('⚠').trim());
        sentence.push(' ');
    }

    let conditions: Vec<&str> = conditions.iter().take(3).map(|d| d.as_str()).collect();
    match conditions.as_slice() {
        [] => sentence.push_str(&format!("Analysis for {} is complete.", pet_name)),
        [only] => sentence.push_str(&format!("Analysis for {}: possible {}.", pet_name, only)),
        [rest @ .., last] => sentence.push_str(&format!(
            "Analysis for {}: possible conditions include {} and {}.",
            pet_name,
            rest.join(", "),
            last
        )),
    }

    if !urgency_level.trim().is_empty() {
        sentence.push_str(&format!(" Urgency level: {}.", urgency_level.trim()));
    }
    sentence
}
