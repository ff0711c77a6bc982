//! Prompt text sent to the language model
//!
//! Each prompt ends with the exact JSON shape the response must follow; the
//! client requests `application/json` output so the reply can be parsed
//! directly.

use vettrack_common::db::PetProfile;

const SYMPTOM_INSTRUCTIONS: &str = "You are a veterinary AI assistant. Analyze the pet symptoms below and give \
between 1 and 5 possible diagnoses, an urgency level (Low, Medium, High or Emergency), a recommendation \
and the possible causes. This does not replace professional veterinary care; recommend a veterinarian \
for anything serious. Respond ONLY with JSON in this format: \
{\"diagnosis\": [\"string\"], \"urgency_level\": \"string\", \"recommendation\": \"string\", \"possible_causes\": [\"string\"]}";

const IMAGE_INSTRUCTIONS: &str = "You are a veterinary AI assistant specializing in visual health assessment. \
First check whether the animal in the image matches the species, breed and age given below. On a mismatch, \
put a short warning starting with 'Warning:' as the FIRST diagnosis entry. Then list the possible diagnoses \
as plain condition names, most likely first, without qualifiers such as 'Most likely'. List possible \
underlying causes (for example mites, infection, immune deficiency) and always give a clear recommendation. \
Respond ONLY with valid JSON in this format: \
{\"diagnosis\": [\"string\"], \"condition_likelihood\": \"string\", \"recommendation\": \"string\", \"urgency_level\": \"string\", \"possible_causes\": [\"string\"]}";

const EXPLANATION_INSTRUCTIONS: &str = "You are a veterinary education assistant. Explain the pet health \
diagnosis below for a pet owner. This is educational only and does not replace professional veterinary care. \
Respond ONLY with JSON in this format: \
{\"description\": \"string\", \"causes\": [\"string\"], \"symptoms\": [\"string\"]}";

fn pet_block(pet: &PetProfile) -> String {
    let notes = pet
        .medical_notes
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or("None");

    format!(
        "Pet Information:\n- Name: {}\n- Species: {}\n- Breed: {}\n- Age: {} years\n- Medical Notes: {}",
        pet.name, pet.species, pet.breed, pet.age, notes
    )
}

pub fn symptom_prompt(pet: &PetProfile, symptoms: &str) -> String {
    format!(
        "{}\n\n{}\n\nCurrent Symptoms: {}\n\nPlease analyze these symptoms and provide your assessment.",
        SYMPTOM_INSTRUCTIONS,
        pet_block(pet),
        symptoms.trim()
    )
}

pub fn image_prompt(pet: &PetProfile, description: &str) -> String {
    let description = match description.trim() {
        "" => "No additional description provided",
        d => d,
    };

    format!(
        "{}\n\n{}\n\nAdditional Description: {}\n\nPlease analyze the image and provide your assessment.",
        IMAGE_INSTRUCTIONS,
        pet_block(pet),
        description
    )
}

pub fn explanation_prompt(diagnosis: &str) -> String {
    format!(
        "{}\n\nExplain the following pet health diagnosis: \"{}\"\n\n\
         Include:\n1. A clear description of the condition\n\
         2. 3 to 5 common causes\n3. 3 to 5 symptoms owners should watch for",
        EXPLANATION_INSTRUCTIONS,
        diagnosis.trim()
    )
}
