//! Video consultation room naming

/// Room name for an ad-hoc consultation started at `unix_seconds`
pub fn consultation_room_id(pet_id: i64, unix_seconds: i64) -> String {
    format!("PetHealth_{}_{}", pet_id, unix_seconds)
}

/// Join URL for a room on the configured conferencing host
pub fn room_url(video_base_url: &str, room_id: &str) -> String {
    format!("{}/{}", video_base_url.trim_end_matches('/'), room_id)
}
