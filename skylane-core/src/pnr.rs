use uuid::Uuid;

/// Length of a public booking reference.
pub const PNR_LENGTH: usize = 10;

/// Generate a booking reference: the first 10 hex characters of a random
/// UUID, uppercased. Collisions are treated as negligible and not re-rolled
/// here; the store's unique constraint on the PNR column catches the rare
/// clash and the caller retries.
pub fn generate() -> String {
    Uuid::new_v4().simple().to_string()[..PNR_LENGTH].to_ascii_uppercase()
}
