use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passenger {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub full_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    /// Exactly one seat per passenger; the store rejects a second passenger
    /// pointing at the same seat.
    pub seat_id: Uuid,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    Male,
    Female,
    Other,
    Unspecified,
}

/// Inbound passenger details for booking creation: who they are and which
/// seat they want.
#[derive(Debug, Clone, Deserialize)]
pub struct PassengerSpec {
    pub full_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub seat_id: Uuid,
}
