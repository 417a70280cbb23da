use serde::{Deserialize, Serialize};

pub mod referral_code;
pub mod referral_history;
pub mod reward;

/// Soft-delete flag shared by the referral tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, sqlx::Type)]
#[repr(i16)]
pub enum RecordStatus {
    Inactive = 0,
    Active = 1,
}
