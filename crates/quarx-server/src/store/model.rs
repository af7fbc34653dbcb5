use serde::{Deserialize, Serialize};

pub const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicenseRecord {
    pub key: String,
    pub license_type: String,
    pub created_at: i64,
    pub expires_at: i64,
    pub is_used: bool,
    pub used_by: Option<String>,
    pub hardware_id: Option<String>,
    pub last_checked_at: Option<i64>,
}

impl LicenseRecord {
    pub fn new(key: &str, license_type: &str, expires_at: i64, now: i64) -> Self {
        Self {
            key: key.to_owned(),
            license_type: license_type.to_owned(),
            created_at: now,
            expires_at,
            is_used: false,
            used_by: None,
            hardware_id: None,
            last_checked_at: None,
        }
    }

    /// Returns true if this license has expired. The boundary is strict: a
    /// license expiring exactly now is still valid.
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at < now
    }

    /// Whole days until expiry, floored. Negative once expired: `div_euclid`
    /// rounds toward negative infinity, so one hour past expiry is day -1.
    pub fn days_remaining(&self, now: i64) -> i64 {
        (self.expires_at - now).div_euclid(SECONDS_PER_DAY)
    }

    /// Records a successful validation check.
    pub fn touch(&mut self, now: i64) {
        self.last_checked_at = Some(now);
    }

    /// Binds this license to a user and machine. Re-activation overwrites the
    /// previous binding; `is_used` never reverts to false.
    pub fn activate(&mut self, username: Option<&str>, hardware_id: Option<&str>, now: i64) {
        self.is_used = true;
        self.used_by = Some(username.unwrap_or("unknown").to_owned());
        self.hardware_id = hardware_id.map(str::to_owned);
        self.last_checked_at = Some(now);
    }
}
