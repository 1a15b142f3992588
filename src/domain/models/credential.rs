//! Service credentials tracked per team.

use serde::{Deserialize, Serialize};

/// A username/password pair a check uses against a team's service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub id: i64,
    pub team_id: i64,
    pub check_id: i64,
    pub username: String,
    pub password: String,
    /// True while the password is still the one handed out at the start.
    pub is_default: bool,
}

/// Fraction of a team's credentials still at their default value.
pub fn default_fraction(credentials: &[Credential]) -> Option<f64> {
    if credentials.is_empty() {
        return None;
    }
    let defaults = credentials.iter().filter(|c| c.is_default).count();
    #[allow(clippy::cast_precision_loss)]
    Some(defaults as f64 / credentials.len() as f64)
}
