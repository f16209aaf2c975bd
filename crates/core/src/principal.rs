use serde::{Deserialize, Serialize};

use crate::types::DbId;

/// The reduced, token-safe projection of a stored identity.
///
/// Carried inside access tokens and recovered from them on every request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
    pub subject_id: String,
    pub role: String,
}

impl Principal {
    pub fn new(subject_id: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            role: role.into(),
        }
    }

    /// Interpret the subject as a database id, if it is one.
    pub fn db_id(&self) -> Option<DbId> {
        self.subject_id.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_subject_parses_as_db_id() {
        assert_eq!(Principal::new("42", "user").db_id(), Some(42));
        assert_eq!(Principal::new("svc-backup", "admin").db_id(), None);
    }
}
