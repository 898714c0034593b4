use serde::{Deserialize, Serialize};

/// The acting user as established by the identity provider at login.
///
/// Ownership and management are decided by display name, because that is
/// the only key stored on existing records. `subject_id` is carried along
/// and persisted, but never used for matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub subject_id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub manager_name: String,
}

impl Identity {
    pub fn new(
        subject_id: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            subject_id: subject_id.into(),
            name: name.into(),
            email: email.into(),
            manager_name: String::new(),
        }
    }

    pub fn with_manager(mut self, manager_name: impl Into<String>) -> Self {
        self.manager_name = manager_name.into();
        self
    }

    pub fn is_named(&self, stored_name: &str) -> bool {
        names_match(&self.name, stored_name)
    }
}

/// Case-insensitive display-name equality. An empty name on either side
/// never matches, so a record without a manager cannot be managed by anyone.
pub fn names_match(left: &str, right: &str) -> bool {
    !left.is_empty() && !right.is_empty() && name_key(left) == name_key(right)
}

/// The normalized form stored in the `*_key` columns and compared by queries.
pub fn name_key(name: &str) -> String {
    name.to_lowercase()
}
