//! The signed-in user's profile projection

use serde::{Deserialize, Serialize};

/// Who is signed in, as far as this client knows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Stable identifier of the user
    #[serde(rename = "subjectId")]
    pub subject_id: String,

    /// Email address
    pub email: String,

    /// Display name, if the profile has one
    #[serde(rename = "displayName", default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Partial profile update merged into a `Principal`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrincipalUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(rename = "displayName", default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl Principal {
    /// Merge a partial update into this principal; unset fields are kept
    pub fn merge(&mut self, update: &PrincipalUpdate) {
        if let Some(email) = &update.email {
            self.email = email.clone();
        }
        if let Some(display_name) = &update.display_name {
            self.display_name = Some(display_name.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_keeps_unset_fields() {
        let mut principal = Principal {
            subject_id: "u-1".to_string(),
            email: "old@example.com".to_string(),
            display_name: Some("Old Name".to_string()),
        };

        principal.merge(&PrincipalUpdate {
            email: Some("new@example.com".to_string()),
            display_name: None,
        });

        assert_eq!(principal.email, "new@example.com");
        assert_eq!(principal.display_name.as_deref(), Some("Old Name"));
        assert_eq!(principal.subject_id, "u-1");
    }
}
