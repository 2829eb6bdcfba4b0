use serde::{Deserialize, Serialize};

/// Participant reference as stored inside directory entries.
///
/// `id` is the identity provider's opaque user id; `name` is the display name
/// at the time the entry was written (refreshed on later activity).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    #[serde(rename = "uid")]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl UserRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_shape_uses_uid() {
        let user = UserRef::new("u1", "Robin");
        assert_eq!(
            serde_json::to_value(&user).unwrap(),
            json!({ "uid": "u1", "name": "Robin" })
        );
    }

    #[test]
    fn test_missing_name_defaults_to_empty() {
        let user: UserRef = serde_json::from_value(json!({ "uid": "u1" })).unwrap();
        assert_eq!(user.name, "");
    }
}
