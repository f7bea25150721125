//! Compiled policy output.
//!
//! A [`Policy`] is everything a compilation produces: the ordered base rule
//! set, the separately compiled capabilities, and the declared tags.

use crate::Rule;
use serde::Serialize;
use std::collections::BTreeMap;

/// A typed attribute peers can assert, with optional named values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tag {
    pub name: String,
    pub id: u32,
    /// Value assumed when a peer asserts nothing.
    pub default: Option<u32>,
    pub enums: BTreeMap<String, u32>,
    pub flags: BTreeMap<String, u32>,
}

impl Tag {
    pub fn new(name: impl Into<String>, id: u32) -> Self {
        Self {
            name: name.into(),
            id,
            default: None,
            enums: BTreeMap::new(),
            flags: BTreeMap::new(),
        }
    }

    /// Get a flag mask by name.
    pub fn flag(&self, name: &str) -> Option<u32> {
        self.flags.get(name).copied()
    }

    /// Get an enum value by name.
    pub fn enum_value(&self, name: &str) -> Option<u32> {
        self.enums.get(name).copied()
    }
}

/// A named bundle of rules compiled independently of the base rule set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Capability {
    pub name: String,
    pub id: u32,
    /// Granted to members unless explicitly revoked.
    pub default: bool,
    pub rules: Vec<Rule>,
}

impl Capability {
    pub fn new(name: impl Into<String>, id: u32, default: bool) -> Self {
        Self {
            name: name.into(),
            id,
            default,
            rules: Vec::new(),
        }
    }
}

/// The full output of one compilation.
///
/// Capabilities and tags keep their declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Policy {
    pub rules: Vec<Rule>,
    #[serde(rename = "caps")]
    pub capabilities: Vec<Capability>,
    pub tags: Vec<Tag>,
}

impl Policy {
    // ==================== Capability Lookups ====================

    /// Get a capability by (lower-case) name.
    pub fn capability(&self, name: &str) -> Option<&Capability> {
        self.capabilities.iter().find(|c| c.name == name)
    }

    /// Get a capability by numeric ID.
    pub fn capability_by_id(&self, id: u32) -> Option<&Capability> {
        self.capabilities.iter().find(|c| c.id == id)
    }

    // ==================== Tag Lookups ====================

    /// Get a tag by (lower-case) name.
    pub fn tag(&self, name: &str) -> Option<&Tag> {
        self.tags.iter().find(|t| t.name == name)
    }

    /// Get a tag by numeric ID.
    pub fn tag_by_id(&self, id: u32) -> Option<&Tag> {
        self.tags.iter().find(|t| t.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Action;
    use serde_json::json;

    #[test]
    fn test_lookups_by_name_and_id() {
        // GIVEN
        let mut cap = Capability::new("superuser", 1000, true);
        cap.rules.push(Rule::from(Action::Accept));
        let policy = Policy {
            rules: vec![Rule::from(Action::Drop)],
            capabilities: vec![cap],
            tags: vec![Tag::new("department", 7)],
        };

        // THEN
        assert_eq!(policy.capability("superuser").unwrap().id, 1000);
        assert_eq!(policy.capability_by_id(1000).unwrap().name, "superuser");
        assert!(policy.capability_by_id(1).is_none());
        assert_eq!(policy.tag("department").unwrap().id, 7);
        assert_eq!(policy.tag_by_id(7).unwrap().name, "department");
        assert!(policy.tag("missing").is_none());
    }

    #[test]
    fn test_policy_serializes_caps_key() {
        // GIVEN
        let mut tag = Tag::new("role", 1);
        tag.enums.insert("admin".to_string(), 1);
        tag.default = Some(1);
        let policy = Policy {
            rules: vec![],
            capabilities: vec![Capability::new("c1", 2, false)],
            tags: vec![tag],
        };

        // WHEN
        let value = serde_json::to_value(&policy).unwrap();

        // THEN
        assert_eq!(value["caps"][0]["id"], json!(2));
        assert_eq!(value["caps"][0]["default"], json!(false));
        assert_eq!(value["tags"][0]["enums"]["admin"], json!(1));
        assert_eq!(value["tags"][0]["default"], json!(1));
    }
}
