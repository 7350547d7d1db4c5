//! Status-page groups, desired and observed.

use serde::{Deserialize, Serialize};

/// A desired status-page group: a name and the ordered monitor names it
/// contains. Member names are resolved to service ids at rebuild time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSpec {
    /// Name of the group, unique within the catalog.
    pub name: String,
    /// Monitor names belonging to this group, in display order.
    pub members: Vec<String>,
}

/// A single monitor reference inside a published group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    /// Service-assigned id of the monitor.
    #[serde(rename = "monitorId")]
    pub monitor_id: i64,
}

/// A group as published on the status page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedGroup {
    /// Display name of the group.
    pub name: String,
    /// Sort rank; lower sorts first.
    pub weight: i64,
    /// Monitors shown in the group.
    #[serde(rename = "monitorList", default)]
    pub members: Vec<GroupMember>,
}

/// The status-page configuration together with its published groups.
///
/// The configuration object is treated as opaque: the write-back contract is
/// a full replace of configuration plus group list, so everything fetched
/// must be sent back untouched apart from the groups.
#[derive(Debug, Clone)]
pub struct StatusPage {
    /// The page configuration as returned by the service, preserved verbatim.
    pub config: serde_json::Value,
    /// The currently published groups, in display order.
    pub groups: Vec<ObservedGroup>,
}

impl StatusPage {
    /// The icon recorded in the page configuration, falling back to the
    /// service default. The save operation requires it as a separate field.
    pub fn icon(&self) -> &str {
        self.config
            .get("icon")
            .and_then(|v| v.as_str())
            .unwrap_or("/icon.svg")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn group_wire_field_names() {
        let group = ObservedGroup {
            name: "Public Sites".into(),
            weight: 1,
            members: vec![GroupMember { monitor_id: 7 }],
        };
        let value = serde_json::to_value(&group).unwrap();
        assert_eq!(value["monitorList"][0]["monitorId"], 7);
    }

    #[test]
    fn icon_falls_back_to_default() {
        let page = StatusPage { config: json!({"title": "Status"}), groups: vec![] };
        assert_eq!(page.icon(), "/icon.svg");

        let page = StatusPage { config: json!({"icon": "/custom.png"}), groups: vec![] };
        assert_eq!(page.icon(), "/custom.png");
    }
}
