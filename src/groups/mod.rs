//! Rebuilds status-page group membership from the reconciled monitors.
//!
//! Groups declared in the catalog are "owned" and fully replaced on every
//! run; every other group on the page is "foreign" and preserved verbatim,
//! in its original relative order. The write-back replaces the page's whole
//! group list atomically, as the protocol requires.

use std::collections::{HashMap, HashSet};

use crate::{
    catalog::Catalog,
    client::{ClientError, MonitorApi},
    models::{ObservedGroup, group::GroupMember},
};

/// What the rebuild did, for reporting.
#[derive(Debug, Clone, Default)]
pub struct GroupReport {
    /// Foreign groups preserved unchanged.
    pub preserved: usize,
    /// Owned groups published this run.
    pub published: usize,
    /// Owned groups omitted because no member name resolved.
    pub omitted: usize,
}

/// Derives and persists the merged group list for one status page.
pub struct GroupRebuilder<'a> {
    api: &'a dyn MonitorApi,
    slug: &'a str,
}

impl<'a> GroupRebuilder<'a> {
    /// Creates a rebuilder for the status page identified by `slug`.
    pub fn new(api: &'a dyn MonitorApi, slug: &'a str) -> Self {
        Self { api, slug }
    }

    /// Rebuilds the page's groups from a fresh post-reconciliation monitor
    /// snapshot.
    ///
    /// Member names with no observed monitor are dropped from their group; a
    /// group whose members all fail to resolve is omitted entirely. A page
    /// that cannot be fetched is fatal: there is no rebuild without a base
    /// configuration to preserve.
    pub async fn rebuild(&self, catalog: &Catalog) -> Result<GroupReport, ClientError> {
        let observed = self.api.monitor_list().await?;
        let ids_by_name: HashMap<&str, i64> =
            observed.values().map(|monitor| (monitor.name(), monitor.id)).collect();

        let page = self.api.status_page(self.slug).await?;

        let owned_names: HashSet<&str> =
            catalog.groups.iter().map(|group| group.name.as_str()).collect();
        let foreign: Vec<ObservedGroup> = page
            .groups
            .iter()
            .filter(|group| !owned_names.contains(group.name.as_str()))
            .cloned()
            .collect();

        // Owned groups sort after everything preserved. Published weights
        // are normally dense positions, in which case this is exactly
        // len(foreign); the max() keeps the ordering invariant when they
        // are not.
        let base_weight = foreign
            .iter()
            .map(|group| group.weight)
            .max()
            .unwrap_or(0)
            .max(foreign.len() as i64);

        let mut report =
            GroupReport { preserved: foreign.len(), published: 0, omitted: 0 };
        let mut merged = foreign;

        for spec in &catalog.groups {
            let members: Vec<GroupMember> = spec
                .members
                .iter()
                .filter_map(|name| match ids_by_name.get(name.as_str()) {
                    Some(&monitor_id) => Some(GroupMember { monitor_id }),
                    None => {
                        tracing::debug!(
                            group = %spec.name,
                            member = %name,
                            "Dropping group member with no observed monitor"
                        );
                        None
                    }
                })
                .collect();

            if members.is_empty() {
                tracing::debug!(group = %spec.name, "Omitting group with no resolvable members");
                report.omitted += 1;
                continue;
            }

            report.published += 1;
            merged.push(ObservedGroup {
                name: spec.name.clone(),
                weight: base_weight + report.published as i64,
                members,
            });
        }

        self.api.save_status_page(self.slug, &page, &merged).await?;
        tracing::info!(
            slug = self.slug,
            preserved = report.preserved,
            published = report.published,
            "Status-page groups rebuilt"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;

    use super::*;
    use crate::{
        catalog::MonitorSections,
        client::MockMonitorApi,
        models::{GroupSpec, MonitorSpec, ObservedMonitor, StatusPage},
    };

    fn observed(id: i64, name: &str) -> (i64, ObservedMonitor) {
        let spec: MonitorSpec = serde_json::from_value(json!({
            "name": name,
            "kind": "http",
            "target": format!("https://{}", name),
            "accepted_status_codes": ["200-299"],
        }))
        .unwrap();
        (id, ObservedMonitor { id, spec })
    }

    fn catalog_with_groups(groups: Vec<GroupSpec>) -> Catalog {
        Catalog { monitors: MonitorSections::default(), groups }
    }

    fn foreign_group(name: &str, weight: i64) -> ObservedGroup {
        ObservedGroup { name: name.into(), weight, members: vec![GroupMember { monitor_id: 99 }] }
    }

    #[tokio::test]
    async fn foreign_groups_are_preserved_before_owned_ones() {
        let mut api = MockMonitorApi::new();
        api.expect_monitor_list()
            .returning(|| Ok(BTreeMap::from([observed(1, "a.example"), observed(2, "b.example")])));
        api.expect_status_page().returning(|_| {
            Ok(StatusPage { config: json!({"title": "Status"}), groups: vec![foreign_group("External", 1)] })
        });
        api.expect_save_status_page()
            .times(1)
            .withf(|slug, _, groups| {
                slug == "status"
                    && groups.len() == 2
                    && groups[0].name == "External"
                    && groups[1].name == "Observability"
                    && groups[1].weight > groups[0].weight
                    && groups[1].members.len() == 2
            })
            .returning(|_, _, _| Ok(()));

        let catalog = catalog_with_groups(vec![GroupSpec {
            name: "Observability".into(),
            members: vec!["a.example".into(), "b.example".into()],
        }]);

        let report = GroupRebuilder::new(&api, "status").rebuild(&catalog).await.unwrap();
        assert_eq!(report.preserved, 1);
        assert_eq!(report.published, 1);
    }

    #[tokio::test]
    async fn owned_group_on_the_page_is_replaced_not_duplicated() {
        let mut api = MockMonitorApi::new();
        api.expect_monitor_list()
            .returning(|| Ok(BTreeMap::from([observed(5, "a.example")])));
        api.expect_status_page().returning(|_| {
            Ok(StatusPage {
                config: json!({}),
                groups: vec![
                    foreign_group("External", 1),
                    ObservedGroup {
                        name: "Observability".into(),
                        weight: 2,
                        members: vec![GroupMember { monitor_id: 3 }],
                    },
                ],
            })
        });
        api.expect_save_status_page()
            .withf(|_, _, groups| {
                groups.len() == 2
                    && groups[1].name == "Observability"
                    && groups[1].members == vec![GroupMember { monitor_id: 5 }]
            })
            .returning(|_, _, _| Ok(()));

        let catalog = catalog_with_groups(vec![GroupSpec {
            name: "Observability".into(),
            members: vec!["a.example".into()],
        }]);

        let report = GroupRebuilder::new(&api, "status").rebuild(&catalog).await.unwrap();
        assert_eq!(report.preserved, 1);
        assert_eq!(report.published, 1);
    }

    #[tokio::test]
    async fn unresolved_members_are_dropped_and_empty_groups_omitted() {
        let mut api = MockMonitorApi::new();
        api.expect_monitor_list()
            .returning(|| Ok(BTreeMap::from([observed(1, "a.example")])));
        api.expect_status_page()
            .returning(|_| Ok(StatusPage { config: json!({}), groups: vec![] }));
        api.expect_save_status_page()
            .withf(|_, _, groups| {
                groups.len() == 1
                    && groups[0].name == "Partial"
                    && groups[0].members == vec![GroupMember { monitor_id: 1 }]
            })
            .returning(|_, _, _| Ok(()));

        let catalog = catalog_with_groups(vec![
            GroupSpec {
                name: "Partial".into(),
                members: vec!["a.example".into(), "renamed.example".into()],
            },
            GroupSpec { name: "Ghost".into(), members: vec!["gone.example".into()] },
        ]);

        let report = GroupRebuilder::new(&api, "status").rebuild(&catalog).await.unwrap();
        assert_eq!(report.published, 1);
        assert_eq!(report.omitted, 1);
    }

    #[tokio::test]
    async fn owned_weights_follow_catalog_order() {
        let mut api = MockMonitorApi::new();
        api.expect_monitor_list()
            .returning(|| Ok(BTreeMap::from([observed(1, "a.example"), observed(2, "b.example")])));
        api.expect_status_page().returning(|_| {
            Ok(StatusPage {
                config: json!({}),
                groups: vec![foreign_group("One", 1), foreign_group("Two", 2)],
            })
        });
        api.expect_save_status_page()
            .withf(|_, _, groups| {
                groups.len() == 4
                    && groups[2].name == "First"
                    && groups[2].weight == 3
                    && groups[3].name == "Second"
                    && groups[3].weight == 4
            })
            .returning(|_, _, _| Ok(()));

        let catalog = catalog_with_groups(vec![
            GroupSpec { name: "First".into(), members: vec!["a.example".into()] },
            GroupSpec { name: "Second".into(), members: vec!["b.example".into()] },
        ]);

        GroupRebuilder::new(&api, "status").rebuild(&catalog).await.unwrap();
    }

    #[tokio::test]
    async fn missing_base_configuration_is_fatal() {
        let mut api = MockMonitorApi::new();
        api.expect_monitor_list().returning(|| Ok(BTreeMap::new()));
        api.expect_status_page().returning(|_| {
            Err(ClientError::MalformedResponse {
                operation: "getStatusPage".into(),
                detail: "missing base configuration".into(),
            })
        });
        api.expect_save_status_page().times(0);

        let catalog = catalog_with_groups(vec![GroupSpec {
            name: "Observability".into(),
            members: vec!["a.example".into()],
        }]);

        let result = GroupRebuilder::new(&api, "status").rebuild(&catalog).await;
        assert!(result.is_err());
    }
}
