//! The live client implementation over a [`Session`].

use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use serde_json::{Value, json};

use super::{ClientError, MonitorApi};
use crate::{
    models::{MonitorKind, MonitorSpec, ObservedGroup, ObservedMonitor, StatusPage},
    transport::Session,
};

/// Classifies a service error message as a name-uniqueness violation.
///
/// The protocol exposes no structured error code for this, so the fragile
/// substring heuristic lives here and nowhere else.
pub fn is_duplicate_name(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("already exists") || message.contains("unique constraint")
}

/// A typed client over one authenticated session.
pub struct ServiceClient {
    session: Session,
    request_timeout: Duration,
    settle_delay: Duration,
    authenticated: AtomicBool,
}

impl ServiceClient {
    /// Wraps a connected session. The client is not usable until
    /// [`ServiceClient::login`] succeeds.
    pub fn new(session: Session, request_timeout: Duration, settle_delay: Duration) -> Self {
        Self { session, request_timeout, settle_delay, authenticated: AtomicBool::new(false) }
    }

    /// Authenticates the session. Must be awaited before any other
    /// operation.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), ClientError> {
        let payload = json!({ "username": username, "password": password, "token": "" });
        let reply = self.session.request("login", payload, self.request_timeout).await?;

        if reply_ok(&reply) {
            self.authenticated.store(true, Ordering::SeqCst);
            tracing::info!(username, "Authenticated");
            Ok(())
        } else {
            Err(ClientError::AuthRejected(reply_msg(&reply)))
        }
    }

    /// Releases the session. Safe to call multiple times; must run on every
    /// exit path.
    pub async fn close(&self) {
        self.session.close().await;
    }

    fn ensure_authenticated(&self) -> Result<(), ClientError> {
        if self.authenticated.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ClientError::NotAuthenticated)
        }
    }

    async fn call(&self, operation: &str, payload: Value) -> Result<Value, ClientError> {
        self.ensure_authenticated()?;
        let reply = self.session.request(operation, payload, self.request_timeout).await?;
        if reply_ok(&reply) {
            Ok(reply)
        } else {
            Err(ClientError::Rejected {
                operation: operation.to_string(),
                message: reply_msg(&reply),
            })
        }
    }
}

#[async_trait]
impl MonitorApi for ServiceClient {
    async fn monitor_list(&self) -> Result<BTreeMap<i64, ObservedMonitor>, ClientError> {
        self.ensure_authenticated()?;

        // Register the push waiter before triggering the bulk push, then
        // give the registration a moment to settle. The first matching push
        // is the response to this logical operation.
        let subscription = self.session.subscribe("monitorList").await;
        tokio::time::sleep(self.settle_delay).await;
        self.call("getMonitorList", json!({})).await?;
        let push = subscription.recv(self.request_timeout).await?;

        parse_monitor_map(&push)
    }

    async fn create_monitor(&self, spec: &MonitorSpec) -> Result<i64, ClientError> {
        let reply = self.call("add", monitor_payload(spec)).await?;
        reply
            .get("monitorID")
            .and_then(Value::as_i64)
            .ok_or_else(|| ClientError::MalformedResponse {
                operation: "add".to_string(),
                detail: "missing monitorID".to_string(),
            })
    }

    async fn update_monitor(&self, id: i64, spec: &MonitorSpec) -> Result<(), ClientError> {
        let mut payload = monitor_payload(spec);
        payload["id"] = json!(id);
        self.call("editMonitor", payload).await?;
        Ok(())
    }

    async fn delete_monitor(&self, id: i64) -> Result<(), ClientError> {
        self.call("deleteMonitor", json!({ "id": id })).await?;
        Ok(())
    }

    async fn status_page(&self, slug: &str) -> Result<StatusPage, ClientError> {
        let reply = self.call("getStatusPage", json!({ "slug": slug })).await?;

        let config = reply.get("config").filter(|v| !v.is_null()).cloned().ok_or_else(|| {
            ClientError::MalformedResponse {
                operation: "getStatusPage".to_string(),
                detail: "missing base configuration".to_string(),
            }
        })?;
        let groups = reply
            .get("publicGroupList")
            .cloned()
            .map(serde_json::from_value::<Vec<ObservedGroup>>)
            .transpose()
            .map_err(|e| ClientError::MalformedResponse {
                operation: "getStatusPage".to_string(),
                detail: format!("bad group list: {e}"),
            })?
            .unwrap_or_default();

        Ok(StatusPage { config, groups })
    }

    async fn save_status_page(
        &self,
        slug: &str,
        page: &StatusPage,
        groups: &[ObservedGroup],
    ) -> Result<(), ClientError> {
        let payload = json!({
            "slug": slug,
            "config": page.config,
            "imgDataUrl": page.icon(),
            "publicGroupList": groups,
        });
        self.call("saveStatusPage", payload).await?;
        Ok(())
    }
}

fn reply_ok(reply: &Value) -> bool {
    reply.get("ok").and_then(Value::as_bool).unwrap_or(false)
}

fn reply_msg(reply: &Value) -> String {
    reply
        .get("msg")
        .and_then(Value::as_str)
        .unwrap_or("no error message supplied")
        .to_string()
}

/// Maps a desired spec onto the service's wire field names.
fn monitor_payload(spec: &MonitorSpec) -> Value {
    let notification_ids: BTreeMap<String, bool> =
        spec.notification_ids.iter().map(|id| (id.to_string(), true)).collect();

    let mut payload = json!({
        "type": spec.kind.to_string(),
        "name": spec.name,
        "interval": spec.check_interval_secs,
        "retryInterval": spec.retry_interval_secs,
        "maxretries": spec.max_retries,
        "timeout": spec.timeout_secs,
        "accepted_statuscodes": spec.accepted_status_codes,
        "notificationIDList": notification_ids,
        "active": spec.active,
    });

    match spec.kind {
        MonitorKind::Http => {
            payload["url"] = json!(spec.target);
            payload["expiryNotification"] = json!(spec.certificate_expiry_check);
        }
        MonitorKind::Dns => {
            payload["hostname"] = json!(spec.target);
            payload["dns_resolve_type"] = json!(spec.dns_record_type);
            payload["dns_resolve_server"] = json!(spec.dns_resolver);
        }
    }

    payload
}

fn parse_monitor_map(push: &Value) -> Result<BTreeMap<i64, ObservedMonitor>, ClientError> {
    let entries = push.as_object().ok_or_else(|| ClientError::MalformedResponse {
        operation: "getMonitorList".to_string(),
        detail: "push payload is not an object".to_string(),
    })?;

    let mut monitors = BTreeMap::new();
    for (key, value) in entries {
        let Ok(id) = key.parse::<i64>() else {
            tracing::debug!(key = %key, "Skipping monitor entry with non-numeric id");
            continue;
        };
        match parse_observed(id, value) {
            Some(monitor) => {
                monitors.insert(id, monitor);
            }
            None => {
                // Monitors of kinds this system does not manage (created by
                // other owners) are left alone.
                tracing::debug!(id, "Skipping monitor entry of unmanaged kind");
            }
        }
    }
    Ok(monitors)
}

fn parse_observed(id: i64, value: &Value) -> Option<ObservedMonitor> {
    let name = value.get("name")?.as_str()?.to_string();
    let kind = match value.get("type")?.as_str()? {
        "http" => MonitorKind::Http,
        "dns" => MonitorKind::Dns,
        _ => return None,
    };
    let target = match kind {
        MonitorKind::Http => value.get("url")?.as_str()?.to_string(),
        MonitorKind::Dns => value.get("hostname")?.as_str()?.to_string(),
    };

    let accepted_status_codes = value
        .get("accepted_statuscodes")
        .and_then(Value::as_array)
        .map(|codes| {
            codes.iter().filter_map(Value::as_str).map(str::to_string).collect::<Vec<_>>()
        })
        .unwrap_or_default();
    let notification_ids = value
        .get("notificationIDList")
        .and_then(Value::as_object)
        .map(|ids| {
            let mut ids: Vec<i64> = ids
                .iter()
                .filter(|(_, enabled)| enabled.as_bool().unwrap_or(false))
                .filter_map(|(id, _)| id.parse().ok())
                .collect();
            ids.sort_unstable();
            ids
        })
        .unwrap_or_default();

    let spec = MonitorSpec {
        name,
        kind,
        target,
        check_interval_secs: value.get("interval").and_then(Value::as_u64).unwrap_or(60),
        retry_interval_secs: value.get("retryInterval").and_then(Value::as_u64).unwrap_or(60),
        max_retries: value.get("maxretries").and_then(Value::as_u64).unwrap_or(3),
        timeout_secs: value.get("timeout").and_then(Value::as_u64).unwrap_or(48),
        accepted_status_codes,
        certificate_expiry_check: value
            .get("expiryNotification")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        dns_record_type: value
            .get("dns_resolve_type")
            .and_then(Value::as_str)
            .map(str::to_string),
        dns_resolver: value
            .get("dns_resolve_server")
            .and_then(Value::as_str)
            .map(str::to_string),
        notification_ids,
        active: value.get("active").and_then(Value::as_bool).unwrap_or(true),
    };

    Some(ObservedMonitor { id, spec })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    ////////////////////////////////////////////////////////////
    // duplicate-name classification tests
    ////////////////////////////////////////////////////////////

    #[test]
    fn duplicate_name_matches_known_markers() {
        assert!(is_duplicate_name("Monitor 'SSL abemon.es' already exists"));
        assert!(is_duplicate_name("SQLITE_CONSTRAINT: UNIQUE constraint failed: monitor.name"));
        assert!(is_duplicate_name("Already Exists"));
    }

    #[test]
    fn duplicate_name_ignores_other_errors() {
        assert!(!is_duplicate_name("Internal server error"));
        assert!(!is_duplicate_name("Invalid hostname"));
        assert!(!is_duplicate_name(""));
    }

    ////////////////////////////////////////////////////////////
    // wire mapping tests
    ////////////////////////////////////////////////////////////

    fn http_spec() -> MonitorSpec {
        serde_json::from_value(json!({
            "name": "SSL abemon.es",
            "kind": "http",
            "target": "https://abemon.es",
            "accepted_status_codes": ["200-299", "301"],
            "certificate_expiry_check": true,
            "notification_ids": [2, 1],
        }))
        .unwrap()
    }

    #[test]
    fn http_payload_uses_service_field_names() {
        let payload = monitor_payload(&http_spec());

        assert_eq!(payload["type"], "http");
        assert_eq!(payload["url"], "https://abemon.es");
        assert_eq!(payload["expiryNotification"], true);
        assert_eq!(payload["accepted_statuscodes"][0], "200-299");
        assert_eq!(payload["notificationIDList"]["1"], true);
        assert_eq!(payload["notificationIDList"]["2"], true);
        assert!(payload.get("hostname").is_none());
    }

    #[test]
    fn dns_payload_uses_hostname_and_resolver_fields() {
        let spec: MonitorSpec = serde_json::from_value(json!({
            "name": "DNS abemon.es",
            "kind": "dns",
            "target": "abemon.es",
            "dns_record_type": "A",
            "dns_resolver": "1.1.1.1",
        }))
        .unwrap();
        let payload = monitor_payload(&spec);

        assert_eq!(payload["type"], "dns");
        assert_eq!(payload["hostname"], "abemon.es");
        assert_eq!(payload["dns_resolve_type"], "A");
        assert_eq!(payload["dns_resolve_server"], "1.1.1.1");
        assert!(payload.get("url").is_none());
    }

    #[test]
    fn observed_monitor_round_trips_through_wire_shape() {
        let observed = parse_observed(7, &monitor_payload(&http_spec())).unwrap();
        assert_eq!(observed.id, 7);
        assert_eq!(observed.name(), "SSL abemon.es");
        assert_eq!(observed.spec.kind, MonitorKind::Http);
        assert_eq!(observed.spec.target, "https://abemon.es");
        assert!(observed.spec.certificate_expiry_check);
        assert_eq!(observed.spec.notification_ids, vec![1, 2]);
    }

    #[test]
    fn monitor_map_skips_unmanaged_kinds() {
        let push = json!({
            "1": {"name": "SSL abemon.es", "type": "http", "url": "https://abemon.es"},
            "2": {"name": "smtp relay", "type": "port", "hostname": "smtp.abemon.es"},
        });
        let monitors = parse_monitor_map(&push).unwrap();
        assert_eq!(monitors.len(), 1);
        assert_eq!(monitors[&1].name(), "SSL abemon.es");
    }

    #[test]
    fn non_object_push_is_malformed() {
        let result = parse_monitor_map(&json!([1, 2, 3]));
        assert!(matches!(result, Err(ClientError::MalformedResponse { .. })));
    }
}
