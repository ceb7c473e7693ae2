//! The per-request dispatch state machine.

use crate::audit::AuditSink;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use txgate_core::{
    redact_params, DispatchOutcome, DispatchStatus, Error, HandlerResult, Identity,
    IdentifierGate, Result, Route,
};
use txgate_loader::SandboxedLoader;
use txgate_permissions::PermissionCache;
use txgate_routes::RouteTable;

/// Bounded best-effort window for the audit write.
const AUDIT_WRITE_TIMEOUT: Duration = Duration::from_secs(2);

/// Orchestrates route resolution, authorization, sandboxed execution, and
/// audit for a single incoming request.
///
/// Per request the flow is strictly linear: Resolving → RouteValidating →
/// Authorizing → Executing → Auditing → Done, with an error terminal
/// reachable from any state. Exactly one [`DispatchOutcome`] is recorded per
/// attempt regardless of where it terminated.
///
/// Errors are returned with their full variant so the transport layer can
/// classify them; callers must surface [`Error::client_message`] rather than
/// the `Display` form, which may carry internals for the logs.
pub struct Dispatcher {
    routes: Arc<RouteTable>,
    permissions: Arc<PermissionCache>,
    loader: Arc<SandboxedLoader>,
    audit: Arc<dyn AuditSink>,
    gate: IdentifierGate,
}

impl Dispatcher {
    pub fn new(
        routes: Arc<RouteTable>,
        permissions: Arc<PermissionCache>,
        loader: Arc<SandboxedLoader>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            routes,
            permissions,
            loader,
            audit,
            gate: IdentifierGate::default(),
        }
    }

    /// Replace the default identifier gate with a configured one.
    ///
    /// Must match the gate the loader was built with, or routes the loader
    /// would accept get rejected here first.
    #[must_use]
    pub fn with_identifier_gate(mut self, gate: IdentifierGate) -> Self {
        self.gate = gate;
        self
    }

    /// Whether both lookup structures have loaded; the process must not
    /// serve traffic before this is `true`.
    pub fn is_ready(&self) -> bool {
        self.routes.is_ready() && self.permissions.is_ready()
    }

    /// Dispatch with no deadline.
    pub async fn execute(&self, code: u32, identity: &Identity, params: Value) -> Result<HandlerResult> {
        self.execute_with_deadline(code, identity, params, None).await
    }

    /// Dispatch with an optional caller-supplied deadline covering handler
    /// execution.
    pub async fn execute_with_deadline(
        &self,
        code: u32,
        identity: &Identity,
        params: Value,
        deadline: Option<Duration>,
    ) -> Result<HandlerResult> {
        let recorded_params = redact_params(&params);

        let mut route: Option<Route> = None;
        let result = self.run(code, identity, params, deadline, &mut route).await;

        let outcome = self.outcome(code, identity, route, recorded_params, &result);
        self.record_outcome(&outcome).await;

        result
    }

    /// The linear state machine. `route` is reported back so the audit
    /// record can name the resource/action even on failure paths past
    /// resolution.
    async fn run(
        &self,
        code: u32,
        identity: &Identity,
        params: Value,
        deadline: Option<Duration>,
        route_out: &mut Option<Route>,
    ) -> Result<HandlerResult> {
        // Resolving
        let route = self.routes.resolve(code)?;
        *route_out = Some(route.clone());

        // RouteValidating: defense in depth — the table is store-sourced,
        // but a malformed row must never reach the loader.
        if !self.gate.is_valid(&route.resource) || !self.gate.is_valid(&route.action) {
            tracing::warn!(
                code,
                route = %route,
                "store-sourced route failed syntax validation"
            );
            return Err(Error::invalid_route(code, format!("malformed route '{route}'")));
        }

        // Authorizing: the only place authorization is decided.
        if !self.permissions.check(identity.profile_id, &route.resource, &route.action) {
            return Err(Error::denied(identity.profile_id, &route.resource, &route.action));
        }

        // Executing
        match deadline {
            Some(limit) => match timeout(limit, self.loader.execute(&route.resource, &route.action, params)).await {
                Ok(result) => result,
                Err(_) => Err(Error::timeout(format!("execute {route}"), limit)),
            },
            None => self.loader.execute(&route.resource, &route.action, params).await,
        }
    }

    fn outcome(
        &self,
        code: u32,
        identity: &Identity,
        route: Option<Route>,
        recorded_params: Value,
        result: &Result<HandlerResult>,
    ) -> DispatchOutcome {
        let (status, summary) = match result {
            Ok(handler_result) => (DispatchStatus::Success, handler_result.status.clone()),
            Err(Error::RouteNotFound { .. }) => {
                (DispatchStatus::NotFound, format!("no route for code {code}"))
            }
            Err(Error::Denied { .. }) => (DispatchStatus::Denied, "authorization denied".to_string()),
            Err(Error::Business { message, .. }) => (DispatchStatus::BusinessError, message.clone()),
            // Everything else terminated before or inside handler loading.
            // The summary keeps internal detail; it goes to the audit
            // record, never into the caller response.
            Err(other) => (DispatchStatus::LoadError, other.to_string()),
        };

        let (resource, action) = match route {
            Some(route) => (Some(route.resource), Some(route.action)),
            None => (None, None),
        };

        DispatchOutcome {
            request_id: identity.request_id.clone(),
            profile_id: identity.profile_id,
            resource,
            action,
            code,
            status,
            result_summary: summary,
            params: recorded_params,
            timestamp: Utc::now(),
        }
    }

    /// Best-effort, bounded audit write; never fails the dispatch.
    async fn record_outcome(&self, outcome: &DispatchOutcome) {
        match timeout(AUDIT_WRITE_TIMEOUT, self.audit.record(outcome)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(
                    request_id = %outcome.request_id,
                    error = %e,
                    "audit sink rejected dispatch outcome"
                );
            }
            Err(_) => {
                tracing::warn!(
                    request_id = %outcome.request_id,
                    "audit write timed out"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditSink;
    use async_trait::async_trait;
    use serde_json::json;
    use tempfile::TempDir;
    use txgate_core::REDACTION_MARKER;
    use txgate_loader::{Handler, HandlerContext, HandlerRegistry};
    use txgate_store::MemoryStore;

    struct AuthHandler;

    #[async_trait]
    impl Handler for AuthHandler {
        fn supported_actions(&self) -> &[&str] {
            &["register", "slow"]
        }

        async fn invoke(&self, action: &str, params: Value) -> Result<HandlerResult> {
            match action {
                "register" => Ok(HandlerResult::ok(json!({ "user": params["username"] }))),
                "slow" => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok(HandlerResult::ok(json!({})))
                }
                _ => unreachable!(),
            }
        }
    }

    struct Fixture {
        dispatcher: Dispatcher,
        sink: Arc<MemoryAuditSink>,
        _sandbox: TempDir,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        store.add_transaction(101, "Auth", "register");
        store.add_transaction(103, "Auth", "slow");
        store.add_permission(2, "Auth", "register");
        store.add_permission(2, "Auth", "slow");

        let routes = Arc::new(RouteTable::new(store.clone()));
        routes.load().await.unwrap();
        let permissions = Arc::new(PermissionCache::new(store.clone()));
        permissions.load().await.unwrap();

        let sandbox = TempDir::new().unwrap();
        std::fs::write(sandbox.path().join("Auth.handler"), b"").unwrap();
        let mut registry = HandlerRegistry::new();
        registry.register("Auth", |_| Ok(Arc::new(AuthHandler) as Arc<dyn Handler>));
        let loader = Arc::new(
            SandboxedLoader::new(sandbox.path(), registry, HandlerContext::new()).unwrap(),
        );

        let sink = Arc::new(MemoryAuditSink::new());
        let dispatcher = Dispatcher::new(routes, permissions, loader, sink.clone());
        Fixture {
            dispatcher,
            sink,
            _sandbox: sandbox,
        }
    }

    #[tokio::test]
    async fn authorized_dispatch_reaches_the_handler() {
        let f = fixture().await;
        let identity = Identity::new(2, "req-1");

        let result = f
            .dispatcher
            .execute(101, &identity, json!({ "username": "maria" }))
            .await
            .unwrap();
        assert_eq!(result.data["user"], "maria");

        let records = f.sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, DispatchStatus::Success);
        assert_eq!(records[0].resource.as_deref(), Some("Auth"));
        assert_eq!(records[0].request_id, "req-1");
    }

    #[tokio::test]
    async fn unauthorized_profile_is_denied() {
        let f = fixture().await;
        let identity = Identity::new(3, "req-2");

        match f.dispatcher.execute(101, &identity, json!({})).await {
            Err(Error::Denied { profile_id, .. }) => assert_eq!(profile_id, 3),
            other => panic!("expected Denied, got {other:?}"),
        }

        let records = f.sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, DispatchStatus::Denied);
    }

    #[tokio::test]
    async fn unknown_code_is_not_found() {
        let f = fixture().await;
        let identity = Identity::new(2, "req-3");

        assert!(matches!(
            f.dispatcher.execute(999, &identity, json!({})).await,
            Err(Error::RouteNotFound { code: 999 })
        ));

        let records = f.sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, DispatchStatus::NotFound);
        assert_eq!(records[0].resource, None);
    }

    #[tokio::test]
    async fn malformed_store_route_is_rejected_before_authorization() {
        let store = Arc::new(MemoryStore::new());
        // A corrupted table row with traversal in the resource name.
        store.add_transaction(666, "../etc", "register");
        store.add_permission(2, "../etc", "register");

        let routes = Arc::new(RouteTable::new(store.clone()));
        routes.load().await.unwrap();
        let permissions = Arc::new(PermissionCache::new(store.clone()));
        permissions.load().await.unwrap();

        let sandbox = TempDir::new().unwrap();
        let loader = Arc::new(
            SandboxedLoader::new(sandbox.path(), HandlerRegistry::new(), HandlerContext::new())
                .unwrap(),
        );
        let sink = Arc::new(MemoryAuditSink::new());
        let dispatcher = Dispatcher::new(routes, permissions, loader, sink.clone());

        match dispatcher.execute(666, &Identity::new(2, "req-bad"), json!({})).await {
            Err(Error::InvalidRoute { code, .. }) => assert_eq!(code, 666),
            other => panic!("expected InvalidRoute, got {other:?}"),
        }

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, DispatchStatus::LoadError);
    }

    struct FetchHandler;

    #[async_trait]
    impl Handler for FetchHandler {
        fn supported_actions(&self) -> &[&str] {
            &["fetch"]
        }

        async fn invoke(&self, _action: &str, _params: Value) -> Result<HandlerResult> {
            Ok(HandlerResult::ok(json!({ "rows": [] })))
        }
    }

    #[tokio::test]
    async fn configured_identifier_pattern_reaches_the_route_check() {
        let store = Arc::new(MemoryStore::new());
        // Underscored names fail the default gate but pass the configured one.
        store.add_transaction(300, "user_data", "fetch");
        store.add_permission(2, "user_data", "fetch");

        let routes = Arc::new(RouteTable::new(store.clone()));
        routes.load().await.unwrap();
        let permissions = Arc::new(PermissionCache::new(store.clone()));
        permissions.load().await.unwrap();

        let sandbox = TempDir::new().unwrap();
        std::fs::write(sandbox.path().join("user_data.handler"), b"").unwrap();
        let mut registry = HandlerRegistry::new();
        registry.register("user_data", |_| Ok(Arc::new(FetchHandler) as Arc<dyn Handler>));

        let gate = IdentifierGate::new(r"^[A-Za-z][A-Za-z0-9_]{0,63}$").unwrap();
        let loader = Arc::new(
            SandboxedLoader::new(sandbox.path(), registry, HandlerContext::new())
                .unwrap()
                .with_identifier_gate(gate.clone()),
        );
        let sink = Arc::new(MemoryAuditSink::new());
        let dispatcher = Dispatcher::new(routes, permissions, loader, sink.clone())
            .with_identifier_gate(gate);

        let result = dispatcher
            .execute(300, &Identity::new(2, "req-u"), json!({}))
            .await
            .unwrap();
        assert_eq!(result.status, "ok");

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, DispatchStatus::Success);
        assert_eq!(records[0].resource.as_deref(), Some("user_data"));
    }

    #[tokio::test]
    async fn secret_like_params_are_redacted_in_the_outcome() {
        let f = fixture().await;
        let identity = Identity::new(2, "req-4");

        f.dispatcher
            .execute(
                101,
                &identity,
                json!({ "username": "maria", "password": "hunter2", "otpCode": "123" }),
            )
            .await
            .unwrap();

        let records = f.sink.records();
        assert_eq!(records[0].params["username"], "maria");
        assert_eq!(records[0].params["password"], REDACTION_MARKER);
        assert_eq!(records[0].params["otpCode"], REDACTION_MARKER);
    }

    #[tokio::test]
    async fn audit_sink_failure_does_not_fail_the_dispatch() {
        let f = fixture().await;
        f.sink.fail(true);
        let identity = Identity::new(2, "req-5");

        let result = f.dispatcher.execute(101, &identity, json!({})).await;
        assert!(result.is_ok());
        assert!(f.sink.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_bounds_handler_execution() {
        let f = fixture().await;
        let identity = Identity::new(2, "req-6");

        let result = f
            .dispatcher
            .execute_with_deadline(103, &identity, json!({}), Some(Duration::from_secs(1)))
            .await;
        assert!(matches!(result, Err(Error::Timeout { .. })));

        let records = f.sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, DispatchStatus::LoadError);
    }

    #[tokio::test]
    async fn every_terminal_state_emits_exactly_one_outcome() {
        let f = fixture().await;

        // Done, Denied, NotFound in sequence.
        f.dispatcher
            .execute(101, &Identity::new(2, "a"), json!({}))
            .await
            .unwrap();
        let _ = f.dispatcher.execute(101, &Identity::new(3, "b"), json!({})).await;
        let _ = f.dispatcher.execute(999, &Identity::new(2, "c"), json!({})).await;

        let statuses: Vec<DispatchStatus> =
            f.sink.records().iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![
                DispatchStatus::Success,
                DispatchStatus::Denied,
                DispatchStatus::NotFound,
            ]
        );
    }

    #[tokio::test]
    async fn readiness_requires_both_lookup_structures() {
        let store = Arc::new(MemoryStore::new());
        store.add_transaction(101, "Auth", "register");
        let routes = Arc::new(RouteTable::new(store.clone()));
        let permissions = Arc::new(PermissionCache::new(store.clone()));
        let sandbox = TempDir::new().unwrap();
        let loader = Arc::new(
            SandboxedLoader::new(sandbox.path(), HandlerRegistry::new(), HandlerContext::new())
                .unwrap(),
        );
        let dispatcher = Dispatcher::new(
            routes.clone(),
            permissions.clone(),
            loader,
            Arc::new(MemoryAuditSink::new()),
        );

        assert!(!dispatcher.is_ready());
        routes.load().await.unwrap();
        assert!(!dispatcher.is_ready());
        permissions.load().await.unwrap();
        assert!(dispatcher.is_ready());
    }
}
