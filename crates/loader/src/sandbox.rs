//! Sandbox containment and handler invocation.

use crate::handler::{Handler, HandlerContext};
use crate::registry::HandlerRegistry;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use txgate_core::{Error, HandlerResult, IdentifierGate, Result, CONTAINMENT_TARGET};

/// Validates route components, enforces sandbox containment, and invokes
/// registered handlers.
///
/// Every resource is expected to leave a marker file `<name>.handler` inside
/// the sandbox root. The marker is what ties a registered constructor to a
/// deployed handler location: a resource without a marker is not deployed
/// (load error), and a marker resolving outside the root is an intrusion
/// signal, never a plain misconfiguration.
pub struct SandboxedLoader {
    /// Canonical sandbox root; resolved once at construction
    root: PathBuf,
    registry: HandlerRegistry,
    ctx: HandlerContext,
    gate: IdentifierGate,
    /// Handler instances cached per resource for the process lifetime
    instances: DashMap<String, Arc<dyn Handler>>,
}

impl SandboxedLoader {
    /// Create a loader over a sandbox root.
    ///
    /// The root must exist; it is canonicalized here so containment checks
    /// compare against a stable absolute form.
    pub fn new(root: impl AsRef<Path>, registry: HandlerRegistry, ctx: HandlerContext) -> Result<Self> {
        let root = root.as_ref();
        let root = root.canonicalize().map_err(|e| {
            Error::configuration(format!(
                "sandbox root '{}' cannot be resolved: {e}",
                root.display()
            ))
        })?;
        Ok(Self {
            root,
            registry,
            ctx,
            gate: IdentifierGate::default(),
            instances: DashMap::new(),
        })
    }

    /// Replace the default identifier gate with a configured one.
    #[must_use]
    pub fn with_identifier_gate(mut self, gate: IdentifierGate) -> Self {
        self.gate = gate;
        self
    }

    /// The canonical sandbox root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Execute `action` on `resource` with the given params.
    ///
    /// Order of gates: identifier syntax first (cheapest, before any
    /// filesystem access), then containment of the resolved handler
    /// location, then registry construction, then method dispatch.
    pub async fn execute(&self, resource: &str, action: &str, params: Value) -> Result<HandlerResult> {
        if let Err(detail) = self.gate.validate(resource) {
            return Err(Error::load(resource, format!("invalid resource name: {detail}")));
        }
        if let Err(detail) = self.gate.validate(action) {
            return Err(Error::load(resource, format!("invalid action name: {detail}")));
        }

        self.check_containment(resource).await?;

        let handler = self.instance(resource)?;

        if !handler.supported_actions().contains(&action) {
            return Err(Error::method_not_found(resource, action));
        }

        match handler.invoke(action, params).await {
            Ok(result) => Ok(result),
            Err(business @ Error::Business { .. }) => Err(business),
            Err(other) => {
                // Full detail stays on this side of the sandbox boundary.
                tracing::error!(
                    resource,
                    action,
                    error = %other,
                    "handler raised a non-business error"
                );
                Err(Error::unknown(format!("handler '{resource}.{action}' failed")))
            }
        }
    }

    /// Resolve the handler marker for `resource` and verify it stays inside
    /// the sandbox root.
    async fn check_containment(&self, resource: &str) -> Result<()> {
        let candidate = self.root.join(format!("{resource}.handler"));

        // Follows symlinks; a marker that is a link out of the sandbox
        // resolves to its real location and fails the prefix check below.
        let resolved = match tokio::fs::canonicalize(&candidate).await {
            Ok(resolved) => resolved,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::load(resource, "handler module missing"));
            }
            Err(e) => {
                return Err(Error::load(
                    resource,
                    format!("handler location cannot be resolved: {e}"),
                ));
            }
        };

        if !resolved.starts_with(&self.root) {
            tracing::error!(
                target: CONTAINMENT_TARGET,
                resource,
                candidate = %candidate.display(),
                resolved = %resolved.display(),
                root = %self.root.display(),
                "handler location escapes the sandbox root; treating as intrusion attempt"
            );
            return Err(Error::containment(resource, resolved));
        }

        Ok(())
    }

    /// Cached handler instance for `resource`, constructing on first access.
    ///
    /// The DashMap entry holds its shard lock across construction, so two
    /// concurrent first accesses cannot instantiate twice.
    fn instance(&self, resource: &str) -> Result<Arc<dyn Handler>> {
        match self.instances.entry(resource.to_string()) {
            Entry::Occupied(occupied) => Ok(occupied.get().clone()),
            Entry::Vacant(vacant) => {
                let handler = self.registry.construct(resource, &self.ctx)?;
                vacant.insert(handler.clone());
                Ok(handler)
            }
        }
    }
}
