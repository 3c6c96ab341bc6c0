//! Object-store abstraction over the Kubernetes API
//!
//! The runner never talks to `kube` directly; it goes through the
//! [`ObjectStore`] trait so the whole test-case lifecycle can be exercised
//! against a mock in tests while production uses the [`KubeStore`]
//! implementation backed by a real cluster.
//!
//! Semantics the runner relies on:
//! - `create_namespace` and `create_config_map` are idempotent (server-side
//!   apply, no "already exists" failures);
//! - `delete_pod` blocks until the pod is actually gone (absence polled at
//!   500ms for up to 60s) and treats not-found as success;
//! - transport failures are surfaced immediately, never retried here.

use std::collections::BTreeMap;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{ConfigMap, Namespace, Pod};
use kube::api::{Api, DeleteParams, LogParams, Patch, PatchParams, PostParams};
use kube::Client;
#[cfg(test)]
use mockall::automock;
use tracing::{debug, trace};

use crate::health::{ConditionObservation, ContainerObservation, ObservationSnapshot};
use crate::{Error, Result, DELETE_POLL_INTERVAL, DELETE_WAIT_TIMEOUT, FIELD_MANAGER};

/// CRUD and log retrieval for the opaque cluster objects a test case creates
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Read a pod's status as a point-in-time snapshot
    async fn pod_snapshot(&self, namespace: &str, name: &str) -> Result<ObservationSnapshot>;

    /// Create a pod from a rendered YAML manifest payload
    async fn create_pod(&self, namespace: &str, payload: &[u8]) -> Result<()>;

    /// Delete a pod and block until the store reports it gone
    ///
    /// Not-found (already absent) is success. Exceeding the bounded wait for
    /// termination is a hard [`Error::Cleanup`], never a silent success.
    async fn delete_pod(&self, namespace: &str, name: &str) -> Result<()>;

    /// Retrieve the current log body of a pod's main container
    async fn pod_logs(&self, namespace: &str, name: &str) -> Result<Vec<u8>>;

    /// Create a config map, replacing data if it already exists
    async fn create_config_map(
        &self,
        namespace: &str,
        name: &str,
        data: BTreeMap<String, String>,
    ) -> Result<()>;

    /// Delete a config map; not-found is success
    async fn delete_config_map(&self, namespace: &str, name: &str) -> Result<()>;

    /// Ensure a namespace exists (idempotent)
    async fn create_namespace(&self, name: &str) -> Result<()>;

    /// Delete a namespace; not-found is success
    async fn delete_namespace(&self, name: &str) -> Result<()>;
}

/// Whether a kube error is a 404 from the API server
fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == 404)
}

/// Reduce a pod to the status fields the health classifier inspects
pub fn snapshot_from_pod(pod: &Pod) -> ObservationSnapshot {
    let status = pod.status.clone().unwrap_or_default();
    ObservationSnapshot {
        phase: status.phase.unwrap_or_default(),
        pod_ip: status.pod_ip,
        host_ip: status.host_ip,
        conditions: status
            .conditions
            .unwrap_or_default()
            .into_iter()
            .map(|c| ConditionObservation {
                reason: c.reason.unwrap_or_default(),
                message: c.message.unwrap_or_default(),
            })
            .collect(),
        containers: status
            .container_statuses
            .unwrap_or_default()
            .into_iter()
            .map(|cs| ContainerObservation {
                waiting_reason: cs
                    .state
                    .as_ref()
                    .and_then(|s| s.waiting.as_ref())
                    .and_then(|w| w.reason.clone()),
                name: cs.name,
                restart_count: cs.restart_count,
            })
            .collect(),
    }
}

/// [`ObjectStore`] implementation backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    /// Create a store around an existing kube client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn pods(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn config_maps(&self, namespace: &str) -> Api<ConfigMap> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn namespaces(&self) -> Api<Namespace> {
        Api::all(self.client.clone())
    }
}

#[async_trait]
impl ObjectStore for KubeStore {
    async fn pod_snapshot(&self, namespace: &str, name: &str) -> Result<ObservationSnapshot> {
        let pod = self.pods(namespace).get(name).await?;
        Ok(snapshot_from_pod(&pod))
    }

    async fn create_pod(&self, namespace: &str, payload: &[u8]) -> Result<()> {
        let pod: Pod = serde_yaml::from_slice(payload)
            .map_err(|e| Error::serialization(format!("unable to decode pod manifest: {e}")))?;
        let name = pod.metadata.name.clone().unwrap_or_default();
        debug!(namespace = %namespace, pod = %name, "Creating pod");
        self.pods(namespace)
            .create(&PostParams::default(), &pod)
            .await?;
        Ok(())
    }

    async fn delete_pod(&self, namespace: &str, name: &str) -> Result<()> {
        let api = self.pods(namespace);
        debug!(namespace = %namespace, pod = %name, "Deleting pod");
        match api.delete(name, &DeleteParams::default()).await {
            Ok(_) => {}
            Err(e) if is_not_found(&e) => return Ok(()),
            Err(e) => return Err(e.into()),
        }

        // Block until the pod is actually gone so a later test case never
        // races against resources still being torn down.
        let mut waited = std::time::Duration::ZERO;
        while waited < DELETE_WAIT_TIMEOUT {
            tokio::time::sleep(DELETE_POLL_INTERVAL).await;
            waited += DELETE_POLL_INTERVAL;
            match api.get_opt(name).await? {
                None => return Ok(()),
                Some(_) => trace!(pod = %name, "Pod still terminating"),
            }
        }

        Err(Error::cleanup(format!(
            "pod {name} still present {}s after deletion",
            DELETE_WAIT_TIMEOUT.as_secs()
        )))
    }

    async fn pod_logs(&self, namespace: &str, name: &str) -> Result<Vec<u8>> {
        let body = self
            .pods(namespace)
            .logs(name, &LogParams::default())
            .await?;
        Ok(body.into_bytes())
    }

    async fn create_config_map(
        &self,
        namespace: &str,
        name: &str,
        data: BTreeMap<String, String>,
    ) -> Result<()> {
        let cm = serde_json::json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": { "name": name, "namespace": namespace },
            "data": data,
        });
        debug!(namespace = %namespace, configmap = %name, "Applying config map");
        self.config_maps(namespace)
            .patch(name, &PatchParams::apply(FIELD_MANAGER), &Patch::Apply(&cm))
            .await?;
        Ok(())
    }

    async fn delete_config_map(&self, namespace: &str, name: &str) -> Result<()> {
        match self
            .config_maps(namespace)
            .delete(name, &DeleteParams::default())
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if is_not_found(&e) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn create_namespace(&self, name: &str) -> Result<()> {
        let ns = serde_json::json!({
            "apiVersion": "v1",
            "kind": "Namespace",
            "metadata": { "name": name },
        });
        debug!(namespace = %name, "Ensuring namespace");
        self.namespaces()
            .patch(name, &PatchParams::apply(FIELD_MANAGER), &Patch::Apply(&ns))
            .await?;
        Ok(())
    }

    async fn delete_namespace(&self, name: &str) -> Result<()> {
        match self
            .namespaces()
            .delete(name, &DeleteParams::default())
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if is_not_found(&e) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
