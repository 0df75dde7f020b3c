use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use doubleagent_core::config::WebhookConfig;
use serde_json::Value;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tracing::{info, warn};
use uuid::Uuid;

use crate::allowlist::Allowlist;
use crate::delivery::{DeliveryStatus, WebhookDelivery};
use crate::signature::compute_signature;

struct DeliveryJob {
    id: String,
    target_url: String,
    payload: Value,
    namespace: String,
    secret: Option<String>,
    extra_headers: HashMap<String, String>,
}

/// Dispatches webhook deliveries through a bounded pool of worker tasks
/// reading off one channel, rather than spawning a task per delivery —
/// so a burst of deliveries can't unbound the runtime's task count.
pub struct WebhookEngine {
    config: WebhookConfig,
    client: reqwest::Client,
    allowlist: Allowlist,
    deliveries: DashMap<String, WebhookDelivery>,
    order: RwLock<Vec<String>>,
    tx: mpsc::Sender<DeliveryJob>,
}

impl WebhookEngine {
    pub fn new(config: WebhookConfig) -> Arc<Self> {
        let (tx, rx) = mpsc::channel(1024);
        let allowlist = Allowlist::new(config.extra_allowed_hosts.clone());
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.attempt_timeout_secs))
            .build()
            .expect("reqwest client builds with static config");

        let engine = Arc::new(Self {
            config,
            client,
            allowlist,
            deliveries: DashMap::new(),
            order: RwLock::new(Vec::new()),
            tx,
        });

        let rx = Arc::new(AsyncMutex::new(rx));
        for worker in 0..engine.config.worker_count.max(1) {
            let engine = engine.clone();
            let rx = rx.clone();
            tokio::spawn(async move {
                loop {
                    let job = {
                        let mut rx = rx.lock().await;
                        rx.recv().await
                    };
                    match job {
                        Some(job) => engine.run_job(job).await,
                        None => {
                            info!(worker, "webhook dispatcher worker shutting down");
                            break;
                        }
                    }
                }
            });
        }

        engine
    }

    /// Records the delivery and, if the target passes the allowlist,
    /// enqueues it for async delivery. Returns immediately either way.
    pub fn deliver(
        &self,
        target_url: &str,
        event_type: &str,
        payload: Value,
        secret: Option<String>,
        namespace: &str,
        extra_headers: HashMap<String, String>,
    ) -> WebhookDelivery {
        let id = Uuid::new_v4().simple().to_string()[..16].to_string();
        let mut delivery = WebhookDelivery::new(
            id.clone(),
            event_type.to_string(),
            payload.clone(),
            target_url.to_string(),
            namespace.to_string(),
        );

        if !self.allowlist.is_allowed(target_url) {
            let hostname = url::Url::parse(target_url)
                .ok()
                .and_then(|u| u.host_str().map(str::to_string))
                .unwrap_or_default();
            delivery.status = DeliveryStatus::Failed;
            delivery.error = Some(format!("target host not in allowlist: {hostname}"));
            self.record(delivery.clone());
            return delivery;
        }

        self.record(delivery.clone());

        let job = DeliveryJob {
            id,
            target_url: target_url.to_string(),
            payload,
            namespace: namespace.to_string(),
            secret,
            extra_headers,
        };

        if self.tx.try_send(job).is_err() {
            warn!("webhook dispatch queue full, dropping delivery");
            self.update(&delivery.id, |d| {
                d.status = DeliveryStatus::Failed;
                d.error = Some("dispatch queue full".to_string());
            });
            delivery.status = DeliveryStatus::Failed;
        }

        delivery
    }

    pub fn get_deliveries(
        &self,
        namespace: Option<&str>,
        event_type: Option<&str>,
        limit: usize,
    ) -> Vec<WebhookDelivery> {
        let order = self.order.read().expect("order lock not poisoned");
        order
            .iter()
            .rev()
            .filter_map(|id| self.deliveries.get(id).map(|d| d.clone()))
            .filter(|d| namespace.map(|ns| d.namespace == ns).unwrap_or(true))
            .filter(|d| event_type.map(|et| d.event_type == et).unwrap_or(true))
            .take(limit)
            .collect()
    }

    pub fn clear(&self) {
        self.deliveries.clear();
        self.order.write().expect("order lock not poisoned").clear();
    }

    fn record(&self, delivery: WebhookDelivery) {
        let id = delivery.id.clone();
        self.deliveries.insert(id.clone(), delivery);
        self.order.write().expect("order lock not poisoned").push(id);
    }

    fn update(&self, id: &str, f: impl FnOnce(&mut WebhookDelivery)) {
        if let Some(mut entry) = self.deliveries.get_mut(id) {
            f(&mut entry);
        }
    }

    async fn run_job(&self, job: DeliveryJob) {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            "application/json".parse().expect("static header value"),
        );
        headers.insert(
            "x-delivery-id",
            job.id.parse().expect("delivery id is header-safe"),
        );
        headers.insert(
            "x-namespace",
            job.namespace
                .parse()
                .unwrap_or_else(|_| "default".parse().unwrap()),
        );
        if let Some(sig) = compute_signature(&job.payload, job.secret.as_deref()) {
            headers.insert(
                "x-hub-signature-256",
                sig.parse().expect("hex signature is header-safe"),
            );
        }
        for (key, value) in &job.extra_headers {
            if let (Ok(name), Ok(val)) = (
                reqwest::header::HeaderName::try_from(key.as_str()),
                reqwest::header::HeaderValue::try_from(value.as_str()),
            ) {
                headers.insert(name, val);
            }
        }

        let max_attempts = self.config.max_retries.max(1);
        for attempt in 0..max_attempts {
            self.update(&job.id, |d| {
                d.attempts = attempt as u32 + 1;
                d.last_attempt_at = Some(Utc::now());
            });

            let result = self
                .client
                .post(&job.target_url)
                .headers(headers.clone())
                .json(&job.payload)
                .send()
                .await;

            match result {
                Ok(response) => {
                    let status = response.status().as_u16();
                    self.update(&job.id, |d| d.response_code = Some(status));
                    if (200..300).contains(&status) {
                        self.update(&job.id, |d| d.status = DeliveryStatus::Delivered);
                        return;
                    }
                }
                Err(err) => {
                    self.update(&job.id, |d| d.error = Some(err.to_string()));
                }
            }

            if attempt + 1 < max_attempts {
                let delay = self
                    .config
                    .retry_delays_secs
                    .get(attempt)
                    .or_else(|| self.config.retry_delays_secs.last())
                    .copied()
                    .unwrap_or(30);
                tokio::time::sleep(Duration::from_secs(delay)).await;
            }
        }

        self.update(&job.id, |d| d.status = DeliveryStatus::Failed);
    }
}
