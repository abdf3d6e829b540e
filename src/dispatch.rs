use anyhow::anyhow;
use futures::future::join_all;
use reqwest::Url;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::model::{EntityId, Platform, PlatformAssociation};
use crate::session::Session;
use crate::webhook::{entity_payload, Delivery, WebhookRegistry, WebhookService};

/// Raised before any request is sent; callers show it to the user as is.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("select at least one item")]
    NothingSelected,
    #[error("choose a platform for at least one item")]
    NoPlatformChosen,
}

/// Aggregate result for one platform within a single dispatch.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub platform: Platform,
    /// Requests actually sent.
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub succeeded_ids: Vec<EntityId>,
    pub failed_ids: Vec<EntityId>,
    /// Entities for a platform with no registered webhook. No request was made.
    pub unintegrated_ids: Vec<EntityId>,
    /// True only if every success was acknowledged by the server. In
    /// send-and-assume mode a success only certifies the request went out.
    pub confirmed: bool,
}

impl DispatchOutcome {
    fn empty(platform: Platform) -> Self {
        Self {
            platform,
            attempted: 0,
            succeeded: 0,
            failed: 0,
            succeeded_ids: Vec::new(),
            failed_ids: Vec::new(),
            unintegrated_ids: Vec::new(),
            confirmed: false,
        }
    }

    pub fn unintegrated(platform: Platform, ids: Vec<EntityId>) -> Self {
        Self {
            unintegrated_ids: ids,
            ..Self::empty(platform)
        }
    }

    pub fn is_unintegrated(&self) -> bool {
        !self.unintegrated_ids.is_empty()
    }

    fn record(&mut self, id: EntityId, result: anyhow::Result<Delivery>) {
        self.attempted += 1;
        match result {
            Ok(delivery) => {
                self.confirmed = if self.succeeded == 0 {
                    delivery.confirmed
                } else {
                    self.confirmed && delivery.confirmed
                };
                self.succeeded += 1;
                self.succeeded_ids.push(id);
            }
            Err(err) => {
                let reason = format!("{err:#}");
                warn!(platform = %self.platform, entity_id = id, %reason, "webhook delivery failed");
                self.failed += 1;
                self.failed_ids.push(id);
            }
        }
    }
}

/// Fans selected associations out to platform webhooks.
#[derive(Clone)]
pub struct Dispatcher {
    webhooks: Arc<dyn WebhookService>,
    request_timeout: Duration,
    user_id: Option<i64>,
}

impl Dispatcher {
    pub fn new(webhooks: Arc<dyn WebhookService>, session: &Session, request_timeout: Duration) -> Self {
        Self {
            webhooks,
            request_timeout,
            user_id: session.user_id(),
        }
    }

    /// Send one request per selected `(platform, entity)` pair and tally the
    /// results per platform. Individual failures never abort the batch; only
    /// an empty selection or empty association set is reported as an error.
    #[instrument(skip_all, fields(run_id = %Uuid::new_v4(), user_id = ?self.user_id))]
    pub async fn dispatch(
        &self,
        selection: &BTreeSet<EntityId>,
        associations: &[PlatformAssociation],
        registry: &WebhookRegistry,
    ) -> Result<Vec<DispatchOutcome>, ValidationError> {
        if selection.is_empty() {
            return Err(ValidationError::NothingSelected);
        }
        if associations.is_empty() {
            return Err(ValidationError::NoPlatformChosen);
        }

        let plan: Vec<(Platform, Vec<EntityId>, Option<Url>)> = group_by_platform(selection, associations)
            .into_iter()
            .map(|(platform, ids)| {
                let url = registry.endpoint(platform).cloned();
                (platform, ids.into_iter().collect(), url)
            })
            .collect();

        info!(platforms = plan.len(), "dispatch started");

        let outcomes = join_all(plan.into_iter().map(|(platform, ids, url)| async move {
            match url {
                Some(url) => self.send_platform(platform, &url, ids).await,
                None => {
                    info!(%platform, count = ids.len(), "platform has no webhook; skipping");
                    DispatchOutcome::unintegrated(platform, ids)
                }
            }
        }))
        .await;

        let (succeeded, failed): (usize, usize) = outcomes
            .iter()
            .fold((0, 0), |(s, f), o| (s + o.succeeded, f + o.failed));
        info!(succeeded, failed, "dispatch finished");
        Ok(outcomes)
    }

    async fn send_platform(&self, platform: Platform, url: &Url, ids: Vec<EntityId>) -> DispatchOutcome {
        let timeout = self.request_timeout;
        let results = join_all(ids.into_iter().map(|id| async move {
            let body = entity_payload(id);
            let result = match tokio::time::timeout(timeout, self.webhooks.post_json(url, &body)).await {
                Ok(result) => result,
                Err(_) => Err(anyhow!("no response within {:?}", timeout)),
            };
            (id, result)
        }))
        .await;

        let mut outcome = DispatchOutcome::empty(platform);
        for (id, result) in results {
            outcome.record(id, result);
        }
        info!(
            %platform,
            attempted = outcome.attempted,
            succeeded = outcome.succeeded,
            failed = outcome.failed,
            "platform dispatched"
        );
        outcome
    }
}

/// Associations of selected entities, grouped by platform and deduplicated.
pub fn group_by_platform(
    selection: &BTreeSet<EntityId>,
    associations: &[PlatformAssociation],
) -> BTreeMap<Platform, BTreeSet<EntityId>> {
    let mut groups: BTreeMap<Platform, BTreeSet<EntityId>> = BTreeMap::new();
    for assoc in associations.iter().filter(|a| selection.contains(&a.entity_id)) {
        groups.entry(assoc.platform).or_default().insert(assoc.entity_id);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grouping_drops_unselected_and_duplicates() {
        let selection: BTreeSet<EntityId> = [1, 2].into_iter().collect();
        let associations = vec![
            PlatformAssociation::new(1, Platform::LinkedIn, "Post"),
            PlatformAssociation::new(1, Platform::LinkedIn, "Article"),
            PlatformAssociation::new(2, Platform::Twitter, "Tweet"),
            PlatformAssociation::new(3, Platform::Twitter, "Tweet"),
        ];
        let groups = group_by_platform(&selection, &associations);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[&Platform::LinkedIn].iter().copied().collect::<Vec<_>>(), vec![1]);
        assert_eq!(groups[&Platform::Twitter].iter().copied().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn confirmed_requires_every_success_acknowledged() {
        let mut o = DispatchOutcome::empty(Platform::LinkedIn);
        o.record(1, Ok(Delivery::confirmed()));
        assert!(o.confirmed);
        o.record(2, Ok(Delivery::assumed()));
        assert!(!o.confirmed);
        o.record(3, Err(anyhow!("boom")));
        assert_eq!((o.attempted, o.succeeded, o.failed), (3, 2, 1));
        assert_eq!(o.failed_ids, vec![3]);
    }

    #[test]
    fn validation_messages_are_user_facing() {
        assert_eq!(ValidationError::NothingSelected.to_string(), "select at least one item");
        assert_eq!(
            ValidationError::NoPlatformChosen.to_string(),
            "choose a platform for at least one item"
        );
    }
}
