//! Mutual-connection ingestion.
//!
//! A mutual connection is a third party known to one or more seed members
//! and to a target. Each record yields the mutual's person node, a
//! `CONNECTED_VIA_MUTUAL` edge from every attributed seed, and one edge on
//! to the target when the target's profile URL matches a stored node.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::ingest::normalize::normalize_url;
use crate::model::*;
use crate::storage::GraphStore;
use crate::{Error, Result};

use super::{Batch, ConstructReport, GraphConstructor};

/// How the mutual connection was discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutualSource {
    Api,
    Automation,
}

impl MutualSource {
    /// Edge weight; automation-sourced data is trusted slightly less.
    pub fn weight(self) -> f64 {
        match self {
            MutualSource::Api => 0.8,
            MutualSource::Automation => 0.7,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MutualSource::Api => "api",
            MutualSource::Automation => "automation",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutualConnection {
    pub name: String,
    #[serde(default)]
    pub profile_url: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    /// Names of the seed members who know this person.
    #[serde(default)]
    pub seed_members: Vec<String>,
    /// Profile URL of the person both sides lead to.
    #[serde(default)]
    pub target_profile_url: Option<String>,
    pub source: MutualSource,
}

impl MutualConnection {
    pub fn new(name: impl Into<String>, source: MutualSource) -> Self {
        Self {
            name: name.into(),
            profile_url: None,
            role: None,
            seed_members: Vec::new(),
            target_profile_url: None,
            source,
        }
    }

    pub fn with_seed(mut self, seed: impl Into<String>) -> Self {
        self.seed_members.push(seed.into());
        self
    }

    pub fn with_target(mut self, profile_url: impl Into<String>) -> Self {
        self.target_profile_url = Some(profile_url.into());
        self
    }
}

impl<S: GraphStore> GraphConstructor<'_, S> {
    /// Merge a batch of mutual-connection records.
    pub async fn ingest_mutual_connections(&self, records: &[MutualConnection]) -> Result<ConstructReport> {
        let mut batch = Batch::default();
        for record in records {
            if let Err(err) = self.merge_mutual(&mut batch, record).await {
                batch.absorb(&record.name, err)?;
            }
        }
        let report = batch.finish();
        info!(
            records = records.len(),
            relationships = report.relationships,
            failures = report.failures.len(),
            "mutual connections ingested"
        );
        Ok(report)
    }

    async fn merge_mutual(&self, batch: &mut Batch, record: &MutualConnection) -> Result<()> {
        let weight = record.source.weight();
        let mut source = Source::new(record.source.as_str());
        source.name = Some("mutual-connections".into());

        let mutual_props = Properties {
            name: Some(self.resolver.resolve_name(&record.name)),
            role: record.role.clone(),
            profile_url: record.profile_url.as_deref().and_then(normalize_url),
            is_mutual_connection: Some(true),
            source: Some(source.clone()),
            ..Properties::default()
        };
        let mutual = self.merge_person(batch, mutual_props).await?;

        let edge = || Properties {
            weight: Some(weight),
            strength: Some(weight),
            source: Some(source.clone()),
            ..Properties::default()
        };

        for seed in &record.seed_members {
            let seed_props = Properties {
                name: Some(self.resolver.resolve_name(seed)),
                is_seed: Some(true),
                ..Properties::default()
            };
            let linked = async {
                let seed_id = self.merge_person(batch, seed_props).await?;
                self.merge_relationship(batch, &seed_id, &mutual, RelType::ConnectedViaMutual, edge()).await
            }
            .await;
            if let Err(err) = linked {
                batch.absorb(seed, err)?;
            }
        }

        let Some(url) = record.target_profile_url.as_deref() else {
            return Ok(());
        };
        let url = normalize_url(url).unwrap_or_else(|| url.trim().to_string());
        let target = match self.store.find_node_by_property(Label::Person, "profileUrl", &url).await? {
            Some(node) => Some(node),
            None => self.store.find_node_by_property(Label::Firm, "profileUrl", &url).await?,
        };
        match target {
            Some(target) => {
                self.merge_relationship(batch, &mutual, &target.id, RelType::ConnectedViaMutual, edge()).await
            }
            None => batch.absorb(&record.name, Error::NotFound(format!("target with profile {url}"))),
        }
    }
}
