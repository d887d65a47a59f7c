//! # Graph constructor
//!
//! Turns a batch of `Contact`s into idempotent node and relationship
//! merges against a `GraphStore`.
//!
//! Contacts are processed one after another; later contacts see the
//! person nodes earlier ones created. Failures are handled at the
//! smallest scope that owns them: a recoverable error (see
//! `Error::is_recoverable`) is logged with the offending entity's name,
//! recorded in the report, and the batch continues. Anything else aborts
//! the batch and propagates.
//!
//! Every merge is also recorded as a `Mutation`. With `dry_run` set the
//! store is never written and the mutation list is the whole result.

pub mod connections;
pub mod history;
pub mod mutual;

use hashbrown::HashMap;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::model::*;
use crate::resolve::EntityResolver;
use crate::storage::GraphStore;
use crate::{Error, Result};

use connections::{knows_strength, parse_connections, ParsedConnection};
use history::{parse_education, parse_jobs};

pub use mutual::{MutualConnection, MutualSource};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstructOptions {
    pub min_similarity: f64,
    pub debug: bool,
    /// Record mutations without writing to the store.
    pub dry_run: bool,
}

impl From<&EngineConfig> for ConstructOptions {
    fn from(config: &EngineConfig) -> Self {
        Self { min_similarity: config.min_similarity, debug: config.debug, dry_run: false }
    }
}

impl Default for ConstructOptions {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl ConstructOptions {
    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }
}

/// One node or relationship merge, as requested.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Mutation {
    Node(GraphNode),
    Relationship(GraphRelationship),
}

impl Mutation {
    pub fn id(&self) -> &str {
        match self {
            Mutation::Node(n) => n.id.as_str(),
            Mutation::Relationship(r) => r.id.as_str(),
        }
    }
}

/// A single entity that could not be merged.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityFailure {
    pub entity: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstructReport {
    /// De-duplicated merges in first-seen order.
    pub mutations: Vec<Mutation>,
    pub failures: Vec<EntityFailure>,
    pub persons: usize,
    pub firms: usize,
    pub schools: usize,
    pub relationships: usize,
}

impl ConstructReport {
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.mutations.iter().filter_map(|m| match m {
            Mutation::Node(n) => Some(n),
            Mutation::Relationship(_) => None,
        })
    }

    pub fn relationships(&self) -> impl Iterator<Item = &GraphRelationship> {
        self.mutations.iter().filter_map(|m| match m {
            Mutation::Relationship(r) => Some(r),
            Mutation::Node(_) => None,
        })
    }
}

// ============================================================================
// Batch state
// ============================================================================

/// Per-call state: the mutation log and the in-batch person index.
#[derive(Default)]
pub(crate) struct Batch {
    mutations: Vec<Mutation>,
    positions: HashMap<String, usize>,
    /// lower-cased resolved name → (person node id, stored name)
    persons: HashMap<String, (NodeId, String)>,
    failures: Vec<EntityFailure>,
}

impl Batch {
    fn record(&mut self, mutation: Mutation) {
        match self.positions.get(mutation.id()) {
            Some(&i) => match (&mut self.mutations[i], mutation) {
                (Mutation::Node(existing), Mutation::Node(incoming)) => existing.merge(incoming),
                (Mutation::Relationship(existing), Mutation::Relationship(incoming)) => existing.merge(incoming),
                _ => {}
            },
            None => {
                self.positions.insert(mutation.id().to_string(), self.mutations.len());
                self.mutations.push(mutation);
            }
        }
    }

    /// Swallow a recoverable error (logged and recorded), propagate the rest.
    pub(crate) fn absorb(&mut self, entity: &str, err: Error) -> Result<()> {
        if !err.is_recoverable() {
            return Err(err);
        }
        warn!(entity, error = %err, "skipping entity");
        self.failures.push(EntityFailure { entity: entity.to_string(), message: err.to_string() });
        Ok(())
    }

    pub(crate) fn finish(self) -> ConstructReport {
        let mut report = ConstructReport { failures: self.failures, ..ConstructReport::default() };
        for m in &self.mutations {
            match m {
                Mutation::Node(n) => match n.labels.first() {
                    Some(Label::Person) => report.persons += 1,
                    Some(Label::Firm) => report.firms += 1,
                    Some(Label::School) => report.schools += 1,
                    None => {}
                },
                Mutation::Relationship(_) => report.relationships += 1,
            }
        }
        report.mutations = self.mutations;
        report
    }
}

// ============================================================================
// GraphConstructor
// ============================================================================

pub struct GraphConstructor<'a, S: GraphStore> {
    store: &'a S,
    resolver: &'a EntityResolver,
    options: ConstructOptions,
}

impl<'a, S: GraphStore> GraphConstructor<'a, S> {
    pub fn new(store: &'a S, resolver: &'a EntityResolver, options: ConstructOptions) -> Self {
        Self { store, resolver, options }
    }

    pub fn options(&self) -> &ConstructOptions {
        &self.options
    }

    /// Merge a batch of contacts. Returns the de-duplicated mutation log
    /// and per-entity failures; a hard store error aborts the batch.
    pub async fn construct(&self, contacts: &[Contact]) -> Result<ConstructReport> {
        let mut batch = Batch::default();
        for contact in contacts {
            let entity = contact.name.as_deref().or(contact.firm.as_deref()).unwrap_or("<unnamed>");
            if let Err(err) = self.construct_contact(&mut batch, contact).await {
                batch.absorb(entity, err)?;
            }
        }
        let report = batch.finish();
        info!(
            persons = report.persons,
            firms = report.firms,
            schools = report.schools,
            relationships = report.relationships,
            failures = report.failures.len(),
            dry_run = self.options.dry_run,
            "graph batch constructed"
        );
        Ok(report)
    }

    async fn construct_contact(&self, batch: &mut Batch, contact: &Contact) -> Result<()> {
        let Some(raw_name) = contact.name.as_deref().or(contact.firm.as_deref()) else {
            return Err(Error::InvalidEntity { entity: "<unnamed>".into(), message: "contact has neither name nor firm".into() });
        };
        if contact.is_firm_record() {
            let firm = contact.firm.as_deref().map(|f| self.resolver.resolve_name(f));
            let name = firm.unwrap_or_else(|| self.resolver.resolve_name(raw_name));
            self.merge_node(batch, &[Label::Firm], firm_properties(contact, name)).await?;
            return Ok(());
        }

        let firm = contact.employer().map(|f| self.resolver.resolve_name(f));
        let name = self.resolver.resolve_name(raw_name);
        let person = self.merge_person(batch, person_properties(contact, name.clone(), firm.clone())).await?;

        if let Some(firm) = firm {
            let firm_props = Properties { name: Some(firm.clone()), source: Some(contact.source.clone()), ..Properties::default() };
            let worked_at = Properties {
                role: contact.role.clone(),
                is_current: Some(true),
                confidence: contact.confidence.get("firm").copied(),
                source: Some(contact.source.clone()),
                ..Properties::default()
            };
            if let Err(err) = self.link(batch, &person, Label::Firm, firm_props, RelType::WorkedAt, worked_at).await {
                batch.absorb(&firm, err)?;
            }
        }

        if let Some(connections) = &contact.personal_connections {
            for conn in parse_connections(connections) {
                let target = conn.name.clone();
                if let Err(err) = self.merge_connection(batch, &person, &name, conn, &contact.source).await {
                    batch.absorb(&target, err)?;
                }
            }
        }

        if let Some(blob) = contact.job_history.as_deref() {
            match parse_jobs(blob) {
                Ok(jobs) => {
                    for job in jobs {
                        let Some(company) = job.company() else { continue };
                        let company = self.resolver.resolve_name(company);
                        let firm_props = Properties { name: Some(company.clone()), source: Some(contact.source.clone()), ..Properties::default() };
                        let rel = Properties {
                            role: job.role.clone(),
                            start: job.start.clone(),
                            end: job.end.clone(),
                            is_current: Some(job.is_current()),
                            source: Some(contact.source.clone()),
                            ..Properties::default()
                        };
                        if let Err(err) = self.link(batch, &person, Label::Firm, firm_props, RelType::WorkedAt, rel).await {
                            batch.absorb(&company, err)?;
                        }
                    }
                }
                Err(err) => batch.absorb(&format!("{name} job history"), err)?,
            }
        }

        let mut schools: Vec<(String, Properties)> = Vec::new();
        if let Some(school) = contact.school.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            schools.push((
                school.to_string(),
                Properties { degree: contact.degree.clone(), source: Some(contact.source.clone()), ..Properties::default() },
            ));
        }
        if let Some(blob) = contact.education_history.as_deref() {
            match parse_education(blob) {
                Ok(entries) => {
                    for entry in &entries {
                        let Some(school) = entry.school() else { continue };
                        schools.push((
                            school.to_string(),
                            Properties {
                                degree: entry.degree.clone(),
                                start: entry.start.clone(),
                                end: entry.end.clone(),
                                source: Some(contact.source.clone()),
                                ..Properties::default()
                            },
                        ));
                    }
                }
                Err(err) => batch.absorb(&format!("{name} education history"), err)?,
            }
        }
        for (school, rel) in schools {
            let school_props = Properties { name: Some(school.clone()), source: Some(contact.source.clone()), ..Properties::default() };
            if let Err(err) = self.link(batch, &person, Label::School, school_props, RelType::AttendedSchool, rel).await {
                batch.absorb(&school, err)?;
            }
        }
        Ok(())
    }

    async fn merge_connection(
        &self,
        batch: &mut Batch,
        person: &NodeId,
        person_name: &str,
        conn: ParsedConnection,
        source: &Source,
    ) -> Result<()> {
        let other = self.resolver.resolve_name(&conn.name);
        if other.eq_ignore_ascii_case(person_name) {
            return Ok(());
        }
        let other_props = Properties { name: Some(other), source: Some(source.clone()), ..Properties::default() };
        let other_id = self.merge_person(batch, other_props).await?;
        let knows = Properties {
            direction: Some(conn.direction),
            mutual_count: conn.mutual_count,
            strength: Some(conn.strength.unwrap_or_else(|| knows_strength(conn.mutual_count))),
            last_seen: conn.last_seen,
            notes: conn.notes,
            source: Some(source.clone()),
            ..Properties::default()
        };
        self.merge_relationship(batch, person, &other_id, RelType::Knows, knows).await
    }

    /// Merge `node_props` under `label` and a `rel_type` edge from `from` to it.
    async fn link(
        &self,
        batch: &mut Batch,
        from: &NodeId,
        label: Label,
        node_props: Properties,
        rel_type: RelType,
        rel_props: Properties,
    ) -> Result<()> {
        let to = self.merge_node(batch, &[label], node_props).await?;
        self.merge_relationship(batch, from, &to, rel_type, rel_props).await
    }

    /// Merge a person, reusing the node already created in this batch for
    /// the same or a similar enough resolved name.
    pub(crate) async fn merge_person(&self, batch: &mut Batch, mut props: Properties) -> Result<NodeId> {
        let key = props.name.as_deref().unwrap_or_default().to_lowercase();
        if let Some((id, stored_name)) = self.find_batch_person(batch, &key) {
            if self.options.debug {
                debug!(person = %key, node = %id, "reusing person from batch");
            }
            props.name = Some(stored_name);
            let node = GraphNode { id: id.clone(), labels: smallvec::smallvec![Label::Person], properties: props.clone() };
            if !self.options.dry_run {
                self.store.create_or_update_node(&[Label::Person], props).await?;
            }
            batch.record(Mutation::Node(node));
            return Ok(id);
        }
        let name = props.name.clone().unwrap_or_default();
        let id = self.merge_node(batch, &[Label::Person], props).await?;
        batch.persons.insert(key, (id.clone(), name));
        Ok(id)
    }

    /// Exact key first, then the closest earlier person whose similarity
    /// reaches `min_similarity`. Ties go to the lexically smaller key.
    fn find_batch_person(&self, batch: &Batch, key: &str) -> Option<(NodeId, String)> {
        if let Some(found) = batch.persons.get(key) {
            return Some(found.clone());
        }
        batch
            .persons
            .iter()
            .map(|(other, entry)| (self.resolver.similarity(key, other), other, entry))
            .filter(|(sim, _, _)| *sim >= self.options.min_similarity)
            .max_by(|a, b| a.0.total_cmp(&b.0).then_with(|| b.1.cmp(a.1)))
            .map(|(_, _, entry)| entry.clone())
    }

    pub(crate) async fn merge_node(&self, batch: &mut Batch, labels: &[Label], props: Properties) -> Result<NodeId> {
        let name = props.name.clone().unwrap_or_default();
        let Some(&primary) = labels.first() else {
            return Err(Error::InvalidEntity { entity: name, message: "node has no label".into() });
        };
        if slugify(&name).is_empty() {
            return Err(Error::InvalidEntity { entity: name, message: "node name has no usable characters".into() });
        }
        let mut node = GraphNode::named(primary, name).with_properties(props.clone());
        node.labels.extend(labels[1..].iter().copied().filter(|l| *l != primary));

        if !self.options.dry_run {
            let stored = self.store.create_or_update_node(labels, props).await?;
            node.id = stored.id;
        }
        if self.options.debug {
            debug!(node = %node.id, label = primary.as_str(), "merge node");
        }
        let id = node.id.clone();
        batch.record(Mutation::Node(node));
        Ok(id)
    }

    pub(crate) async fn merge_relationship(
        &self,
        batch: &mut Batch,
        from: &NodeId,
        to: &NodeId,
        rel_type: RelType,
        props: Properties,
    ) -> Result<()> {
        let rel = GraphRelationship::new(from.clone(), to.clone(), rel_type.clone()).with_properties(props.clone());
        if !self.options.dry_run {
            self.store.create_or_update_relationship(from, to, rel_type, props).await?;
        }
        if self.options.debug {
            debug!(rel = %rel.id, "merge relationship");
        }
        batch.record(Mutation::Relationship(rel));
        Ok(())
    }
}

fn mean_confidence(contact: &Contact) -> Option<f64> {
    let values: Vec<f64> = ["name", "firm"].iter().filter_map(|k| contact.confidence.get(*k).copied()).collect();
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

fn person_properties(contact: &Contact, name: String, firm: Option<String>) -> Properties {
    let mut props = Properties {
        name: Some(name),
        firm,
        role: contact.role.clone(),
        email: contact.email.clone(),
        location: contact.location.clone(),
        profile_url: contact.linkedin_url.clone(),
        degree: contact.degree.clone(),
        notes: contact.notes.clone(),
        source: Some(contact.source.clone()),
        confidence: mean_confidence(contact),
        ..Properties::default()
    };
    extend_extra(&mut props, contact);
    props
}

fn firm_properties(contact: &Contact, name: String) -> Properties {
    let mut props = Properties {
        name: Some(name),
        location: contact.location.clone(),
        profile_url: contact.linkedin_url.clone(),
        notes: contact.notes.clone(),
        source: Some(contact.source.clone()),
        confidence: mean_confidence(contact),
        ..Properties::default()
    };
    extend_extra(&mut props, contact);
    props
}

fn extend_extra(props: &mut Properties, contact: &Contact) {
    // a slug of a stand-in firm names the person, not an employer
    let firm_slug = contact
        .firm_slug
        .as_ref()
        .filter(|_| contact.employer().is_some() || contact.is_firm_record());
    let fields = [
        ("website", contact.website.as_ref()),
        ("twitterHandle", contact.twitter_handle.as_ref()),
        ("assetsUnderManagement", contact.assets_under_management.as_ref()),
        ("interests", contact.interests.as_ref()),
        ("firmSlug", firm_slug),
    ];
    for (key, value) in fields {
        if let Some(v) = value {
            props.extra.insert(key.to_string(), v.clone());
        }
    }
}
