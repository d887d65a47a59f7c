//! End-to-end tests for graph construction.
//!
//! Rows go through the full ingest pipeline into MemoryStore; assertions
//! are made on the store and on the construct report.

use intro_graph::construct::ConstructOptions;
use intro_graph::export::cypher_string;
use intro_graph::{
    Contact, EngineConfig, EntityResolver, Error, GraphConstructor, GraphStore, IntroGraph, Label,
    MemoryStore, MutualConnection, MutualSource, NodeId, Provenance, RawRecord, RelType, Source,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn row(name: &str, firm: &str) -> RawRecord {
    RawRecord::new().with("Name", json!(name)).with("Company", json!(firm))
}

#[tokio::test]
async fn test_overlapping_rows_converge() {
    let graph = IntroGraph::open_memory();
    let rows = [
        row("John Smith", "Acme Capital"),
        row("john smith", "Acme Capital, LLC"),
        row("Jane Doe", "Acme Capital"),
    ];

    let report = graph.ingest(&rows, &Provenance::new("csv")).await.unwrap();
    assert_eq!(report.construct.persons, 2);
    assert_eq!(report.construct.firms, 1);
    assert_eq!(report.construct.relationships, 2);

    // a second import of the same rows adds nothing
    graph.ingest(&rows, &Provenance::new("csv")).await.unwrap();
    let store = graph.store();
    assert_eq!(store.node_count().await.unwrap(), 3);
    assert_eq!(store.relationship_count().await.unwrap(), 2);

    let worked_at: Vec<String> = store
        .relationships()
        .into_iter()
        .filter(|r| r.rel_type == RelType::WorkedAt)
        .map(|r| r.id.to_string())
        .collect();
    assert_eq!(
        worked_at,
        [
            "person:jane-doe-[WORKED_AT]->firm:acme-capital",
            "person:john-smith-[WORKED_AT]->firm:acme-capital",
        ]
    );
}

#[tokio::test]
async fn test_connections_and_history_from_raw_rows() {
    let graph = IntroGraph::open_memory();
    let raw = RawRecord::new()
        .with("Full Name", json!("Ada Byron"))
        .with("Firm", json!("Analytical Partners"))
        .with("Personal Connections", json!("Board seat with Charles Babbage, 8 mutual, last seen 2024-11-02"))
        .with("Job History", json!(r#"[{"companyName": "Engine Works", "title": "Analyst", "startYear": 2012, "endYear": 2016}]"#))
        .with("University", json!("Cambridge"));

    let report = graph.ingest(&[raw], &Provenance::new("crm")).await.unwrap();
    assert!(report.construct.failures.is_empty(), "{:?}", report.construct.failures);

    let store = graph.store();
    let ada = NodeId::for_name(Label::Person, "Ada Byron");
    let rels = store.relationships();
    let from_ada: Vec<(String, String)> = rels
        .iter()
        .filter(|r| r.from_id == ada)
        .map(|r| (r.rel_type.to_string(), r.to_id.to_string()))
        .collect();
    assert_eq!(
        from_ada,
        [
            ("ATTENDED_SCHOOL".to_string(), "school:cambridge".to_string()),
            ("KNOWS".to_string(), "person:charles-babbage".to_string()),
            ("WORKED_AT".to_string(), "firm:analytical-partners".to_string()),
            ("WORKED_AT".to_string(), "firm:engine-works".to_string()),
        ]
    );

    let knows = rels.iter().find(|r| r.rel_type == RelType::Knows).unwrap();
    assert_eq!(knows.properties.mutual_count, Some(8));
    assert!((knows.properties.strength.unwrap() - 0.82).abs() < 1e-9);
    assert_eq!(knows.properties.last_seen.map(|d| d.to_string()).as_deref(), Some("2024-11-02"));

    let engine_works = rels.iter().find(|r| r.to_id.as_str() == "firm:engine-works").unwrap();
    assert_eq!(engine_works.properties.role.as_deref(), Some("Analyst"));
    assert_eq!(engine_works.properties.is_current, Some(false));
}

#[tokio::test]
async fn test_name_only_row_builds_person_not_firm() {
    let graph = IntroGraph::open_memory();
    let raw = RawRecord::new()
        .with("Full Name", json!("Jane Doe"))
        .with("Personal Connections", json!("Worked with Bob Stone at KKR"))
        .with("School", json!("Wharton"));

    let report = graph.ingest(&[raw], &Provenance::new("csv")).await.unwrap();
    assert_eq!(report.rows_imported, 1);
    let construct = &report.construct;
    assert!(construct.failures.is_empty(), "{:?}", construct.failures);
    assert_eq!((construct.persons, construct.firms, construct.schools), (2, 0, 1));
    assert_eq!(construct.relationships, 2);

    let store = graph.store();
    let jane = store.get_node(&NodeId::for_name(Label::Person, "Jane Doe")).await.unwrap();
    assert!(jane.is_some_and(|n| n.properties.firm.is_none()));
    assert!(store.get_node(&NodeId::for_name(Label::Firm, "Jane Doe")).await.unwrap().is_none());

    let from_jane: Vec<(String, String)> = store
        .relationships()
        .into_iter()
        .map(|r| (r.rel_type.to_string(), r.to_id.to_string()))
        .collect();
    assert_eq!(
        from_jane,
        [
            ("ATTENDED_SCHOOL".to_string(), "school:wharton".to_string()),
            ("KNOWS".to_string(), "person:bob-stone".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_person_only_row_with_structured_connections() {
    let graph = IntroGraph::open_memory();
    let raw = RawRecord::new().with("Name", json!("Ada Byron")).with(
        "Personal Connections",
        json!(r#"[{"name": "Charles Babbage", "mutualCount": 4}, {"name": "Mary Somerville", "direction": "outgoing"}]"#),
    );

    let report = graph.ingest(&[raw], &Provenance::new("crm")).await.unwrap();
    assert!(report.construct.failures.is_empty(), "{:?}", report.construct.failures);
    assert_eq!((report.construct.persons, report.construct.firms), (3, 0));

    let rels = graph.store().relationships();
    let knows: Vec<_> = rels.iter().filter(|r| r.rel_type == RelType::Knows).collect();
    assert_eq!(knows.len(), 2);
    assert!(knows.iter().all(|r| r.from_id == NodeId::for_name(Label::Person, "Ada Byron")));

    let babbage = knows.iter().find(|r| r.to_id.as_str() == "person:charles-babbage").unwrap();
    assert_eq!(babbage.properties.mutual_count, Some(4));
    assert!((babbage.properties.strength.unwrap() - 0.66).abs() < 1e-9);
    assert!(!rels.iter().any(|r| r.rel_type == RelType::WorkedAt));
}

#[tokio::test]
async fn test_store_outage_is_a_hard_error() {
    let store = MemoryStore::new();
    let graph = IntroGraph::with_store(store.clone(), EngineConfig::default()).unwrap();
    store.set_unavailable(true);

    let err = graph.ingest(&[row("Ada Byron", "Acme")], &Provenance::new("csv")).await.unwrap_err();
    assert!(matches!(err, Error::StoreUnavailable(_)));
    assert!(!err.is_recoverable());
}

#[tokio::test]
async fn test_rejected_entity_is_skipped_not_fatal() {
    let store = MemoryStore::new();
    store.reject_entity("Shady Holdings");
    let graph = IntroGraph::with_store(store, EngineConfig::default()).unwrap();

    let report = graph
        .ingest(&[row("Ada Byron", "Shady Holdings"), row("Bob Stone", "Acme")], &Provenance::new("csv"))
        .await
        .unwrap();
    assert_eq!(report.construct.failures.len(), 1);
    assert_eq!(report.construct.failures[0].entity, "Shady Holdings");
    assert_eq!(graph.store().node_count().await.unwrap(), 3);
}

#[tokio::test]
async fn test_mutual_connections_through_the_handle() {
    let graph = IntroGraph::open_memory();
    let target = RawRecord::new()
        .with("Name", json!("Tess Target"))
        .with("Firm", json!("Zenith"))
        .with("LinkedIn", json!("https://www.linkedin.com/in/tess"));
    graph.ingest(&[target], &Provenance::new("csv")).await.unwrap();

    let records = [
        MutualConnection::new("Mia Mutual", MutualSource::Api)
            .with_seed("Sam Seed")
            .with_seed("Sue Seed")
            .with_target("www.linkedin.com/in/tess"),
    ];
    let report = graph.ingest_mutual_connections(&records).await.unwrap();
    assert!(report.failures.is_empty(), "{:?}", report.failures);
    assert_eq!(report.relationships, 3);

    let tess = NodeId::for_name(Label::Person, "Tess Target");
    let into_tess: Vec<_> = graph
        .store()
        .relationships()
        .into_iter()
        .filter(|r| r.to_id == tess && r.rel_type == RelType::ConnectedViaMutual)
        .collect();
    assert_eq!(into_tess.len(), 1);
    assert_eq!(into_tess[0].properties.weight, Some(0.8));
}

#[tokio::test]
async fn test_dry_run_exports_merge_script() {
    let store = MemoryStore::new();
    let resolver = EntityResolver::new(&EngineConfig::default());
    let mut contact = Contact::new(Source::new("csv"));
    contact.name = Some("Ada Byron".into());
    contact.firm = Some("Acme".into());
    contact.role = Some("Partner".into());

    let report = GraphConstructor::new(&store, &resolver, ConstructOptions::default().dry_run())
        .construct(&[contact])
        .await
        .unwrap();
    assert_eq!(store.node_count().await.unwrap(), 0);

    let script = cypher_string(&report.mutations).unwrap();
    assert!(script.contains("MERGE (n:Person {id: 'person:ada-byron'})"));
    assert!(script.contains("MERGE (n:Firm {id: 'firm:acme'})"));
    assert!(script.contains("MERGE (a)-[r:WORKED_AT]->(b) SET r += {role: 'Partner'"));
    assert_eq!(script.matches("MERGE (").count(), 3);
}
