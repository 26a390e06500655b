mod helpers;

use helpers::*;
use keepsake::db;
use keepsake::error::QueryStage;
use keepsake::index::{EntryMetadata, IndexEntry};
use keepsake::journal::types::NewMemory;
use keepsake::{index, Error, MemoryService};

async fn remember(service: &MemoryService, user: &str, content: &str) -> String {
    service
        .create_memory(
            user,
            NewMemory {
                content: content.into(),
                ..NewMemory::default()
            },
        )
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn ranking_follows_similarity() {
    let (service, embedder, _) = test_service();
    embedder.map_text("exact", axis(0));
    embedder.map_text("close", near_axis(0));
    embedder.map_text("unrelated", axis(4));
    embedder.map_text("the query", axis(0));

    let exact = remember(&service, "u1", "exact").await;
    let close = remember(&service, "u1", "close").await;
    remember(&service, "u1", "unrelated").await;

    let outcome = service.query_memories("u1", "the query", None, None).await.unwrap();
    let ids: Vec<&str> = outcome.matches.iter().map(|m| m.memory.id.as_str()).collect();
    // The default floor (0.6) drops the orthogonal entry entirely
    assert_eq!(ids, vec![exact.as_str(), close.as_str()]);
    for pair in outcome.matches.windows(2) {
        assert!(pair[0].similarity >= pair[1].similarity);
    }
    assert!((outcome.confidence - outcome.matches[0].similarity).abs() < f64::EPSILON);
}

#[tokio::test]
async fn limit_caps_results() {
    let (service, embedder, _) = test_service();
    for i in 0..5 {
        let content = format!("entry {i}");
        embedder.map_text(&content, near_axis(0));
        remember(&service, "u1", &content).await;
    }
    embedder.map_text("q", axis(0));

    let outcome = service.query_memories("u1", "q", Some(2), None).await.unwrap();
    assert_eq!(outcome.matches.len(), 2);
}

#[tokio::test]
async fn results_are_user_scoped() {
    let (service, embedder, _) = test_service();
    embedder.map_text("mine", axis(0));
    embedder.map_text("theirs", near_axis(0));
    embedder.map_text("q", axis(0));

    remember(&service, "u1", "mine").await;
    remember(&service, "u2", "theirs").await;

    let outcome = service.query_memories("u1", "q", None, None).await.unwrap();
    assert_eq!(outcome.matches.len(), 1);
    assert_eq!(outcome.matches[0].memory.content, "mine");
}

#[tokio::test]
async fn empty_result_is_success_with_zero_confidence() {
    let (service, embedder, _) = test_service();
    embedder.map_text("entry", axis(0));
    embedder.map_text("far away query", axis(4));
    remember(&service, "u1", "entry").await;

    let outcome = service
        .query_memories("u1", "far away query", None, None)
        .await
        .unwrap();
    assert!(outcome.matches.is_empty());
    assert_eq!(outcome.confidence, 0.0);
    assert!(!outcome.explanation.is_empty());
}

#[tokio::test]
async fn explanation_comes_from_chat_service() {
    let (service, embedder, chat) = test_service();
    embedder.map_text("entry", axis(0));
    embedder.map_text("q", axis(0));
    remember(&service, "u1", "entry").await;

    chat.push_reply("These match because they describe the same morning.");
    let outcome = service.query_memories("u1", "q", None, None).await.unwrap();
    assert_eq!(
        outcome.explanation,
        "These match because they describe the same morning."
    );
}

#[tokio::test]
async fn empty_query_is_rejected() {
    let (service, _, _) = test_service();
    let err = service.query_memories("u1", "   ", None, None).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn stale_index_entries_are_dropped() {
    // Seed an index entry with no backing relational row before wiring the
    // service, simulating a crash between the two deletes.
    let conn = db::open_memory_database(DIMS).unwrap();
    index::upsert(
        &conn,
        &IndexEntry {
            id: "ghost".into(),
            user_id: "u1".into(),
            content: "gone".into(),
            summary: "gone".into(),
            metadata: EntryMetadata {
                title: None,
                people: String::new(),
                tags: String::new(),
                mood: 5,
            },
            embedding: axis(0),
        },
    )
    .unwrap();

    let (service, embedder, _) = service_over(conn);
    embedder.map_text("real entry", near_axis(0));
    embedder.map_text("q", axis(0));
    let real = remember(&service, "u1", "real entry").await;

    let outcome = service.query_memories("u1", "q", None, None).await.unwrap();
    let ids: Vec<&str> = outcome.matches.iter().map(|m| m.memory.id.as_str()).collect();
    assert_eq!(ids, vec![real.as_str()]);
}

#[tokio::test]
async fn embed_failure_surfaces_as_query_stage() {
    let (service, embedder, _) = test_service();
    embedder.set_failing(true);

    let err = service.query_memories("u1", "q", None, None).await.unwrap_err();
    match err {
        Error::Query { stage, .. } => assert_eq!(stage, QueryStage::Embed),
        other => panic!("unexpected error: {other}"),
    }
}
