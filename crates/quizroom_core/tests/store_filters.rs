use quizroom_core::db::open_db_in_memory;
use quizroom_core::{DocumentFilter, DocumentStore, MemoryDocumentStore, SqliteDocumentStore};
use serde_json::{json, Value};

fn seed<St: DocumentStore>(store: &St) {
    for document in [
        json!({"_id": 1, "is_active": true, "owner": 42, "code": "42", "score": 1.5}),
        json!({"_id": 2, "is_active": false, "owner": 42.0, "code": "ABC", "score": null}),
        json!({"_id": 3, "is_active": 1, "owner": "42", "code": "abc"}),
        json!({"_id": 4, "is_active": 0, "owner": 7, "score": 1}),
    ] {
        store.insert("docs", &document).unwrap();
    }
}

fn ids<St: DocumentStore>(store: &St, filter: &DocumentFilter) -> Vec<i64> {
    store
        .find_many("docs", filter)
        .unwrap()
        .iter()
        .map(|document| document["_id"].as_i64().unwrap())
        .collect()
}

#[test]
fn sqlite_and_memory_engines_agree_on_every_filter() {
    let conn = open_db_in_memory().unwrap();
    let sqlite = SqliteDocumentStore::try_new(&conn).unwrap();
    let memory = MemoryDocumentStore::new();
    seed(&sqlite);
    seed(&memory);

    let conditions: Vec<(&str, Value)> = vec![
        ("is_active", json!(true)),
        ("is_active", json!(false)),
        ("is_active", json!(1)),
        ("is_active", json!(0)),
        ("owner", json!(42)),
        ("owner", json!(42.0)),
        ("owner", json!("42")),
        ("code", json!("42")),
        ("code", json!(42)),
        ("code", json!("ABC")),
        ("score", json!(1.5)),
        ("score", json!(1)),
        ("score", json!(1.0)),
        ("score", Value::Null),
        ("missing", Value::Null),
    ];

    for (field, value) in conditions {
        let filter = DocumentFilter::new().field_eq(field, value.clone());
        assert_eq!(
            ids(&sqlite, &filter),
            ids(&memory, &filter),
            "engines disagree on {field} == {value}"
        );
    }

    let combined = DocumentFilter::new()
        .field_eq("owner", 42)
        .field_eq("is_active", true);
    assert_eq!(ids(&sqlite, &combined), vec![1]);
    assert_eq!(ids(&memory, &combined), vec![1]);
}

#[test]
fn boolean_filter_does_not_match_integer_flags() {
    let conn = open_db_in_memory().unwrap();
    let sqlite = SqliteDocumentStore::try_new(&conn).unwrap();
    seed(&sqlite);

    assert_eq!(
        ids(&sqlite, &DocumentFilter::new().field_eq("is_active", 1)),
        vec![3]
    );
    assert_eq!(
        ids(&sqlite, &DocumentFilter::new().field_eq("is_active", true)),
        vec![1]
    );
}
