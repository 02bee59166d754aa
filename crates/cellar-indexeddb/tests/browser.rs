//! Browser integration tests for Database and Model
//!
//! Run with `wasm-pack test --headless --chrome` (or firefox). Each test
//! uses its own database name and deletes it up front, so reruns start
//! clean even when a previous run aborted.

#![cfg(target_arch = "wasm32")]

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use wasm_bindgen_test::*;

use cellar_indexeddb::{
    ClassDescriptor, Database, Error, IndexSpec, PrimaryKey, PrimaryKeyOptions,
    PropertyDescriptor, Record, SelectOptions, TableConfig, TableDef, TableModel,
};

wasm_bindgen_test_configure!(run_in_browser);

fn rec(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        _ => panic!("test record must be an object"),
    }
}

/// Auto-increment table with timestamps and an `author` index.
fn books_table() -> TableConfig {
    let mut table = TableConfig::new("books");
    table.timestamps = true;
    table
        .indexes
        .insert("author".to_string(), IndexSpec::default());
    table
}

/// Manual-key table: records must carry `isbn`.
fn archive_table() -> TableConfig {
    let mut table = TableConfig::new("archive");
    table.primary_key = PrimaryKey {
        name: "isbn".to_string(),
        auto_increment: false,
        unique: true,
    };
    table
}

async fn open_db(name: &str, version: u32, tables: Vec<TableConfig>) -> Database {
    let defs = tables.into_iter().map(TableDef::Config).collect();
    let db = Database::new(name, version, defs).unwrap();
    db.connect().await.unwrap();
    db
}

async fn fresh(name: &str) {
    let _ = Database::remove_database(name).await;
}

#[wasm_bindgen_test]
async fn insert_then_select_by_pk_round_trips() {
    fresh("t-insert-select").await;
    let db = open_db("t-insert-select", 1, vec![books_table()]).await;
    let books = db.model_by_name("books").unwrap();

    let stored = books
        .insert(&rec(json!({"title": "Dune", "author": "Herbert"})))
        .await
        .unwrap();

    // Auto-increment wrote the generated key back; timestamps injected.
    let key = stored.get("id").cloned().expect("generated key");
    assert!(stored.contains_key("createdAt"));
    assert!(stored.contains_key("updatedAt"));

    let found = books.select_by_pk(&key).await.unwrap().expect("record");
    assert_eq!(found.get("title"), Some(&json!("Dune")));
    assert_eq!(found.get("createdAt"), stored.get("createdAt"));
}

#[wasm_bindgen_test]
async fn insert_without_manual_key_fails_validation() {
    fresh("t-manual-key").await;
    let db = open_db("t-manual-key", 1, vec![archive_table()]).await;
    let archive = db.model_by_name("archive").unwrap();

    let err = archive
        .insert(&rec(json!({"title": "no isbn"})))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    // With the key present the same record goes in.
    archive
        .insert(&rec(json!({"isbn": "978-3", "title": "ok"})))
        .await
        .unwrap();
}

#[wasm_bindgen_test]
async fn duplicate_manual_key_surfaces_host_error() {
    fresh("t-duplicate").await;
    let db = open_db("t-duplicate", 1, vec![archive_table()]).await;
    let archive = db.model_by_name("archive").unwrap();

    archive.insert(&rec(json!({"isbn": "978-3"}))).await.unwrap();
    let err = archive
        .insert(&rec(json!({"isbn": "978-3"})))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Storage(_)));
}

#[wasm_bindgen_test]
async fn update_by_pk_merges_over_existing_fields() {
    fresh("t-update").await;
    let db = open_db("t-update", 1, vec![books_table()]).await;
    let books = db.model_by_name("books").unwrap();

    let stored = books
        .insert(&rec(json!({"title": "Dune", "author": "Herbert"})))
        .await
        .unwrap();
    let key = stored["id"].clone();

    let updated = books
        .update_by_pk(&key, rec(json!({"title": "Dune Messiah"})))
        .await
        .unwrap();
    assert_eq!(updated["title"], json!("Dune Messiah"));

    let found = books.select_by_pk(&key).await.unwrap().unwrap();
    assert_eq!(found["title"], json!("Dune Messiah"));
    // Untouched field kept its prior value.
    assert_eq!(found["author"], json!("Herbert"));
}

#[wasm_bindgen_test]
async fn update_by_pk_on_missing_key_persists_the_partial_alone() {
    // Documented behavior: the merge base for a missing record is empty,
    // so the partial (plus updatedAt) becomes the whole record.
    fresh("t-update-missing").await;
    let db = open_db("t-update-missing", 1, vec![books_table()]).await;
    let books = db.model_by_name("books").unwrap();

    let merged = books
        .update_by_pk(&json!(42), rec(json!({"title": "ghost"})))
        .await
        .unwrap();
    assert_eq!(merged["title"], json!("ghost"));
    assert!(merged.contains_key("updatedAt"));
    assert!(!merged.contains_key("createdAt"));
}

#[wasm_bindgen_test]
async fn delete_by_pk_is_idempotent() {
    fresh("t-delete").await;
    let db = open_db("t-delete", 1, vec![books_table()]).await;
    let books = db.model_by_name("books").unwrap();

    let stored = books.insert(&rec(json!({"title": "Dune"}))).await.unwrap();
    let key = stored["id"].clone();

    assert_eq!(books.delete_by_pk(&key).await.unwrap(), key);
    assert!(books.select_by_pk(&key).await.unwrap().is_none());

    // Deleting again still resolves with the key.
    assert_eq!(books.delete_by_pk(&key).await.unwrap(), key);
}

#[wasm_bindgen_test]
async fn index_lookups_return_first_and_all_matches() {
    fresh("t-index").await;
    let db = open_db("t-index", 1, vec![books_table()]).await;
    let books = db.model_by_name("books").unwrap();

    books
        .insert(&rec(json!({"title": "Dune", "author": "Herbert"})))
        .await
        .unwrap();
    books
        .insert(&rec(json!({"title": "Dune Messiah", "author": "Herbert"})))
        .await
        .unwrap();
    books
        .insert(&rec(json!({"title": "Hyperion", "author": "Simmons"})))
        .await
        .unwrap();

    let first = books
        .select_by_index("author", &json!("Herbert"))
        .await
        .unwrap()
        .expect("a match");
    assert_eq!(first["author"], json!("Herbert"));

    let all = books
        .select_by_index_all("author", &json!("Herbert"))
        .await
        .unwrap();
    assert_eq!(all.len(), 2);

    assert!(books
        .select_by_index("author", &json!("Tolkien"))
        .await
        .unwrap()
        .is_none());
}

#[wasm_bindgen_test]
async fn select_composes_filter_sort_and_limit() {
    fresh("t-select").await;
    let db = open_db("t-select", 1, vec![books_table()]).await;
    let books = db.model_by_name("books").unwrap();

    for (title, year) in [("b", 1965), ("a", 1969), ("c", 1953)] {
        books
            .insert(&rec(json!({"title": title, "year": year})))
            .await
            .unwrap();
    }

    let options = SelectOptions {
        sort_by: vec!["year".to_string()],
        order_by_desc: true,
        limit: Some(2),
        ..SelectOptions::default()
    };
    let result = books.select(options).await.unwrap();
    let titles: Vec<_> = result.iter().map(|r| r["title"].clone()).collect();
    assert_eq!(titles, vec![json!("a"), json!("b")]);
}

#[wasm_bindgen_test]
async fn reopen_with_same_version_keeps_data() {
    fresh("t-reopen").await;
    {
        let db = open_db("t-reopen", 1, vec![books_table()]).await;
        let books = db.model_by_name("books").unwrap();
        books.insert(&rec(json!({"title": "Dune"}))).await.unwrap();
        db.close();
    }

    let db = open_db("t-reopen", 1, vec![books_table()]).await;
    let books = db.model_by_name("books").unwrap();
    assert_eq!(books.count().await.unwrap(), 1);
}

#[wasm_bindgen_test]
async fn version_bump_drops_removed_tables_and_keeps_the_rest() {
    fresh("t-upgrade").await;
    {
        let db = open_db("t-upgrade", 1, vec![books_table(), archive_table()]).await;
        let books = db.model_by_name("books").unwrap();
        books.insert(&rec(json!({"title": "Dune"}))).await.unwrap();
        let archive = db.model_by_name("archive").unwrap();
        archive.insert(&rec(json!({"isbn": "978-3"}))).await.unwrap();
        db.close();
    }

    // v2 drops `archive`; `books` survives and its index is re-created
    // without error even though it already exists.
    {
        let db = open_db("t-upgrade", 2, vec![books_table()]).await;
        let books = db.model_by_name("books").unwrap();
        assert_eq!(books.count().await.unwrap(), 1);
        assert!(matches!(
            db.model_by_name("archive").unwrap_err(),
            Error::NotFound(_)
        ));
        db.close();
    }

    // v3 re-adds `archive`: it comes back fresh, its old data is gone.
    let db = open_db("t-upgrade", 3, vec![books_table(), archive_table()]).await;
    let archive = db.model_by_name("archive").unwrap();
    assert_eq!(archive.count().await.unwrap(), 0);
    let books = db.model_by_name("books").unwrap();
    assert_eq!(books.count().await.unwrap(), 1);
}

#[wasm_bindgen_test]
async fn dropped_connection_releases_the_database() {
    fresh("t-drop").await;
    {
        let db = open_db("t-drop", 1, vec![books_table()]).await;
        let books = db.model_by_name("books").unwrap();
        books.insert(&rec(json!({"title": "Dune"}))).await.unwrap();
        // No explicit close(); the handles just go out of scope.
    }

    // The v2 open would stay blocked if the abandoned handle still held
    // the database at v1.
    let db = open_db("t-drop", 2, vec![books_table()]).await;
    let books = db.model_by_name("books").unwrap();
    assert_eq!(books.count().await.unwrap(), 1);
}

#[wasm_bindgen_test]
async fn clear_empties_the_table() {
    fresh("t-clear").await;
    let db = open_db("t-clear", 1, vec![books_table()]).await;
    let books = db.model_by_name("books").unwrap();

    books.insert(&rec(json!({"title": "a"}))).await.unwrap();
    books.insert(&rec(json!({"title": "b"}))).await.unwrap();
    assert_eq!(books.count().await.unwrap(), 2);

    books.clear().await.unwrap();
    assert_eq!(books.count().await.unwrap(), 0);
    assert!(books.select_all().await.unwrap().is_empty());
}

#[wasm_bindgen_test]
async fn init_data_is_seeded_only_on_first_creation() {
    fresh("t-seed").await;
    let mut table = books_table();
    table.init_data = vec![
        rec(json!({"title": "seed-1"})),
        rec(json!({"title": "seed-2"})),
    ];

    {
        let db = open_db("t-seed", 1, vec![table.clone()]).await;
        let books = db.model_by_name("books").unwrap();
        assert_eq!(books.count().await.unwrap(), 2);
        let one = books.select_all().await.unwrap().remove(0);
        assert!(one.contains_key("createdAt"));
        books.delete_by_pk(&one["id"]).await.unwrap();
        db.close();
    }

    // A version bump on an existing store must not re-seed.
    let db = open_db("t-seed", 2, vec![table]).await;
    let books = db.model_by_name("books").unwrap();
    assert_eq!(books.count().await.unwrap(), 1);
}

#[wasm_bindgen_test]
async fn seed_records_missing_their_key_are_skipped() {
    fresh("t-seed-skip").await;
    let mut table = archive_table();
    table.init_data = vec![
        rec(json!({"title": "keyless"})),
        rec(json!({"isbn": "978-3", "title": "kept"})),
    ];

    // The keyless record is dropped during seeding; the valid one and the
    // migration itself go through.
    let db = open_db("t-seed-skip", 1, vec![table]).await;
    let archive = db.model_by_name("archive").unwrap();
    assert_eq!(archive.count().await.unwrap(), 1);
    let kept = archive
        .select_by_pk(&json!("978-3"))
        .await
        .unwrap()
        .expect("valid seed record");
    assert_eq!(kept["title"], json!("kept"));
}

#[wasm_bindgen_test]
async fn model_access_is_gated_on_registry_and_connection() {
    fresh("t-gates").await;
    let db = Database::new(
        "t-gates",
        1,
        vec![TableDef::Config(books_table())],
    )
    .unwrap();

    assert_eq!(db.name(), "t-gates");
    assert_eq!(db.version(), 1);
    assert_eq!(db.table_names(), vec!["books"]);
    assert!(!db.is_connected());

    // Before connect(): State error even for a configured table.
    assert!(matches!(
        db.model_by_name("books").unwrap_err(),
        Error::State(_)
    ));

    db.connect().await.unwrap();
    assert!(db.is_connected());
    assert!(db.model_by_name("books").is_ok());
    assert!(matches!(
        db.model_by_name("nope").unwrap_err(),
        Error::NotFound(_)
    ));
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Book {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<i64>,
    title: String,
    author: String,
    #[serde(skip_serializing_if = "Option::is_none", rename = "createdAt")]
    created_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "updatedAt")]
    updated_at: Option<i64>,
}

impl TableModel for Book {
    fn class_meta() -> ClassDescriptor {
        let mut meta = ClassDescriptor::new("typed_books");
        meta.timestamps = true;
        meta
    }

    fn property_meta() -> BTreeMap<String, PropertyDescriptor> {
        let mut props = BTreeMap::new();
        props.insert(
            "id".to_string(),
            PropertyDescriptor::primary_key(PrimaryKeyOptions::default()),
        );
        props.insert(
            "author".to_string(),
            PropertyDescriptor::indexed(Default::default()),
        );
        props
    }
}

#[wasm_bindgen_test]
async fn typed_models_decode_results_into_their_own_shape() {
    fresh("t-typed").await;
    let db = Database::new("t-typed", 1, vec![TableDef::model::<Book>()]).unwrap();
    db.connect().await.unwrap();
    let books = db.model::<Book>().unwrap();

    let stored = books
        .insert(&Book {
            id: None,
            title: "Dune".to_string(),
            author: "Herbert".to_string(),
            created_at: None,
            updated_at: None,
        })
        .await
        .unwrap();

    let id = stored.id.expect("generated key");
    assert!(stored.created_at.is_some());

    let found = books
        .select_by_pk(&json!(id))
        .await
        .unwrap()
        .expect("record");
    assert_eq!(found.title, "Dune");
    assert_eq!(found.author, "Herbert");

    let by_author = books
        .select_by_index("author", &json!("Herbert"))
        .await
        .unwrap();
    assert!(by_author.is_some());
}

#[wasm_bindgen_test]
async fn remove_database_resolves_with_confirmation() {
    fresh("t-remove").await;
    {
        let db = open_db("t-remove", 1, vec![books_table()]).await;
        db.close();
    }
    let message = Database::remove_database("t-remove").await.unwrap();
    assert!(message.contains("t-remove"));
}
