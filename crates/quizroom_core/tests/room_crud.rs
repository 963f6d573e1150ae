use quizroom_core::db::open_db_in_memory;
use quizroom_core::{CoreConfig, RepoError, Repositories, Room, SchemaError, SqliteDocumentStore};
use serde_json::json;

#[test]
fn join_code_is_protected_but_live_fields_are_not() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    let repos = Repositories::new(store, &CoreConfig::default()).unwrap();

    let created = repos.rooms.create(&Room::new(2, "XYZ", 42, 1)).unwrap();
    assert!(created.is_active);

    let err = repos
        .rooms
        .patch(2, &json!([{"op": "replace", "path": "/code", "value": "AAA"}]))
        .unwrap_err();
    assert!(matches!(err, RepoError::ProtectedField(_)));

    let patched = repos
        .rooms
        .patch(2, &json!([{"op": "replace", "path": "/is_active", "value": false}]))
        .unwrap();
    assert!(!patched.is_active);
    assert_eq!(patched.code, "XYZ");
}

#[test]
fn ownership_links_are_protected() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    let repos = Repositories::new(store, &CoreConfig::default()).unwrap();
    repos.rooms.create(&Room::new(2, "XYZ", 42, 1)).unwrap();

    for path in ["/owner_id", "/quiz_id", "/_id", "/id"] {
        let err = repos
            .rooms
            .patch(2, &json!([{"op": "replace", "path": path, "value": 7}]))
            .unwrap_err();
        assert!(
            matches!(err, RepoError::ProtectedField(_)),
            "path {path} must be protected"
        );
    }
}

#[test]
fn players_join_through_patch_and_duplicates_are_rejected() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    let repos = Repositories::new(store, &CoreConfig::default()).unwrap();
    repos.rooms.create(&Room::new(2, "XYZ", 42, 1)).unwrap();

    let room = repos
        .rooms
        .patch(
            2,
            &json!([
                {"op": "add", "path": "/players/-", "value": " ada "},
                {"op": "replace", "path": "/current_question", "value": 0}
            ]),
        )
        .unwrap();
    assert_eq!(room.players, vec!["ada"]);
    assert_eq!(room.current_question, Some(0));

    let err = repos
        .rooms
        .patch(2, &json!([{"op": "add", "path": "/players/-", "value": "ada"}]))
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(SchemaError::DuplicatePlayer(_))
    ));
    assert_eq!(repos.rooms.get(2).unwrap().unwrap().players, vec!["ada"]);
}

#[test]
fn find_active_by_code_follows_active_flag() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    let repos = Repositories::new(store, &CoreConfig::default()).unwrap();
    repos.rooms.create(&Room::new(2, "xyz", 42, 1)).unwrap();

    assert_eq!(repos.rooms.find_active_by_code("Xyz").unwrap().unwrap().id, 2);

    repos
        .rooms
        .patch(2, &json!([{"op": "replace", "path": "/is_active", "value": false}]))
        .unwrap();
    assert!(repos.rooms.find_active_by_code("XYZ").unwrap().is_none());
}

#[test]
fn quiz_and_room_identities_do_not_collide() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    let repos = Repositories::new(store, &CoreConfig::default()).unwrap();

    repos.rooms.create(&Room::new(1, "ABC", 42, 1)).unwrap();
    assert!(repos.quizzes.get(1).unwrap().is_none());
    assert!(!repos.quizzes.delete(1).unwrap());
    assert!(repos.rooms.get(1).unwrap().is_some());
}
