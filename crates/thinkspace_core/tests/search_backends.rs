use chrono::{DateTime, Duration, TimeZone, Utc};
use rusqlite::Connection;
use std::collections::BTreeSet;
use std::sync::Arc;
use thinkspace_core::db::open_db_in_memory;
use thinkspace_core::search::index::{probe_fts5, provision_index};
use thinkspace_core::{
    parse_since, parse_until, BackendKind, FtsBackend, ManualClock, NewNote, NoteId, NoteQuery,
    NoteRepository, NoteService, QueryEngine, SearchBackend, SearchCapability, SearchError,
    SearchIndexManager, SearchMode, SqliteNoteRepository, SubstringBackend, ValidationError,
};

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 5, day, hour, 0, 0).unwrap()
}

fn indexed_backend(conn: &mut Connection) -> Box<dyn SearchBackend> {
    let manager = SearchIndexManager::probe(conn, SearchMode::Auto);
    assert!(manager.capability().fts5);
    let backend = manager.select_backend(conn);
    assert_eq!(backend.kind(), BackendKind::Indexed);
    backend
}

fn unavailable_backend(conn: &mut Connection) -> Box<dyn SearchBackend> {
    let manager = SearchIndexManager::new(SearchCapability { fts5: false }, SearchMode::Auto);
    let backend = manager.select_backend(conn);
    assert_eq!(backend.kind(), BackendKind::Fallback);
    backend
}

fn insert(conn: &mut Connection, clock: &Arc<ManualClock>, note: NewNote) -> NoteId {
    let mut repo = SqliteNoteRepository::with_clock(conn, clock.clone());
    repo.insert(&note).unwrap()
}

fn ids(conn: &Connection, backend: &dyn SearchBackend, query: &NoteQuery) -> Vec<NoteId> {
    QueryEngine::new(conn, backend)
        .query(query)
        .unwrap()
        .into_iter()
        .map(|note| note.id)
        .collect()
}

fn id_set(conn: &Connection, backend: &dyn SearchBackend, query: &NoteQuery) -> BTreeSet<NoteId> {
    ids(conn, backend, query).into_iter().collect()
}

/// Store with the index provisioned and a small mixed corpus.
fn seeded_store() -> (Connection, Vec<NoteId>) {
    let mut conn = open_db_in_memory().unwrap();
    indexed_backend(&mut conn);
    let clock = Arc::new(ManualClock::new(at(1, 9)));

    let mut created = Vec::new();
    let fixtures = [
        ("deploy checklist for staging", Some("infra"), 1),
        ("deploy rollback plan", Some("infra"), 3),
        ("write deploy notes", Some("docs"), 3),
        ("grocery list: milk, eggs", None, 5),
        ("Deploy freeze starts friday", Some("INFRA"), 8),
    ];
    for (text, project, day) in fixtures {
        clock.set(at(day, 9));
        let mut note = NewNote::new(text);
        if let Some(project) = project {
            note = note.with_project(project);
        }
        created.push(insert(&mut conn, &clock, note));
    }
    (conn, created)
}

#[test]
fn fts5_is_available_in_bundled_sqlite() {
    let conn = open_db_in_memory().unwrap();
    assert!(probe_fts5(&conn));
}

#[test]
fn captured_note_is_immediately_searchable_under_both_backends() {
    let cases = [
        ("todo: fix env var issue", "env"),
        ("release blocked!!!", "!!!"),
        ("naïve café opening", "café"),
        ("Mixed CASE heading", "mixed case"),
    ];

    for (text, query) in cases {
        for use_index in [true, false] {
            let mut conn = open_db_in_memory().unwrap();
            let backend = if use_index {
                indexed_backend(&mut conn)
            } else {
                unavailable_backend(&mut conn)
            };
            let clock = Arc::new(ManualClock::new(at(2, 10)));
            let id = insert(&mut conn, &clock, NewNote::new(text));

            let found = ids(&conn, backend.as_ref(), &NoteQuery::text(query));
            assert_eq!(
                found,
                vec![id],
                "query `{query}` with backend {}",
                backend.kind()
            );
        }
    }
}

#[test]
fn fallback_matching_is_case_insensitive() {
    let mut conn = open_db_in_memory().unwrap();
    let backend = unavailable_backend(&mut conn);
    let clock = Arc::new(ManualClock::new(at(2, 10)));
    let id = insert(&mut conn, &clock, NewNote::new("Deploy Checklist"));

    assert_eq!(ids(&conn, backend.as_ref(), &NoteQuery::text("deploy")), vec![id]);
    assert_eq!(ids(&conn, backend.as_ref(), &NoteQuery::text("CHECKLIST")), vec![id]);
}

#[test]
fn fallback_treats_like_wildcards_literally() {
    let mut conn = open_db_in_memory().unwrap();
    let backend = unavailable_backend(&mut conn);
    let clock = Arc::new(ManualClock::new(at(2, 10)));
    let percent = insert(&mut conn, &clock, NewNote::new("coverage at 100% now"));
    let _plain = insert(&mut conn, &clock, NewNote::new("coverage at 1000 lines"));
    let underscore = insert(&mut conn, &clock, NewNote::new("rename snake_case fields"));

    assert_eq!(ids(&conn, backend.as_ref(), &NoteQuery::text("100%")), vec![percent]);
    assert_eq!(ids(&conn, backend.as_ref(), &NoteQuery::text("_")), vec![underscore]);
}

#[test]
fn both_backends_match_project_tags() {
    let (mut conn, _) = seeded_store();
    let clock = Arc::new(ManualClock::new(at(20, 9)));
    let tagged = insert(
        &mut conn,
        &clock,
        NewNote::new("refactor loader").with_tags(["backlog"]),
    );

    let query = NoteQuery::text("backlog");
    assert_eq!(ids(&conn, &FtsBackend, &query), vec![tagged]);
    assert_eq!(ids(&conn, &SubstringBackend, &query), vec![tagged]);
}

#[test]
fn indexed_backend_matches_term_prefixes() {
    let mut conn = open_db_in_memory().unwrap();
    let backend = indexed_backend(&mut conn);
    let clock = Arc::new(ManualClock::new(at(2, 10)));
    let id = insert(&mut conn, &clock, NewNote::new("configuration drift in prod"));

    assert_eq!(ids(&conn, backend.as_ref(), &NoteQuery::text("config")), vec![id]);
    assert_eq!(
        ids(&conn, backend.as_ref(), &NoteQuery::text("drift config")),
        vec![id]
    );
    assert!(ids(&conn, backend.as_ref(), &NoteQuery::text("drift staging")).is_empty());
}

#[test]
fn indexed_backend_accepts_fts_syntax_as_plain_text() {
    let mut conn = open_db_in_memory().unwrap();
    let backend = indexed_backend(&mut conn);
    let clock = Arc::new(ManualClock::new(at(2, 10)));
    let id = insert(&mut conn, &clock, NewNote::new("why NOT \"quote\" this (ever)"));

    for query in ["NOT", "\"quote\"", "(ever)", "this OR", "col:umn*"] {
        let result = QueryEngine::new(&conn, backend.as_ref()).query(&NoteQuery::text(query));
        assert!(result.is_ok(), "query `{query}` failed: {result:?}");
    }
    assert_eq!(ids(&conn, backend.as_ref(), &NoteQuery::text("\"quote\"")), vec![id]);
}

#[test]
fn text_made_of_combining_marks_finds_its_note_under_both_backends() {
    for text in ["\u{903}\u{903}", "\u{345}", "hello \u{903}"] {
        let mut indexed_conn = open_db_in_memory().unwrap();
        let indexed = indexed_backend(&mut indexed_conn);
        let mut fallback_conn = open_db_in_memory().unwrap();
        let fallback = unavailable_backend(&mut fallback_conn);
        let clock = Arc::new(ManualClock::new(at(4, 8)));

        let indexed_id = insert(&mut indexed_conn, &clock, NewNote::new(text));
        let fallback_id = insert(&mut fallback_conn, &clock, NewNote::new(text));

        assert!(
            ids(&indexed_conn, indexed.as_ref(), &NoteQuery::text(text)).contains(&indexed_id),
            "indexed search missed {text:?}"
        );
        assert!(
            ids(&fallback_conn, fallback.as_ref(), &NoteQuery::text(text)).contains(&fallback_id),
            "fallback search missed {text:?}"
        );
    }
}

#[test]
fn non_ascii_case_is_ignored_under_both_backends() {
    let mut indexed_conn = open_db_in_memory().unwrap();
    let indexed = indexed_backend(&mut indexed_conn);
    let mut fallback_conn = open_db_in_memory().unwrap();
    let fallback = unavailable_backend(&mut fallback_conn);
    let clock = Arc::new(ManualClock::new(at(4, 9)));

    let note = || NewNote::new("über die Brücke").with_tags(vec!["ÄRGER".to_string()]);
    let indexed_id = insert(&mut indexed_conn, &clock, note());
    let fallback_id = insert(&mut fallback_conn, &clock, note());

    for query in ["Über", "BRÜCKE", "ärger"] {
        assert_eq!(
            ids(&indexed_conn, indexed.as_ref(), &NoteQuery::text(query)),
            vec![indexed_id],
            "indexed search for {query:?}"
        );
        assert_eq!(
            ids(&fallback_conn, fallback.as_ref(), &NoteQuery::text(query)),
            vec![fallback_id],
            "fallback search for {query:?}"
        );
    }
}

#[test]
fn filters_select_the_same_notes_under_both_backends() {
    let (conn, created) = seeded_store();

    let queries = [
        NoteQuery::text("deploy"),
        NoteQuery::text("deploy").with_project("infra"),
        NoteQuery::text("deploy").with_since(parse_since("2025-05-03").unwrap()),
        NoteQuery::text("deploy")
            .with_since(parse_since("2025-05-02").unwrap())
            .with_until(parse_until("2025-05-03").unwrap()),
        NoteQuery::text("deploy").with_project("docs"),
        NoteQuery::text("missing"),
    ];

    for query in &queries {
        assert_eq!(
            id_set(&conn, &FtsBackend, query),
            id_set(&conn, &SubstringBackend, query),
            "{query:?}"
        );
    }

    let infra: BTreeSet<_> = [created[0], created[1], created[4]].into_iter().collect();
    assert_eq!(id_set(&conn, &FtsBackend, &queries[1]), infra);
    let window: BTreeSet<_> = [created[1], created[2]].into_iter().collect();
    assert_eq!(id_set(&conn, &SubstringBackend, &queries[3]), window);
}

#[test]
fn listing_without_text_is_identical_under_both_backends() {
    let (conn, created) = seeded_store();

    let query = NoteQuery::listing(10);
    let indexed = ids(&conn, &FtsBackend, &query);
    let fallback = ids(&conn, &SubstringBackend, &query);
    assert_eq!(indexed, fallback);
    assert_eq!(
        indexed,
        vec![created[4], created[3], created[2], created[1], created[0]]
    );

    let blank = NoteQuery::text("   ").with_limit(2);
    assert_eq!(ids(&conn, &FtsBackend, &blank), vec![created[4], created[3]]);
}

#[test]
fn fallback_results_keep_recency_order() {
    let (conn, created) = seeded_store();

    assert_eq!(
        ids(&conn, &SubstringBackend, &NoteQuery::text("deploy")),
        vec![created[4], created[2], created[1], created[0]]
    );
}

#[test]
fn limit_caps_the_result_count() {
    let (conn, _) = seeded_store();
    let query = NoteQuery::text("deploy").with_limit(2);

    assert_eq!(ids(&conn, &FtsBackend, &query).len(), 2);
    assert_eq!(ids(&conn, &SubstringBackend, &query).len(), 2);
}

#[test]
fn inverted_time_window_returns_nothing() {
    let (conn, _) = seeded_store();
    let query = NoteQuery::text("deploy")
        .with_since(at(9, 0))
        .with_until(at(1, 0));

    let listing = NoteQuery::listing(5)
        .with_since(at(9, 0))
        .with_until(at(1, 0));

    assert!(ids(&conn, &FtsBackend, &query).is_empty());
    assert!(ids(&conn, &SubstringBackend, &listing).is_empty());
}

#[test]
fn non_positive_limit_is_a_validation_error() {
    let (conn, _) = seeded_store();

    let backends: [&dyn SearchBackend; 2] = [&FtsBackend, &SubstringBackend];
    for backend in backends {
        let err = QueryEngine::new(&conn, backend)
            .query(&NoteQuery::text("deploy").with_limit(0))
            .unwrap_err();
        assert!(matches!(
            err,
            SearchError::Validation(ValidationError::NonPositiveLimit(0))
        ));
        assert!(err.is_validation());
    }
}

#[test]
fn deleted_notes_leave_the_index() {
    let (mut conn, created) = seeded_store();

    {
        let mut repo = SqliteNoteRepository::new(&mut conn);
        assert_eq!(repo.delete_by_ids(&[created[0]]).unwrap(), 1);
    }

    let found = id_set(&conn, &FtsBackend, &NoteQuery::text("checklist"));
    assert!(found.is_empty());
    let remaining: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM notes_fts WHERE notes_fts MATCH '\"checklist\"';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(remaining, 0);
}

#[test]
fn index_is_rebuilt_after_running_without_fts5() {
    let mut conn = open_db_in_memory().unwrap();
    indexed_backend(&mut conn);
    let clock = Arc::new(ManualClock::new(at(2, 10)));
    let before = insert(&mut conn, &clock, NewNote::new("indexed before outage"));

    unavailable_backend(&mut conn);
    let during = insert(&mut conn, &clock, NewNote::new("written during outage"));
    {
        let mut repo = SqliteNoteRepository::new(&mut conn);
        repo.delete_by_ids(&[before]).unwrap();
    }

    let backend = indexed_backend(&mut conn);
    assert_eq!(
        ids(&conn, backend.as_ref(), &NoteQuery::text("outage")),
        vec![during]
    );
}

#[test]
fn forced_fallback_keeps_the_index_in_sync() {
    let mut conn = open_db_in_memory().unwrap();
    indexed_backend(&mut conn);

    let forced = SearchIndexManager::probe(&conn, SearchMode::Fallback).select_backend(&mut conn);
    assert_eq!(forced.kind(), BackendKind::Fallback);
    let clock = Arc::new(ManualClock::new(at(2, 10)));
    let id = insert(&mut conn, &clock, NewNote::new("captured while forced"));

    assert!(!provision_index(&mut conn).unwrap());
    assert_eq!(ids(&conn, &FtsBackend, &NoteQuery::text("forced")), vec![id]);
}

#[test]
fn provisioning_twice_only_rebuilds_once() {
    let mut conn = open_db_in_memory().unwrap();
    assert!(provision_index(&mut conn).unwrap());
    assert!(!provision_index(&mut conn).unwrap());
}

#[test]
fn capture_search_tags_delete_round_trip_in_a_repository() {
    let workspace = tempfile::tempdir().unwrap();
    let repo_root = workspace.path().join("my-repo");
    std::fs::create_dir_all(repo_root.join(".git")).unwrap();
    let cwd = repo_root.join("src");
    std::fs::create_dir_all(&cwd).unwrap();

    for use_index in [true, false] {
        let mut conn = open_db_in_memory().unwrap();
        let backend = if use_index {
            indexed_backend(&mut conn)
        } else {
            unavailable_backend(&mut conn)
        };
        let clock = Arc::new(ManualClock::new(at(14, 16)));
        let mut service = NoteService::new(&mut conn, backend).with_clock(clock.clone());

        let note = service
            .capture("todo: fix env var issue", &["bug".to_string()], &cwd)
            .unwrap();
        assert_eq!(note.project.as_deref(), Some("my-repo"));
        assert_eq!(
            note.tags,
            vec!["my-repo", "2025", "2025-05", "2025-05-14", "bug"]
        );

        let hits = service.search(&NoteQuery::text("env")).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, note.id);

        let tags = service.top_tags(10).unwrap();
        assert!(tags.iter().any(|tag| tag.tag == "my-repo" && tag.count == 1));
        assert!(tags.iter().any(|tag| tag.tag == "2025-05-14"));

        let plan = service.plan_deletion(&[note.id, note.id + 50]).unwrap();
        assert_eq!(plan.missing, vec![note.id + 50]);
        assert_eq!(plan.confirmed_ids(&[true]), vec![note.id]);
        assert_eq!(service.apply_deletion(&plan.confirmed_ids(&[true])).unwrap(), 1);

        assert!(service.search(&NoteQuery::text("env")).unwrap().is_empty());
        assert!(service.recent(5).unwrap().is_empty());
    }
}

#[test]
fn declined_deletion_keeps_the_note() {
    let mut conn = open_db_in_memory().unwrap();
    let backend = indexed_backend(&mut conn);
    let clock = Arc::new(ManualClock::new(at(14, 16)));
    let mut service = NoteService::new(&mut conn, backend).with_clock(clock);

    let note = service
        .capture_note(&NewNote::new("keep this one"))
        .unwrap();
    let plan = service.plan_deletion(&[note.id]).unwrap();
    let confirmed = plan.confirmed_ids(&[false]);
    assert!(confirmed.is_empty());
    assert_eq!(service.apply_deletion(&confirmed).unwrap(), 0);
    assert_eq!(service.recent(5).unwrap().len(), 1);
}

#[test]
fn equal_timestamps_break_ties_by_newest_id() {
    let mut conn = open_db_in_memory().unwrap();
    unavailable_backend(&mut conn);
    let clock = Arc::new(ManualClock::new(at(2, 10)));
    let first = insert(&mut conn, &clock, NewNote::new("same instant one"));
    let second = insert(&mut conn, &clock, NewNote::new("same instant two"));
    clock.advance(Duration::milliseconds(1));
    let third = insert(&mut conn, &clock, NewNote::new("same instant three"));

    assert_eq!(
        ids(&conn, &SubstringBackend, &NoteQuery::text("same instant")),
        vec![third, second, first]
    );
}
