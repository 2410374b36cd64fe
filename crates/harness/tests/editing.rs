use rotaplan_core::{FieldValue, ItemId, Weekday, PROVISIONAL_ORDER};
use rotaplan_engine::EngineError;
use rotaplan_harness::{task_draft, TestBoard};

// ============================================================================
// Draft mutation and the dirty flag
// ============================================================================

#[test]
fn reorder_marks_dirty() -> Result<(), Box<dyn std::error::Error>> {
    let mut board = TestBoard::new();
    board.seed(Weekday::Mon, &[("sweep lobby", 0), ("check boiler", 1)]);
    board.pump();
    assert!(!board.engine.is_dirty(Weekday::Mon));

    let mut items = board.items(Weekday::Mon);
    items.reverse();
    board.engine.reorder(Weekday::Mon, items)?;

    assert!(board.engine.is_dirty(Weekday::Mon));
    assert_eq!(board.titles(Weekday::Mon), vec!["check boiler", "sweep lobby"]);
    Ok(())
}

#[test]
fn insert_appends_with_local_id_and_provisional_order() -> Result<(), Box<dyn std::error::Error>> {
    let mut board = TestBoard::new();
    board.seed(Weekday::Mon, &[("sweep lobby", 0), ("check boiler", 1)]);
    board.pump();

    let id = board.engine.insert(Weekday::Mon, task_draft("replace filter"))?;
    assert!(id.is_local());
    assert!(board.engine.is_dirty(Weekday::Mon));

    let items = board.items(Weekday::Mon);
    let appended = items.last().unwrap();
    assert_eq!(appended.id, id);
    assert_eq!(appended.order, PROVISIONAL_ORDER);
    assert!(appended.active);
    Ok(())
}

#[test]
fn second_insert_orders_after_first() -> Result<(), Box<dyn std::error::Error>> {
    let mut board = TestBoard::new();
    board.pump();

    board.engine.insert(Weekday::Mon, task_draft("one"))?;
    board.engine.insert(Weekday::Mon, task_draft("two"))?;

    let items = board.items(Weekday::Mon);
    assert_eq!(items[0].order, PROVISIONAL_ORDER);
    assert_eq!(items[1].order, PROVISIONAL_ORDER + 1);
    Ok(())
}

#[test]
fn remove_marks_dirty_and_missing_id_is_a_no_op() -> Result<(), Box<dyn std::error::Error>> {
    let mut board = TestBoard::new();
    board.seed(Weekday::Mon, &[("sweep lobby", 0)]);
    board.pump();

    let absent = ItemId::fresh_local();
    board.engine.remove(Weekday::Mon, absent)?;
    assert!(!board.engine.is_dirty(Weekday::Mon));

    let id = board.items(Weekday::Mon)[0].id;
    board.engine.remove(Weekday::Mon, id)?;
    assert!(board.engine.is_dirty(Weekday::Mon));
    assert!(board.items(Weekday::Mon).is_empty());
    Ok(())
}

#[test]
fn edits_touch_only_their_bucket() -> Result<(), Box<dyn std::error::Error>> {
    let mut board = TestBoard::new();
    board.seed(Weekday::Mon, &[("sweep lobby", 0)]);
    board.seed(Weekday::Tue, &[("water plants", 0)]);
    board.pump();

    board.engine.insert(Weekday::Mon, task_draft("extra"))?;
    assert!(board.engine.is_dirty(Weekday::Mon));
    assert!(!board.engine.is_dirty(Weekday::Tue));
    Ok(())
}

// ============================================================================
// Reorder validation
// ============================================================================

#[test]
fn reorder_rejects_changed_item_set() {
    let mut board = TestBoard::new();
    board.seed(Weekday::Mon, &[("sweep lobby", 0), ("check boiler", 1)]);
    board.pump();

    let mut items = board.items(Weekday::Mon);
    items.pop();
    let err = board.engine.reorder(Weekday::Mon, items).unwrap_err();
    assert!(matches!(err, EngineError::ReorderMismatch(_)));
    // The failed call must not flip the dirty flag.
    assert!(!board.engine.is_dirty(Weekday::Mon));
}

#[test]
fn reorder_rejects_duplicate_ids() {
    let mut board = TestBoard::new();
    board.seed(Weekday::Mon, &[("sweep lobby", 0), ("check boiler", 1)]);
    board.pump();

    let items = board.items(Weekday::Mon);
    let doubled = vec![items[0].clone(), items[0].clone()];
    let err = board.engine.reorder(Weekday::Mon, doubled).unwrap_err();
    assert!(matches!(err, EngineError::DuplicateItem { .. }));
}

// ============================================================================
// Discard
// ============================================================================

#[test]
fn discard_restores_original_exactly() -> Result<(), Box<dyn std::error::Error>> {
    // Scenario: bucket has [a, b, c]; user removes b, then discards.
    let mut board = TestBoard::new();
    board.seed(Weekday::Mon, &[("a", 0), ("b", 1), ("c", 2)]);
    board.pump();
    let before = board.items(Weekday::Mon);

    let b = before[1].id;
    board.engine.remove(Weekday::Mon, b)?;
    assert_eq!(board.items(Weekday::Mon).len(), 2);

    board.engine.discard(Weekday::Mon)?;
    assert_eq!(board.items(Weekday::Mon), before);
    assert!(!board.engine.is_dirty(Weekday::Mon));
    Ok(())
}

#[test]
fn discard_is_idempotent() -> Result<(), Box<dyn std::error::Error>> {
    let mut board = TestBoard::new();
    board.seed(Weekday::Mon, &[("sweep lobby", 0)]);
    board.pump();

    board.engine.insert(Weekday::Mon, task_draft("extra"))?;
    board.engine.discard(Weekday::Mon)?;
    let after_first = board.items(Weekday::Mon);

    board.engine.discard(Weekday::Mon)?;
    assert_eq!(board.items(Weekday::Mon), after_first);
    assert!(!board.engine.is_dirty(Weekday::Mon));
    Ok(())
}

#[test]
fn discard_drops_never_committed_items_without_remote_effect(
) -> Result<(), Box<dyn std::error::Error>> {
    let mut board = TestBoard::new();
    board.pump();

    board.engine.insert(Weekday::Mon, task_draft("ghost"))?;
    board.engine.discard(Weekday::Mon)?;

    assert!(board.items(Weekday::Mon).is_empty());
    assert_eq!(board.store().commit_count(), 0);
    Ok(())
}

// ============================================================================
// Unknown buckets fail loudly
// ============================================================================

#[test]
fn operations_on_unknown_bucket_error() {
    // An engine opened over a subset of weekdays knows nothing about the
    // rest of the week.
    let store = rotaplan_store::MemoryStore::new();
    let mut engine = rotaplan_engine::SyncEngine::open(
        store,
        rotaplan_engine::DecodeRules::new(),
        [(Weekday::Mon, TestBoard::path(Weekday::Mon))],
    );
    engine.pump();

    let err = engine.discard(Weekday::Fri).unwrap_err();
    assert!(matches!(err, EngineError::UnknownBucket(_)));
    let err = engine.save(Weekday::Fri).unwrap_err();
    assert!(matches!(err, EngineError::UnknownBucket(_)));
    let err = engine.insert(Weekday::Fri, task_draft("x")).unwrap_err();
    assert!(matches!(err, EngineError::UnknownBucket(_)));
    assert!(engine.bucket(Weekday::Fri).is_none());
}

// ============================================================================
// Draft items carry their fields through edits
// ============================================================================

#[test]
fn inserted_item_keeps_domain_fields() -> Result<(), Box<dyn std::error::Error>> {
    let mut board = TestBoard::new();
    board.pump();

    let draft = task_draft("inspect roof")
        .with_field("priority", FieldValue::Integer(2))
        .with_field("description", FieldValue::Text("after the storm".into()));
    let id = board.engine.insert(Weekday::Sat, draft)?;

    let items = board.items(Weekday::Sat);
    let item = items.iter().find(|item| item.id == id).unwrap();
    assert_eq!(item.field("priority"), Some(&FieldValue::Integer(2)));
    assert_eq!(
        item.field("description"),
        Some(&FieldValue::Text("after the storm".into()))
    );
    Ok(())
}
