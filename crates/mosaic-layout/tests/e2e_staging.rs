//! End-to-end editing sessions against the staging store.
//!
//! Each test loads a persisted descriptor (as JSON, the way hosts store it),
//! scripts a sequence of edits, and checks the committed output.
//!
//! Run with: `cargo test -p mosaic-layout --test e2e_staging -- --nocapture`

use mosaic_core::geometry::Point;
use mosaic_core::ids::TokenId;
use mosaic_layout::{
    EditFocus, EditorPolicy, IgnoredReason, Item, LayoutDescriptor, LayoutParser, RowRef,
    SectionLayout, StagedSection, StagingAction, StagingOutcome, StagingStore,
};
use serde_json::json;
use tracing_subscriber::util::SubscriberInitExt as _;

fn init_logging() -> tracing::subscriber::DefaultGuard {
    tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
        .finish()
        .set_default()
}

fn tokens(names: &[&str]) -> Vec<TokenId> {
    names.iter().copied().map(TokenId::from).collect()
}

fn render(section: &StagedSection) -> String {
    section
        .items()
        .iter()
        .map(|item| match item {
            Item::Token(t) => t.as_str().to_string(),
            Item::Whitespace(_) => "_".to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn row_sizes(section: &StagedSection) -> Vec<usize> {
    section.rows().map(|row| row.items.len()).collect()
}

fn descriptor(value: serde_json::Value) -> LayoutDescriptor {
    serde_json::from_value(value).expect("descriptor JSON")
}

#[test]
fn empty_collection_gets_default_section() {
    let _log = init_logging();
    let layout = descriptor(json!({
        "sections": [0, 4],
        "sectionLayout": [{ "columns": 5, "whitespace": [0] }]
    }));
    let mut store = StagingStore::default();
    let id = store.load_collection::<TokenId>(&[], &layout);

    let sections = store.collection(id).unwrap().sections();
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].columns(), 3);
    assert!(sections[0].items().is_empty());

    let encoded = store.commit(id).unwrap();
    assert!(encoded.tokens.is_empty());
    assert_eq!(serde_json::to_value(&encoded.layout).unwrap(), json!({
        "sections": [],
        "sectionLayout": []
    }));
}

#[test]
fn whitespace_offsets_replay_in_order() {
    let _log = init_logging();
    let names = tokens(&["A", "B", "C"]);
    let mut store = StagingStore::default();

    let single = store.load_collection(
        &names,
        &descriptor(json!({
            "sections": [0],
            "sectionLayout": [{ "columns": 4, "whitespace": [1] }]
        })),
    );
    let double = store.load_collection(
        &names,
        &descriptor(json!({
            "sections": [0],
            "sectionLayout": [{ "columns": 4, "whitespace": [1, 1] }]
        })),
    );

    assert_eq!(render(&store.collection(single).unwrap().sections()[0]), "A _ B C");
    assert_eq!(render(&store.collection(double).unwrap().sections()[0]), "A _ _ B C");
}

#[test]
fn column_change_rechunks_rows() {
    let _log = init_logging();
    let mut store = StagingStore::default();
    let id = store.load_collection(
        &tokens(&["a", "b", "c", "d", "e"]),
        &LayoutDescriptor::single_section(3),
    );
    let section = store.collection(id).unwrap().sections()[0].id();
    assert_eq!(row_sizes(&store.collection(id).unwrap().sections()[0]), vec![3, 2]);

    assert!(store.increment_columns(section).is_applied());

    let staged = &store.collection(id).unwrap().sections()[0];
    assert_eq!(staged.columns(), 4);
    assert_eq!(row_sizes(staged), vec![4, 1]);
    assert_eq!(store.staged_token_ids(id), tokens(&["a", "b", "c", "d", "e"]));
}

#[test]
fn healed_descriptor_commits_clean() {
    let _log = init_logging();
    let layout = descriptor(json!({
        "sections": [2, 1, 9],
        "sectionLayout": [{ "whitespace": [7] }, { "columns": 0 }]
    }));
    let names = tokens(&["a", "b", "c", "d"]);
    assert!(!layout.report(names.len()).is_clean());
    assert!(layout.validate_strict(names.len()).is_err());

    let mut store = StagingStore::default();
    let id = store.load_collection(&names, &layout);
    let encoded = store.commit(id).unwrap();
    assert_eq!(encoded.tokens, names);
    assert!(encoded.layout.validate_strict(encoded.tokens.len()).is_ok());
    // Offsets heal to [0, 1, 4]; the last span is empty and dropped. Both
    // sections fall back to one column and the overlong whitespace appends.
    assert_eq!(encoded.layout.sections, vec![0, 1]);
    assert_eq!(
        encoded.layout.section_layout,
        vec![SectionLayout::new(1).with_whitespace([1]), SectionLayout::new(1)]
    );
}

#[test]
fn curating_a_gallery() {
    let _log = init_logging();
    let mut store = StagingStore::new(EditorPolicy::default().with_max_columns(4));
    let id = store.load_collection(
        &tokens(&["a", "b", "c", "d", "e", "f"]),
        &descriptor(json!({
            "sections": [0, 4],
            "sectionLayout": [{ "columns": 2 }, { "columns": 3, "whitespace": [1] }]
        })),
    );
    let ids: Vec<_> = store
        .collection(id)
        .unwrap()
        .sections()
        .iter()
        .map(StagedSection::id)
        .collect();

    // Add a hero section up front and pull the second row into it.
    let hero = store.add_section(None).unwrap();
    store.move_section(hero, ids[0]);
    store.move_row(RowRef::new(ids[0], 1), RowRef::new(hero, 0));
    store.apply(StagingAction::SetColumns {
        section: hero,
        columns: 9,
    });

    // New tokens land after the selected row.
    store.select_row(RowRef::new(ids[0], 0));
    store.toggle_tokens_staged(tokens(&["g", "e"]));
    assert_eq!(store.focus(), EditFocus::RowSelected(RowRef::new(ids[0], 0)));

    let sections = store.collection(id).unwrap().sections();
    assert_eq!(render(&sections[0]), "c d");
    assert_eq!(sections[0].columns(), 4);
    assert_eq!(render(&sections[1]), "a b g e");
    assert_eq!(render(&sections[2]), "_ f");

    let encoded = store.commit(id).unwrap();
    assert_eq!(
        serde_json::to_value(&encoded).unwrap(),
        json!({
            "tokens": ["c", "d", "a", "b", "g", "e", "f"],
            "layout": {
                "sections": [0, 2, 6],
                "sectionLayout": [
                    { "columns": 4, "whitespace": [] },
                    { "columns": 2, "whitespace": [] },
                    { "columns": 3, "whitespace": [0] }
                ]
            }
        })
    );

    // Reloading the committed pair reproduces the same structure.
    let reloaded = store.load_collection(&encoded.tokens, &encoded.layout);
    assert_eq!(store.commit(reloaded).unwrap(), encoded);
}

#[test]
fn drag_session_commits_through_store() {
    let _log = init_logging();
    let mut store = StagingStore::default();
    let id = store.load_collection(
        &tokens(&["a", "b", "c", "d", "e"]),
        &LayoutDescriptor::single_section(3),
    );
    let section = store.collection(id).unwrap().sections()[0].id();
    let cell = store.policy().drag.cell_size;

    let mut drag = store.drag_controller(section).unwrap();
    let dragged = Item::Token(TokenId::from("b"));
    assert!(drag.begin(&dragged));
    // Hover "d" (row 1, col 0), then the empty trailing cell, then drop.
    let swap = drag.update(Point::new(0.0, cell)).unwrap();
    assert_eq!(swap.displaced, Item::Token(TokenId::from("d")));
    assert!(drag.update(Point::new(2.0 * cell, cell)).is_none());
    let order = drag.end().unwrap();

    let outcome = store.apply(StagingAction::ApplyOrder {
        section,
        order: order.clone(),
    });
    assert!(outcome.is_applied());
    // The trailing drop swaps "b" with the last item.
    assert_eq!(store.staged_token_ids(id), tokens(&["a", "d", "c", "e", "b"]));

    // Replaying the same order is a no-op.
    let replay = store.apply(StagingAction::ApplyOrder { section, order });
    assert!(matches!(
        replay,
        StagingOutcome::Ignored {
            reason: IgnoredReason::NoChange,
            ..
        }
    ));
}

#[test]
fn discarded_drag_leaves_store_untouched() {
    let _log = init_logging();
    let mut store = StagingStore::default();
    let names = tokens(&["a", "b", "c", "d"]);
    let id = store.load_collection(&names, &LayoutDescriptor::single_section(2));
    let section = store.collection(id).unwrap().sections()[0].id();
    let cell = store.policy().drag.cell_size;

    let mut drag = store.drag_controller(section).unwrap();
    assert!(drag.begin(&Item::Token(TokenId::from("a"))));
    assert!(drag.update(Point::new(cell, cell)).is_some());
    // Ending without applying the order abandons the gesture.
    let _discarded = drag.end().unwrap();
    assert!(!drag.is_dragging());
    assert_eq!(store.staged_token_ids(id), names);

    // A new gesture starts from the store's order, not the abandoned one.
    let drag = store.drag_controller(section).unwrap();
    assert_eq!(drag.order_of(&Item::Token(TokenId::from("a"))), Some(0));
}

#[test]
fn parser_and_store_agree_on_ids() {
    let names = tokens(&["a", "b", "c"]);
    let layout = LayoutDescriptor::single_section(2);
    let parsed = LayoutParser::default().parse(
        &names,
        &layout,
        &mut mosaic_core::ids::SequentialIds::default(),
    );
    let reparsed = LayoutParser::default().parse(
        &names,
        &layout,
        &mut mosaic_core::ids::SequentialIds::default(),
    );
    assert_eq!(parsed, reparsed);
    assert_eq!(parsed.row_count(), 2);
    assert!(parsed.rows().next().unwrap().1.is_first);
    assert!(parsed.rows().last().unwrap().1.is_last);
}
