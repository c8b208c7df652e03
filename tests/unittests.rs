use std::cell::RefCell;
use std::ops::ControlFlow;
use std::rc::Rc;

use mind_loom::command::{Command, Paste};
use mind_loom::error::{CommandError, CompositionError, MapError};
use mind_loom::map_utils::composition::{Composition, ROOT_ID, TreeEvent, TreeEventKind, generate_unique_id};
use mind_loom::map_utils::manager::MapManager;
use mind_loom::map_utils::record::{DEFAULT_NODE_CONTENT, NodeId, NodeSnapshot, Offset};
use mind_loom::persistence::persist::{self, MAP_FORMAT_VERSION, MapFile};
use mind_loom::persistence::settings::EditorSettings;
use mind_loom::persistence::store::{DirectoryStore, MapStore, MemoryStore};
use mind_loom::session::{EditingSurface, EditorSession, Outcome, ScriptedSurface};

fn session_with_map(name: &str) -> EditorSession {
    let mut session = EditorSession::in_memory();
    assert_eq!(session.run(Command::create_new_map(Some(name.to_string()))).unwrap(), Outcome::Executed);
    session
}

fn add_root(session: &mut EditorSession, x: f64, y: f64) -> NodeId {
    let outcome = session.run(Command::create_new_root_node(Offset::new(x, y))).unwrap();
    assert_eq!(outcome, Outcome::Recorded);
    session.last_node().cloned().expect("created node id")
}

fn add_child(session: &mut EditorSession, parent: &str) -> NodeId {
    let outcome = session.run(Command::append_child_to(parent, Offset::new(5.0, 5.0))).unwrap();
    assert_eq!(outcome, Outcome::Recorded);
    session.last_node().cloned().expect("created node id")
}

/// root -> (a -> (a1, a2), b)
fn build_family(session: &mut EditorSession) -> (NodeId, Vec<NodeId>) {
    let root = add_root(session, 0.0, 0.0);
    let a = add_child(session, &root);
    let a1 = add_child(session, &a);
    let a2 = add_child(session, &a);
    let b = add_child(session, &root);
    (root, vec![a, a1, a2, b])
}

fn shape(snapshot: &NodeSnapshot) -> (String, Vec<(String, usize)>) {
    fn walk(node: &NodeSnapshot, depth: usize, out: &mut Vec<(String, usize)>) {
        out.push((node.content.clone(), depth));
        let mut children: Vec<&NodeSnapshot> = node.children.iter().collect();
        children.sort_by(|a, b| a.content.cmp(&b.content).then(a.children.len().cmp(&b.children.len())));
        for child in children {
            walk(child, depth + 1, out);
        }
    }
    let mut out = Vec::new();
    walk(snapshot, 0, &mut out);
    (snapshot.content.clone(), out)
}

#[test]
fn unique_ids_are_hyphenated_hex() {
    let id = generate_unique_id();
    assert_eq!(id.len(), 36);
    let groups: Vec<usize> = id.split('-').map(str::len).collect();
    assert_eq!(groups, vec![8, 4, 4, 4, 12]);
    assert!(id.chars().all(|c| c == '-' || c.is_ascii_hexdigit()));
    assert_ne!(id, generate_unique_id());
}

#[test]
fn composition_parent_child_links_stay_symmetric() {
    let mut tree = Composition::default();
    let a = tree.create_node(Some("a".into())).unwrap();
    let b = tree.create_node(Some("b".into())).unwrap();
    tree.add_child(ROOT_ID, &a).unwrap();
    tree.set_parent(&b, Some(a.as_str())).unwrap();

    assert_eq!(tree.parent(&b), Some(&a));
    assert!(tree.node(&a).unwrap().has_child(&b));
    assert!(tree.get_child(&a, &b).is_some());
    assert!(tree.is_ancestor(ROOT_ID, &b));
    assert!(tree.is_consistent());

    // same parent again is a no-op
    tree.set_parent(&b, Some(a.as_str())).unwrap();
    assert_eq!(tree.node(&a).unwrap().child_count(), 1);

    assert_eq!(tree.remove_child(&a, &b), Some(b.clone()));
    assert_eq!(tree.parent(&b), None);
    assert!(!tree.node(&a).unwrap().has_child(&b));
    assert_eq!(tree.remove_child(&a, &b), None);
    assert!(tree.is_consistent());
}

#[test]
fn composition_rejects_invalid_structure() {
    let mut tree = Composition::default();
    let a = tree.create_node(Some("a".into())).unwrap();
    let b = tree.create_node(Some("b".into())).unwrap();
    tree.add_child(ROOT_ID, &a).unwrap();
    tree.add_child(&a, &b).unwrap();

    assert_eq!(tree.set_parent(&a, Some(a.as_str())), Err(CompositionError::SelfParenting(a.clone())));
    assert!(matches!(tree.set_parent(&b, Some(ROOT_ID)), Err(CompositionError::ParentConflict { .. })));
    assert!(matches!(tree.add_child(&a, &b), Err(CompositionError::DuplicateId { .. })));
    assert!(matches!(tree.create_node(Some("a".into())), Err(CompositionError::DuplicateId { .. })));
    assert_eq!(
        tree.set_parent("ghost", Some(a.as_str())),
        Err(CompositionError::InvalidArgument("ghost".into()))
    );

    // a cannot go under its own descendant
    tree.set_parent(&a, None).unwrap();
    assert!(matches!(tree.set_parent(&a, Some(b.as_str())), Err(CompositionError::AncestorCycle { .. })));
    assert!(tree.is_consistent());
}

#[test]
fn composition_each_child_stops_on_break() {
    let mut tree = Composition::default();
    for id in ["a", "b", "c"] {
        tree.create_node(Some(id.into())).unwrap();
        tree.add_child(ROOT_ID, id).unwrap();
    }
    let mut visited = Vec::new();
    tree.each_child(ROOT_ID, |child| {
        visited.push(child.id().clone());
        if visited.len() == 2 { ControlFlow::Break(()) } else { ControlFlow::Continue(()) }
    });
    assert_eq!(visited, vec!["a", "b"]);

    let mut all = 0;
    tree.each_child(ROOT_ID, |_| {
        all += 1;
        ControlFlow::Continue(())
    });
    assert_eq!(all, 3);
}

#[test]
fn composition_dispose_is_recursive() {
    let mut tree = Composition::default();
    for (id, parent) in [("a", ROOT_ID), ("b", "a"), ("c", "b"), ("d", "a")] {
        tree.create_node(Some(id.into())).unwrap();
        tree.add_child(parent, id).unwrap();
    }
    let mut removed = tree.dispose("a").unwrap();
    removed.sort();
    assert_eq!(removed, vec!["a", "b", "c", "d"]);
    assert_eq!(tree.node_count(), 1);
    assert_eq!(tree.node(ROOT_ID).unwrap().child_count(), 0);
    assert!(tree.dispose(ROOT_ID).is_err());
}

#[test]
fn composition_events_bubble_until_stopped() {
    let mut tree = Composition::default();
    tree.create_node(Some("a".into())).unwrap();
    tree.add_child(ROOT_ID, "a").unwrap();

    let seen_root: Rc<RefCell<Vec<TreeEvent>>> = Rc::default();
    let seen_a: Rc<RefCell<Vec<TreeEvent>>> = Rc::default();
    let sink = seen_root.clone();
    tree.subscribe(ROOT_ID, move |e: &TreeEvent| {
        sink.borrow_mut().push(e.clone());
        ControlFlow::Continue(())
    })
    .unwrap();
    let sink = seen_a.clone();
    let stopper = tree
        .subscribe("a", move |e: &TreeEvent| {
            sink.borrow_mut().push(e.clone());
            ControlFlow::Break(())
        })
        .unwrap();

    tree.create_node(Some("b".into())).unwrap();
    tree.add_child("a", "b").unwrap();
    assert_eq!(seen_a.borrow().len(), 1);
    assert_eq!(seen_a.borrow()[0].kind, TreeEventKind::ChildAdded);
    assert!(seen_root.borrow().is_empty());

    assert!(tree.unsubscribe(stopper));
    tree.remove_child("a", "b");
    let root_events = seen_root.borrow();
    assert_eq!(root_events.len(), 1);
    assert_eq!(
        root_events[0],
        TreeEvent { kind: TreeEventKind::ChildRemoved, parent: "a".into(), child: "b".into() }
    );
}

#[test]
fn manager_create_node_fills_ids_and_parents() {
    let seed = NodeSnapshot {
        children: vec![NodeSnapshot::default(), NodeSnapshot { children: vec![NodeSnapshot::default()], ..Default::default() }],
        ..Default::default()
    };
    let node = MapManager::create_node(Some(seed));
    assert_eq!(node.ids().len(), 4);
    let id = node.id.clone().unwrap();
    assert!(node.children.iter().all(|c| c.parent.as_ref() == Some(&id)));
    assert_eq!(node.content, DEFAULT_NODE_CONTENT);

    let mut manager = MapManager::new("m");
    let inserted = manager.insert_snapshot(&node).unwrap();
    assert_eq!(inserted, id);
    assert_eq!(manager.node_count(), 4);
    assert!(manager.is_modified());
    assert!(manager.is_consistent());
    // same ids twice: nothing goes in
    assert!(matches!(manager.insert_snapshot(&node), Err(MapError::DuplicateId(_))));
    assert_eq!(manager.node_count(), 4);
}

#[test]
fn manager_delete_does_not_cascade() {
    let mut manager = MapManager::new("m");
    let node = MapManager::create_node(Some(NodeSnapshot { children: vec![NodeSnapshot::default()], ..Default::default() }));
    let root = manager.insert_snapshot(&node).unwrap();
    let child = node.children[0].id.clone().unwrap();

    let removed = manager.delete_node(&root).unwrap();
    assert!(removed.children.contains(&child));
    assert!(manager.contains(&child));
    assert_eq!(manager.get_node(&child).unwrap().parent.as_ref(), Some(&root));
    assert!(manager.delete_node(&root).is_none());
}

#[test]
fn scenario_create_edit_undo_redo() {
    let mut session = session_with_map("A");
    assert_eq!(session.title().as_deref(), Some("A"));

    let id = add_root(&mut session, 10.0, 10.0);
    session.select(Some(id.as_str())).unwrap();
    let edit = session.run_with(|ws| Command::save_node_content(ws, Some("Hello".into()))).unwrap();
    assert_eq!(edit, Outcome::Recorded);
    assert_eq!(session.title().as_deref(), Some("*A"));
    assert_eq!(session.history().len(), 2);

    assert_eq!(session.run(Command::undo(1)).unwrap(), Outcome::Executed);
    assert_eq!(session.manager().unwrap().get_node_content(&id), Some(DEFAULT_NODE_CONTENT));
    session.run(Command::undo(1)).unwrap();
    assert_eq!(session.manager().unwrap().node_count(), 0);
    assert!(!session.history().can_undo());
    assert_eq!(session.run(Command::undo(1)).unwrap(), Outcome::Skipped);

    session.run(Command::redo(2)).unwrap();
    let manager = session.manager().unwrap();
    assert_eq!(manager.node_count(), 1);
    assert_eq!(manager.get_node_content(&id), Some("Hello"));
    assert_eq!(manager.get_node_position(&id), Some(Offset::new(10.0, 10.0)));
    assert!(session.is_consistent());
    assert_eq!(session.run(Command::redo(1)).unwrap(), Outcome::Skipped);
}

#[test]
fn append_child_to_map_root_is_unavailable() {
    let mut session = session_with_map("A");
    let root = add_root(&mut session, 0.0, 0.0);
    assert_eq!(
        session.run(Command::append_child_to(ROOT_ID, Offset::new(1.0, 1.0))).unwrap(),
        Outcome::Skipped
    );
    assert_eq!(session.history().len(), 1);
    assert_eq!(session.manager().unwrap().node_count(), 1);
    assert!(session.manager().unwrap().contains(&root));
}

#[test]
fn availability_without_map() {
    let mut session = EditorSession::in_memory();
    assert_eq!(session.run_with(Command::append_child_node).unwrap(), Outcome::Skipped);
    assert_eq!(session.run(Command::create_new_root_node(Offset::default())).unwrap(), Outcome::Skipped);
    assert_eq!(session.run(Command::save_map()).unwrap(), Outcome::Skipped);
    assert_eq!(session.run(Command::rename_map(Some("x".into()))).unwrap(), Outcome::Skipped);
    assert_eq!(session.run(Command::undo(1)).unwrap(), Outcome::Skipped);
    assert!(session.history().is_empty());

    session.run(Command::create_new_map(Some("A".into()))).unwrap();
    // one map at a time
    assert_eq!(session.run(Command::create_new_map(Some("B".into()))).unwrap(), Outcome::Skipped);
    assert_eq!(session.run(Command::open_map_in_storage("B")).unwrap(), Outcome::Skipped);
    // nothing selected, nothing to append to or paste
    assert_eq!(session.run_with(Command::append_child_node).unwrap(), Outcome::Skipped);
    assert_eq!(session.run_with(Command::delete_node).unwrap(), Outcome::Skipped);
    assert_eq!(session.run_with(Command::paste).unwrap(), Outcome::Skipped);
    // unmodified maps have nothing to save
    assert_eq!(session.run(Command::save_map()).unwrap(), Outcome::Skipped);
}

#[test]
fn new_command_discards_redo_tail() {
    let mut session = session_with_map("A");
    add_root(&mut session, 0.0, 0.0);
    let b = add_root(&mut session, 1.0, 1.0);
    session.run(Command::undo(1)).unwrap();
    assert!(session.history().can_redo());

    let c = add_root(&mut session, 2.0, 2.0);
    assert_eq!(session.history().len(), 2);
    assert!(!session.history().can_redo());
    assert_eq!(session.run(Command::redo(1)).unwrap(), Outcome::Skipped);
    let manager = session.manager().unwrap();
    assert!(!manager.contains(&b));
    assert!(manager.contains(&c));
}

#[test]
fn delete_and_undo_restores_subtree() {
    let mut session = session_with_map("A");
    let (root, family) = build_family(&mut session);
    let before = session.manager().unwrap().get_map_data();
    let structure = session.map().unwrap().tree().structure();

    session.select(Some(family[0].as_str())).unwrap();
    assert_eq!(session.run_with(Command::delete_node).unwrap(), Outcome::Recorded);
    let manager = session.manager().unwrap();
    assert_eq!(manager.node_count(), 2);
    assert!(!family[..3].iter().any(|id| manager.contains(id)));
    assert!(session.map().unwrap().current().is_none());
    assert!(session.is_consistent());

    session.run(Command::undo(1)).unwrap();
    assert_eq!(session.manager().unwrap().get_map_data(), before);
    assert_eq!(session.map().unwrap().tree().structure(), structure);
    assert!(session.is_consistent());

    session.run(Command::redo(1)).unwrap();
    assert_eq!(session.manager().unwrap().node_count(), 2);
    assert!(session.manager().unwrap().get_node(&root).unwrap().children.contains(&family[3]));
    assert!(session.is_consistent());
}

#[test]
fn cut_and_paste_produce_fresh_ids_with_same_shape() {
    let mut session = session_with_map("A");
    let (_, family) = build_family(&mut session);
    let a = family[0].clone();
    session.select(Some(a.as_str())).unwrap();
    session.run_with(|ws| Command::save_node_content(ws, Some("branch".into()))).unwrap();
    let original = session.manager().unwrap().snapshot(&a).unwrap();

    assert_eq!(session.run_with(Command::cut).unwrap(), Outcome::Recorded);
    assert!(!session.manager().unwrap().contains(&a));
    assert!(!session.clipboard().is_empty());
    assert!(session.clipboard().get_clipboard().unwrap().ids().is_empty());

    session.map_mut().unwrap().set_pan(Offset::new(-20.0, 30.0));
    session.map_mut().unwrap().set_pointer(Offset::new(1.0, 2.0));
    assert_eq!(session.run_with(Command::paste).unwrap(), Outcome::Recorded);
    let pasted_id = session.last_node().cloned().unwrap();
    let pasted = session.manager().unwrap().snapshot(&pasted_id).unwrap();

    assert_eq!(shape(&pasted), shape(&original));
    assert_eq!(pasted.offset, Offset::new(21.0, 32.0));
    assert_eq!(pasted.parent, None);
    let old_ids = original.ids();
    assert!(pasted.ids().iter().all(|id| !old_ids.contains(id)));
    assert!(session.is_consistent());

    // undo paste then cut brings the original ids back
    session.run(Command::undo(2)).unwrap();
    let manager = session.manager().unwrap();
    assert!(!manager.contains(&pasted_id));
    assert_eq!(manager.snapshot(&a).unwrap(), original);
    assert!(session.is_consistent());
}

#[test]
fn copy_paste_under_node_uses_paste_offset() {
    let mut session = session_with_map("A");
    let (root, family) = build_family(&mut session);
    session.select(Some(family[0].as_str())).unwrap();
    assert_eq!(session.run_with(Command::copy).unwrap(), Outcome::Executed);
    let len = session.history().len();

    assert_eq!(session.run(Command::Paste(Paste::into_target(family[3].clone()))).unwrap(), Outcome::Recorded);
    assert_eq!(session.history().len(), len + 1);
    let pasted = session.last_node().cloned().unwrap();
    let manager = session.manager().unwrap();
    assert_eq!(manager.get_node(&pasted).unwrap().parent.as_ref(), Some(&family[3]));
    assert_eq!(manager.get_node_position(&pasted), Some(Offset::new(100.0, 100.0)));
    assert_eq!(manager.get_subtree(&pasted).unwrap().len(), 3);
    assert_eq!(manager.get_subtree(&root).unwrap().len(), 8);
    // the copy source is untouched
    assert!(manager.contains(&family[0]));
}

#[test]
fn move_and_undo_position() {
    let mut session = session_with_map("A");
    let id = add_root(&mut session, 3.0, 4.0);
    session.select(Some(id.as_str())).unwrap();
    session.run_with(|ws| Command::save_node_position(ws, Offset::new(50.0, 60.0))).unwrap();
    assert_eq!(session.manager().unwrap().get_node_position(&id), Some(Offset::new(50.0, 60.0)));
    session.run(Command::undo(1)).unwrap();
    assert_eq!(session.manager().unwrap().get_node_position(&id), Some(Offset::new(3.0, 4.0)));
}

#[test]
fn edit_through_surface_and_cancel() {
    let mut session = session_with_map("A");
    let id = add_root(&mut session, 0.0, 0.0);
    session.select(Some(id.as_str())).unwrap();

    session.set_surface(Box::new(ScriptedSurface::new(["typed"])));
    assert_eq!(session.run_with(|ws| Command::save_node_content(ws, None)).unwrap(), Outcome::Recorded);
    assert_eq!(session.manager().unwrap().get_node_content(&id), Some("typed"));

    // empty surface cancels; nothing recorded
    let len = session.history().len();
    assert_eq!(session.run_with(|ws| Command::save_node_content(ws, None)).unwrap(), Outcome::Cancelled);
    assert_eq!(session.history().len(), len);
}

#[test]
fn rename_prompts_until_non_empty() {
    let mut session = session_with_map("A");
    session.set_surface(Box::new(ScriptedSurface::new(["", "", "B"])));
    assert_eq!(session.run(Command::rename_map(None)).unwrap(), Outcome::Executed);
    assert_eq!(session.title().as_deref(), Some("*B"));

    assert_eq!(session.run(Command::rename_map(None)).unwrap(), Outcome::Cancelled);
    assert_eq!(session.manager().unwrap().get_map_name(), "B");
}

/// Answers every prompt with the offered default.
struct AcceptDefault;

impl EditingSurface for AcceptDefault {
    fn insert_text(&mut self, current: &str) -> Option<String> { Some(current.to_string()) }

    fn prompt(&mut self, _message: &str, default: &str) -> Option<String> { Some(default.to_string()) }
}

#[test]
fn new_map_prompt_offers_default_name() {
    let settings = EditorSettings { default_map_name: "notes".into(), ..EditorSettings::default() };
    let mut session = EditorSession::new(Box::new(MemoryStore::default()), Box::new(AcceptDefault), settings);
    assert_eq!(session.run(Command::create_new_map(None)).unwrap(), Outcome::Executed);
    assert_eq!(session.title().as_deref(), Some("notes"));

    // rename offers the current name
    assert_eq!(session.run(Command::rename_map(None)).unwrap(), Outcome::Executed);
    assert_eq!(session.manager().unwrap().get_map_name(), "notes");
}

#[test]
fn map_names_cannot_leave_the_export_dir() {
    let dir = tempfile::tempdir().unwrap();
    let export = dir.path().join("a").join("b");
    let settings = EditorSettings { export_override: Some(export.clone()), ..EditorSettings::default() };
    let mut session =
        EditorSession::new(Box::new(MemoryStore::default()), Box::new(ScriptedSurface::new(["../../escaped"])), settings);
    session.run(Command::create_new_map(Some("A".into()))).unwrap();
    add_root(&mut session, 0.0, 0.0);

    for name in ["../../escaped", "x/y", ".hidden"] {
        let err = session.run(Command::rename_map(Some(name.into()))).unwrap_err();
        assert!(matches!(err, CommandError::Persistence(_)));
        assert!(session.run(Command::save_map_in_storage(Some(name.into()))).is_err());
    }
    // a prompted name goes through the same check
    assert!(session.run(Command::rename_map(None)).is_err());
    assert_eq!(session.manager().unwrap().get_map_name(), "A");

    session.run(Command::save_map_in_disk(None)).unwrap();
    assert!(export.join("A.json").exists());
    assert!(!dir.path().join("escaped.json").exists());
    assert!(!dir.path().join("a").join("escaped.json").exists());

    let mut fresh = EditorSession::in_memory();
    assert!(fresh.run(Command::create_new_map(Some("../x".into()))).is_err());
    assert!(fresh.map().is_none());
}

#[test]
fn failed_save_keeps_modified_flag() {
    let mut store = MemoryStore::default();
    store.set_read_only(true);
    let mut session = EditorSession::new(Box::new(store), Box::new(ScriptedSurface::default()), EditorSettings::default());
    session.run(Command::create_new_map(Some("A".into()))).unwrap();
    add_root(&mut session, 0.0, 0.0);

    let err = session.run(Command::save_map()).unwrap_err();
    assert!(matches!(err, CommandError::Persistence(_)));
    assert!(session.manager().unwrap().is_modified());
}

#[test]
fn save_close_and_reopen_from_storage() {
    let mut session = session_with_map("A");
    let (root, family) = build_family(&mut session);
    let data = session.manager().unwrap().get_map_data();

    assert_eq!(session.run(Command::save_map()).unwrap(), Outcome::Executed);
    assert!(!session.manager().unwrap().is_modified());
    assert!(session.workspace().store.has_map("A"));

    // save under a new name renames only after the store accepted it
    session.select(Some(root.as_str())).unwrap();
    session.run_with(|ws| Command::save_node_content(ws, Some("top".into()))).unwrap();
    session.run(Command::save_map_in_storage(Some("B".into()))).unwrap();
    assert_eq!(session.title().as_deref(), Some("B"));
    assert_eq!(session.workspace().store.get_map_list().unwrap(), vec!["A", "B"]);

    let closed = session.close_map().unwrap();
    assert_eq!(closed.get_map_name(), "B");
    assert!(session.history().is_empty());
    assert!(session.map().is_none());

    session.run(Command::open_map_in_storage("A")).unwrap();
    let manager = session.manager().unwrap();
    assert_eq!(manager.get_map_data(), data);
    assert!(!manager.is_modified());
    assert!(manager.contains(&family[2]));
    assert!(session.is_consistent());

    assert!(session.close_map().is_some());
    assert!(matches!(session.run(Command::open_map_in_storage("missing")), Err(CommandError::Persistence(_))));
}

#[test]
fn directory_store_writes_ron_and_versions() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = DirectoryStore::new(dir.path()).with_versions(true);
    let mut manager = MapManager::new("notes");
    manager.insert_snapshot(&MapManager::create_node(None)).unwrap();
    let file = MapFile::from_manager(&manager);

    store.save_map(&file).unwrap();
    assert!(dir.path().join("notes.ron").is_file());
    assert!(store.has_map("notes"));
    assert_eq!(store.get_map_list().unwrap(), vec!["notes"]);
    assert_eq!(store.list_versions("notes").unwrap().len(), 1);

    let loaded = store.get_map_data("notes").unwrap();
    assert_eq!(loaded.nodes, file.nodes);
    assert_eq!(loaded.version, MAP_FORMAT_VERSION);

    let bad = MapFile { name: "../escape".into(), ..file };
    assert!(store.save_map(&bad).is_err());
    assert!(!store.has_map("../escape"));
}

#[test]
fn newer_format_version_is_rejected() {
    let file = MapFile { version: MAP_FORMAT_VERSION + 1, name: "future".into(), saved_at: None, nodes: vec![] };
    let text = persist::to_ron(&file).unwrap();
    assert!(persist::from_ron(&text).is_err());

    // no version field reads as version 1
    let legacy: MapFile = ron::from_str("(name: \"old\")").unwrap();
    assert_eq!(legacy.version, 1);
    assert!(legacy.check_version().is_ok());
}

#[test]
fn disk_export_and_import() {
    let dir = tempfile::tempdir().unwrap();
    let json = dir.path().join("out").join("A.json");
    let csv = dir.path().join("A.csv");

    let mut session = session_with_map("A");
    let (_, family) = build_family(&mut session);
    let data = session.manager().unwrap().get_map_data();

    session.run(Command::save_map_in_disk(Some(json.clone()))).unwrap();
    assert!(!session.manager().unwrap().is_modified());
    session.select(Some(family[3].as_str())).unwrap();
    session.run_with(|ws| Command::save_node_content(ws, Some("b,\"quoted\"".into()))).unwrap();
    session.run(Command::save_map_in_disk(Some(csv.clone()))).unwrap();

    let table = std::fs::read_to_string(&csv).unwrap();
    let mut lines = table.lines();
    assert_eq!(lines.next(), Some("id,parent,x,y,content"));
    assert_eq!(table.lines().count(), 1 + 5);
    assert!(table.contains("\"b,\"\"quoted\"\"\""));

    session.close_map();
    session.run(Command::open_map_in_disk(&json)).unwrap();
    let manager = session.manager().unwrap();
    assert_eq!(manager.get_map_name(), "A");
    assert_eq!(manager.get_map_data(), data);
    assert!(session.is_consistent());
}

#[test]
fn settings_round_trip_and_legacy_migration() {
    let dir = tempfile::tempdir().unwrap();
    assert_eq!(EditorSettings::load_from(dir.path()).unwrap(), EditorSettings::default());

    let settings = EditorSettings { undo_level: 4, keep_versions: false, ..EditorSettings::default() };
    settings.save_to(dir.path()).unwrap();
    assert_eq!(EditorSettings::load_from(dir.path()).unwrap(), settings);

    let legacy = tempfile::tempdir().unwrap();
    std::fs::write(legacy.path().join("settings.ron"), "(undo_level: 3, default_map_name: \"notes\")").unwrap();
    let migrated = EditorSettings::load_from(legacy.path()).unwrap();
    assert_eq!(migrated.undo_level, 3);
    assert_eq!(migrated.default_map_name, "notes");
    assert_eq!(migrated.paste_offset, Offset::new(100.0, 100.0));
    assert!(legacy.path().join("settings.json").is_file());

    let overridden = EditorSettings { storage_override: Some(dir.path().to_path_buf()), ..EditorSettings::default() };
    assert_eq!(overridden.storage_dir(), dir.path());
    assert_eq!(DirectoryStore::from_settings(&overridden).dir(), dir.path());
}
