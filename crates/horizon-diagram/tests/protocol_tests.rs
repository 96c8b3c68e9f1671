//! Tests for the model notification protocol: ordering, roots, resets and
//! the one-to-one mapping under arbitrary edits.

mod common;

use std::sync::Arc;

use parking_lot::Mutex;

use horizon_diagram::prelude::*;

use common::{bound_scene, init_tracing, labels, node_model, scene_for, Node};

#[test]
fn test_removal_is_processed_while_rows_still_resolve() {
    init_tracing();
    let model = node_model();
    let keys: Vec<_> = (0..5).map(|i| model.add_root(Node::new(&format!("n{i}")))).collect();
    let binding = Arc::new(bound_scene(&model));

    // Connected after the binding, so it runs once the scene has handled
    // the notification.
    let observations = Arc::new(Mutex::new(Vec::new()));
    let slot_model = model.clone();
    let slot_binding = Arc::downgrade(&binding);
    let seen = observations.clone();
    model
        .signals()
        .rows_about_to_be_removed
        .connect(move |(parent, first, last)| {
            let Some(binding) = slot_binding.upgrade() else {
                return;
            };
            for row in *first..=*last {
                let index = slot_model.index(row, 0, parent);
                let released = binding
                    .try_with_scene(|scene| scene.element(&index).is_none())
                    .unwrap_or(false);
                seen.lock().push((row, index.is_valid(), released));
            }
        });

    model.remove_rows(None, 2, 4).unwrap();

    assert_eq!(
        *observations.lock(),
        vec![(2, true, true), (3, true, true), (4, true, true)]
    );
    binding.with_scene(|scene| {
        assert_eq!(labels(scene), vec!["n0", "n1"]);
        scene.verify().unwrap();
        for key in &keys[2..] {
            assert!(!scene.registry().contains(&model.persistent_for_key(*key)));
        }
    });
}

#[test]
fn test_missed_removal_is_swept() {
    let model = node_model();
    let a = model.add_root(Node::new("a"));
    let b = model.add_root(Node::new("b"));
    model.add_child(b, Node::new("b1"));
    // Not bound: the scene never hears about the removal.
    let mut scene = scene_for(&model);

    model.remove(b);
    // The freed slot is reused; the stale handle must not resolve to it.
    let reused = model.add_root(Node::new("c"));
    assert!(!model.persistent_for_key(b).is_valid_in(&*model));

    assert!(scene.verify().is_err());
    assert_eq!(scene.sweep_stale(), 2);
    assert_eq!(labels(&scene), vec!["a"]);

    assert_eq!(scene.reconcile_children(&ModelIndex::invalid()), 1);
    assert_eq!(labels(&scene), vec!["a", "c"]);
    scene.verify().unwrap();
    assert!(scene.element(&model.index_for_key(reused)).is_some());
    assert!(scene.element(&model.index_for_key(a)).is_some());
}

#[test]
fn test_set_root_index_materializes_only_the_subtree() {
    let model = node_model();
    let package = model.add_root(Node::new("package"));
    let class = model.add_child(package, Node::new("Class")).unwrap();
    model.add_child(class, Node::new("method")).unwrap();
    model.add_root(Node::new("other"));
    let binding = bound_scene(&model);

    binding.with_scene(|scene| {
        scene.set_root_index(&model.index_for_key(package));
        assert_eq!(scene.root_index(), model.index_for_key(package));
        assert_eq!(labels(scene), vec!["Class", "method"]);
        let class_element = scene.element(&model.index_for_key(class)).unwrap();
        assert_eq!(class_element.depth(), 0);
        assert_eq!(class_element.parent(), None);
        scene.verify().unwrap();
    });

    // Insertions outside the root are ignored, inside it they appear.
    model.add_root(Node::new("late"));
    model.add_child(package, Node::new("Class2"));
    binding.with_scene(|scene| {
        assert_eq!(labels(scene), vec!["Class", "method", "Class2"]);
        scene.verify().unwrap();

        scene.set_root_index(&ModelIndex::invalid());
        assert_eq!(scene.registry().len(), 6);
        scene.verify().unwrap();
    });
}

#[test]
fn test_root_removal_falls_back_to_whole_model() {
    let model = node_model();
    let package = model.add_root(Node::new("package"));
    let class = model.add_child(package, Node::new("Class")).unwrap();
    model.add_child(class, Node::new("method")).unwrap();
    model.add_root(Node::new("other"));
    let binding = bound_scene(&model);

    binding.with_scene(|scene| scene.set_root_index(&model.index_for_key(class)));
    assert_eq!(binding.with_scene(|scene| labels(scene)), vec!["method"]);

    // Removing an ancestor of the root removes the root too.
    model.remove(package);
    binding.with_scene(|scene| {
        assert!(!scene.root_index().is_valid());
        assert_eq!(labels(scene), vec!["other"]);
        scene.verify().unwrap();
    });
}

#[test]
fn test_model_reset_rebuilds() {
    let model = node_model();
    model.add_root(Node::new("a"));
    model.add_root(Node::new("b"));
    let binding = bound_scene(&model);

    binding.with_scene(|scene| scene.set_selection(Rect::new(-10.0, -10.0, 2000.0, 2000.0), SelectionCommand::Replace));
    assert_eq!(binding.with_scene(|scene| scene.selected_indices().len()), 2);

    model.clear();
    binding.with_scene(|scene| {
        assert!(scene.registry().is_empty());
        assert!(scene.selected_indices().is_empty());
        assert!(scene.canvas().needs_full_repaint());
        assert_eq!(scene.canvas().attached_count(), 0);
    });

    model.add_root(Node::new("fresh"));
    binding.with_scene(|scene| {
        assert_eq!(labels(scene), vec!["fresh"]);
        scene.verify().unwrap();
    });
}

#[test]
fn test_reset_keeps_root() {
    let model = node_model();
    let package = model.add_root(Node::new("package"));
    model.add_child(package, Node::new("Class"));
    let mut scene = scene_for(&model);
    scene.set_root_index(&model.index_for_key(package));

    scene.reset();
    assert!(scene.registry().is_empty());
    assert_eq!(scene.root_index(), model.index_for_key(package));

    scene.rebuild();
    assert_eq!(labels(&scene), vec!["Class"]);
}

/// Small deterministic generator for the randomized edit sequence.
struct XorShift(u64);

impl XorShift {
    fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next() % n as u64) as usize
    }
}

#[test]
fn test_mapping_stays_bijective_under_random_edits() {
    let model = node_model();
    let binding = bound_scene(&model);
    let mut rng = XorShift(0x9E37_79B9_7F4A_7C15);
    let mut live: Vec<NodeKey> = Vec::new();

    for step in 0..300 {
        let label = format!("n{step}");
        match rng.below(10) {
            0..=2 => {
                live.push(model.add_root(Node::new(&label)));
            }
            3..=5 if !live.is_empty() => {
                let parent = live[rng.below(live.len())];
                live.extend(model.add_child(parent, Node::new(&label)));
            }
            6 if !live.is_empty() => {
                let parent = live[rng.below(live.len())];
                let row = rng.below(model.children(Some(parent)).len() + 1);
                live.extend(model.insert_child(Some(parent), row, Node::new(&label)));
            }
            7 | 8 if !live.is_empty() => {
                let victim = live[rng.below(live.len())];
                model.remove(victim);
                live.retain(|key| model.contains(*key));
            }
            9 if !live.is_empty() => {
                let target = live[rng.below(live.len())];
                model.modify_node(target, |node| node.label.push('*'));
            }
            _ => {
                if step % 97 == 96 {
                    model.clear();
                    live.clear();
                }
            }
        }

        binding.with_scene(|scene| {
            if let Err(err) = scene.verify() {
                panic!("step {step}: {err}");
            }
            assert_eq!(scene.canvas().attached_count(), scene.registry().len());
            for (id, element) in scene.registry().iter() {
                assert_eq!(scene.registry().index_of(id), Some(element.index()));
                assert!(element.index().is_valid_in(&*model));
            }
        });
    }
}
