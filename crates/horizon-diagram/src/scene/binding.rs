//! Wiring a scene to its model's signals.
//!
//! [`SceneBinding`] puts a [`DiagramScene`] behind a mutex and connects it
//! to the model's [`ModelSignals`](crate::model::ModelSignals). Slots hold
//! only a weak reference to the scene, so the model never keeps it alive.
//!
//! # Reentrancy
//!
//! A notification can arrive while the scene is already handling one, for
//! example when a `selection_changed` slot edits the model. The scene is
//! then locked on the same thread, so the slot queues a [`ModelEvent`]
//! instead of re-entering the handler. Queued events are reconciled as soon
//! as the running operation returns, against the model as it is by then:
//!
//! - an insertion materializes the parent's children that have no element,
//! - a removal sweeps every element whose entry no longer resolves,
//! - a data change refreshes whatever is still registered,
//! - a reset rebuilds.

use std::collections::VecDeque;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use horizon_diagram_core::logging::targets;
use horizon_diagram_core::ConnectionId;

use super::adapter::DiagramScene;
use super::canvas::Canvas;
use crate::model::{ItemModel, ItemRole, ModelIndex, ModelObserver};

type RowArgs = (ModelIndex, usize, usize);
type DataArgs = (ModelIndex, ModelIndex, Vec<ItemRole>);

/// A model notification captured for later processing.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelEvent {
    RowsInserted {
        parent: ModelIndex,
        first: usize,
        last: usize,
    },
    RowsAboutToBeRemoved {
        parent: ModelIndex,
        first: usize,
        last: usize,
    },
    RowsRemoved {
        parent: ModelIndex,
        first: usize,
        last: usize,
    },
    DataChanged {
        top_left: ModelIndex,
        bottom_right: ModelIndex,
        roles: Vec<ItemRole>,
    },
    ModelReset,
}

struct SceneCell<C: Canvas> {
    scene: Mutex<DiagramScene<C>>,
    deferred: Mutex<VecDeque<ModelEvent>>,
}

impl<C: Canvas> SceneCell<C> {
    /// Delivers `event` now, or queues it if the scene is busy.
    fn dispatch(&self, event: ModelEvent) {
        match self.scene.try_lock() {
            Some(mut scene) => {
                deliver(&mut *scene, event);
                self.drain(&mut *scene);
            }
            None => {
                tracing::debug!(target: targets::SCENE, ?event, "scene busy; deferring notification");
                self.deferred.lock().push_back(event);
            }
        }
    }

    fn drain(&self, scene: &mut DiagramScene<C>) {
        loop {
            // The queue lock is released before reconciling; reconciling may
            // trigger further deferrals.
            let next = self.deferred.lock().pop_front();
            let Some(event) = next else {
                break;
            };
            reconcile(scene, event);
        }
    }
}

fn deliver<C: Canvas>(scene: &mut DiagramScene<C>, event: ModelEvent) {
    match event {
        ModelEvent::RowsInserted { parent, first, last } => scene.rows_inserted(&parent, first, last),
        ModelEvent::RowsAboutToBeRemoved { parent, first, last } => {
            scene.rows_about_to_be_removed(&parent, first, last)
        }
        ModelEvent::RowsRemoved { parent, first, last } => scene.rows_removed(&parent, first, last),
        ModelEvent::DataChanged {
            top_left,
            bottom_right,
            roles,
        } => scene.data_changed(&top_left, &bottom_right, &roles),
        ModelEvent::ModelReset => scene.model_reset(),
    }
}

/// Applies a deferred event against the model's current state.
fn reconcile<C: Canvas>(scene: &mut DiagramScene<C>, event: ModelEvent) {
    tracing::debug!(target: targets::SCENE, ?event, "reconciling deferred notification");
    match event {
        ModelEvent::RowsInserted { parent, .. } => {
            // Re-resolve the parent: its row may have shifted since.
            let parent = if parent.is_valid() {
                let Some(key) = scene.model().persistent_index(&parent) else {
                    return;
                };
                let current = scene.model().resolve(&key);
                if !current.is_valid() {
                    return;
                }
                current
            } else {
                parent
            };
            scene.reconcile_children(&parent);
        }
        ModelEvent::RowsAboutToBeRemoved { .. } | ModelEvent::RowsRemoved { .. } => {
            scene.sweep_stale();
        }
        ModelEvent::DataChanged {
            top_left,
            bottom_right,
            roles,
        } => scene.data_changed(&top_left, &bottom_right, &roles),
        ModelEvent::ModelReset => scene.model_reset(),
    }
}

/// A scene connected to its model's signals.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use horizon_diagram::prelude::*;
///
/// let model = Arc::new(TreeModel::<String>::new());
/// let scene = DiagramScene::new(model.clone(), SceneCanvas::default(), SceneConfig::default())?;
/// let binding = SceneBinding::bind(scene);
///
/// let node = model.add_root("node".to_string());
/// let rect = binding.with_scene(|scene| scene.visual_rect(&model.index_for_key(node)));
/// assert!(rect.is_some());
/// # Ok::<(), horizon_diagram::SceneError>(())
/// ```
pub struct SceneBinding<C: Canvas + Send + 'static> {
    cell: Arc<SceneCell<C>>,
    model: Arc<dyn ItemModel>,
    connections: Connections,
}

/// Connection ids for every signal the binding listens to.
struct Connections {
    rows_inserted: ConnectionId,
    rows_about_to_be_removed: ConnectionId,
    rows_removed: ConnectionId,
    data_changed: ConnectionId,
    model_reset: ConnectionId,
}

impl<C: Canvas + Send + 'static> SceneBinding<C> {
    /// Takes ownership of `scene` and connects it to its model.
    pub fn bind(scene: DiagramScene<C>) -> Self {
        let model = scene.model().clone();
        let cell = Arc::new(SceneCell {
            scene: Mutex::new(scene),
            deferred: Mutex::new(VecDeque::new()),
        });
        let signals = model.signals();

        let weak = Arc::downgrade(&cell);
        let rows_inserted = signals.rows_inserted.connect(forward(&weak, |(parent, first, last): &RowArgs| {
            ModelEvent::RowsInserted {
                parent: parent.clone(),
                first: *first,
                last: *last,
            }
        }));
        let rows_about_to_be_removed =
            signals
                .rows_about_to_be_removed
                .connect(forward(&weak, |(parent, first, last): &RowArgs| {
                    ModelEvent::RowsAboutToBeRemoved {
                        parent: parent.clone(),
                        first: *first,
                        last: *last,
                    }
                }));
        let rows_removed = signals.rows_removed.connect(forward(&weak, |(parent, first, last): &RowArgs| {
            ModelEvent::RowsRemoved {
                parent: parent.clone(),
                first: *first,
                last: *last,
            }
        }));
        let data_changed = signals
            .data_changed
            .connect(forward(&weak, |(top_left, bottom_right, roles): &DataArgs| {
                ModelEvent::DataChanged {
                    top_left: top_left.clone(),
                    bottom_right: bottom_right.clone(),
                    roles: roles.clone(),
                }
            }));
        let model_reset = signals
            .model_reset
            .connect(forward(&weak, |_: &()| ModelEvent::ModelReset));

        tracing::debug!(target: targets::SCENE, "scene bound to model signals");
        Self {
            cell,
            model,
            connections: Connections {
                rows_inserted,
                rows_about_to_be_removed,
                rows_removed,
                data_changed,
                model_reset,
            },
        }
    }

    /// Runs `f` with the scene locked, then processes deferred notifications.
    ///
    /// Must not be called from inside a slot that runs while the scene is
    /// locked; use [`try_with_scene`](Self::try_with_scene) there.
    pub fn with_scene<R>(&self, f: impl FnOnce(&mut DiagramScene<C>) -> R) -> R {
        let mut scene = self.cell.scene.lock();
        self.run(&mut *scene, f)
    }

    /// Like [`with_scene`](Self::with_scene), but returns `None` instead of
    /// blocking when the scene is busy.
    pub fn try_with_scene<R>(&self, f: impl FnOnce(&mut DiagramScene<C>) -> R) -> Option<R> {
        let mut scene = self.cell.scene.try_lock()?;
        Some(self.run(&mut *scene, f))
    }

    fn run<R>(&self, scene: &mut DiagramScene<C>, f: impl FnOnce(&mut DiagramScene<C>) -> R) -> R {
        let result = f(scene);
        self.cell.drain(scene);
        result
    }

    /// Number of notifications waiting to be reconciled.
    pub fn deferred_len(&self) -> usize {
        self.cell.deferred.lock().len()
    }

    pub fn model(&self) -> &Arc<dyn ItemModel> {
        &self.model
    }
}

impl<C: Canvas + Send + 'static> Drop for SceneBinding<C> {
    fn drop(&mut self) {
        let signals = self.model.signals();
        signals.rows_inserted.disconnect(self.connections.rows_inserted);
        signals
            .rows_about_to_be_removed
            .disconnect(self.connections.rows_about_to_be_removed);
        signals.rows_removed.disconnect(self.connections.rows_removed);
        signals.data_changed.disconnect(self.connections.data_changed);
        signals.model_reset.disconnect(self.connections.model_reset);
        tracing::debug!(target: targets::SCENE, "scene unbound from model signals");
    }
}

/// Builds a slot that converts signal arguments into a [`ModelEvent`] and
/// dispatches it to the scene, if the scene is still alive.
fn forward<C, Args, F>(weak: &Weak<SceneCell<C>>, make_event: F) -> impl Fn(&Args) + Send + Sync + 'static
where
    C: Canvas + Send + 'static,
    Args: 'static,
    F: Fn(&Args) -> ModelEvent + Send + Sync + 'static,
{
    let weak = weak.clone();
    move |args: &Args| {
        if let Some(cell) = weak.upgrade() {
            cell.dispatch(make_event(args));
        }
    }
}
