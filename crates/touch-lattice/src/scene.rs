//! The object hierarchy gestures attach to, and the hit-test oracle.
//!
//! The scene is deliberately thin: it knows parent/child links, a world
//! position per object (used as the pivot of pinned transforms) and which
//! gestures are attached where. Deciding whether a pointer actually lies over
//! an object is delegated to a host-supplied [`HitTester`].
//!
//! # Hit Search
//!
//! Roots are layers; a root added later sits on top of earlier ones. For each
//! root, children are searched before their parent, front-most (last added)
//! first, so the deepest object under the pointer wins. A [`HitResult::Discard`]
//! ends the whole search: the pointer is over something that swallows input,
//! so neither the object nor any of its ancestors become the target.

use glam::Vec3;
use slotmap::SlotMap;

use touch_lattice_core::{
    Error, GestureId, HitData, ObjectId, Pointer, PointerHit, ProjectionParams, Result,
};

/// Outcome of testing one pointer against one object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HitResult {
    /// The pointer is over the object.
    Hit(HitData),
    /// The pointer is not over the object; keep searching.
    Miss,
    /// The pointer is over the object but must not reach it or anything behind it.
    Discard,
}

/// Host-supplied hit-test and projection oracle.
pub trait HitTester: Send {
    /// Test `pointer` against `object`.
    fn hit_test(&self, pointer: &Pointer, object: ObjectId) -> HitResult;

    /// Projection used to convert this pointer's screen positions into world space.
    fn projection_params(&self, _pointer: &Pointer) -> ProjectionParams {
        ProjectionParams::Screen
    }
}

impl<F> HitTester for F
where
    F: Fn(&Pointer, ObjectId) -> HitResult + Send,
{
    fn hit_test(&self, pointer: &Pointer, object: ObjectId) -> HitResult {
        self(pointer, object)
    }
}

#[derive(Debug, Default)]
struct SceneNode {
    parent: Option<ObjectId>,
    children: Vec<ObjectId>,
    world_position: Vec3,
    gestures: Vec<GestureId>,
}

enum Search {
    Found(PointerHit),
    Discarded,
    NotFound,
}

/// Parent/child hierarchy of objects that gestures attach to.
#[derive(Debug, Default)]
pub struct Scene {
    nodes: SlotMap<ObjectId, SceneNode>,
    roots: Vec<ObjectId>,
}

impl Scene {
    /// Create an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object. With no parent it becomes a new top-most root.
    pub fn create_object(&mut self, parent: Option<ObjectId>) -> Result<ObjectId> {
        if let Some(parent) = parent
            && !self.nodes.contains_key(parent)
        {
            return Err(Error::UnknownObject(parent));
        }
        let id = self.nodes.insert(SceneNode {
            parent,
            ..SceneNode::default()
        });
        match parent.and_then(|parent| self.nodes.get_mut(parent)) {
            Some(node) => node.children.push(id),
            None => self.roots.push(id),
        }
        Ok(id)
    }

    /// Remove an object and its whole subtree, returning every removed id
    /// (the object itself first).
    pub(crate) fn remove_subtree(&mut self, id: ObjectId) -> Result<Vec<ObjectId>> {
        let parent = self.nodes.get(id).ok_or(Error::UnknownObject(id))?.parent;
        match parent.and_then(|parent| self.nodes.get_mut(parent)) {
            Some(node) => node.children.retain(|child| *child != id),
            None => self.roots.retain(|root| *root != id),
        }

        let mut removed = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.remove(next) {
                removed.push(next);
                stack.extend(node.children.into_iter().rev());
            }
        }
        Ok(removed)
    }

    /// Check if `id` is a live object.
    pub fn contains(&self, id: ObjectId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of objects.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if there are no objects.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Root objects, bottom-most first.
    pub fn roots(&self) -> &[ObjectId] {
        &self.roots
    }

    /// Parent of `id`.
    pub fn parent(&self, id: ObjectId) -> Option<ObjectId> {
        self.nodes.get(id)?.parent
    }

    /// Children of `id`, back-most first.
    pub fn children(&self, id: ObjectId) -> &[ObjectId] {
        self.nodes.get(id).map_or(&[], |node| &node.children)
    }

    /// World position of `id` (origin for unknown objects).
    pub fn world_position(&self, id: ObjectId) -> Vec3 {
        self.nodes.get(id).map_or(Vec3::ZERO, |node| node.world_position)
    }

    /// Move an object.
    pub fn set_world_position(&mut self, id: ObjectId, position: Vec3) -> Result<()> {
        let node = self.nodes.get_mut(id).ok_or(Error::UnknownObject(id))?;
        node.world_position = position;
        Ok(())
    }

    /// Gestures attached to `id`, in attach order.
    pub fn gestures(&self, id: ObjectId) -> &[GestureId] {
        self.nodes.get(id).map_or(&[], |node| &node.gestures)
    }

    pub(crate) fn attach_gesture(&mut self, id: ObjectId, gesture: GestureId) -> Result<()> {
        let node = self.nodes.get_mut(id).ok_or(Error::UnknownObject(id))?;
        node.gestures.push(gesture);
        Ok(())
    }

    pub(crate) fn detach_gesture(&mut self, id: ObjectId, gesture: GestureId) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.gestures.retain(|g| *g != gesture);
        }
    }

    /// `id` followed by its ancestors, innermost first.
    pub fn ancestor_chain(&self, id: ObjectId) -> Vec<ObjectId> {
        let mut chain = Vec::new();
        let mut current = self.nodes.contains_key(id).then_some(id);
        while let Some(object) = current {
            chain.push(object);
            current = self.parent(object);
        }
        chain
    }

    /// True if `id` is `ancestor` or lies somewhere beneath it.
    pub fn is_self_or_descendant(&self, id: ObjectId, ancestor: ObjectId) -> bool {
        let mut current = Some(id);
        while let Some(object) = current {
            if object == ancestor {
                return true;
            }
            current = self.parent(object);
        }
        false
    }

    /// True if one of `a` and `b` contains the other.
    pub fn same_branch(&self, a: ObjectId, b: ObjectId) -> bool {
        self.is_self_or_descendant(a, b) || self.is_self_or_descendant(b, a)
    }

    /// Find the deepest, front-most object under `pointer`.
    pub fn find_target(&self, tester: &dyn HitTester, pointer: &Pointer) -> Option<PointerHit> {
        for root in self.roots.iter().rev() {
            match self.search(tester, pointer, *root) {
                Search::Found(hit) => return Some(hit),
                Search::Discarded => return None,
                Search::NotFound => {}
            }
        }
        None
    }

    fn search(&self, tester: &dyn HitTester, pointer: &Pointer, id: ObjectId) -> Search {
        for child in self.children(id).iter().rev() {
            match self.search(tester, pointer, *child) {
                Search::NotFound => {}
                found => return found,
            }
        }
        match tester.hit_test(pointer, id) {
            HitResult::Hit(data) => Search::Found(PointerHit { target: id, data }),
            HitResult::Discard => Search::Discarded,
            HitResult::Miss => Search::NotFound,
        }
    }
}
