//! The pointer model and the slot table that owns every live pointer.
//!
//! A [`Pointer`] is one contact (finger, mouse, pen or tracked object). Only
//! its [`PointerId`] is stable: consumers hold ids across frames and look the
//! pointer up again through the [`PointerTable`], never a reference.
//!
//! # Identity and claims
//!
//! Ids are slot-map keys. A slot is freed only once the pointer has been
//! released by its input source *and* every gesture claim on it has been
//! dropped, so an id never names two simultaneously-live pointers and is not
//! reissued while anyone still counts on it.

use std::collections::BTreeSet;
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use glam::{Vec2, Vec3};
use slotmap::{SlotMap, new_key_type};

use crate::geometry::INVALID_POSITION;
use crate::object::{ObjectId, impl_raw_id};

new_key_type! {
    /// Identifier of a live pointer.
    pub struct PointerId;
}

new_key_type! {
    /// Identifier of the input source that created a pointer.
    pub struct InputSourceId;
}

impl_raw_id!(PointerId);
impl_raw_id!(InputSourceId);

/// What kind of device produced a pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PointerKind {
    /// A finger on a touch surface.
    #[default]
    Touch,
    /// A mouse cursor.
    Mouse,
    /// A stylus.
    Pen,
    /// A tracked physical object (fiducial marker).
    Object,
}

/// Flags describing where a pointer came from.
///
/// These flags can be combined using bitwise OR operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PointerFlags(u32);

impl PointerFlags {
    /// No flags.
    pub const NONE: PointerFlags = PointerFlags(0);
    /// Synthesised by the host rather than produced by hardware.
    pub const ARTIFICIAL: PointerFlags = PointerFlags(1 << 0);
    /// Re-issued after a gesture handed its pointer back.
    pub const RETURNED: PointerFlags = PointerFlags(1 << 1);
    /// Reserved for pointers the host uses internally.
    pub const INTERNAL: PointerFlags = PointerFlags(1 << 2);

    /// Check if all bits of `flag` are set.
    pub fn has(&self, flag: PointerFlags) -> bool {
        (self.0 & flag.0) == flag.0
    }

    /// Raw bit value.
    pub fn bits(&self) -> u32 {
        self.0
    }
}

impl BitOr for PointerFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        PointerFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for PointerFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Bitmask of pressed buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PointerButtons(u32);

impl PointerButtons {
    /// Nothing pressed.
    pub const NONE: PointerButtons = PointerButtons(0);
    /// Primary button, or contact for touch and pen.
    pub const FIRST: PointerButtons = PointerButtons(1 << 0);
    /// Secondary button.
    pub const SECOND: PointerButtons = PointerButtons(1 << 1);
    /// Middle button.
    pub const THIRD: PointerButtons = PointerButtons(1 << 2);
    /// First extra button.
    pub const FOURTH: PointerButtons = PointerButtons(1 << 3);
    /// Second extra button.
    pub const FIFTH: PointerButtons = PointerButtons(1 << 4);

    /// Check if all bits of `buttons` are set.
    pub fn has(&self, buttons: PointerButtons) -> bool {
        (self.0 & buttons.0) == buttons.0
    }

    /// Check if any button is pressed.
    pub fn any_pressed(&self) -> bool {
        self.0 != 0
    }

    /// Raw bit value.
    pub fn bits(&self) -> u32 {
        self.0
    }

    /// Create from a raw bit value.
    pub fn from_bits(bits: u32) -> Self {
        PointerButtons(bits)
    }
}

impl BitOr for PointerButtons {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        PointerButtons(self.0 | rhs.0)
    }
}

/// An opaque label set attached by the input source.
///
/// Delegates typically use tags to filter pointers, e.g. to ignore everything
/// tagged `"mouse"`.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Tags(BTreeSet<String>);

impl Tags {
    /// Well-known tag for touch input.
    pub const INPUT_TOUCH: &'static str = "touch";
    /// Well-known tag for mouse input.
    pub const INPUT_MOUSE: &'static str = "mouse";
    /// Well-known tag for pen input.
    pub const INPUT_PEN: &'static str = "pen";
    /// Well-known tag for tracked-object input.
    pub const INPUT_OBJECT: &'static str = "object";

    /// Create an empty tag set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style tag insertion.
    pub fn with(mut self, tag: impl Into<String>) -> Self {
        self.0.insert(tag.into());
        self
    }

    /// Add a tag.
    pub fn add(&mut self, tag: impl Into<String>) {
        self.0.insert(tag.into());
    }

    /// Check if the set contains `tag`.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.0.contains(tag)
    }

    /// Number of tags.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if there are no tags.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over tags in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl fmt::Debug for Tags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.0.iter()).finish()
    }
}

impl<S: Into<String>> FromIterator<S> for Tags {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Tags(iter.into_iter().map(Into::into).collect())
    }
}

/// Geometric data of a hit, as reported by the hit-test oracle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HitData {
    /// World-space point under the pointer.
    pub point: Vec3,
    /// Surface normal at `point`.
    pub normal: Vec3,
}

/// A resolved hit: the front-most object under a pointer plus hit geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerHit {
    /// The object the pointer is over.
    pub target: ObjectId,
    /// Where it was hit.
    pub data: HitData,
}

/// Metadata supplied by an input source when a pointer begins.
#[derive(Debug, Clone, Default)]
pub struct PointerInit {
    /// Device kind.
    pub kind: PointerKind,
    /// Owning input source.
    pub source: InputSourceId,
    /// Initially pressed buttons.
    pub buttons: PointerButtons,
    /// Origin flags.
    pub flags: PointerFlags,
    /// Filter tags.
    pub tags: Tags,
}

impl PointerInit {
    /// A touch contact from `source`, tagged as touch input.
    pub fn touch(source: InputSourceId) -> Self {
        Self {
            kind: PointerKind::Touch,
            source,
            buttons: PointerButtons::FIRST,
            flags: PointerFlags::NONE,
            tags: Tags::new().with(Tags::INPUT_TOUCH),
        }
    }

    /// A mouse cursor from `source`, tagged as mouse input.
    pub fn mouse(source: InputSourceId) -> Self {
        Self {
            kind: PointerKind::Mouse,
            source,
            buttons: PointerButtons::FIRST,
            flags: PointerFlags::NONE,
            tags: Tags::new().with(Tags::INPUT_MOUSE),
        }
    }
}

/// One live contact.
#[derive(Debug, Clone)]
pub struct Pointer {
    id: PointerId,
    kind: PointerKind,
    source: InputSourceId,
    buttons: PointerButtons,
    flags: PointerFlags,
    tags: Tags,
    position: Vec2,
    previous_position: Vec2,
    buffered_position: Vec2,
    press_position: Vec2,
    press_target: Option<ObjectId>,
    hit: Option<PointerHit>,
    hit_frame: u64,
    claims: u32,
    released: bool,
}

impl Pointer {
    /// Pointer id.
    pub fn id(&self) -> PointerId {
        self.id
    }

    /// Device kind. Never changes over the pointer's lifetime.
    pub fn kind(&self) -> PointerKind {
        self.kind
    }

    /// Input source that owns this pointer. Never changes over its lifetime.
    pub fn input_source(&self) -> InputSourceId {
        self.source
    }

    /// Currently pressed buttons.
    pub fn buttons(&self) -> PointerButtons {
        self.buttons
    }

    /// Origin flags.
    pub fn flags(&self) -> PointerFlags {
        self.flags
    }

    /// Filter tags.
    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    /// Screen position as of the current frame.
    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Screen position as of the previous frame.
    pub fn previous_position(&self) -> Vec2 {
        self.previous_position
    }

    /// Where the pointer was when it was pressed.
    pub fn press_position(&self) -> Vec2 {
        self.press_position
    }

    /// The object the pointer was over when it was pressed.
    pub fn press_target(&self) -> Option<ObjectId> {
        self.press_target
    }

    /// The hit cached for `frame`, if one was computed in that frame.
    ///
    /// The outer `Option` is `None` when the cache is stale.
    pub fn cached_hit(&self, frame: u64) -> Option<Option<PointerHit>> {
        (self.hit_frame == frame && frame != 0).then_some(self.hit)
    }

    /// Outstanding gesture claims.
    pub fn claims(&self) -> u32 {
        self.claims
    }

    /// True once the input source has ended or cancelled the pointer.
    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Has a move been buffered since the last commit.
    pub fn has_pending_move(&self) -> bool {
        self.buffered_position != self.position
    }

    /// A detached copy placed at `position`, for probing hits at derived
    /// positions such as a gesture's centroid.
    pub fn probe_at(&self, position: Vec2) -> Pointer {
        Pointer {
            position,
            previous_position: position,
            buffered_position: position,
            hit: None,
            hit_frame: 0,
            ..self.clone()
        }
    }
}

/// The id -> pointer store owned by the dispatcher.
#[derive(Debug, Default)]
pub struct PointerTable {
    pointers: SlotMap<PointerId, Pointer>,
}

impl PointerTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new pointer at `position`.
    pub fn create(&mut self, position: Vec2, init: PointerInit) -> PointerId {
        let id = self.pointers.insert_with_key(|id| Pointer {
            id,
            kind: init.kind,
            source: init.source,
            buttons: init.buttons,
            flags: init.flags,
            tags: init.tags,
            position,
            previous_position: position,
            buffered_position: position,
            press_position: position,
            press_target: None,
            hit: None,
            hit_frame: 0,
            claims: 0,
            released: false,
        });
        tracing::trace!(target: "touch_lattice_core::pointer", ?id, ?position, "pointer created");
        id
    }

    /// Allocate a fresh pointer that replaces `previous`, flagged as returned.
    ///
    /// Returns `None` if `previous` is not in the table.
    pub fn create_returned(&mut self, previous: PointerId) -> Option<PointerId> {
        let old = self.pointers.get(previous)?;
        let init = PointerInit {
            kind: old.kind,
            source: old.source,
            buttons: old.buttons,
            flags: old.flags | PointerFlags::RETURNED,
            tags: old.tags.clone(),
        };
        let position = old.buffered_position;
        Some(self.create(position, init))
    }

    /// Look up a pointer.
    pub fn get(&self, id: PointerId) -> Option<&Pointer> {
        self.pointers.get(id)
    }

    /// Check if `id` is live.
    pub fn contains(&self, id: PointerId) -> bool {
        self.pointers.contains_key(id)
    }

    /// Number of live pointers.
    pub fn len(&self) -> usize {
        self.pointers.len()
    }

    /// True if no pointer is live.
    pub fn is_empty(&self) -> bool {
        self.pointers.is_empty()
    }

    /// Iterate over live pointers.
    pub fn iter(&self) -> impl Iterator<Item = &Pointer> {
        self.pointers.values()
    }

    /// Current position of a pointer, or [`INVALID_POSITION`] if unknown.
    pub fn position(&self, id: PointerId) -> Vec2 {
        self.pointers
            .get(id)
            .map_or(INVALID_POSITION, |pointer| pointer.position)
    }

    /// Buffer a new position, committed at the next frame.
    pub fn buffer_position(&mut self, id: PointerId, position: Vec2) -> bool {
        match self.pointers.get_mut(id) {
            Some(pointer) => {
                pointer.buffered_position = position;
                true
            }
            None => false,
        }
    }

    /// Commit the buffered position of `id`, shifting the current one into
    /// the previous slot.
    pub fn commit_position(&mut self, id: PointerId) {
        if let Some(pointer) = self.pointers.get_mut(id) {
            pointer.previous_position = pointer.position;
            pointer.position = pointer.buffered_position;
        }
    }

    /// Set the pressed buttons.
    pub fn set_buttons(&mut self, id: PointerId, buttons: PointerButtons) -> bool {
        match self.pointers.get_mut(id) {
            Some(pointer) => {
                pointer.buttons = buttons;
                true
            }
            None => false,
        }
    }

    /// Record the press position and target.
    pub fn set_press_data(&mut self, id: PointerId, target: Option<ObjectId>) {
        if let Some(pointer) = self.pointers.get_mut(id) {
            pointer.press_position = pointer.position;
            pointer.press_target = target;
        }
    }

    /// Cache a hit-test result for `frame`.
    pub fn cache_hit(&mut self, id: PointerId, frame: u64, hit: Option<PointerHit>) {
        if let Some(pointer) = self.pointers.get_mut(id) {
            pointer.hit = hit;
            pointer.hit_frame = frame;
        }
    }

    /// Add one gesture claim.
    pub fn retain(&mut self, id: PointerId) -> u32 {
        match self.pointers.get_mut(id) {
            Some(pointer) => {
                pointer.claims += 1;
                pointer.claims
            }
            None => {
                tracing::warn!(target: "touch_lattice_core::pointer", ?id, "retain on unknown pointer");
                0
            }
        }
    }

    /// Drop one gesture claim and return the remaining count.
    pub fn release(&mut self, id: PointerId) -> u32 {
        match self.pointers.get_mut(id) {
            Some(pointer) if pointer.claims > 0 => {
                pointer.claims -= 1;
                pointer.claims
            }
            Some(_) => {
                tracing::error!(target: "touch_lattice_core::pointer", ?id, "claim released twice");
                debug_assert!(false, "pointer claim released twice");
                0
            }
            None => {
                tracing::warn!(target: "touch_lattice_core::pointer", ?id, "release on unknown pointer");
                0
            }
        }
    }

    /// Mark a pointer as ended or cancelled by its input source.
    ///
    /// Returns false if the pointer is unknown or was already released.
    pub fn mark_released(&mut self, id: PointerId) -> bool {
        match self.pointers.get_mut(id) {
            Some(pointer) if !pointer.released => {
                pointer.released = true;
                true
            }
            _ => false,
        }
    }

    /// Remove a released pointer from the table, freeing its id.
    ///
    /// A pointer that still carries gesture claims indicates the dispatcher
    /// and a gesture disagree about who holds it; this is reported loudly and
    /// the pointer is removed anyway.
    pub fn retire(&mut self, id: PointerId) -> Option<Pointer> {
        let pointer = self.pointers.remove(id)?;
        if pointer.claims != 0 || !pointer.released {
            tracing::error!(
                target: "touch_lattice_core::pointer",
                ?id,
                claims = pointer.claims,
                released = pointer.released,
                "pointer retired while still claimed"
            );
            debug_assert!(
                pointer.claims == 0 && pointer.released,
                "pointer retired while still claimed"
            );
        } else {
            tracing::trace!(target: "touch_lattice_core::pointer", ?id, "pointer retired");
        }
        Some(pointer)
    }
}
