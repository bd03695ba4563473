//! Stable handles shared by the scene graph and the gesture roster.
//!
//! Both are slot-map keys: a handle stays valid until the entity it names is
//! removed, and a removed handle never aliases a later entity because the slot
//! version is bumped on reuse.

use slotmap::new_key_type;

new_key_type! {
    /// A unique identifier for a scene object that gestures can attach to.
    ///
    /// # Related Types
    ///
    /// - [`GestureId`] - Gestures are attached to exactly one `ObjectId`
    pub struct ObjectId;
}

new_key_type! {
    /// A unique identifier for an attached gesture.
    pub struct GestureId;
}

/// Implements `as_raw`/`from_raw` for a slot-map key type.
macro_rules! impl_raw_id {
    ($ty:ident) => {
        impl $ty {
            /// Convert the id to a raw u64 value.
            ///
            /// This is useful for interop with external systems that need a numeric ID.
            /// The raw value can be converted back using `from_raw`.
            #[inline]
            pub fn as_raw(self) -> u64 {
                use slotmap::Key;
                self.data().as_ffi()
            }

            /// Create an id from a raw u64 value.
            ///
            /// Note: This does not check that the id is still live.
            #[inline]
            pub fn from_raw(raw: u64) -> Self {
                Self::from(slotmap::KeyData::from_ffi(raw))
            }
        }
    };
}

pub(crate) use impl_raw_id;

impl_raw_id!(ObjectId);
impl_raw_id!(GestureId);

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn test_raw_round_trip() {
        let mut map: SlotMap<ObjectId, ()> = SlotMap::with_key();
        let id = map.insert(());
        assert_eq!(ObjectId::from_raw(id.as_raw()), id);
    }

    #[test]
    fn test_removed_slot_gets_new_raw_id() {
        let mut map: SlotMap<GestureId, ()> = SlotMap::with_key();
        let first = map.insert(());
        map.remove(first);
        let second = map.insert(());
        assert_ne!(first, second);
        assert_ne!(first.as_raw(), second.as_raw());
    }
}
