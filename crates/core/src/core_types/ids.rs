//! Typed identifiers for geometry entities
//!
//! Every CSG node lives in an arena owned by [`crate::geometry::Geometry`] and is
//! referred to by one of these newtype ids. Ids are plain indices into the arena,
//! so cells and lattices can share universes without reference cycles.
//!
//! # Usage
//! ```
//! use moc_core::core_types::ids::CellId;
//!
//! let id = CellId::new(3);
//! assert_eq!(id.index(), 3);
//! assert_eq!(id.to_string(), "cell 3");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
        )]
        #[repr(transparent)]
        pub struct $name(u32);

        impl $name {
            /// Wrap a raw id (arena index)
            #[inline]
            pub const fn new(raw: u32) -> Self {
                Self(raw)
            }

            /// Raw id value
            #[inline]
            pub const fn raw(self) -> u32 {
                self.0
            }

            /// Id as an arena index
            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }

            #[inline]
            pub(crate) fn from_index(index: usize) -> Self {
                Self(u32::try_from(index).unwrap_or(u32::MAX))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, " {}"), self.0)
            }
        }
    };
}

entity_id!(
    /// Identifier of a [`crate::geometry::Surface`]
    SurfaceId,
    "surface"
);
entity_id!(
    /// Identifier of a [`crate::geometry::Cell`]
    CellId,
    "cell"
);
entity_id!(
    /// Identifier of a [`crate::geometry::Universe`]
    UniverseId,
    "universe"
);
entity_id!(
    /// Identifier of a [`crate::geometry::Lattice`]
    LatticeId,
    "lattice"
);
entity_id!(
    /// Identifier of a [`crate::materials::Material`] registered with a geometry
    MaterialId,
    "material"
);
entity_id!(
    /// Identifier of a flat source region, stable between finalize calls
    FsrId,
    "FSR"
);
entity_id!(
    /// Identifier of a track inside a [`crate::tracking::TrackSet`]
    TrackId,
    "track"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_display_with_entity_label() {
        assert_eq!(SurfaceId::new(1).to_string(), "surface 1");
        assert_eq!(UniverseId::new(0).to_string(), "universe 0");
        assert_eq!(FsrId::new(12).to_string(), "FSR 12");
    }

    #[test]
    fn test_ids_round_trip_index() {
        let id = LatticeId::from_index(7);
        assert_eq!(id.index(), 7);
        assert_eq!(id.raw(), 7);
        assert_eq!(id, LatticeId::new(7));
    }
}
