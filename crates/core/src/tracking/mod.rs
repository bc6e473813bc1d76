//! Characteristic track generation
//!
//! [`TrackGenerator::generate`] lays out tracks over a corrected azimuthal
//! quadrature, segments each track by the flat source regions it crosses, estimates
//! FSR areas from the segment lengths and links every track end to its boundary
//! partner.

mod generator;
pub mod quadrature;
pub mod track;

pub use generator::{trace, TrackGenerator, TrackSet, MIN_SEGMENT_LENGTH};
pub use quadrature::{AzimuthalAngle, AzimuthalQuadrature, PolarQuadrature};
pub use track::{Direction, EndPoint, Link, Segment, Track, TrackEnd};
