//! Tracks, segments and boundary links

use crate::core_types::ids::{FsrId, TrackId};
use crate::core_types::vec2::Vec2;
use crate::geometry::{BoundaryType, BoxSide};
use serde::{Deserialize, Serialize};

/// Portion of a track inside one flat source region
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub fsr: FsrId,
    pub length: f64,
}

/// One of the two ends of a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackEnd {
    Start,
    End,
}

impl TrackEnd {
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Self::Start => 0,
            Self::End => 1,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::Start => Self::End,
            Self::End => Self::Start,
        }
    }
}

/// Sweep direction along a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Start to end
    Forward,
    /// End to start
    Backward,
}

impl Direction {
    pub const BOTH: [Direction; 2] = [Self::Forward, Self::Backward];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Self::Forward => 0,
            Self::Backward => 1,
        }
    }

    /// End through which flux leaves when sweeping in this direction
    pub fn exit(self) -> TrackEnd {
        match self {
            Self::Forward => TrackEnd::End,
            Self::Backward => TrackEnd::Start,
        }
    }

    /// Direction of a sweep that enters a track through `end`
    pub fn entering_at(end: TrackEnd) -> Self {
        match end {
            TrackEnd::Start => Self::Forward,
            TrackEnd::End => Self::Backward,
        }
    }
}

/// Where a track end lies on the bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EndPoint {
    pub point: Vec2,
    pub side: BoxSide,
    /// Position index along the side, counted in end-point spacings
    pub index: usize,
    pub boundary: BoundaryType,
}

/// Track end that receives the flux leaving through another track end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    pub track: TrackId,
    pub end: TrackEnd,
}

impl Link {
    /// Sweep direction in which the linked track carries the incoming flux
    pub fn direction(&self) -> Direction {
        Direction::entering_at(self.end)
    }
}

/// Characteristic line across the bounding box
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub(crate) id: TrackId,
    pub(crate) angle: usize,
    pub(crate) phi: f64,
    pub(crate) start: EndPoint,
    pub(crate) end: EndPoint,
    pub(crate) segments: Vec<Segment>,
    pub(crate) links: [Option<Link>; 2],
}

impl Track {
    pub fn id(&self) -> TrackId {
        self.id
    }

    /// Index of the azimuthal angle
    pub fn angle(&self) -> usize {
        self.angle
    }

    pub fn phi(&self) -> f64 {
        self.phi
    }

    pub fn start(&self) -> &EndPoint {
        &self.start
    }

    pub fn end(&self) -> &EndPoint {
        &self.end
    }

    pub fn endpoint(&self, end: TrackEnd) -> &EndPoint {
        match end {
            TrackEnd::Start => &self.start,
            TrackEnd::End => &self.end,
        }
    }

    /// Segments ordered from start to end
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn length(&self) -> f64 {
        (self.end.point - self.start.point).norm()
    }

    /// Track end receiving the flux that leaves through `end`, `None` at vacuum
    pub fn link(&self, end: TrackEnd) -> Option<Link> {
        self.links[end.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_and_end_are_consistent() {
        for dir in Direction::BOTH {
            let exit = dir.exit();
            // Entering through the exit end of the opposite sweep reverses direction
            assert_ne!(Direction::entering_at(exit), dir);
            assert_eq!(Direction::entering_at(exit.opposite()), dir);
        }
        let link = Link {
            track: TrackId::new(2),
            end: TrackEnd::End,
        };
        assert_eq!(link.direction(), Direction::Backward);
    }
}
