//! Leg and axis enumerations and indexing helpers.
//!
//! Every leg owns exactly two joints: a lateral ("x", hip sweep) joint and a
//! vertical ("z", lift) joint. Tables keyed by leg are plain arrays indexed by [`Leg`].
use core::fmt::Display;
use core::ops::{Index, IndexMut};

pub const LEG_COUNT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leg {
    FrontLeft = 0,
    FrontRight = 1,
    RearLeft = 2,
    RearRight = 3,
}

impl Leg {
    pub const ALL: [Leg; LEG_COUNT] = [
        Leg::FrontLeft,
        Leg::FrontRight,
        Leg::RearLeft,
        Leg::RearRight,
    ];

    pub fn is_front(self) -> bool {
        matches!(self, Leg::FrontLeft | Leg::FrontRight)
    }

    pub fn is_left(self) -> bool {
        matches!(self, Leg::FrontLeft | Leg::RearLeft)
    }
}

impl Display for Leg {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Leg::FrontLeft => f.write_str("Front left"),
            Leg::FrontRight => f.write_str("Front right"),
            Leg::RearLeft => f.write_str("Rear left"),
            Leg::RearRight => f.write_str("Rear right"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Lateral = 0,
    Vertical = 1,
}

impl Axis {
    pub const ALL: [Axis; 2] = [Axis::Lateral, Axis::Vertical];
}

impl Display for Axis {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Axis::Lateral => f.write_str("lateral"),
            Axis::Vertical => f.write_str("vertical"),
        }
    }
}

/// Target angle (degrees) of both joints of one leg.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LegTarget {
    pub x: f32,
    pub z: f32,
}

impl Index<Axis> for LegTarget {
    type Output = f32;

    fn index(&self, axis: Axis) -> &Self::Output {
        match axis {
            Axis::Lateral => &self.x,
            Axis::Vertical => &self.z,
        }
    }
}

/// One target per leg, indexed by [`Leg`].
pub type LegTargets = [LegTarget; LEG_COUNT];

impl<T> Index<Leg> for [T; LEG_COUNT] {
    type Output = T;

    fn index(&self, leg: Leg) -> &Self::Output {
        &self[leg as usize]
    }
}

impl<T> IndexMut<Leg> for [T; LEG_COUNT] {
    fn index_mut(&mut self, leg: Leg) -> &mut Self::Output {
        &mut self[leg as usize]
    }
}

impl<T> Index<Axis> for [T; 2] {
    type Output = T;

    fn index(&self, axis: Axis) -> &Self::Output {
        &self[axis as usize]
    }
}
