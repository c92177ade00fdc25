//! Body landmarks as produced by a pose extractor.

use std::ops::Deref;

use serde::{Deserialize, Serialize};

/// One tracked anatomical point.
///
/// `x`/`y` are normalised image coordinates, `z` is model-defined relative
/// depth, `visibility` is the detection confidence in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    /// Horizontal position.
    pub x: f32,
    /// Vertical position.
    pub y: f32,
    /// Relative depth.
    pub z: f32,
    /// Detection confidence in `[0, 1]`.
    pub visibility: f32,
}

impl Landmark {
    /// Create a landmark, clamping `visibility` into `[0, 1]`.
    ///
    /// A NaN visibility becomes `0`.
    #[must_use]
    pub fn new(x: f32, y: f32, z: f32, visibility: f32) -> Self {
        let visibility = if visibility.is_nan() {
            0.0
        } else {
            visibility.clamp(0.0, 1.0)
        };
        Self { x, y, z, visibility }
    }

    /// Whether every component is a finite number.
    ///
    /// JSON has no NaN or infinity, so only finite landmarks can go on the wire.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite() && self.visibility.is_finite()
    }
}

/// Ordered landmarks for one detected pose.
///
/// Cardinality is fixed by the extractor model and index `N` always refers to
/// the same anatomical point. The relay never reorders or filters entries.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkSet(Vec<Landmark>);

impl LandmarkSet {
    /// Wrap an ordered list of landmarks.
    #[must_use]
    pub fn new(landmarks: Vec<Landmark>) -> Self {
        Self(landmarks)
    }

    /// Whether every landmark is finite.
    pub fn is_finite(&self) -> bool {
        self.0.iter().all(Landmark::is_finite)
    }
}

impl Deref for LandmarkSet {
    type Target = [Landmark];

    fn deref(&self) -> &[Landmark] {
        &self.0
    }
}

impl From<Vec<Landmark>> for LandmarkSet {
    fn from(landmarks: Vec<Landmark>) -> Self {
        Self(landmarks)
    }
}

impl FromIterator<Landmark> for LandmarkSet {
    fn from_iter<I: IntoIterator<Item = Landmark>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for LandmarkSet {
    type Item = Landmark;
    type IntoIter = std::vec::IntoIter<Landmark>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a LandmarkSet {
    type Item = &'a Landmark;
    type IntoIter = std::slice::Iter<'a, Landmark>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
