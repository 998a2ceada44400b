//! External point storage and the insertion write modes.

use nalgebra::Point3;

/// Index of a point in a [`PointStore`].
pub type PointId = usize;

/// Coordinate storage addressed by point index.
///
/// The octree only keeps indices; coordinates live in a store owned by the
/// locator. Any growable indexed container can serve as one.
pub trait PointStore {
    /// Number of addressable points.
    fn len(&self) -> usize;

    /// Returns `true` if the store holds no points.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the coordinate stored at `id`.
    ///
    /// # Panics
    /// Panics if `id` was never written.
    fn point(&self, id: PointId) -> Point3<f64>;

    /// Writes `p` at `id`, growing the store if needed.
    fn set_point(&mut self, id: PointId, p: Point3<f64>);

    /// Appends `p` and returns its index.
    fn push_point(&mut self, p: Point3<f64>) -> PointId;
}

impl PointStore for Vec<Point3<f64>> {
    #[inline]
    fn len(&self) -> usize {
        Vec::len(self)
    }

    #[inline]
    fn point(&self, id: PointId) -> Point3<f64> {
        self[id]
    }

    fn set_point(&mut self, id: PointId, p: Point3<f64>) {
        if id >= Vec::len(self) {
            // Gaps are filled with the new point until their own ids arrive.
            self.resize(id + 1, p);
        }
        self[id] = p;
    }

    #[inline]
    fn push_point(&mut self, p: Point3<f64>) -> PointId {
        self.push(p);
        Vec::len(self) - 1
    }
}

/// How an inserted point's coordinate reaches the store.
///
/// The same insertion algorithm serves index-only registration (the
/// coordinate is already stored, e.g. a feature centroid under a known id)
/// and the "append a new coordinate" case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertMode {
    /// The store already holds the coordinate at this index.
    RegisterIndex(PointId),
    /// Write the coordinate at this index.
    StoreAt(PointId),
    /// Append the coordinate; the store assigns the index.
    Append,
}

impl InsertMode {
    /// Applies the mode to `store` and returns the point's index.
    pub fn write<S: PointStore + ?Sized>(self, store: &mut S, p: Point3<f64>) -> PointId {
        match self {
            InsertMode::RegisterIndex(id) => {
                debug_assert!(id < store.len(), "registered index {id} is not in the store");
                id
            }
            InsertMode::StoreAt(id) => {
                store.set_point(id, p);
                id
            }
            InsertMode::Append => store.push_point(p),
        }
    }
}
