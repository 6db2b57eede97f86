//! Queryable index of rendered marks for hit-testing.
//!
//! The store keeps one lightweight record per drawable datum and resolves
//! geometry through a closure at query time, so pan/zoom transforms applied
//! to the scales are reflected without rebuilding. Rebuilds are linear in
//! the total datum count; invalidation is whole-store, never incremental.

use std::rc::Rc;

use crate::core::dataset::Dataset;
use crate::core::geometry::{Bounds, EntityGeometry, Point};

/// A queryable record binding a rendered mark back to its source datum.
#[derive(Debug)]
pub struct LightweightPlotEntity<D> {
    pub dataset: Dataset<D>,
    /// Position of the dataset within the plot's dataset list at build time.
    pub dataset_index: usize,
    /// Position of the datum within its dataset.
    pub index: usize,
    /// Position among the data that survived the drawability filter.
    pub valid_datum_index: usize,
}

impl<D> Clone for LightweightPlotEntity<D> {
    fn clone(&self) -> Self {
        Self {
            dataset: self.dataset.clone(),
            dataset_index: self.dataset_index,
            index: self.index,
            valid_datum_index: self.valid_datum_index,
        }
    }
}

/// Resolves the current pixel-space geometry of an entity.
pub type GeometryResolver<D> = Rc<dyn Fn(&LightweightPlotEntity<D>) -> EntityGeometry>;

pub struct EntityStore<D> {
    entries: Vec<LightweightPlotEntity<D>>,
    resolver: GeometryResolver<D>,
}

impl<D> EntityStore<D> {
    /// Builds the store from the given datasets, skipping data whose
    /// resolved position is not finite (invalid accessor output must not
    /// reach layout math).
    pub fn build(datasets: &[Dataset<D>], resolver: GeometryResolver<D>) -> Self {
        let mut entries = Vec::new();
        for (dataset_index, dataset) in datasets.iter().enumerate() {
            let mut valid_datum_index = 0;
            let count = dataset.len();
            for index in 0..count {
                let candidate = LightweightPlotEntity {
                    dataset: dataset.clone(),
                    dataset_index,
                    index,
                    valid_datum_index,
                };
                let geometry = resolver(&candidate);
                if !geometry.position().is_finite() {
                    continue;
                }
                entries.push(candidate);
                valid_datum_index += 1;
            }
        }
        Self { entries, resolver }
    }

    #[must_use]
    pub fn entities(&self) -> &[LightweightPlotEntity<D>] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn geometry(&self, entity: &LightweightPlotEntity<D>) -> EntityGeometry {
        (self.resolver)(entity)
    }

    #[must_use]
    pub fn position(&self, entity: &LightweightPlotEntity<D>) -> Point {
        self.geometry(entity).position()
    }

    /// The entity closest to `query_point` by squared Euclidean distance.
    /// Entities rejected by the visibility predicate are skipped; ties keep
    /// the first-encountered entity, which is stable across rebuilds.
    pub fn entity_nearest(
        &self,
        query_point: Point,
        mut visible: impl FnMut(&LightweightPlotEntity<D>, &EntityGeometry) -> bool,
    ) -> Option<&LightweightPlotEntity<D>> {
        let mut best: Option<(&LightweightPlotEntity<D>, f64)> = None;
        for entity in &self.entries {
            let geometry = self.geometry(entity);
            if !visible(entity, &geometry) {
                continue;
            }
            let distance = geometry.position().squared_distance_to(query_point);
            if !distance.is_finite() {
                continue;
            }
            match best {
                Some((_, best_distance)) if distance >= best_distance => {}
                _ => best = Some((entity, distance)),
            }
        }
        best.map(|(entity, _)| entity)
    }

    /// All entities whose geometry intersects the query region, including
    /// segments that cross the region without an endpoint inside it.
    #[must_use]
    pub fn entities_in(&self, bounds: Bounds) -> Vec<&LightweightPlotEntity<D>> {
        self.entries
            .iter()
            .filter(|entity| self.geometry(entity).intersects(bounds))
            .collect()
    }

    /// All entities whose geometry contains the query point, under the
    /// geometry-specific containment rule.
    #[must_use]
    pub fn entities_at(&self, point: Point, tolerance: f64) -> Vec<&LightweightPlotEntity<D>> {
        self.entries
            .iter()
            .filter(|entity| self.geometry(entity).contains(point, tolerance))
            .collect()
    }
}
