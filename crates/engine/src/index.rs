use geo::{BoundingRect, Rect};
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{RTree, AABB};

type IndexedBox = GeomWithData<Rectangle<[f64; 2]>, usize>;

/// R*-tree over feature bounding boxes, used to find candidate pairs
/// before running exact geometry predicates.
pub(crate) struct BoxIndex {
    tree: RTree<IndexedBox>,
}

pub(crate) fn bbox<G>(geometry: &G) -> Option<Rect<f64>>
where
    G: BoundingRect<f64, Output = Option<Rect<f64>>>,
{
    geometry.bounding_rect()
}

impl BoxIndex {
    pub(crate) fn build<'a, G>(geometries: impl Iterator<Item = &'a G>) -> Self
    where
        G: BoundingRect<f64, Output = Option<Rect<f64>>> + 'a,
    {
        let boxes: Vec<IndexedBox> = geometries
            .enumerate()
            .filter_map(|(idx, geometry)| {
                bbox(geometry).map(|rect| {
                    let (min, max) = (rect.min(), rect.max());
                    GeomWithData::new(Rectangle::from_corners([min.x, min.y], [max.x, max.y]), idx)
                })
            })
            .collect();
        Self {
            tree: RTree::bulk_load(boxes),
        }
    }

    /// Indices of features whose boxes intersect `rect`, ascending
    pub(crate) fn candidates(&self, rect: Rect<f64>) -> Vec<usize> {
        let (min, max) = (rect.min(), rect.max());
        let envelope = AABB::from_corners([min.x, min.y], [max.x, max.y]);
        let mut hits: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|entry| entry.data)
            .collect();
        hits.sort_unstable();
        hits
    }
}
