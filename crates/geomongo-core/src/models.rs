pub mod dataset;
pub mod feature;
pub mod geometry;

pub use dataset::{DatasetDescriptor, DEFAULT_DATASETS};
pub use feature::{Feature, GEOMETRY_FIELD};
pub use geometry::{Bbox, BboxQuery, GeoIndexKind, GeometryKind, PointQuery};
