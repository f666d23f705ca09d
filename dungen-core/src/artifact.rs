//! The final generation artifact (`spec.md` §3): every component the
//! pipeline produced, owned by value with no back-references.

use serde::{Deserialize, Serialize};

use crate::content::{Content, TileMap};
use crate::graph::Graph;
use crate::layout::Layout;
use crate::validator::ValidationReport;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Artifact {
    pub graph: Graph,
    pub layout: Layout,
    pub tiles: TileMap,
    pub content: Content,
    pub report: ValidationReport,
}
