//!
//! # Hierarchical Layout Composition
//!
//! A [Composite] is a recursive tree over cell layouts and opaque
//! pre-placed macros. Each node's shape is fixed at construction:
//! a leaf holding a [Layout] (or a bare bounding box standing in for
//! placement padding), a reference to an external macro, or a composition -
//! horizontal, vertical, or pure overlay - over an append-only child list
//! with per-child gap and mirroring.
//!
//! Bounding boxes propagate bottom-up and are memoized until a structural
//! mutation invalidates them. Searches walk the tree accumulating a
//! coordinate transform per nesting level, so a net's geometry can be
//! located in the top-level frame after arbitrary nested mirroring.
//!

// Crates.io
use serde::{Deserialize, Serialize};

// Local imports
use crate::geom::{Int, Rect, TransformMat};
use crate::layer::{FoundTile, LayerId};
use crate::layout::Layout;
use crate::{LayoutError, LayoutResult};
use tiles21::{NetId, TileAttr, TileKind};

/// Mirroring applied to a composed child
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum Mirror {
    #[default]
    None,
    LeftRight,
    TopBottom,
    Both,
}
impl Mirror {
    /// The transform this mirroring performs
    pub fn mat(self) -> TransformMat {
        let m = TransformMat::identity();
        match self {
            Self::None => m,
            Self::LeftRight => m.mirror_lr(),
            Self::TopBottom => m.mirror_tb(),
            Self::Both => m.mirror_lr().mirror_tb(),
        }
    }
}

/// Which edge of a layout region
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Side {
    Left,
    Top,
    Right,
    Bottom,
}

/// # External Placed Macro
///
/// An opaque, pre-placed macro referenced (not owned) by a composition:
/// just enough identity to emit and place it downstream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExternMacro {
    pub name: String,
    /// The LEF file defining the macro
    pub lef_file: String,
    pub bbox: Rect,
}

/// One composed child: the subtree, a gap inserted before it along the
/// composition axis, and its mirroring
#[derive(Debug)]
pub struct CompositeEntry {
    pub child: Composite,
    pub gap: Int,
    pub mirror: Mirror,
}

/// The five node shapes of a [Composite] tree
#[derive(Debug)]
pub enum CompositeKind {
    /// A leaf: some layout, or a bare bounding box used to model
    /// placement padding and keep-out area
    Base {
        layout: Option<Layout>,
        bbox: Rect,
    },
    /// An external placed macro, not owned
    Macro(ExternMacro),
    /// Horizontal juxtaposition, left to right
    Horiz(Vec<CompositeEntry>),
    /// Vertical juxtaposition, bottom to top
    Vert(Vec<CompositeEntry>),
    /// Pure overlay: union with zero translation
    Overlay(Vec<CompositeEntry>),
}

/// Tiles found by a tree search, with the transform mapping them into the
/// frame of the node searched
#[derive(Debug)]
pub struct TileMatch {
    pub transform: TransformMat,
    pub layer: LayerId,
    pub tiles: Vec<FoundTile>,
}

/// Well or diffusion continuity record along one edge, for abutment checks
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct EdgeMat {
    /// Start coordinate along the edge
    pub offset: Int,
    /// Extent along the edge
    pub width: Int,
    /// The material
    pub attr: TileAttr,
}

/// # Edge-Attribute Record
///
/// What touches one edge of a composite: well-diffusion and diffusion
/// segments, in offset order. Two of these decide whether - and at what
/// offsets - two composites may legally abut.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EdgeAttrib {
    pub wells: Vec<EdgeMat>,
    pub mats: Vec<EdgeMat>,
}

/// Result of an abutment-alignment query
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Alignment {
    /// No offset makes the abutment legal
    Forbidden,
    /// Any offset is legal
    Any,
    /// Legal offsets form the inclusive range `[d1, d2]`
    Range(Int, Int),
}

/// # Layout Composition Node
#[derive(Debug)]
pub struct Composite {
    kind: CompositeKind,
    /// Memoized (tight, bloated) boxes; `None` marks them invalid
    cache: Option<(Rect, Rect)>,
    /// Whether this geometry was restored from a rectangle dump
    /// rather than synthesized
    read_back: bool,
    /// Instantiation-site count, for reporting
    count: u64,
}

impl Composite {
    fn from_kind(kind: CompositeKind) -> Self {
        Self {
            kind,
            cache: None,
            read_back: false,
            count: 0,
        }
    }
    /// Create a leaf node over `layout`
    pub fn from_layout(layout: Layout) -> Self {
        Self::from_kind(CompositeKind::Base {
            layout: Some(layout),
            bbox: Rect::empty(),
        })
    }
    /// Create a geometry-less leaf carrying only an explicit bounding box
    pub fn placeholder(bbox: Rect) -> Self {
        Self::from_kind(CompositeKind::Base { layout: None, bbox })
    }
    /// Create a node referencing an external placed macro
    pub fn from_macro(m: ExternMacro) -> Self {
        Self::from_kind(CompositeKind::Macro(m))
    }
    /// Create an empty horizontal composition
    pub fn horiz() -> Self {
        Self::from_kind(CompositeKind::Horiz(Vec::new()))
    }
    /// Create an empty vertical composition
    pub fn vert() -> Self {
        Self::from_kind(CompositeKind::Vert(Vec::new()))
    }
    /// Create an empty overlay
    pub fn overlay() -> Self {
        Self::from_kind(CompositeKind::Overlay(Vec::new()))
    }

    pub fn kind(&self) -> &CompositeKind {
        &self.kind
    }
    pub fn is_macro(&self) -> bool {
        matches!(self.kind, CompositeKind::Macro(_))
    }
    pub fn macro_name(&self) -> Option<&str> {
        match &self.kind {
            CompositeKind::Macro(m) => Some(&m.name),
            _ => None,
        }
    }
    pub fn lef_file(&self) -> Option<&str> {
        match &self.kind {
            CompositeKind::Macro(m) => Some(&m.lef_file),
            _ => None,
        }
    }

    /// Flag this composite as restored from a rectangle dump
    pub fn mark_read(&mut self) {
        self.read_back = true;
    }
    pub fn was_read(&self) -> bool {
        self.read_back
    }
    /// Count one more instantiation site
    pub fn inc_count(&mut self) {
        self.count += 1;
    }
    pub fn get_count(&self) -> u64 {
        self.count
    }

    ///
    /// Append `child` with `gap` inserted before it and `mirror` applied.
    /// Only legal on composition nodes; children are append-only.
    ///
    pub fn append(&mut self, child: Composite, gap: Int, mirror: Mirror) -> LayoutResult<()> {
        match &mut self.kind {
            CompositeKind::Horiz(v) | CompositeKind::Vert(v) | CompositeKind::Overlay(v) => {
                v.push(CompositeEntry { child, gap, mirror });
                self.cache = None;
                Ok(())
            }
            _ => Err(LayoutError::msg("append on a non-composition node")),
        }
    }
    /// Append with no gap and no mirroring
    pub fn push(&mut self, child: Composite) -> LayoutResult<()> {
        self.append(child, 0, Mirror::None)
    }

    /// Set the explicit bounding box. Only legal on a geometry-less leaf.
    pub fn set_bbox(&mut self, bbox: Rect) -> LayoutResult<()> {
        match &mut self.kind {
            CompositeKind::Base { layout: None, bbox: b } => {
                *b = bbox;
                self.cache = None;
                Ok(())
            }
            _ => Err(LayoutError::msg("set_bbox on a node carrying geometry")),
        }
    }

    ///
    /// Excise every geometry-less placeholder leaf from the tree.
    /// Returns `None` when the node itself was such a placeholder.
    ///
    pub fn del_bbox(mut self) -> Option<Composite> {
        let kind = std::mem::replace(&mut self.kind, CompositeKind::Overlay(Vec::new()));
        match kind {
            CompositeKind::Base { layout: None, .. } => None,
            k @ (CompositeKind::Base { .. } | CompositeKind::Macro(_)) => {
                self.kind = k;
                Some(self)
            }
            CompositeKind::Horiz(entries) => {
                self.kind = CompositeKind::Horiz(Self::del_bbox_entries(entries));
                self.cache = None;
                Some(self)
            }
            CompositeKind::Vert(entries) => {
                self.kind = CompositeKind::Vert(Self::del_bbox_entries(entries));
                self.cache = None;
                Some(self)
            }
            CompositeKind::Overlay(entries) => {
                self.kind = CompositeKind::Overlay(Self::del_bbox_entries(entries));
                self.cache = None;
                Some(self)
            }
        }
    }
    fn del_bbox_entries(entries: Vec<CompositeEntry>) -> Vec<CompositeEntry> {
        entries
            .into_iter()
            .filter_map(|e| {
                e.child.del_bbox().map(|child| CompositeEntry {
                    child,
                    gap: e.gap,
                    mirror: e.mirror,
                })
            })
            .collect()
    }

    /// Tight bounding box, composed bottom-up and memoized
    pub fn bbox(&mut self) -> Rect {
        self.boxes().0
    }
    /// Spacing-bloated bounding box, same composition over bloated leaves
    pub fn bloat_bbox(&mut self) -> Rect {
        self.boxes().1
    }

    fn is_composition(&self) -> bool {
        matches!(
            self.kind,
            CompositeKind::Horiz(_) | CompositeKind::Vert(_) | CompositeKind::Overlay(_)
        )
    }

    fn boxes(&mut self) -> (Rect, Rect) {
        if let Some(c) = self.cache {
            return c;
        }
        let out = if self.is_composition() {
            let mut tight = Rect::empty();
            let mut bloat = Rect::empty();
            for (_, pt, pb) in self.layout_children() {
                tight = tight.union(&pt);
                bloat = bloat.union(&pb);
            }
            (tight, bloat)
        } else {
            match &mut self.kind {
                CompositeKind::Base {
                    layout: Some(l), ..
                } => (l.bbox(), l.bloat_bbox()),
                CompositeKind::Base { layout: None, bbox } => (*bbox, *bbox),
                CompositeKind::Macro(m) => (m.bbox, m.bbox),
                _ => unreachable!(),
            }
        };
        self.cache = Some(out);
        out
    }

    ///
    /// Place each child: its transform into our frame, and its placed
    /// tight and bloated boxes. Horizontal composition advances a cursor
    /// by each child's (mirrored) width plus its gap; vertical does the
    /// same on the orthogonal axis; overlay applies no translation.
    ///
    fn layout_children(&mut self) -> Vec<(TransformMat, Rect, Rect)> {
        let horiz = match &self.kind {
            CompositeKind::Horiz(_) => Some(true),
            CompositeKind::Vert(_) => Some(false),
            CompositeKind::Overlay(_) => None,
            _ => return Vec::new(),
        };
        let entries = match &mut self.kind {
            CompositeKind::Horiz(e) | CompositeKind::Vert(e) | CompositeKind::Overlay(e) => e,
            _ => unreachable!(),
        };
        let mut out = Vec::with_capacity(entries.len());
        let mut cursor: Int = 0;
        for e in entries.iter_mut() {
            let (ct, cb) = e.child.boxes();
            let m = e.mirror.mat();
            let mt = m.apply_rect(&ct);
            let t = match horiz {
                None => m,
                Some(true) => {
                    if mt.is_empty() {
                        m
                    } else {
                        let t = m.translate(cursor + e.gap - mt.x0, 0);
                        cursor += e.gap + mt.width();
                        t
                    }
                }
                Some(false) => {
                    if mt.is_empty() {
                        m
                    } else {
                        let t = m.translate(0, cursor + e.gap - mt.y0);
                        cursor += e.gap + mt.height();
                        t
                    }
                }
            };
            out.push((t, t.apply_rect(&ct), t.apply_rect(&cb)));
        }
        out
    }

    ///
    /// Every tile of net `net` in the tree, annotated with the transform
    /// mapping it into this node's frame.
    ///
    pub fn search(&mut self, net: NetId) -> Vec<TileMatch> {
        let mut out = Vec::new();
        self.search_into(
            &TransformMat::identity(),
            &|l: &Layout| l.search(net),
            &mut out,
        );
        out
    }
    /// Every base-layer tile matching `attr`, transform-annotated
    pub fn search_attr(&mut self, attr: TileAttr) -> Vec<TileMatch> {
        let mut out = Vec::new();
        self.search_into(
            &TransformMat::identity(),
            &move |l: &Layout| {
                let tiles = l.search_attr(attr);
                if tiles.is_empty() {
                    Vec::new()
                } else {
                    vec![(LayerId::Base, tiles)]
                }
            },
            &mut out,
        );
        out
    }

    fn search_into(
        &mut self,
        t: &TransformMat,
        f: &dyn Fn(&Layout) -> Vec<(LayerId, Vec<FoundTile>)>,
        out: &mut Vec<TileMatch>,
    ) {
        if self.is_composition() {
            let placed: Vec<TransformMat> =
                self.layout_children().into_iter().map(|(m, _, _)| m).collect();
            if let CompositeKind::Horiz(entries)
            | CompositeKind::Vert(entries)
            | CompositeKind::Overlay(entries) = &mut self.kind
            {
                for (e, m) in entries.iter_mut().zip(placed) {
                    e.child.search_into(&m.then(t), f, out);
                }
            }
        } else if let CompositeKind::Base {
            layout: Some(l), ..
        } = &self.kind
        {
            for (layer, tiles) in f(l) {
                out.push(TileMatch {
                    transform: *t,
                    layer,
                    tiles,
                });
            }
        }
        // Macros and placeholders hold no searchable tiles
    }

    ///
    /// Write the rectangle dump of every layout in the tree, each mapped
    /// through its accumulated transform into this node's frame.
    ///
    pub fn print_rect(
        &mut self,
        w: &mut impl std::io::Write,
        t: Option<&TransformMat>,
    ) -> LayoutResult<()> {
        let ident = TransformMat::identity();
        let t = *t.unwrap_or(&ident);
        if self.is_composition() {
            let placed: Vec<TransformMat> =
                self.layout_children().into_iter().map(|(m, _, _)| m).collect();
            if let CompositeKind::Horiz(entries)
            | CompositeKind::Vert(entries)
            | CompositeKind::Overlay(entries) = &mut self.kind
            {
                for (e, m) in entries.iter_mut().zip(placed) {
                    e.child.print_rect(w, Some(&m.then(&t)))?;
                }
            }
        } else if let CompositeKind::Base {
            layout: Some(l), ..
        } = &self.kind
        {
            l.print_rect(w, Some(&t))?;
        }
        Ok(())
    }

    /// Bounding box of a search result, in the searched node's frame
    pub fn search_bbox(matches: &[TileMatch]) -> Rect {
        let mut r = Rect::empty();
        for m in matches {
            for ft in &m.tiles {
                r = r.union(&m.transform.apply_rect(&ft.rect));
            }
        }
        r
    }

    ///
    /// The well/diffusion continuity record along one edge of this
    /// composite, in offset order.
    ///
    pub fn edge(&mut self, side: Side) -> EdgeAttrib {
        let bb = self.bbox();
        let mut out = EdgeAttrib::default();
        if bb.is_empty() {
            return out;
        }
        let mut matches = Vec::new();
        self.search_into(
            &TransformMat::identity(),
            &|l: &Layout| {
                let tiles = l.search_base_where(|ft| {
                    !ft.virt && (ft.attr.is_diff() || ft.attr.is_well_diff())
                });
                if tiles.is_empty() {
                    Vec::new()
                } else {
                    vec![(LayerId::Base, tiles)]
                }
            },
            &mut matches,
        );
        for m in &matches {
            for ft in &m.tiles {
                let r = m.transform.apply_rect(&ft.rect);
                let touches = match side {
                    Side::Left => r.x0 == bb.x0,
                    Side::Right => r.x1 == bb.x1,
                    Side::Bottom => r.y0 == bb.y0,
                    Side::Top => r.y1 == bb.y1,
                };
                if !touches {
                    continue;
                }
                let (offset, width) = match side {
                    Side::Left | Side::Right => (r.y0, r.height()),
                    Side::Top | Side::Bottom => (r.x0, r.width()),
                };
                let rec = EdgeMat {
                    offset,
                    width,
                    attr: ft.attr,
                };
                if ft.attr.kind() == TileKind::WellDiff {
                    out.wells.push(rec);
                } else {
                    out.mats.push(rec);
                }
            }
        }
        out.wells.sort_by_key(|w| w.offset);
        out.mats.sort_by_key(|m| m.offset);
        out
    }
}

///
/// Compare two edge-attribute records for abutment legality.
///
/// Matching records must agree pairwise in material; each pair constrains
/// the relative offset to the range keeping the segments in contact, and
/// the result is the intersection of those ranges. Two featureless edges
/// abut at any offset.
///
pub fn alignment(a: &EdgeAttrib, b: &EdgeAttrib) -> Alignment {
    if a.wells.len() != b.wells.len() || a.mats.len() != b.mats.len() {
        return Alignment::Forbidden;
    }
    if a.wells.is_empty() && a.mats.is_empty() {
        return Alignment::Any;
    }
    let mut lo = Int::MIN;
    let mut hi = Int::MAX;
    let pairs = a
        .wells
        .iter()
        .zip(b.wells.iter())
        .chain(a.mats.iter().zip(b.mats.iter()));
    for (x, y) in pairs {
        if x.attr.clear_pin() != y.attr.clear_pin() {
            return Alignment::Forbidden;
        }
        // Offsets shifting `b` that keep this pair of segments in contact
        lo = lo.max(x.offset - (y.offset + y.width - 1));
        hi = hi.min((x.offset + x.width - 1) - y.offset);
    }
    if lo > hi {
        Alignment::Forbidden
    } else {
        Alignment::Range(lo, hi)
    }
}
