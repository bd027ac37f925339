//!
//! # Material Layers
//!
//! A [Layer] owns one corner-stitched plane of material plus a second plane
//! holding the vias up to the layer above, and keeps two cached bounding
//! boxes: the tight box over drawn material, recomputed lazily after
//! invalidation, and the spacing-bloated box, grown incrementally by each
//! draw with the drawn material's minimum spacing.
//!

// Crates.io
use serde::{Deserialize, Serialize};

// Local imports
use crate::geom::{Int, Rect};
use crate::LayoutResult;
use tiles21::{FetType, NetId, Plane, TileAttr, TileKey};

/// Identifies one plane within a cell's layer stackup
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum LayerId {
    /// The base layer: poly, diffusion, transistors
    Base,
    /// Routing metal, 0 = metal1
    Metal(usize),
    /// Via plane, 0 = base-to-metal1
    Via(usize),
}

/// # Material Summary
///
/// The slice of technology data a [Layer] needs at draw time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Material {
    pub name: String,
    pub min_spacing: Int,
    pub pitch: Int,
    pub min_width: Int,
}

/// One tile reported out of a search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FoundTile {
    pub rect: Rect,
    pub attr: TileAttr,
    pub net: Option<NetId>,
    pub virt: bool,
}

/// # Layer
///
/// One material's geometry within a cell.
#[derive(Debug, Clone)]
pub struct Layer {
    /// Material info
    pub mat: Material,
    /// Drawn geometry
    plane: Plane,
    /// Vias to the layer above
    via: Plane,
    /// Cached tight bbox; `None` marks it invalid
    tight: Option<Rect>,
    /// Spacing-bloated bbox, grown on each draw
    bloat: Rect,
}

impl Layer {
    /// Create a new, empty [Layer] of material `mat`
    pub fn new(mat: Material) -> Self {
        Self {
            mat,
            plane: Plane::new(),
            via: Plane::new(),
            tight: Some(Rect::empty()),
            bloat: Rect::empty(),
        }
    }

    ///
    /// Insert a rectangle of material.
    ///
    /// `min_space` is the minimum spacing of the material drawn; the
    /// bloated bbox grows by it on all sides of the new rectangle.
    ///
    pub fn draw(
        &mut self,
        llx: Int,
        lly: Int,
        wx: usize,
        wy: usize,
        attr: TileAttr,
        net: Option<NetId>,
        min_space: Int,
        force: bool,
    ) -> LayoutResult<()> {
        if wx == 0 || wy == 0 {
            return Ok(());
        }
        self.plane.add_rect(llx, lly, wx, wy, attr, net, force)?;
        let r = Rect::from_wh(llx, lly, wx, wy);
        self.tight = None;
        self.bloat = self.bloat.union(&r.bloat(self.mat.min_spacing.max(min_space)));
        Ok(())
    }

    /// Insert a virtual (spacing-only) rectangle
    pub fn draw_virt(
        &mut self,
        flavor: u8,
        ftype: FetType,
        llx: Int,
        lly: Int,
        wx: usize,
        wy: usize,
        min_space: Int,
    ) -> LayoutResult<()> {
        if wx == 0 || wy == 0 {
            return Ok(());
        }
        self.plane.add_virt(flavor, ftype, llx, lly, wx, wy)?;
        let r = Rect::from_wh(llx, lly, wx, wy);
        self.tight = None;
        self.bloat = self.bloat.union(&r.bloat(self.mat.min_spacing.max(min_space)));
        Ok(())
    }

    /// Insert a via up to the layer above
    pub fn draw_via(
        &mut self,
        llx: Int,
        lly: Int,
        wx: usize,
        wy: usize,
        net: Option<NetId>,
    ) -> LayoutResult<()> {
        self.via
            .add_rect(llx, lly, wx, wy, TileAttr::ROUTING, net, false)?;
        Ok(())
    }

    /// Insert a pin rectangle: routing material flagged with pin bits
    pub fn draw_pin(
        &mut self,
        llx: Int,
        lly: Int,
        wx: usize,
        wy: usize,
        net: NetId,
        input: bool,
    ) -> LayoutResult<()> {
        self.draw(
            llx,
            lly,
            wx,
            wy,
            TileAttr::ROUTING,
            Some(net),
            self.mat.min_spacing,
            false,
        )?;
        // Flag the freshly painted tiles
        let keys = self.plane.collect_rect(llx, lly, wx, wy);
        for k in keys {
            if self.plane.tile(k).net() == Some(net) {
                self.plane.mark_pin(k, !input);
            }
        }
        Ok(())
    }

    /// Flag every routing tile of `net` with pin (and direction) bits
    pub fn mark_pins(&mut self, net: NetId, input: bool) {
        for k in self.plane.non_space() {
            let t = self.plane.tile(k);
            if t.net() == Some(net) && t.attr().is_route() && !t.is_virt() {
                self.plane.mark_pin(k, !input);
            }
        }
    }

    fn found(&self, k: TileKey) -> FoundTile {
        let t = self.plane.tile(k);
        FoundTile {
            rect: Rect::new(t.llx, t.lly, self.plane.urx(k), self.plane.ury(k)),
            attr: t.attr(),
            net: t.net(),
            virt: t.is_virt(),
        }
    }
    fn found_via(&self, k: TileKey) -> FoundTile {
        let t = self.via.tile(k);
        FoundTile {
            rect: Rect::new(t.llx, t.lly, self.via.urx(k), self.via.ury(k)),
            attr: t.attr(),
            net: t.net(),
            virt: t.is_virt(),
        }
    }

    /// All material tiles on net `net`
    pub fn search_mat(&self, net: NetId) -> Vec<FoundTile> {
        self.plane
            .non_space()
            .into_iter()
            .filter(|&k| self.plane.tile(k).net() == Some(net))
            .map(|k| self.found(k))
            .collect()
    }
    /// All material tiles whose attribute matches `attr` (pin flags ignored)
    pub fn search_attr(&self, attr: TileAttr) -> Vec<FoundTile> {
        self.plane
            .non_space()
            .into_iter()
            .filter(|&k| self.plane.tile(k).attr().clear_pin() == attr.clear_pin())
            .map(|k| self.found(k))
            .collect()
    }
    /// All material tiles matching a caller predicate
    pub fn search_where(&self, f: impl Fn(&FoundTile) -> bool) -> Vec<FoundTile> {
        self.plane
            .non_space()
            .into_iter()
            .map(|k| self.found(k))
            .filter(|ft| f(ft))
            .collect()
    }
    /// All non-space material tiles
    pub fn all_non_space(&self) -> Vec<FoundTile> {
        self.plane
            .non_space()
            .into_iter()
            .map(|k| self.found(k))
            .collect()
    }
    /// All via tiles on net `net`
    pub fn search_via(&self, net: NetId) -> Vec<FoundTile> {
        self.via
            .non_space()
            .into_iter()
            .filter(|&k| self.via.tile(k).net() == Some(net))
            .map(|k| self.found_via(k))
            .collect()
    }
    /// All non-space via tiles
    pub fn all_non_space_via(&self) -> Vec<FoundTile> {
        self.via
            .non_space()
            .into_iter()
            .map(|k| self.found_via(k))
            .collect()
    }

    /// Tight bounding box over drawn material.
    /// Recomputed from the plane when invalid.
    pub fn bbox(&mut self) -> Rect {
        if let Some(r) = self.tight {
            return r;
        }
        let r = match self.plane.bbox() {
            Some((x0, y0, x1, y1)) => Rect::new(x0, y0, x1, y1),
            None => Rect::empty(),
        };
        self.tight = Some(r);
        r
    }
    /// Spacing-bloated bounding box
    pub fn bloat_bbox(&self) -> Rect {
        self.bloat
    }
}
