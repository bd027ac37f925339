//!
//! # Tiles21 Corner-Stitched Tile Planes
//!
//! A two-dimensional mesh of axis-aligned rectangular tiles covering the
//! entire (conceptually infinite) integer-grid plane, stored without any
//! grid or global index. Each tile knows four of its neighbors through
//! *corner stitches*:
//!
//! * `bl` — the neighbor across its left edge touching its bottom-left corner
//! * `lb` — the neighbor across its bottom edge touching its bottom-left corner
//! * `tr` — the neighbor across its right edge touching its top-right corner
//! * `rt` — the neighbor across its top edge touching its top-right corner
//!
//! A tile stores only its lower-left corner; its upper-right edges are
//! *derived* from the stitches (`urx = tr.llx - 1`, `ury = rt.lly - 1`,
//! absent stitches meaning "extends to the coordinate-space maximum").
//! This derivation is what makes splits cheap, and it is also the central
//! invariant every split and merge must preserve.
//!
//! Coordinates are inclusive on both ends: a tile from `(0,0)` to `(0,0)`
//! covers exactly one grid point, and a tile's dimensions are
//! `(urx - llx + 1)` by `(ury - lly + 1)`.
//!
//! Tiles live in a single arena ([SlotMap]) and refer to each other by
//! [TileKey] handles, so a merge can never leave a dangling stitch - a stale
//! key simply fails the arena lookup.
//!

// Crates.io
use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};

#[cfg(test)]
mod tests;

/// Coordinate Integer Type-Alias
pub type Int = isize;

/// Minimum representable coordinate
pub const MIN_COORD: Int = Int::MIN;
/// Maximum representable coordinate
pub const MAX_COORD: Int = Int::MAX;

new_key_type! {
    /// Keys for [Tile] entries in a [Plane]'s arena
    pub struct TileKey;
}

/// TileError-Specific Result Type
pub type TileResult<T> = Result<T, TileError>;

/// # Tile Error Enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileError {
    /// Incompatible overlapping materials
    Conflict {
        llx: Int,
        lly: Int,
        urx: Int,
        ury: Int,
    },
    /// Uncategorized Error with Message
    Str(String),
}
impl std::fmt::Display for TileError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Conflict { llx, lly, urx, ury } => write!(
                f,
                "geometry conflict in window ({}, {}) to ({}, {})",
                llx, lly, urx, ury
            ),
            Self::Str(s) => write!(f, "{}", s),
        }
    }
}
impl std::error::Error for TileError {}

/// Transistor polarity, as encoded in tile attributes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum FetType {
    Nfet,
    Pfet,
}
impl FetType {
    /// The complementary polarity
    pub fn other(self) -> Self {
        match self {
            Self::Nfet => Self::Pfet,
            Self::Pfet => Self::Nfet,
        }
    }
    fn code(self) -> u8 {
        match self {
            Self::Nfet => 0,
            Self::Pfet => 1,
        }
    }
    fn from_code(c: u8) -> Self {
        if c == 0 {
            Self::Nfet
        } else {
            Self::Pfet
        }
    }
}

/// Base-layer material category, as encoded in tile attributes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TileKind {
    Fet,
    Diff,
    WellDiff,
}
impl TileKind {
    fn code(self) -> u8 {
        match self {
            Self::Fet => 0,
            Self::Diff => 1,
            Self::WellDiff => 2,
        }
    }
    fn from_code(c: u8) -> Self {
        match c {
            0 => Self::Fet,
            1 => Self::Diff,
            _ => Self::WellDiff,
        }
    }
}

/// Number of [TileKind] categories per (flavor, polarity)
const NUM_MINOR: u8 = 3;

///
/// # Packed Tile Attribute
///
/// Six bits encoding what material a non-space tile holds:
/// zero for routing-style material (poly on the base layer, wiring on metal
/// layers), and `1 + polarity + 2*kind + 6*flavor` for the device materials.
/// Bits 2 and 3 double as pin and pin-direction flags; those are only ever
/// set on metal-layer tiles, whose material code is zero.
///
/// The packed layout is an implementation detail; all access goes through
/// the named accessors.
///
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TileAttr(u8);

impl TileAttr {
    /// Routing-material attribute (metal wiring, or poly on the base layer)
    pub const ROUTING: TileAttr = TileAttr(0);

    /// Pin flag bit
    const PIN: u8 = 1 << 2;
    /// Pin-direction (output) flag bit
    const OUTPUT: u8 = 1 << 3;

    /// Create a device-material attribute from its parts
    pub fn device(flavor: u8, ftype: FetType, kind: TileKind) -> Self {
        Self(1 + ftype.code() + 2 * kind.code() + 2 * NUM_MINOR * flavor)
    }
    /// Create a transistor-gate attribute
    pub fn fet(flavor: u8, ftype: FetType) -> Self {
        Self::device(flavor, ftype, TileKind::Fet)
    }
    /// Create a diffusion attribute
    pub fn diff(flavor: u8, ftype: FetType) -> Self {
        Self::device(flavor, ftype, TileKind::Diff)
    }
    /// Create a well-diffusion attribute
    pub fn well_diff(flavor: u8, ftype: FetType) -> Self {
        Self::device(flavor, ftype, TileKind::WellDiff)
    }

    fn nonpoly(self) -> u8 {
        self.0 - 1
    }
    /// Boolean indication of routing-style material
    pub fn is_route(self) -> bool {
        self.0 & !(Self::PIN | Self::OUTPUT) == 0
    }
    /// Transistor flavor of a device attribute
    pub fn flavor(self) -> u8 {
        self.nonpoly() / (2 * NUM_MINOR)
    }
    /// Material category of a device attribute
    pub fn kind(self) -> TileKind {
        TileKind::from_code((self.nonpoly() % (2 * NUM_MINOR)) / 2)
    }
    /// Transistor polarity of a device attribute
    pub fn fet_type(self) -> FetType {
        FetType::from_code(self.nonpoly() % 2)
    }
    pub fn is_fet(self) -> bool {
        !self.is_route() && self.kind() == TileKind::Fet
    }
    pub fn is_diff(self) -> bool {
        !self.is_route() && self.kind() == TileKind::Diff
    }
    pub fn is_well_diff(self) -> bool {
        !self.is_route() && self.kind() == TileKind::WellDiff
    }

    /// Pin flag. Only meaningful on routing-material tiles.
    pub fn is_pin(self) -> bool {
        self.0 & Self::PIN != 0
    }
    /// Pin-direction flag: set for outputs
    pub fn is_output(self) -> bool {
        self.0 & Self::OUTPUT != 0
    }
    /// Return a copy with the pin (and optionally output) flags set
    pub fn as_pin(self, output: bool) -> Self {
        let mut v = self.0 | Self::PIN;
        if output {
            v |= Self::OUTPUT;
        }
        Self(v)
    }
    /// Return a copy with the pin flags cleared
    pub fn clear_pin(self) -> Self {
        Self(self.0 & !(Self::PIN | Self::OUTPUT))
    }
}

/// Opaque net reference carried by non-space tiles
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NetId(pub usize);

///
/// # Tile Body
///
/// Everything a tile holds besides its location and stitches:
/// the space and virtual flags, the packed material attribute,
/// and the optional net reference.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileBody {
    /// Free-area flag
    pub space: bool,
    /// Virtual flag: a spacing-only constraint, not real material
    pub virt: bool,
    /// Packed material attribute
    pub attr: TileAttr,
    /// Net reference, `None` for no net
    pub net: Option<NetId>,
}
impl TileBody {
    /// Body of a free-space tile
    pub fn space() -> Self {
        Self {
            space: true,
            virt: false,
            attr: TileAttr::ROUTING,
            net: None,
        }
    }
    /// Body of a real-material tile
    pub fn real(attr: TileAttr, net: Option<NetId>) -> Self {
        Self {
            space: false,
            virt: false,
            attr,
            net,
        }
    }
    /// Body of a virtual (spacing-only) tile
    pub fn virt(attr: TileAttr) -> Self {
        Self {
            space: false,
            virt: true,
            attr,
            net: None,
        }
    }
}

///
/// # Corner-Stitched Tile
///
/// Identified by its lower-left corner; its upper-right edges are derived
/// from the `tr`/`rt` stitches by the owning [Plane].
///
#[derive(Debug, Clone)]
pub struct Tile {
    /// Lower-left corner x
    pub llx: Int,
    /// Lower-left corner y
    pub lly: Int,
    /// Left neighbor at the bottom-left corner
    bl: Option<TileKey>,
    /// Bottom neighbor at the bottom-left corner
    lb: Option<TileKey>,
    /// Right neighbor at the top-right corner
    tr: Option<TileKey>,
    /// Top neighbor at the top-right corner
    rt: Option<TileKey>,
    /// Tile content
    pub body: TileBody,
}
impl Tile {
    /// Right-neighbor stitch (at the top-right corner)
    pub fn tr(&self) -> Option<TileKey> {
        self.tr
    }
    /// Top-neighbor stitch (at the top-right corner)
    pub fn rt(&self) -> Option<TileKey> {
        self.rt
    }
    /// Left-neighbor stitch (at the bottom-left corner)
    pub fn bl(&self) -> Option<TileKey> {
        self.bl
    }
    /// Bottom-neighbor stitch (at the bottom-left corner)
    pub fn lb(&self) -> Option<TileKey> {
        self.lb
    }
    /// Free-space in the base plane: real space, or virtual diffusion.
    /// Virtual diffusion reserves area for spacing purposes but is
    /// paintable by real material.
    pub fn is_base_space(&self) -> bool {
        self.body.space || (self.body.virt && self.body.attr.is_diff())
    }
    pub fn is_space(&self) -> bool {
        self.body.space
    }
    pub fn is_virt(&self) -> bool {
        self.body.virt
    }
    pub fn attr(&self) -> TileAttr {
        self.body.attr
    }
    pub fn net(&self) -> Option<NetId> {
        self.body.net
    }
}

///
/// # Corner-Stitched Tile Plane
///
/// One material layer's worth of tiles. Starts life as a single infinite
/// space tile; painting rectangles splits tiles along the rectangle's
/// boundary, re-bodies the interior, and re-merges identical neighbors.
///
/// A cached lookup hint makes repeated nearby [Plane::find] calls cheap:
/// each lookup walks stitches from the previous result rather than from
/// any fixed root.
///
#[derive(Debug, Clone)]
pub struct Plane {
    tiles: SlotMap<TileKey, Tile>,
    /// Last-lookup hint; always a live key
    hint: TileKey,
}

impl Default for Plane {
    fn default() -> Self {
        Self::new()
    }
}

impl Plane {
    /// Create a new [Plane] covered by a single infinite space tile
    pub fn new() -> Self {
        let mut tiles = SlotMap::with_key();
        let hint = tiles.insert(Tile {
            llx: MIN_COORD,
            lly: MIN_COORD,
            bl: None,
            lb: None,
            tr: None,
            rt: None,
            body: TileBody::space(),
        });
        Self { tiles, hint }
    }
    /// Shared-reference tile access
    pub fn tile(&self, key: TileKey) -> &Tile {
        &self.tiles[key]
    }
    /// Number of live tiles, space included
    pub fn len(&self) -> usize {
        self.tiles.len()
    }
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
    /// Iterate over all live tiles
    pub fn iter(&self) -> impl Iterator<Item = (TileKey, &Tile)> {
        self.tiles.iter()
    }

    /// Derived right edge (inclusive) of tile `key`
    pub fn urx(&self, key: TileKey) -> Int {
        match self.tiles[key].tr {
            Some(r) => self.tiles[r].llx - 1,
            None => MAX_COORD,
        }
    }
    /// Derived top edge (inclusive) of tile `key`
    pub fn ury(&self, key: TileKey) -> Int {
        match self.tiles[key].rt {
            Some(r) => self.tiles[r].lly - 1,
            None => MAX_COORD,
        }
    }

    ///
    /// Point location: the unique tile containing `(x, y)`.
    ///
    /// Walks stitches from the cached hint: first vertically until the
    /// y-range matches, then horizontally, repeating as needed. Cost is
    /// proportional to the tiles crossed since the last lookup, never a
    /// scan of the plane.
    ///
    pub fn find(&mut self, x: Int, y: Int) -> TileKey {
        let mut k = self.hint;
        loop {
            let t = &self.tiles[k];
            if y < t.lly {
                k = t.lb.expect("tile mesh covers the plane");
            } else if y > self.ury(k) {
                k = self.tiles[k].rt.expect("tile mesh covers the plane");
            } else if x < t.llx {
                k = t.bl.expect("tile mesh covers the plane");
            } else if x > self.urx(k) {
                k = self.tiles[k].tr.expect("tile mesh covers the plane");
            } else {
                self.hint = k;
                return k;
            }
        }
    }

    // Neighbor enumeration along each edge of `key`.
    // Each returns the (possibly empty) list of adjacent tiles on that side.

    /// Neighbors across the right edge, top to bottom
    fn right_neighbors(&self, key: TileKey) -> Vec<TileKey> {
        let lly = self.tiles[key].lly;
        let mut out = Vec::new();
        let mut cur = self.tiles[key].tr;
        while let Some(c) = cur {
            out.push(c);
            if self.tiles[c].lly <= lly {
                break;
            }
            cur = self.tiles[c].lb;
        }
        out
    }
    /// Neighbors across the left edge, bottom to top
    fn left_neighbors(&self, key: TileKey) -> Vec<TileKey> {
        let top = self.ury(key);
        let mut out = Vec::new();
        let mut cur = self.tiles[key].bl;
        while let Some(c) = cur {
            out.push(c);
            if self.ury(c) >= top {
                break;
            }
            cur = self.tiles[c].rt;
        }
        out
    }
    /// Neighbors across the top edge, right to left
    fn top_neighbors(&self, key: TileKey) -> Vec<TileKey> {
        let llx = self.tiles[key].llx;
        let mut out = Vec::new();
        let mut cur = self.tiles[key].rt;
        while let Some(c) = cur {
            out.push(c);
            if self.tiles[c].llx <= llx {
                break;
            }
            cur = self.tiles[c].bl;
        }
        out
    }
    /// Neighbors across the bottom edge, left to right
    fn bottom_neighbors(&self, key: TileKey) -> Vec<TileKey> {
        let urx = self.urx(key);
        let mut out = Vec::new();
        let mut cur = self.tiles[key].lb;
        while let Some(c) = cur {
            out.push(c);
            if self.urx(c) >= urx {
                break;
            }
            cur = self.tiles[c].tr;
        }
        out
    }

    ///
    /// Split tile `key` horizontally at `y`, which must lie strictly inside
    /// its y-range. The original tile keeps the lower portion; the returned
    /// tile covers from `y` upward.
    ///
    fn split_y(&mut self, key: TileKey, y: Int) -> TileKey {
        debug_assert!(self.tiles[key].lly < y && y <= self.ury(key));
        let (llx, body) = (self.tiles[key].llx, self.tiles[key].body);
        let (old_tr, old_rt, old_bl) = {
            let t = &self.tiles[key];
            (t.tr, t.rt, t.bl)
        };
        // The upper portion inherits the top-right stitches
        let top = self.tiles.insert(Tile {
            llx,
            lly: y,
            bl: None,
            lb: Some(key),
            tr: old_tr,
            rt: old_rt,
            body,
        });
        // Lower portion: new top stitch, and a right stitch re-aimed at the
        // right-edge neighbor containing its (now lower) top edge
        let mut ktr = old_tr;
        while let Some(c) = ktr {
            if self.tiles[c].lly > y - 1 {
                ktr = self.tiles[c].lb;
            } else {
                break;
            }
        }
        self.tiles[key].rt = Some(top);
        self.tiles[key].tr = ktr;
        // Upper portion's left stitch: left-edge neighbor containing `y`
        let mut tbl = old_bl;
        while let Some(c) = tbl {
            if self.ury(c) < y {
                tbl = self.tiles[c].rt;
            } else {
                break;
            }
        }
        self.tiles[top].bl = tbl;
        // Re-aim neighbors that pointed at the split-away region
        for n in self.right_neighbors(top) {
            if self.tiles[n].bl == Some(key) && self.tiles[n].lly >= y {
                self.tiles[n].bl = Some(top);
            }
        }
        for n in self.top_neighbors(top) {
            if self.tiles[n].lb == Some(key) {
                self.tiles[n].lb = Some(top);
            }
        }
        for n in self.left_neighbors(top) {
            if self.tiles[n].tr == Some(key) && self.ury(n) >= y {
                self.tiles[n].tr = Some(top);
            }
        }
        top
    }

    ///
    /// Split tile `key` vertically at `x`, which must lie strictly inside
    /// its x-range. The original tile keeps the left portion; the returned
    /// tile covers from `x` rightward.
    ///
    fn split_x(&mut self, key: TileKey, x: Int) -> TileKey {
        debug_assert!(self.tiles[key].llx < x && x <= self.urx(key));
        let (lly, body) = (self.tiles[key].lly, self.tiles[key].body);
        let (old_tr, old_rt, old_lb) = {
            let t = &self.tiles[key];
            (t.tr, t.rt, t.lb)
        };
        let right = self.tiles.insert(Tile {
            llx: x,
            lly,
            bl: Some(key),
            lb: None,
            tr: old_tr,
            rt: old_rt,
            body,
        });
        // Left portion: new right stitch, and a top stitch re-aimed at the
        // top-edge neighbor containing its (now shorter) right edge
        let mut krt = old_rt;
        while let Some(c) = krt {
            if self.tiles[c].llx > x - 1 {
                krt = self.tiles[c].bl;
            } else {
                break;
            }
        }
        self.tiles[key].tr = Some(right);
        self.tiles[key].rt = krt;
        // Right portion's bottom stitch: bottom-edge neighbor containing `x`
        let mut rlb = old_lb;
        while let Some(c) = rlb {
            if self.urx(c) < x {
                rlb = self.tiles[c].tr;
            } else {
                break;
            }
        }
        self.tiles[right].lb = rlb;
        // Re-aim neighbors that pointed at the split-away region
        for n in self.top_neighbors(right) {
            if self.tiles[n].lb == Some(key) && self.tiles[n].llx >= x {
                self.tiles[n].lb = Some(right);
            }
        }
        for n in self.right_neighbors(right) {
            if self.tiles[n].bl == Some(key) {
                self.tiles[n].bl = Some(right);
            }
        }
        for n in self.bottom_neighbors(right) {
            if self.tiles[n].rt == Some(key) && self.urx(n) >= x {
                self.tiles[n].rt = Some(right);
            }
        }
        right
    }

    /// Whether `l` and its right neighbor `r` may merge into one tile
    fn mergeable_x(&self, l: TileKey, r: TileKey) -> bool {
        self.tiles[r].llx == self.urx(l) + 1
            && self.tiles[l].lly == self.tiles[r].lly
            && self.ury(l) == self.ury(r)
            && self.tiles[l].body == self.tiles[r].body
    }
    /// Whether `b` and its top neighbor `t` may merge into one tile
    fn mergeable_y(&self, b: TileKey, t: TileKey) -> bool {
        self.tiles[t].lly == self.ury(b) + 1
            && self.tiles[b].llx == self.tiles[t].llx
            && self.urx(b) == self.urx(t)
            && self.tiles[b].body == self.tiles[t].body
    }

    /// Merge right neighbor `r` into `l`. Caller asserts [Plane::mergeable_x].
    fn merge_x(&mut self, l: TileKey, r: TileKey) {
        let rights = self.right_neighbors(r);
        let tops = self.top_neighbors(r);
        let bottoms = self.bottom_neighbors(r);
        let (r_tr, r_rt) = (self.tiles[r].tr, self.tiles[r].rt);
        self.tiles[l].tr = r_tr;
        self.tiles[l].rt = r_rt;
        for n in rights {
            if self.tiles[n].bl == Some(r) {
                self.tiles[n].bl = Some(l);
            }
        }
        for n in tops {
            if self.tiles[n].lb == Some(r) {
                self.tiles[n].lb = Some(l);
            }
        }
        for n in bottoms {
            if self.tiles[n].rt == Some(r) {
                self.tiles[n].rt = Some(l);
            }
        }
        self.tiles.remove(r);
        if self.hint == r {
            self.hint = l;
        }
    }

    /// Merge top neighbor `t` into `b`. Caller asserts [Plane::mergeable_y].
    fn merge_y(&mut self, b: TileKey, t: TileKey) {
        let tops = self.top_neighbors(t);
        let rights = self.right_neighbors(t);
        let lefts = self.left_neighbors(t);
        let (t_tr, t_rt) = (self.tiles[t].tr, self.tiles[t].rt);
        self.tiles[b].tr = t_tr;
        self.tiles[b].rt = t_rt;
        for n in tops {
            if self.tiles[n].lb == Some(t) {
                self.tiles[n].lb = Some(b);
            }
        }
        for n in rights {
            if self.tiles[n].bl == Some(t) {
                self.tiles[n].bl = Some(b);
            }
        }
        for n in lefts {
            if self.tiles[n].tr == Some(t) {
                self.tiles[n].tr = Some(b);
            }
        }
        self.tiles.remove(t);
        if self.hint == t {
            self.hint = b;
        }
    }

    /// Ensure no tile spans across the horizontal line at `y`
    /// over the x-range `[x0, x1]`
    fn split_line_y(&mut self, y: Int, x0: Int, x1: Int) {
        let mut x = x0;
        loop {
            let mut k = self.find(x, y);
            if self.tiles[k].lly < y {
                k = self.split_y(k, y);
            }
            let nx = self.urx(k);
            if nx >= x1 {
                break;
            }
            x = nx + 1;
        }
    }
    /// Ensure no tile spans across the vertical line at `x`
    /// over the y-range `[y0, y1]`
    fn split_line_x(&mut self, x: Int, y0: Int, y1: Int) {
        let mut y = y0;
        loop {
            let mut k = self.find(x, y);
            if self.tiles[k].llx < x {
                k = self.split_x(k, x);
            }
            let ny = self.ury(k);
            if ny >= y1 {
                break;
            }
            y = ny + 1;
        }
    }

    ///
    /// Enumerate every tile intersecting the window, each exactly once,
    /// in scan order: bottom band first, left to right within a band.
    /// Walks stitches; never scans the arena.
    ///
    pub fn collect_rect(&mut self, llx: Int, lly: Int, wx: usize, wy: usize) -> Vec<TileKey> {
        let mut out = Vec::new();
        if wx == 0 || wy == 0 {
            return out;
        }
        let urx = llx + wx as Int - 1;
        let ury = lly + wy as Int - 1;
        let mut y = lly;
        loop {
            // Walk the band of tiles containing `y`, left to right
            let mut k = self.find(llx, y);
            let mut band_top = MAX_COORD;
            loop {
                // A tile taller than its band is reported only in the
                // first band it appears in
                if std::cmp::max(self.tiles[k].lly, lly) == y {
                    out.push(k);
                }
                band_top = std::cmp::min(band_top, self.ury(k));
                if self.urx(k) >= urx {
                    break;
                }
                // Step right: the neighbor at our top-right corner,
                // then down to the one containing `y`
                let mut next = self.tiles[k].tr.expect("tile mesh covers the plane");
                while self.tiles[next].lly > y {
                    next = self.tiles[next].lb.expect("tile mesh covers the plane");
                }
                k = next;
            }
            if band_top >= ury {
                break;
            }
            y = band_top + 1;
        }
        out
    }

    /// Whether painting `body` over a tile holding `existing` is legal
    fn compatible(existing: &TileBody, body: &TileBody) -> bool {
        if existing.space || existing.virt {
            return true;
        }
        // Pin flags do not make materials incompatible
        if existing.attr.clear_pin() != body.attr.clear_pin() {
            return false;
        }
        match (existing.net, body.net) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        }
    }

    ///
    /// Insert a rectangle of real material.
    ///
    /// Splits any tiles crossing the rectangle's boundary, re-bodies the
    /// interior, and merges attribute-identical results back together.
    /// Fails with [TileError::Conflict] - without touching the plane - if
    /// the rectangle would overlap an existing tile whose attribute or net
    /// differs incompatibly, unless `force` is set.
    ///
    /// Zero-sized rectangles are accepted and do nothing.
    ///
    pub fn add_rect(
        &mut self,
        llx: Int,
        lly: Int,
        wx: usize,
        wy: usize,
        attr: TileAttr,
        net: Option<NetId>,
        force: bool,
    ) -> TileResult<()> {
        self.paint(llx, lly, wx, wy, TileBody::real(attr, net), force, false)
    }

    ///
    /// Insert a virtual rectangle: a spacing-only constraint.
    ///
    /// Only free space is claimed; existing material (real or virtual) under
    /// the window is left untouched, so virtual insertion never conflicts.
    ///
    pub fn add_virt(
        &mut self,
        flavor: u8,
        ftype: FetType,
        llx: Int,
        lly: Int,
        wx: usize,
        wy: usize,
    ) -> TileResult<()> {
        let body = TileBody::virt(TileAttr::diff(flavor, ftype));
        self.paint(llx, lly, wx, wy, body, false, true)
    }

    fn paint(
        &mut self,
        llx: Int,
        lly: Int,
        wx: usize,
        wy: usize,
        body: TileBody,
        force: bool,
        space_only: bool,
    ) -> TileResult<()> {
        if wx == 0 || wy == 0 {
            return Ok(());
        }
        let urx = llx + wx as Int - 1;
        let ury = lly + wy as Int - 1;
        // Check for conflicts before mutating anything
        if !force && !space_only {
            for k in self.collect_rect(llx, lly, wx, wy) {
                let existing = self.tiles[k].body;
                if !Self::compatible(&existing, &body) {
                    return Err(TileError::Conflict { llx, lly, urx, ury });
                }
            }
        }
        // Carve the window boundary into the mesh
        self.split_line_y(lly, llx, urx);
        if ury < MAX_COORD {
            self.split_line_y(ury + 1, llx, urx);
        }
        self.split_line_x(llx, lly, ury);
        if urx < MAX_COORD {
            self.split_line_x(urx + 1, lly, ury);
        }
        // Re-body the interior
        for k in self.collect_rect(llx, lly, wx, wy) {
            let t = &mut self.tiles[k];
            if space_only {
                if t.body.space {
                    t.body = body;
                }
            } else if t.body.space || t.body.virt || force {
                t.body = body;
            } else {
                // Same-attribute overlap: keep the tile, adopt a net if
                // it didn't have one
                t.body.net = t.body.net.or(body.net);
            }
        }
        // Re-merge in and around the painted window
        self.merge_region(llx, lly, urx, ury);
        Ok(())
    }

    /// Merge attribute-identical adjacent tiles in and around a window,
    /// to a fixpoint
    fn merge_region(&mut self, llx: Int, lly: Int, urx: Int, ury: Int) {
        // Expand by one so boundary tiles see their outside neighbors
        let x0 = llx.saturating_sub(1);
        let y0 = lly.saturating_sub(1);
        let wx = (urx.saturating_add(1) - x0 + 1) as usize;
        let wy = (ury.saturating_add(1) - y0 + 1) as usize;
        loop {
            let mut changed = false;
            let keys = self.collect_rect(x0, y0, wx, wy);
            for k in keys {
                if !self.tiles.contains_key(k) {
                    continue;
                }
                if let Some(r) = self.tiles[k].tr {
                    if self.mergeable_x(k, r) {
                        self.merge_x(k, r);
                        changed = true;
                    }
                }
                if let Some(t) = self.tiles[k].rt {
                    if self.mergeable_y(k, t) {
                        self.merge_y(k, t);
                        changed = true;
                    }
                }
            }
            if !changed {
                break;
            }
        }
    }

    /// Set the net of tile `key`
    pub fn set_net(&mut self, key: TileKey, net: Option<NetId>) {
        self.tiles[key].body.net = net;
    }
    /// Flag tile `key` as a pin, with its direction
    pub fn mark_pin(&mut self, key: TileKey, output: bool) {
        let t = &mut self.tiles[key];
        t.body.attr = t.body.attr.as_pin(output);
    }

    /// All non-space tiles, in arena order
    pub fn non_space(&self) -> Vec<TileKey> {
        self.tiles
            .iter()
            .filter(|(_, t)| !t.body.space)
            .map(|(k, _)| k)
            .collect()
    }

    /// Tight bounding box over all non-space tiles.
    /// `None` when the plane is all space.
    pub fn bbox(&self) -> Option<(Int, Int, Int, Int)> {
        let mut acc: Option<(Int, Int, Int, Int)> = None;
        for (k, t) in self.tiles.iter() {
            if t.body.space {
                continue;
            }
            let (x0, y0, x1, y1) = (t.llx, t.lly, self.urx(k), self.ury(k));
            acc = Some(match acc {
                None => (x0, y0, x1, y1),
                Some((ax0, ay0, ax1, ay1)) => {
                    (ax0.min(x0), ay0.min(y0), ax1.max(x1), ay1.max(y1))
                }
            });
        }
        acc
    }
}
