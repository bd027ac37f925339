//!
//! # Cell Layouts
//!
//! A [Layout] is one synthesized cell: a base layer carrying poly,
//! diffusion, transistor, and virtual-diffusion tiles - multiplexed by the
//! packed tile attribute - plus a stack of routing-metal layers and the via
//! planes between them. Each semantic draw call lands in the right layer
//! with the right attribute encoding.
//!
//! Layouts also speak a plain-text rectangle dump: an order-independent
//! enumeration of every tile, sufficient to reconstruct the geometry - and
//! in particular its bounding boxes - without re-running synthesis.
//!

// Std-Lib
use std::io::Write;

// Local imports
use crate::geom::{Int, Rect, TransformMat};
use crate::layer::{FoundTile, Layer, LayerId, Material};
use crate::netlist::{Netlist, NodeId};
use crate::rules::Tech;
use crate::utils::Ptr;
use crate::{LayoutError, LayoutResult};
use tiles21::{FetType, NetId, TileAttr, TileKind};

/// # Cell Layout
#[derive(Debug)]
pub struct Layout {
    /// Technology rules
    tech: Ptr<Tech>,
    /// Owning netlist: supplies, ports, and net identity
    netlist: Ptr<Netlist>,
    /// The base layer: poly, diffusion, fets, virtual diffusion
    base: Layer,
    /// Routing layers, index 0 = metal1
    metals: Vec<Layer>,
}

impl Layout {
    /// Create a new, empty [Layout] against `tech` and `netlist`
    pub fn new(tech: Ptr<Tech>, netlist: Ptr<Netlist>) -> LayoutResult<Self> {
        let metals = {
            let t = tech.read()?;
            t.metals
                .iter()
                .map(|m| {
                    Layer::new(Material {
                        name: m.name.clone(),
                        min_spacing: m.min_spacing,
                        pitch: m.pitch,
                        min_width: m.min_width,
                    })
                })
                .collect()
        };
        let base = Layer::new(Material {
            name: "base".to_string(),
            min_spacing: 0,
            pitch: 0,
            min_width: 0,
        });
        Ok(Self {
            tech,
            netlist,
            base,
            metals,
        })
    }

    /// Shared handle to our technology
    pub fn tech(&self) -> Ptr<Tech> {
        self.tech.clone()
    }
    /// Shared handle to our netlist
    pub fn netlist(&self) -> Ptr<Netlist> {
        self.netlist.clone()
    }
    /// Power-supply node
    pub fn vdd(&self) -> LayoutResult<NodeId> {
        Ok(self.netlist.read()?.vdd)
    }
    /// Ground node
    pub fn gnd(&self) -> LayoutResult<NodeId> {
        Ok(self.netlist.read()?.gnd)
    }

    /// Draw a poly rectangle, optionally on a gate net
    pub fn draw_poly(
        &mut self,
        llx: Int,
        lly: Int,
        wx: usize,
        wy: usize,
        net: Option<NodeId>,
    ) -> LayoutResult<()> {
        let spacing = self.tech.read()?.poly.min_spacing;
        self.base.draw(
            llx,
            lly,
            wx,
            wy,
            TileAttr::ROUTING,
            net.map(NodeId::net),
            spacing,
            false,
        )
    }

    /// Draw a diffusion rectangle
    pub fn draw_diff(
        &mut self,
        flavor: u8,
        ftype: FetType,
        llx: Int,
        lly: Int,
        wx: usize,
        wy: usize,
        net: Option<NodeId>,
    ) -> LayoutResult<()> {
        let spacing = self.tech.read()?.diff(ftype, flavor)?.min_spacing;
        self.base.draw(
            llx,
            lly,
            wx,
            wy,
            TileAttr::diff(flavor, ftype),
            net.map(NodeId::net),
            spacing,
            false,
        )
    }

    /// Draw a well-diffusion rectangle
    pub fn draw_well_diff(
        &mut self,
        flavor: u8,
        ftype: FetType,
        llx: Int,
        lly: Int,
        wx: usize,
        wy: usize,
        net: Option<NodeId>,
    ) -> LayoutResult<()> {
        let spacing = self.tech.read()?.diff(ftype, flavor)?.min_spacing;
        self.base.draw(
            llx,
            lly,
            wx,
            wy,
            TileAttr::well_diff(flavor, ftype),
            net.map(NodeId::net),
            spacing,
            false,
        )
    }

    /// Draw a transistor-gate rectangle
    pub fn draw_fet(
        &mut self,
        flavor: u8,
        ftype: FetType,
        llx: Int,
        lly: Int,
        wx: usize,
        wy: usize,
        net: Option<NodeId>,
    ) -> LayoutResult<()> {
        let spacing = {
            let t = self.tech.read()?;
            let f = t.fet(ftype, flavor)?;
            f.get_spacing(wy as Int)
        };
        self.base.draw(
            llx,
            lly,
            wx,
            wy,
            TileAttr::fet(flavor, ftype),
            net.map(NodeId::net),
            spacing,
            false,
        )
    }

    /// Draw a virtual diffusion bounding box: reserved area, not material
    pub fn draw_diff_bbox(
        &mut self,
        flavor: u8,
        ftype: FetType,
        llx: Int,
        lly: Int,
        wx: usize,
        wy: usize,
    ) -> LayoutResult<()> {
        let spacing = self.tech.read()?.diff(ftype, flavor)?.min_spacing;
        self.base.draw_virt(flavor, ftype, llx, lly, wx, wy, spacing)
    }

    /// Draw routing metal. `num` 0 = metal1.
    pub fn draw_metal(
        &mut self,
        num: usize,
        llx: Int,
        lly: Int,
        wx: usize,
        wy: usize,
        net: Option<NodeId>,
    ) -> LayoutResult<()> {
        let layer = self
            .metals
            .get_mut(num)
            .ok_or_else(|| LayoutError::msg(format!("no metal layer {}", num + 1)))?;
        let spacing = layer.mat.min_spacing;
        layer.draw(
            llx,
            lly,
            wx,
            wy,
            TileAttr::ROUTING,
            net.map(NodeId::net),
            spacing,
            false,
        )
    }

    /// Draw a routing-metal pin rectangle, flagged with its direction
    pub fn draw_metal_pin(
        &mut self,
        num: usize,
        llx: Int,
        lly: Int,
        wx: usize,
        wy: usize,
        net: NodeId,
        input: bool,
    ) -> LayoutResult<()> {
        let layer = self
            .metals
            .get_mut(num)
            .ok_or_else(|| LayoutError::msg(format!("no metal layer {}", num + 1)))?;
        layer.draw_pin(llx, lly, wx, wy, net.net(), input)
    }

    /// Draw a via. `num` 0 = base to metal1, 1 = metal1 to metal2, etc.
    pub fn draw_via(
        &mut self,
        num: usize,
        llx: Int,
        lly: Int,
        wx: usize,
        wy: usize,
        net: Option<NodeId>,
    ) -> LayoutResult<()> {
        let layer = if num == 0 {
            &mut self.base
        } else {
            self.metals
                .get_mut(num - 1)
                .ok_or_else(|| LayoutError::msg(format!("no via layer {}", num)))?
        };
        layer.draw_via(llx, lly, wx, wy, net.map(NodeId::net))
    }

    /// Flag every metal tile of every non-omitted port with pin bits
    pub fn mark_pins(&mut self) -> LayoutResult<()> {
        let ports = self.netlist.read()?.ports.clone();
        for port in ports.iter().filter(|p| !p.omit) {
            for layer in self.metals.iter_mut() {
                layer.mark_pins(port.node.net(), port.input);
            }
        }
        Ok(())
    }

    /// Number of routing layers
    pub fn nmetals(&self) -> usize {
        self.metals.len()
    }

    /// Tight bounding box over all layers
    pub fn bbox(&mut self) -> Rect {
        let mut r = self.base.bbox();
        for m in self.metals.iter_mut() {
            r = r.union(&m.bbox());
        }
        r
    }
    /// Spacing-bloated bounding box over all layers
    pub fn bloat_bbox(&self) -> Rect {
        let mut r = self.base.bloat_bbox();
        for m in self.metals.iter() {
            r = r.union(&m.bloat_bbox());
        }
        r
    }

    /// Every tile of net `net`, per layer: base, metals, then via planes
    pub fn search(&self, net: NetId) -> Vec<(LayerId, Vec<FoundTile>)> {
        let mut out = Vec::new();
        let tiles = self.base.search_mat(net);
        if !tiles.is_empty() {
            out.push((LayerId::Base, tiles));
        }
        for (i, m) in self.metals.iter().enumerate() {
            let tiles = m.search_mat(net);
            if !tiles.is_empty() {
                out.push((LayerId::Metal(i), tiles));
            }
        }
        let vias = self.base.search_via(net);
        if !vias.is_empty() {
            out.push((LayerId::Via(0), vias));
        }
        for (i, m) in self.metals.iter().enumerate() {
            let tiles = m.search_via(net);
            if !tiles.is_empty() {
                out.push((LayerId::Via(i + 1), tiles));
            }
        }
        out
    }
    /// Every base-layer tile whose attribute matches `attr`
    pub fn search_attr(&self, attr: TileAttr) -> Vec<FoundTile> {
        self.base.search_attr(attr)
    }
    /// Every base-layer tile matching a caller predicate
    pub fn search_base_where(&self, f: impl Fn(&FoundTile) -> bool) -> Vec<FoundTile> {
        self.base.search_where(f)
    }
    /// Whether geometry at `a` on via level `num`'s lower layer connects
    /// through the via plane to geometry at `b` on the layer above.
    /// `num` 0 = base to metal1.
    pub fn via_connected(&self, num: usize, a: &Rect, b: &Rect) -> bool {
        let vias = if num == 0 {
            self.base.all_non_space_via()
        } else {
            match self.metals.get(num - 1) {
                Some(m) => m.all_non_space_via(),
                None => return false,
            }
        };
        vias
            .iter()
            .any(|v| v.rect.intersects(a) && v.rect.intersects(b))
    }

    /// Every pin-flagged tile of net `net` on metal layer `num`
    pub fn search_pins(&self, num: usize, net: NetId) -> Vec<FoundTile> {
        match self.metals.get(num) {
            Some(m) => m
                .search_mat(net)
                .into_iter()
                .filter(|ft| ft.attr.is_pin())
                .collect(),
            None => Vec::new(),
        }
    }

    // Rectangle-dump support

    fn base_layer_name(attr: TileAttr) -> String {
        if attr.is_route() {
            return "poly".to_string();
        }
        let kind = match attr.kind() {
            TileKind::Fet => "fet",
            TileKind::Diff => "diff",
            TileKind::WellDiff => "wdiff",
        };
        let pol = match attr.fet_type() {
            FetType::Nfet => "n",
            FetType::Pfet => "p",
        };
        format!("{}:{}:{}", kind, pol, attr.flavor())
    }
    fn parse_base_layer(s: &str) -> LayoutResult<TileAttr> {
        if s == "poly" {
            return Ok(TileAttr::ROUTING);
        }
        let mut parts = s.split(':');
        let kind = parts.next().unwrap_or_default();
        let pol = parts.next().unwrap_or_default();
        let flavor: u8 = parts
            .next()
            .unwrap_or_default()
            .parse()
            .map_err(|_| LayoutError::Import {
                message: format!("bad layer name: {}", s),
            })?;
        let ftype = match pol {
            "n" => FetType::Nfet,
            "p" => FetType::Pfet,
            _ => {
                return Err(LayoutError::Import {
                    message: format!("bad layer name: {}", s),
                })
            }
        };
        let attr = match kind {
            "fet" => TileAttr::fet(flavor, ftype),
            "diff" => TileAttr::diff(flavor, ftype),
            "wdiff" => TileAttr::well_diff(flavor, ftype),
            _ => {
                return Err(LayoutError::Import {
                    message: format!("bad layer name: {}", s),
                })
            }
        };
        Ok(attr)
    }

    fn net_name(&self, net: Option<NetId>) -> LayoutResult<String> {
        match net {
            None => Ok("#".to_string()),
            Some(n) => Ok(self.netlist.read()?.node(NodeId(n.0)).name.clone()),
        }
    }

    ///
    /// Write the rectangle dump: one line per tile, order-independent.
    ///
    /// Line forms:
    /// * `rect <net|#> <layer> <x0> <y0> <x1> <y1>` - material
    /// * `vrect # <layer> <x0> <y0> <x1> <y1>` - virtual (spacing-only)
    /// * `inrect|outrect <net> <layer> <x0> <y0> <x1> <y1>` - pins
    /// * `via <num> <net|#> <x0> <y0> <x1> <y1>` - vias
    ///
    /// Coordinates are inclusive, transformed by `t` when given.
    ///
    pub fn print_rect(&self, w: &mut impl Write, t: Option<&TransformMat>) -> LayoutResult<()> {
        let ident = TransformMat::identity();
        let t = t.unwrap_or(&ident);
        // Base-layer material and virtuals
        for ft in self.base.all_non_space() {
            let r = t.apply_rect(&ft.rect);
            let layer = Self::base_layer_name(ft.attr);
            let net = self.net_name(ft.net)?;
            let kw = if ft.virt { "vrect" } else { "rect" };
            writeln!(w, "{} {} {} {} {} {} {}", kw, net, layer, r.x0, r.y0, r.x1, r.y1)?;
        }
        // Metals, with pins getting their own keywords
        let names: Vec<String> = self.metals.iter().map(|m| m.mat.name.clone()).collect();
        for (i, name) in names.iter().enumerate() {
            for ft in self.metals[i].all_non_space() {
                let r = t.apply_rect(&ft.rect);
                let net = self.net_name(ft.net)?;
                let kw = if ft.attr.is_pin() {
                    if ft.attr.is_output() {
                        "outrect"
                    } else {
                        "inrect"
                    }
                } else {
                    "rect"
                };
                writeln!(w, "{} {} {} {} {} {} {}", kw, net, name, r.x0, r.y0, r.x1, r.y1)?;
            }
        }
        // Via planes
        for num in 0..=self.metals.len() {
            let vias = if num == 0 {
                self.base.all_non_space_via()
            } else {
                self.metals[num - 1].all_non_space_via()
            };
            for ft in vias {
                let r = t.apply_rect(&ft.rect);
                let net = self.net_name(ft.net)?;
                writeln!(w, "via {} {} {} {} {} {}", num, net, r.x0, r.y0, r.x1, r.y1)?;
            }
        }
        Ok(())
    }

    ///
    /// Reconstruct a [Layout] from a rectangle dump.
    ///
    /// Round-trip with [Layout::print_rect] reproduces identical tight
    /// bounding boxes and attribute sets on every layer.
    ///
    pub fn read_rect(
        src: &str,
        tech: Ptr<Tech>,
        netlist: Ptr<Netlist>,
    ) -> LayoutResult<Layout> {
        let mut layout = Layout::new(tech, netlist.clone())?;
        for line in src.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with("---") {
                continue;
            }
            let toks: Vec<&str> = line.split_whitespace().collect();
            if toks.len() != 7 {
                return Err(LayoutError::Import {
                    message: format!("bad rect line: {}", line),
                });
            }
            let coords: Vec<Int> = toks[3..7]
                .iter()
                .map(|s| s.parse::<Int>())
                .collect::<Result<_, _>>()
                .map_err(|_| LayoutError::Import {
                    message: format!("bad coordinates: {}", line),
                })?;
            let (x0, y0, x1, y1) = (coords[0], coords[1], coords[2], coords[3]);
            let (wx, wy) = ((x1 - x0 + 1) as usize, (y1 - y0 + 1) as usize);
            let kw = toks[0];
            if kw == "via" {
                let num: usize = toks[1].parse()?;
                let net = Self::parse_net(&netlist, toks[2])?;
                layout.draw_via(num, x0, y0, wx, wy, net)?;
                continue;
            }
            let net = Self::parse_net(&netlist, toks[1])?;
            let layer_name = toks[2];
            match kw {
                "rect" | "vrect" => {
                    // Base layer or metal, by layer name
                    if let Some(num) = layout
                        .metals
                        .iter()
                        .position(|m| m.mat.name == layer_name)
                    {
                        layout.draw_metal(num, x0, y0, wx, wy, net)?;
                    } else {
                        let attr = Self::parse_base_layer(layer_name)?;
                        if kw == "vrect" {
                            layout.draw_diff_bbox(
                                attr.flavor(),
                                attr.fet_type(),
                                x0,
                                y0,
                                wx,
                                wy,
                            )?;
                        } else if attr.is_route() {
                            layout.draw_poly(x0, y0, wx, wy, net)?;
                        } else {
                            match attr.kind() {
                                TileKind::Fet => layout.draw_fet(
                                    attr.flavor(),
                                    attr.fet_type(),
                                    x0,
                                    y0,
                                    wx,
                                    wy,
                                    net,
                                )?,
                                TileKind::Diff => layout.draw_diff(
                                    attr.flavor(),
                                    attr.fet_type(),
                                    x0,
                                    y0,
                                    wx,
                                    wy,
                                    net,
                                )?,
                                TileKind::WellDiff => layout.draw_well_diff(
                                    attr.flavor(),
                                    attr.fet_type(),
                                    x0,
                                    y0,
                                    wx,
                                    wy,
                                    net,
                                )?,
                            }
                        }
                    }
                }
                "inrect" | "outrect" => {
                    let num = layout
                        .metals
                        .iter()
                        .position(|m| m.mat.name == layer_name)
                        .ok_or_else(|| LayoutError::Import {
                            message: format!("unknown metal layer: {}", layer_name),
                        })?;
                    let node = net.ok_or_else(|| LayoutError::Import {
                        message: format!("pin with no net: {}", line),
                    })?;
                    layout.draw_metal_pin(num, x0, y0, wx, wy, node, kw == "inrect")?;
                }
                _ => {
                    return Err(LayoutError::Import {
                        message: format!("unknown keyword: {}", kw),
                    })
                }
            }
        }
        Ok(layout)
    }

    fn parse_net(netlist: &Ptr<Netlist>, tok: &str) -> LayoutResult<Option<NodeId>> {
        if tok == "#" {
            return Ok(None);
        }
        netlist
            .read()?
            .node_named(tok)
            .map(Some)
            .ok_or_else(|| LayoutError::Import {
                message: format!("unknown net: {}", tok),
            })
    }
}
