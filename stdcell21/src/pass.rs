//!
//! # Hierarchical Synthesis Pass
//!
//! Walks an instantiated process hierarchy bottom-up, synthesizes one
//! composite per process - dual stacks, then leftover n and p chains,
//! horizontally composed, with a pin overlay on top - and memoizes the
//! result by process identity. A process is synthesized at most once; every
//! instantiation site shares the one composite, and a failed synthesis
//! leaves no partial entry behind.
//!
//! A process whose rectangle dump is already on disk is read back instead
//! of resynthesized.
//!

// Std-Lib
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

// Local imports
use crate::compose::Composite;
use crate::geom::Int;
use crate::layout::Layout;
use crate::lef;
use crate::netlist::{Netlist, Process};
use crate::rules::{snap_down, snap_to, Tech};
use crate::synth::{synth_dual, synth_series};
use crate::utils::{DepOrder, DepOrderer, Ptr};
use crate::{warn, LayoutError, LayoutResult};
use tiles21::FetType;

/// Bottom-up ordering of the process hierarchy
struct ProcOrder;
impl DepOrder for ProcOrder {
    type Item = Ptr<Process>;
    type Error = LayoutError;

    fn process(item: &Self::Item, orderer: &mut DepOrderer<Self>) -> Result<(), Self::Error> {
        let children = item.read()?.instances.clone();
        for child in children.iter() {
            orderer.push(child)?;
        }
        Ok(())
    }
    fn fail() -> Result<(), Self::Error> {
        Err(LayoutError::msg("circular process hierarchy"))
    }
}

/// Aggregate results of a pass run
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PassStats {
    /// Processes with synthesized (or read-back) geometry
    pub cells: usize,
    /// Sum of per-cell areas, square microns
    pub stdcell_area: f64,
    /// Area weighted by instantiation count, square microns
    pub total_area: f64,
    /// Tallest cell, grid units
    pub max_height: Int,
}

/// # Synthesis Pass
pub struct SynthPass {
    tech: Ptr<Tech>,
    /// Per-process memo: `None` records a process with no geometry
    memo: HashMap<Ptr<Process>, Option<Ptr<Composite>>>,
    /// Directory of cached rectangle dumps
    rect_dir: Option<PathBuf>,
    /// Number of actual synthesizer invocations, cache hits excluded
    synth_count: usize,
}

impl SynthPass {
    /// Create a new pass against `tech`
    pub fn new(tech: Ptr<Tech>) -> Self {
        Self {
            tech,
            memo: HashMap::new(),
            rect_dir: None,
            synth_count: 0,
        }
    }
    /// Use `dir` for rectangle-dump caching: processes whose dump exists
    /// are read back rather than synthesized
    pub fn with_rect_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.rect_dir = Some(dir.into());
        self
    }

    /// Synthesize every process reachable from `roots`, dependencies first
    pub fn run(&mut self, roots: &[Ptr<Process>]) -> LayoutResult<()> {
        let order = ProcOrder::order(roots)?;
        for p in order.iter() {
            self.synth_process(p)?;
        }
        // Count instantiation sites against the shared composites
        for p in order.iter() {
            let children = p.read()?.instances.clone();
            for child in children.iter() {
                if let Some(Some(blob)) = self.memo.get(child) {
                    blob.write()?.inc_count();
                }
            }
        }
        Ok(())
    }

    /// The memoized composite for `p`: `None` when the process has no
    /// geometry, or has not been run
    pub fn layout(&self, p: &Ptr<Process>) -> Option<Ptr<Composite>> {
        self.memo.get(p).cloned().flatten()
    }

    /// How many processes went through actual synthesis
    pub fn synth_invocations(&self) -> usize {
        self.synth_count
    }

    fn synth_process(&mut self, p: &Ptr<Process>) -> LayoutResult<()> {
        if self.memo.contains_key(p) {
            return Ok(());
        }
        // Build first; a failure must leave the memo untouched
        let blob = self.create_local(p)?;
        self.memo.insert(p.clone(), blob.map(Ptr::new));
        Ok(())
    }

    /// Build one process's composite: read back its rectangle dump when
    /// cached, otherwise synthesize its stacks and overlay its pins
    fn create_local(&mut self, p: &Ptr<Process>) -> LayoutResult<Option<Composite>> {
        let proc_ = p.read()?;
        if let Some(read_back) = self.read_local_rect(&proc_)? {
            return Ok(Some(read_back));
        }
        let stacks = match &proc_.stacks {
            Some(s) if !s.is_empty() => s,
            _ => return Ok(None), // no transistor stacks: no layout
        };
        let netlist = proc_
            .netlist
            .clone()
            .ok_or_else(|| LayoutError::msg("process has stacks but no netlist"))?;
        self.synth_count += 1;

        let mut blob = Composite::horiz();
        for ds in stacks.dual.iter() {
            let mut l = Layout::new(self.tech.clone(), netlist.clone())?;
            let b = synth_dual(&mut l, ds)?;
            l.draw_diff_bbox(
                b.flavor,
                FetType::Pfet,
                b.p.llx,
                b.p.lly,
                b.p.width(),
                b.p.height(),
            )?;
            l.draw_diff_bbox(
                b.flavor,
                FetType::Nfet,
                b.n.llx,
                b.n.lly,
                b.n.width(),
                b.n.height(),
            )?;
            blob.push(Composite::from_layout(l))?;
        }
        for st in stacks.nstacks.iter() {
            let mut l = Layout::new(self.tech.clone(), netlist.clone())?;
            let b = synth_series(&mut l, st)?;
            l.draw_diff_bbox(
                b.flavor,
                FetType::Nfet,
                b.n.llx,
                b.n.lly,
                b.n.width(),
                b.n.height(),
            )?;
            blob.push(Composite::from_layout(l))?;
        }
        for st in stacks.pstacks.iter() {
            let mut l = Layout::new(self.tech.clone(), netlist.clone())?;
            let b = synth_series(&mut l, st)?;
            l.draw_diff_bbox(
                b.flavor,
                FetType::Pfet,
                b.p.llx,
                b.p.lly,
                b.p.width(),
                b.p.height(),
            )?;
            blob.push(Composite::from_layout(l))?;
        }

        let blob = self.add_pins(blob, &netlist)?;
        Ok(Some(blob))
    }

    ///
    /// Overlay the cell's pins: metal2 squares at minimum width, inputs
    /// strided along the top edge, outputs one metal1 pitch up from the
    /// bottom. The stride is the largest keeping all of a row's pins
    /// within the snapped cell width; when even the tightest stride does
    /// not fit, that is a port overflow - warned, never fatal, and
    /// placement proceeds at stride one.
    ///
    fn add_pins(&self, mut blob: Composite, netlist: &Ptr<Netlist>) -> LayoutResult<Composite> {
        let bb = blob.bbox();
        if bb.is_empty() {
            return Ok(blob);
        }
        let nl = netlist.read()?;
        let (pitch1, pitch2, min_w2) = {
            let tech = self.tech.read()?;
            if tech.nmetals() < 2 {
                return Ok(blob);
            }
            let m1 = tech.metal(0)?;
            let m2 = tech.metal(1)?;
            (m1.get_pitch(), m2.get_pitch(), m2.min_width())
        };
        let redge = snap_to(bb.width(), pitch2);
        let tedge = snap_to(bb.height(), pitch1);

        let p_in = nl.ports.iter().filter(|p| !p.omit && p.input).count() as Int;
        let p_out = nl.ports.iter().filter(|p| !p.omit && !p.input).count() as Int;
        if p_in * pitch2 > redge || p_out * pitch2 > redge {
            warn(format!("can't fit ports of cell {}", nl.name));
        }
        let s_in = stride(p_in, pitch2, redge, &nl.name, "input");
        let s_out = stride(p_out, pitch2, redge, &nl.name, "output");

        let mut pins = Layout::new(self.tech.clone(), netlist.clone())?;
        let w = min_w2;
        let mut x_in = pitch2;
        let mut x_out = pitch2;
        for port in nl.ports.iter().filter(|p| !p.omit) {
            if port.input {
                pins.draw_metal_pin(
                    1,
                    bb.x0 + x_in,
                    bb.y0 + tedge - w,
                    w as usize,
                    w as usize,
                    port.node,
                    true,
                )?;
                x_in += pitch2 * s_in;
            } else {
                pins.draw_metal_pin(
                    1,
                    bb.x0 + x_out,
                    bb.y0 + pitch1,
                    w as usize,
                    w as usize,
                    port.node,
                    false,
                )?;
                x_out += pitch2 * s_out;
            }
        }
        drop(nl);

        let mut merged = Composite::overlay();
        merged.push(blob)?;
        merged.push(Composite::from_layout(pins))?;
        Ok(merged)
    }

    // Rectangle-dump caching

    fn rect_path(&self, name: &str) -> Option<PathBuf> {
        self.rect_dir
            .as_ref()
            .map(|d| d.join(format!("{}.rect", name)))
    }
    /// Whether a cached rectangle dump exists for `p`
    pub fn have_rect(&self, p: &Ptr<Process>) -> LayoutResult<bool> {
        Ok(match self.rect_path(&p.read()?.name) {
            Some(path) => path.exists(),
            None => false,
        })
    }
    fn read_local_rect(&self, proc_: &Process) -> LayoutResult<Option<Composite>> {
        let path = match self.rect_path(&proc_.name) {
            Some(p) if p.exists() => p,
            _ => return Ok(None),
        };
        let netlist = proc_
            .netlist
            .clone()
            .ok_or_else(|| LayoutError::msg("cached rectangles for a process with no netlist"))?;
        let src = fs::read_to_string(path)?;
        let layout = Layout::read_rect(&src, self.tech.clone(), netlist)?;
        let mut blob = Composite::from_layout(layout);
        blob.mark_read();
        Ok(Some(blob))
    }
    /// Write `p`'s rectangle dump into the cache directory
    pub fn emit_rect(&self, p: &Ptr<Process>) -> LayoutResult<bool> {
        let path = match self.rect_path(&p.read()?.name) {
            Some(path) => path,
            None => return Ok(false),
        };
        let blob = match self.layout(p) {
            Some(b) => b,
            None => return Ok(false),
        };
        let mut f = fs::File::create(path)?;
        blob.write()?.print_rect(&mut f, None)?;
        f.flush()?;
        Ok(true)
    }

    // LEF emission

    /// Write the LEF technology/site header
    pub fn emit_lef_header(&self, w: &mut impl Write) -> LayoutResult<()> {
        let site_height = self.max_height()?;
        lef::write_header(w, &self.tech, site_height)
    }
    /// Write `p`'s LEF macro. Returns false - not an error - when the
    /// process has no layout to emit.
    pub fn emit_lef(&self, w: &mut impl Write, p: &Ptr<Process>) -> LayoutResult<bool> {
        let blob = match self.layout(p) {
            Some(b) => b,
            None => return Ok(false),
        };
        let proc_ = p.read()?;
        let netlist = match proc_.netlist.clone() {
            Some(n) => n,
            None => return Ok(false),
        };
        let mut blob = blob.write()?;
        lef::write_macro(w, &proc_.name, &mut blob, &netlist, &self.tech)
    }

    // Reporting & alignment helpers

    /// Tallest synthesized cell, grid units
    pub fn max_height(&self) -> LayoutResult<Int> {
        let mut max = 0;
        for blob in self.memo.values().flatten() {
            max = max.max(blob.write()?.bbox().height());
        }
        Ok(max)
    }
    /// Aggregate area and height statistics over every synthesized process
    pub fn stats(&self) -> LayoutResult<PassStats> {
        let scale = {
            let t = self.tech.read()?;
            t.scale as f64 / 1000.0
        };
        let mut out = PassStats::default();
        for blob in self.memo.values().flatten() {
            let mut b = blob.write()?;
            let bb = b.bbox();
            if bb.is_empty() {
                continue;
            }
            let area = (bb.width() as f64 * scale) * (bb.height() as f64 * scale);
            out.cells += 1;
            out.stdcell_area += area;
            out.total_area += area * (b.get_count().max(1) as f64);
            out.max_height = out.max_height.max(bb.height());
        }
        Ok(out)
    }

    /// Snap up to the x-alignment (metal2) pitch
    pub fn snap_up_x(&self, v: Int) -> LayoutResult<Int> {
        Ok(snap_to(v, self.tech.read()?.metal(1)?.get_pitch()))
    }
    /// Snap up to the y-alignment (metal1) pitch
    pub fn snap_up_y(&self, v: Int) -> LayoutResult<Int> {
        Ok(snap_to(v, self.tech.read()?.metal(0)?.get_pitch()))
    }
    /// Snap down to the x-alignment (metal2) pitch
    pub fn snap_dn_x(&self, v: Int) -> LayoutResult<Int> {
        Ok(snap_down(v, self.tech.read()?.metal(1)?.get_pitch()))
    }
    /// Snap down to the y-alignment (metal1) pitch
    pub fn snap_dn_y(&self, v: Int) -> LayoutResult<Int> {
        Ok(snap_down(v, self.tech.read()?.metal(0)?.get_pitch()))
    }
}

/// Largest stride `s` keeping `pitch + n*s*pitch` within `edge`,
/// floored at one with a port-overflow warning
pub(crate) fn stride(n: Int, pitch: Int, edge: Int, cell: &str, row: &str) -> Int {
    if n == 0 {
        return 1;
    }
    let mut s = 1;
    while pitch + n * s * pitch <= edge {
        s += 1;
    }
    s -= 1;
    if s < 1 {
        warn(format!("port pitch overflow on the {} row of cell {}", row, cell));
        s = 1;
    }
    s
}
