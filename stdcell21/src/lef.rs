//!
//! # LEF Macro Emission
//!
//! Writes one LEF `MACRO` block per synthesized cell: size snapped up to
//! the routing pitches, symmetric padding when the metal stack is shallow,
//! one `PIN` block per non-omitted port with its geometry resolved from the
//! synthesized pin tiles, and an `OBS` blockage on metal1 for tall cells.
//! All coordinates scale by `tech.scale / 1000` and print with six decimal
//! places.
//!

// Std-Lib
use std::io::Write;

// Crates.io
use fstrings::*;
use serde::{Deserialize, Serialize};

// Local imports
use crate::compose::Composite;
use crate::geom::Int;
use crate::layer::LayerId;
use crate::netlist::Netlist;
use crate::rules::{snap_to, Tech};
use crate::utils::{enumstr, EnumStr, Ptr};
use crate::{warn, LayoutResult};

enumstr!(
    /// # Lef Keywords
    /// The output vocabulary of the macro writer.
    LefKey {
        Version: "VERSION",
        BusBitChars: "BUSBITCHARS",
        DividerChar: "DIVIDERCHAR",
        Units: "UNITS",
        DatabaseMicrons: "DATABASE MICRONS",
        Macro: "MACRO",
        Class: "CLASS",
        Core: "CORE",
        Origin: "ORIGIN",
        Size: "SIZE",
        By: "BY",
        Symmetry: "SYMMETRY",
        Site: "SITE",
        CoreSite: "CoreSite",
        Pin: "PIN",
        Direction: "DIRECTION",
        Input: "INPUT",
        Output: "OUTPUT",
        Use: "USE",
        Signal: "SIGNAL",
        Power: "POWER",
        Ground: "GROUND",
        Port: "PORT",
        Layer: "LAYER",
        Rect: "RECT",
        Obs: "OBS",
        End: "END",
        Library: "LIBRARY",
    }
);

/// Extra boundary allowance around the drawn geometry,
/// standing in for the well surround
const WELL_MARGIN: Int = 10;

/// Metal1-pitch multiple above which a cell gets an OBS blockage
const OBS_HEIGHT_PITCHES: Int = 6;

/// Format a grid quantity as microns, six decimal places
fn um(v: Int, scale: f64) -> String {
    format!("{:.6}", v as f64 * scale)
}

/// # Lef Writing Helper
struct LefWriter<'wr> {
    /// Write Destination
    dest: Box<dyn Write + 'wr>,
    /// Indentation Helper
    indent: Indent,
}
impl<'wr> LefWriter<'wr> {
    fn new(dest: impl Write + 'wr) -> Self {
        Self {
            dest: Box::new(dest),
            indent: Indent::new("    "),
        }
    }
    /// Write a single line at the current indentation level
    fn write_line(&mut self, args: std::fmt::Arguments) -> std::io::Result<()> {
        writeln!(self.dest, "{}{}", self.indent.state, args)
    }
}

///
/// Write the library header: version boilerplate, units, and the core
/// site sized to the x-alignment pitch by `site_height` grid units.
///
pub fn write_header(w: &mut impl Write, tech: &Ptr<Tech>, site_height: Int) -> LayoutResult<()> {
    use LefKey::{
        BusBitChars, Class, Core, CoreSite, DatabaseMicrons, DividerChar, End, Site, Size, Symmetry,
        Units, Version,
    };
    let tech = tech.read()?;
    let scale = tech.scale as f64 / 1000.0;
    let site_w = um(tech.metal(1)?.get_pitch(), scale);
    let site_h = um(snap_to(site_height, tech.metal(0)?.get_pitch()), scale);

    let mut this = LefWriter::new(w);
    this.write_line(format_args_f!("{Version} 5.8 ;"))?;
    this.write_line(format_args_f!("{BusBitChars} \"[]\" ;"))?;
    this.write_line(format_args_f!("{DividerChar} \"/\" ;"))?;
    this.write_line(format_args_f!("{Units}"))?;
    this.indent += 1;
    this.write_line(format_args_f!("{DatabaseMicrons} 1000 ;"))?;
    this.indent -= 1;
    this.write_line(format_args_f!("{End} {Units}"))?;
    this.write_line(format_args_f!("{Site} {CoreSite}"))?;
    this.indent += 1;
    this.write_line(format_args_f!("{Class} {Core} ;"))?;
    this.write_line(format_args_f!("{Symmetry} X Y ;"))?;
    this.write_line(format_args_f!("{Size} {site_w} BY {site_h} ;"))?;
    this.indent -= 1;
    this.write_line(format_args_f!("{End} {CoreSite}"))?;
    Ok(())
}

///
/// Write one macro definition for `blob`.
///
/// Returns `Ok(false)` - no layout, nothing emitted - when the composite's
/// bounding box is empty.
///
pub fn write_macro(
    w: &mut impl Write,
    name: &str,
    blob: &mut Composite,
    netlist: &Ptr<Netlist>,
    tech: &Ptr<Tech>,
) -> LayoutResult<bool> {
    use LefKey::{
        By, Class, Core, CoreSite, Direction, End, Ground, Layer, Macro, Obs, Origin, Pin, Port,
        Power, Rect, Signal, Site, Size, Symmetry, Use,
    };
    let bb = blob.bbox();
    if bb.is_empty() {
        return Ok(false);
    }
    let nl = netlist.read()?;
    let tech = tech.read()?;
    assert!(
        tech.nmetals() >= 3,
        "at least three routing layers required for macro emission"
    );
    let m1 = tech.metal(0)?;
    let m2 = tech.metal(1)?;
    let m3 = tech.metal(2)?;

    let mut redge = bb.width() + WELL_MARGIN;
    let mut tedge = bb.height() + WELL_MARGIN;
    // Symmetric padding when the metal stack is shallow
    let (mut padx, mut pady) = (0, 0);
    if tech.nmetals() < 5 {
        padx = 2 * m2.get_pitch();
        pady = snap_to(2 * m3.get_pitch(), m1.get_pitch());
    }
    redge = snap_to(redge, m2.get_pitch());
    tedge = snap_to(tedge, m1.get_pitch());
    let scale = tech.scale as f64 / 1000.0;

    let mut this = LefWriter::new(w);
    this.write_line(format_args_f!("{Macro} {name}"))?;
    this.indent += 1;
    this.write_line(format_args_f!("{Class} {Core} ;"))?;
    let zero = um(0, scale);
    this.write_line(format_args_f!("{Origin} {zero} {zero} ;"))?;
    let size_x = um(redge + 2 * padx, scale);
    let size_y = um(tedge + 2 * pady, scale);
    this.write_line(format_args_f!("{Size} {size_x} {By} {size_y} ;"))?;
    this.write_line(format_args_f!("{Symmetry} X Y ;"))?;
    this.write_line(format_args_f!("{Site} {CoreSite} ;"))?;

    // Pin blocks. Geometry comes from the synthesized pin tiles on the
    // pin metal, mapped into the macro frame.
    let m2_name = m2.get_lef_name().to_string();
    let ports = nl.ports.clone();
    let vdd = nl.vdd;
    let gnd = nl.gnd;
    let port_names: Vec<String> = ports
        .iter()
        .map(|p| nl.node(p.node).name.clone())
        .collect();
    drop(nl);
    for (port, pname) in ports.iter().zip(port_names.iter()) {
        if port.omit {
            continue;
        }
        this.write_line(format_args_f!("{Pin} {pname}"))?;
        this.indent += 1;
        let dir = if port.input { LefKey::Input } else { LefKey::Output };
        this.write_line(format_args_f!("{Direction} {dir} ;"))?;
        let use_ = if port.node == vdd {
            Power
        } else if port.node == gnd {
            Ground
        } else {
            Signal
        };
        this.write_line(format_args_f!("{Use} {use_} ;"))?;
        this.write_line(format_args_f!("{Port}"))?;
        this.write_line(format_args_f!("{Layer} {m2_name} ;"))?;
        this.indent += 1;
        let mut found_any = false;
        for m in blob.search(port.node.net()) {
            if m.layer != LayerId::Metal(1) {
                continue;
            }
            for ft in m.tiles.iter().filter(|ft| ft.attr.is_pin()) {
                let r = m.transform.apply_rect(&ft.rect);
                // Tile coordinates are inclusive; the far corner of the
                // covered area is one past the last grid point
                let x0 = um(r.x0 - bb.x0 + padx, scale);
                let y0 = um(r.y0 - bb.y0 + pady, scale);
                let x1 = um(r.x1 + 1 - bb.x0 + padx, scale);
                let y1 = um(r.y1 + 1 - bb.y0 + pady, scale);
                this.write_line(format_args_f!("{Rect} {x0} {y0} {x1} {y1} ;"))?;
                found_any = true;
            }
        }
        if !found_any {
            warn(format!("no pin geometry for port {} of {}", pname, name));
        }
        this.indent -= 1;
        this.write_line(format_args_f!("{End}"))?;
        this.indent -= 1;
        this.write_line(format_args_f!("{End} {pname}"))?;
    }

    // Blockage over the routing region of tall cells
    if tedge > OBS_HEIGHT_PITCHES * m1.get_pitch() {
        let m1_name = m1.get_lef_name().to_string();
        this.write_line(format_args_f!("{Obs}"))?;
        this.indent += 1;
        this.write_line(format_args_f!("{Layer} {m1_name} ;"))?;
        let x0 = um(padx + m2.get_pitch(), scale);
        let y0 = um(pady + 3 * m1.get_pitch(), scale);
        let x1 = um(padx + redge - m2.get_pitch(), scale);
        let y1 = um(pady + tedge - 3 * m1.get_pitch(), scale);
        this.write_line(format_args_f!("{Rect} {x0} {y0} {x1} {y1} ;"))?;
        this.indent -= 1;
        this.write_line(format_args_f!("{End}"))?;
    }

    this.indent -= 1;
    this.write_line(format_args_f!("{End} {name}"))?;
    Ok(true)
}

/// Indentation Helper
struct Indent {
    unit: String,
    level: usize,
    state: String,
}
impl Indent {
    /// Create a new [Indent], initially at level 0
    fn new(unit: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            level: 0,
            state: String::new(),
        }
    }
}
impl std::ops::AddAssign<usize> for Indent {
    fn add_assign(&mut self, rhs: usize) {
        self.level += rhs;
        self.state = self.unit.repeat(self.level);
    }
}
impl std::ops::SubAssign<usize> for Indent {
    fn sub_assign(&mut self, rhs: usize) {
        if rhs > self.level {
            panic!("Indentation cannot go below 0");
        }
        self.level -= rhs;
        self.state = self.unit.repeat(self.level);
    }
}
