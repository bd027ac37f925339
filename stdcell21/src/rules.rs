//!
//! # Technology Rule Provider
//!
//! Everything the synthesizer asks of a technology: spacing, overhang,
//! notch, pitch, and width constants per material. Rules are plain data -
//! serde-loadable from technology files, builder-constructible in tests -
//! and every query is a pure function of its stated inputs. There is no
//! global rule table: a [Tech] reference is threaded explicitly through
//! every synthesis call, which is what keeps synthesis deterministic and
//! safely parallel across independent cells.
//!

// Crates.io
use derive_builder::Builder;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// Local imports
use crate::geom::Int;
use crate::netlist::FetEdge;
use crate::{LayoutError, LayoutResult};
use tiles21::FetType;

///
/// # Width-Binned Rule Table
///
/// Many rules take a base value, overridden above certain widths
/// (wide-metal spacing being the classic case). Bins are
/// `(threshold, value)` pairs; the last bin whose threshold the query
/// meets wins.
///
#[derive(Default, Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct RuleTable {
    pub value: Int,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bins: Vec<(Int, Int)>,
}
impl RuleTable {
    /// A flat table: one value at every width
    pub fn flat(value: Int) -> Self {
        Self {
            value,
            bins: Vec::new(),
        }
    }
    /// The rule value at width (or length) `w`
    pub fn at(&self, w: Int) -> Int {
        let mut v = self.value;
        for &(threshold, value) in self.bins.iter() {
            if w >= threshold {
                v = value;
            }
        }
        v
    }
}
impl From<Int> for RuleTable {
    fn from(value: Int) -> Self {
        Self::flat(value)
    }
}

/// # Diffusion Material Rules
#[derive(Default, Clone, Builder, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[builder(pattern = "owned", setter(into))]
pub struct DiffRules {
    /// Material Name
    pub name: String,
    /// Minimum drawn width
    pub min_width: Int,
    /// Minimum same-material spacing
    pub min_spacing: Int,
    /// Diffusion overhang past a gate edge
    pub overhang: RuleTable,
    /// Overhang when the adjoining node carries a contact
    pub cont_overhang: RuleTable,
    /// Extra spacing required across a width discontinuity
    pub notch_spacing: Int,
    /// Minimum spacing from a mid-stack contact to the next gate
    pub via_space_mid: Int,
    /// Spacing to the opposite-polarity diffusion row
    pub opp_diff_space: Int,
}
impl DiffRules {
    /// Effective overhang at device width `w`, with or without a contact
    pub fn eff_overhang(&self, w: Int, has_contact: bool) -> Int {
        if has_contact {
            self.overhang.at(w).max(self.cont_overhang.at(w))
        } else {
            self.overhang.at(w)
        }
    }
    pub fn notch_spacing(&self) -> Int {
        self.notch_spacing
    }
    pub fn via_space_mid(&self) -> Int {
        self.via_space_mid
    }
}

/// # Transistor (Gate) Material Rules
#[derive(Default, Clone, Builder, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[builder(pattern = "owned", setter(into))]
pub struct FetRules {
    /// Material Name
    pub name: String,
    /// Minimum gate length
    pub min_width: Int,
    /// Gate-to-gate spacing along a diffusion run, by device width
    pub spacing: RuleTable,
}
impl FetRules {
    /// Gate-to-gate spacing at device width `w`
    pub fn get_spacing(&self, w: Int) -> Int {
        self.spacing.at(w)
    }
}

/// # Poly Rules
#[derive(Default, Clone, Builder, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[builder(pattern = "owned", setter(into))]
pub struct PolyRules {
    /// Material Name
    pub name: String,
    /// Minimum spacing
    pub min_spacing: Int,
    /// Gate overhang past the diffusion edge, by gate length
    pub overhang: RuleTable,
    /// Widened overhang on the side of a width discontinuity, by gate length
    pub notch_overhang: RuleTable,
}
impl PolyRules {
    pub fn get_overhang(&self, l: Int) -> Int {
        self.overhang.at(l)
    }
    pub fn get_notch_overhang(&self, l: Int) -> Int {
        self.notch_overhang.at(l)
    }
}

/// # Routing (Metal) Layer Rules
#[derive(Default, Clone, Builder, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[builder(pattern = "owned", setter(into))]
pub struct RoutingRules {
    /// Material Name
    pub name: String,
    /// Name used in LEF output, when it differs from `name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub lef_name: Option<String>,
    /// Center-to-center track pitch
    pub pitch: Int,
    /// Minimum drawn width
    pub min_width: Int,
    /// Minimum spacing
    pub min_spacing: Int,
}
impl RoutingRules {
    pub fn get_pitch(&self) -> Int {
        self.pitch
    }
    pub fn min_width(&self) -> Int {
        self.min_width
    }
    /// The name this layer goes by in LEF output
    pub fn get_lef_name(&self) -> &str {
        self.lef_name.as_deref().unwrap_or(&self.name)
    }
}

///
/// # Technology
///
/// The complete rule set for one process technology, including the three
/// per-technology device-sizing integers: minimum device width and the
/// n/p fold widths (zero meaning no folding).
///
/// Device rules are indexed by `(polarity, flavor)`; a missing flavor is an
/// upstream contract breach and surfaces as an error, never a default.
///
#[derive(Default, Clone, Builder, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[builder(pattern = "owned", setter(into))]
pub struct Tech {
    /// Technology Name
    pub name: String,
    /// Grid-unit scale: one grid unit is `scale / 1000` microns in LEF output
    pub scale: Int,
    /// Minimum device width
    pub min_width: Int,
    /// nFET fold width, 0 = no folding
    #[serde(default)]
    #[builder(default)]
    pub fold_n_width: Int,
    /// pFET fold width, 0 = no folding
    #[serde(default)]
    #[builder(default)]
    pub fold_p_width: Int,
    /// Poly rules
    pub poly: PolyRules,
    /// nFET diffusion rules, per flavor
    pub ndiff: Vec<DiffRules>,
    /// pFET diffusion rules, per flavor
    pub pdiff: Vec<DiffRules>,
    /// nFET gate rules, per flavor
    pub nfet: Vec<FetRules>,
    /// pFET gate rules, per flavor
    pub pfet: Vec<FetRules>,
    /// Routing layers, metal1 first
    pub metals: Vec<RoutingRules>,
}
impl stdcell21utils::SerdeFile for Tech {}

impl Tech {
    /// Diffusion rules for `(ftype, flavor)`
    pub fn diff(&self, ftype: FetType, flavor: u8) -> LayoutResult<&DiffRules> {
        let v = match ftype {
            FetType::Nfet => &self.ndiff,
            FetType::Pfet => &self.pdiff,
        };
        v.get(flavor as usize)
            .ok_or_else(|| LayoutError::msg(format!("no diffusion rules for flavor {}", flavor)))
    }
    /// Gate rules for `(ftype, flavor)`
    pub fn fet(&self, ftype: FetType, flavor: u8) -> LayoutResult<&FetRules> {
        let v = match ftype {
            FetType::Nfet => &self.nfet,
            FetType::Pfet => &self.pfet,
        };
        v.get(flavor as usize)
            .ok_or_else(|| LayoutError::msg(format!("no gate rules for flavor {}", flavor)))
    }
    /// Routing rules for metal index `num` (0 = metal1)
    pub fn metal(&self, num: usize) -> LayoutResult<&RoutingRules> {
        self.metals
            .get(num)
            .ok_or_else(|| LayoutError::msg(format!("no routing layer {}", num + 1)))
    }
    /// Number of routing layers
    pub fn nmetals(&self) -> usize {
        self.metals.len()
    }

    ///
    /// Effective width of fold-segment `idx` of edge `e`.
    ///
    /// With a fold width `f`, a device of width `w` is drawn as
    /// `ceil(w / f)` segments: all but the last at width `f`, the last
    /// taking the remainder, widened to the technology minimum if the
    /// remainder falls below it. A fold width of zero draws the device
    /// at its full width.
    ///
    pub fn eff_width(&self, e: &FetEdge, idx: usize) -> Int {
        let fold = match e.ftype {
            FetType::Nfet => self.fold_n_width,
            FetType::Pfet => self.fold_p_width,
        };
        if fold == 0 || e.w <= fold {
            return e.w;
        }
        let nf = (e.w + fold - 1) / fold;
        if (idx as Int) < nf - 1 {
            fold
        } else {
            let rem = e.w - fold * (nf - 1);
            rem.max(self.min_width)
        }
    }
}

/// Snap `w` up to the next multiple of `pitch`
pub fn snap_to(w: Int, pitch: Int) -> Int {
    if pitch > 0 && w % pitch != 0 {
        w + pitch - (w % pitch)
    } else {
        w
    }
}
/// Snap `w` down to the previous multiple of `pitch`
pub fn snap_down(w: Int, pitch: Int) -> Int {
    if pitch > 0 {
        w - (w % pitch)
    } else {
        w
    }
}
