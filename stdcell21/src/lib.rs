//!
//! # Stdcell21 Standard-Cell Layout Synthesis
//!
//! Turns transistor-level netlists - already decomposed into series
//! transistor stacks - into design-rule-correct rectangle geometry, and
//! composes the per-cell results hierarchically into macros ready for
//! place-and-route.
//!
//! The pieces, bottom-up:
//!
//! * [tiles21] corner-stitched planes store each material's rectangles
//! * [layer::Layer] / [layout::Layout] multiplex those planes per cell
//! * [synth] walks a transistor stack and emits diffusion/poly/gate
//!   rectangles honoring overhang and notch rules
//! * [compose::Composite] combines per-stack and per-cell geometry into a
//!   hierarchical tree with bounding-box propagation and mirroring
//! * [pass::SynthPass] drives the whole thing over a process hierarchy,
//!   memoizing one composite per process, and emits LEF macros
//!

// Std-Lib
use std::fmt;

// Internal modules & re-exports
pub use stdcell21utils as utils;
pub use tiles21;

pub mod compose;
pub mod geom;
pub mod layer;
pub mod layout;
pub mod lef;
pub mod netlist;
pub mod pass;
pub mod rules;
pub mod synth;

#[cfg(test)]
mod tests;

/// LayoutError-Specific Result Type
pub type LayoutResult<T> = Result<T, LayoutError>;

///
/// # Layout Error Enumeration
///
#[derive(Debug)]
pub enum LayoutError {
    /// Incompatible overlapping materials in a tile plane
    Conflict {
        llx: geom::Int,
        lly: geom::Int,
        urx: geom::Int,
        ury: geom::Int,
    },
    /// A computed spacing or overhang came out non-positive:
    /// the device/rule model does not support the requested geometry
    Rule(String),
    /// Error importing from a foreign format
    Import { message: String },
    /// Boxed External Errors
    Boxed(Box<dyn std::error::Error>),
    /// Uncategorized Error with Message
    Str(String),
}
impl LayoutError {
    /// Create a [LayoutError::Str] from anything String-convertible
    pub fn msg(s: impl Into<String>) -> Self {
        Self::Str(s.into())
    }
}
impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Conflict { llx, lly, urx, ury } => write!(
                f,
                "geometry conflict in window ({}, {}) to ({}, {})",
                llx, lly, urx, ury
            ),
            Self::Rule(msg) => write!(f, "rule violation: {}", msg),
            Self::Import { message } => write!(f, "import error: {}", message),
            Self::Boxed(e) => write!(f, "{}", e),
            Self::Str(msg) => write!(f, "{}", msg),
        }
    }
}
impl std::error::Error for LayoutError {}
impl From<String> for LayoutError {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}
impl From<&str> for LayoutError {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}
impl From<tiles21::TileError> for LayoutError {
    fn from(e: tiles21::TileError) -> Self {
        match e {
            tiles21::TileError::Conflict { llx, lly, urx, ury } => {
                Self::Conflict { llx, lly, urx, ury }
            }
            tiles21::TileError::Str(s) => Self::Str(s),
        }
    }
}
impl From<std::io::Error> for LayoutError {
    fn from(e: std::io::Error) -> Self {
        Self::Boxed(Box::new(e))
    }
}
impl From<std::num::ParseIntError> for LayoutError {
    fn from(e: std::num::ParseIntError) -> Self {
        Self::Boxed(Box::new(e))
    }
}
impl From<utils::ser::Error> for LayoutError {
    fn from(e: utils::ser::Error) -> Self {
        Self::Boxed(Box::new(e))
    }
}
impl<T> From<std::sync::PoisonError<T>> for LayoutError {
    fn from(_e: std::sync::PoisonError<T>) -> Self {
        Self::Str("poisoned lock".to_string())
    }
}

/// Emit a non-fatal warning to stderr.
/// Recoverable conditions (port-pitch overflow chief among them) warn and
/// proceed rather than abort.
pub(crate) fn warn(msg: impl Into<String>) {
    eprintln!("Warning: {}", msg.into());
}
