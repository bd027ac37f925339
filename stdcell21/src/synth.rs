//!
//! # Stack Synthesis
//!
//! Walks a series transistor stack - or a paired n/p dual stack - and emits
//! the diffusion, gate, and poly rectangles for it, honoring overhang and
//! notch design rules and keeping the run minimal in width.
//!
//! Entering each transistor, the junction with the previous one falls into
//! one of three cases by effective width: same width (a plain spacer),
//! an upward notch (diffusion widens mid-run), or a downward notch
//! (diffusion narrows). Notches emit a second, short rectangle at the new
//! width immediately after the spacer. Contacts on the shared node raise
//! the spacer to the mid-stack via spacing where that is larger.
//!
//! Dual stacks advance both rows in lockstep: before each shared gate
//! column, a dry run ([locate_fet_edge]) computes where each row's own
//! rules would put the gate edge, and the row that would finish earlier is
//! padded by the difference, so both gates land at the same x-coordinate.
//!

// Local imports
use crate::geom::Int;
use crate::layout::Layout;
use crate::netlist::{DualStack, EdgeId, FetEdge, Netlist, NodeId, SeriesStack};
use crate::rules::{DiffRules, Tech};
use crate::{LayoutError, LayoutResult};
use tiles21::FetType;

/// Stack-boundary flags for the edge being emitted
#[derive(Debug, Clone, Copy, Default)]
struct EdgeFlags {
    /// First edge of its row
    left: bool,
    /// Last edge of its row
    right: bool,
}

///
/// # Diffusion-Region Accumulator
///
/// Corner coordinates (width = `urx - llx`), one box per polarity,
/// accumulated from the diffusion rectangles of a stack and later drawn
/// as the cell's virtual diffusion bounding boxes.
///
/// A box with `llx >= urx` or `lly >= ury` is unset.
///
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CornerBox {
    pub llx: Int,
    pub lly: Int,
    pub urx: Int,
    pub ury: Int,
}
impl CornerBox {
    pub fn is_unset(&self) -> bool {
        self.llx >= self.urx || self.lly >= self.ury
    }
    /// Width in grid units, zero when unset
    pub fn width(&self) -> usize {
        (self.urx - self.llx).max(0) as usize
    }
    /// Height in grid units, zero when unset
    pub fn height(&self) -> usize {
        (self.ury - self.lly).max(0) as usize
    }
    /// Fold the (unordered) corner pair `(x, y)`-`(rx, ry)` into the box
    fn update(&mut self, x: Int, y: Int, rx: Int, ry: Int) {
        if self.is_unset() {
            self.llx = x.min(rx);
            self.lly = y.min(ry);
            self.urx = x.max(rx);
            self.ury = y.max(ry);
        } else {
            self.llx = self.llx.min(x).min(rx);
            self.lly = self.lly.min(y).min(ry);
            self.urx = self.urx.max(x).max(rx);
            self.ury = self.ury.max(y).max(ry);
        }
    }
}

/// Per-stack n/p diffusion accumulator, threaded through the emit chain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StackBox {
    pub flavor: u8,
    pub n: CornerBox,
    pub p: CornerBox,
}
impl StackBox {
    fn update(&mut self, ftype: FetType, x: Int, y: Int, rx: Int, ry: Int) {
        match ftype {
            FetType::Pfet => self.p.update(x, y, rx, ry),
            FetType::Nfet => self.n.update(x, y, rx, ry),
        }
    }
}

/// Junction classification entering an edge:
/// 0 same width, +1 upward notch, -1 downward notch.
/// Returns the classification and the leading spacer width.
fn enter_spacing(
    tech: &Tech,
    nl: &Netlist,
    flags: EdgeFlags,
    prev: Option<(&FetEdge, usize)>,
    left: NodeId,
    e: &FetEdge,
    e_w: Int,
) -> LayoutResult<(i32, Int)> {
    let d = tech.diff(e.ftype, e.flavor)?;
    let f = tech.fet(e.ftype, e.flavor)?;
    let contact = nl.node(left).contact;

    let (kind, rect);
    if flags.left {
        kind = 0;
        rect = d.eff_overhang(e_w, contact);
    } else {
        let (prev, previdx) = prev.expect("malformed stack: junction with no previous edge");
        let prev_w = tech.eff_width(prev, previdx);
        if prev_w == e_w {
            kind = 0;
            let mut r = f.get_spacing(e_w);
            if contact {
                r = r.max(d.via_space_mid());
            }
            rect = r;
        } else if prev_w < e_w {
            kind = 1;
            rect = notch_spacer(d, contact, e_w);
        } else {
            kind = -1;
            rect = d.eff_overhang(e_w, false);
        }
    }
    check_positive(rect, e_w)?;
    Ok((kind, rect))
}

/// Notch spacing, raised to the mid-stack via clearance when a contact
/// sits on the shared node and would otherwise be crowded
fn notch_spacer(d: &DiffRules, contact: bool, e_w: Int) -> Int {
    let mut rect = d.notch_spacing();
    if contact && rect + d.eff_overhang(e_w, false) < d.via_space_mid() {
        rect = d.via_space_mid() - d.eff_overhang(e_w, false);
    }
    rect
}

/// The short follow-up rectangle a notch emits at the new width
fn notch_follow(d: &DiffRules, contact: bool, kind: i32, e_w: Int) -> LayoutResult<Int> {
    let rect = if kind < 0 {
        notch_spacer(d, contact, e_w)
    } else {
        d.eff_overhang(e_w, false)
    };
    check_positive(rect, e_w)?;
    Ok(rect)
}

fn check_positive(rect: Int, e_w: Int) -> LayoutResult<()> {
    if rect <= 0 {
        // Zero-or-negative spacing means a width model (fins, most
        // likely) this junction scheme does not support
        return Err(LayoutError::Rule(format!(
            "non-positive junction spacing {} at device width {}",
            rect, e_w
        )));
    }
    Ok(())
}

///
/// Dry run of [emit_rectangle]'s rule evaluation: the x-coordinate at which
/// edge `e`'s gate would start, without drawing anything.
///
fn locate_fet_edge(
    tech: &Tech,
    nl: &Netlist,
    mut dx: Int,
    flags: EdgeFlags,
    prev: Option<(&FetEdge, usize)>,
    left: NodeId,
    e: &FetEdge,
    eidx: usize,
) -> LayoutResult<Int> {
    let e_w = tech.eff_width(e, eidx);
    let d = tech.diff(e.ftype, e.flavor)?;
    let contact = nl.node(left).contact;

    let (kind, rect) = enter_spacing(tech, nl, flags, prev, left, e, e_w)?;
    dx += rect;
    if kind != 0 {
        dx += notch_follow(d, contact, kind, e_w)?;
    }
    Ok(dx)
}

///
/// Emit the rectangles for one transistor edge: the leading diffusion
/// spacer, any notch follow-up, the gate, its poly stubs, and - on the
/// row's right boundary - the closing diffusion overhang.
///
/// `yup` is +1 for rows growing upward from `dy`, -1 for rows growing
/// downward. `pad` widens the first rectangle it legally can (the follow-up
/// rectangle after a downward notch, the leading one otherwise), which is
/// how dual-row gate alignment takes effect. Returns the advanced cursor.
///
#[allow(clippy::too_many_arguments)]
fn emit_rectangle(
    layout: &mut Layout,
    tech: &Tech,
    nl: &Netlist,
    pad: Int,
    mut dx: Int,
    dy: Int,
    flags: EdgeFlags,
    prev: Option<(&FetEdge, usize)>,
    left: NodeId,
    e: &FetEdge,
    eidx: usize,
    yup: Int,
    b: &mut StackBox,
) -> LayoutResult<Int> {
    let e_w = tech.eff_width(e, eidx);
    let d = tech.diff(e.ftype, e.flavor)?;
    let p = &tech.poly;
    let contact = nl.node(left).contact;
    b.flavor = e.flavor;

    let prev_w = match prev {
        Some((pe, pi)) => tech.eff_width(pe, pi),
        None => 0,
    };
    let (kind, mut rect) = enter_spacing(tech, nl, flags, prev, left, e, e_w)?;

    // Alignment padding joins the first rectangle, unless a downward notch
    // defers it to the follow-up at the new width
    let (lead_pad, follow_pad) = if kind == -1 { (0, pad) } else { (pad, 0) };
    rect += lead_pad;

    // Leading diffusion: at the current width for a plain junction,
    // at the previous width across a notch
    let h = if kind == 0 { e_w } else { prev_w };
    let net = if contact { Some(left) } else { None };
    let y = if yup < 0 { dy - h } else { dy };
    layout.draw_diff(e.flavor, e.ftype, dx, y, rect as usize, h as usize, net)?;
    b.update(e.ftype, dx, dy, dx + rect, dy + yup * h);
    dx += rect;

    if kind != 0 {
        // The notch changed the run's width; emit the short rectangle at
        // the new width before the gate
        let mut rect = notch_follow(d, contact, kind, e_w)?;
        rect += follow_pad;
        let y = if yup < 0 { dy - e_w } else { dy };
        layout.draw_diff(e.flavor, e.ftype, dx, y, rect as usize, e_w as usize, None)?;
        b.update(e.ftype, dx, dy, dx + rect, dy + yup * e_w);
        dx += rect;
    }

    // The gate itself
    let y = if yup < 0 { dy - e_w } else { dy };
    layout.draw_fet(e.flavor, e.ftype, dx, y, e.l as usize, e_w as usize, None)?;

    // Poly stubs: gate-side carries the gate net; the far side widens
    // when this junction notched
    let poverhang = p.get_overhang(e.l);
    let mut uoverhang = poverhang;
    if kind != 0 {
        uoverhang = uoverhang.max(p.get_notch_overhang(e.l));
    }
    if yup < 0 {
        layout.draw_poly(dx, dy, e.l as usize, poverhang as usize, Some(e.gate))?;
        layout.draw_poly(
            dx,
            dy - (e_w + uoverhang),
            e.l as usize,
            uoverhang as usize,
            None,
        )?;
    } else {
        layout.draw_poly(dx, dy - poverhang, e.l as usize, poverhang as usize, Some(e.gate))?;
        layout.draw_poly(dx, dy + e_w, e.l as usize, uoverhang as usize, None)?;
    }
    dx += e.l;

    if flags.right {
        // Closing diffusion overhang past the last gate
        let right = e.other(left);
        let rect = d.eff_overhang(e_w, nl.node(right).contact);
        check_positive(rect, e_w)?;
        let y = if yup < 0 { dy - e_w } else { dy };
        layout.draw_diff(e.flavor, e.ftype, dx, y, rect as usize, e_w as usize, Some(right))?;
        b.update(e.ftype, dx, dy, dx + rect, dy + yup * e_w);
        dx += rect;
    }
    Ok(dx)
}

///
/// Synthesize a paired n/p dual stack into `layout`.
///
/// The p-row grows upward from half the opposite-diffusion spacing, the
/// n-row downward from the matching position below, and shared gate
/// columns are aligned by dry-run padding.
///
pub fn synth_dual(layout: &mut Layout, ds: &DualStack) -> LayoutResult<StackBox> {
    let tech_ptr = layout.tech();
    let tech = tech_ptr.read()?;
    let nl_ptr = layout.netlist();
    let nl = nl_ptr.read()?;

    let first = ds
        .pairs
        .first()
        .ok_or_else(|| LayoutError::msg("empty dual stack"))?;
    let flavor = match (first.n, first.p) {
        (Some(pe), _) | (None, Some(pe)) => nl.edge(pe.edge).flavor,
        (None, None) => return Err(LayoutError::msg("dual stack pair with no edges")),
    };
    let ndiff = tech.diff(FetType::Nfet, flavor)?;
    let pdiff = tech.diff(FetType::Pfet, flavor)?;
    let diffspace = ndiff.opp_diff_space;
    assert_eq!(
        diffspace, pdiff.opp_diff_space,
        "opposite-diffusion spacing must agree between n and p rules"
    );

    let yp = diffspace / 2;
    let yn = yp - diffspace;
    let mut xpos: Int = 0;
    let mut xpos_p: Int = 0;
    let mut b = StackBox::default();

    let mut firstn = true;
    let mut firstp = true;
    let mut prevn: Option<(EdgeId, usize)> = None;
    let mut prevp: Option<(EdgeId, usize)> = None;
    let mut leftn: Option<NodeId> = None;
    let mut leftp: Option<NodeId> = None;

    for (i, pair) in ds.pairs.iter().enumerate() {
        let mut flagsn = EdgeFlags::default();
        let mut flagsp = EdgeFlags::default();
        if firstn && pair.n.is_some() {
            flagsn.left = true;
            firstn = false;
        }
        if firstp && pair.p.is_some() {
            flagsp.left = true;
            firstp = false;
        }
        match ds.pairs.get(i + 1) {
            None => {
                flagsn.right = true;
                flagsp.right = true;
            }
            Some(next) => {
                // A row whose chain ends here closes its diffusion now
                if next.n.is_none() {
                    flagsn.right = true;
                }
                if next.p.is_none() {
                    flagsp.right = true;
                }
            }
        }

        // Advance each row's left node through its previous edge
        if pair.n.is_some() {
            leftn = Some(match leftn {
                None => ds.nleft,
                Some(cur) => {
                    let (pe, _) = prevn.expect("malformed dual stack: n row has no previous edge");
                    nl.edge(pe).other(cur)
                }
            });
        }
        if pair.p.is_some() {
            leftp = Some(match leftp {
                None => ds.pleft,
                Some(cur) => {
                    let (pe, _) = prevp.expect("malformed dual stack: p row has no previous edge");
                    nl.edge(pe).other(cur)
                }
            });
        }

        // Shared gate column: pad whichever row would finish earlier
        let mut padn: Int = 0;
        let mut padp: Int = 0;
        if let (Some(ne), Some(pe)) = (pair.n, pair.p) {
            let fposn = locate_fet_edge(
                &tech,
                &nl,
                xpos,
                flagsn,
                prevn.map(|(id, idx)| (nl.edge(id), idx)),
                leftn.expect("n row left node"),
                nl.edge(ne.edge),
                ne.idx,
            )?;
            let fposp = locate_fet_edge(
                &tech,
                &nl,
                xpos_p,
                flagsp,
                prevp.map(|(id, idx)| (nl.edge(id), idx)),
                leftp.expect("p row left node"),
                nl.edge(pe.edge),
                pe.idx,
            )?;
            if fposn > fposp {
                padp = fposn - fposp;
            } else {
                padn = fposp - fposn;
            }
        }

        if let Some(ne) = pair.n {
            xpos = emit_rectangle(
                layout,
                &tech,
                &nl,
                padn,
                xpos,
                yn,
                flagsn,
                prevn.map(|(id, idx)| (nl.edge(id), idx)),
                leftn.expect("n row left node"),
                nl.edge(ne.edge),
                ne.idx,
                -1,
                &mut b,
            )?;
            prevn = Some((ne.edge, ne.idx));
            if pair.p.is_none() {
                xpos_p = xpos;
            }
        }
        if let Some(pe) = pair.p {
            xpos_p = emit_rectangle(
                layout,
                &tech,
                &nl,
                padp,
                xpos_p,
                yp,
                flagsp,
                prevp.map(|(id, idx)| (nl.edge(id), idx)),
                leftp.expect("p row left node"),
                nl.edge(pe.edge),
                pe.idx,
                1,
                &mut b,
            )?;
            prevp = Some((pe.edge, pe.idx));
            if pair.n.is_none() {
                xpos = xpos_p;
            }
        }
    }
    Ok(b)
}

///
/// Synthesize a single-polarity series stack into `layout`,
/// growing upward from `y = 0`.
///
pub fn synth_series(layout: &mut Layout, st: &SeriesStack) -> LayoutResult<StackBox> {
    let mut b = StackBox::default();
    if st.elems.is_empty() {
        return Ok(b);
    }
    let tech_ptr = layout.tech();
    let tech = tech_ptr.read()?;
    let nl_ptr = layout.netlist();
    let nl = nl_ptr.read()?;

    let mut xpos: Int = 0;
    let ypos: Int = 0;
    let mut prev: Option<(EdgeId, usize)> = None;
    let mut left = st.left;

    for (i, el) in st.elems.iter().enumerate() {
        let flags = EdgeFlags {
            left: i == 0,
            right: i + 1 == st.elems.len(),
        };
        xpos = emit_rectangle(
            layout,
            &tech,
            &nl,
            0,
            xpos,
            ypos,
            flags,
            prev.map(|(id, idx)| (nl.edge(id), idx)),
            left,
            nl.edge(el.edge),
            el.idx,
            1,
            &mut b,
        )?;
        prev = Some((el.edge, el.idx));
        left = el.right;
    }
    Ok(b)
}
