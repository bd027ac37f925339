//!
//! # Unit Tests
//!

use super::compose::{alignment, Alignment, Composite, Mirror, Side};
use super::geom::{Int, Rect, TransformMat};
use super::layer::LayerId;
use super::netlist::{
    CellStacks, DualStack, EdgeId, FetEdge, GatePair, Netlist, Node, NodeId, PairEdge, Port,
    Process, SeriesStack, StackElem,
};
use super::pass::SynthPass;
use super::rules::{
    snap_to, DiffRulesBuilder, FetRulesBuilder, PolyRulesBuilder, RoutingRulesBuilder, RuleTable,
    Tech, TechBuilder,
};
use super::synth::{synth_dual, synth_series};
use super::utils::{Ptr, SerializationFormat};
use tiles21::{FetType, TileAttr};

/// # Sample Technologies
/// Namespace for commonly re-used rule sets for testing.
pub struct SampleTech;

impl SampleTech {
    /// Diffusion rules with the given plain overhang
    fn diff(name: &str, overhang: Int) -> super::rules::DiffRules {
        DiffRulesBuilder::default()
            .name(name)
            .min_width(4 as Int)
            .min_spacing(3 as Int)
            .overhang(RuleTable::flat(overhang))
            .cont_overhang(RuleTable::flat(overhang))
            .notch_spacing(4 as Int)
            .via_space_mid(5 as Int)
            .opp_diff_space(8 as Int)
            .build()
            .unwrap()
    }
    fn fet(name: &str) -> super::rules::FetRules {
        FetRulesBuilder::default()
            .name(name)
            .min_width(2 as Int)
            .spacing(RuleTable::flat(2))
            .build()
            .unwrap()
    }
    fn metal(name: &str, pitch: Int, min_width: Int) -> super::rules::RoutingRules {
        RoutingRulesBuilder::default()
            .name(name)
            .pitch(pitch)
            .min_width(min_width)
            .min_spacing(min_width)
            .build()
            .unwrap()
    }
    /// The spacing constants most tests use:
    /// overhang 3, gate spacing 2, notch spacing 4, mid-stack via space 5.
    pub fn pdka() -> Tech {
        TechBuilder::default()
            .name("pdka")
            .scale(10 as Int)
            .min_width(4 as Int)
            .poly(
                PolyRulesBuilder::default()
                    .name("poly")
                    .min_spacing(2 as Int)
                    .overhang(RuleTable::flat(2))
                    .notch_overhang(RuleTable::flat(3))
                    .build()
                    .unwrap(),
            )
            .ndiff(vec![Self::diff("ndiff", 3)])
            .pdiff(vec![Self::diff("pdiff", 3)])
            .nfet(vec![Self::fet("nfet")])
            .pfet(vec![Self::fet("pfet")])
            .metals(vec![
                Self::metal("m1", 10, 4),
                Self::metal("m2", 5, 4),
                Self::metal("m3", 12, 6),
            ])
            .build()
            .unwrap()
    }
    /// Same, with asymmetric n/p diffusion overhangs (12 and 9)
    pub fn pdkb() -> Tech {
        let mut t = Self::pdka();
        t.name = "pdkb".to_string();
        t.ndiff[0].overhang = RuleTable::flat(12);
        t.ndiff[0].cont_overhang = RuleTable::flat(12);
        t.pdiff[0].overhang = RuleTable::flat(9);
        t.pdiff[0].cont_overhang = RuleTable::flat(9);
        t
    }
}

/// A two-nFET series chain: `a -[e0]- mid -[e1]- z`, gates `g0`, `g1`.
/// Returns the netlist and its stack decomposition.
fn two_nfet_chain(w0: Int, w1: Int, mid_contact: bool) -> (Ptr<Netlist>, SeriesStack) {
    let nodes = vec![
        Node {
            name: "a".into(),
            contact: false,
        },
        Node {
            name: "mid".into(),
            contact: mid_contact,
        },
        Node {
            name: "z".into(),
            contact: false,
        },
        Node {
            name: "g0".into(),
            contact: false,
        },
        Node {
            name: "g1".into(),
            contact: false,
        },
        Node {
            name: "vdd".into(),
            contact: false,
        },
        Node {
            name: "gnd".into(),
            contact: false,
        },
    ];
    let edges = vec![
        FetEdge {
            ftype: FetType::Nfet,
            flavor: 0,
            w: w0,
            l: 4,
            gate: NodeId(3),
            a: NodeId(0),
            b: NodeId(1),
        },
        FetEdge {
            ftype: FetType::Nfet,
            flavor: 0,
            w: w1,
            l: 4,
            gate: NodeId(4),
            a: NodeId(1),
            b: NodeId(2),
        },
    ];
    let nl = Netlist {
        name: "chain2".into(),
        nodes,
        edges,
        vdd: NodeId(5),
        gnd: NodeId(6),
        ports: vec![
            Port {
                node: NodeId(3),
                input: true,
                omit: false,
            },
            Port {
                node: NodeId(4),
                input: true,
                omit: false,
            },
            Port {
                node: NodeId(2),
                input: false,
                omit: false,
            },
        ],
    };
    let stack = SeriesStack {
        left: NodeId(0),
        elems: vec![
            StackElem {
                edge: EdgeId(0),
                idx: 0,
                right: NodeId(1),
            },
            StackElem {
                edge: EdgeId(1),
                idx: 0,
                right: NodeId(2),
            },
        ],
    };
    (Ptr::new(nl), stack)
}

/// A one-gate-column dual stack (an inverter's worth of geometry)
fn inverter() -> (Ptr<Netlist>, DualStack) {
    let nodes = vec![
        Node {
            name: "vdd".into(),
            contact: false,
        },
        Node {
            name: "gnd".into(),
            contact: false,
        },
        Node {
            name: "in".into(),
            contact: false,
        },
        Node {
            name: "out".into(),
            contact: false,
        },
    ];
    let edges = vec![
        FetEdge {
            ftype: FetType::Nfet,
            flavor: 0,
            w: 10,
            l: 4,
            gate: NodeId(2),
            a: NodeId(1),
            b: NodeId(3),
        },
        FetEdge {
            ftype: FetType::Pfet,
            flavor: 0,
            w: 10,
            l: 4,
            gate: NodeId(2),
            a: NodeId(0),
            b: NodeId(3),
        },
    ];
    let nl = Netlist {
        name: "inv".into(),
        nodes,
        edges,
        vdd: NodeId(0),
        gnd: NodeId(1),
        ports: vec![
            Port {
                node: NodeId(2),
                input: true,
                omit: false,
            },
            Port {
                node: NodeId(3),
                input: false,
                omit: false,
            },
        ],
    };
    let ds = DualStack {
        nleft: NodeId(1),
        pleft: NodeId(0),
        pairs: vec![GatePair {
            n: Some(PairEdge {
                edge: EdgeId(0),
                idx: 0,
            }),
            p: Some(PairEdge {
                edge: EdgeId(1),
                idx: 0,
            }),
        }],
    };
    (Ptr::new(nl), ds)
}

fn new_layout(tech: Tech, nl: &Ptr<Netlist>) -> super::layout::Layout {
    super::layout::Layout::new(Ptr::new(tech), nl.clone()).unwrap()
}

#[test]
fn same_width_junction() {
    // Two same-width gates: overhang 3, gate 4, spacer 2, gate 4,
    // overhang 3 - a 16-unit diffusion run with no notch rectangles.
    let (nl, stack) = two_nfet_chain(10, 10, false);
    let mut l = new_layout(SampleTech::pdka(), &nl);
    let b = synth_series(&mut l, &stack).unwrap();
    assert_eq!(b.flavor, 0);
    assert_eq!((b.n.llx, b.n.urx), (0, 16));
    assert!(b.p.is_unset());

    // Exactly three diffusion rectangles: the two overhangs and one spacer
    let mut widths: Vec<Int> = l
        .search_attr(TileAttr::diff(0, FetType::Nfet))
        .iter()
        .map(|ft| ft.rect.width())
        .collect();
    widths.sort();
    assert_eq!(widths, vec![2, 3, 3]);
    // Gates land right after each spacer
    let mut gates: Vec<Int> = l
        .search_attr(TileAttr::fet(0, FetType::Nfet))
        .iter()
        .map(|ft| ft.rect.x0)
        .collect();
    gates.sort();
    assert_eq!(gates, vec![3, 9]);
}

#[test]
fn notch_junction_with_contact() {
    // Widths 10 then 6, contact on the shared node. The downward notch
    // emits the old-width overhang (3) and then the notch follow-up at
    // the new width (4): seven units of junction, not four.
    let (nl, stack) = two_nfet_chain(10, 6, true);
    let mut l = new_layout(SampleTech::pdka(), &nl);
    let b = synth_series(&mut l, &stack).unwrap();

    let mut gates: Vec<Int> = l
        .search_attr(TileAttr::fet(0, FetType::Nfet))
        .iter()
        .map(|ft| ft.rect.x0)
        .collect();
    gates.sort();
    // gate0 after the 3-unit left overhang; gate1 after 3 + 4 more
    assert_eq!(gates, vec![3, 14]);
    // The full run: 3 + 4 + 3 + 4 + 4 + 3 = 21
    assert_eq!((b.n.llx, b.n.urx), (0, 21));
    // The follow-up rectangle sits at the narrower width
    let narrow: Vec<_> = l
        .search_attr(TileAttr::diff(0, FetType::Nfet))
        .into_iter()
        .filter(|ft| ft.rect.height() == 6 && ft.rect.width() == 4)
        .collect();
    assert_eq!(narrow.len(), 1);
    assert_eq!(narrow[0].rect.x0, 10);
}

#[test]
fn rule_violation_is_fatal() {
    // A zero overhang is an unsupported width model
    let mut tech = SampleTech::pdka();
    tech.ndiff[0].overhang = RuleTable::flat(0);
    tech.ndiff[0].cont_overhang = RuleTable::flat(0);
    let (nl, stack) = two_nfet_chain(10, 10, false);
    let mut l = new_layout(tech, &nl);
    let err = synth_series(&mut l, &stack);
    assert!(matches!(err, Err(super::LayoutError::Rule(_))));
}

#[test]
fn dual_stack_gate_alignment() {
    // n-row needs x=12 to its first gate, p-row x=9: the p-row must be
    // padded by exactly 3 so both gates start at x=12.
    let (nl, ds) = inverter();
    let mut l = new_layout(SampleTech::pdkb(), &nl);
    let b = synth_dual(&mut l, &ds).unwrap();

    let ngates = l.search_attr(TileAttr::fet(0, FetType::Nfet));
    let pgates = l.search_attr(TileAttr::fet(0, FetType::Pfet));
    assert_eq!(ngates.len(), 1);
    assert_eq!(pgates.len(), 1);
    assert_eq!(ngates[0].rect.x0, 12);
    assert_eq!(pgates[0].rect.x0, 12);
    // Rows sit on opposite sides of the baseline, a diffusion-space apart
    assert!(b.n.ury <= b.p.lly);
    assert_eq!(b.p.lly - b.n.ury, 8);
}

#[test]
fn fold_widths() {
    let mut tech = SampleTech::pdka();
    tech.fold_n_width = 6;
    let e = FetEdge {
        ftype: FetType::Nfet,
        flavor: 0,
        w: 10,
        l: 4,
        gate: NodeId(0),
        a: NodeId(1),
        b: NodeId(2),
    };
    assert_eq!(tech.eff_width(&e, 0), 6);
    // Remainder of 4 meets the minimum exactly
    assert_eq!(tech.eff_width(&e, 1), 4);
    // No folding configured for pFETs
    let p = FetEdge {
        ftype: FetType::Pfet,
        ..e
    };
    assert_eq!(tech.eff_width(&p, 0), 10);
}

#[test]
fn rule_table_bins() {
    let t = RuleTable {
        value: 2,
        bins: vec![(10, 3), (50, 5)],
    };
    assert_eq!(t.at(4), 2);
    assert_eq!(t.at(10), 3);
    assert_eq!(t.at(49), 3);
    assert_eq!(t.at(120), 5);
}

#[test]
fn tech_serde_round_trip() {
    let tech = SampleTech::pdka();
    let s = SerializationFormat::Json.to_string(&tech).unwrap();
    let back: Tech = SerializationFormat::Json.from_str(&s).unwrap();
    assert_eq!(tech, back);
}

#[test]
fn transform_composition() {
    let t = TransformMat::identity().rotate90().translate(5, 7);
    assert_eq!(t.apply(2, 3), (2, 9));
    let inv = t.inverse();
    assert_eq!(inv.apply(2, 9), (2, 3));
    // then() applies left-to-right
    let m = TransformMat::identity().mirror_lr();
    let c = m.then(&t);
    assert_eq!(c.apply(2, 3), t.apply(-2, 3));
    // Rect transforms renormalize corners
    let r = Rect::new(1, 2, 4, 6);
    let mr = m.apply_rect(&r);
    assert_eq!(mr, Rect::new(-4, 2, -1, 6));
}

#[test]
fn composite_placement() {
    let mut h = Composite::horiz();
    h.push(Composite::placeholder(Rect::new(0, 0, 9, 9))).unwrap();
    h.append(Composite::placeholder(Rect::new(0, 0, 4, 19)), 5, Mirror::None)
        .unwrap();
    // First child at [0,9], then a 5-gap, then the second's 5 columns
    assert_eq!(h.bbox(), Rect::new(0, 0, 19, 19));

    let mut v = Composite::vert();
    v.push(Composite::placeholder(Rect::new(0, 0, 9, 9))).unwrap();
    v.append(Composite::placeholder(Rect::new(0, 0, 9, 4)), 3, Mirror::None)
        .unwrap();
    assert_eq!(v.bbox(), Rect::new(0, 0, 9, 17));

    let mut o = Composite::overlay();
    o.push(Composite::placeholder(Rect::new(-5, -5, 4, 4))).unwrap();
    o.push(Composite::placeholder(Rect::new(0, 0, 9, 2))).unwrap();
    assert_eq!(o.bbox(), Rect::new(-5, -5, 9, 4));

    // Mirroring flips a child in place; the slot width is unchanged
    let mut hm = Composite::horiz();
    hm.append(Composite::placeholder(Rect::new(0, 0, 9, 9)), 0, Mirror::LeftRight)
        .unwrap();
    assert_eq!(hm.bbox(), Rect::new(0, 0, 9, 9));
}

#[test]
fn composite_del_bbox() {
    let mut h = Composite::horiz();
    h.push(Composite::placeholder(Rect::new(0, 0, 9, 9))).unwrap();
    let h = h.del_bbox().unwrap();
    let mut h = h;
    assert!(h.bbox().is_empty());
    // A placeholder itself deletes to nothing
    assert!(Composite::placeholder(Rect::new(0, 0, 1, 1))
        .del_bbox()
        .is_none());
    // Appending to a leaf is illegal
    let mut leaf = Composite::placeholder(Rect::new(0, 0, 1, 1));
    assert!(leaf.push(Composite::horiz()).is_err());
}

#[test]
fn composite_search_through_mirror() {
    let (nl, stack) = two_nfet_chain(10, 10, true);
    let mut l = new_layout(SampleTech::pdka(), &nl);
    synth_series(&mut l, &stack).unwrap();
    let width = l.bbox().width();

    let mut h = Composite::horiz();
    h.append(Composite::from_layout(l), 0, Mirror::LeftRight)
        .unwrap();
    // The contacted middle node's diffusion, located through the mirror
    let matches = h.search(NodeId(1).net());
    assert!(!matches.is_empty());
    let bb = Composite::search_bbox(&matches);
    assert!(!bb.is_empty());
    // Everything must land inside the mirrored cell's frame
    let cell = h.bbox();
    assert!(cell.x0 <= bb.x0 && bb.x1 <= cell.x1);
    assert_eq!(cell.width(), width);
}

#[test]
fn edge_alignment() {
    let (nl, stack) = two_nfet_chain(10, 10, false);
    let mut a = Composite::from_layout({
        let mut l = new_layout(SampleTech::pdka(), &nl);
        synth_series(&mut l, &stack).unwrap();
        l
    });
    let mut b = Composite::from_layout({
        let mut l = new_layout(SampleTech::pdka(), &nl);
        synth_series(&mut l, &stack).unwrap();
        l
    });
    let ea = a.edge(Side::Right);
    let eb = b.edge(Side::Left);
    assert!(!ea.mats.is_empty());
    // Identical cells: abutting at zero offset keeps the runs in contact
    match alignment(&ea, &eb) {
        Alignment::Range(d1, d2) => {
            assert!(d1 <= 0 && 0 <= d2);
        }
        other => panic!("expected a legal range, got {:?}", other),
    }
    // Featureless edges abut anywhere
    let empty = super::compose::EdgeAttrib::default();
    assert_eq!(alignment(&empty, &empty), Alignment::Any);
    // Mismatched record counts forbid abutment
    assert_eq!(alignment(&ea, &empty), Alignment::Forbidden);
}

#[test]
fn pin_stride_selection() {
    // Edge span 100, pitch 5, six ports: stride 3 fits (5 + 90 <= 100),
    // stride 4 does not.
    assert_eq!(super::pass::stride(6, 5, 100, "cell", "input"), 3);
    assert_eq!(super::pass::stride(1, 5, 100, "cell", "input"), 19);
    // Overflow clamps to one
    assert_eq!(super::pass::stride(40, 5, 100, "cell", "input"), 1);
    assert_eq!(super::pass::stride(0, 5, 100, "cell", "input"), 1);
}

#[test]
fn via_connectivity() {
    let (nl, _) = two_nfet_chain(10, 10, false);
    let mut l = new_layout(SampleTech::pdka(), &nl);
    l.draw_metal(0, 0, 0, 6, 4, Some(NodeId(0))).unwrap();
    l.draw_metal(1, 0, 0, 4, 6, Some(NodeId(0))).unwrap();
    l.draw_via(1, 0, 0, 4, 4, Some(NodeId(0))).unwrap();
    let m1 = Rect::new(0, 0, 5, 3);
    let m2 = Rect::new(0, 0, 3, 5);
    let far = Rect::new(50, 50, 55, 55);
    assert!(l.via_connected(1, &m1, &m2));
    assert!(!l.via_connected(1, &m1, &far));
    // No via drawn between base and metal1
    assert!(!l.via_connected(0, &m1, &m2));
}

fn inverter_process() -> (Ptr<Process>, Ptr<Netlist>) {
    let (nl, ds) = inverter();
    let stacks = CellStacks {
        dual: vec![ds],
        nstacks: vec![],
        pstacks: vec![],
    };
    (
        Ptr::new(Process::new("inv", nl.clone(), stacks)),
        nl,
    )
}

#[test]
fn pass_memoizes_by_identity() {
    let (child, _) = inverter_process();
    let parent = Ptr::new(Process {
        name: "top".into(),
        instances: vec![child.clone(), child.clone()],
        netlist: None,
        stacks: None,
    });
    let mut pass = SynthPass::new(Ptr::new(SampleTech::pdka()));
    pass.run(&[parent.clone()]).unwrap();
    // One synthesis for the child; the parent has no stacks of its own
    assert_eq!(pass.synth_invocations(), 1);
    assert!(pass.layout(&parent).is_none());
    let first = pass.layout(&child).unwrap();
    // Both instantiation sites were counted against the shared composite
    assert_eq!(first.read().unwrap().get_count(), 2);

    // Re-running changes nothing and returns the identical composite
    pass.run(&[parent]).unwrap();
    assert_eq!(pass.synth_invocations(), 1);
    let second = pass.layout(&child).unwrap();
    assert!(first == second);
}

#[test]
fn rect_dump_round_trip() {
    let (child, nl) = inverter_process();
    let mut pass = SynthPass::new(Ptr::new(SampleTech::pdka()));
    pass.run(&[child.clone()]).unwrap();
    let blob = pass.layout(&child).unwrap();
    let mut blob = blob.write().unwrap();

    let mut dump = Vec::new();
    blob.print_rect(&mut dump, None).unwrap();
    let dump = String::from_utf8(dump).unwrap();

    let restored = super::layout::Layout::read_rect(
        &dump,
        Ptr::new(SampleTech::pdka()),
        nl,
    )
    .unwrap();
    let mut restored = restored;
    assert_eq!(blob.bbox(), restored.bbox());
    assert_eq!(blob.bloat_bbox(), restored.bloat_bbox());

    // The attribute population survives too
    let diff_attr = TileAttr::diff(0, FetType::Nfet);
    let mut original_diff = Vec::new();
    for m in blob.search_attr(diff_attr) {
        for ft in m.tiles {
            original_diff.push(m.transform.apply_rect(&ft.rect));
        }
    }
    let restored_diff: Vec<Rect> = restored
        .search_attr(diff_attr)
        .iter()
        .map(|ft| ft.rect)
        .collect();
    let area = |v: &[Rect]| -> Int { v.iter().map(|r| r.width() * r.height()).sum() };
    assert!(!restored_diff.is_empty());
    assert_eq!(area(&original_diff), area(&restored_diff));
}

#[test]
fn rect_cache_skips_synthesis() {
    let dir = tempfile::tempdir().unwrap();
    let (child, _) = inverter_process();

    let mut pass =
        SynthPass::new(Ptr::new(SampleTech::pdka())).with_rect_dir(dir.path());
    pass.run(&[child.clone()]).unwrap();
    assert_eq!(pass.synth_invocations(), 1);
    assert!(pass.emit_rect(&child).unwrap());
    assert!(pass.have_rect(&child).unwrap());
    let bbox = pass.layout(&child).unwrap().write().unwrap().bbox();

    // A fresh pass over the same hierarchy reads the dump back instead
    let mut pass2 =
        SynthPass::new(Ptr::new(SampleTech::pdka())).with_rect_dir(dir.path());
    pass2.run(&[child.clone()]).unwrap();
    assert_eq!(pass2.synth_invocations(), 0);
    let blob = pass2.layout(&child).unwrap();
    let mut blob = blob.write().unwrap();
    assert!(blob.was_read());
    assert_eq!(blob.bbox(), bbox);
}

#[test]
fn missing_geometry_is_not_an_error() {
    let empty = Ptr::new(Process {
        name: "empty".into(),
        instances: vec![],
        netlist: None,
        stacks: None,
    });
    let mut pass = SynthPass::new(Ptr::new(SampleTech::pdka()));
    pass.run(&[empty.clone()]).unwrap();
    assert!(pass.layout(&empty).is_none());
    // And nothing to emit, reported as false rather than a failure
    let mut out = Vec::new();
    assert!(!pass.emit_lef(&mut out, &empty).unwrap());
    assert!(out.is_empty());
}

#[test]
fn pin_overlay_and_marking() {
    let (child, nl) = inverter_process();
    let mut pass = SynthPass::new(Ptr::new(SampleTech::pdka()));
    pass.run(&[child.clone()]).unwrap();
    let blob = pass.layout(&child).unwrap();
    let mut blob = blob.write().unwrap();

    let nl = nl.read().unwrap();
    for port in nl.ports.iter() {
        let matches = blob.search(port.node.net());
        let pins: Vec<_> = matches
            .iter()
            .filter(|m| m.layer == LayerId::Metal(1))
            .flat_map(|m| m.tiles.iter())
            .filter(|ft| ft.attr.is_pin())
            .collect();
        assert_eq!(pins.len(), 1, "port {} should have one pin", port.node.0);
        assert_eq!(pins[0].attr.is_output(), !port.input);
    }
}

#[test]
fn lef_macro_structure() {
    let (child, _) = inverter_process();
    let mut pass = SynthPass::new(Ptr::new(SampleTech::pdka()));
    pass.run(&[child.clone()]).unwrap();

    let mut out = Vec::new();
    assert!(pass.emit_lef(&mut out, &child).unwrap());
    let lef = String::from_utf8(out).unwrap();

    let expected_order = [
        "MACRO inv",
        "CLASS CORE ;",
        "ORIGIN 0.000000 0.000000 ;",
        "SIZE ",
        "SYMMETRY X Y ;",
        "SITE CoreSite ;",
        "PIN in",
        "DIRECTION INPUT ;",
        "USE SIGNAL ;",
        "PORT",
        "LAYER m2 ;",
        "RECT ",
        "END in",
        "PIN out",
        "DIRECTION OUTPUT ;",
        "END out",
        "END inv",
    ];
    let mut pos = 0;
    for pat in expected_order.iter() {
        let found = lef[pos..]
            .find(pat)
            .unwrap_or_else(|| panic!("missing or misordered: {:?}", pat));
        pos += found;
    }
    // The size snaps to the routing pitches
    let size_line = lef
        .lines()
        .find(|l| l.trim_start().starts_with("SIZE"))
        .unwrap();
    assert!(size_line.contains("BY"));
}

#[test]
fn lef_header_structure() {
    let (child, _) = inverter_process();
    let mut pass = SynthPass::new(Ptr::new(SampleTech::pdka()));
    pass.run(&[child]).unwrap();
    let mut out = Vec::new();
    pass.emit_lef_header(&mut out).unwrap();
    let lef = String::from_utf8(out).unwrap();
    assert!(lef.starts_with("VERSION 5.8 ;"));
    assert!(lef.contains("DATABASE MICRONS 1000 ;"));
    assert!(lef.contains("SITE CoreSite"));
    assert!(lef.contains("END CoreSite"));
}

#[test]
fn snap_helpers() {
    assert_eq!(snap_to(93, 5), 95);
    assert_eq!(snap_to(95, 5), 95);
    let (child, _) = inverter_process();
    let mut pass = SynthPass::new(Ptr::new(SampleTech::pdka()));
    pass.run(&[child]).unwrap();
    // x aligns to the metal2 pitch (5), y to the metal1 pitch (10)
    assert_eq!(pass.snap_up_x(93).unwrap(), 95);
    assert_eq!(pass.snap_dn_x(93).unwrap(), 90);
    assert_eq!(pass.snap_up_y(93).unwrap(), 100);
    assert_eq!(pass.snap_dn_y(93).unwrap(), 90);
    let stats = pass.stats().unwrap();
    assert_eq!(stats.cells, 1);
    assert!(stats.stdcell_area > 0.0);
    assert!(stats.max_height > 0);
}
