//! Colors: the compressed alphabet the rest of the engine operates on.
//!
//! See `spec.md` §3 ("Color") and §4.1. A color is a small dense integer
//! identifying an equivalence class of code points that the pattern being
//! compiled cannot (yet) distinguish. Color `WHITE` is the universal class
//! every code point starts in.

/// A color id. Dense: at any point during compilation the in-use colors
/// occupy a contiguous prefix of the non-negative integers, plus a handful
/// of pseudocolors allocated for boundary anchors.
pub type Color = i32;

/// Impossible-color sentinel, used to terminate color-sorted arc lists in
/// the compacted NFA (`spec.md` §3, "CNFA").
pub const COLORLESS: Color = -1;

/// The initial, universal color every code point starts life in.
pub const WHITE: Color = 0;

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub(crate) struct ColorFlags: u8 {
        /// This color represents a boundary condition (BOS/EOS/BOL/EOL),
        /// not a class of real code points. Pseudocolors are never added to
        /// color chains and are excluded from `rainbow` enumerations.
        const PSEUDO = 1 << 0;
    }
}

/// Sentinel meaning "this color has no open subcolor right now."
pub(crate) const NOSUB: Color = COLORLESS;

/// Per-color bookkeeping (`spec.md` §3, "Colormap" bullet list).
#[derive(Debug, Clone)]
pub(crate) struct ColorDesc {
    /// How many code points currently map to this color. Invariant #1/§3:
    /// summing `nchrs` over all non-pseudo colors equals the size of the
    /// code point universe.
    pub nchrs: u32,
    /// An "open subcolor" being accumulated while parsing a bracket
    /// expression, or `NOSUB`.
    pub sub: Color,
    /// Every NFA arc currently carrying this color, as indices into the
    /// NFA arc arena (`crate::nfa::Nfa`). `okcolors` walks a parent's
    /// chain to retarget or duplicate arcs onto a newly promoted
    /// subcolor; entries referring to since-freed arcs are skipped by
    /// the reader rather than eagerly removed here.
    pub arcs: Vec<u32>,
    pub flags: ColorFlags,
}

impl ColorDesc {
    fn fresh() -> Self {
        ColorDesc { nchrs: 0, sub: NOSUB, arcs: Vec::new(), flags: ColorFlags::empty() }
    }

    pub fn is_pseudo(&self) -> bool {
        self.flags.contains(ColorFlags::PSEUDO)
    }

    pub fn is_live(&self) -> bool {
        self.nchrs > 0 || self.is_pseudo()
    }
}

/// Geometrically-growing vector of color descriptors (`spec.md` §4.1,
/// "Geometric regrowth"). Starts with inline capacity and doubles.
#[derive(Debug, Clone)]
pub(crate) struct ColorDescs {
    descs: Vec<ColorDesc>,
}

impl ColorDescs {
    const INITIAL_CAPACITY: usize = 10;

    pub fn new() -> Self {
        ColorDescs { descs: Vec::with_capacity(Self::INITIAL_CAPACITY) }
    }

    pub fn get(&self, co: Color) -> &ColorDesc {
        &self.descs[co as usize]
    }

    pub fn get_mut(&mut self, co: Color) -> &mut ColorDesc {
        &mut self.descs[co as usize]
    }

    pub fn len(&self) -> usize {
        self.descs.len()
    }

    /// Allocate a fresh color id, reusing a freed (dead, non-pseudo, no
    /// arcs, zero `nchrs`) slot if one exists, otherwise growing.
    pub fn alloc(&mut self) -> Color {
        if let Some(pos) = self.descs.iter().position(|d| !d.is_live()) {
            self.descs[pos] = ColorDesc::fresh();
            return pos as Color;
        }
        self.descs.push(ColorDesc::fresh());
        (self.descs.len() - 1) as Color
    }

    pub fn alloc_pseudo(&mut self) -> Color {
        let co = self.alloc();
        self.descs[co as usize].flags.insert(ColorFlags::PSEUDO);
        co
    }

    pub fn iter(&self) -> impl Iterator<Item = (Color, &ColorDesc)> {
        self.descs.iter().enumerate().map(|(i, d)| (i as Color, d))
    }
}

impl Default for ColorDescs {
    fn default() -> Self {
        Self::new()
    }
}
