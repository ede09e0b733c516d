use std::ops::Add;

/// A type string with a same-width indicator line underneath it.
///
/// Compound types are assembled piecewise so the carets of an inner type end
/// up under the inner type's position in the outer one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Indicated {
    pub ty: String,
    pub indicator: String,
}

impl Indicated {
    /// Pads `indicator` with spaces to the width of `ty`.
    pub fn new(ty: impl Into<String>, indicator: impl Into<String>) -> Self {
        let ty = ty.into();
        let mut indicator = indicator.into();
        let width = ty.chars().count();
        let current = indicator.chars().count();
        if current < width {
            indicator.push_str(&" ".repeat(width - current));
        }
        Self { ty, indicator }
    }

    /// Text that is shown but not implicated.
    pub fn plain(ty: impl Into<String>) -> Self {
        Self::new(ty, "")
    }

    /// Text that is implicated as a whole.
    pub fn marked(ty: impl Into<String>) -> Self {
        let ty = ty.into();
        let carets = "^".repeat(ty.chars().count());
        Self::new(ty, carets)
    }

    pub fn join(separator: &str, parts: &[Indicated]) -> Self {
        let mut out = Indicated::plain("");
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                out = out + Indicated::plain(separator);
            }
            out = out + part.clone();
        }
        out
    }

    /// The indicator with trailing blanks removed, as rendered.
    pub fn trimmed_indicator(&self) -> &str {
        self.indicator.trim_end()
    }
}

impl Add for Indicated {
    type Output = Indicated;

    fn add(self, rhs: Indicated) -> Indicated {
        Indicated::new(self.ty + &rhs.ty, self.indicator + &rhs.indicator)
    }
}

/// Build `name[a, b, c]` with the member at `index` replaced by `inner`.
pub fn compound(name: &str, members: &[String], index: usize, inner: Indicated) -> Indicated {
    let parts: Vec<Indicated> = members
        .iter()
        .enumerate()
        .map(|(i, m)| {
            if i == index {
                inner.clone()
            } else {
                Indicated::plain(m.clone())
            }
        })
        .collect();
    Indicated::plain(format!("{name}[")) + Indicated::join(", ", &parts) + Indicated::plain("]")
}
