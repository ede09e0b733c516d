use std::fmt;

use serde::{Deserialize, Serialize};

use crate::frame::{Frame, ResponsibilityDirection};
use crate::indicator::Indicated;
use crate::location::Location;
use crate::source::SourceCache;

/// Line prefix for responsible locations. Editor integrations match on it.
pub const CAUSED_BY_PREFIX: &str = "caused by: ";
/// Line prefix for declaration locations. Editor integrations match on it.
pub const DECLARED_AT_PREFIX: &str = "declared at: ";

const DEFAULT_HEADER: &str = "got value of wrong type";

/// What kind of check-time violation a [`ContractError`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    TypeMismatch,
    NotAContainer,
    MissingMethod,
    ArityMismatch,
    ArgumentBinding,
    ConditionFailed,
}

impl ViolationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::TypeMismatch => "type_mismatch",
            ViolationKind::NotAContainer => "not_a_container",
            ViolationKind::MissingMethod => "missing_method",
            ViolationKind::ArityMismatch => "arity_mismatch",
            ViolationKind::ArgumentBinding => "argument_binding",
            ViolationKind::ConditionFailed => "condition_failed",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Knobs for [`ContractError::render_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub show_source: bool,
    /// `given:` values longer than this are cut and end in `...`.
    pub max_given_chars: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            show_source: true,
            max_given_chars: 200,
        }
    }
}

/// A check-time violation carrying its blame chain.
///
/// Frames are appended inner to outer as the error crosses checker
/// boundaries. Every builder method consumes and returns the error so that
/// execution contexts can enrich it without ever dropping it.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractError {
    pub kind: ViolationKind,
    /// `repr` of the rejected value, if there is one.
    pub given: Option<String>,
    pub expected: String,
    pub header: String,
    pub frames: Vec<Frame>,
    pub notes: Vec<String>,
    pub previous_chain: Option<Box<ContractError>>,
    pub direction: ResponsibilityDirection,
}

impl ContractError {
    pub fn new(given: Option<String>, expected: impl Into<String>) -> Self {
        Self {
            kind: ViolationKind::TypeMismatch,
            given,
            expected: expected.into(),
            header: String::new(),
            frames: Vec::new(),
            notes: Vec::new(),
            previous_chain: None,
            direction: ResponsibilityDirection::In,
        }
    }

    /// Append `frame`, stamped with the error's current direction.
    pub fn with_frame(mut self, mut frame: Frame) -> Self {
        frame.direction = Some(self.direction);
        self.frames.push(frame);
        self
    }

    pub fn with_previous_chain(mut self, previous: ContractError) -> Self {
        self.previous_chain = Some(Box::new(previous));
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_inverted_direction(mut self) -> Self {
        self.direction = self.direction.invert();
        self
    }

    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into();
        self
    }

    pub fn with_kind(mut self, kind: ViolationKind) -> Self {
        self.kind = kind;
        self
    }

    /// The type (and carets) the next enclosing frame should embed.
    pub fn next_type_and_indicator(&self) -> Indicated {
        match self.frames.last() {
            Some(frame) => Indicated::new(frame.declared_type.clone(), frame.indicator.clone()),
            None => Indicated::marked(self.expected.clone()),
        }
    }

    /// Distinct responsible locations whose frame matches the current direction.
    pub fn responsible_locations(&self) -> Vec<&Location> {
        let mut out: Vec<&Location> = Vec::new();
        for frame in &self.frames {
            if frame.direction != Some(self.direction) {
                continue;
            }
            if let Some(loc) = &frame.responsible {
                if !out.contains(&loc) {
                    out.push(loc);
                }
            }
        }
        out
    }

    /// Distinct declaration locations, inner first.
    pub fn declared_locations(&self) -> Vec<&Location> {
        let mut out: Vec<&Location> = Vec::new();
        for loc in self.frames.iter().filter_map(|f| f.declared.as_ref()) {
            if !out.contains(&loc) {
                out.push(loc);
            }
        }
        out
    }

    /// The location blamed for the violation: the innermost responsible
    /// location recorded in the current direction.
    pub fn blamed(&self) -> Option<&Location> {
        self.responsible_locations().into_iter().next()
    }

    /// The context type shown under `context:`, or `None` when it would only
    /// repeat `expected`.
    pub fn context(&self) -> Option<Indicated> {
        let next = self.next_type_and_indicator();
        if next.ty == self.expected {
            None
        } else {
            Some(next)
        }
    }

    pub fn render(&self) -> String {
        self.render_with(&RenderOptions::default(), None)
    }

    /// Render the multi-section message.
    ///
    /// Sections, in order: header, previous chain, notes, `given:`/`expected:`,
    /// `context:` with its carets, `declared at:` lines and `caused by:` lines.
    pub fn render_with(&self, opts: &RenderOptions, sources: Option<&SourceCache>) -> String {
        let mut out = String::new();

        let (pre_header, previous, post_header) = match &self.previous_chain {
            None => {
                let header = if self.header.is_empty() {
                    DEFAULT_HEADER
                } else {
                    self.header.as_str()
                };
                (header.to_string(), String::new(), String::new())
            }
            Some(prev) => (
                String::new(),
                prev.render_with(opts, sources).trim().to_string(),
                self.header.clone(),
            ),
        };
        for section in [pre_header, previous, post_header] {
            if !section.is_empty() {
                out.push_str(&section);
                out.push_str("\n\n");
            }
        }
        if !self.notes.is_empty() {
            out.push_str(&self.notes.join("\n"));
            out.push_str("\n\n");
        }

        if let Some(given) = &self.given {
            out.push_str("given:    ");
            out.push_str(&truncate(given, opts.max_given_chars));
            out.push('\n');
        }
        out.push_str("expected: ");
        if self.expected == "None" {
            out.push_str("None");
        } else {
            out.push_str("value of type ");
            out.push_str(&self.expected);
        }
        out.push_str("\n\n");

        if let Some(ctx) = self.context() {
            out.push_str("context: ");
            out.push_str(ctx.ty.trim_end());
            out.push('\n');
            let carets = ctx.trimmed_indicator();
            if !carets.is_empty() {
                out.push_str("         ");
                out.push_str(carets);
                out.push('\n');
            }
        }

        let show = |loc: &Location| -> String {
            match sources {
                Some(cache) if opts.show_source => cache.format_with_code(loc),
                _ => loc.to_string(),
            }
        };
        for loc in self.declared_locations() {
            out.push_str(DECLARED_AT_PREFIX);
            out.push_str(&show(loc));
            out.push('\n');
        }
        for loc in self.responsible_locations() {
            out.push_str(CAUSED_BY_PREFIX);
            out.push_str(&show(loc));
            out.push('\n');
        }
        out.trim_end().to_string()
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut cut: String = s.chars().take(max).collect();
    cut.push_str("...");
    cut
}

impl fmt::Display for ContractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl std::error::Error for ContractError {}

/// Build-time failure while compiling a checker from an annotation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind}{}", format_locations(.locations))]
pub struct BuildError {
    pub kind: BuildErrorKind,
    pub locations: Vec<Location>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BuildErrorKind {
    #[error("unsupported annotation: {0}")]
    UnsupportedAnnotation(String),

    #[error("{first} is in conflict with {second} in {union}. Types must be distinguishable inside a Union.")]
    AmbiguousUnion {
        first: String,
        second: String,
        union: String,
    },

    #[error("Missing annotation for argument '{param}' of method '{method}' in interface {interface}")]
    MissingInterfaceAnnotation {
        interface: String,
        method: String,
        param: String,
    },

    #[error("Missing annotation for argument '{param}' of function {function}\nPartial annotation are not supported.")]
    MissingAnnotation { function: String, param: String },

    #[error("{name} expects {expected} type argument(s), got {given}")]
    TypeArgumentCount {
        name: String,
        expected: usize,
        given: usize,
    },

    #[error("unresolved name '{0}'")]
    UnresolvedName(String),

    #[error("unsupported metadata in {0}")]
    UnsupportedMetadata(String),

    #[error("condition on {function} refers to unknown parameter '{param}'")]
    ConditionParameter { function: String, param: String },
}

fn format_locations(locations: &[Location]) -> String {
    if locations.is_empty() {
        return String::new();
    }
    let lines: Vec<String> = locations
        .iter()
        .map(|l| format!("{DECLARED_AT_PREFIX}{l}"))
        .collect();
    format!("\n\n{}", lines.join("\n"))
}

impl BuildError {
    pub fn new(kind: BuildErrorKind) -> Self {
        Self {
            kind,
            locations: Vec::new(),
        }
    }

    /// Attach a declaration location unless it is already recorded.
    pub fn with_location(mut self, location: Location) -> Self {
        if !self.locations.contains(&location) {
            self.locations.push(location);
        }
        self
    }
}

impl From<BuildErrorKind> for BuildError {
    fn from(kind: BuildErrorKind) -> Self {
        BuildError::new(kind)
    }
}
