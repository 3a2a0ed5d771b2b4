//! Style script interpreter.
//!
//! A style script is a line-oriented list of calls:
//!
//! ```text
//! w(64)
//! bgColor(FF8800)
//! rotate(15)
//! w(innerWidth)
//! ```
//!
//! Each recognized call renders to a style fragment. Later calls to the same directive replace
//! earlier ones. Unknown directives and malformed lines are skipped. A bare argument that names
//! a symbol known to the [`StyleContext`] is replaced by the symbol's value before rendering.

use std::collections::{BTreeMap, HashMap};

use crate::math::Vec2;

/// Every directive the interpreter understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DirectiveKind {
    Width,
    Color,
    BgColor,
    Gradient,
    Rotate,
    Scale,
    Translate,
    Image,
    BoxShadow,
    TextShadow,
    Opacity,
    Font,
    Tile,
}

impl DirectiveKind {
    pub const ALL: [DirectiveKind; 13] = [
        DirectiveKind::Width,
        DirectiveKind::Color,
        DirectiveKind::BgColor,
        DirectiveKind::Gradient,
        DirectiveKind::Rotate,
        DirectiveKind::Scale,
        DirectiveKind::Translate,
        DirectiveKind::Image,
        DirectiveKind::BoxShadow,
        DirectiveKind::TextShadow,
        DirectiveKind::Opacity,
        DirectiveKind::Font,
        DirectiveKind::Tile,
    ];

    /// Look up a directive by the name used in scripts.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Name of the directive as written in scripts.
    pub fn name(self) -> &'static str {
        match self {
            DirectiveKind::Width => "w",
            DirectiveKind::Color => "color",
            DirectiveKind::BgColor => "bgColor",
            DirectiveKind::Gradient => "gradient",
            DirectiveKind::Rotate => "rotate",
            DirectiveKind::Scale => "scale",
            DirectiveKind::Translate => "translate",
            DirectiveKind::Image => "img",
            DirectiveKind::BoxShadow => "boxShadow",
            DirectiveKind::TextShadow => "textShadow",
            DirectiveKind::Opacity => "opacity",
            DirectiveKind::Font => "font",
            DirectiveKind::Tile => "tile",
        }
    }

    fn min_args(self) -> usize {
        match self {
            DirectiveKind::Gradient => 3,
            DirectiveKind::Translate => 2,
            DirectiveKind::BoxShadow | DirectiveKind::TextShadow => 4,
            _ => 1,
        }
    }

    /// Render the fragment for already-resolved arguments.
    fn render(self, args: &[String]) -> Option<String> {
        if args.len() < self.min_args() {
            return None;
        }
        let fragment = match self {
            DirectiveKind::Width => format!("width: {};", length(&args[0])),
            DirectiveKind::Color => format!("color: {};", hex(&args[0])),
            DirectiveKind::BgColor => format!("background-color: {};", hex(&args[0])),
            DirectiveKind::Gradient => {
                let stops: Vec<String> = args[1..].iter().map(|c| hex(c)).collect();
                format!(
                    "background-image: linear-gradient({}, {});",
                    degrees(&args[0]),
                    stops.join(", ")
                )
            }
            DirectiveKind::Rotate => format!("transform: rotate({});", degrees(&args[0])),
            DirectiveKind::Scale => {
                let y = args.get(1).unwrap_or(&args[0]);
                format!("transform: scale({}, {});", args[0], y)
            }
            DirectiveKind::Translate => format!(
                "transform: translate({}, {});",
                length(&args[0]),
                length(&args[1])
            ),
            DirectiveKind::Image => format!("background-image: url('{}');", args.join(",")),
            DirectiveKind::BoxShadow => format!(
                "box-shadow: {} {} {} {};",
                length(&args[0]),
                length(&args[1]),
                length(&args[2]),
                hex(&args[3])
            ),
            DirectiveKind::TextShadow => format!(
                "text-shadow: {} {} {} {};",
                length(&args[0]),
                length(&args[1]),
                length(&args[2]),
                hex(&args[3])
            ),
            DirectiveKind::Opacity => format!("opacity: {};", args[0]),
            DirectiveKind::Font => {
                if args.len() > 1 {
                    format!("font: {} {};", length(&args[0]), args[1..].join(", "))
                } else {
                    format!("font: {};", length(&args[0]))
                }
            }
            DirectiveKind::Tile => {
                let h = args.get(1).unwrap_or(&args[0]);
                format!(
                    "background-repeat: repeat; background-size: {} {};",
                    length(&args[0]),
                    length(h)
                )
            }
        };
        Some(fragment)
    }
}

fn is_number(arg: &str) -> bool {
    arg.parse::<f64>().is_ok()
}

fn length(arg: &str) -> String {
    if is_number(arg) {
        format!("{arg}px")
    } else {
        arg.to_string()
    }
}

fn degrees(arg: &str) -> String {
    if is_number(arg) {
        format!("{arg}deg")
    } else {
        arg.to_string()
    }
}

fn hex(arg: &str) -> String {
    if arg.starts_with('#') {
        arg.to_string()
    } else {
        format!("#{arg}")
    }
}

fn is_symbol(arg: &str) -> bool {
    let mut chars = arg.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// One parsed script line.
#[derive(Clone, Debug, PartialEq)]
pub struct Directive {
    pub kind: DirectiveKind,
    pub args: Vec<String>,
}

/// Parse a script into directives, skipping blank, malformed and unknown lines.
pub fn parse(script: &str) -> Vec<Directive> {
    script.lines().filter_map(parse_line).collect()
}

fn parse_line(line: &str) -> Option<Directive> {
    let line = line.trim().trim_end_matches(';').trim_end();
    if line.is_empty() {
        return None;
    }
    let (name, rest) = match line.split_once('(') {
        Some(parts) => parts,
        None => {
            log::debug!("style script: skipping malformed line {line:?}");
            return None;
        }
    };
    let inner = match rest.strip_suffix(')') {
        Some(inner) => inner,
        None => {
            log::debug!("style script: skipping unterminated call {line:?}");
            return None;
        }
    };
    let name = name.trim();
    let kind = match DirectiveKind::from_name(name) {
        Some(kind) => kind,
        None => {
            log::debug!("style script: skipping unknown directive {name:?}");
            return None;
        }
    };
    let args = if inner.trim().is_empty() {
        Vec::new()
    } else {
        inner.split(',').map(|a| unquote(a.trim()).to_string()).collect()
    };
    Some(Directive { kind, args })
}

fn unquote(arg: &str) -> &str {
    for quote in ['\'', '"'] {
        if let Some(inner) = arg
            .strip_prefix(quote)
            .and_then(|a| a.strip_suffix(quote))
        {
            return inner;
        }
    }
    arg
}

/// Named values a script may reference by bare name.
pub trait StyleContext {
    fn resolve(&self, symbol: &str) -> Option<String>;
}

/// Context that knows no symbols.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoSymbols;

impl StyleContext for NoSymbols {
    fn resolve(&self, _symbol: &str) -> Option<String> {
        None
    }
}

impl StyleContext for HashMap<String, String> {
    fn resolve(&self, symbol: &str) -> Option<String> {
        self.get(symbol).cloned()
    }
}

/// Exposes the container size as `innerWidth` / `innerHeight`.
#[derive(Clone, Copy, Debug)]
pub struct ViewportSymbols {
    pub size: Vec2,
}

impl StyleContext for ViewportSymbols {
    fn resolve(&self, symbol: &str) -> Option<String> {
        match symbol {
            "innerWidth" => Some(self.size.x.to_string()),
            "innerHeight" => Some(self.size.y.to_string()),
            _ => None,
        }
    }
}

/// Output of the interpreter: one rendered fragment per directive kind.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StyleDirectiveSet {
    directives: BTreeMap<DirectiveKind, String>,
}

impl StyleDirectiveSet {
    pub fn get(&self, kind: DirectiveKind) -> Option<&str> {
        self.directives.get(&kind).map(String::as_str)
    }

    /// Look up a fragment by script name (`"w"`, `"bgColor"`...).
    pub fn get_by_name(&self, name: &str) -> Option<&str> {
        DirectiveKind::from_name(name).and_then(|kind| self.get(kind))
    }

    pub fn len(&self) -> usize {
        self.directives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DirectiveKind, &str)> {
        self.directives.iter().map(|(k, v)| (*k, v.as_str()))
    }

    /// All fragments joined into a single style text blob.
    pub fn to_style_text(&self) -> String {
        self.directives.values().map(String::as_str).collect()
    }
}

/// Resolve arguments and render parsed directives.
pub fn evaluate(directives: &[Directive], ctx: &dyn StyleContext) -> StyleDirectiveSet {
    let mut set = StyleDirectiveSet::default();
    for directive in directives {
        let args: Vec<String> = directive
            .args
            .iter()
            .map(|arg| {
                if is_symbol(arg) {
                    ctx.resolve(arg).unwrap_or_else(|| arg.clone())
                } else {
                    arg.clone()
                }
            })
            .collect();
        match directive.kind.render(&args) {
            Some(fragment) => {
                set.directives.insert(directive.kind, fragment);
            }
            None => log::debug!(
                "style script: {}() needs {} argument(s), got {}",
                directive.kind.name(),
                directive.kind.min_args(),
                args.len()
            ),
        }
    }
    set
}

/// Parse and evaluate a script in one go.
pub fn compile(script: &str, ctx: &dyn StyleContext) -> StyleDirectiveSet {
    evaluate(&parse(script), ctx)
}
