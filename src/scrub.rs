//! Markup Scrubbing - XML-Mode Pruning
//!
//! The sanitizer is a capability, not a rule set. `SvgScrubber` probes the
//! document as XML and hands well-formed markup to an ammonia allow-list
//! tuned for SVG. Malformed markup gets one repair attempt (unterminated end
//! tags, unquoted attribute values); whatever still fails the probe is
//! emptied down to its root element.

use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::LazyLock;

use ammonia::{Builder, UrlRelative};
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;

// `</script <path ...>`: the end tag runs into the next start tag
static UNTERMINATED_END_TAG: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"</([A-Za-z_][\w:.-]*)\s+<").expect("Invalid end tag regex")
});
// `onload=alert&#x28;1&#x29 `: a bare value with no `=` or markup in it
static UNQUOTED_ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r#"(\s[A-Za-z_][\w:.-]*)=([^\s"'=<>`]+)(\s|/?>)"#)
        .expect("Invalid attribute regex")
});
static BLANK_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r">\s+<").expect("Invalid blank text regex")
});

const DEFAULT_ROOT: &str = "svg";

/// Elements kept by the pruner. Names use the case html5ever gives SVG
/// elements after foreign-content adjustment.
const SVG_TAGS: &[&str] = &[
    "svg", "g", "defs", "symbol", "use", "title", "desc", "metadata",
    "path", "rect", "circle", "ellipse", "line", "polyline", "polygon",
    "text", "tspan", "textPath",
    "linearGradient", "radialGradient", "stop", "pattern",
    "clipPath", "mask", "marker", "filter", "image",
    "feBlend", "feColorMatrix", "feComposite", "feFlood", "feGaussianBlur",
    "feMerge", "feMergeNode", "feOffset",
];

/// Removed together with everything inside them.
const PRUNED_TAGS: &[&str] = &["script", "style", "foreignObject"];

const SVG_ATTRIBUTES: &[&str] = &[
    // structure
    "id", "class", "xmlns", "xlink", "version", "viewBox", "preserveAspectRatio",
    "width", "height", "x", "y", "x1", "y1", "x2", "y2", "cx", "cy", "r", "rx", "ry",
    "dx", "dy", "d", "points", "transform", "href",
    // presentation
    "fill", "fill-opacity", "fill-rule", "clip-rule", "clip-path", "mask", "filter",
    "stroke", "stroke-width", "stroke-linecap", "stroke-linejoin", "stroke-miterlimit",
    "stroke-dasharray", "stroke-dashoffset", "stroke-opacity", "opacity", "color",
    "display", "visibility", "vector-effect",
    "font-family", "font-size", "font-weight", "font-style", "text-anchor",
    "dominant-baseline", "letter-spacing",
    // paint servers and markers
    "offset", "stop-color", "stop-opacity", "gradientUnits", "gradientTransform",
    "spreadMethod", "fx", "fy", "fr", "patternUnits", "patternContentUnits",
    "patternTransform", "clipPathUnits", "maskUnits", "maskContentUnits",
    "markerWidth", "markerHeight", "markerUnits", "refX", "refY", "orient",
    "marker-start", "marker-mid", "marker-end",
    // filter primitives
    "filterUnits", "primitiveUnits", "in", "in2", "result", "mode", "operator",
    "stdDeviation", "values", "type", "flood-color", "flood-opacity",
    "k1", "k2", "k3", "k4",
];

const URL_SCHEMES: &[&str] = &["http", "https", "mailto"];

/// The sanitization capability: markup in, markup out.
pub trait Scrubber {
    fn scrub(&self, markup: &str) -> String;
}

/// Default scrubber for SVG assets.
pub struct SvgScrubber {
    pruner: Builder<'static>,
}

impl SvgScrubber {
    pub fn new() -> Self {
        let mut pruner = Builder::empty();
        pruner
            .tags(SVG_TAGS.iter().copied().collect())
            .clean_content_tags(PRUNED_TAGS.iter().copied().collect())
            .generic_attributes(SVG_ATTRIBUTES.iter().copied().collect())
            .url_schemes(URL_SCHEMES.iter().copied().collect::<HashSet<_>>())
            .url_relative(UrlRelative::PassThrough)
            .link_rel(None)
            .strip_comments(true);
        Self { pruner }
    }

    fn prune(&self, markup: &str, prolog_end: usize) -> String {
        let (prolog, body) = markup.split_at(prolog_end);
        let mut out = String::with_capacity(markup.len());
        out.push_str(prolog);
        out.push_str(&self.pruner.clean(body).to_string());
        out
    }
}

impl Default for SvgScrubber {
    fn default() -> Self {
        Self::new()
    }
}

impl Scrubber for SvgScrubber {
    fn scrub(&self, markup: &str) -> String {
        let root = match probe(markup) {
            Probe::WellFormed { prolog_end } => return self.prune(markup, prolog_end),
            Probe::Malformed { root } => root,
        };

        // Repaired documents are re-serialized without blank text between tags.
        if let Cow::Owned(repaired) = repair(markup) {
            if let Probe::WellFormed { prolog_end } = probe(&repaired) {
                let pruned = self.prune(&repaired, prolog_end);
                return BLANK_TEXT.replace_all(&pruned, "><").into_owned();
            }
        }

        let root = root.as_deref().unwrap_or(DEFAULT_ROOT);
        let mut out = format!("<{root}></{root}>");
        if markup.ends_with('\n') {
            out.push('\n');
        }
        out
    }
}

/// Close end tags that run into the next tag and quote bare attribute
/// values. Borrowed when nothing needed fixing.
fn repair(markup: &str) -> Cow<'_, str> {
    let mut repaired = UNTERMINATED_END_TAG.replace_all(markup, "</${1}><");
    // A match consumes the separator after its value, so adjacent bare
    // attributes take more than one pass.
    loop {
        let quoted = match UNQUOTED_ATTRIBUTE.replace_all(&repaired, r#"${1}="${2}"${3}"#) {
            Cow::Borrowed(_) => None,
            Cow::Owned(s) => Some(s),
        };
        match quoted {
            Some(s) => repaired = Cow::Owned(s),
            None => break,
        }
    }
    repaired
}

#[derive(Debug, PartialEq, Eq)]
enum Probe {
    /// `prolog_end` is the byte offset just past a leading XML declaration,
    /// or 0 when there is none.
    WellFormed { prolog_end: usize },
    Malformed { root: Option<String> },
}

/// Walk the document as strict XML: end names must match, attribute values
/// must be quoted, and every element must be closed.
fn probe(markup: &str) -> Probe {
    let mut reader = Reader::from_str(markup);
    reader.config_mut().check_end_names = true;

    let mut root: Option<String> = None;
    let mut depth: usize = 0;
    let mut prolog_end = 0;
    let mut first = true;

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(_) => return Probe::Malformed { root },
        };

        match event {
            Event::Decl(_) if first => {
                prolog_end = usize::try_from(reader.buffer_position()).unwrap_or(0);
            }
            Event::Start(ref start) | Event::Empty(ref start) => {
                if root.is_none() {
                    root = Some(String::from_utf8_lossy(start.name().as_ref()).into_owned());
                }
                if start.attributes().any(|attr| attr.is_err()) {
                    return Probe::Malformed { root };
                }
                if matches!(event, Event::Start(_)) {
                    depth += 1;
                }
            }
            Event::End(_) => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return Probe::Malformed { root },
            },
            Event::Eof => break,
            _ => {}
        }
        first = false;
    }

    if depth == 0 {
        Probe::WellFormed { prolog_end }
    } else {
        Probe::Malformed { root }
    }
}
