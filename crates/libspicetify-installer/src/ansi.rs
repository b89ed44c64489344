// SPDX-License-Identifier: MIT OR Apache-2.0

//! converts command output carrying sgr escape codes into styled text runs.
//!
//! the host may emit full sequences (`ESC [ 31 m`) or bare ones (`[31m`), sometimes
//! both in the same chunk. rendering never fails; every opened span is closed before
//! the chunk ends.

use std::{fmt, sync::LazyLock};

use regex::Regex;

/// `ESC [ params m`. each `;`-separated token is either numeric or non-numeric
/// junk (read as a reset); tokens mixing both belong to other csi sequences.
static FULL_ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\x1b\[((?:[0-9:<=>?]+|[^\x1b\[\]\s0-9;m]+)?(?:;(?:[0-9:<=>?]+|[^\x1b\[\]\s0-9;m]+)?)*)m",
    )
    .expect("invalid escape pattern")
});

/// `[params m` without the escape introducer.
static BARE_BRACKET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([0-9;]+)m").expect("invalid bracket pattern"));

/// leftovers that are not sgr: osc titles, other csi sequences (cursor, erase),
/// lone escapes, and bare cursor/erase brackets.
static MALFORMED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)?|\x1b\[[0-?]*[ -/]*[@-~]?|\x1b|\[\d+(?:;\d+)*[ABCDGHJK]",
    )
    .expect("invalid malformed-sequence pattern")
});

/// xterm colors for codes 30-37 / 40-47 followed by the bright 90-97 / 100-107 range.
pub const XTERM_PALETTE: [&str; 16] = [
    "#000000", "#cd0000", "#00cd00", "#cdcd00", "#0000ee", "#cd00cd", "#00cdcd", "#e5e5e5",
    "#7f7f7f", "#ff0000", "#00ff00", "#ffff00", "#5c5cff", "#ff00ff", "#00ffff", "#ffffff",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    /// an entry of the fixed palette, as a css hex value.
    Palette(&'static str),
    Rgb(u8, u8, u8),
}

impl Color {
    /// returns the red, green and blue channels.
    pub fn rgb(&self) -> (u8, u8, u8) {
        match *self {
            Self::Rgb(r, g, b) => (r, g, b),
            Self::Palette(hex) => {
                let channel = |i: usize| {
                    hex.get(i..i + 2)
                        .and_then(|c| u8::from_str_radix(c, 16).ok())
                        .unwrap_or(0)
                };
                (channel(1), channel(3), channel(5))
            }
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Palette(hex) => f.write_str(hex),
            Self::Rgb(r, g, b) => write!(f, "rgb({r}, {g}, {b})"),
        }
    }
}

/// one css-equivalent style declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Declaration {
    Bold,
    Dim,
    Italic,
    Underline,
    Foreground(Color),
    Background(Color),
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bold => f.write_str("font-weight: bold"),
            Self::Dim => f.write_str("opacity: 0.5"),
            Self::Italic => f.write_str("font-style: italic"),
            Self::Underline => f.write_str("text-decoration: underline"),
            Self::Foreground(color) => write!(f, "color: {color}"),
            Self::Background(color) => write!(f, "background-color: {color}"),
        }
    }
}

/// declarations accumulated from one sgr group, in the order they appeared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Style {
    declarations: Vec<Declaration>,
}

impl Style {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, declaration: Declaration) -> Self {
        self.declarations.push(declaration);
        self
    }

    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    pub fn foreground(&self) -> Option<Color> {
        self.declarations.iter().rev().find_map(|d| match d {
            Declaration::Foreground(c) => Some(*c),
            _ => None,
        })
    }

    pub fn background(&self) -> Option<Color> {
        self.declarations.iter().rev().find_map(|d| match d {
            Declaration::Background(c) => Some(*c),
            _ => None,
        })
    }

    /// the declarations joined into a single css `style` attribute value.
    pub fn css(&self) -> String {
        self.declarations
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Open(Style),
    Text(String),
    Close,
}

/// a contiguous piece of text sharing one style (`None` for unstyled text).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleRun {
    pub style: Option<Style>,
    pub text: String,
}

impl StyleRun {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            style: None,
            text: text.into(),
        }
    }

    pub fn styled(style: Style, text: impl Into<String>) -> Self {
        Self {
            style: Some(style),
            text: text.into(),
        }
    }
}

/// balanced output of one render: every `Open` is followed by exactly one `Close`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rendered {
    segments: Vec<Segment>,
}

impl Rendered {
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn opening_markers(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Open(_)))
            .count()
    }

    pub fn closing_markers(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Close))
            .count()
    }

    /// the text with all styling removed.
    pub fn plain_text(&self) -> String {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    /// collapses the marker stream into runs, merging neighbours with equal style.
    pub fn runs(&self) -> Vec<StyleRun> {
        let mut runs: Vec<StyleRun> = Vec::new();
        let mut current: Option<&Style> = None;

        for segment in &self.segments {
            match segment {
                Segment::Open(style) => current = Some(style),
                Segment::Close => current = None,
                Segment::Text(text) => match runs.last_mut() {
                    Some(last) if last.style.as_ref() == current => last.text.push_str(text),
                    _ => runs.push(StyleRun {
                        style: current.cloned(),
                        text: text.clone(),
                    }),
                },
            }
        }

        runs
    }

    /// html rendering: `<span style="...">` markers around escaped text.
    pub fn to_markup(&self) -> String {
        let mut out = String::new();

        for segment in &self.segments {
            match segment {
                Segment::Open(style) => {
                    out.push_str("<span style=\"");
                    out.push_str(&escape_html(&style.css()));
                    out.push_str("\">");
                }
                Segment::Text(text) => out.push_str(&escape_html(text)),
                Segment::Close => out.push_str("</span>"),
            }
        }

        out
    }
}

/// html rendering of already collapsed runs, one span per styled run.
pub fn markup_from_runs(runs: &[StyleRun]) -> String {
    let mut out = String::new();

    for run in runs {
        match &run.style {
            Some(style) => {
                out.push_str("<span style=\"");
                out.push_str(&escape_html(&style.css()));
                out.push_str("\">");
                out.push_str(&escape_html(&run.text));
                out.push_str("</span>");
            }
            None => out.push_str(&escape_html(&run.text)),
        }
    }

    out
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// stateless sgr renderer; safe to call once per output chunk.
#[derive(Debug, Clone, Copy)]
pub struct AnsiRenderer {
    palette: &'static [&'static str; 16],
}

impl Default for AnsiRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl AnsiRenderer {
    pub fn new() -> Self {
        Self {
            palette: &XTERM_PALETTE,
        }
    }

    pub fn render(&self, input: &str) -> Rendered {
        // full escapes first so the bare pass never sees a sequence twice
        let segments = self.expand(vec![Segment::Text(input.to_string())], &FULL_ESCAPE);
        let segments = self.expand(segments, &BARE_BRACKET);

        let segments = segments.into_iter().map(|segment| match segment {
            Segment::Text(text) => Segment::Text(MALFORMED.replace_all(&text, "").into_owned()),
            other => other,
        });

        Rendered {
            segments: balance(segments),
        }
    }

    /// convenience for the html target.
    pub fn render_markup(&self, input: &str) -> String {
        self.render(input).to_markup()
    }

    /// replaces every match of `pattern` inside text segments with its marker.
    fn expand(&self, segments: Vec<Segment>, pattern: &Regex) -> Vec<Segment> {
        let mut out = Vec::with_capacity(segments.len());

        for segment in segments {
            let Segment::Text(text) = segment else {
                out.push(segment);
                continue;
            };

            let mut last_end = 0;
            for captures in pattern.captures_iter(&text) {
                let (Some(whole), Some(params)) = (captures.get(0), captures.get(1)) else {
                    continue;
                };

                if whole.start() > last_end {
                    out.push(Segment::Text(text[last_end..whole.start()].to_string()));
                }
                if let Some(marker) = self.render_group(params.as_str()) {
                    out.push(marker);
                }
                last_end = whole.end();
            }

            if last_end < text.len() {
                out.push(Segment::Text(text[last_end..].to_string()));
            }
        }

        out
    }

    /// turns one `;`-separated parameter list into at most one marker.
    fn render_group(&self, params: &str) -> Option<Segment> {
        let codes: Vec<u32> = params
            .split(';')
            .map(|token| token.trim().parse().unwrap_or(0))
            .collect();

        let mut style = Style::new();
        let mut i = 0;

        while i < codes.len() {
            match codes[i] {
                // reset dominates the rest of the group
                0 => return Some(Segment::Close),
                1 => style.declarations.push(Declaration::Bold),
                2 => style.declarations.push(Declaration::Dim),
                3 => style.declarations.push(Declaration::Italic),
                4 => style.declarations.push(Declaration::Underline),
                code @ 30..=37 => style
                    .declarations
                    .push(Declaration::Foreground(self.palette_color(code - 30))),
                code @ 90..=97 => style
                    .declarations
                    .push(Declaration::Foreground(self.palette_color(code - 90 + 8))),
                code @ 40..=47 => style
                    .declarations
                    .push(Declaration::Background(self.palette_color(code - 40))),
                code @ 100..=107 => style
                    .declarations
                    .push(Declaration::Background(self.palette_color(code - 100 + 8))),
                code @ (38 | 48) => {
                    if let Some((color, consumed)) = self.extended_color(&codes[i + 1..]) {
                        style.declarations.push(if code == 38 {
                            Declaration::Foreground(color)
                        } else {
                            Declaration::Background(color)
                        });
                        i += consumed;
                    }
                }
                _ => {}
            }
            i += 1;
        }

        (!style.is_empty()).then_some(Segment::Open(style))
    }

    fn palette_color(&self, index: u32) -> Color {
        Color::Palette(self.palette[index as usize])
    }

    /// parses the tail of a 38/48 code: `2;r;g;b` or `5;n`.
    /// returns the color and how many extra parameters it consumed.
    fn extended_color(&self, rest: &[u32]) -> Option<(Color, usize)> {
        let channel = |v: u32| v.min(255) as u8;

        match rest {
            [2, r, g, b, ..] => Some((Color::Rgb(channel(*r), channel(*g), channel(*b)), 4)),
            [5, n, ..] => Some((self.xterm_256(*n)?, 2)),
            _ => None,
        }
    }

    fn xterm_256(&self, n: u32) -> Option<Color> {
        let level = |v: u32| if v == 0 { 0 } else { (55 + v * 40) as u8 };

        match n {
            0..=15 => Some(self.palette_color(n)),
            16..=231 => {
                let n = n - 16;
                Some(Color::Rgb(level(n / 36), level((n / 6) % 6), level(n % 6)))
            }
            232..=255 => {
                let gray = (8 + (n - 232) * 10) as u8;
                Some(Color::Rgb(gray, gray, gray))
            }
            _ => None,
        }
    }
}

/// spans never nest: a new open closes the previous one and stray closes are dropped.
/// a span still open at the end is closed.
fn balance(segments: impl IntoIterator<Item = Segment>) -> Vec<Segment> {
    let mut out = Vec::new();
    let mut open = false;

    for segment in segments {
        match segment {
            Segment::Open(style) => {
                if open {
                    out.push(Segment::Close);
                }
                out.push(Segment::Open(style));
                open = true;
            }
            Segment::Close => {
                if open {
                    out.push(Segment::Close);
                    open = false;
                }
            }
            Segment::Text(text) if text.is_empty() => {}
            Segment::Text(text) => match out.last_mut() {
                Some(Segment::Text(prev)) => prev.push_str(&text),
                _ => out.push(Segment::Text(text)),
            },
        }
    }

    if open {
        out.push(Segment::Close);
    }

    out
}
