// SPDX-License-Identifier: MIT OR Apache-2.0

//! terminal target for styled runs: maps each run back to one sgr sequence.

use libspicetify_installer::{Color, Declaration, Style, StyleRun, ansi::XTERM_PALETTE};
use serde::Serialize;

const RESET: &str = "\x1b[0m";

fn color_code(color: Color, background: bool) -> String {
    let base = if background { 40 } else { 30 };

    match color {
        Color::Palette(hex) => match XTERM_PALETTE.iter().position(|p| *p == hex) {
            Some(i) if i < 8 => (base + i).to_string(),
            Some(i) => (base + 60 + i - 8).to_string(),
            None => {
                let (r, g, b) = color.rgb();
                format!("{};2;{r};{g};{b}", base + 8)
            }
        },
        Color::Rgb(r, g, b) => format!("{};2;{r};{g};{b}", base + 8),
    }
}

/// the `;`-joined sgr parameters equivalent to `style`.
pub fn sgr_params(style: &Style) -> String {
    style
        .declarations()
        .iter()
        .map(|d| match *d {
            Declaration::Bold => "1".to_string(),
            Declaration::Dim => "2".to_string(),
            Declaration::Italic => "3".to_string(),
            Declaration::Underline => "4".to_string(),
            Declaration::Foreground(c) => color_code(c, false),
            Declaration::Background(c) => color_code(c, true),
        })
        .collect::<Vec<_>>()
        .join(";")
}

/// writes runs for a terminal; without color only the text is kept.
pub fn to_terminal(runs: &[StyleRun], color: bool) -> String {
    let mut out = String::new();

    for run in runs {
        match &run.style {
            Some(style) if color && !style.is_empty() => {
                out.push_str("\x1b[");
                out.push_str(&sgr_params(style));
                out.push('m');
                out.push_str(&run.text);
                out.push_str(RESET);
            }
            _ => out.push_str(&run.text),
        }
    }

    out
}

/// json shape of a run: the css declarations and the text.
#[derive(Debug, Serialize)]
pub struct RunJson<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    pub text: &'a str,
}

impl<'a> From<&'a StyleRun> for RunJson<'a> {
    fn from(run: &'a StyleRun) -> Self {
        Self {
            style: run.style.as_ref().map(Style::css),
            text: &run.text,
        }
    }
}

#[cfg(test)]
mod tests {
    use libspicetify_installer::AnsiRenderer;

    use super::*;

    #[test]
    fn test_palette_codes_round_trip() {
        let runs = AnsiRenderer::new()
            .render("\x1b[1;31mred\x1b[0m \x1b[92;44mbright\x1b[0m")
            .runs();
        assert_eq!(
            to_terminal(&runs, true),
            "\x1b[1;31mred\x1b[0m \x1b[92;44mbright\x1b[0m"
        );
    }

    #[test]
    fn test_rgb_and_256_colors_become_truecolor() {
        let runs = AnsiRenderer::new()
            .render("\x1b[38;2;10;20;30ma\x1b[48;5;196mb")
            .runs();
        assert_eq!(
            to_terminal(&runs, true),
            "\x1b[38;2;10;20;30ma\x1b[0m\x1b[48;2;255;0;0mb\x1b[0m"
        );
    }

    #[test]
    fn test_without_color_keeps_text_only() {
        let runs = AnsiRenderer::new().render("[33mwarn[0m done").runs();
        assert_eq!(to_terminal(&runs, false), "warn done");
    }

    #[test]
    fn test_run_json_carries_css() {
        let runs = AnsiRenderer::new().render("\x1b[4mu\x1b[0mv").runs();
        let json: Vec<RunJson> = runs.iter().map(RunJson::from).collect();
        assert_eq!(
            serde_json::to_string(&json).unwrap(),
            r#"[{"style":"text-decoration: underline","text":"u"},{"text":"v"}]"#
        );
    }
}
