use crate::fonts::{FontSet, UsedChars, Variant};
use crate::model::TextRun;

pub(crate) struct WordChunk {
    pub(crate) variant: Variant,
    pub(crate) text: String,
    pub(crate) font_size: f32,
    pub(crate) x_offset: f32, // x relative to line start
    pub(crate) width: f32,
    pub(crate) underline: bool,
}

pub(crate) struct TextLine {
    pub(crate) chunks: Vec<WordChunk>,
    pub(crate) total_width: f32,
    /// Distance from the line top to its baseline.
    pub(crate) ascent: f32,
    pub(crate) height: f32,
}

fn finish_line(chunks: &mut Vec<WordChunk>, fonts: &FontSet, fallback_size: f32) -> TextLine {
    let total_width = chunks.last().map(|c| c.x_offset + c.width).unwrap_or(0.0);
    let (ascent, height) = line_metrics(chunks, fonts, fallback_size);
    TextLine {
        chunks: std::mem::take(chunks),
        total_width,
        ascent,
        height,
    }
}

/// Tallest ascent and line height among the chunks of a line.
fn line_metrics(chunks: &[WordChunk], fonts: &FontSet, fallback_size: f32) -> (f32, f32) {
    if chunks.is_empty() {
        let face = fonts.face(false, false);
        return (
            fallback_size * face.ascender_ratio,
            fallback_size * face.line_h_ratio,
        );
    }
    chunks.iter().fold((0.0f32, 0.0f32), |(asc, h), c| {
        let face = fonts.face(c.variant.bold, c.variant.italic);
        (
            asc.max(c.font_size * face.ascender_ratio),
            h.max(c.font_size * face.line_h_ratio),
        )
    })
}

/// Wrap runs into lines no wider than `max_width` (a single word wider than
/// that gets a line of its own). No space is inserted between runs unless
/// whitespace separates them, so "bold" + ", " stays "bold,".
pub(crate) fn build_lines(runs: &[TextRun], fonts: &FontSet, max_width: f32) -> Vec<TextLine> {
    let fallback_size = runs.last().map_or(crate::model::DEFAULT_FONT_SIZE, |r| r.size);
    let mut lines: Vec<TextLine> = Vec::new();
    let mut current_chunks: Vec<WordChunk> = Vec::new();
    let mut current_x: f32 = 0.0;
    let mut prev_ended_with_ws = false;
    let mut prev_space_w: f32 = 0.0;

    for run in runs {
        let variant = Variant {
            bold: run.bold,
            italic: run.italic,
        };
        let face = fonts.face(run.bold, run.italic);
        let space_w = face.space_width(run.size);
        let starts_with_ws = run.text.starts_with(char::is_whitespace);

        for (i, word) in run.text.split_whitespace().enumerate() {
            let ww = face.word_width(word, run.size);

            let need_space =
                !current_chunks.is_empty() && (i > 0 || starts_with_ws || prev_ended_with_ws);

            // The space belongs to whichever run holds the whitespace char.
            let effective_space_w = if i > 0 || starts_with_ws {
                space_w
            } else {
                prev_space_w
            };

            let proposed_x = if need_space {
                current_x + effective_space_w
            } else {
                current_x
            };

            if !current_chunks.is_empty() && proposed_x + ww > max_width {
                lines.push(finish_line(&mut current_chunks, fonts, fallback_size));
                current_x = 0.0;
            } else {
                current_x = proposed_x;
            }

            current_chunks.push(WordChunk {
                variant,
                text: word.to_string(),
                font_size: run.size,
                x_offset: current_x,
                width: ww,
                underline: run.underline,
            });
            current_x += ww;
        }

        if !run.text.is_empty() {
            prev_ended_with_ws = run.text.ends_with(char::is_whitespace);
            prev_space_w = space_w;
        }
    }

    if !current_chunks.is_empty() || lines.is_empty() {
        lines.push(finish_line(&mut current_chunks, fonts, fallback_size));
    }
    lines
}

/// Height of one blank line after a paragraph, in the paragraph's last run size.
pub(crate) fn blank_line_height(runs: &[TextRun], fonts: &FontSet) -> f32 {
    let size = runs.last().map_or(crate::model::DEFAULT_FONT_SIZE, |r| r.size);
    size * fonts.face(false, false).line_h_ratio
}

/// Record the chars of `runs` for font subsetting.
pub(crate) fn collect_used_chars(runs: &[TextRun], used: &mut UsedChars) {
    for run in runs {
        let chars = used
            .entry(Variant {
                bold: run.bold,
                italic: run.italic,
            })
            .or_default();
        chars.extend(run.text.chars().filter(|c| !c.is_whitespace()));
        chars.insert(' ');
    }
}
