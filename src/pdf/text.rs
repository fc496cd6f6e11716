use pdf_writer::{Content, Name, Str};

use crate::fonts::{EmbeddedFont, Variant};
use crate::text::TextLine;

fn font_for(fonts: &[EmbeddedFont], variant: Variant) -> &EmbeddedFont {
    fonts
        .iter()
        .find(|f| f.variant == variant)
        .unwrap_or(&fonts[0])
}

/// Paint wrapped lines left-aligned at `x`, the first line's top edge at `top_y`
/// (PDF user space, y up).
pub(super) fn render_lines(
    content: &mut Content,
    lines: &[TextLine],
    x: f32,
    top_y: f32,
    fonts: &[EmbeddedFont],
) {
    let mut cur_font: Option<Variant> = None;
    let mut cur_font_size: f32 = -1.0;
    let mut line_top = top_y;

    for line in lines {
        let y = line_top - line.ascent;
        let mut underlines: Vec<(f32, f32, f32, f32)> = Vec::new();

        if !line.chunks.is_empty() {
            content.begin_text();
            let mut td_x = 0.0_f32;
            let mut td_y = 0.0_f32;

            for chunk in &line.chunks {
                let font = font_for(fonts, chunk.variant);
                if cur_font != Some(chunk.variant) || cur_font_size != chunk.font_size {
                    content.set_font(Name(font.pdf_name.as_bytes()), chunk.font_size);
                    cur_font = Some(chunk.variant);
                    cur_font_size = chunk.font_size;
                }

                let cx = x + chunk.x_offset;
                content.next_line(cx - td_x, y - td_y);
                td_x = cx;
                td_y = y;
                content.show(Str(&font.encode(&chunk.text)));

                if chunk.underline {
                    let thick = (chunk.font_size * 0.05).max(0.5);
                    let ul_y = y - chunk.font_size * 0.12;
                    underlines.push((cx, ul_y - thick, chunk.width, thick));
                }
            }
            content.end_text();
        }

        for &(ux, uy, uw, uh) in &underlines {
            content.rect(ux, uy, uw, uh).fill_nonzero();
        }
        line_top -= line.height;
    }
}
