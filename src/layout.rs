//! # Pagination
//!
//! Walks the block stream once and decides, for every block, which page it
//! lands on and how far below the top of the page body it starts. Nothing is
//! drawn here and no block is modified: the result is a plain table the
//! renderer consumes.
//!
//! Rules:
//! - a page break starts a new page unless the current page is still empty;
//! - a block that does not fit in the remaining height moves to a new page,
//!   unless it is already at the top of one (then it overflows instead);
//! - an exact fit stays on the current page;
//! - images take the full body width, shrinking uniformly when that would
//!   make them taller than the body;
//! - space the measurer reports below an image advances the cursor without
//!   joining the image's rendered height.

use crate::blocks::Block;
use crate::measure::Measurer;

/// Printable area of a page, in points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageBody {
    pub width: f32,
    pub height: f32,
}

/// Where one block goes. `y_offset` is measured down from the top of the body.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutAssignment {
    pub page_index: usize,
    pub y_offset: f32,
    pub rendered_height: f32,
    pub rendered_width: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Layout {
    /// One entry per input block, in input order.
    pub assignments: Vec<LayoutAssignment>,
    /// Pages holding at least one visible block. A page break at the very
    /// end does not add an empty page.
    pub page_count: usize,
}

struct Cursor {
    page: usize,
    y: f32,
}

impl Cursor {
    fn new_page(&mut self) {
        self.page += 1;
        self.y = 0.0;
    }

    /// Move to a fresh page when `height` does not fit below the cursor,
    /// unless the page is still empty.
    fn make_room(&mut self, height: f32, body: PageBody) {
        if self.y + height > body.height && self.y > 0.0 {
            self.new_page();
        }
    }

    fn place(&mut self, width: f32, height: f32) -> LayoutAssignment {
        let a = LayoutAssignment {
            page_index: self.page,
            y_offset: self.y,
            rendered_height: height,
            rendered_width: width,
        };
        self.y += height;
        a
    }
}

/// Assign every block a page and vertical offset.
///
/// # Panics
///
/// When the measurer reports a negative or non-finite text height, or an
/// image without a positive finite aspect ratio. Both are measurer bugs.
pub fn paginate(blocks: &[Block], measurer: &dyn Measurer, body: PageBody) -> Layout {
    let mut cursor = Cursor { page: 0, y: 0.0 };
    let mut assignments = Vec::with_capacity(blocks.len());
    let mut last_visible_page: Option<usize> = None;

    for (i, block) in blocks.iter().enumerate() {
        let assignment = match block {
            Block::PageBreak => {
                if cursor.y > 0.0 {
                    cursor.new_page();
                }
                cursor.place(0.0, 0.0)
            }
            Block::Paragraph(_) | Block::Heading(_) => {
                let height = measurer.measure(block, body.width).height;
                assert!(
                    height.is_finite() && height >= 0.0,
                    "measurer returned invalid height {height} for block {i}"
                );
                cursor.make_room(height, body);
                cursor.place(body.width, height)
            }
            Block::Image(_) => {
                let size = measurer.measure(block, body.width);
                let aspect = match size.aspect_ratio {
                    Some(a) if a.is_finite() && a > 0.0 => a,
                    other => panic!("measurer returned invalid aspect ratio {other:?} for block {i}"),
                };
                assert!(
                    size.space_after.is_finite() && size.space_after >= 0.0,
                    "measurer returned invalid spacing {} for block {i}",
                    size.space_after
                );
                let (width, height) = fit_image(aspect, body);
                cursor.make_room(height, body);
                let placed = cursor.place(width, height);
                cursor.y += size.space_after;
                placed
            }
        };

        log::debug!(
            "block {i}: page={} y={:.1} h={:.1}",
            assignment.page_index,
            assignment.y_offset,
            assignment.rendered_height
        );
        if block.is_visible() {
            last_visible_page = Some(assignment.page_index);
        }
        assignments.push(assignment);
    }

    Layout {
        assignments,
        page_count: last_visible_page.map_or(0, |p| p + 1),
    }
}

/// Full body width, scaled down uniformly when taller than the body.
pub fn fit_image(aspect_ratio: f32, body: PageBody) -> (f32, f32) {
    let height = body.width / aspect_ratio;
    if height > body.height {
        (body.height * aspect_ratio, body.height)
    } else {
        (body.width, height)
    }
}
