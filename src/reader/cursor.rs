//! Page position within one loaded chapter, under single or double layout.

use crate::models::{PageLayout, ReadingDirection};

/// Result of one logical page step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepOutcome {
    pub new_index: usize,
    /// The step ran off the end of the chapter; the index did not move.
    pub crossed_chapter_boundary: bool,
}

/// Pages on screen for the current index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorView {
    /// Indices in reading order, never presentation order.
    pub displayed_indices: Vec<usize>,
    pub is_paired: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PageCursor {
    pages: Vec<String>,
    index: usize,
    layout: PageLayout,
    direction: ReadingDirection,
}

impl PageCursor {
    pub fn new(layout: PageLayout, direction: ReadingDirection) -> Self {
        Self {
            pages: Vec::new(),
            index: 0,
            layout,
            direction,
        }
    }

    /// Replace the page list. `resume` is honoured only when it addresses a
    /// real page.
    pub fn load_chapter(&mut self, pages: Vec<String>, resume: Option<usize>) {
        self.index = resume.filter(|&idx| idx < pages.len()).unwrap_or(0);
        self.pages = pages;
    }

    pub fn step(&mut self, forward: bool) -> StepOutcome {
        if self.pages.is_empty() {
            return StepOutcome {
                new_index: 0,
                crossed_chapter_boundary: forward,
            };
        }

        let last = self.pages.len() - 1;
        if forward {
            let last_shown = if self.pairs_at(self.index) {
                self.index + 1
            } else {
                self.index
            };
            if last_shown >= last {
                return StepOutcome {
                    new_index: self.index,
                    crossed_chapter_boundary: true,
                };
            }
            let stride = if self.layout == PageLayout::Double && self.index + 2 <= last {
                2
            } else {
                1
            };
            self.index += stride;
        } else if self.index > 0 {
            let stride = if self.layout == PageLayout::Double && self.index >= 2 {
                2
            } else {
                1
            };
            self.index -= stride;
        }

        StepOutcome {
            new_index: self.index,
            crossed_chapter_boundary: false,
        }
    }

    /// Jump to `idx`, clamped to the chapter. Returns the resulting index.
    pub fn set_index(&mut self, idx: usize) -> usize {
        self.index = idx.min(self.pages.len().saturating_sub(1));
        self.index
    }

    pub fn current_view(&self) -> CursorView {
        if self.pages.is_empty() {
            return CursorView {
                displayed_indices: Vec::new(),
                is_paired: false,
            };
        }
        if self.pairs_at(self.index) {
            CursorView {
                displayed_indices: vec![self.index, self.index + 1],
                is_paired: true,
            }
        } else {
            CursorView {
                displayed_indices: vec![self.index],
                is_paired: false,
            }
        }
    }

    /// Image URLs in on-screen order, left to right.
    pub fn image_urls(&self) -> Vec<String> {
        let view = self.current_view();
        let mut urls: Vec<String> = view
            .displayed_indices
            .iter()
            .filter_map(|&idx| self.pages.get(idx).cloned())
            .collect();
        if view.is_paired && self.direction == ReadingDirection::Rtl {
            urls.reverse();
        }
        urls
    }

    /// 1-based label such as `3 / 12` or `3-4 / 12`.
    pub fn page_label(&self) -> String {
        let view = self.current_view();
        let total = self.pages.len();
        match view.displayed_indices.as_slice() {
            [first, second] => format!("{}-{} / {}", first + 1, second + 1, total),
            [only] => format!("{} / {}", only + 1, total),
            _ => format!("0 / {}", total),
        }
    }

    pub fn set_layout(&mut self, layout: PageLayout) {
        self.layout = layout;
    }

    pub fn set_direction(&mut self, direction: ReadingDirection) {
        self.direction = direction;
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn layout(&self) -> PageLayout {
        self.layout
    }

    pub fn direction(&self) -> ReadingDirection {
        self.direction
    }

    fn pairs_at(&self, idx: usize) -> bool {
        self.layout == PageLayout::Double && idx + 1 < self.pages.len()
    }
}
