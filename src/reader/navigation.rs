//! Physical reader input to logical session commands.
//!
//! Click zones and arrow keys are physical: which of them advances depends on
//! the reading direction. Everything downstream of this module only sees
//! logical forward/backward steps.

use super::session::SessionCommand;
use crate::config::KeyBindings;
use crate::models::{LayoutPreference, ReadingDirection};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickZone {
    Left,
    Right,
}

/// Raw input as the presentation layer reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderInput {
    Click(ClickZone),
    Key(String),
    /// Slider notch `value` of `max`. The top notch is the last page and
    /// means "next".
    Slider { value: usize, max: usize },
    SelectChapter(String),
    NextChapter,
    PreviousChapter,
    Quit,
}

impl ReaderInput {
    /// Slider input for a 1-based page number over `page_count` pages.
    pub fn slider_at_page(page_number: usize, page_count: usize) -> Self {
        ReaderInput::Slider {
            value: page_number.saturating_sub(1),
            max: page_count.saturating_sub(1),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NavigationController {
    page_left: String,
    page_right: String,
    quit: String,
    toggle_layout: String,
    toggle_direction: String,
}

impl NavigationController {
    pub fn new(keys: &KeyBindings) -> Self {
        Self {
            page_left: normalize_key_name(&keys.page_left, "arrowleft"),
            page_right: normalize_key_name(&keys.page_right, "arrowright"),
            quit: normalize_key_name(&keys.quit, "escape"),
            toggle_layout: normalize_key_name(&keys.toggle_layout, "d"),
            toggle_direction: normalize_key_name(&keys.toggle_direction, "r"),
        }
    }

    pub fn translate(
        &self,
        input: ReaderInput,
        preference: &LayoutPreference,
    ) -> Option<SessionCommand> {
        let command = match input {
            ReaderInput::Click(zone) => Some(Self::physical_step(zone, preference.direction)),
            ReaderInput::Key(name) => self.translate_key(&name, preference),
            ReaderInput::Slider { value, max } => {
                if value >= max {
                    Some(SessionCommand::Forward)
                } else {
                    Some(SessionCommand::Jump { index: value })
                }
            }
            ReaderInput::SelectChapter(chapter_id) => {
                Some(SessionCommand::SelectChapter { chapter_id })
            }
            ReaderInput::NextChapter => Some(SessionCommand::NextChapter),
            ReaderInput::PreviousChapter => Some(SessionCommand::PreviousChapter),
            ReaderInput::Quit => Some(SessionCommand::Quit),
        };
        if let Some(command) = &command {
            trace!(action = command.action(), "Translated reader input");
        }
        command
    }

    fn translate_key(&self, raw: &str, preference: &LayoutPreference) -> Option<SessionCommand> {
        let pressed = normalize_key_name(raw, "");
        if pressed.is_empty() {
            return None;
        }
        if pressed == self.page_left {
            Some(Self::physical_step(ClickZone::Left, preference.direction))
        } else if pressed == self.page_right {
            Some(Self::physical_step(ClickZone::Right, preference.direction))
        } else if pressed == self.quit {
            Some(SessionCommand::Quit)
        } else if pressed == self.toggle_layout {
            Some(SessionCommand::SetLayout {
                layout: preference.layout.toggled(),
            })
        } else if pressed == self.toggle_direction {
            Some(SessionCommand::SetDirection {
                direction: preference.direction.toggled(),
            })
        } else {
            None
        }
    }

    /// The right side advances under ltr, the left side under rtl.
    fn physical_step(zone: ClickZone, direction: ReadingDirection) -> SessionCommand {
        match (zone, direction) {
            (ClickZone::Right, ReadingDirection::Ltr) | (ClickZone::Left, ReadingDirection::Rtl) => {
                SessionCommand::Forward
            }
            (ClickZone::Left, ReadingDirection::Ltr) | (ClickZone::Right, ReadingDirection::Rtl) => {
                SessionCommand::Backward
            }
        }
    }
}

fn normalize_key_name(raw: &str, fallback: &str) -> String {
    let normalized = raw.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "" => fallback.to_string(),
        "left" => "arrowleft".to_string(),
        "right" => "arrowright".to_string(),
        "esc" => "escape".to_string(),
        _ => normalized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PageLayout;

    fn pref(layout: PageLayout, direction: ReadingDirection) -> LayoutPreference {
        LayoutPreference { layout, direction }
    }

    fn controller() -> NavigationController {
        NavigationController::new(&KeyBindings::default())
    }

    #[test]
    fn ltr_right_side_moves_forward() {
        let ltr = pref(PageLayout::Single, ReadingDirection::Ltr);
        let nav = controller();
        assert_eq!(
            nav.translate(ReaderInput::Click(ClickZone::Right), &ltr),
            Some(SessionCommand::Forward)
        );
        assert_eq!(
            nav.translate(ReaderInput::Key("ArrowLeft".to_string()), &ltr),
            Some(SessionCommand::Backward)
        );
    }

    #[test]
    fn rtl_right_zone_click_moves_backward() {
        let rtl = pref(PageLayout::Double, ReadingDirection::Rtl);
        let nav = controller();
        assert_eq!(
            nav.translate(ReaderInput::Click(ClickZone::Right), &rtl),
            Some(SessionCommand::Backward)
        );
        assert_eq!(
            nav.translate(ReaderInput::Click(ClickZone::Left), &rtl),
            Some(SessionCommand::Forward)
        );
        assert_eq!(
            nav.translate(ReaderInput::Key("left".to_string()), &rtl),
            Some(SessionCommand::Forward)
        );
    }

    #[test]
    fn slider_max_notch_means_forward() {
        let nav = controller();
        let ltr = LayoutPreference::default();
        assert_eq!(
            nav.translate(ReaderInput::Slider { value: 12, max: 12 }, &ltr),
            Some(SessionCommand::Forward)
        );
        assert_eq!(
            nav.translate(ReaderInput::Slider { value: 4, max: 12 }, &ltr),
            Some(SessionCommand::Jump { index: 4 })
        );
    }

    #[test]
    fn slider_on_last_page_advances() {
        let nav = controller();
        let ltr = LayoutPreference::default();
        assert_eq!(
            ReaderInput::slider_at_page(6, 6),
            ReaderInput::Slider { value: 5, max: 5 }
        );
        assert_eq!(
            nav.translate(ReaderInput::slider_at_page(6, 6), &ltr),
            Some(SessionCommand::Forward)
        );
        assert_eq!(
            nav.translate(ReaderInput::slider_at_page(5, 6), &ltr),
            Some(SessionCommand::Jump { index: 4 })
        );
        assert_eq!(
            nav.translate(ReaderInput::slider_at_page(1, 6), &ltr),
            Some(SessionCommand::Jump { index: 0 })
        );
    }

    #[test]
    fn toggles_and_quit_follow_configured_keys() {
        let keys = KeyBindings {
            quit: "Q".to_string(),
            toggle_layout: "L".to_string(),
            ..KeyBindings::default()
        };
        let nav = NavigationController::new(&keys);
        let current = pref(PageLayout::Single, ReadingDirection::Ltr);

        assert_eq!(
            nav.translate(ReaderInput::Key("q".to_string()), &current),
            Some(SessionCommand::Quit)
        );
        assert_eq!(nav.translate(ReaderInput::Key("Esc".to_string()), &current), None);
        assert_eq!(
            nav.translate(ReaderInput::Key("l".to_string()), &current),
            Some(SessionCommand::SetLayout {
                layout: PageLayout::Double
            })
        );
        assert_eq!(
            nav.translate(ReaderInput::Key("R".to_string()), &current),
            Some(SessionCommand::SetDirection {
                direction: ReadingDirection::Rtl
            })
        );
        assert_eq!(nav.translate(ReaderInput::Key("  ".to_string()), &current), None);
    }

    #[test]
    fn normalizes_key_aliases() {
        assert_eq!(normalize_key_name(" Right ", "x"), "arrowright");
        assert_eq!(normalize_key_name("ESC", "x"), "escape");
        assert_eq!(normalize_key_name("", "arrowleft"), "arrowleft");
    }
}
