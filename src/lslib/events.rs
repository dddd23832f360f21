use labelstudio_domain::glam::Vec2;
use std::collections::VecDeque;

/// Modifier keys held while an event happened. On macOS, `ctrl` is expected to carry the
/// command key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
}
impl Modifiers {
    pub const NONE: Self = Self {
        shift: false,
        ctrl: false,
        alt: false,
    };
    pub fn shift() -> Self {
        Self {
            shift: true,
            ..Self::NONE
        }
    }
    pub fn ctrl() -> Self {
        Self {
            ctrl: true,
            ..Self::NONE
        }
    }
    pub fn ctrl_shift() -> Self {
        Self {
            shift: true,
            ctrl: true,
            ..Self::NONE
        }
    }
    pub fn any(&self) -> bool {
        self.shift || self.ctrl || self.alt
    }
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum KeyCode {
    /// Printable characters. Letters are reported in upper case.
    Char(char),
    Delete,
    Back,
    Escape,
}
impl KeyCode {
    /// Letters are normalized to upper case
    pub fn from_char(c: char) -> Self {
        Self::Char(c.to_ascii_uppercase())
    }
    pub fn digit(&self) -> Option<u32> {
        match self {
            Self::Char(c) => c.to_digit(10),
            _ => None,
        }
    }
    pub fn is_delete(&self) -> bool {
        matches!(self, Self::Delete | Self::Back)
    }
    pub fn is_char(&self, c: char) -> bool {
        *self == Self::from_char(c)
    }
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Input events in viewport pixel coordinates with the origin at the top left corner.
#[derive(PartialEq, Debug, Clone, Copy)]
pub enum InputEvent {
    PointerDown {
        pos: Vec2,
        button: MouseButton,
        modifiers: Modifiers,
    },
    PointerUp {
        pos: Vec2,
        button: MouseButton,
        modifiers: Modifiers,
    },
    PointerMove {
        pos: Vec2,
        modifiers: Modifiers,
    },
    Scroll {
        offset: Vec2,
        modifiers: Modifiers,
    },
    KeyPress {
        key: KeyCode,
        modifiers: Modifiers,
    },
    Resize {
        width: u32,
        height: u32,
    },
}
impl InputEvent {
    pub fn left_down(x: f32, y: f32, modifiers: Modifiers) -> Self {
        Self::PointerDown {
            pos: Vec2::new(x, y),
            button: MouseButton::Left,
            modifiers,
        }
    }
    pub fn left_up(x: f32, y: f32, modifiers: Modifiers) -> Self {
        Self::PointerUp {
            pos: Vec2::new(x, y),
            button: MouseButton::Left,
            modifiers,
        }
    }
    pub fn moved(x: f32, y: f32, modifiers: Modifiers) -> Self {
        Self::PointerMove {
            pos: Vec2::new(x, y),
            modifiers,
        }
    }
    pub fn scroll(y_offset: f32) -> Self {
        Self::Scroll {
            offset: Vec2::new(0.0, y_offset),
            modifiers: Modifiers::NONE,
        }
    }
    pub fn key(c: char, modifiers: Modifiers) -> Self {
        Self::KeyPress {
            key: KeyCode::from_char(c),
            modifiers,
        }
    }
}

/// First in first out buffer between the window system and the studio
#[derive(Clone, Debug, Default)]
pub struct EventQueue {
    events: VecDeque<InputEvent>,
}
impl EventQueue {
    pub fn push(&mut self, event: InputEvent) {
        self.events.push_back(event);
    }
    pub fn pop(&mut self) -> Option<InputEvent> {
        self.events.pop_front()
    }
    pub fn len(&self) -> usize {
        self.events.len()
    }
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
    pub fn clear(&mut self) {
        self.events.clear();
    }
}
impl Extend<InputEvent> for EventQueue {
    fn extend<T: IntoIterator<Item = InputEvent>>(&mut self, iter: T) {
        self.events.extend(iter);
    }
}

#[test]
fn test_keys() {
    assert_eq!(KeyCode::from_char('k'), KeyCode::Char('K'));
    assert!(KeyCode::from_char('k').is_char('K'));
    assert_eq!(KeyCode::Char('7').digit(), Some(7));
    assert_eq!(KeyCode::Delete.digit(), None);
    assert!(KeyCode::Back.is_delete());
    assert!(Modifiers::ctrl_shift().any());
    assert!(!Modifiers::default().any());
}

#[test]
fn test_queue_order() {
    let mut q = EventQueue::default();
    q.push(InputEvent::scroll(1.0));
    q.extend([InputEvent::key('z', Modifiers::ctrl()), InputEvent::scroll(2.0)]);
    assert_eq!(q.len(), 3);
    assert_eq!(q.pop(), Some(InputEvent::scroll(1.0)));
    assert_eq!(
        q.pop(),
        Some(InputEvent::KeyPress {
            key: KeyCode::Char('Z'),
            modifiers: Modifiers::ctrl()
        })
    );
    q.clear();
    assert!(q.is_empty());
}
