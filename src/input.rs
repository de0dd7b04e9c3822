use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// One symbolic key a mode recognizes, with its help text and help-menu group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyBinding {
    pub keys: &'static [&'static str],
    pub help: &'static str,
    pub group: &'static str,
}

impl KeyBinding {
    pub const fn new(
        keys: &'static [&'static str],
        help: &'static str,
        group: &'static str,
    ) -> Self {
        Self { keys, help, group }
    }

    pub fn matches(&self, key: KeyEvent) -> bool {
        let Some(signature) = key_event_signature(key) else {
            return false;
        };
        self.keys.iter().any(|candidate| *candidate == signature)
    }

    pub fn key_label(&self) -> String {
        self.keys.join("/")
    }
}

pub const QUIT: KeyBinding = KeyBinding::new(&["q", "ctrl+c"], "Quit", "General");
pub const HELP: KeyBinding = KeyBinding::new(&["?"], "Toggle help", "General");

/// Normalized signature such as `ctrl+d` or `backtab`. Printable characters
/// keep their case and never carry `shift`, so `G` matches regardless of how
/// the terminal reports the modifier.
pub fn key_event_signature(key: KeyEvent) -> Option<String> {
    let key_name = match key.code {
        KeyCode::Char(' ') => "space".to_string(),
        KeyCode::Char('+') => "plus".to_string(),
        KeyCode::Char(c) if key.modifiers.contains(KeyModifiers::CONTROL) => {
            c.to_ascii_lowercase().to_string()
        }
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Enter => "enter".to_string(),
        KeyCode::Tab if key.modifiers.contains(KeyModifiers::SHIFT) => "backtab".to_string(),
        KeyCode::Tab => "tab".to_string(),
        KeyCode::BackTab => "backtab".to_string(),
        KeyCode::Backspace => "backspace".to_string(),
        KeyCode::Delete => "delete".to_string(),
        KeyCode::Insert => "insert".to_string(),
        KeyCode::Esc => "esc".to_string(),
        KeyCode::Left => "left".to_string(),
        KeyCode::Right => "right".to_string(),
        KeyCode::Up => "up".to_string(),
        KeyCode::Down => "down".to_string(),
        KeyCode::Home => "home".to_string(),
        KeyCode::End => "end".to_string(),
        KeyCode::PageUp => "pageup".to_string(),
        KeyCode::PageDown => "pagedown".to_string(),
        KeyCode::F(n) => format!("f{n}"),
        _ => return None,
    };

    let printable = matches!(key.code, KeyCode::Char(_));
    let mut parts = Vec::new();
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        parts.push("ctrl".to_string());
    }
    if key.modifiers.contains(KeyModifiers::ALT) {
        parts.push("alt".to_string());
    }
    if key.modifiers.contains(KeyModifiers::SHIFT)
        && !printable
        && !matches!(key.code, KeyCode::Tab | KeyCode::BackTab)
    {
        parts.push("shift".to_string());
    }
    parts.push(key_name);
    Some(parts.join("+"))
}

/// Relative movement keys understood by every scrollable content view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    Up,
    Down,
    PageUp,
    PageDown,
    Top,
    Bottom,
}

pub fn motion_for(key: KeyEvent) -> Option<Motion> {
    match key_event_signature(key)?.as_str() {
        "k" | "up" => Some(Motion::Up),
        "j" | "down" => Some(Motion::Down),
        "pageup" | "ctrl+u" => Some(Motion::PageUp),
        "pagedown" | "ctrl+f" => Some(Motion::PageDown),
        "g" | "home" => Some(Motion::Top),
        "G" | "end" => Some(Motion::Bottom),
        _ => None,
    }
}

impl Motion {
    pub fn delta(self, page: usize) -> isize {
        let page = page.max(1) as isize;
        match self {
            Self::Up => -1,
            Self::Down => 1,
            Self::PageUp => -page,
            Self::PageDown => page,
            Self::Top => isize::MIN / 2,
            Self::Bottom => isize::MAX / 2,
        }
    }
}
