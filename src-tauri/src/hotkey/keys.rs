//! Logical key identifiers and label parsing.
//!
//! Labels come from two places: the settings UI ("Ctrl", "Shift", "S")
//! and older preference files that stored listener names ("LEFT CTRL").
//! Both parse into the same `PhysicalKey`.

use super::HotkeyError;
use std::fmt;

/// A modifier key. Ordering is the display order in a combo label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Modifier {
    Ctrl,
    Shift,
    Alt,
    Meta,
}

/// Named non-character keys that can terminate a combo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedKey {
    Space,
    Enter,
    Tab,
    Escape,
    PrintScreen,
    Insert,
    Delete,
    Home,
    End,
    PageUp,
    PageDown,
}

/// A logical key, independent of which physical copy was pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Modifier(Modifier),
    /// Uppercase ASCII letter.
    Letter(char),
    /// Top-row digit 0-9.
    Digit(u8),
    /// Function key F1-F24.
    Function(u8),
    Named(NamedKey),
}

/// Which physical copy of a key produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyLocation {
    Left,
    Right,
    Standard,
}

/// A key as reported by the input hook.
///
/// Left and right Ctrl are distinct physical keys but the same logical
/// modifier: releasing one while the other is held keeps Ctrl down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PhysicalKey {
    pub key: Key,
    pub location: KeyLocation,
}

impl PhysicalKey {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            location: KeyLocation::Standard,
        }
    }

    pub fn left(modifier: Modifier) -> Self {
        Self {
            key: Key::Modifier(modifier),
            location: KeyLocation::Left,
        }
    }

    pub fn right(modifier: Modifier) -> Self {
        Self {
            key: Key::Modifier(modifier),
            location: KeyLocation::Right,
        }
    }

    /// Parse a UI or listener label such as `"Ctrl"`, `"LEFT SHIFT"` or `"s"`.
    pub fn parse(label: &str) -> Result<Self, HotkeyError> {
        let normalized = label.trim().to_ascii_uppercase();
        let (location, rest) = if let Some(rest) = normalized.strip_prefix("LEFT ") {
            (KeyLocation::Left, rest.trim())
        } else if let Some(rest) = normalized.strip_prefix("RIGHT ") {
            (KeyLocation::Right, rest.trim())
        } else {
            (KeyLocation::Standard, normalized.as_str())
        };

        let key = parse_key(rest).ok_or_else(|| HotkeyError::UnknownKey(label.to_string()))?;
        Ok(Self { key, location })
    }
}

impl Key {
    pub fn is_modifier(&self) -> bool {
        matches!(self, Key::Modifier(_))
    }

    pub fn parse(label: &str) -> Result<Self, HotkeyError> {
        PhysicalKey::parse(label).map(|p| p.key)
    }
}

fn parse_key(label: &str) -> Option<Key> {
    let key = match label {
        "CTRL" | "CONTROL" => Key::Modifier(Modifier::Ctrl),
        "SHIFT" => Key::Modifier(Modifier::Shift),
        "ALT" | "OPTION" => Key::Modifier(Modifier::Alt),
        "META" | "CMD" | "COMMAND" | "SUPER" | "WIN" | "WINDOWS" => Key::Modifier(Modifier::Meta),
        "SPACE" => Key::Named(NamedKey::Space),
        "ENTER" | "RETURN" => Key::Named(NamedKey::Enter),
        "TAB" => Key::Named(NamedKey::Tab),
        "ESC" | "ESCAPE" => Key::Named(NamedKey::Escape),
        "PRINTSCREEN" | "PRINT SCREEN" | "PRTSC" => Key::Named(NamedKey::PrintScreen),
        "INSERT" | "INS" => Key::Named(NamedKey::Insert),
        "DELETE" | "DEL" => Key::Named(NamedKey::Delete),
        "HOME" => Key::Named(NamedKey::Home),
        "END" => Key::Named(NamedKey::End),
        "PAGEUP" | "PAGE UP" | "PGUP" => Key::Named(NamedKey::PageUp),
        "PAGEDOWN" | "PAGE DOWN" | "PGDN" => Key::Named(NamedKey::PageDown),
        other => return parse_character_key(other),
    };
    Some(key)
}

fn parse_character_key(label: &str) -> Option<Key> {
    let mut chars = label.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_uppercase() => return Some(Key::Letter(c)),
        (Some(c), None) if c.is_ascii_digit() => return Some(Key::Digit(c as u8 - b'0')),
        _ => {}
    }

    let number = label.strip_prefix('F')?.parse::<u8>().ok()?;
    (1..=24).contains(&number).then_some(Key::Function(number))
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Modifier::Ctrl => "Ctrl",
            Modifier::Shift => "Shift",
            Modifier::Alt => "Alt",
            Modifier::Meta => "Meta",
        };
        f.write_str(label)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Modifier(m) => m.fmt(f),
            Key::Letter(c) => write!(f, "{}", c),
            Key::Digit(d) => write!(f, "{}", d),
            Key::Function(n) => write!(f, "F{}", n),
            Key::Named(named) => {
                let label = match named {
                    NamedKey::Space => "Space",
                    NamedKey::Enter => "Enter",
                    NamedKey::Tab => "Tab",
                    NamedKey::Escape => "Escape",
                    NamedKey::PrintScreen => "PrintScreen",
                    NamedKey::Insert => "Insert",
                    NamedKey::Delete => "Delete",
                    NamedKey::Home => "Home",
                    NamedKey::End => "End",
                    NamedKey::PageUp => "PageUp",
                    NamedKey::PageDown => "PageDown",
                };
                f.write_str(label)
            }
        }
    }
}
