/// Keyboard key, by physical position.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Key {
    Escape,
    Enter,
    Space,
    Tab,
    Backspace,

    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,

    /// Letter or digit key, lowercase (`'a'..='z'`, `'0'..='9'`).
    Char(char),

    /// Function key `F1..=F12`.
    F(u8),

    /// Any other key, with its platform code.
    Unknown(u32),
}

/// Mouse button identifier.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Other(u16),
}

/// Window input, already translated from the platform.
///
/// Pointer coordinates are physical pixels from the top-left of the window, i.e. the
/// same space as screen viewports.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum InputEvent {
    PointerMoved { x: f32, y: f32 },
    PointerLeft,
    Button { button: MouseButton, pressed: bool },
    Key { key: Key, pressed: bool, repeat: bool },
    Focused(bool),
}
