use serde::{Deserialize, Serialize};

/// The three popup surfaces the engine coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PopupKind {
    Welcome,
    Urgency,
    Exit,
}

impl PopupKind {
    /// All kinds, in evaluation priority order.
    pub const ALL: [PopupKind; 3] = [PopupKind::Welcome, PopupKind::Urgency, PopupKind::Exit];

    /// Kinds evaluated on the per-second tick. Exit is signal-driven only.
    pub const TIMED: [PopupKind; 2] = [PopupKind::Welcome, PopupKind::Urgency];

    pub fn as_str(self) -> &'static str {
        match self {
            PopupKind::Welcome => "welcome",
            PopupKind::Urgency => "urgency",
            PopupKind::Exit => "exit",
        }
    }

    /// Name of the visual element, used as the prefix of analytics event names.
    pub fn surface_name(self) -> &'static str {
        match self {
            PopupKind::Welcome => "welcome_popup",
            PopupKind::Urgency => "urgency_bar",
            PopupKind::Exit => "exit_popup",
        }
    }

    pub fn tracks_time_on_page(self) -> bool {
        matches!(self, PopupKind::Welcome | PopupKind::Urgency)
    }

    pub(crate) fn index(self) -> usize {
        match self {
            PopupKind::Welcome => 0,
            PopupKind::Urgency => 1,
            PopupKind::Exit => 2,
        }
    }
}

impl std::fmt::Display for PopupKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PopupKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "welcome" => Ok(PopupKind::Welcome),
            "urgency" => Ok(PopupKind::Urgency),
            "exit" => Ok(PopupKind::Exit),
            other => Err(format!("unknown popup kind: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceAction {
    Show,
    Hide,
}

/// Instruction for the rendering layer. The engine never touches markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceCommand {
    pub kind: PopupKind,
    pub action: SurfaceAction,
}

impl SurfaceCommand {
    pub fn show(kind: PopupKind) -> Self {
        Self {
            kind,
            action: SurfaceAction::Show,
        }
    }

    pub fn hide(kind: PopupKind) -> Self {
        Self {
            kind,
            action: SurfaceAction::Hide,
        }
    }
}
