use rpa_agent_core::{GlobalAction, NodeAction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
}

impl ScrollDirection {
    /// Scrolling up moves the content backward.
    pub fn node_action(&self) -> NodeAction {
        match self {
            ScrollDirection::Up => NodeAction::ScrollBackward,
            ScrollDirection::Down => NodeAction::ScrollForward,
        }
    }

    pub fn as_command(&self) -> &'static str {
        match self {
            ScrollDirection::Up => "scrollUp",
            ScrollDirection::Down => "scrollDown",
        }
    }
}

/// One controller instruction, classified from a single line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ping,
    Global(GlobalAction),
    Scroll(ScrollDirection),
    GetFullUi,
    ClickBackButton,
    /// Anything outside the fixed vocabulary: click the node showing this text.
    FindAndClick(String),
}

impl Command {
    /// Classifies a line by exact match against the fixed vocabulary.
    ///
    /// Unrecognised text is never an error; it becomes a find-and-click
    /// target so that typos surface as "not found in UI" responses.
    pub fn classify(line: &str) -> Self {
        match line {
            "ping" => Command::Ping,
            "goHome" => Command::Global(GlobalAction::Home),
            "goBack" => Command::Global(GlobalAction::Back),
            "showRecents" => Command::Global(GlobalAction::Recents),
            "scrollUp" => Command::Scroll(ScrollDirection::Up),
            "scrollDown" => Command::Scroll(ScrollDirection::Down),
            "getFullUI" => Command::GetFullUi,
            "clickBackButton" => Command::ClickBackButton,
            other => Command::FindAndClick(other.to_string()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Ping => "ping",
            Command::Global(_) => "global_action",
            Command::Scroll(_) => "scroll",
            Command::GetFullUi => "get_full_ui",
            Command::ClickBackButton => "click_back_button",
            Command::FindAndClick(_) => "find_and_click",
        }
    }
}
