//! # OSD Menu Navigation
//!
//! The camera's on-screen menu cannot be read back, so the driver keeps its
//! own [`MenuCursor`] and moves it every time it sends a key, assuming the
//! camera follows. Two strategies exist:
//!
//! - **2-key**: only the power and mode buttons are simulated. The power
//!   button cycles through the entries of the current level, the mode button
//!   selects, and a change-mode press backs out.
//! - **5-key**: a joystick is simulated over the OSD cable sub-protocol,
//!   with an explicit connection that is opened on entry and closed on exit.
//!   Moves past either end of a level are refused before anything is sent.
//!
//! ## Menu layout
//!
//! | Slot | Top menu | Sub-menu entries |
//! |------|----------|------------------|
//! | 0 | Video | 5 |
//! | 1 | Image | 8 |
//! | 2 | TV-Out | 3 |
//! | 3 | Micro SD card | 3 |
//! | 4 | General | 7 |
//! | 5 | Save & Exit | - |

use tracing::debug;

use super::profile::{DeviceProfile, Features};
use super::state::Event;
use crate::protocol::types::{ConnectionOperation, ControlOperation, SimulationOperation};

/// Entries in the top-level menu, Save & Exit included
pub const TOP_MENU_LENGTH: usize = 6;

/// Entries in each sub-menu, indexed by top-menu slot
pub const SUB_MENU_LENGTHS: [u8; 5] = [5, 8, 3, 3, 7];

/// Top-menu slot that saves the settings and leaves the menu
pub const SAVE_AND_EXIT_POSITION: i8 = (TOP_MENU_LENGTH - 1) as i8;

/// Where the driver believes the camera's menu cursor is
///
/// `depth` 0 is the top-level menu, 1 is inside the sub-menu of
/// `top_position`. A `top_position` of -1 means nothing is selected yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuCursor {
    top_position: i8,
    sub_position: u8,
    depth: u8,
}

impl Default for MenuCursor {
    fn default() -> Self {
        Self {
            top_position: -1,
            sub_position: 0,
            depth: 0,
        }
    }
}

impl MenuCursor {
    pub fn top_position(&self) -> i8 {
        self.top_position
    }

    pub fn sub_position(&self) -> u8 {
        self.sub_position
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Length of the sub-menu under the selected top entry, if it has one
    pub fn sub_menu_length(&self) -> Option<u8> {
        usize::try_from(self.top_position)
            .ok()
            .and_then(|top| SUB_MENU_LENGTHS.get(top).copied())
    }

    pub fn on_save_and_exit(&self) -> bool {
        self.depth == 0 && self.top_position == SAVE_AND_EXIT_POSITION
    }

    /// Whether the last entry of the current sub-menu is selected
    pub fn on_last_sub_entry(&self) -> bool {
        self.depth > 0
            && self
                .sub_menu_length()
                .is_some_and(|len| self.sub_position + 1 == len)
    }

    /// Advance one entry, wrapping at the end of the level (2-key cycling)
    pub fn cycle(&mut self) {
        if self.depth == 0 {
            self.top_position = (self.top_position + 1).rem_euclid(TOP_MENU_LENGTH as i8);
        } else if let Some(len) = self.sub_menu_length() {
            self.sub_position = (self.sub_position + 1) % len;
        }
    }

    /// Move one entry down; false (and no change) at the end of the level
    pub fn move_down(&mut self) -> bool {
        if self.depth == 0 {
            if (self.top_position + 1) as usize >= TOP_MENU_LENGTH {
                return false;
            }
            self.top_position += 1;
            return true;
        }

        match self.sub_menu_length() {
            Some(len) if self.sub_position + 1 < len => {
                self.sub_position += 1;
                true
            }
            _ => false,
        }
    }

    /// Move one entry up; false (and no change) at the start of the level
    pub fn move_up(&mut self) -> bool {
        if self.depth == 0 {
            if self.top_position <= 0 {
                return false;
            }
            self.top_position -= 1;
            return true;
        }

        if self.sub_position == 0 {
            return false;
        }
        self.sub_position -= 1;
        true
    }

    /// Enter the sub-menu of the selected top entry
    pub fn descend(&mut self) -> bool {
        if self.depth > 0 || self.sub_menu_length().is_none() {
            return false;
        }
        self.depth = 1;
        self.sub_position = 0;
        true
    }

    /// Back out of a sub-menu to the top level
    pub fn ascend(&mut self) -> bool {
        if self.depth == 0 {
            return false;
        }
        self.depth = 0;
        self.sub_position = 0;
        true
    }
}

/// A protocol action requested by a navigation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuCommand {
    /// Camera-control button press (2-key), never acknowledged
    Button(ControlOperation),
    /// Open or close the 5-key connection
    Connection(ConnectionOperation),
    /// Press a 5-key joystick direction
    Press(SimulationOperation),
    /// Release the pressed 5-key direction
    Release,
}

/// What a navigation event turned into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// Send this and stay in the menu
    Send(MenuCommand),
    /// Send this to leave the menu
    Leave(MenuCommand),
    /// The move would leave the menu table; nothing is sent
    Rejected,
    /// The event means nothing to this strategy
    Ignored,
}

/// Menu navigation algorithm, chosen once after negotiation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuStrategy {
    TwoKey,
    FiveKey,
}

impl MenuStrategy {
    /// Pick the strategy the camera supports, preferring the 5-key cable
    pub fn select(profile: &DeviceProfile) -> Option<Self> {
        if profile.has(Features::SIMULATE_5_KEY_OSD_CABLE) {
            Some(MenuStrategy::FiveKey)
        } else if profile.has(Features::SIMULATE_POWER_BUTTON | Features::SIMULATE_MODE_BUTTON) {
            Some(MenuStrategy::TwoKey)
        } else {
            None
        }
    }

    pub fn enter_command(self) -> MenuCommand {
        match self {
            MenuStrategy::TwoKey => MenuCommand::Button(ControlOperation::ChangeMode),
            MenuStrategy::FiveKey => MenuCommand::Connection(ConnectionOperation::Open),
        }
    }

    pub fn exit_command(self) -> MenuCommand {
        match self {
            MenuStrategy::TwoKey => MenuCommand::Button(ControlOperation::ChangeMode),
            MenuStrategy::FiveKey => MenuCommand::Connection(ConnectionOperation::Close),
        }
    }

    /// Turn an in-menu event into a protocol action, moving the cursor
    ///
    /// The cursor is only moved when something will be sent.
    pub fn navigate(self, event: Event, cursor: &mut MenuCursor) -> Navigation {
        let navigation = match self {
            MenuStrategy::TwoKey => Self::navigate_two_key(self, event, cursor),
            MenuStrategy::FiveKey => Self::navigate_five_key(self, event, cursor),
        };
        debug!(
            "{:?} {:?} -> {:?} (top {}, sub {}, depth {})",
            self,
            event,
            navigation,
            cursor.top_position,
            cursor.sub_position,
            cursor.depth
        );
        navigation
    }

    fn navigate_two_key(self, event: Event, cursor: &mut MenuCursor) -> Navigation {
        let mode_button = MenuCommand::Button(ControlOperation::SimulateModeButton);

        match event {
            Event::InMenuUp | Event::InMenuDown => {
                cursor.cycle();
                Navigation::Send(MenuCommand::Button(ControlOperation::SimulatePowerButton))
            }
            Event::InMenuEnter => {
                if cursor.on_save_and_exit() {
                    // The camera leaves the menu on its own
                    Navigation::Leave(mode_button)
                } else if cursor.on_last_sub_entry() {
                    cursor.ascend();
                    Navigation::Send(mode_button)
                } else if cursor.depth > 0 || cursor.descend() {
                    Navigation::Send(mode_button)
                } else {
                    Navigation::Rejected
                }
            }
            Event::InMenuExit => {
                if cursor.ascend() {
                    Navigation::Send(MenuCommand::Button(ControlOperation::ChangeMode))
                } else {
                    Navigation::Leave(self.exit_command())
                }
            }
            Event::ExitMenu => Navigation::Leave(self.exit_command()),
            _ => Navigation::Ignored,
        }
    }

    fn navigate_five_key(self, event: Event, cursor: &mut MenuCursor) -> Navigation {
        match event {
            Event::InMenuUp => {
                if cursor.move_up() {
                    Navigation::Send(MenuCommand::Press(SimulationOperation::Up))
                } else {
                    Navigation::Rejected
                }
            }
            Event::InMenuDown => {
                if cursor.move_down() {
                    Navigation::Send(MenuCommand::Press(SimulationOperation::Down))
                } else {
                    Navigation::Rejected
                }
            }
            Event::InMenuEnter | Event::InMenuRight => {
                let key = if event == Event::InMenuRight {
                    SimulationOperation::Right
                } else {
                    SimulationOperation::Set
                };

                if cursor.on_save_and_exit() {
                    // Closing the connection leaves the menu
                    Navigation::Leave(self.exit_command())
                } else if cursor.depth > 0 || cursor.descend() {
                    Navigation::Send(MenuCommand::Press(key))
                } else {
                    Navigation::Rejected
                }
            }
            Event::InMenuExit => {
                if cursor.ascend() {
                    Navigation::Send(MenuCommand::Press(SimulationOperation::Left))
                } else {
                    Navigation::Leave(self.exit_command())
                }
            }
            Event::ExitMenu => Navigation::Leave(self.exit_command()),
            _ => Navigation::Ignored,
        }
    }
}
