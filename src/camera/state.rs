//! Control states, events and the transition timer.

/// Top-level operating state of the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControlState {
    /// Waiting for the device-info exchange
    #[default]
    Initializing,
    /// Features known, waiting out the boot settle delay
    Initialized,
    Ready,
    VideoRecording,
    EnteringMenu,
    InMenu,
    ExitingMenu,
}

impl ControlState {
    /// Whether a menu navigation sequence is in progress
    pub fn is_menu(self) -> bool {
        matches!(
            self,
            ControlState::EnteringMenu | ControlState::InMenu | ControlState::ExitingMenu
        )
    }
}

/// Abstract input to the state machine, derived from RC input or host calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    EnterMenu,
    ExitMenu,
    InMenuEnter,
    /// Only produced when the 5-key strategy is active
    InMenuRight,
    InMenuUp,
    InMenuDown,
    InMenuExit,
    ButtonRelease,
    StartRecording,
    StopRecording,
}

impl Event {
    /// Events that are still honoured while the vehicle is armed
    pub fn is_recording(self) -> bool {
        matches!(self, Event::StartRecording | Event::StopRecording)
    }
}

/// Deadline for the current button press or mode change, plus the held flag
///
/// While the deadline has not passed the state machine takes no new RC input.
/// The held flag stays set after a simulated press until the pilot re-centres
/// the sticks, so one stick gesture only ever produces one press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransitionTimer {
    start_ms: u32,
    timeout_ms: u32,
    button_held: bool,
}

impl TransitionTimer {
    /// Start a plain wait, e.g. the boot settle delay
    pub fn start(&mut self, now_ms: u32, timeout_ms: u32) {
        self.start_ms = now_ms;
        self.timeout_ms = timeout_ms;
    }

    /// Start a wait that also marks a simulated button as held
    pub fn press(&mut self, now_ms: u32, timeout_ms: u32) {
        self.start(now_ms, timeout_ms);
        self.button_held = true;
    }

    pub fn release(&mut self) {
        self.button_held = false;
    }

    pub fn button_held(&self) -> bool {
        self.button_held
    }

    pub fn elapsed(&self, now_ms: u32) -> bool {
        now_ms.wrapping_sub(self.start_ms) >= self.timeout_ms
    }

    /// Forget the current wait and release the button
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_initializing() {
        assert_eq!(ControlState::default(), ControlState::Initializing);
    }

    #[test]
    fn test_menu_states() {
        assert!(ControlState::EnteringMenu.is_menu());
        assert!(ControlState::InMenu.is_menu());
        assert!(ControlState::ExitingMenu.is_menu());
        assert!(!ControlState::Ready.is_menu());
        assert!(!ControlState::VideoRecording.is_menu());
    }

    #[test]
    fn test_recording_events() {
        assert!(Event::StartRecording.is_recording());
        assert!(Event::StopRecording.is_recording());
        assert!(!Event::EnterMenu.is_recording());
    }

    #[test]
    fn test_timer_elapses() {
        let mut timer = TransitionTimer::default();
        assert!(timer.elapsed(0));

        timer.start(1_000, 600);
        assert!(!timer.elapsed(1_599));
        assert!(timer.elapsed(1_600));
        assert!(!timer.button_held());
    }

    #[test]
    fn test_press_and_release() {
        let mut timer = TransitionTimer::default();
        timer.press(0, 300);
        assert!(timer.button_held());
        assert!(timer.elapsed(300));
        assert!(timer.button_held());

        timer.release();
        assert!(!timer.button_held());
    }

    #[test]
    fn test_timer_wraps() {
        let mut timer = TransitionTimer::default();
        timer.start(u32::MAX - 100, 600);
        assert!(!timer.elapsed(400));
        assert!(timer.elapsed(499));
    }

    #[test]
    fn test_clear() {
        let mut timer = TransitionTimer::default();
        timer.press(10, 1_000);
        timer.clear();
        assert!(!timer.button_held());
        assert!(timer.elapsed(10));
    }
}
