//! # Input-to-Event Mapper
//!
//! Turns the sampled stick positions and the arming state into at most one
//! [`Event`] per tick.
//!
//! ## Gestures
//!
//! All gestures need the throttle centred.
//!
//! | Stick | Outside the menu | Inside the menu |
//! |-------|------------------|-----------------|
//! | Yaw high | Enter menu | Enter / select |
//! | Yaw low | - | Exit menu |
//! | Roll low | - | Back (exit one level) |
//! | Roll high | - | Right (5-key) or enter (2-key) |
//! | Pitch high | - | Up |
//! | Pitch low | - | Down |
//!
//! A gesture fires once. Nothing else is produced until roll, pitch and yaw
//! are back in the middle, at which point a held simulated button is
//! released.
//!
//! ## Usage
//!
//! ```
//! use runcam_rcdevice::controller::{CentredSticks, EventMapper, MapperContext, StickMap};
//!
//! let mut mapper = EventMapper::new(StickMap::default(), true);
//! let event = mapper.map(&CentredSticks, false, MapperContext::default());
//! assert_eq!(event, None);
//! ```

use tracing::trace;

use super::rc_input::{RcInput, Sticks, StickMap, SwitchPosition};
use crate::camera::state::Event;

/// Driver state the mapper needs to interpret a gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MapperContext {
    /// A menu navigation sequence is in progress
    pub in_menu: bool,
    /// The 5-key strategy is active (roll right means "right", not "enter")
    pub five_key: bool,
    /// A simulated button is waiting to be released
    pub button_held: bool,
}

/// Stateful stick-gesture decoder
#[derive(Debug)]
pub struct EventMapper {
    map: StickMap,
    record_on_arm: bool,
    was_armed: bool,
    /// A gesture fired and the sticks have not been centred since
    latched: bool,
}

impl EventMapper {
    pub fn new(map: StickMap, record_on_arm: bool) -> Self {
        Self {
            map,
            record_on_arm,
            was_armed: false,
            latched: false,
        }
    }

    pub fn stick_map(&self) -> &StickMap {
        &self.map
    }

    /// Derive this tick's event, if any
    ///
    /// While armed only recording events come out, and only from arming
    /// edges when record-on-arm is enabled.
    pub fn map(&mut self, rc: &dyn RcInput, armed: bool, ctx: MapperContext) -> Option<Event> {
        if armed != self.was_armed {
            self.was_armed = armed;
            if self.record_on_arm {
                return Some(if armed {
                    Event::StartRecording
                } else {
                    Event::StopRecording
                });
            }
        }

        if armed {
            return None;
        }

        let sticks = Sticks::read(rc, &self.map);
        if sticks.centred() {
            self.latched = false;
            return ctx.button_held.then_some(Event::ButtonRelease);
        }

        if self.latched || ctx.button_held {
            return None;
        }

        let event = Self::gesture(&sticks, ctx)?;
        trace!("Stick gesture {:?} -> {:?}", sticks, event);
        self.latched = true;
        Some(event)
    }

    /// Forget any latched gesture
    pub fn reset(&mut self) {
        self.latched = false;
    }

    fn gesture(sticks: &Sticks, ctx: MapperContext) -> Option<Event> {
        use SwitchPosition::{High, Low};

        if sticks.throttle != SwitchPosition::Middle {
            return None;
        }

        if !ctx.in_menu {
            return (sticks.yaw == High).then_some(Event::EnterMenu);
        }

        match (sticks.yaw, sticks.roll, sticks.pitch) {
            (High, _, _) => Some(Event::InMenuEnter),
            (Low, _, _) => Some(Event::ExitMenu),
            (_, Low, _) => Some(Event::InMenuExit),
            (_, High, _) if ctx.five_key => Some(Event::InMenuRight),
            (_, High, _) => Some(Event::InMenuEnter),
            (_, _, High) => Some(Event::InMenuUp),
            (_, _, Low) => Some(Event::InMenuDown),
            _ => None,
        }
    }
}
