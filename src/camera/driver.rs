//! # RunCam Driver
//!
//! Owns the transport and every piece of protocol state, and is advanced by
//! calling [`RunCam::update`] from the host's control loop. Nothing here
//! blocks: all waiting is a comparison against the transition timer or the
//! pending request's deadline on a later tick.
//!
//! Each tick runs in a fixed order:
//!
//! 1. drain received bytes into the pending request, handling its completion
//! 2. stop if a request is still in flight or the transition timer runs
//! 3. finish timed transitions (boot settle, menu entry and exit)
//! 4. take one event (the pending host command first, then RC input)
//! 5. dispatch it on the current [`ControlState`]
//!
//! ## Usage
//!
//! ```
//! use runcam_rcdevice::camera::{CameraSettings, RunCam};
//! use runcam_rcdevice::controller::CentredSticks;
//! use runcam_rcdevice::osd::LoggingOsd;
//! use runcam_rcdevice::serial::MockTransport;
//!
//! let mut camera = RunCam::new(MockTransport::new(), CameraSettings::default());
//! let mut osd = LoggingOsd::new();
//! camera.init(0)?;
//! camera.update(20, &CentredSticks, false, &mut osd);
//! assert!(camera.pre_arm_check().is_err());
//! # Ok::<(), runcam_rcdevice::error::RunCamError>(())
//! ```


use tracing::{debug, info, trace, warn};

use super::menu::{MenuCommand, MenuCursor, MenuStrategy, Navigation};
use super::profile::{DeviceProfile, FeatureOverride, Features};
use super::request::{Completion, RequestManager};
use super::state::{ControlState, Event, TransitionTimer};
use crate::controller::{EventMapper, MapperContext, RcInput, StickMap};
use crate::error::{PreArmFailure, Result, RunCamError};
use crate::osd::OsdControl;
use crate::protocol::decoder::{
    parse_connection, parse_device_info, parse_key_ack, Response, ResponseParser,
};
use crate::protocol::types::{
    Command, ConnectionOperation, ControlOperation, FIVE_KEY_MAX_RETRIES, FIVE_KEY_TIMEOUT_MS,
    RUNCAM_MODE_DELAY_MS,
};
use crate::serial::Transport;

/// Driver tunables, normally loaded from the configuration file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraSettings {
    pub overrides: FeatureOverride,
    /// Device-info attempts before giving up
    pub init_attempts: u16,
    /// Wait for each device-info attempt
    pub init_attempt_interval_ms: u32,
    /// Time from `init` until the camera is assumed to have booted
    pub boot_delay_ms: u32,
    /// How long a simulated button press is held
    pub button_delay_ms: u32,
    pub record_on_arm: bool,
    pub stop_recording_at_boot: bool,
    pub sticks: StickMap,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            overrides: FeatureOverride::default(),
            init_attempts: 4,
            init_attempt_interval_ms: 5_000,
            boot_delay_ms: 7_000,
            button_delay_ms: 300,
            record_on_arm: true,
            stop_recording_at_boot: true,
            sticks: StickMap::default(),
        }
    }
}

/// The camera feature a camera-control operation needs
pub fn required_feature(operation: ControlOperation) -> Features {
    match operation {
        ControlOperation::SimulateModeButton => Features::SIMULATE_MODE_BUTTON,
        ControlOperation::SimulatePowerButton => Features::SIMULATE_POWER_BUTTON,
        ControlOperation::ChangeMode => Features::CHANGE_MODE,
        ControlOperation::StartRecording => Features::START_RECORDING,
        ControlOperation::StopRecording => Features::STOP_RECORDING,
    }
}

/// RunCam device driver
pub struct RunCam<T: Transport> {
    transport: T,
    settings: CameraSettings,
    requests: RequestManager,
    profile: DeviceProfile,
    state: ControlState,
    strategy: Option<MenuStrategy>,
    cursor: MenuCursor,
    /// Cursor as of the last key the camera acknowledged
    confirmed_cursor: MenuCursor,
    timer: TransitionTimer,
    mapper: EventMapper,
    /// Latest host command, taken ahead of RC input outside the menu
    pending_command: Option<Event>,
}

impl<T: Transport> std::fmt::Debug for RunCam<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunCam")
            .field("state", &self.state)
            .field("profile", &self.profile)
            .field("strategy", &self.strategy)
            .field("cursor", &self.cursor)
            .field("pending", &self.requests.pending())
            .finish_non_exhaustive()
    }
}

impl<T: Transport> RunCam<T> {
    pub fn new(transport: T, settings: CameraSettings) -> Self {
        Self {
            transport,
            mapper: EventMapper::new(settings.sticks, settings.record_on_arm),
            settings,
            requests: RequestManager::new(),
            profile: DeviceProfile::default(),
            state: ControlState::Initializing,
            strategy: None,
            cursor: MenuCursor::default(),
            confirmed_cursor: MenuCursor::default(),
            timer: TransitionTimer::default(),
            pending_command: None,
        }
    }

    /// Start (or restart) capability negotiation
    ///
    /// Forgets everything learned about the camera, starts the boot settle
    /// timer and sends the first device-info request. The request is retried
    /// until `init_attempts` have been made.
    ///
    /// # Errors
    ///
    /// Returns [`RunCamError::Io`] if the request cannot be written. The
    /// driver then stays in [`ControlState::Initializing`].
    pub fn init(&mut self, now_ms: u32) -> Result<()> {
        self.requests = RequestManager::new();
        self.profile = DeviceProfile::default();
        self.strategy = None;
        self.cursor.reset();
        self.confirmed_cursor.reset();
        self.pending_command = None;
        self.mapper.reset();
        self.state = ControlState::Initializing;
        self.timer.clear();
        self.timer.start(now_ms, self.settings.boot_delay_ms);

        let attempts = self.settings.init_attempts.max(1);
        info!(
            "Probing RunCam device ({} attempts, {} ms apart)",
            attempts, self.settings.init_attempt_interval_ms
        );
        self.requests.issue(
            &mut self.transport,
            now_ms,
            Command::GetDeviceInfo,
            0,
            self.settings.init_attempt_interval_ms,
            attempts - 1,
            parse_device_info,
        )
    }

    /// Advance the driver by one tick
    ///
    /// `rc` supplies the stick positions, `armed` the vehicle's arming state
    /// and `osd` is hidden while the camera menu is open.
    pub fn update(&mut self, now_ms: u32, rc: &dyn RcInput, armed: bool, osd: &mut dyn OsdControl) {
        if let Some(completion) = self.requests.poll(&mut self.transport, now_ms) {
            self.handle_completion(completion, now_ms, osd);
        }

        if self.requests.is_pending() || !self.timer.elapsed(now_ms) {
            return;
        }

        match self.state {
            ControlState::Initializing => return,
            ControlState::Initialized => {
                self.finish_boot(now_ms);
                return;
            }
            ControlState::EnteringMenu => self.set_state(ControlState::InMenu),
            ControlState::ExitingMenu => self.finish_exit(osd),
            _ => {}
        }

        let ctx = MapperContext {
            in_menu: self.state.is_menu(),
            five_key: self.strategy == Some(MenuStrategy::FiveKey),
            button_held: self.timer.button_held(),
        };
        // Host commands wait out the menu
        let host = if ctx.in_menu {
            None
        } else {
            self.pending_command.take()
        };
        let event = host.or_else(|| self.mapper.map(rc, armed, ctx));

        if let Some(event) = event {
            self.handle_event(event, now_ms, armed, osd);
        }
    }

    /// Ask for recording to start on the next free tick
    ///
    /// Replaces any host command not yet acted on. The command waits while
    /// negotiation runs or the camera menu is open.
    ///
    /// # Errors
    ///
    /// Returns [`RunCamError::CapabilityAbsent`] if the camera is known to
    /// support neither the start-recording operation nor the power button.
    pub fn start_recording(&mut self) -> Result<()> {
        self.check_recording_support(Features::START_RECORDING)?;
        self.pending_command = Some(Event::StartRecording);
        Ok(())
    }

    /// Ask for recording to stop on the next free tick
    ///
    /// # Errors
    ///
    /// Same as [`RunCam::start_recording`], for the stop-recording operation.
    pub fn stop_recording(&mut self) -> Result<()> {
        self.check_recording_support(Features::STOP_RECORDING)?;
        self.pending_command = Some(Event::StopRecording);
        Ok(())
    }

    /// Send a single camera-control operation right away
    ///
    /// # Errors
    ///
    /// - [`RunCamError::CapabilityAbsent`] if the camera lacks the feature
    /// - [`RunCamError::RequestPending`] if a request is in flight
    pub fn simulate_camera_button(&mut self, operation: ControlOperation) -> Result<()> {
        self.profile.require(required_feature(operation))?;
        self.requests
            .send_unacknowledged(&mut self.transport, Command::CameraControl, operation as u8)
    }

    /// Whether the vehicle may arm, and why not
    pub fn pre_arm_check(&self) -> std::result::Result<(), PreArmFailure> {
        if self.state == ControlState::Initializing {
            return Err(PreArmFailure::CameraNotReady);
        }
        if self.state.is_menu() {
            return Err(PreArmFailure::InMenu);
        }
        Ok(())
    }

    pub fn is_ready_to_arm(&self) -> bool {
        self.pre_arm_check().is_ok()
    }

    pub fn state(&self) -> ControlState {
        self.state
    }

    /// Host command waiting for the next free tick
    pub fn pending_command(&self) -> Option<Event> {
        self.pending_command
    }

    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    pub fn strategy(&self) -> Option<MenuStrategy> {
        self.strategy
    }

    pub fn cursor(&self) -> &MenuCursor {
        &self.cursor
    }

    pub fn settings(&self) -> &CameraSettings {
        &self.settings
    }

    pub fn requests(&self) -> &RequestManager {
        &self.requests
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    fn set_state(&mut self, state: ControlState) {
        if self.state != state {
            info!("RunCam state {:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }

    fn check_recording_support(&self, feature: Features) -> Result<()> {
        if self.profile.is_negotiated()
            && !self.profile.has(feature)
            && !self.profile.has(Features::SIMULATE_POWER_BUTTON)
        {
            return Err(RunCamError::CapabilityAbsent(feature));
        }
        Ok(())
    }

    /// Settle time after sending a camera-control operation
    fn settle_time(&self, operation: ControlOperation) -> u32 {
        match operation {
            ControlOperation::SimulatePowerButton => self.settings.button_delay_ms,
            _ => RUNCAM_MODE_DELAY_MS,
        }
    }

    fn handle_completion(&mut self, completion: Completion, now_ms: u32, osd: &mut dyn OsdControl) {
        let Completion {
            command,
            param,
            result,
        } = completion;

        match command {
            Command::GetDeviceInfo => self.handle_device_info(result),
            Command::FiveKeyConnection if param == ConnectionOperation::Open as u8 => match result {
                Ok(Response::Connection(c))
                    if c.success && c.operation == Some(ConnectionOperation::Open) =>
                {
                    self.confirmed_cursor = self.cursor;
                    self.set_state(ControlState::InMenu);
                }
                Ok(response) => {
                    warn!("Camera refused the 5-key connection: {:?}", response);
                    self.abandon_menu(osd);
                }
                Err(e) => {
                    warn!("Failed to open the 5-key connection: {}", e);
                    self.abandon_menu(osd);
                }
            },
            Command::FiveKeyConnection => {
                if let Err(e) = result {
                    // The camera leaves its menu when the link drops anyway
                    debug!("Ignoring failed 5-key close: {}", e);
                }
                self.finish_exit(osd);
            }
            Command::FiveKeySimulationPress => match result {
                Ok(_) => {
                    self.confirmed_cursor = self.cursor;
                    self.timer.press(now_ms, self.settings.button_delay_ms);
                }
                Err(e) => {
                    warn!("5-key press failed: {}", e);
                    self.cursor = self.confirmed_cursor;
                    self.abandon_menu(osd);
                }
            },
            Command::FiveKeySimulationRelease => {
                if let Err(e) = result {
                    warn!("5-key release failed: {}", e);
                }
            }
            Command::CameraControl => {
                trace!("Unexpected completion for camera control");
            }
        }
    }

    fn handle_device_info(&mut self, result: Result<Response>) {
        let info = match result {
            Ok(Response::DeviceInfo(info)) => info,
            Ok(other) => {
                warn!("Unexpected response to device info: {:?}", other);
                return;
            }
            Err(e) => {
                warn!("RunCam device not found: {}", e);
                return;
            }
        };

        if self.profile.negotiate(&info, &self.settings.overrides).is_err() {
            return;
        }

        self.strategy = MenuStrategy::select(&self.profile);
        match self.strategy {
            Some(strategy) => info!("OSD menu navigation: {:?}", strategy),
            None => info!("OSD menu navigation not supported by this camera"),
        }
        self.set_state(ControlState::Initialized);
    }

    /// Boot settle delay has passed
    fn finish_boot(&mut self, now_ms: u32) {
        if self.settings.stop_recording_at_boot && self.profile.has(Features::STOP_RECORDING) {
            // Some cameras power up recording
            match self.requests.send_unacknowledged(
                &mut self.transport,
                Command::CameraControl,
                ControlOperation::StopRecording as u8,
            ) {
                Ok(()) => self.timer.start(now_ms, RUNCAM_MODE_DELAY_MS),
                Err(e) => warn!("Failed to stop recording at boot: {}", e),
            }
        }
        self.set_state(ControlState::Ready);
    }

    fn handle_event(&mut self, event: Event, now_ms: u32, armed: bool, osd: &mut dyn OsdControl) {
        if armed && !event.is_recording() {
            trace!("Dropping {:?} while armed", event);
            return;
        }

        if event == Event::ButtonRelease {
            self.release_button(now_ms);
            return;
        }

        match (self.state, event) {
            (ControlState::Ready, Event::StartRecording) => {
                if let Err(e) = self.record(now_ms, true) {
                    warn!("Cannot start recording: {}", e);
                }
            }
            (ControlState::Ready, Event::EnterMenu) => {
                if let Err(e) = self.enter_menu(now_ms, osd) {
                    warn!("Cannot enter the camera menu: {}", e);
                }
            }
            (ControlState::VideoRecording, Event::StopRecording) => {
                if let Err(e) = self.record(now_ms, false) {
                    warn!("Cannot stop recording: {}", e);
                }
            }
            (ControlState::VideoRecording, Event::EnterMenu) => {
                if self.strategy.is_none() {
                    warn!("Cannot enter the camera menu: no navigation support");
                    return;
                }
                match self.record(now_ms, false) {
                    // Enter once the mode change has settled
                    Ok(()) => self.pending_command = Some(Event::EnterMenu),
                    Err(e) => warn!("Cannot stop recording before entering the menu: {}", e),
                }
            }
            (ControlState::InMenu, _) => self.navigate(event, now_ms, osd),
            (state, event) => trace!("Ignoring {:?} in {:?}", event, state),
        }
    }

    fn record(&mut self, now_ms: u32, start: bool) -> Result<()> {
        let (operation, feature) = if start {
            (ControlOperation::StartRecording, Features::START_RECORDING)
        } else {
            (ControlOperation::StopRecording, Features::STOP_RECORDING)
        };

        let operation = if self.profile.has(feature) {
            operation
        } else if self.profile.has(Features::SIMULATE_POWER_BUTTON) {
            ControlOperation::SimulatePowerButton
        } else {
            return Err(RunCamError::CapabilityAbsent(feature));
        };

        self.requests
            .send_unacknowledged(&mut self.transport, Command::CameraControl, operation as u8)?;
        self.timer.start(now_ms, self.settle_time(operation));
        self.set_state(if start {
            ControlState::VideoRecording
        } else {
            ControlState::Ready
        });
        Ok(())
    }

    fn enter_menu(&mut self, now_ms: u32, osd: &mut dyn OsdControl) -> Result<()> {
        let strategy = self.strategy.ok_or(RunCamError::CapabilityAbsent(
            Features::SIMULATE_5_KEY_OSD_CABLE,
        ))?;

        osd.disable();
        if let Err(e) = self.send_menu_command(strategy.enter_command(), now_ms) {
            osd.enable();
            return Err(e);
        }
        self.set_state(ControlState::EnteringMenu);
        Ok(())
    }

    fn navigate(&mut self, event: Event, now_ms: u32, osd: &mut dyn OsdControl) {
        let Some(strategy) = self.strategy else {
            return;
        };

        let before = self.cursor;
        match strategy.navigate(event, &mut self.cursor) {
            Navigation::Send(command) => {
                if let Err(e) = self.send_menu_command(command, now_ms) {
                    warn!("Menu navigation failed: {}", e);
                    self.cursor = before;
                    self.abandon_menu(osd);
                }
            }
            Navigation::Leave(command) => {
                self.set_state(ControlState::ExitingMenu);
                if let Err(e) = self.send_menu_command(command, now_ms) {
                    debug!("Leaving the menu without {:?}: {}", command, e);
                    self.finish_exit(osd);
                }
            }
            Navigation::Rejected => debug!("{:?} rejected at the edge of the menu", event),
            Navigation::Ignored => trace!("Ignoring {:?} in the menu", event),
        }
    }

    fn release_button(&mut self, now_ms: u32) {
        if !self.timer.button_held() {
            return;
        }
        self.timer.release();

        if self.state == ControlState::InMenu && self.strategy == Some(MenuStrategy::FiveKey) {
            if let Err(e) = self.send_menu_command(MenuCommand::Release, now_ms) {
                warn!("Failed to release the 5-key button: {}", e);
            }
        }
    }

    fn send_menu_command(&mut self, command: MenuCommand, now_ms: u32) -> Result<()> {
        let (command_id, param, parser): (Command, u8, ResponseParser) = match command {
            MenuCommand::Button(operation) => {
                self.requests.send_unacknowledged(
                    &mut self.transport,
                    Command::CameraControl,
                    operation as u8,
                )?;
                self.timer.press(now_ms, self.settle_time(operation));
                return Ok(());
            }
            MenuCommand::Connection(operation) => {
                (Command::FiveKeyConnection, operation as u8, parse_connection)
            }
            MenuCommand::Press(key) => (Command::FiveKeySimulationPress, key as u8, parse_key_ack),
            MenuCommand::Release => (Command::FiveKeySimulationRelease, 0, parse_key_ack),
        };

        self.requests.issue(
            &mut self.transport,
            now_ms,
            command_id,
            param,
            FIVE_KEY_TIMEOUT_MS,
            FIVE_KEY_MAX_RETRIES,
            parser,
        )
    }

    /// Give up on menu navigation and hand the screen back
    fn abandon_menu(&mut self, osd: &mut dyn OsdControl) {
        warn!("Abandoning camera menu navigation");
        self.timer.clear();
        osd.enable();
        self.set_state(ControlState::Ready);
    }

    fn finish_exit(&mut self, osd: &mut dyn OsdControl) {
        self.cursor.reset();
        self.confirmed_cursor.reset();
        self.timer.clear();
        osd.enable();
        self.set_state(ControlState::Ready);
    }
}
