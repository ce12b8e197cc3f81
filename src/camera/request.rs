//! Request lifecycle: one outstanding request, its response, retries and timeout.
//!
//! The manager owns the only receive buffer. A request is written, then every
//! [`RequestManager::poll`] pulls the bytes that have arrived until the
//! response length for that command is reached. A bad CRC and a timeout are
//! handled the same way: the frame is re-sent straight away while retries
//! remain, and the request fails with [`RunCamError::RetryExhausted`] once they
//! are used up.

use tracing::{debug, trace, warn};

use crate::error::{Result, RunCamError};
use crate::protocol::decoder::{Response, ResponseParser};
use crate::protocol::encoder::{encode_request, verify_frame};
use crate::protocol::types::{Command, RUNCAM_HEADER, RUNCAM_MAX_PACKET_SIZE};
use crate::serial::Transport;

/// Status of the current (or most recent) request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestStatus {
    #[default]
    None,
    Pending,
    Success,
    BadCrc,
    TimedOut,
}

/// The single outstanding protocol transaction
#[derive(Clone, Copy)]
pub struct PendingRequest {
    command: Command,
    param: u8,
    expected_len: usize,
    retries: u16,
    max_retries: u16,
    timeout_ms: u32,
    sent_at_ms: u32,
    status: RequestStatus,
    parser: ResponseParser,
}

impl std::fmt::Debug for PendingRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingRequest")
            .field("command", &self.command)
            .field("param", &self.param)
            .field("retries", &self.retries)
            .field("max_retries", &self.max_retries)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl PendingRequest {
    pub fn command(&self) -> Command {
        self.command
    }

    pub fn param(&self) -> u8 {
        self.param
    }

    /// Retries used so far
    pub fn retries(&self) -> u16 {
        self.retries
    }

    pub fn max_retries(&self) -> u16 {
        self.max_retries
    }

    pub fn status(&self) -> RequestStatus {
        self.status
    }

    fn deadline_passed(&self, now_ms: u32) -> bool {
        now_ms.wrapping_sub(self.sent_at_ms) >= self.timeout_ms
    }
}

/// A request that has reached a terminal state
#[derive(Debug)]
pub struct Completion {
    pub command: Command,
    pub param: u8,
    pub result: Result<Response>,
}

/// Tracks the single in-flight request and its receive buffer
#[derive(Debug)]
pub struct RequestManager {
    pending: Option<PendingRequest>,
    recv_buf: [u8; RUNCAM_MAX_PACKET_SIZE],
    recv_len: usize,
    last_status: RequestStatus,
}

impl Default for RequestManager {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestManager {
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: None,
            recv_buf: [0u8; RUNCAM_MAX_PACKET_SIZE],
            recv_len: 0,
            last_status: RequestStatus::None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<&PendingRequest> {
        self.pending.as_ref()
    }

    /// Status of the last request that was issued
    pub fn last_status(&self) -> RequestStatus {
        self.pending.map(|p| p.status).unwrap_or(self.last_status)
    }

    /// Send a request and wait (across polls) for its response
    ///
    /// Stale input is discarded before the frame goes out so that leftovers
    /// of an earlier exchange cannot be mistaken for the answer.
    ///
    /// # Errors
    ///
    /// - [`RunCamError::RequestPending`] if another request is outstanding;
    ///   nothing is written in that case
    /// - [`RunCamError::Io`] if the frame could not be written
    #[allow(clippy::too_many_arguments)]
    pub fn issue<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        now_ms: u32,
        command: Command,
        param: u8,
        timeout_ms: u32,
        max_retries: u16,
        parser: ResponseParser,
    ) -> Result<()> {
        self.check_idle(command)?;

        transport.discard_input()?;
        Self::write_frame(transport, command, param)?;

        self.recv_len = 0;
        self.pending = Some(PendingRequest {
            command,
            param,
            expected_len: command.response_length().min(RUNCAM_MAX_PACKET_SIZE),
            retries: 0,
            max_retries,
            timeout_ms,
            sent_at_ms: now_ms,
            status: RequestStatus::Pending,
            parser,
        });
        self.last_status = RequestStatus::Pending;
        Ok(())
    }

    /// Send a command the camera never answers (camera control)
    ///
    /// Still refused while a request is outstanding, so the link only ever
    /// carries one transaction.
    pub fn send_unacknowledged<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        command: Command,
        param: u8,
    ) -> Result<()> {
        self.check_idle(command)?;
        Self::write_frame(transport, command, param)
    }

    /// Advance the pending request
    ///
    /// Returns a [`Completion`] when the request succeeded, its response could
    /// not be parsed, or its retries ran out. Returns `None` while it is still
    /// in flight and when nothing is pending.
    pub fn poll<T: Transport + ?Sized>(&mut self, transport: &mut T, now_ms: u32) -> Option<Completion> {
        let Some(mut request) = self.pending else {
            // Nobody is waiting for these bytes
            if let Err(e) = transport.discard_input() {
                trace!("Failed to discard idle input: {}", e);
            }
            return None;
        };

        if self.receive(transport, &request) {
            let frame = &self.recv_buf[..self.recv_len];
            if verify_frame(frame) {
                request.status = RequestStatus::Success;
                let result = (request.parser)(frame);
                debug!("Response to {:?}: {:02X?}", request.command, frame);
                return Some(self.finish(request, result));
            }

            debug!(
                "Bad CRC in response to {:?}: {:02X?}",
                request.command, frame
            );
            request.status = RequestStatus::BadCrc;
            return self.retry_or_fail(transport, request, now_ms);
        }

        if request.deadline_passed(now_ms) {
            debug!(
                "{:?} timed out after {} ms ({} of {} bytes)",
                request.command, request.timeout_ms, self.recv_len, request.expected_len
            );
            request.status = RequestStatus::TimedOut;
            return self.retry_or_fail(transport, request, now_ms);
        }

        None
    }

    fn check_idle(&self, requested: Command) -> Result<()> {
        match self.pending {
            Some(pending) => {
                warn!(
                    "Refusing {:?}: {:?} still waiting for a response",
                    requested, pending.command
                );
                Err(RunCamError::RequestPending {
                    requested,
                    pending: pending.command,
                })
            }
            None => Ok(()),
        }
    }

    fn write_frame<T: Transport + ?Sized>(transport: &mut T, command: Command, param: u8) -> Result<()> {
        let frame = encode_request(command, param);
        transport.write(&frame)?;
        debug!("Sent {:?} frame: {:02X?}", command, frame);
        Ok(())
    }

    /// Pull available bytes into the receive buffer; true once the frame is complete
    fn receive<T: Transport + ?Sized>(&mut self, transport: &mut T, request: &PendingRequest) -> bool {
        let mut chunk = [0u8; RUNCAM_MAX_PACKET_SIZE];

        while self.recv_len < request.expected_len {
            let wanted = request.expected_len - self.recv_len;
            let n = match transport.read(&mut chunk[..wanted]) {
                Ok(n) => n,
                Err(e) => {
                    debug!("Read error while waiting for {:?}: {}", request.command, e);
                    0
                }
            };
            if n == 0 {
                break;
            }

            for &byte in &chunk[..n] {
                // Resynchronise on the header byte
                if self.recv_len == 0 && byte != RUNCAM_HEADER {
                    continue;
                }
                self.recv_buf[self.recv_len] = byte;
                self.recv_len += 1;
            }
        }

        request.expected_len > 0 && self.recv_len >= request.expected_len
    }

    fn retry_or_fail<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        mut request: PendingRequest,
        now_ms: u32,
    ) -> Option<Completion> {
        let cause = match request.status {
            RequestStatus::BadCrc => RunCamError::ProtocolFraming {
                command: request.command,
            },
            _ => RunCamError::Timeout {
                command: request.command,
            },
        };

        if request.retries < request.max_retries {
            request.retries += 1;
            debug!(
                "{}, retrying ({}/{})",
                cause, request.retries, request.max_retries
            );

            if let Err(e) = transport.discard_input() {
                trace!("Failed to discard input before retry: {}", e);
            }
            if let Err(e) = Self::write_frame(transport, request.command, request.param) {
                // Counts as an attempt; the deadline brings us back here
                warn!("Failed to resend {:?}: {}", request.command, e);
            }

            self.recv_len = 0;
            request.sent_at_ms = now_ms;
            request.status = RequestStatus::Pending;
            self.pending = Some(request);
            return None;
        }

        warn!("{} after {} attempts, giving up", cause, request.retries + 1);
        let result = Err(RunCamError::RetryExhausted {
            command: request.command,
            attempts: request.retries + 1,
        });
        Some(self.finish(request, result))
    }

    fn finish(&mut self, request: PendingRequest, result: Result<Response>) -> Completion {
        self.pending = None;
        self.recv_len = 0;
        self.last_status = request.status;
        Completion {
            command: request.command,
            param: request.param,
            result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::crc::crc8_dvb_s2;
    use crate::protocol::decoder::{parse_connection, parse_device_info, DeviceInfo};
    use crate::protocol::types::{ConnectionOperation, ProtocolVersion};
    use crate::serial::MockTransport;

    fn with_crc(mut bytes: Vec<u8>) -> Vec<u8> {
        bytes.push(crc8_dvb_s2(&bytes));
        bytes
    }

    fn device_info_reply() -> Vec<u8> {
        with_crc(vec![RUNCAM_HEADER, 0x01, 0xC0, 0x00])
    }

    fn issue_device_info(manager: &mut RequestManager, port: &mut MockTransport, max_retries: u16) {
        manager
            .issue(port, 0, Command::GetDeviceInfo, 0, 100, max_retries, parse_device_info)
            .unwrap();
    }

    #[test]
    fn test_issue_writes_frame() {
        let mut manager = RequestManager::new();
        let mut port = MockTransport::new();
        issue_device_info(&mut manager, &mut port, 0);

        assert_eq!(port.written, vec![encode_request(Command::GetDeviceInfo, 0)]);
        assert!(manager.is_pending());
        assert_eq!(manager.last_status(), RequestStatus::Pending);
    }

    #[test]
    fn test_second_issue_is_rejected() {
        let mut manager = RequestManager::new();
        let mut port = MockTransport::new();
        issue_device_info(&mut manager, &mut port, 0);

        let result = manager.issue(
            &mut port,
            0,
            Command::FiveKeyConnection,
            ConnectionOperation::Open as u8,
            400,
            2,
            parse_connection,
        );

        assert!(matches!(
            result,
            Err(RunCamError::RequestPending {
                requested: Command::FiveKeyConnection,
                pending: Command::GetDeviceInfo,
            })
        ));
        assert_eq!(port.written.len(), 1);
        assert_eq!(manager.pending().unwrap().command(), Command::GetDeviceInfo);
    }

    #[test]
    fn test_unacknowledged_refused_while_pending() {
        let mut manager = RequestManager::new();
        let mut port = MockTransport::new();
        issue_device_info(&mut manager, &mut port, 0);

        assert!(manager
            .send_unacknowledged(&mut port, Command::CameraControl, 0x03)
            .is_err());
        assert_eq!(port.written.len(), 1);
    }

    #[test]
    fn test_issue_discards_stale_input() {
        let mut manager = RequestManager::new();
        let mut port = MockTransport::new();
        port.push_rx(&device_info_reply());

        issue_device_info(&mut manager, &mut port, 0);
        assert!(manager.poll(&mut port, 10).is_none());
    }

    #[test]
    fn test_successful_response() {
        let mut manager = RequestManager::new();
        let mut port = MockTransport::new();
        issue_device_info(&mut manager, &mut port, 0);
        port.push_rx(&device_info_reply());

        let completion = manager.poll(&mut port, 10).unwrap();
        assert_eq!(completion.command, Command::GetDeviceInfo);
        assert_eq!(
            completion.result.unwrap(),
            Response::DeviceInfo(DeviceInfo {
                protocol_version: ProtocolVersion::V1_0,
                raw_version: 0x01,
                features: 0x00C0,
            })
        );
        assert!(!manager.is_pending());
        assert_eq!(manager.last_status(), RequestStatus::Success);
    }

    #[test]
    fn test_response_across_several_polls() {
        let mut manager = RequestManager::new();
        let mut port = MockTransport::new();
        issue_device_info(&mut manager, &mut port, 0);

        let reply = device_info_reply();
        port.push_rx(&reply[..2]);
        assert!(manager.poll(&mut port, 10).is_none());
        port.push_rx(&reply[2..]);
        assert!(manager.poll(&mut port, 20).unwrap().result.is_ok());
    }

    #[test]
    fn test_noise_before_header_is_skipped() {
        let mut manager = RequestManager::new();
        let mut port = MockTransport::new();
        issue_device_info(&mut manager, &mut port, 0);

        port.push_rx(&[0x00, 0x55, 0xFF]);
        port.push_rx(&device_info_reply());
        port.set_read_chunk(3);

        assert!(manager.poll(&mut port, 10).unwrap().result.is_ok());
    }

    #[test]
    fn test_bad_crc_is_retried_immediately() {
        let mut manager = RequestManager::new();
        let mut port = MockTransport::new();
        issue_device_info(&mut manager, &mut port, 1);

        let mut reply = device_info_reply();
        reply[4] ^= 0x01;
        port.push_rx(&reply);

        assert!(manager.poll(&mut port, 10).is_none());
        assert_eq!(port.written.len(), 2);
        assert_eq!(manager.pending().unwrap().retries(), 1);

        port.push_rx(&device_info_reply());
        assert!(manager.poll(&mut port, 20).unwrap().result.is_ok());
    }

    #[test]
    fn test_bad_crc_without_retries_fails() {
        let mut manager = RequestManager::new();
        let mut port = MockTransport::new();
        issue_device_info(&mut manager, &mut port, 0);

        let mut reply = device_info_reply();
        reply[1] ^= 0x80;
        port.push_rx(&reply);

        let completion = manager.poll(&mut port, 10).unwrap();
        assert!(matches!(
            completion.result,
            Err(RunCamError::RetryExhausted { command: Command::GetDeviceInfo, attempts: 1 })
        ));
        assert_eq!(manager.last_status(), RequestStatus::BadCrc);
    }

    #[test]
    fn test_retry_bound() {
        for max_retries in 0..5u16 {
            let mut manager = RequestManager::new();
            let mut port = MockTransport::new();
            issue_device_info(&mut manager, &mut port, max_retries);

            let mut now = 0;
            let completion = loop {
                now += 50;
                if let Some(c) = manager.poll(&mut port, now) {
                    break c;
                }
                assert!(now < 10_000, "request never resolved");
            };

            assert_eq!(port.written.len(), max_retries as usize + 1);
            assert!(matches!(
                completion.result,
                Err(RunCamError::RetryExhausted { attempts, .. }) if attempts == max_retries + 1
            ));
            assert_eq!(manager.last_status(), RequestStatus::TimedOut);
            assert!(!manager.is_pending());
        }
    }

    #[test]
    fn test_timeout_deadline_resets_on_retry() {
        let mut manager = RequestManager::new();
        let mut port = MockTransport::new();
        issue_device_info(&mut manager, &mut port, 1);

        assert!(manager.poll(&mut port, 99).is_none());
        assert_eq!(port.written.len(), 1);
        assert!(manager.poll(&mut port, 100).is_none());
        assert_eq!(port.written.len(), 2);
        assert!(manager.poll(&mut port, 199).is_none());
        assert!(manager.poll(&mut port, 200).is_some());
    }

    #[test]
    fn test_deadline_survives_clock_wrap() {
        let mut manager = RequestManager::new();
        let mut port = MockTransport::new();
        manager
            .issue(&mut port, u32::MAX - 10, Command::GetDeviceInfo, 0, 100, 0, parse_device_info)
            .unwrap();

        assert!(manager.poll(&mut port, 50).is_none());
        assert!(manager.poll(&mut port, 89).is_some());
    }

    #[test]
    fn test_malformed_payload_is_not_retried() {
        fn reject(_: &[u8]) -> Result<Response> {
            Err(RunCamError::MalformedResponse {
                command: Command::GetDeviceInfo,
                reason: "test".to_string(),
            })
        }

        let mut manager = RequestManager::new();
        let mut port = MockTransport::new();
        manager
            .issue(&mut port, 0, Command::GetDeviceInfo, 0, 100, 3, reject)
            .unwrap();
        port.push_rx(&device_info_reply());

        let completion = manager.poll(&mut port, 10).unwrap();
        assert!(matches!(completion.result, Err(RunCamError::MalformedResponse { .. })));
        assert_eq!(port.written.len(), 1);
    }

    #[test]
    fn test_write_failure_leaves_nothing_pending() {
        let mut manager = RequestManager::new();
        let mut port = MockTransport::new();
        port.set_write_error(std::io::ErrorKind::BrokenPipe);

        let result = manager.issue(&mut port, 0, Command::GetDeviceInfo, 0, 100, 0, parse_device_info);
        assert!(matches!(result, Err(RunCamError::Io(_))));
        assert!(!manager.is_pending());
    }

    #[test]
    fn test_idle_poll_drops_stray_bytes() {
        let mut manager = RequestManager::new();
        let mut port = MockTransport::new();
        port.push_rx(&[0xCC, 0x01]);

        assert!(manager.poll(&mut port, 0).is_none());
        assert_eq!(port.pending_rx(), 0);
    }
}
