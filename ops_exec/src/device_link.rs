//! # Device Link
//!
//! The device link carries commands out to the robots and telemetry and
//! roster updates back in. Commands are published with the target robot's
//! name as the topic, telemetry arrives on a subscription covering all
//! robots. Both directions are non-blocking: when the link is down sends
//! become no-ops and the control loops degrade gracefully.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    dev::{DevCmd, DevMsg},
    net::{zmq, MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Device link client
pub struct DeviceClient {
    cmd_socket: MonitoredSocket,
    tm_socket: MonitoredSocket,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum DeviceClientError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("The link to the device relay is not connected")]
    NotConnected,

    #[error("Could not send the command: {0}")]
    SendError(zmq::Error),

    #[error("Could not receive a message from the relay: {0}")]
    RecvError(zmq::Error),

    #[error("Could not serialize the command: {0}")]
    SerializationError(serde_json::Error),

    #[error("Could not parse the received message: {0}")]
    MsgParseError(comms_if::dev::DevMsgParseError),

    #[error("The relay sent a message which was not valid UTF-8")]
    NonUtf8Message,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl DeviceClient {

    /// Create a new instance of the device link client.
    ///
    /// This function will not block until the relay connects.
    pub fn new(ctx: &zmq::Context, params: &NetParams) -> Result<Self, DeviceClientError> {
        let cmd_socket_options = SocketOptions {
            block_on_first_connect: false,
            connect_timeout: 1000,
            heartbeat_ivl: 500,
            heartbeat_ttl: 1000,
            heartbeat_timeout: 1000,
            linger: 1,
            recv_timeout: 10,
            send_timeout: 10,
            ..Default::default()
        };

        let cmd_socket = MonitoredSocket::new(
            ctx,
            zmq::PUB,
            cmd_socket_options,
            &params.dev_cmd_endpoint
        ).map_err(DeviceClientError::SocketError)?;

        // A zero receive timeout keeps the frame loop from stalling when no
        // telemetry is pending
        let tm_socket_options = SocketOptions {
            block_on_first_connect: false,
            connect_timeout: 1000,
            heartbeat_ivl: 500,
            heartbeat_ttl: 1000,
            heartbeat_timeout: 1000,
            linger: 1,
            recv_timeout: 0,
            send_timeout: 10,
            ..Default::default()
        };

        let tm_socket = MonitoredSocket::new(
            ctx,
            zmq::SUB,
            tm_socket_options,
            &params.dev_tm_endpoint
        ).map_err(DeviceClientError::SocketError)?;

        // Subscribe to telemetry from every robot
        tm_socket.set_subscribe(b"")
            .map_err(DeviceClientError::SendError)?;

        Ok(Self {
            cmd_socket,
            tm_socket,
        })
    }

    /// Check if the link is connected.
    pub fn is_connected(&self) -> bool {
        self.cmd_socket.connected() && self.tm_socket.connected()
    }

    /// Send a command to the named robot.
    ///
    /// Returns [`DeviceClientError::NotConnected`] without sending when the
    /// link is down.
    pub fn send_cmd(&self, device: &str, cmd: &DevCmd) -> Result<(), DeviceClientError> {
        if !self.is_connected() {
            return Err(DeviceClientError::NotConnected)
        }

        let cmd_str = serde_json::to_string(cmd)
            .map_err(DeviceClientError::SerializationError)?;

        // Topic frame first so the relay can route on the device name
        self.cmd_socket.send(device, zmq::SNDMORE)
            .map_err(DeviceClientError::SendError)?;
        self.cmd_socket.send(&cmd_str, 0)
            .map_err(DeviceClientError::SendError)
    }

    /// Receive a single message from the relay.
    ///
    /// Call in a loop until `Ok(None)`, which indicates no more pending
    /// messages this cycle.
    pub fn recv_msg(&self) -> Result<Option<DevMsg>, DeviceClientError> {
        let msg_str = match self.tm_socket.recv_string(0) {
            Ok(Ok(s)) => s,
            Ok(Err(_)) => return Err(DeviceClientError::NonUtf8Message),
            // No message in timeout
            Err(zmq::Error::EAGAIN) => return Ok(None),
            Err(e) => return Err(DeviceClientError::RecvError(e)),
        };

        DevMsg::from_json(&msg_str)
            .map_err(DeviceClientError::MsgParseError)
            .map(Some)
    }
}
