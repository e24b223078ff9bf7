//! # UI Server
//!
//! The UI server is the console core's boundary with its presentation layer.
//! Operator intents arrive on a REP socket, and a read-only display
//! projection of the core's state is published once per cycle on a PUB
//! socket. The core never renders anything itself.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use serde::{Serialize, Deserialize};

// Internal
use crate::board;
use crate::data_store::DataStore;
use comms_if::{
    dev::PoseTm,
    net::{zmq, MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions},
    ops::{Mode, OpsCmd, OpsResponse},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// UI server
pub struct UiServer {
    cmd_socket: MonitoredSocket,
    tm_socket: MonitoredSocket,
}

/// Display projection published to the UI once per cycle.
///
/// Everything in here is read-only derived state, the UI feeds nothing back
/// through this channel.
#[derive(Debug, Serialize, Deserialize)]
pub struct DisplayTm {
    pub elapsed_s: f64,

    pub mode: Mode,

    pub devices: Vec<String>,

    pub selected_device: Option<String>,

    pub link_connected: bool,

    /// Last known pose of the selected robot.
    pub pose: PoseTm,

    /// Label of the board cell the robot is in, `None` off the board.
    pub quadrant: Option<String>,

    /// Label of the cell being navigated to, if any.
    pub target_quadrant: Option<String>,

    /// True while the autonomous navigator is driving.
    pub nav_active: bool,

    /// True while a return-to-origin replay is running.
    pub replaying: bool,

    /// Battery voltage of the selected robot, if it has reported one.
    pub battery_v: Option<f64>,

    pub speed_scale: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum UiServerError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not send to the UI: {0}")]
    SendError(zmq::Error),

    #[error("Could not receive a message from the UI: {0}")]
    RecvError(zmq::Error),

    #[error("Could not serialize the data: {0}")]
    SerializationError(serde_json::Error),

    #[error("Could not parse the received intent: {0}")]
    CmdParseError(comms_if::ops::OpsCmdParseError),

    #[error("The UI sent a message which was not valid UTF-8")]
    NonUtf8Cmd,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl UiServer {

    /// Create a new instance of the UI Server.
    ///
    /// This function will not block until a UI connects.
    pub fn new(ctx: &zmq::Context, params: &NetParams) -> Result<Self, UiServerError> {
        // A zero receive timeout keeps the frame loop from stalling on an
        // empty intent queue
        let socket_options = SocketOptions {
            block_on_first_connect: false,
            bind: true,
            connect_timeout: 1000,
            heartbeat_ivl: 500,
            heartbeat_ttl: 1000,
            heartbeat_timeout: 1000,
            linger: 1,
            recv_timeout: 0,
            send_timeout: 10,
            ..Default::default()
        };

        let cmd_socket = MonitoredSocket::new(
            ctx,
            zmq::REP,
            socket_options,
            &params.ui_cmd_endpoint
        ).map_err(UiServerError::SocketError)?;

        let tm_socket_options = SocketOptions {
            block_on_first_connect: false,
            bind: true,
            linger: 1,
            recv_timeout: 10,
            send_timeout: 10,
            ..Default::default()
        };

        let tm_socket = MonitoredSocket::new(
            ctx,
            zmq::PUB,
            tm_socket_options,
            &params.ui_tm_endpoint
        ).map_err(UiServerError::SocketError)?;

        Ok(Self {
            cmd_socket,
            tm_socket,
        })
    }

    /// Receive a single intent from the UI.
    ///
    /// The protocol is to call this in a loop until `Ok(None)` is returned,
    /// indicating that there are no more pending intents right now. After
    /// receiving a valid intent a response must be sent with
    /// [`UiServer::send_response`] before attempting to receive another. If
    /// the intent cannot be parsed the `Invalid` response is sent
    /// automatically by this function.
    pub fn receive_cmd(&self) -> Result<Option<OpsCmd>, UiServerError> {
        let cmd_str = match self.cmd_socket.recv_string(0) {
            // Valid message
            Ok(Ok(s)) => s,
            // Non UTF-8 message
            Ok(Err(_)) => {
                self.send_response(OpsResponse::Invalid)?;

                return Err(UiServerError::NonUtf8Cmd)
            },
            // No message in timeout
            Err(zmq::Error::EAGAIN) => return Ok(None),
            // Receive error
            Err(e) => {
                // No response is sent if we could not receive
                return Err(UiServerError::RecvError(e))
            }
        };

        OpsCmd::from_json(&cmd_str)
            .map_err(|e| {
                self.send_response(OpsResponse::Invalid).ok();

                UiServerError::CmdParseError(e)
            })
            .map(Some)
    }

    /// Send the given response back to the UI.
    ///
    /// This function must be called after receiving an intent.
    pub fn send_response(&self, response: OpsResponse) -> Result<(), UiServerError> {
        let response_str = serde_json::to_string(&response)
            .map_err(UiServerError::SerializationError)?;

        self.cmd_socket.send(&response_str, 0)
            .map_err(UiServerError::SendError)
    }

    /// Publish the display projection for this cycle.
    pub fn publish(&mut self, ds: &DataStore) -> Result<(), UiServerError> {
        let packet = DisplayTm::from_datastore(ds);

        let packet_string = serde_json::to_string(&packet)
            .map_err(UiServerError::SerializationError)?;

        self.tm_socket.send(&packet_string, 0)
            .map_err(UiServerError::SendError)
    }
}

impl DisplayTm {
    pub fn from_datastore(ds: &DataStore) -> Self {
        let pose = ds.current_pose();

        let quadrant = board::world_to_quadrant(pose.position_m, &ds.board)
            .map(|q| q.label);

        let target_quadrant = ds
            .nav
            .target()
            .and_then(|t| board::world_to_quadrant(t.position_m, &ds.board))
            .map(|q| q.label);

        let battery_v = ds
            .selected_device
            .as_ref()
            .and_then(|d| ds.battery_v.get(d))
            .copied();

        Self {
            elapsed_s: ds.elapsed_s,
            mode: ds.mode,
            devices: ds.devices.clone(),
            selected_device: ds.selected_device.clone(),
            link_connected: ds.link_connected,
            pose: PoseTm {
                x: pose.position_m.x,
                y: pose.position_m.y,
                theta: pose.heading_rad,
            },
            quadrant,
            target_quadrant,
            nav_active: ds.nav.is_active(),
            replaying: ds.replayer.is_replaying(),
            battery_v,
            speed_scale: ds.speed_scale,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use nalgebra::Vector2;

    #[test]
    fn test_display_projection() {
        let mut ds = DataStore::default();
        ds.devices = vec!["mesha".to_string()];
        ds.selected_device = Some("mesha".to_string());
        ds.link_connected = true;
        ds.battery_v.insert("mesha".to_string(), 11.7);

        ds.poses.update_from_telemetry(
            "mesha",
            crate::loc::Pose {
                position_m: Vector2::new(-2.9, -2.9),
                heading_rad: 0.5,
            },
        );

        let tm = DisplayTm::from_datastore(&ds);

        assert_eq!(tm.quadrant.as_deref(), Some("A1"));
        assert_eq!(tm.battery_v, Some(11.7));
        assert_eq!(tm.pose.theta, 0.5);
        assert!(tm.target_quadrant.is_none());
        assert!(!tm.nav_active);
        assert!(!tm.replaying);
    }

    #[test]
    fn test_target_quadrant_reported() {
        let mut ds = DataStore::default();
        ds.set_mode(Mode::Auto);
        ds.nav.set_target(Vector2::new(2.75, 2.75), false, &ds.board);

        let tm = DisplayTm::from_datastore(&ds);
        assert_eq!(tm.target_quadrant.as_deref(), Some("L12"));
        assert!(tm.nav_active);
    }
}
