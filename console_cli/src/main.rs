//! # Console command line client
//!
//! A line-oriented stand-in for the graphical operator UI. Intents typed at
//! the prompt are parsed into the same [`OpsCmd`] values the UI produces and
//! sent to the console over the UI socket, and the console's response is
//! printed back.
//!
//! Examples:
//!
//! ```text
//! Mesha $ device RoboMesha-1
//! Mesha $ move 0.0 1.0
//! Mesha $ mode auto
//! Mesha $ quad 3 11
//! Mesha $ return
//! ```

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use rustyline::error::ReadlineError;
use rustyline::Editor;
use serde::Deserialize;
use structopt::StructOpt;

// Internal
use comms_if::{
    net::{zmq, MonitoredSocket, SocketOptions},
    ops::OpsCmd,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

const PROMPT: &str = "Mesha $ ";
const HISTORY_PATH: &str = "data/cli_history.txt";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the command line client.
#[derive(Debug, Deserialize)]
struct CliParams {
    /// Endpoint of the console's UI intent socket.
    console_endpoint: String,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn main() -> Result<(), Report> {

    // ---- LOAD PARAMETERS ----

    let params: CliParams = util::params::load("console_cli.toml")
        .wrap_err("Could not load console_cli params")?;

    // ---- CONNECT TO THE CONSOLE ----

    let zmq_ctx = zmq::Context::new();

    let socket_options = SocketOptions {
        block_on_first_connect: false,
        connect_timeout: 1000,
        linger: 1,
        recv_timeout: 1000,
        send_timeout: 10,
        req_correlate: true,
        req_relaxed: true,
        ..Default::default()
    };

    let socket = MonitoredSocket::new(
        &zmq_ctx,
        zmq::REQ,
        socket_options,
        &params.console_endpoint,
    )
    .wrap_err("Could not connect to the console")?;

    println!("Connected to the console at {}", params.console_endpoint);
    println!("Type an intent (try 'help'), or 'exit' to quit.");

    // ---- INPUT LOOP ----

    let mut rl: Editor<()> = Editor::new()
        .wrap_err("Could not initialise the line editor")?;
    if rl.load_history(HISTORY_PATH).is_err() {
        println!("No history detected");
    }

    loop {
        let readline = rl.readline(PROMPT);
        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                if line == "exit" || line == "quit" {
                    break;
                }

                if let Some(cmd) = parse(line) {
                    send(&socket, &cmd);
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                break
            }
            Err(err) => {
                println!("Unhandled Error: {:?}", err);
                break
            }
        }
    }

    rl.save_history(HISTORY_PATH).ok();

    Ok(())
}

/// Parse a line into an intent, printing the grammar on failure.
fn parse(line: &str) -> Option<OpsCmd> {
    let args = std::iter::once("mesha").chain(line.split_whitespace());

    match OpsCmd::from_iter_safe(args) {
        Ok(cmd) => Some(cmd),
        Err(e) => {
            println!("{}", e.message);
            None
        }
    }
}

/// Send an intent to the console and print its response.
fn send(socket: &MonitoredSocket, cmd: &OpsCmd) {
    let json = match cmd.to_json() {
        Ok(j) => j,
        Err(e) => {
            println!("Could not serialise intent: {}", e);
            return;
        }
    };

    if let Err(e) = socket.send(&json, 0) {
        println!("Could not send intent: {}", e);
        return;
    }

    match socket.recv_string(0) {
        Ok(Ok(response)) => println!("{}", response),
        Ok(Err(_)) => println!("Console sent a non UTF-8 response"),
        Err(e) => println!("No response from the console: {}", e),
    }
}
