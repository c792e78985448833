//! Franka Desk client
//!
//! Desk is the robot's web interface. The recorder needs two things from it:
//! - an authenticated session (`/admin/api/login`, `/admin/api/logout`)
//! - the navigation event stream, which reports presses on the pilot buttons
//!   at the robot's wrist as JSON objects over a websocket

mod tls;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use crossbeam_channel::Sender;
use log::{debug, error, info, warn};
use reqwest::blocking::Client;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::net::TcpStream;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tungstenite::client::IntoClientRequest;
use tungstenite::http::HeaderValue;
use tungstenite::http::header::COOKIE;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Connector, Message, WebSocket};

use crate::config::DeskConfig;
use crate::core::RecorderInput;
use crate::pendant::{ButtonEvent, ButtonListener};
use crate::RecorderError;

pub use tls::robot_client_config;

const LOGIN_PATH: &str = "/admin/api/login";
const LOGOUT_PATH: &str = "/admin/api/logout";
const EVENTS_PATH: &str = "/desk/api/navigation/events";
const HTTPS_PORT: u16 = 443;
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);
// Listener wakes up at this rate to notice it was stopped
const READ_TIMEOUT: Duration = Duration::from_secs(1);

type EventSocket = WebSocket<MaybeTlsStream<TcpStream>>;

#[derive(Serialize)]
struct LoginRequest<'a> {
    login: &'a str,
    password: &'a str,
}

/// Encodes a Desk password the way the login endpoint expects it
///
/// The SHA-256 of `"<password>#<username>@franka"` is written as comma
/// separated decimal bytes, then base64 encoded in MIME style (76 column
/// lines, each ending in a newline).
pub fn encode_password(username: &str, password: &str) -> String {
    let digest = Sha256::digest(format!("{password}#{username}@franka").as_bytes());
    let joined = digest
        .iter()
        .map(|b| b.to_string())
        .collect::<Vec<_>>()
        .join(",");
    let encoded = STANDARD.encode(joined);

    let mut out = String::with_capacity(encoded.len() + encoded.len() / 76 + 1);
    for (i, c) in encoded.chars().enumerate() {
        if i > 0 && i % 76 == 0 {
            out.push('\n');
        }
        out.push(c);
    }
    out.push('\n');
    out
}

/// Authenticated Desk session
pub struct DeskClient {
    hostname: String,
    username: String,
    password: String,
    http: Client,
    token: Option<String>,
}

impl DeskClient {
    /// Creates a client and logs in
    pub fn connect(config: &DeskConfig) -> Result<Self, RecorderError> {
        let http = Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(HTTP_TIMEOUT)
            .build()?;
        let mut client = DeskClient {
            hostname: config.hostname.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            http,
            token: None,
        };
        client.login()?;
        Ok(client)
    }

    fn url(&self, path: &str) -> String {
        format!("https://{}{}", self.hostname, path)
    }

    /// Opens a session; the returned token authorizes every later request
    pub fn login(&mut self) -> Result<(), RecorderError> {
        let encoded = encode_password(&self.username, &self.password);
        let response = self
            .http
            .post(self.url(LOGIN_PATH))
            .json(&LoginRequest {
                login: &self.username,
                password: &encoded,
            })
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(RecorderError::Desk(format!(
                "login as {} on {} failed with status {}",
                self.username, self.hostname, status
            )));
        }
        self.token = Some(response.text()?);
        info!("Logged in to Desk at {} as {}", self.hostname, self.username);
        Ok(())
    }

    /// Ends the session; a no-op when not logged in
    pub fn logout(&mut self) -> Result<(), RecorderError> {
        let Some(token) = self.token.take() else {
            return Ok(());
        };
        let response = self
            .http
            .post(self.url(LOGOUT_PATH))
            .header(COOKIE.as_str(), format!("authorization={token}"))
            .send()?;
        if !response.status().is_success() {
            warn!("Desk logout returned status {}", response.status());
        }
        info!("Logged out of Desk");
        Ok(())
    }

    /// Whether a session token is held
    pub fn is_logged_in(&self) -> bool {
        self.token.is_some()
    }

    /// Starts forwarding pendant button events into `inputs`
    ///
    /// The websocket is opened on the calling thread so connection problems
    /// surface here; reading happens on a background thread.
    pub fn listen(&self, inputs: Sender<RecorderInput>) -> Result<DeskListener, RecorderError> {
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| RecorderError::Desk("not logged in".into()))?;
        let socket = self.connect_events(token)?;

        let listening = Arc::new(AtomicBool::new(true));
        let flag = listening.clone();
        let handle = thread::Builder::new()
            .name("desk-events".into())
            .spawn(move || forward_events(socket, flag, inputs))
            .map_err(|e| RecorderError::Desk(format!("cannot spawn listener: {e}")))?;

        info!("Listening to pendant buttons on {}", self.hostname);
        Ok(DeskListener {
            listening,
            handle: Some(handle),
        })
    }

    fn connect_events(&self, token: &str) -> Result<EventSocket, RecorderError> {
        let mut request = format!("wss://{}{}", self.hostname, EVENTS_PATH).into_client_request()?;
        let cookie = HeaderValue::from_str(&format!("authorization={token}"))
            .map_err(|e| RecorderError::Desk(format!("invalid session token: {e}")))?;
        request.headers_mut().insert(COOKIE, cookie);

        let stream = TcpStream::connect((self.hostname.as_str(), HTTPS_PORT))
            .map_err(|e| RecorderError::Desk(format!("cannot reach {}: {e}", self.hostname)))?;
        let connector = Connector::Rustls(Arc::new(robot_client_config()?));
        let (socket, _response) =
            tungstenite::client_tls_with_config(request, stream, None, Some(connector))
                .map_err(|e| RecorderError::Desk(format!("event stream handshake failed: {e}")))?;

        let tcp = match socket.get_ref() {
            MaybeTlsStream::Plain(tcp) => tcp,
            MaybeTlsStream::Rustls(tls) => tls.get_ref(),
            _ => return Err(RecorderError::Desk("unexpected event stream transport".into())),
        };
        tcp.set_read_timeout(Some(READ_TIMEOUT))
            .map_err(|e| RecorderError::Desk(format!("cannot set read timeout: {e}")))?;
        Ok(socket)
    }
}

fn forward_events(
    mut socket: EventSocket,
    listening: Arc<AtomicBool>,
    inputs: Sender<RecorderInput>,
) {
    let cause = read_events(&mut socket, &listening, &inputs);
    if let Err(e) = socket.close(None) {
        debug!("Closing event stream: {}", e);
    }
    if let Some(cause) = cause {
        report_lost(&listening, &inputs, cause);
    }
    debug!("Desk listener stopped");
}

// Returns why the stream ended, or `None` when it was stopped or nobody listens
fn read_events(
    socket: &mut EventSocket,
    listening: &AtomicBool,
    inputs: &Sender<RecorderInput>,
) -> Option<String> {
    while listening.load(Ordering::SeqCst) {
        match socket.read() {
            Ok(Message::Text(text)) => match ButtonEvent::from_json(text.as_str()) {
                Ok(event) => {
                    debug!("Pendant event {:?}", event);
                    if !listening.load(Ordering::SeqCst) {
                        return None;
                    }
                    if inputs.send(RecorderInput::Button(event)).is_err() {
                        return None;
                    }
                }
                Err(e) => warn!("Ignoring malformed pendant event {:?}: {}", text, e),
            },
            Ok(Message::Close(_)) => {
                warn!("Desk closed the event stream");
                return Some("Desk closed the event stream".into());
            }
            Ok(_) => {}
            Err(tungstenite::Error::Io(e))
                if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
            Err(e) => {
                error!("Desk event stream failed: {}", e);
                return Some(format!("event stream failed: {e}"));
            }
        }
    }
    None
}

// Tells the session the buttons are gone unless the stop was requested
fn report_lost(listening: &AtomicBool, inputs: &Sender<RecorderInput>, cause: String) {
    if listening.swap(false, Ordering::SeqCst)
        && inputs.send(RecorderInput::ButtonsLost(cause)).is_err()
    {
        debug!("Session gone before the stream loss was reported");
    }
}

/// Handle on the background thread reading pendant events
pub struct DeskListener {
    listening: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl DeskListener {
    /// Shared stop flag, handed to the recorder
    pub fn stop_handle(&self) -> ListenerStop {
        ListenerStop(self.listening.clone())
    }

    /// Stops listening and waits for the thread to exit
    pub fn join(mut self) {
        self.listening.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Desk listener thread panicked");
            }
        }
    }
}

/// Clears the listening flag of a [`DeskListener`]
#[derive(Clone)]
pub struct ListenerStop(Arc<AtomicBool>);

impl ButtonListener for ListenerStop {
    fn stop_listening(&mut self) {
        self.0.store(false, Ordering::SeqCst);
        info!("Stopped listening to pendant buttons");
    }
}
