// MiBuddy — Remote Decision Service
//
// Optional HTTP service that picks the avatar's mood when no local rule
// fires. The mapper drops a request into a single-slot mailbox and polls for
// the answer on later ticks; a background worker does the blocking POST.
// There is no cancellation: a stale answer is simply replaced.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{MochiError, Result};
use crate::mochi::types::{Activity, EmotionalState};

use super::state::InputState;

fn round1(v: f32) -> f32 {
    (v * 10.0).round() / 10.0
}

/// JSON body POSTed to the service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionRequest {
    pub battery: f32,
    pub charging: bool,
    pub hour: u8,
    pub minute: u8,
    pub wifi: bool,
    pub touch: bool,
    pub moving: bool,
    pub shaking: bool,
    pub rotating: bool,
    pub spinning: bool,
    pub face_up: bool,
    pub face_down: bool,
    pub portrait: bool,
    pub portrait_inv: bool,
    pub landscape_left: bool,
    pub landscape_right: bool,
    pub pitch: f32,
    pub roll: f32,
    pub night: bool,
    pub weekend: bool,
    pub low_battery: bool,
    pub critical_battery: bool,
}

impl From<&InputState> for DecisionRequest {
    fn from(s: &InputState) -> Self {
        Self {
            battery: s.battery_pct,
            charging: s.is_charging,
            hour: s.hour,
            minute: s.minute,
            wifi: s.wifi_connected,
            touch: s.touch_active,
            moving: s.is_moving,
            shaking: s.is_shaking,
            rotating: s.is_rotating,
            spinning: s.is_spinning,
            face_up: s.is_face_up,
            face_down: s.is_face_down,
            portrait: s.is_portrait,
            portrait_inv: s.is_portrait_inv,
            landscape_left: s.is_landscape_left,
            landscape_right: s.is_landscape_right,
            pitch: round1(s.pitch),
            roll: round1(s.roll),
            night: s.is_night,
            weekend: s.is_weekend,
            low_battery: s.is_low_battery,
            critical_battery: s.is_critical_battery,
        }
    }
}

#[derive(Debug, Deserialize)]
struct DecisionResponse {
    state: Option<serde_json::Value>,
    activity: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteDecision {
    pub state: EmotionalState,
    pub activity: Activity,
}

/// Parse a response body. Unknown or missing names fall back to Happy / Idle;
/// a body that is not a JSON object is an error.
pub fn parse_response(body: &str) -> Result<RemoteDecision> {
    let resp: DecisionResponse = serde_json::from_str(body)
        .map_err(|e| MochiError::Io(format!("invalid JSON response: {}", e)))?;

    let state = match resp.state.as_ref().and_then(|v| v.as_str()) {
        Some(name) => name.parse().unwrap_or(EmotionalState::Happy),
        None => {
            warn!(target: "mochi_api", "state: missing or not a string");
            EmotionalState::Happy
        }
    };
    let activity = match resp.activity.as_ref().and_then(|v| v.as_str()) {
        Some(name) => name.parse().unwrap_or(Activity::Idle),
        None => {
            warn!(target: "mochi_api", "activity: missing or not a string");
            Activity::Idle
        }
    };
    Ok(RemoteDecision { state, activity })
}

/// Blocking HTTP POST of a JSON body. Returns status code and body.
pub trait RemoteTransport {
    fn post_json(&mut self, url: &str, body: &str) -> Result<(u16, String)>;
}

/// One full round trip: serialise, POST, check status, parse.
pub fn query<T: RemoteTransport + ?Sized>(transport: &mut T, url: &str, input: &InputState) -> Result<RemoteDecision> {
    if url.is_empty() {
        return Err(MochiError::InvalidState("remote URL not set"));
    }
    let body = serde_json::to_string(&DecisionRequest::from(input))
        .map_err(|e| MochiError::Io(format!("request encode: {}", e)))?;
    info!(target: "mochi_api", "POST {} {}", url, body);

    let (status, response) = transport.post_json(url, &body)?;
    info!(target: "mochi_api", "Status: {}, body: {}", status, if response.is_empty() { "(empty)" } else { &response });
    if status != 200 {
        return Err(MochiError::Io(format!("HTTP status {}", status)));
    }

    let decision = parse_response(&response)?;
    info!(target: "mochi_api", "API RESULT: {} + {}", decision.state, decision.activity);
    Ok(decision)
}

// ---------------------------------------------------------------------------
// Mailbox
// ---------------------------------------------------------------------------

struct Shared {
    pending: AtomicBool,
    result: Mutex<Option<RemoteDecision>>,
}

/// UI-side handle: post a request, poll for the answer.
#[derive(Clone)]
pub struct RemoteMailbox {
    requests: SyncSender<InputState>,
    shared: Arc<Shared>,
}

/// Worker-side handle.
pub struct RemoteWorker {
    requests: Receiver<InputState>,
    shared: Arc<Shared>,
}

pub fn mailbox() -> (RemoteMailbox, RemoteWorker) {
    let (tx, rx) = mpsc::sync_channel(1);
    let shared = Arc::new(Shared { pending: AtomicBool::new(false), result: Mutex::new(None) });
    (
        RemoteMailbox { requests: tx, shared: Arc::clone(&shared) },
        RemoteWorker { requests: rx, shared },
    )
}

impl RemoteMailbox {
    /// Queue a query. Ignored while one is already in flight. Returns whether
    /// the request was accepted.
    pub fn request(&self, input: &InputState) -> bool {
        if self.shared.pending.swap(true, Ordering::AcqRel) {
            return false;
        }
        if let Ok(mut slot) = self.shared.result.lock() {
            *slot = None;
        }
        match self.requests.try_send(*input) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.shared.pending.store(false, Ordering::Release);
                false
            }
        }
    }

    /// Take the latest answer, if any. Each answer is returned once.
    pub fn take_result(&self) -> Option<RemoteDecision> {
        self.shared.result.lock().ok().and_then(|mut slot| slot.take())
    }

    pub fn is_pending(&self) -> bool {
        self.shared.pending.load(Ordering::Acquire)
    }
}

impl RemoteWorker {
    /// Wait up to `timeout` for a request, run it, publish the answer.
    /// Returns `false` once every mailbox handle is gone.
    pub fn serve_one<T: RemoteTransport + ?Sized>(&self, transport: &mut T, url: &str, timeout: Duration) -> bool {
        let input = match self.requests.recv_timeout(timeout) {
            Ok(input) => input,
            Err(RecvTimeoutError::Timeout) => return true,
            Err(RecvTimeoutError::Disconnected) => return false,
        };

        let answer = match query(transport, url, &input) {
            Ok(decision) => Some(decision),
            Err(e) => {
                error!(target: "mochi_api", "Query failed: {}", e);
                None
            }
        };
        if let Ok(mut slot) = self.shared.result.lock() {
            *slot = answer;
        }
        self.shared.pending.store(false, Ordering::Release);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Canned {
        status: u16,
        body: &'static str,
        seen: Vec<String>,
    }

    impl RemoteTransport for Canned {
        fn post_json(&mut self, _url: &str, body: &str) -> Result<(u16, String)> {
            self.seen.push(body.to_string());
            Ok((self.status, self.body.to_string()))
        }
    }

    #[test]
    fn response_names_are_case_insensitive() {
        let d = parse_response(r#"{"state":"excited","activity":"BOUNCE"}"#).unwrap();
        assert_eq!(d, RemoteDecision { state: EmotionalState::Excited, activity: Activity::Bounce });
    }

    #[test]
    fn unknown_or_missing_names_fall_back() {
        let d = parse_response(r#"{"state":"grumpy","activity":7}"#).unwrap();
        assert_eq!(d, RemoteDecision { state: EmotionalState::Happy, activity: Activity::Idle });
        assert!(parse_response("not json").is_err());
    }

    #[test]
    fn request_body_uses_wire_names_and_rounds_angles() {
        let input = InputState { battery_pct: 55.0, pitch: 12.34, roll: -3.36, is_face_up: true, ..InputState::default() };
        let mut t = Canned { status: 200, body: r#"{"state":"cool","activity":"nod"}"#, seen: Vec::new() };
        let d = query(&mut t, "http://host/mochi/state", &input).unwrap();
        assert_eq!(d.activity, Activity::Nod);

        let sent: serde_json::Value = serde_json::from_str(&t.seen[0]).unwrap();
        assert_eq!(sent["battery"], 55.0);
        assert_eq!(sent["face_up"], true);
        assert!((sent["pitch"].as_f64().unwrap() - 12.3).abs() < 1e-4);
        assert!((sent["roll"].as_f64().unwrap() + 3.4).abs() < 1e-4);
        assert!(sent.get("critical_battery").is_some());
    }

    #[test]
    fn non_200_is_an_error() {
        let mut t = Canned { status: 503, body: "", seen: Vec::new() };
        assert!(query(&mut t, "http://host", &InputState::default()).is_err());
        assert!(query(&mut t, "", &InputState::default()).is_err());
    }

    #[test]
    fn mailbox_holds_one_request_and_one_result() {
        let (mb, worker) = mailbox();
        assert!(mb.request(&InputState::default()));
        assert!(!mb.request(&InputState::default()), "second request while pending is ignored");
        assert!(mb.take_result().is_none());

        let mut t = Canned { status: 200, body: r#"{"state":"sleepy","activity":"snore"}"#, seen: Vec::new() };
        assert!(worker.serve_one(&mut t, "http://host", Duration::from_millis(10)));
        assert_eq!(t.seen.len(), 1);
        assert!(!mb.is_pending());

        let d = mb.take_result().unwrap();
        assert_eq!(d.state, EmotionalState::Sleepy);
        assert!(mb.take_result().is_none(), "result is consumed");
    }

    #[test]
    fn worker_stops_when_mailbox_dropped() {
        let (mb, worker) = mailbox();
        drop(mb);
        let mut t = Canned { status: 200, body: "{}", seen: Vec::new() };
        assert!(!worker.serve_one(&mut t, "http://host", Duration::from_millis(10)));
    }
}
