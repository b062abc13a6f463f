use serde::{Deserialize, Serialize};
use serde_json::Value;

/// DAP request envelope.
#[derive(Debug, Serialize)]
pub struct DapRequest<'a> {
    pub seq: i64,
    #[serde(rename = "type")]
    pub r#type: &'static str,
    pub command: &'a str,
    pub arguments: &'a Value,
}

/// DAP response envelope, used both for incoming responses and for answers to reverse requests.
///
/// Note: the DAP specification allows responses with no `body` field at all.
/// Using a `serde_json::Value` keeps the envelope stable and avoids type
/// inference issues around `None` bodies.
#[derive(Debug, Serialize, Deserialize)]
pub struct DapResponse {
    pub seq: i64,
    #[serde(rename = "type")]
    pub r#type: String,
    pub request_seq: i64,
    pub success: bool,
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

/// Any message an adapter may send.
#[derive(Debug)]
pub enum Incoming {
    Response(DapResponse),
    Event { event: String, body: Value },
    /// Reverse request (adapter -> client).
    Request { seq: i64, command: String },
}

impl Incoming {
    pub fn parse(msg: Value) -> anyhow::Result<Self> {
        let kind = msg
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        match kind.as_str() {
            "response" => Ok(Incoming::Response(serde_json::from_value(msg)?)),
            "event" => Ok(Incoming::Event {
                event: msg
                    .get("event")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_owned(),
                body: msg.get("body").cloned().unwrap_or(Value::Null),
            }),
            "request" => Ok(Incoming::Request {
                seq: msg.get("seq").and_then(Value::as_i64).unwrap_or_default(),
                command: msg
                    .get("command")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_owned(),
            }),
            other => Err(anyhow::anyhow!("unknown DAP message type `{other}`")),
        }
    }
}

/// Adapter notifications the controller reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum AdapterEvent {
    Initialized,
    Stopped {
        reason: String,
        thread_id: Option<i64>,
    },
    Continued,
    Terminated,
    Exited {
        code: i64,
    },
    Output {
        category: String,
        output: String,
    },
}

impl AdapterEvent {
    /// Convert a raw DAP event, [`None`] for events the controller does not track.
    pub fn from_dap(event: &str, body: &Value) -> Option<Self> {
        let str_field = |name: &str| {
            body.get(name)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned()
        };
        match event {
            "initialized" => Some(AdapterEvent::Initialized),
            "stopped" => Some(AdapterEvent::Stopped {
                reason: str_field("reason"),
                thread_id: body.get("threadId").and_then(Value::as_i64),
            }),
            "continued" => Some(AdapterEvent::Continued),
            "terminated" => Some(AdapterEvent::Terminated),
            "exited" => Some(AdapterEvent::Exited {
                code: body.get("exitCode").and_then(Value::as_i64).unwrap_or_default(),
            }),
            "output" => Some(AdapterEvent::Output {
                category: str_field("category"),
                output: str_field("output"),
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Source {
    pub name: Option<String>,
    pub path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StackFrame {
    pub id: i64,
    pub name: String,
    pub source: Option<Source>,
    pub line: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackTraceBody {
    pub stack_frames: Vec<StackFrame>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    pub name: String,
    pub variables_reference: i64,
    #[serde(default)]
    pub expensive: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScopesBody {
    pub scopes: Vec<Scope>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Variable {
    pub name: String,
    pub value: String,
    #[serde(rename = "type")]
    pub type_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VariablesBody {
    pub variables: Vec<Variable>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Thread {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThreadsBody {
    pub threads: Vec<Thread>,
}
