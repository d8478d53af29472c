//! Streaming Sink (§4.7): serializes `Event`s as `text/event-stream` records
//! and writes them to any `tokio::io::AsyncWrite`, flushing after every
//! write so nothing is buffered upstream of the caller's socket.

use crate::model::TestCase;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// One controller emission. `status`/`test_result` are non-terminal;
/// `failed`/`finish`/`error` each end the stream (§4.7, §7).
#[derive(Debug, Clone)]
pub enum Event {
    Status { status: String },
    TestResult { test_num: u32, test_case: TestCase },
    Failed { message: String, detail: String },
    Finish,
    Error { message: String },
}

impl Event {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Event::Failed { .. } | Event::Finish | Event::Error { .. })
    }

    fn type_name(&self) -> &'static str {
        match self {
            Event::Status { .. } => "status",
            Event::TestResult { .. } => "test_result",
            Event::Failed { .. } => "failed",
            Event::Finish => "finish",
            Event::Error { .. } => "error",
        }
    }

    /// Renders the `data:` payload. Field names follow the original
    /// service's wire format (`input`/`output`/`answer`, flat `status`
    /// strings) rather than this crate's internal struct field names.
    fn payload(&self, timestamp: DateTime<Utc>) -> serde_json::Value {
        #[derive(Serialize)]
        struct Envelope<T: Serialize> {
            timestamp: String,
            #[serde(flatten)]
            body: T,
        }

        let timestamp = timestamp.to_rfc3339();
        match self {
            Event::Status { status } => {
                #[derive(Serialize)]
                struct Body<'a> {
                    status: &'a str,
                }
                serde_json::to_value(Envelope {
                    timestamp,
                    body: Body { status },
                })
            }
            Event::TestResult { test_num, test_case } => {
                #[derive(Serialize)]
                struct Body<'a> {
                    test_num: u32,
                    test_case: WireTestCase<'a>,
                }
                serde_json::to_value(Envelope {
                    timestamp,
                    body: Body {
                        test_num: *test_num,
                        test_case: WireTestCase::from(test_case),
                    },
                })
            }
            Event::Failed { message, detail } => {
                #[derive(Serialize)]
                struct Body<'a> {
                    message: &'a str,
                    detail: &'a str,
                }
                serde_json::to_value(Envelope {
                    timestamp,
                    body: Body { message, detail },
                })
            }
            Event::Finish => {
                #[derive(Serialize)]
                struct Body {}
                serde_json::to_value(Envelope { timestamp, body: Body {} })
            }
            Event::Error { message } => {
                #[derive(Serialize)]
                struct Body<'a> {
                    message: &'a str,
                }
                serde_json::to_value(Envelope {
                    timestamp,
                    body: Body { message },
                })
            }
        }
        .expect("Event payloads are built from owned, already-valid data")
    }
}

/// `TestCase` as exposed over the wire, matching the original service's
/// `to_dict()` field names rather than this crate's storage field names.
#[derive(Serialize)]
struct WireTestCase<'a> {
    id: Option<i64>,
    input: &'a str,
    output: &'a str,
    answer: &'a str,
    status: &'a str,
    detail: &'a str,
    time_used_ms: Option<f64>,
    memory_used_mib: Option<f64>,
}

impl<'a> From<&'a TestCase> for WireTestCase<'a> {
    fn from(case: &'a TestCase) -> Self {
        WireTestCase {
            id: case.id,
            input: &case.input_data,
            output: &case.user_output,
            answer: &case.std_output,
            status: &case.status,
            detail: &case.detail,
            time_used_ms: case.time_used_ms,
            memory_used_mib: case.memory_used_mib,
        }
    }
}

/// Writes one SSE record (`event: <type>\ndata: <json>\n\n`) and flushes.
pub async fn write_event<W: AsyncWrite + Unpin>(writer: &mut W, event: &Event) -> std::io::Result<()> {
    write_event_at(writer, event, Utc::now()).await
}

async fn write_event_at<W: AsyncWrite + Unpin>(
    writer: &mut W,
    event: &Event,
    timestamp: DateTime<Utc>,
) -> std::io::Result<()> {
    let data = event.payload(timestamp).to_string();
    let record = format!("event: {}\ndata: {}\n\n", event.type_name(), data);
    writer.write_all(record.as_bytes()).await?;
    writer.flush().await
}
