//! Pure transition function for the encode lifecycle.
//!
//! All `EncodeState` mutation in this crate funnels through
//! [`transition`]; callers decide which actions to dispatch, the
//! reducer decides what each action means.

use std::collections::VecDeque;

use serde::Serialize;
use shared::domain::{EncodeProgress, EncodeStatus};

/// Upper bound on retained log lines; oldest lines are evicted first.
pub const MAX_LOG_LINES: usize = 500;

pub(crate) const STARTUP_LOG: &str = "正在启动FFmpeg...";
pub(crate) const STOP_LOG: &str = "⏹️ 用户请求停止";

/// Aggregate lifecycle state of one encode run.
///
/// `Default` is the initial idle state. Invariants upheld by the
/// reducer:
/// - `logs.len() <= MAX_LOG_LINES`
/// - `output_path.is_some()` iff `status == Completed`
/// - `error.is_some()` iff `status == Error`
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodeState {
    pub status: EncodeStatus,
    pub progress: Option<EncodeProgress>,
    pub logs: VecDeque<String>,
    pub output_path: Option<String>,
    pub error: Option<String>,
}

/// Actions the orchestrator dispatches into [`transition`].
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Start,
    Progress(EncodeProgress),
    Log(String),
    Complete(String),
    Error(String),
    Stop,
    Reset,
}

/// Maps `(state, action)` to the next state. Pure, no I/O.
///
/// Progress and log actions are accepted from any status here; the
/// orchestrator filters out the non-running ones before dispatching.
/// Complete and error are accepted unconditionally because the backend
/// may report them without an intervening stop.
pub fn transition(state: EncodeState, action: Action) -> EncodeState {
    match action {
        Action::Start => EncodeState {
            status: EncodeStatus::Running,
            logs: VecDeque::from([STARTUP_LOG.to_string()]),
            ..EncodeState::default()
        },
        Action::Progress(progress) => EncodeState {
            progress: Some(progress),
            ..state
        },
        Action::Log(line) => {
            let mut next = state;
            push_log(&mut next.logs, line);
            next
        }
        Action::Complete(output_path) => {
            let mut next = state;
            next.status = EncodeStatus::Completed;
            push_log(
                &mut next.logs,
                format!("✅ 压制完成！输出文件: {output_path}"),
            );
            if let Some(progress) = next.progress.as_mut() {
                progress.percentage = 100;
            }
            next.output_path = Some(output_path);
            next.error = None;
            next
        }
        Action::Error(message) => {
            let mut next = state;
            next.status = EncodeStatus::Error;
            push_log(&mut next.logs, format!("❌ 错误: {message}"));
            next.error = Some(message);
            next.output_path = None;
            next
        }
        Action::Stop => {
            let mut next = state;
            next.status = EncodeStatus::Stopped;
            push_log(&mut next.logs, STOP_LOG.to_string());
            next.output_path = None;
            next.error = None;
            next
        }
        Action::Reset => EncodeState::default(),
    }
}

fn push_log(logs: &mut VecDeque<String>, line: String) {
    logs.push_back(line);
    while logs.len() > MAX_LOG_LINES {
        logs.pop_front();
    }
}

#[cfg(test)]
#[path = "tests/reducer_tests.rs"]
mod tests;
