//! Scripted executor for tests

use super::{CommandSpec, ProcessExecutor, ProcessResult};
use crate::error::{RubypackError, RubypackResult};
use async_trait::async_trait;
use std::sync::Mutex;

/// Executor that records commands and answers from a script.
///
/// A command is answered by the first scripted response whose pattern
/// occurs in its rendered command line; unmatched commands succeed with
/// empty output.
#[derive(Default)]
pub(crate) struct ScriptedExecutor {
    responses: Vec<(String, ProcessResult)>,
    unstartable: Vec<String>,
    calls: Mutex<Vec<(CommandSpec, bool)>>,
}

impl ScriptedExecutor {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Answer commands containing `pattern` with `result`
    pub(crate) fn respond(mut self, pattern: &str, result: ProcessResult) -> Self {
        self.responses.push((pattern.to_string(), result));
        self
    }

    /// Answer commands containing `pattern` with a successful `stdout`
    pub(crate) fn respond_stdout(self, pattern: &str, stdout: &str) -> Self {
        self.respond(pattern, ProcessResult::new(Some(0), stdout, ""))
    }

    /// Fail commands containing `pattern` as if the program were missing
    pub(crate) fn unstartable(mut self, pattern: &str) -> Self {
        self.unstartable.push(pattern.to_string());
        self
    }

    /// Every command run so far, in order
    pub(crate) fn calls(&self) -> Vec<CommandSpec> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(cmd, _)| cmd.clone())
            .collect()
    }

    /// Rendered command lines of every command run so far
    pub(crate) fn command_lines(&self) -> Vec<String> {
        self.calls().iter().map(ToString::to_string).collect()
    }

    /// Commands whose rendered line contains `pattern`
    pub(crate) fn calls_matching(&self, pattern: &str) -> Vec<CommandSpec> {
        self.calls()
            .into_iter()
            .filter(|cmd| cmd.to_string().contains(pattern))
            .collect()
    }

    /// Whether the command containing `pattern` was streamed (`pipe`)
    pub(crate) fn was_piped(&self, pattern: &str) -> bool {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .any(|(cmd, piped)| *piped && cmd.to_string().contains(pattern))
    }

    fn answer(&self, cmd: &CommandSpec, piped: bool) -> RubypackResult<ProcessResult> {
        self.calls.lock().unwrap().push((cmd.clone(), piped));
        let line = cmd.to_string();
        if self.unstartable.iter().any(|pattern| line.contains(pattern.as_str())) {
            return Err(RubypackError::process_spawn(
                line,
                std::io::Error::from(std::io::ErrorKind::NotFound),
            ));
        }
        Ok(self
            .responses
            .iter()
            .find(|(pattern, _)| line.contains(pattern.as_str()))
            .map(|(_, result)| result.clone())
            .unwrap_or_else(|| ProcessResult::new(Some(0), "", "")))
    }
}

#[async_trait]
impl ProcessExecutor for ScriptedExecutor {
    async fn run(&self, cmd: &CommandSpec) -> RubypackResult<ProcessResult> {
        self.answer(cmd, false)
    }

    async fn pipe(&self, cmd: &CommandSpec) -> RubypackResult<ProcessResult> {
        self.answer(cmd, true)
    }
}
