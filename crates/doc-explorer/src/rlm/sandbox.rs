//! Sandboxed JavaScript session on a Deno subprocess

use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use tempfile::NamedTempFile;

use crate::agent::EngineError;

/// Driver loaded into Deno. Speaks line-delimited JSON on stdin/stdout.
const DRIVER: &str = r#"
const decoder = new TextDecoder();
const encoder = new TextEncoder();
let pending = "";

function readLine() {
  for (;;) {
    const nl = pending.indexOf("\n");
    if (nl >= 0) {
      const line = pending.slice(0, nl);
      pending = pending.slice(nl + 1);
      return line;
    }
    const buf = new Uint8Array(65536);
    const n = Deno.stdin.readSync(buf);
    if (n === null) return null;
    pending += decoder.decode(buf.subarray(0, n), { stream: true });
  }
}

function send(msg) {
  const data = encoder.encode(JSON.stringify(msg) + "\n");
  let off = 0;
  while (off < data.length) off += Deno.stdout.writeSync(data.subarray(off));
}

function show(value) {
  if (typeof value === "string") return value;
  try {
    const json = JSON.stringify(value);
    return json === undefined ? String(value) : json;
  } catch (_) {
    return String(value);
  }
}

let output = [];
globalThis.print = (...args) => { output.push(args.map(show).join(" ")); };
console.log = globalThis.print;
console.info = globalThis.print;
console.warn = globalThis.print;
console.error = globalThis.print;

globalThis.llm_query = (prompt) => {
  send({ type: "llm_query", prompt: String(prompt) });
  const line = readLine();
  if (line === null) throw new Error("host closed the session");
  const reply = JSON.parse(line);
  if (reply.error) throw new Error(reply.error);
  return reply.text;
};

for (;;) {
  const line = readLine();
  if (line === null) break;
  if (!line.trim()) continue;
  const req = JSON.parse(line);
  output = [];
  if (req.type === "define") {
    globalThis[req.name] = req.value;
  } else {
    try {
      (0, eval)(req.code);
    } catch (e) {
      output.push("Error: " + (e && e.message ? e.message : String(e)));
    }
  }
  send({ type: "result", output: output.join("\n") });
}
"#;

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum SandboxRequest<'a> {
    Define { name: &'a str, value: &'a str },
    Exec { code: &'a str },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum SandboxMessage {
    Result { output: String },
    LlmQuery { prompt: String },
}

#[derive(Serialize)]
struct QueryReply {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Persistent interpreter session. Globals survive across `execute` calls.
///
/// The subprocess runs with no permissions: no file, network, or env access.
pub struct Sandbox {
    child: Child,
    stdin: ChildStdin,
    lines: Receiver<String>,
    timeout: Duration,
    _driver: NamedTempFile,
}

impl Sandbox {
    /// Start a session; `timeout` bounds the wait for each message from the interpreter
    pub fn spawn(interpreter: &Path, timeout: Duration) -> Result<Self, EngineError> {
        let mut driver = tempfile::Builder::new()
            .prefix("doc-explorer-sandbox-")
            .suffix(".js")
            .tempfile()
            .map_err(|e| EngineError::Sandbox(format!("Failed to write driver: {}", e)))?;
        driver
            .write_all(DRIVER.as_bytes())
            .and_then(|_| driver.flush())
            .map_err(|e| EngineError::Sandbox(format!("Failed to write driver: {}", e)))?;

        let mut child = Command::new(interpreter)
            .args(["run", "--quiet", "--no-prompt", "--no-config"])
            .arg(driver.path())
            .env("DENO_NO_UPDATE_CHECK", "1")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                EngineError::Sandbox(format!("Failed to start {}: {}", interpreter.display(), e))
            })?;

        let (stdin, stdout, stderr) = match (child.stdin.take(), child.stdout.take(), child.stderr.take()) {
            (Some(stdin), Some(stdout), Some(stderr)) => (stdin, stdout, stderr),
            _ => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(EngineError::Sandbox("Interpreter pipes unavailable".to_string()));
            }
        };

        let (tx, lines) = mpsc::channel();
        thread::spawn(move || {
            for line in BufReader::new(stdout).lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
        });
        thread::spawn(move || {
            for line in BufReader::new(stderr).lines().map_while(|l| l.ok()) {
                tracing::debug!("sandbox stderr: {}", line);
            }
        });

        tracing::debug!("Sandbox started (pid {})", child.id());

        Ok(Self {
            child,
            stdin,
            lines,
            timeout,
            _driver: driver,
        })
    }

    /// Bind a global string variable
    pub fn define(&mut self, name: &str, value: &str) -> Result<(), EngineError> {
        self.send(&SandboxRequest::Define { name, value })?;
        self.execute_reply(|_| Err("llm_query unavailable while defining".to_string()))
            .map(|_| ())
    }

    /// Run code and return its printed output.
    ///
    /// `on_query` answers `llm_query` calls made by the code; an `Err` is
    /// raised as an exception inside the sandbox.
    pub fn execute<F>(&mut self, code: &str, on_query: F) -> Result<String, EngineError>
    where
        F: FnMut(&str) -> Result<String, String>,
    {
        self.send(&SandboxRequest::Exec { code })?;
        self.execute_reply(on_query)
    }

    fn execute_reply<F>(&mut self, mut on_query: F) -> Result<String, EngineError>
    where
        F: FnMut(&str) -> Result<String, String>,
    {
        loop {
            match self.recv()? {
                SandboxMessage::Result { output } => return Ok(output),
                SandboxMessage::LlmQuery { prompt } => {
                    let reply = match on_query(&prompt) {
                        Ok(text) => QueryReply {
                            text: Some(text),
                            error: None,
                        },
                        Err(message) => QueryReply {
                            text: None,
                            error: Some(message),
                        },
                    };
                    self.send(&reply)?;
                }
            }
        }
    }

    fn send<T: Serialize>(&mut self, message: &T) -> Result<(), EngineError> {
        let line = serde_json::to_string(message)
            .map_err(|e| EngineError::Sandbox(format!("Failed to encode message: {}", e)))?;
        writeln!(self.stdin, "{}", line)
            .and_then(|_| self.stdin.flush())
            .map_err(|e| EngineError::Sandbox(format!("Interpreter not accepting input: {}", e)))
    }

    fn recv(&mut self) -> Result<SandboxMessage, EngineError> {
        loop {
            let line = match self.lines.recv_timeout(self.timeout) {
                Ok(line) => line,
                Err(RecvTimeoutError::Timeout) => {
                    return Err(EngineError::Timeout(self.timeout.as_secs()))
                }
                Err(RecvTimeoutError::Disconnected) => {
                    let status = self.child.try_wait().ok().flatten();
                    return Err(EngineError::Sandbox(match status {
                        Some(status) => format!("Interpreter exited ({})", status),
                        None => "Interpreter closed its output".to_string(),
                    }));
                }
            };

            match serde_json::from_str(&line) {
                Ok(message) => return Ok(message),
                Err(_) => tracing::debug!("Ignoring sandbox line: {}", line),
            }
        }
    }
}

impl Drop for Sandbox {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::InterpreterLocator;

    fn deno() -> Option<std::path::PathBuf> {
        InterpreterLocator::from_env(None).locate().ok()
    }

    #[test]
    fn test_spawn_missing_binary() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = Sandbox::spawn(&dir.path().join("no-such-deno"), Duration::from_secs(5));
        assert!(matches!(result, Err(EngineError::Sandbox(_))));
    }

    #[test]
    fn test_request_encoding() {
        let line = serde_json::to_string(&SandboxRequest::Exec { code: "print(1)" }).unwrap();
        assert_eq!(line, r#"{"type":"exec","code":"print(1)"}"#);

        let message: SandboxMessage =
            serde_json::from_str(r#"{"type":"llm_query","prompt":"hi"}"#).unwrap();
        assert!(matches!(message, SandboxMessage::LlmQuery { prompt } if prompt == "hi"));
    }

    #[test]
    fn test_session_round_trip_when_deno_installed() {
        let Some(deno) = deno() else {
            return;
        };

        let mut sandbox = Sandbox::spawn(&deno, Duration::from_secs(60)).unwrap();
        sandbox.define("context", "Hello world\nline two").unwrap();

        let output = sandbox
            .execute("var lines = context.split('\\n'); print(lines.length)", |_| {
                Err("unused".to_string())
            })
            .unwrap();
        assert_eq!(output, "2");

        let output = sandbox
            .execute("print(lines[0], llm_query('tone?'))", |prompt| {
                Ok(format!("echo:{}", prompt))
            })
            .unwrap();
        assert_eq!(output, "Hello world echo:tone?");

        let output = sandbox
            .execute("throw new Error('bad')", |_| Err("unused".to_string()))
            .unwrap();
        assert_eq!(output, "Error: bad");
    }
}
