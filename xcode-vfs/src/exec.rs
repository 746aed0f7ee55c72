// ---------------------------------------------------------------------------
// Execution bridge: hands a file's text to a script runner
// ---------------------------------------------------------------------------

use std::process::Stdio;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::Mutex;

pub const NO_OUTPUT: &str = "No output.";
pub const PROGRESS_TICK: Duration = Duration::from_millis(200);

/// Something that can run a program text and capture what it prints.
#[async_trait]
pub trait ExecutionService: Send + Sync {
	/// One-time setup. Called again on the next run only if it failed.
	async fn initialize(&self) -> Result<(), String>;

	/// Runs `source` and returns combined stdout/stderr, or an error text.
	async fn run(&self, source: &str) -> Result<String, String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitState {
	Uninitialized,
	Initializing,
	Ready,
	Failed(String),
}

pub struct ExecutionBridge {
	service: Box<dyn ExecutionService>,
	state: StdMutex<InitState>,
	// Held for the whole initialization so concurrent callers wait on it.
	init_gate: Mutex<()>,
	tick: Duration,
}

impl ExecutionBridge {
	pub fn new(service: Box<dyn ExecutionService>) -> Self {
		Self::with_tick(service, PROGRESS_TICK)
	}

	pub fn with_tick(service: Box<dyn ExecutionService>, tick: Duration) -> Self {
		Self {
			service,
			state: StdMutex::new(InitState::Uninitialized),
			init_gate: Mutex::new(()),
			tick,
		}
	}

	pub fn state(&self) -> InitState {
		self.state
			.lock()
			.map(|s| s.clone())
			.unwrap_or_else(|poisoned| poisoned.into_inner().clone())
	}

	fn set_state(&self, next: InitState) {
		if let Ok(mut s) = self.state.lock() {
			*s = next;
		}
	}

	/// Initializes the service until it succeeds once; a failed attempt is
	/// retried by the next caller. Progress is reported as coarse
	/// percentages: 0, then +10 per tick capped at 90, then 100 on success.
	pub async fn ensure_initialized(
		&self,
		progress: &mut (dyn FnMut(u8) + Send),
	) -> Result<(), String> {
		let _gate = self.init_gate.lock().await;
		if self.state() == InitState::Ready {
			return Ok(());
		}

		self.set_state(InitState::Initializing);
		tracing::info!("Initializing execution service");
		progress(0);

		let init = self.service.initialize();
		tokio::pin!(init);
		let mut ticker = tokio::time::interval(self.tick);
		ticker.tick().await;
		let mut pct = 0u8;
		let result = loop {
			tokio::select! {
				r = &mut init => break r,
				_ = ticker.tick() => {
					pct = (pct + 10).min(90);
					progress(pct);
				}
			}
		};

		match result {
			Ok(()) => {
				self.set_state(InitState::Ready);
				progress(100);
				tracing::info!("Execution service ready");
				Ok(())
			}
			Err(e) => {
				tracing::warn!(error = %e, "Execution service failed to initialize");
				self.set_state(InitState::Failed(e.clone()));
				Err(e)
			}
		}
	}

	/// Runs a snapshot of a file's text. Always yields readable text: the
	/// captured output, a placeholder when there is none, or the error.
	pub async fn run(&self, source: &str, progress: &mut (dyn FnMut(u8) + Send)) -> String {
		if let Err(e) = self.ensure_initialized(progress).await {
			return format!("Failed to initialize runtime: {}", e);
		}
		match self.service.run(source).await {
			Ok(out) if out.trim().is_empty() => NO_OUTPUT.to_string(),
			Ok(out) => out,
			Err(e) => e,
		}
	}
}

// ---------------------------------------------------------------------------
// Python subprocess runner
// ---------------------------------------------------------------------------

// Reads the program from stdin, funnels stdout and stderr into one buffer
// and prints any exception message instead of a traceback.
const PY_WRAPPER: &str = r#"import io, sys
_source = sys.stdin.read()
_buffer = io.StringIO()
sys.stdout = _buffer
sys.stderr = _buffer
try:
    exec(compile(_source, "<script>", "exec"), {"__name__": "__main__"})
except BaseException as e:
    print(e)
sys.__stdout__.write(_buffer.getvalue())
"#;

pub struct PythonProcessService {
	program: String,
	timeout: Duration,
}

impl PythonProcessService {
	pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
		Self {
			program: program.into(),
			timeout,
		}
	}
}

#[async_trait]
impl ExecutionService for PythonProcessService {
	async fn initialize(&self) -> Result<(), String> {
		let output = Command::new(&self.program)
			.arg("--version")
			.stdin(Stdio::null())
			.output()
			.await
			.map_err(|e| format!("{}: {}", self.program, e))?;
		if !output.status.success() {
			return Err(format!("{} exited with {}", self.program, output.status));
		}
		let raw = if output.stdout.is_empty() { &output.stderr } else { &output.stdout };
		let version = String::from_utf8_lossy(raw);
		tracing::info!(program = %self.program, version = %version.trim(), "Python found");
		Ok(())
	}

	async fn run(&self, source: &str) -> Result<String, String> {
		let mut child = Command::new(&self.program)
			.arg("-c")
			.arg(PY_WRAPPER)
			.stdin(Stdio::piped())
			.stdout(Stdio::piped())
			.stderr(Stdio::piped())
			.kill_on_drop(true)
			.spawn()
			.map_err(|e| format!("{}: {}", self.program, e))?;

		if let Some(mut stdin) = child.stdin.take() {
			stdin
				.write_all(source.as_bytes())
				.await
				.map_err(|e| format!("Failed to send script: {}", e))?;
		}

		let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
			Ok(result) => result.map_err(|e| e.to_string())?,
			Err(_) => {
				return Err(format!(
					"Execution timed out after {}s",
					self.timeout.as_secs()
				));
			}
		};

		let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
		let stderr = String::from_utf8_lossy(&output.stderr);
		if !stderr.trim().is_empty() {
			text.push_str(&stderr);
		}
		Ok(text)
	}
}
