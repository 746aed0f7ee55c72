// ---------------------------------------------------------------------------
// Shell interpreter: single-directory POSIX-ish commands over the workspace
// ---------------------------------------------------------------------------

use crate::node::{NodeId, NodeType};
use crate::tree::Workspace;

/// A parsed command line. Arguments beyond the ones a command uses are
/// ignored; a missing required argument is kept as `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<'a> {
	Ls,
	Pwd,
	Cd(Option<&'a str>),
	Mkdir(Option<&'a str>),
	Touch(Option<&'a str>),
	Rm(Option<&'a str>),
	Mv(Option<(&'a str, &'a str)>),
	Echo(Vec<&'a str>),
	Python(Option<&'a str>),
	Exit,
	Unknown(&'a str),
}

impl<'a> Command<'a> {
	/// Whitespace tokenization, no quoting. `None` for a blank line.
	pub fn parse(line: &'a str) -> Option<Self> {
		let mut tokens = line.split_whitespace();
		let name = tokens.next()?;
		let args: Vec<&str> = tokens.collect();
		let first = args.first().copied();
		Some(match name {
			"ls" => Self::Ls,
			"pwd" => Self::Pwd,
			"cd" => Self::Cd(first),
			"mkdir" => Self::Mkdir(first),
			"touch" => Self::Touch(first),
			"rm" => Self::Rm(first),
			"mv" => Self::Mv(match args.as_slice() {
				[old, new, ..] => Some((*old, *new)),
				_ => None,
			}),
			"echo" => Self::Echo(args),
			"python" => Self::Python(first),
			"exit" => Self::Exit,
			other => Self::Unknown(other),
		})
	}
}

/// Effects the interpreter cannot carry out on the tree by itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellAction {
	/// Leave terminal mode and go back to the explorer.
	Exit,
	/// Hand a snapshot of a file's text to the execution bridge.
	Run { name: String, source: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellOutcome {
	pub lines: Vec<String>,
	/// The tree changed and should be persisted.
	pub mutated: bool,
	pub action: Option<ShellAction>,
}

impl ShellOutcome {
	fn line(text: impl Into<String>) -> Self {
		Self {
			lines: vec![text.into()],
			..Self::default()
		}
	}

	fn mutated() -> Self {
		Self {
			mutated: true,
			..Self::default()
		}
	}
}

/// Interpreter state: the folders from the root down to the current
/// directory. The current directory is always the last entry.
#[derive(Debug, Clone)]
pub struct Shell {
	path: Vec<NodeId>,
}

impl Shell {
	pub fn new(root: &NodeId) -> Self {
		Self {
			path: vec![root.clone()],
		}
	}

	pub fn current_dir(&self) -> &NodeId {
		// `path` always holds at least the root.
		&self.path[self.path.len() - 1]
	}

	pub fn path(&self) -> &[NodeId] {
		&self.path
	}

	pub fn reset(&mut self, ws: &Workspace) {
		self.path = vec![ws.root_id().clone()];
	}

	fn path_names(&self, ws: &Workspace) -> String {
		self.path
			.iter()
			.filter_map(|id| ws.find(id))
			.map(|n| n.name())
			.collect::<Vec<_>>()
			.join("/")
	}

	pub fn prompt(&self, ws: &Workspace) -> String {
		format!("xcode:~/{}$", self.path_names(ws))
	}

	pub fn pwd(&self, ws: &Workspace) -> String {
		format!("/{}", self.path_names(ws))
	}

	/// Repairs the path after tree edits made outside the shell. A current
	/// directory that still exists keeps its place (re-rooted at its real
	/// ancestry); one that was deleted sends the shell back to the root.
	pub fn resync(&mut self, ws: &Workspace) {
		let intact = self.path.first() == Some(ws.root_id())
			&& self.path.windows(2).all(|pair| {
				ws.find(&pair[1])
					.is_some_and(|n| n.is_folder() && n.parent() == Some(&pair[0]))
			});
		if intact {
			return;
		}

		let cwd = self.current_dir().clone();
		let ancestry = ws.ancestry(&cwd);
		let still_folder = ws.find(&cwd).is_some_and(|n| n.is_folder());
		if still_folder && ancestry.first() == Some(ws.root_id()) {
			tracing::debug!(cwd = %cwd, "Shell path re-rooted");
			self.path = ancestry;
		} else {
			tracing::debug!(cwd = %cwd, "Shell directory vanished, back to root");
			self.reset(ws);
		}
	}

	pub fn execute(&mut self, ws: &mut Workspace, line: &str) -> ShellOutcome {
		self.resync(ws);
		let Some(command) = Command::parse(line.trim()) else {
			return ShellOutcome::default();
		};
		tracing::debug!(?command, "Shell command");

		let cwd = self.current_dir().clone();
		match command {
			Command::Exit => ShellOutcome {
				action: Some(ShellAction::Exit),
				..ShellOutcome::default()
			},
			Command::Ls => {
				let listing = ws
					.children_of(&cwd)
					.map(|n| n.name())
					.collect::<Vec<_>>()
					.join("  ");
				ShellOutcome::line(listing)
			}
			Command::Pwd => ShellOutcome::line(self.pwd(ws)),
			Command::Cd(None) => {
				self.reset(ws);
				ShellOutcome::default()
			}
			Command::Cd(Some("..")) => {
				if self.path.len() > 1 {
					self.path.pop();
				}
				ShellOutcome::default()
			}
			Command::Cd(Some(target)) => {
				let found = ws
					.children_of(&cwd)
					.find(|n| n.name() == target && n.is_folder())
					.map(|n| n.id().clone());
				match found {
					Some(id) => {
						self.path.push(id);
						ShellOutcome::default()
					}
					None => ShellOutcome::line(format!("cd: no such file or directory: {}", target)),
				}
			}
			Command::Mkdir(None) => ShellOutcome::line("mkdir: missing operand"),
			Command::Mkdir(Some(name)) => {
				if ws.child_by_name(&cwd, name).is_some() {
					return ShellOutcome::line(format!(
						"mkdir: cannot create directory '{}': File exists",
						name
					));
				}
				Self::insert(ws, &cwd, NodeType::Folder, name)
			}
			Command::Touch(None) => ShellOutcome::line("touch: missing file operand"),
			Command::Touch(Some(name)) => {
				if ws.child_by_name(&cwd, name).is_some() {
					return ShellOutcome::default();
				}
				Self::insert(ws, &cwd, NodeType::File, name)
			}
			Command::Rm(None) => ShellOutcome::line("rm: missing operand"),
			Command::Rm(Some(name)) => {
				let target = ws.child_by_name(&cwd, name).map(|n| n.id().clone());
				match target.map(|id| ws.delete(&id)) {
					Some(Ok(_)) => ShellOutcome::mutated(),
					Some(Err(e)) => ShellOutcome::line(format!("rm: cannot remove '{}': {}", name, e)),
					None => ShellOutcome::line(format!(
						"rm: cannot remove '{}': No such file or directory",
						name
					)),
				}
			}
			Command::Mv(None) => ShellOutcome::line("mv: missing operand"),
			Command::Mv(Some((old, new))) => {
				let target = ws.child_by_name(&cwd, old).map(|n| n.id().clone());
				match target.map(|id| ws.rename(&id, new)) {
					Some(Ok(_)) => ShellOutcome::mutated(),
					Some(Err(e)) => ShellOutcome::line(format!("mv: cannot move '{}': {}", old, e)),
					None => ShellOutcome::line(format!(
						"mv: cannot stat '{}': No such file or directory",
						old
					)),
				}
			}
			Command::Echo(args) => ShellOutcome::line(args.join(" ")),
			Command::Python(None) => ShellOutcome::line("python: missing operand"),
			Command::Python(Some(name)) => {
				let file = ws
					.children_of(&cwd)
					.find(|n| n.name() == name && n.is_file());
				match file {
					Some(f) => ShellOutcome {
						action: Some(ShellAction::Run {
							name: f.name().to_string(),
							source: f.content().unwrap_or_default().to_string(),
						}),
						..ShellOutcome::default()
					},
					None => ShellOutcome::line(format!(
						"python: can't open file '{}': No such file",
						name
					)),
				}
			}
			Command::Unknown(name) => ShellOutcome::line(format!("{}: command not found", name)),
		}
	}

	fn insert(ws: &mut Workspace, cwd: &NodeId, kind: NodeType, name: &str) -> ShellOutcome {
		match ws.insert_child(cwd, kind, name, String::new()) {
			Ok(_) => ShellOutcome::mutated(),
			Err(e) => ShellOutcome::line(e.to_string()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn setup() -> (Workspace, Shell) {
		let ws = Workspace::new("workspace");
		let shell = Shell::new(ws.root_id());
		(ws, shell)
	}

	fn run(ws: &mut Workspace, sh: &mut Shell, line: &str) -> Vec<String> {
		sh.execute(ws, line).lines
	}

	// -- parsing --

	#[test]
	fn parse_splits_on_whitespace() {
		assert_eq!(Command::parse("  mv   a  b c"), Some(Command::Mv(Some(("a", "b")))));
		assert_eq!(Command::parse("echo hi   there"), Some(Command::Echo(vec!["hi", "there"])));
		assert_eq!(Command::parse("cd"), Some(Command::Cd(None)));
		assert_eq!(Command::parse("mv a"), Some(Command::Mv(None)));
		assert_eq!(Command::parse("   "), None);
	}

	// -- navigation --

	#[test]
	fn pwd_follows_cd() {
		let (mut ws, mut sh) = setup();
		run(&mut ws, &mut sh, "mkdir a");
		assert!(run(&mut ws, &mut sh, "cd a").is_empty());
		assert_eq!(run(&mut ws, &mut sh, "pwd"), vec!["/workspace/a"]);
		run(&mut ws, &mut sh, "cd ..");
		assert_eq!(run(&mut ws, &mut sh, "pwd"), vec!["/workspace"]);
	}

	#[test]
	fn cd_dotdot_at_root_is_noop() {
		let (mut ws, mut sh) = setup();
		assert!(run(&mut ws, &mut sh, "cd ..").is_empty());
		assert_eq!(sh.path().len(), 1);
	}

	#[test]
	fn bare_cd_returns_to_root() {
		let (mut ws, mut sh) = setup();
		run(&mut ws, &mut sh, "mkdir a");
		run(&mut ws, &mut sh, "cd a");
		run(&mut ws, &mut sh, "mkdir b");
		run(&mut ws, &mut sh, "cd b");
		assert_eq!(sh.prompt(&ws), "xcode:~/workspace/a/b$");
		run(&mut ws, &mut sh, "cd");
		assert_eq!(sh.path(), &[ws.root_id().clone()]);
		assert_eq!(sh.prompt(&ws), "xcode:~/workspace$");
	}

	#[test]
	fn cd_into_file_or_missing_reports() {
		let (mut ws, mut sh) = setup();
		run(&mut ws, &mut sh, "touch f.txt");
		assert_eq!(
			run(&mut ws, &mut sh, "cd f.txt"),
			vec!["cd: no such file or directory: f.txt"]
		);
		assert_eq!(
			run(&mut ws, &mut sh, "cd nope"),
			vec!["cd: no such file or directory: nope"]
		);
	}

	#[test]
	fn cd_does_not_walk_multi_segment_paths() {
		let (mut ws, mut sh) = setup();
		run(&mut ws, &mut sh, "mkdir a");
		run(&mut ws, &mut sh, "cd a");
		run(&mut ws, &mut sh, "mkdir b");
		run(&mut ws, &mut sh, "cd");
		assert_eq!(
			run(&mut ws, &mut sh, "cd a/b"),
			vec!["cd: no such file or directory: a/b"]
		);
	}

	// -- listing --

	#[test]
	fn ls_lists_in_insertion_order() {
		let (mut ws, mut sh) = setup();
		assert_eq!(run(&mut ws, &mut sh, "ls"), vec![""]);
		run(&mut ws, &mut sh, "touch b.txt");
		run(&mut ws, &mut sh, "mkdir a");
		assert_eq!(run(&mut ws, &mut sh, "ls"), vec!["b.txt  a"]);
	}

	// -- mutation --

	#[test]
	fn mkdir_rejects_existing_name() {
		let (mut ws, mut sh) = setup();
		run(&mut ws, &mut sh, "touch a");
		let out = sh.execute(&mut ws, "mkdir a");
		assert_eq!(out.lines, vec!["mkdir: cannot create directory 'a': File exists"]);
		assert!(!out.mutated);
		assert_eq!(ws.root().children().len(), 1);
	}

	#[test]
	fn touch_twice_keeps_one_file_silently() {
		let (mut ws, mut sh) = setup();
		let first = sh.execute(&mut ws, "touch f.txt");
		assert!(first.mutated);
		let second = sh.execute(&mut ws, "touch f.txt");
		assert!(second.lines.is_empty());
		assert!(!second.mutated);
		let count = ws.children_of(ws.root_id()).filter(|n| n.name() == "f.txt").count();
		assert_eq!(count, 1);
	}

	#[test]
	fn rm_missing_reports_and_keeps_tree() {
		let (mut ws, mut sh) = setup();
		let out = sh.execute(&mut ws, "rm missing.txt");
		assert_eq!(
			out.lines,
			vec!["rm: cannot remove 'missing.txt': No such file or directory"]
		);
		assert!(!out.mutated);
		assert_eq!(ws.len(), 1);
	}

	#[test]
	fn rm_folder_releases_contents() {
		let (mut ws, mut sh) = setup();
		run(&mut ws, &mut sh, "mkdir a");
		run(&mut ws, &mut sh, "cd a");
		run(&mut ws, &mut sh, "touch inner");
		run(&mut ws, &mut sh, "cd ..");
		assert!(sh.execute(&mut ws, "rm a").mutated);
		assert_eq!(ws.len(), 1);
	}

	#[test]
	fn rm_removes_first_match_only() {
		let (mut ws, mut sh) = setup();
		let root = ws.root_id().clone();
		ws.insert_child(&root, NodeType::File, "dup", "one".into()).unwrap();
		ws.insert_child(&root, NodeType::File, "dup", "two".into()).unwrap();
		run(&mut ws, &mut sh, "rm dup");
		let left: Vec<_> = ws.children_of(&root).map(|n| n.content().unwrap().to_string()).collect();
		assert_eq!(left, vec!["two"]);
	}

	#[test]
	fn mv_renames_in_place() {
		let (mut ws, mut sh) = setup();
		run(&mut ws, &mut sh, "touch old.txt");
		let id = ws.root().children()[0].clone();
		assert!(sh.execute(&mut ws, "mv old.txt new.txt").mutated);
		assert_eq!(ws.find(&id).unwrap().name(), "new.txt");
		assert_eq!(
			run(&mut ws, &mut sh, "mv ghost x"),
			vec!["mv: cannot stat 'ghost': No such file or directory"]
		);
		assert_eq!(run(&mut ws, &mut sh, "mv only"), vec!["mv: missing operand"]);
	}

	#[test]
	fn missing_operands() {
		let (mut ws, mut sh) = setup();
		assert_eq!(run(&mut ws, &mut sh, "mkdir"), vec!["mkdir: missing operand"]);
		assert_eq!(run(&mut ws, &mut sh, "touch"), vec!["touch: missing file operand"]);
		assert_eq!(run(&mut ws, &mut sh, "rm"), vec!["rm: missing operand"]);
		assert_eq!(run(&mut ws, &mut sh, "python"), vec!["python: missing operand"]);
	}

	// -- misc --

	#[test]
	fn echo_joins_arguments() {
		let (mut ws, mut sh) = setup();
		assert_eq!(run(&mut ws, &mut sh, "echo hello   world"), vec!["hello world"]);
		assert_eq!(run(&mut ws, &mut sh, "echo"), vec![""]);
	}

	#[test]
	fn unknown_command() {
		let (mut ws, mut sh) = setup();
		assert_eq!(run(&mut ws, &mut sh, "grep x"), vec!["grep: command not found"]);
	}

	#[test]
	fn blank_line_does_nothing() {
		let (mut ws, mut sh) = setup();
		assert_eq!(sh.execute(&mut ws, "   "), ShellOutcome::default());
	}

	#[test]
	fn exit_requests_leaving_shell() {
		let (mut ws, mut sh) = setup();
		assert_eq!(sh.execute(&mut ws, "exit").action, Some(ShellAction::Exit));
	}

	#[test]
	fn python_snapshots_file_content() {
		let (mut ws, mut sh) = setup();
		let root = ws.root_id().clone();
		ws.insert_child(&root, NodeType::File, "main.py", "print(1)".into()).unwrap();
		ws.insert_child(&root, NodeType::Folder, "pkg", String::new()).unwrap();

		assert_eq!(
			sh.execute(&mut ws, "python main.py").action,
			Some(ShellAction::Run {
				name: "main.py".to_string(),
				source: "print(1)".to_string(),
			})
		);
		assert_eq!(
			run(&mut ws, &mut sh, "python pkg"),
			vec!["python: can't open file 'pkg': No such file"]
		);
	}

	// -- external edits --

	#[test]
	fn deleted_cwd_falls_back_to_root() {
		let (mut ws, mut sh) = setup();
		run(&mut ws, &mut sh, "mkdir a");
		run(&mut ws, &mut sh, "cd a");
		let a = sh.current_dir().clone();
		ws.delete(&a).unwrap();
		assert_eq!(run(&mut ws, &mut sh, "pwd"), vec!["/workspace"]);
	}

	#[test]
	fn moved_cwd_is_rerooted() {
		let (mut ws, mut sh) = setup();
		run(&mut ws, &mut sh, "mkdir a");
		run(&mut ws, &mut sh, "mkdir b");
		run(&mut ws, &mut sh, "cd a");
		let a = sh.current_dir().clone();
		let b = ws.child_by_name(&ws.root_id().clone(), "b").unwrap().id().clone();
		ws.move_node(&a, &b).unwrap();
		assert_eq!(run(&mut ws, &mut sh, "pwd"), vec!["/workspace/b/a"]);
	}
}
