// ---------------------------------------------------------------------------
// Editor buffer: open file text, selection, find and replace
// ---------------------------------------------------------------------------

use std::ops::Range;

use regex::{NoExpand, Regex, RegexBuilder};

/// In-memory editor view: the open file's text plus a selection.
///
/// Offsets are byte positions on char boundaries. The cursor is the head of
/// the selection, i.e. `selection.end`.
#[derive(Debug, Clone, Default)]
pub struct TextBuffer {
	text: String,
	selection: Range<usize>,
}

impl TextBuffer {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn get_value(&self) -> &str {
		&self.text
	}

	/// Replaces the whole text and puts the cursor at the top.
	pub fn set_value(&mut self, text: &str) {
		self.text = text.to_string();
		self.selection = 0..0;
	}

	pub fn cursor(&self) -> usize {
		self.selection.end
	}

	pub fn selection(&self) -> Range<usize> {
		self.selection.clone()
	}

	pub fn selected_text(&self) -> &str {
		&self.text[self.selection.clone()]
	}

	/// Moves the cursor, collapsing the selection. Out-of-range or mid-char
	/// positions snap back to the previous char boundary.
	pub fn set_cursor(&mut self, pos: usize) {
		let mut pos = pos.min(self.text.len());
		while !self.text.is_char_boundary(pos) {
			pos -= 1;
		}
		self.selection = pos..pos;
	}

	/// Selects the next case-insensitive match after the cursor, wrapping to
	/// the top when nothing follows. Returns the selected range.
	pub fn find_next(&mut self, query: &str) -> Option<Range<usize>> {
		let re = matcher(query)?;
		let found = self.locate(&re)?;
		self.selection = found.clone();
		Some(found)
	}

	/// Replaces the next match after the cursor (wrapping like `find_next`).
	/// The cursor lands after the inserted text.
	pub fn replace(&mut self, query: &str, replacement: &str) -> Option<Range<usize>> {
		let re = matcher(query)?;
		let found = self.locate(&re)?;
		self.text.replace_range(found.clone(), replacement);
		let end = found.start + replacement.len();
		self.selection = end..end;
		Some(found)
	}

	/// Replaces every match scanning from the top and returns the count.
	/// Scanning resumes after each inserted replacement, so a replacement
	/// containing the query is never matched again.
	pub fn replace_all(&mut self, query: &str, replacement: &str) -> usize {
		let Some(re) = matcher(query) else {
			return 0;
		};
		let count = re.find_iter(&self.text).count();
		if count > 0 {
			self.text = re.replace_all(&self.text, NoExpand(replacement)).into_owned();
			self.selection = 0..0;
		}
		count
	}

	fn locate(&self, re: &Regex) -> Option<Range<usize>> {
		re.find_at(&self.text, self.cursor())
			.or_else(|| re.find(&self.text))
			.map(|m| m.range())
	}
}

fn matcher(query: &str) -> Option<Regex> {
	if query.is_empty() {
		return None;
	}
	RegexBuilder::new(&regex::escape(query))
		.case_insensitive(true)
		.build()
		.ok()
}
