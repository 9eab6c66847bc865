/// Instruction block pinning the assistant to career-guidance topics.
/// Overridable through `chat.instructions` in the config.
pub const DEFAULT_INSTRUCTIONS: &str = "\
You are a note-taking career guidance assistant, responsible for answering user questions ONLY \
about career oriented questions; if asked otherwise, refuse. You answer the user's question based \
on their existing notes and documentation about career guidance. If you cannot come up with \
career suggestions or lack information, advise the user to add notes to the board instead of \
typing in chat. If the user asks a question unrelated to career guidance, respond with: \"Thanks \
for your question! It seems unrelated to career guidance. If you need career advice, feel free \
to ask!\"";

pub const OWN_NOTES_HEADER: &str = "The relevant notes for this query are:";
pub const PEER_NOTES_HEADER: &str = "Notes from users with similar interests:";
pub const NO_RELEVANT_NOTES: &str = "No relevant notes found.";

#[derive(Debug, Clone)]
pub struct NoteSnippet {
	pub title: String,
	pub content: String,
}

pub fn build_system_prompt(
	instructions: &str,
	own_notes: &[NoteSnippet],
	peer_notes: &[NoteSnippet],
) -> String {
	let mut prompt = String::from(instructions);

	prompt.push('\n');
	prompt.push_str(OWN_NOTES_HEADER);
	prompt.push('\n');
	prompt.push_str(&render_section(own_notes));

	if !peer_notes.is_empty() {
		prompt.push_str("\n\n");
		prompt.push_str(PEER_NOTES_HEADER);
		prompt.push('\n');
		prompt.push_str(&render_section(peer_notes));
	}

	prompt
}

fn render_section(notes: &[NoteSnippet]) -> String {
	if notes.is_empty() {
		return NO_RELEVANT_NOTES.to_string();
	}

	notes.iter().map(render_note).collect::<Vec<_>>().join("\n\n")
}

fn render_note(note: &NoteSnippet) -> String {
	format!("Title: {}\nContent:\n{}", note.title, note.content)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn snippet(title: &str, content: &str) -> NoteSnippet {
		NoteSnippet { title: title.to_string(), content: content.to_string() }
	}

	#[test]
	fn renders_notes_with_title_and_content() {
		let prompt = build_system_prompt(
			DEFAULT_INSTRUCTIONS,
			&[snippet("Rust", "Learn ownership"), snippet("SQL", "Window functions")],
			&[],
		);

		assert!(prompt.contains("Title: Rust\nContent:\nLearn ownership"));
		assert!(prompt.contains("Title: SQL\nContent:\nWindow functions"));
		assert!(!prompt.contains(PEER_NOTES_HEADER));
	}

	#[test]
	fn empty_retrieval_renders_fixed_notice() {
		let prompt = build_system_prompt(DEFAULT_INSTRUCTIONS, &[], &[]);

		assert!(prompt.contains(NO_RELEVANT_NOTES));
		assert!(prompt.ends_with(NO_RELEVANT_NOTES));
	}

	#[test]
	fn peer_section_appears_only_when_present() {
		let prompt = build_system_prompt(
			"instructions",
			&[snippet("Own", "mine")],
			&[snippet("Peer", "theirs")],
		);

		assert!(prompt.contains(PEER_NOTES_HEADER));
		assert!(prompt.contains("Title: Peer\nContent:\ntheirs"));

		let own_at = prompt.find(OWN_NOTES_HEADER).unwrap();
		let peer_at = prompt.find(PEER_NOTES_HEADER).unwrap();

		assert!(own_at < peer_at);
	}
}
