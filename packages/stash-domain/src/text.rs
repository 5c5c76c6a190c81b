/// Canonical embedding text for an item: present fields joined by single spaces, name first.
pub fn item_text(name: &str, description: Option<&str>, notes: Option<&str>) -> String {
	let mut text = name.to_string();

	for part in [description, notes].into_iter().flatten() {
		if part.is_empty() {
			continue;
		}

		text.push(' ');
		text.push_str(part);
	}

	text
}
