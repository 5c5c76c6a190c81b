pub fn render_schema() -> String {
	expand_includes(include_str!("../../../sql/init.sql"))
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		let trimmed = line.trim();

		if let Some(path) = trimmed.strip_prefix("\\ir ") {
			match path.trim() {
				"tables/001_locations.sql" =>
					out.push_str(include_str!("../../../sql/tables/001_locations.sql")),
				"tables/002_containers.sql" =>
					out.push_str(include_str!("../../../sql/tables/002_containers.sql")),
				"tables/003_categories.sql" =>
					out.push_str(include_str!("../../../sql/tables/003_categories.sql")),
				"tables/004_items.sql" =>
					out.push_str(include_str!("../../../sql/tables/004_items.sql")),
				"tables/005_item_aliases.sql" =>
					out.push_str(include_str!("../../../sql/tables/005_item_aliases.sql")),
				"tables/006_settings.sql" =>
					out.push_str(include_str!("../../../sql/tables/006_settings.sql")),
				_ => out.push_str(line),
			}
		} else {
			out.push_str(line);
		}

		out.push('\n');
	}

	out
}
