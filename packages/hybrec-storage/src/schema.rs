pub fn render_schema() -> String {
	expand_includes(include_str!("../../../sql/init.sql"))
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		let trimmed = line.trim();

		if let Some(path) = trimmed.strip_prefix("\\ir ") {
			match path.trim() {
				"tables/001_candidate_entities.sql" =>
					out.push_str(include_str!("../../../sql/tables/001_candidate_entities.sql")),
				"tables/002_keyword_mappings.sql" =>
					out.push_str(include_str!("../../../sql/tables/002_keyword_mappings.sql")),
				"tables/003_graph_edges.sql" =>
					out.push_str(include_str!("../../../sql/tables/003_graph_edges.sql")),
				"tables/004_interaction_events.sql" =>
					out.push_str(include_str!("../../../sql/tables/004_interaction_events.sql")),
				_ => out.push_str(line),
			}
		} else {
			out.push_str(line);
		}

		out.push('\n');
	}

	out
}
