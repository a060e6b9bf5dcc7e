//! Knowledge-graph node identifiers of the form `<kind>:<id>`.

pub const CANDIDATE: &str = "candidate";
pub const CATEGORY: &str = "category";
pub const TASK: &str = "task";
pub const SUPPLIER: &str = "supplier";

pub fn node_id(kind: &str, id: &str) -> String {
	format!("{kind}:{id}")
}

/// Splits a node id into kind and id. Returns `None` when either half is empty.
pub fn split_node_id(node: &str) -> Option<(&str, &str)> {
	let (kind, id) = node.split_once(':')?;

	if kind.is_empty() || id.is_empty() { None } else { Some((kind, id)) }
}

/// Returns the candidate id when `node` is a candidate node.
pub fn candidate_id_of(node: &str) -> Option<&str> {
	split_node_id(node).and_then(|(kind, id)| (kind == CANDIDATE).then_some(id))
}
