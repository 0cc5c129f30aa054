//! Column encoding for the ordered neighbor list.
//!
//! The list is stored as a JSON array so that order, duplicates, embedded
//! separators and the empty-vs-absent distinction all survive a round trip.
//! `NULL` is "absent"; `[]` is "present but empty".

/// Encodes a neighbor list for the `contacts.neighbors` column.
pub fn encode_neighbors(neighbors: Option<&[String]>) -> Result<Option<String>, serde_json::Error> {
    neighbors.map(serde_json::to_string).transpose()
}

/// Decodes the `contacts.neighbors` column.
pub fn decode_neighbors(raw: Option<&str>) -> Result<Option<Vec<String>>, serde_json::Error> {
    raw.map(serde_json::from_str).transpose()
}
