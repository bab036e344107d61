use crate::error::{RosterError, RosterResult};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::collections::{BTreeMap, BTreeSet};

const SNAPSHOT_INDENT: &[u8] = b"    ";

/// Encodes names as a JSON object mapping each name to `true`.
pub fn encode_snapshot<'a>(
    names: impl IntoIterator<Item = &'a String>,
    target: &str,
) -> RosterResult<Vec<u8>> {
    let entries: BTreeMap<&str, bool> = names
        .into_iter()
        .map(|name| (name.as_str(), true))
        .collect();

    let mut buffer = Vec::new();
    let formatter = PrettyFormatter::with_indent(SNAPSHOT_INDENT);
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    entries
        .serialize(&mut serializer)
        .map_err(|err| RosterError::corrupt(target, format!("failed to encode snapshot: {err}")))?;
    buffer.push(b'\n');
    Ok(buffer)
}

/// Decodes a snapshot into its set of names.
///
/// A well-formed `{}` is a valid empty roster. Zero-length content, non-object
/// JSON and non-boolean values are `CorruptState`. The boolean only marks
/// presence, so a name mapped to `false` is still returned.
pub fn decode_snapshot(bytes: &[u8], target: &str) -> RosterResult<BTreeSet<String>> {
    let entries: BTreeMap<String, bool> =
        serde_json::from_slice(bytes).map_err(|err| RosterError::corrupt(target, err))?;
    Ok(entries.into_keys().collect())
}
