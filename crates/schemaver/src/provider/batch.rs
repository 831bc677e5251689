//! Batch-script splitting.

/// Split a script into batches on lines consisting of the separator alone.
///
/// The comparison ignores case and surrounding whitespace. A trailing
/// separator is implied, so the last batch runs even when the script does not
/// end with one. Blank batches are dropped. Without a separator, or when it
/// does not occur in the script, the script is returned as a single batch.
pub fn split_batches(sql: &str, separator: Option<&str>) -> Vec<String> {
    let separator = match separator.map(str::trim).filter(|s| !s.is_empty()) {
        Some(separator) => separator.to_uppercase(),
        None => return vec![sql.to_string()],
    };
    if !sql.to_uppercase().contains(&separator) {
        return vec![sql.to_string()];
    }

    let script = format!("{}\n{}", sql, separator);
    let mut batches = Vec::new();
    let mut current = String::new();

    for line in script.split(['\n', '\r']).filter(|line| !line.is_empty()) {
        if line.trim().to_uppercase() == separator {
            let batch = current.trim_end();
            if !batch.trim().is_empty() {
                batches.push(batch.to_string());
            }
            current.clear();
        } else {
            current.push_str(line.trim());
            current.push('\n');
        }
    }

    batches
}
