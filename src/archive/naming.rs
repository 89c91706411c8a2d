//! Download naming: archive file names and content-disposition headers

use super::plan::ZipPlan;

/// Name used when the selected roots share no ancestor.
pub const DEFAULT_ARCHIVE_STEM: &str = "root";

/// File name for the archive of `plan`.
///
/// A single selected root names the archive after itself, several roots after
/// their common ancestor, and unrelated roots fall back to [`DEFAULT_ARCHIVE_STEM`].
pub fn archive_file_name(plan: &ZipPlan) -> String {
    let stem = match (plan.roots.as_slice(), &plan.common_ancestor) {
        ([root], _) => root.file_name(),
        (_, Some(ancestor)) => ancestor.name.clone(),
        _ => DEFAULT_ARCHIVE_STEM.to_string(),
    };
    format!("{}.zip", stem)
}

/// `Content-Disposition` value carrying both an ASCII fallback name and the
/// percent-encoded UTF-8 name.
pub fn content_disposition(kind: &str, file_name: &str) -> String {
    format!(
        "{}; filename=\"{}\"; filename*=UTF-8''{}",
        kind,
        ascii_fallback(file_name),
        urlencoding::encode(file_name)
    )
}

fn ascii_fallback(file_name: &str) -> String {
    file_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect()
}
