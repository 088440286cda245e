//! Text summaries of an attachment group

use crate::upload::NormalizedUploads;

pub const NO_FILES_MESSAGE: &str = "Файлы не загружены";

/// Numbered list of accepted names, then one line of failed names.
pub fn summarize(uploads: &NormalizedUploads) -> String {
    if uploads.accepted.is_empty() && uploads.failures.is_empty() {
        return NO_FILES_MESSAGE.to_string();
    }

    let mut lines: Vec<String> = uploads
        .accepted
        .iter()
        .enumerate()
        .map(|(i, file)| format!("{}. {}", i + 1, file.name))
        .collect();
    if !uploads.failures.is_empty() {
        lines.push(format!("Не удалось загрузить: {}", uploads.failures.join(", ")));
    }
    lines.join("\n")
}
