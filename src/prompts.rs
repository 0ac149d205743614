//! Extraction prompt for the completion service.
//!
//! The prompt is Russian because the diplomas are; asking in the document's
//! language keeps the model from translating names. Only a bounded excerpt
//! of the document text is sent: diplomas put every field we want on the
//! first page, and the bound caps per-request token cost.

/// Placeholder the model must use for any field it cannot find.
pub const NOT_SPECIFIED: &str = "Не указано";

/// Maximum number of characters of document text included in the prompt.
pub const MAX_EXCERPT_CHARS: usize = 4000;

/// Keys of the JSON object the model is asked to return, in order.
pub const RECORD_KEYS: [&str; 4] = ["studentName", "institution", "degree", "teacherName"];

const INSTRUCTION: &str = r#"Проанализируй текст диплома и извлеки следующую информацию в JSON формате:
{
  "studentName": "ФИО студента/участника",
  "institution": "Название образовательного учреждения",
  "degree": "Степень диплома или награды",
  "teacherName": "ФИО преподавателя/научного руководителя"
}"#;

const EXCERPT_LABEL: &str = "Текст диплома:";

/// Return at most the first `limit` characters of `text`.
///
/// Counts Unicode scalar values, not bytes, so Cyrillic text is never cut
/// mid-character.
pub fn excerpt(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Build the extraction prompt for the given document text.
pub fn build_prompt(text: &str) -> String {
    format!(
        "{INSTRUCTION}\n\n{EXCERPT_LABEL}\n{}\n\nЕсли какое-то поле не найдено, используй \"{NOT_SPECIFIED}\".\nВерни ТОЛЬКО валидный JSON, без дополнительного текста.",
        excerpt(text, MAX_EXCERPT_CHARS)
    )
}
