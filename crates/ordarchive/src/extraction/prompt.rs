//! Instruction template sent with every document.

use crate::taxonomy::OrderType;

/// Builds the extraction instruction for `organization`.
///
/// The model must answer with bare JSON holding the fixed field set, dates
/// as `YYYY-MM-DD`, and `type` picked from the extraction kinds.
pub fn build_prompt(organization: &str) -> String {
    let kinds = OrderType::extraction_kinds()
        .iter()
        .map(|t| format!("\"{}\"", t.label()))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "Ты HR-ассистент в {organization}. Прочитай этот отсканированный приказ и извлеки из него данные строго в формате JSON.
Поля JSON:
- orderNumber (строка, только номер приказа, например \"45-К\" или \"12\")
- orderDate (строка, формат СТРОГО YYYY-MM-DD. Если дата 15 февраля 2026, верни \"2026-02-15\")
- type (строка, выбери одно максимально подходящее из: {kinds})
- employeeName (строка, ФИО полностью, если есть, иначе null)
- description (строка, краткая суть приказа, 1-2 предложения)
- basis (строка, основание, например \"Личное заявление...\", если есть, иначе null)

Верни ТОЛЬКО чистый JSON, без маркдауна, кавычек ```json и лишних слов."
    )
}
