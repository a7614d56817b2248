use quiz_core::model::ExamResult;

use crate::error::ExplainError;

/// Opening request sent after the tutor context.
pub const EXPLAIN_REQUEST: &str = "Provide the main detailed explanation now.";

const TUTOR_GUIDE: &str = "\
ROLE: Expert academic tutor and subject matter expert (Bengali medium).
TONE: Professional, crisp and organized.
LANGUAGE: Bengali.

FORMATTING:
1. No markdown headers.
2. No italics.
3. Use **bold** for section titles, key terms, dates and names.
4. Wrap any mathematical notation in single-dollar LaTeX, e.g. $5 \\times 10^3$.
5. Use hyphens for bullet points.
6. No horizontal rules.

STRUCTURE:
1. Confirm the correct answer.
2. Explain the core concept.
3. Explain why the answer is correct.
4. If the user chose wrongly, explain why their choice was wrong.
5. Finish with a short bolded takeaway.";

/// Tutor context for question `index` of `result`.
///
/// # Errors
///
/// Returns `ExplainError::InvalidQuestion` if `index` is past the batch.
pub fn build_tutor_prompt(result: &ExamResult, index: usize) -> Result<String, ExplainError> {
    let question = result
        .questions()
        .get(index)
        .ok_or(ExplainError::InvalidQuestion {
            exam_id: result.id(),
            index,
        })?;
    let chosen = result.user_choices().get(index).copied().flatten();

    let options = question
        .options()
        .iter()
        .map(|(key, text)| format!("  {}: {text}", key.label()))
        .collect::<Vec<_>>()
        .join("\n");
    let user_answer = chosen.map_or_else(
        || "None (Skipped)".to_string(),
        |key| format!("{} ({})", key.label(), question.options().get(key)),
    );

    Ok(format!(
        "CONTEXT:\n- Question: \"{}\"\n- Options:\n{options}\n- Correct Answer: {} ({})\n- User Answer: {user_answer}\n\n{TUTOR_GUIDE}",
        question.text(),
        question.correct().label(),
        question.correct_text(),
    ))
}
