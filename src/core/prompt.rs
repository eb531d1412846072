//! Prompt construction for alternative generation

/// Build the generation instruction for one slot.
///
/// Embeds the asset type, the source text, the comma-joined exclusion list
/// and the hard character ceiling, and pins the model to the literal
/// `Alternative: <text>` output format in the language of the input.
pub fn build(asset_type: &str, source_text: &str, max_chars: usize, exclusions: &[String]) -> String {
    let used = if exclusions.is_empty() {
        "None".to_string()
    } else {
        exclusions.join(", ")
    };

    format!(
        "Generate a distinct and creative {asset_type} for the following text: {source_text}. \
Do not use these alternatives: {used}.\n\
Requirements:\n\
- The text must be strictly under {max_chars} characters.\n\
- Ensure the response is concise, precise, and impactful.\n\
- Use direct and simple language.\n\
- Do not include unnecessary punctuation or special characters.\n\
- Only the alternative text is allowed in the response.\n\
- Alternatives exceeding {max_chars} characters are invalid and must not be returned.\n\
- The output must always follow this format:\n\
  Alternative: <generated alternative here>.\n\
- Do not include any explanations, descriptions, or metadata.\n\
- Respond in the same language as the input text.\n\
- Aim for the maximum length allowed, make the generated text as long as possible without \
being verbose, while still being impactful, also make sure it is relevant to the input text."
    )
}
