//! Triage prompts for the symptom chat.
//!
//! The model is asked for a single JSON object in Turkish; see
//! [`crate::extraction`] for how the reply is validated.

/// Role framing shared by every triage request.
pub const SYSTEM_PROMPT: &str = r#"Context: You are an AI assistant in a health app for cancer patients. Your role is to analyze user input and provide a structured JSON response in Turkish."#;

/// Output contract the model must follow.
pub const OUTPUT_CONTRACT: &str = r#"Output Format:
Return ONLY a valid JSON object. Do not add any text or markdown (like ```json) before or after the JSON.
The JSON object MUST have exactly this structure:
{
  "responseText": "Your empathetic, reassuring response in Turkish.",
  "identifiedSymptom": "The main symptom identified in Turkish (e.g., 'baş ağrısı', 'mide bulantısı'), or null if none is clear.",
  "isUrgent": true if urgent symptoms are detected, otherwise false
}"#;

/// User prompt template for one patient message.
pub fn make_triage_prompt(patient_text: &str) -> String {
    // JSON-quote the input so stray quotes cannot close the embedded string.
    let quoted = serde_json::to_string(patient_text).unwrap_or_else(|_| format!("\"{}\"", patient_text));
    format!(
        r#"Patient's input: {}

Task:
1. Analyze the input for symptoms (pain, nausea, fatigue, etc.).
2. Provide an empathetic and reassuring response in Turkish.
3. Identify if any mentioned symptoms are urgent (e.g., "severe chest pain", "uncontrollable bleeding", "difficulty breathing").
4. Extract the primary symptom name in Turkish if one is clearly mentioned."#,
        quoted
    )
}

/// Worked examples for better contract adherence.
pub const FEW_SHOT_EXAMPLES: &[(&str, &str)] = &[
    (
        "Bugün biraz başım ağrıyor",
        r#"{"responseText":"Geçmiş olsun. Bol su içip dinlenmeyi deneyin; ağrı artarsa doktorunuza danışın.","identifiedSymptom":"baş ağrısı","isUrgent":false}"#,
    ),
    (
        "Nefes almakta çok zorlanıyorum",
        r#"{"responseText":"Nefes darlığı ciddi olabilir. Lütfen hemen doktorunuza ya da 112'ye ulaşın.","identifiedSymptom":"nefes darlığı","isUrgent":true}"#,
    ),
];

/// Build a complete prompt with role framing, optional examples and the contract.
pub fn build_full_prompt(patient_text: &str, include_examples: bool) -> String {
    let mut prompt = String::new();

    prompt.push_str(SYSTEM_PROMPT);
    prompt.push_str("\n\n");

    if include_examples {
        prompt.push_str("Examples:\n");
        for (input, output) in FEW_SHOT_EXAMPLES {
            prompt.push_str(&make_triage_prompt(input));
            prompt.push_str("\nResponse: ");
            prompt.push_str(output);
            prompt.push_str("\n\n");
        }
    }

    prompt.push_str(&make_triage_prompt(patient_text));
    prompt.push_str("\n\n");
    prompt.push_str(OUTPUT_CONTRACT);

    prompt
}
