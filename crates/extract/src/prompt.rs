pub fn build_tagging_prompt(article_text: &str) -> String {
    format!(
        r#"Tag the people and organizations mentioned in the following financial news text.

INSTRUCTIONS:
1. Identify every person and every organization (companies, banks, regulators, agencies)
2. Copy each name exactly as it appears in the text
3. Output ONLY valid JSON, nothing else
4. Use the exact schema below

SCHEMA:
{{
  "entities": [
    {{"type": "PERSON|ORGANIZATION", "text": "Name as written"}}
  ]
}}

RULES:
- Type must be one of: PERSON, ORGANIZATION
- Do not invent names that are not in the text
- Do not tag products, places, currencies or numbers
- Output ONLY the JSON object, no markdown, no explanations

TEXT:
{}

JSON OUTPUT:"#,
        article_text
    )
}

pub fn build_retry_prompt(invalid_json: &str) -> String {
    format!(
        r#"The following JSON is invalid:

{}

Fix this JSON. Output only valid JSON with no markdown formatting, no code blocks, no explanations. Just the raw JSON object."#,
        invalid_json
    )
}
