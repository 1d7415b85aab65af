//! Response schema descriptors sent as `generationConfig.responseSchema`.
//!
//! These only bias the service toward a parseable shape. Validation happens in
//! `decoder`, never here.

use std::sync::OnceLock;

use serde_json::{json, Value};

/// Array of question records; `options` is optional.
pub fn question_schema() -> &'static Value {
  static SCHEMA: OnceLock<Value> = OnceLock::new();
  SCHEMA.get_or_init(|| {
    json!({
      "type": "ARRAY",
      "items": {
        "type": "OBJECT",
        "properties": {
          "type": { "type": "STRING" },
          "question": { "type": "STRING" },
          "options": { "type": "ARRAY", "items": { "type": "STRING" } },
          "answer": { "type": "STRING" },
          "explanation": { "type": "STRING" }
        },
        "required": ["type", "question", "answer", "explanation"]
      }
    })
  })
}

/// Array of vocabulary notes; synonyms and antonyms are optional.
pub fn vocabulary_schema() -> &'static Value {
  static SCHEMA: OnceLock<Value> = OnceLock::new();
  SCHEMA.get_or_init(|| {
    json!({
      "type": "ARRAY",
      "items": {
        "type": "OBJECT",
        "properties": {
          "word": { "type": "STRING", "description": "The extracted key vocabulary word." },
          "definition": { "type": "STRING", "description": "A clear and concise definition in English (like in an English-English dictionary)." },
          "synonyms": { "type": "ARRAY", "description": "An array of relevant synonyms in English.", "items": { "type": "STRING" } },
          "antonyms": { "type": "ARRAY", "description": "An array of relevant antonyms in English.", "items": { "type": "STRING" } },
          "exampleSentence": { "type": "STRING", "description": "The exact sentence from the passage where the word appears." }
        },
        "required": ["word", "definition", "exampleSentence"]
      }
    })
  })
}
