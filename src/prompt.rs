//! Prompt construction for question and vocabulary generation.
//!
//! Pure functions of their inputs. The passage is inserted verbatim between
//! `---` delimiter lines and always substituted last, so braces inside the
//! passage are never treated as template keys.

use crate::domain::{Difficulty, QuestionCounts, QuestionType};
use crate::util::fill_template;

const QUESTION_TEMPLATE: &str = r#"
You are an expert creator of English exam questions for Korean high school students. Your goal is to create high-quality, challenging, and fair questions that accurately test a student's comprehension and analytical skills.

**Crucial Instruction 1: Difficulty Level**
Adjust the difficulty of ALL generated questions to the following level: **{difficulty}**.
- **Difficulty Guideline:** {guidance}

**Crucial Instruction 2: Exact Quantities**
You MUST generate the EXACT number of questions specified for each type. This is not a suggestion but a strict requirement. For example, since '{example_phrase}' is requested, you MUST generate exactly {example_count} '{example_id}' questions.

Based on the following passage, generate a set of questions for the requested types and quantities: **{requested}**.
Set the `type` field of every question to the type identifier exactly as written above (e.g. {example_id}).

General Rules:
- Every multiple-choice question must have exactly 5 options. Non-multiple-choice questions must omit `options`.
- Provide all explanations in Korean.
- The incorrect options (distractors) are as important as the correct answer. They should be plausible and based on common student mistakes or misinterpretations of the text. Avoid creating options that are obviously wrong or irrelevant.

Specific Rules for the Requested Types:
{rules}

Return the output strictly in the specified JSON format.

Passage:
---
{passage}
---
"#;

const VOCABULARY_TEMPLATE: &str = r#"
You are an expert English vocabulary analyst for advanced English learners.
{selection}

For each word, you MUST provide the following in ENGLISH:
1.  **word**: The vocabulary word itself.
2.  **definition**: A clear, concise definition in ENGLISH (like in an English-English dictionary).
3.  **synonyms**: A list of 2-3 relevant synonyms in ENGLISH. If none, provide an empty array.
4.  **antonyms**: A list of 1-2 relevant antonyms in ENGLISH. If none, provide an empty array.
5.  **exampleSentence**: The exact sentence from the passage where the word is used.

Focus on words that are crucial for understanding the passage's main idea and nuances (e.g., academic, abstract, or context-specific terms). Avoid overly simple or common words unless specified by the user.
Return the output strictly in the specified JSON format.

Passage:
---
{passage}
---
"#;

const AUTO_SELECTION: &str = "Extract the 10 most essential and high-value vocabulary words from the provided passage. Select words that are distributed throughout the passage, not just clustered in one section.";

/// Tier guidance. Each tier's sentence is unique to that tier.
pub fn difficulty_guidance(d: Difficulty) -> &'static str {
  match d {
    Difficulty::Easy => "Questions should be straightforward, testing direct comprehension with clear answers and obvious distractors.",
    Difficulty::Normal => "Questions should be on par with the Korean CSAT (수능). They must require some analytical skill, and distractors should be plausible and based on common student mistakes.",
    Difficulty::Hard => "Questions should be highly challenging, requiring deep inferential reasoning. Distractors must be very subtle and nuanced, designed to trap even high-achieving students. The logic for the correct answer might be complex.",
  }
}

/// Formatting contract for one item kind: option language, shape, multiple choice or not.
pub fn type_rule(t: QuestionType) -> &'static str {
  match t {
    QuestionType::MainIdea => "Multiple-choice. Options in English. Distractors should be subtly incorrect (too broad, too narrow).",
    QuestionType::Mood => "Multiple-choice. Options should be pairs of adjectives in English (e.g., 'anxious → relieved').",
    QuestionType::Claim => "Multiple-choice. Options MUST BE IN KOREAN.",
    QuestionType::InferentialMeaning => "Multiple-choice. Underline a phrase and ask for its contextual meaning. Options must be in English.",
    QuestionType::Comprehension => "Multiple-choice. Ask what is true ('일치') or not true ('불일치'). Options MUST BE IN KOREAN.",
    QuestionType::Grammar => "Multiple-choice. Present the passage with five underlined parts (①-⑤), one of which is grammatically wrong.",
    QuestionType::Vocabulary => "Multiple-choice. Present the passage with five underlined words (①-⑤), one of which is contextually wrong.",
    QuestionType::PronounReference => "Multiple-choice. Five underlined pronouns/phrases (①-⑤); ask which one refers to a different entity.",
    QuestionType::FillInTheBlank => "Multiple-choice. Replace a key phrase with a blank. 5 tempting English options.",
    QuestionType::IrrelevantSentence => "IMPORTANT: First, INSERT A NEW, ORIGINAL SENTENCE that is topically related but disrupts logical flow. Then, number all sentences ① to ⑤. The question asks to find the irrelevant sentence.",
    QuestionType::ReorderParagraph => "Multiple-choice. Divide the passage into three blocks (A), (B), (C) after an intro sentence. Ask for the correct order.",
    QuestionType::SentenceInsertion => "Multiple-choice. Provide a new sentence in a box. The passage must have insertion points [①], [②], etc.",
    QuestionType::SummaryCompletion => "Multiple-choice. One-sentence summary with two blanks, (A) and (B). Choose word pairs from 5 options.",
    QuestionType::WordScramble => "(Non-multiple choice) Provide the scrambled words of a key sentence. The 'answer' is the correct sentence.",
  }
}

/// `MainIdea (2개)` style exact-count phrase.
pub fn count_phrase(t: QuestionType, n: u32) -> String {
  format!("{} ({}개)", t.id(), n)
}

/// Build the question-generation prompt. Kinds with a zero count are not mentioned at all.
pub fn build_question_prompt(passage: &str, counts: &QuestionCounts, difficulty: Difficulty) -> String {
  let requested: Vec<(QuestionType, u32)> = counts
    .iter()
    .filter(|(_, n)| **n > 0)
    .map(|(t, n)| (*t, *n))
    .collect();

  let requested_str = requested
    .iter()
    .map(|(t, n)| count_phrase(*t, *n))
    .collect::<Vec<_>>()
    .join(", ");

  let rules = requested
    .iter()
    .map(|(t, _)| format!("- {} ({}): {}", t.id(), t.label(), type_rule(*t)))
    .collect::<Vec<_>>()
    .join("\n");

  // Caller guarantees at least one positive count; fall back to MainIdea only for the example.
  let (example_t, example_n) = requested.first().copied().unwrap_or((QuestionType::MainIdea, 1));
  let example_phrase = count_phrase(example_t, example_n);
  let example_count = example_n.to_string();

  fill_template(
    QUESTION_TEMPLATE,
    &[
      ("difficulty", difficulty.label()),
      ("guidance", difficulty_guidance(difficulty)),
      ("example_phrase", &example_phrase),
      ("example_count", &example_count),
      ("example_id", example_t.id()),
      ("requested", &requested_str),
      ("rules", &rules),
      ("passage", passage),
    ],
  )
}

/// Build the vocabulary prompt. Blank words are ignored; no usable words means the model picks ~10.
pub fn build_vocabulary_prompt(passage: &str, words: Option<&[String]>) -> String {
  let chosen: Vec<&str> = words
    .unwrap_or_default()
    .iter()
    .map(|w| w.trim())
    .filter(|w| !w.is_empty())
    .collect();

  let selection = if chosen.is_empty() {
    AUTO_SELECTION.to_string()
  } else {
    format!("Analyze ONLY the following user-selected words: {}.", chosen.join(", "))
  };

  fill_template(VOCABULARY_TEMPLATE, &[("selection", &selection), ("passage", passage)])
}

#[cfg(test)]
mod tests {
  use super::*;

  fn counts(pairs: &[(QuestionType, u32)]) -> QuestionCounts {
    pairs.iter().copied().collect()
  }

  #[test]
  fn scenario_main_idea_two_normal() {
    let p = build_question_prompt("The cat sat.", &counts(&[(QuestionType::MainIdea, 2)]), Difficulty::Normal);
    assert!(p.contains("MainIdea (2개)"));
    assert!(p.contains(difficulty_guidance(Difficulty::Normal)));
    assert!(p.contains("---\nThe cat sat.\n---"));
  }

  #[test]
  fn every_positive_count_has_a_phrase_and_zero_counts_are_absent() {
    let c = counts(&[
      (QuestionType::Grammar, 3),
      (QuestionType::Mood, 0),
      (QuestionType::WordScramble, 1),
      (QuestionType::Claim, 0),
    ]);
    let p = build_question_prompt("Text.", &c, Difficulty::Easy);
    assert!(p.contains("Grammar (3개)"));
    assert!(p.contains("WordScramble (1개)"));
    assert!(p.contains(type_rule(QuestionType::Grammar)));
    assert!(p.contains(type_rule(QuestionType::WordScramble)));
    for t in [QuestionType::Mood, QuestionType::Claim] {
      assert!(!p.contains(&format!("{} (", t.id())), "{:?} leaked into prompt", t);
      assert!(!p.contains(type_rule(t)));
      assert!(!p.contains(t.label()));
    }
  }

  #[test]
  fn unrequested_kinds_leave_no_trace() {
    let p = build_question_prompt("Text.", &counts(&[(QuestionType::Claim, 1)]), Difficulty::Normal);
    for t in QuestionType::ALL.into_iter().filter(|t| *t != QuestionType::Claim) {
      assert!(!p.contains(&format!("{} (", t.id())), "{:?} leaked into prompt", t);
    }
  }

  #[test]
  fn difficulty_tiers_never_cross_contaminate() {
    let tiers = [Difficulty::Easy, Difficulty::Normal, Difficulty::Hard];
    for chosen in tiers {
      let p = build_question_prompt("x", &counts(&[(QuestionType::MainIdea, 1)]), chosen);
      for other in tiers {
        assert_eq!(p.contains(difficulty_guidance(other)), other == chosen);
      }
    }
  }

  #[test]
  fn passage_is_inserted_verbatim_even_with_braces() {
    let passage = "Weird {rules} and {guidance} text.\nSecond line.";
    let p = build_question_prompt(passage, &counts(&[(QuestionType::Mood, 1)]), Difficulty::Hard);
    assert!(p.contains(&format!("---\n{}\n---", passage)));
  }

  #[test]
  fn vocabulary_prompt_uses_selected_words() {
    let words = vec!["bias".to_string(), " ".to_string(), "heuristic".to_string()];
    let p = build_vocabulary_prompt("P.", Some(&words));
    assert!(p.contains("Analyze ONLY the following user-selected words: bias, heuristic."));
    assert!(!p.contains(AUTO_SELECTION));
  }

  #[test]
  fn vocabulary_prompt_without_words_asks_for_ten() {
    assert!(build_vocabulary_prompt("P.", None).contains(AUTO_SELECTION));
    assert!(build_vocabulary_prompt("P.", Some(&[])).contains(AUTO_SELECTION));
  }
}
