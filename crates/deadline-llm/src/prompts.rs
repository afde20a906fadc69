//! Prompt text for the three oracle-backed stages.
//!
//! Each stage looks at exactly one sentence at a time. The user prompt is the
//! same quoted-sentence envelope for all of them.

pub const DETECTION_SYSTEM: &str = "\
You judge ONE sentence at a time and nothing else.

Task: decide whether the sentence expresses a commitment, promise, or obligation
that someone takes on.

Rules:
- Never invent a commitment that the wording does not carry.
- Status updates, opinions, and questions are not commitments.
- Loose ideas and brainstorming are not commitments.
- Do not summarise; judge only the sentence you are given.

Answer with a single token: YES or NO.
";

pub const CLASSIFICATION_SYSTEM: &str = "\
You receive ONE sentence that is already known to express a commitment.

1. Assign exactly one label:
   - personal_promise: a single person commits to something.
   - team_promise: a group or organisation commits (\"we'll handle it\").
   - soft_intention: vague or non-binding intent (\"we should\", \"maybe I'll\").
   - hard_commitment: explicit, strongly worded or time-bound (\"I will do X by Friday\").
2. Give a confidence between 0 and 1.

Reply with JSON only, using the keys:
- \"kind\": one of the four labels.
- \"confidence\": a number between 0 and 1.
";

pub const ATTRIBUTE_SYSTEM: &str = "\
You extract attributes from ONE commitment sentence.

Never invent people, dates, or tasks that the sentence does not mention.

- who: the party explicitly responsible, or \"Unassigned\" when unclear.
  A subject of \"I\" stays \"I\" and a subject of \"we\" stays \"we\"; do not guess names.
- deadline_text: the deadline phrase exactly as written (for example \"next week\",
  \"by Friday\", \"tomorrow\", \"before launch\"), or null when there is none.
  Never convert it to a calendar date.

Reply with JSON only, using the keys \"who\" and \"deadline_text\".
";

/// User prompt shared by every stage: the sentence in triple quotes.
pub fn sentence_prompt(sentence: &str) -> String {
    format!("Sentence:\n\"\"\"{sentence}\"\"\"")
}
