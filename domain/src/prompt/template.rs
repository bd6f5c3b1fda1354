//! Prompt templates for every debate stage

use crate::debate::merge::MergedResult;

const FACTOR_FORMAT: &str = r#"Format your response as a JSON array, where each object represents a factor and has the following keys:
- "factor_name": a short descriptive name of the factor.
- "justification": 1-2 sentences explaining the factor's relevance.
- "confidence": a number between 0.0 and 1.0, with 1.0 being the highest confidence.

Example format:
[
  {"factor_name": "Example Factor", "justification": "Why this factor matters.", "confidence": 0.8}
]

CRITICAL: Output ONLY the JSON array. Do not include any introductory text, explanations, or markdown formatting before or after the array."#;

/// Templates for generating prompts at each stage
pub struct PromptTemplate;

impl PromptTemplate {
    /// System prompt for every participant call
    pub fn participant_system() -> &'static str {
        r#"You are a knowledgeable expert taking part in a structured debate with other experts.
Reason carefully, keep what is well supported, and change your position when others make better arguments.
Follow the requested output format exactly."#
    }

    /// System prompt for moderator calls (grouping, merge, summary, refine, synthesis)
    pub fn moderator_system() -> &'static str {
        r#"You are a neutral moderator consolidating the work of several experts.
Be faithful to what the experts actually said. Do not invent new claims.
Follow the requested output format exactly."#
    }

    /// System prompt for the judge
    pub fn judge_system() -> &'static str {
        r#"You are a strict evaluator comparing two answers to the same question.
Judge only the content. Be concise and follow the requested rating format exactly."#
    }

    /// Seed prompt: list the top factors for the question
    pub fn factor_baseline(question: &str, top_k: usize) -> String {
        format!(
            "Q: {}\n\nIdentify the top {} factors relevant to the question.\n{}",
            question, top_k, FACTOR_FORMAT
        )
    }

    /// Seed prompt: write a complete prose answer
    pub fn prose_baseline(question: &str) -> String {
        format!(
            r#"Please answer the following question:

{}

Provide a clear, well-structured and complete answer."#,
            question
        )
    }

    /// Turn a prose baseline into a factor list, critiquing it on the way
    pub fn baseline_critique(question: &str, baseline: &str, top_k: usize) -> String {
        format!(
            r#"Original question: {}

A reference answer was written by another expert:
---
{}
---

Critique the reference answer: which factors does it get right, which are weak or wrong, and what high-impact factors are missing?
Then list the top {} factors that a complete answer must cover, taking your critique into account.
{}"#,
            question, baseline, top_k, FACTOR_FORMAT
        )
    }

    /// Structured debate round: revise own factor list given peers
    pub fn factor_critique(
        question: &str,
        own: &str,
        peers: &[(String, String)],
        human_feedback: Option<&str>,
    ) -> String {
        let mut prompt = format!(
            "Context:\nOriginal question: {}\n\nYour previous factors (JSON):\n{}\n\nOther agents' most recent factors (JSON):\n",
            question, own
        );
        push_sections(&mut prompt, peers);
        push_feedback(&mut prompt, human_feedback);
        prompt.push_str(
            r#"
Instructions:
1. Identify high-impact factors missing from your list that others mentioned or that the human feedback suggested.
2. Drop or down-weight factors in your list that are weak, incorrect or redundant in light of the other agents' points.
3. Output your revised list.

"#,
        );
        prompt.push_str(FACTOR_FORMAT);
        prompt
    }

    /// Free-form debate round: critique peers' answers and restate own position
    pub fn freeform_critique(
        question: &str,
        own: &str,
        peers: &[(String, String)],
        human_feedback: Option<&str>,
    ) -> String {
        let mut prompt = format!(
            "Original question: {}\n\nYour current answer:\n---\n{}\n---\n\nOther experts' answers:\n",
            question, own
        );
        push_sections(&mut prompt, peers);
        push_feedback(&mut prompt, human_feedback);
        prompt.push_str(
            r#"
Critique the other experts' answers: point out errors, gaps and strong points you had missed.
Then state how your own answer should change. Write in prose."#,
        );
        prompt
    }

    /// Ask the moderator which factor names mean the same thing
    pub fn factor_grouping(names: &[String]) -> String {
        let mut prompt = String::from(
            "Below is a list of factor names produced by different experts.\n\
             Group names that refer to the same underlying factor.\n\nFactor names:\n",
        );
        for name in names {
            prompt.push_str(&format!("- {}\n", name));
        }
        prompt.push_str(
            r#"
Output ONLY a JSON object that maps every factor name exactly as written above to a short group label.
Names in the same group must map to the same label. Example:
{"Interest rates": "monetary policy", "Central bank rate": "monetary policy", "Wage growth": "labor market"}"#,
        );
        prompt
    }

    /// Merge all agents' final factor lists into a ranked consensus list
    pub fn merge_factors(question: &str, lists: &[(String, String)], top_k: usize) -> String {
        let mut prompt = format!(
            "Original question: {}\n\nFinal factor lists from each expert (JSON):\n",
            question
        );
        push_sections(&mut prompt, lists);
        prompt.push_str(&format!(
            r#"
Instructions:
1. Group factors that describe the same idea, even when they are worded differently.
2. For each group write one synthesized factor with a combined justification.
3. Rank the groups by how many experts endorsed them, then by confidence.
4. Output at most {} factors.

Output ONLY a JSON array. Each object has the keys:
- "name": the synthesized factor name
- "justification": the combined justification
- "confidence": mean confidence of the grouped factors (0.0 to 1.0)
- "endorsement_count": number of experts whose lists contained the factor
- "sources": array of {{"agent": "<expert name>", "factor_name": "<original name>"}}"#,
            top_k
        ));
        prompt
    }

    /// Consensus prose from merged factors
    pub fn summary(question: &str, merged: &MergedResult) -> String {
        let mut factors = String::new();
        let mut justifications = String::new();
        for (i, m) in merged.factors.iter().enumerate() {
            factors.push_str(&format!(
                "{}. {} (endorsed by {}, confidence {:.2})\n",
                i + 1,
                m.factor.name,
                m.endorsement_count,
                m.factor.confidence
            ));
            justifications.push_str(&format!("- {}: {}\n", m.factor.name, m.factor.justification));
        }
        format!(
            r#"Question: {}

Consensus factors from a multi-agent debate:
{}
Supporting arguments and justifications:
{}
Instructions:
Write a concise, coherent answer to the question in prose, built on the consensus factors and citing the strongest supporting arguments."#,
            question, factors, justifications
        )
    }

    /// Integrate a consensus summary into a detailed baseline
    pub fn refine(question: &str, baseline: &str, insights: &str) -> String {
        format!(
            r#"Question: {}

Detailed baseline answer:
---
{}
---

Insights from the expert debate:
---
{}
---

Instructions:
Rewrite the baseline answer so that it integrates the debate insights.
Keep the baseline's structure and detail, correct anything the insights show to be wrong, and add what is missing.
Output only the refined answer."#,
            question, baseline, insights
        )
    }

    /// Synthesize one answer from parallel baselines and free-form critiques
    pub fn synthesis(
        question: &str,
        baselines: &[(String, String)],
        critiques: &[(String, String)],
    ) -> String {
        let mut prompt = format!("Question: {}\n\nIndependent expert answers:\n", question);
        push_sections(&mut prompt, baselines);
        if !critiques.is_empty() {
            prompt.push_str("\nCritiques exchanged during the debate:\n");
            push_sections(&mut prompt, critiques);
        }
        prompt.push_str(
            r#"
Instructions:
Write one comprehensive answer to the question that combines the strongest points of all answers,
resolves the disagreements raised in the critiques, and leaves out claims the critiques showed to be wrong.
Output only the answer."#,
        );
        prompt
    }

    /// Compare a candidate answer against the reference baseline
    pub fn judge<'a>(
        question: &str,
        reference: &str,
        candidate: &str,
        criteria: impl IntoIterator<Item = &'a str>,
    ) -> String {
        let mut prompt = format!(
            r#"Evaluate the quality of two answers to the question: "{}"

Answer 1 (Baseline):
{}

Answer 2 (Candidate from debate):
{}

Instructions:
Rate Answer 2 relative to Answer 1 on each criterion below with a number between 0.0 and 1.0,
where 0.5 means equal quality, above 0.5 means Answer 2 is better and below 0.5 means it is worse.

"#,
            question, reference, candidate
        );
        for criterion in criteria {
            prompt.push_str(&format!("{}: <rating>\n", capitalize(criterion)));
        }
        prompt.push_str("\nUse exactly one line per criterion in the format above, then add brief reasoning.");
        prompt
    }
}

fn push_sections(prompt: &mut String, sections: &[(String, String)]) {
    if sections.is_empty() {
        prompt.push_str("(none)\n");
    }
    for (label, content) in sections {
        prompt.push_str(&format!("\n--- {} ---\n{}\n", label, content));
    }
}

fn push_feedback(prompt: &mut String, feedback: Option<&str>) {
    match feedback.filter(|f| !f.trim().is_empty()) {
        Some(f) => prompt.push_str(&format!("\nHuman feedback:\n{}\n", f)),
        None => prompt.push_str("\nHuman feedback: (none)\n"),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
