//! Prompt text sent to the model.

use stepcheck_protocols::{ComponentKind, TeachingContext};

/// Step explanations are cut to this many characters in judge prompts.
const EXPLANATION_LIMIT: usize = 300;

pub const VISUAL_EVIDENCE_HEADER: &str = "\n**VISUAL EVIDENCE (Screenshots showing the issues):**";

const INTERACTIVE_RUBRIC: &str = r#"Rate it 0-100 based on these simple criteria:

1. **Does it work?** (30 pts)
   - Buttons/sliders respond
   - Shows visual changes when interacted with
   - Not broken or crashing

2. **Is it usable?** (30 pts)
   - Layout makes sense
   - Clear what to do
   - Feedback appears when you interact

3. **Looks reasonable?** (20 pts)
   - Not ugly or confusing
   - Colors/text are readable
   - Organized layout

4. **Teaches the concept?** (20 pts)
   - Helps students understand
   - Interactive learning happens

**Scoring:**
- 0-60: Broken (doesn't work)
- 61-74: Works but poor UX
- 75+: Good (works, usable, makes sense)

Respond in JSON:
{
    "score": <0-100>,
    "feedback": "<brief assessment>",
    "issues": ["<major issue>"],
    "unnecessary_elements": [],
    "ui_improvements": []
}"#;

const IMAGE_RUBRIC: &str = r#"Evaluate this SVG diagram. Rate 0-100:
- Clarity and readability
- Educational value
- Visual quality

Respond in JSON:
{
    "score": <0-100>,
    "feedback": "<brief assessment>",
    "issues": ["<issue if any>"]
}"#;

const FIX_INSTRUCTIONS: &str = "**CRITICAL INSTRUCTIONS:**
1. PRESERVE all working interactive elements (sliders, buttons, inputs)
2. PRESERVE all JavaScript functionality that works
3. ONLY fix the specific issues mentioned above
4. If interactions work, do not change the JS logic
5. Focus on fixing: styling, colors, spacing, feedback text, layout
6. Keep the component self-contained (inline CSS/JS)
7. Return COMPLETE working HTML (do not remove anything functional)

Generate the COMPLETE fixed HTML. Return ONLY the HTML code, no explanations.";

/// Teaching context block for the judge. Empty when there is no context.
pub fn context_section(context: &TeachingContext) -> String {
    let explanation = non_blank(&context.explanation);
    let input_label = non_blank(&context.input_label);
    if explanation.is_none() && input_label.is_none() {
        return String::new();
    }

    let mut section = String::from("\n**EDUCATIONAL CONTEXT:**\n");
    if let Some(explanation) = explanation {
        let cut: String = explanation.chars().take(EXPLANATION_LIMIT).collect();
        section.push_str(&format!("Step Purpose: {}\n", cut));
    }
    if let Some(label) = input_label {
        section.push_str(&format!("Learning Goal: {}\n", label));
    }
    section.push_str(
        "\nIMPORTANT: Consider the pedagogical intent. This step may intentionally omit details that come in later steps.\n",
    );
    section
}

/// Scoring prompt for one component.
pub fn judge_prompt(kind: ComponentKind, interaction_log: &[String], context: &TeachingContext) -> String {
    match kind {
        ComponentKind::Interactive => {
            let summary = interaction_log
                .iter()
                .map(|line| format!("- {}", line))
                .collect::<Vec<_>>()
                .join("\n");
            format!(
                "Evaluate this educational component. The screenshots show it before and after interactions.\n\n{}\n{}\n{}",
                summary,
                context_section(context),
                INTERACTIVE_RUBRIC
            )
        }
        ComponentKind::Image => format!("{}\n{}", context_section(context), IMAGE_RUBRIC)
            .trim_start()
            .to_string(),
    }
}

/// Source listing plus repair rules, appended after the fix prompt and the
/// screenshots.
pub fn fix_instructions(current_source: &str) -> String {
    format!(
        "\n\n**Current HTML Code:**\n```html\n{}\n```\n\n{}",
        current_source, FIX_INSTRUCTIONS
    )
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> TeachingContext {
        TeachingContext {
            question: Some("What is 3/4 of 12?".to_string()),
            explanation: Some("x".repeat(400)),
            input_label: Some("Find three quarters".to_string()),
        }
    }

    #[test]
    fn test_context_section() {
        let section = context_section(&context());
        assert!(section.contains("**EDUCATIONAL CONTEXT:**"));
        assert!(section.contains(&format!("Step Purpose: {}\n", "x".repeat(300))));
        assert!(!section.contains(&"x".repeat(301)));
        assert!(section.contains("Learning Goal: Find three quarters"));
        assert!(section.contains("pedagogical intent"));
    }

    #[test]
    fn test_context_section_empty() {
        assert!(context_section(&TeachingContext::default()).is_empty());

        let only_question = TeachingContext {
            question: Some("Q".to_string()),
            explanation: Some("   ".to_string()),
            input_label: None,
        };
        assert!(context_section(&only_question).is_empty());
    }

    #[test]
    fn test_interactive_prompt() {
        let log = vec![
            "Initial state captured".to_string(),
            "Moved slider 1 to value 50".to_string(),
        ];
        let prompt = judge_prompt(ComponentKind::Interactive, &log, &context());
        assert!(prompt.starts_with("Evaluate this educational component."));
        assert!(prompt.contains("- Initial state captured\n- Moved slider 1 to value 50"));
        assert!(prompt.contains("1. **Does it work?** (30 pts)"));
        assert!(prompt.contains("4. **Teaches the concept?** (20 pts)"));
        assert!(prompt.contains("\"ui_improvements\": []"));
        assert!(prompt.contains("Learning Goal"));
    }

    #[test]
    fn test_image_prompt() {
        let prompt = judge_prompt(ComponentKind::Image, &[], &TeachingContext::default());
        assert!(prompt.starts_with("Evaluate this SVG diagram. Rate 0-100:"));
        assert!(!prompt.contains("Does it work?"));
    }

    #[test]
    fn test_fix_instructions() {
        let text = fix_instructions("<html></html>");
        assert!(text.contains("**Current HTML Code:**\n```html\n<html></html>\n```"));
        assert!(text.contains("7. Return COMPLETE working HTML"));
        assert!(text.ends_with("Return ONLY the HTML code, no explanations."));
    }
}
