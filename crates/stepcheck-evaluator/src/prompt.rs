//! Fix instruction assembly.

use stepcheck_protocols::{ComponentKind, EvaluationResult, TeachingContext};

fn bullet_list(items: &[String]) -> String {
    if items.is_empty() {
        return "None".to_string();
    }
    items
        .iter()
        .map(|item| format!("- {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}

fn context_block(context: &TeachingContext) -> String {
    if context.is_empty() {
        return String::new();
    }
    let mut block = String::from("\n**EDUCATIONAL CONTEXT (what this component teaches):**\n");
    if let Some(question) = &context.question {
        block.push_str(&format!("Question: {}\n", question));
    }
    if let Some(explanation) = &context.explanation {
        block.push_str(&format!("Step Purpose: {}\n", explanation));
    }
    if let Some(label) = &context.input_label {
        block.push_str(&format!("Learning Goal: {}\n", label));
    }
    block.push('\n');
    block
}

/// Build the natural-language fix request for a deficient component.
///
/// `kind` of `None` produces the generic variant. The function is pure; the
/// current source and output-format rules are appended by the fixer.
pub fn build_fix_prompt(
    kind: Option<ComponentKind>,
    result: &EvaluationResult,
    context: &TeachingContext,
) -> String {
    let step = result.step_index + 1;
    let issues = bullet_list(&result.issues);

    match kind {
        Some(ComponentKind::Interactive) => format!(
            "Fix this interactive homework component for Step {step}.
{context}
**Evaluator Assessment:**
{feedback}

**Specific Issues to Fix:**
{issues}

**Elements to Remove (if present):**
{removals}

**UI/UX Improvements Needed:**
{improvements}

**YOUR TASK:**
Fix only the issues listed above. Do not rewrite the component from scratch.

**What to PRESERVE:**
- Working JavaScript behavior (event listeners, calculations, animations)
- The interactive controls (sliders, buttons, inputs) and how they respond
- Visual feedback that already works
- The teaching purpose of the step

**What you may CHANGE:**
- Styling (colors, spacing, alignment, fonts)
- Copy and feedback text that is unclear or missing
- Layout
- Redundant or duplicated UI elements
- Interactions that are broken

**Design Requirements:**
- Clean, uncluttered layout with good contrast
- Immediate visual feedback on every interaction
- Self-contained (inline CSS and JS, no external dependencies)
- No placeholder text",
            context = context_block(context),
            feedback = result.feedback,
            removals = bullet_list(&result.unnecessary_elements),
            improvements = bullet_list(&result.ui_improvements),
        ),
        Some(ComponentKind::Image) => format!(
            "The diagram for Step {step} needs improvement.
{context}
Issues found:
{issues}

Evaluator feedback:
{feedback}

Regenerate the diagram with these fixes:
1. Make it clearer and easier to read
2. Keep every label visible and correct
3. Use restrained colors and consistent styling
4. Keep it focused on what the step teaches

**What to PRESERVE:** the concept being illustrated and any labels that are correct.
**What you may CHANGE:** styling, copy, layout.",
            context = context_block(context),
            feedback = result.feedback,
        ),
        None => format!(
            "Component needs improvement.

Issues:
{issues}

Feedback:
{feedback}

Preserve whatever already works and the teaching purpose. Fix the issues above \
by changing styling, copy or layout, then return the complete component.",
            feedback = result.feedback,
        ),
    }
}

#[cfg(test)]
#[path = "prompt_tests.rs"]
mod tests;
