//! Step Registry: the immutable, ordered catalog of wizard steps.
//!
//! Each [`StepDefinition`] either carries a single input set / action, or a
//! per-language pair of variants. [`resolve`] is the only place that looks
//! inside a step body; gating, execution and presentation all go through it
//! so language branching is decided in exactly one function.
//!
//! ## Catalog
//!
//! ```text
//!  1 Upload PDF ─▶ 2 Choose Language ─▶ 3 Remove Text ─▶ 4 Extract Data
//!                                                          │
//!                              ┌── arabic ── 5 Translate ◀─┤
//!                              ▼                           │
//!                     6 Reconstruct PDF ◀──── english ─────┘
//!                              │
//!                     7 Create Visualization ─▶ 8 Side-by-Side Comparison
//! ```

use crate::language::{Language, PerLanguage};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::fmt;

/// Step identifier. The numeric order is the pipeline order.
pub type StepId = u32;

/// Id of the local language-choice step.
pub const LANGUAGE_STEP: StepId = 2;
/// Id of the terminal comparison step.
pub const COMPARISON_STEP: StepId = 8;
/// Input id of the language radio on [`LANGUAGE_STEP`].
pub const LANGUAGE_INPUT: &str = "lang";

// ── Types ────────────────────────────────────────────────────────────────

/// Remote operation invoked when a step executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionId {
    Upload,
    RemoveText,
    ExtractCharacters,
    ExtractLines,
    TranslateArabic,
    ReconstructEnglish,
    ReconstructArabic,
    VisualizeLines,
}

impl ActionId {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionId::Upload => "upload",
            ActionId::RemoveText => "removeText",
            ActionId::ExtractCharacters => "extractCharacters",
            ActionId::ExtractLines => "extractLines",
            ActionId::TranslateArabic => "translateArabic",
            ActionId::ReconstructEnglish => "reconstructEnglish",
            ActionId::ReconstructArabic => "reconstructArabic",
            ActionId::VisualizeLines => "visualizeLines",
        }
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of a form input together with its type-specific constraints.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InputKind {
    /// A local file to send to the service. `accept` is a filename suffix filter.
    File { accept: Option<&'static str> },
    Text,
    /// Integer input with inclusive bounds.
    Number { min: Option<i64>, max: Option<i64> },
    /// One of a fixed set of string options.
    Radio { options: &'static [&'static str] },
}

/// A declared default for an input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DefaultValue {
    Text(&'static str),
    Number(i64),
}

/// One form input of a step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputSpec {
    pub id: &'static str,
    #[serde(flatten)]
    pub kind: InputKind,
    #[serde(rename = "value", skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,
}

impl InputSpec {
    fn file(id: &'static str, accept: &'static str) -> Self {
        Self {
            id,
            kind: InputKind::File {
                accept: Some(accept),
            },
            default: None,
        }
    }

    fn text(id: &'static str, default: &'static str) -> Self {
        Self {
            id,
            kind: InputKind::Text,
            default: Some(DefaultValue::Text(default)),
        }
    }

    fn number(id: &'static str, default: i64, min: i64, max: i64) -> Self {
        Self {
            id,
            kind: InputKind::Number {
                min: Some(min),
                max: Some(max),
            },
            default: Some(DefaultValue::Number(default)),
        }
    }

    fn radio(id: &'static str, options: &'static [&'static str], default: &'static str) -> Self {
        Self {
            id,
            kind: InputKind::Radio { options },
            default: Some(DefaultValue::Text(default)),
        }
    }
}

/// Inputs, action and result artifact of one language variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepVariant {
    pub inputs: Vec<InputSpec>,
    pub action: ActionId,
    pub result: &'static str,
}

/// The executable part of a step.
#[derive(Debug, Clone, PartialEq)]
enum StepBody {
    /// Same inputs for every language. `action` is `None` for local steps.
    Fixed {
        inputs: Vec<InputSpec>,
        action: Option<ActionId>,
        result: Option<&'static str>,
    },
    /// A variant per language; a `None` slot is a no-op placeholder.
    Conditional(PerLanguage<Option<StepVariant>>),
}

/// What a step looks like under one language.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResolvedStep<'a> {
    pub inputs: &'a [InputSpec],
    pub action: Option<ActionId>,
    pub result: Option<&'static str>,
}

/// Split-view configuration of the comparison step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewerConfig {
    pub left: &'static str,
    pub right: PerLanguage<&'static str>,
}

impl ViewerConfig {
    pub fn right_for(&self, language: Language) -> &'static str {
        self.right.get(language)
    }
}

/// A link-style action offered on the terminal step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionConfig {
    pub label: &'static str,
    pub target: Option<PerLanguage<&'static str>>,
}

/// Static definition of a wizard step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepDefinition {
    pub id: StepId,
    pub title: &'static str,
    pub description: &'static str,
    /// Restricts the step to one language. `None` means always visible.
    pub visible_when: Option<Language>,
    pub viewer: Option<ViewerConfig>,
    pub actions: Vec<ActionConfig>,
    body: StepBody,
}

impl StepDefinition {
    pub fn is_visible(&self, language: Language) -> bool {
        self.visible_when.is_none_or(|l| l == language)
    }

    /// Every input of every variant, in declaration order.
    ///
    /// Used to seed form data; input ids are unique across variants.
    pub fn all_inputs(&self) -> Vec<&InputSpec> {
        match &self.body {
            StepBody::Fixed { inputs, .. } => inputs.iter().collect(),
            StepBody::Conditional(variants) => variants
                .iter()
                .filter_map(|(_, v)| v.as_ref())
                .flat_map(|v| v.inputs.iter())
                .collect(),
        }
    }
}

// ── Resolution ───────────────────────────────────────────────────────────

/// Resolve the concrete inputs / action / result of `step` under `language`.
///
/// Returns `None` when the step is conditional and has no variant for
/// `language`. Pure and total over the catalog.
pub fn resolve(step: &StepDefinition, language: Language) -> Option<ResolvedStep<'_>> {
    match &step.body {
        StepBody::Fixed {
            inputs,
            action,
            result,
        } => Some(ResolvedStep {
            inputs,
            action: *action,
            result: *result,
        }),
        StepBody::Conditional(variants) => {
            variants.get(language).as_ref().map(|v| ResolvedStep {
                inputs: &v.inputs,
                action: Some(v.action),
                result: Some(v.result),
            })
        }
    }
}

/// The full catalog in pipeline order.
pub fn steps() -> &'static [StepDefinition] {
    &STEPS
}

/// Look up a step by id.
pub fn find(id: StepId) -> Option<&'static StepDefinition> {
    STEPS.iter().find(|s| s.id == id)
}

// ── Catalog ──────────────────────────────────────────────────────────────

static STEPS: Lazy<Vec<StepDefinition>> = Lazy::new(|| {
    vec![
        StepDefinition {
            id: 1,
            title: "Upload PDF",
            description: "Choose a PDF file to process.",
            visible_when: None,
            viewer: None,
            actions: Vec::new(),
            body: StepBody::Fixed {
                inputs: vec![
                    InputSpec::file("file", ".pdf"),
                    InputSpec::text("save_as", "input.pdf"),
                ],
                action: Some(ActionId::Upload),
                result: Some("input.pdf"),
            },
        },
        StepDefinition {
            id: LANGUAGE_STEP,
            title: "Choose Language",
            description: "Select English or Arabic processing pipeline.",
            visible_when: None,
            viewer: None,
            actions: Vec::new(),
            body: StepBody::Fixed {
                inputs: vec![InputSpec::radio(
                    LANGUAGE_INPUT,
                    &["english", "arabic"],
                    "english",
                )],
                action: None,
                result: None,
            },
        },
        StepDefinition {
            id: 3,
            title: "Remove Text",
            description: "Create a text-removed base version of the PDF.",
            visible_when: None,
            viewer: None,
            actions: Vec::new(),
            body: StepBody::Fixed {
                inputs: vec![
                    InputSpec::text("input_pdf", "input.pdf"),
                    InputSpec::text("output_pdf", "input_text_removed.pdf"),
                ],
                action: Some(ActionId::RemoveText),
                result: Some("input_text_removed.pdf"),
            },
        },
        StepDefinition {
            id: 4,
            title: "Extract Data",
            description: "Extract character data (English) or line data (Arabic).",
            visible_when: None,
            viewer: None,
            actions: Vec::new(),
            body: StepBody::Conditional(PerLanguage::new(
                Some(StepVariant {
                    inputs: vec![InputSpec::text("json_output", "extracted_data.json")],
                    action: ActionId::ExtractCharacters,
                    result: "extracted_data.json",
                }),
                Some(StepVariant {
                    inputs: vec![InputSpec::text("line_db_output", "line_db.json")],
                    action: ActionId::ExtractLines,
                    result: "line_db.json",
                }),
            )),
        },
        StepDefinition {
            id: 5,
            title: "Translate (Arabic only)",
            description: "Translate Arabic text to target language.",
            visible_when: Some(Language::Arabic),
            viewer: None,
            actions: Vec::new(),
            body: StepBody::Fixed {
                inputs: vec![
                    InputSpec::text("ar_line_db_output", "ar_line_db.json"),
                    InputSpec::number("max_workers", 2, 1, 8),
                    InputSpec::number("timeout_seconds", 120, 30, 600),
                ],
                action: Some(ActionId::TranslateArabic),
                result: Some("ar_line_db.json"),
            },
        },
        StepDefinition {
            id: 6,
            title: "Reconstruct PDF",
            description: "Overlay translated text back onto the base PDF.",
            visible_when: None,
            viewer: None,
            actions: Vec::new(),
            body: StepBody::Conditional(PerLanguage::new(
                Some(StepVariant {
                    inputs: vec![
                        InputSpec::text("json_input", "extracted_data.json"),
                        InputSpec::text("text_removed_pdf", "input_text_removed.pdf"),
                        InputSpec::text("output_pdf", "english_reconstructed_input.pdf"),
                    ],
                    action: ActionId::ReconstructEnglish,
                    result: "english_reconstructed_input.pdf",
                }),
                Some(StepVariant {
                    inputs: vec![
                        InputSpec::text("ar_line_db_input", "ar_line_db.json"),
                        InputSpec::text("base_pdf", "input_text_removed.pdf"),
                        InputSpec::text("arabic_output_pdf", "arabic_reconstructed_input.pdf"),
                    ],
                    action: ActionId::ReconstructArabic,
                    result: "arabic_reconstructed_input.pdf",
                }),
            )),
        },
        StepDefinition {
            id: 7,
            title: "Create Visualization",
            description: "Generate line boxes overlay for debugging (optional).",
            visible_when: None,
            viewer: None,
            actions: Vec::new(),
            body: StepBody::Fixed {
                inputs: vec![InputSpec::text("visualized_pdf", "input_visualized.pdf")],
                action: Some(ActionId::VisualizeLines),
                result: Some("input_visualized.pdf"),
            },
        },
        StepDefinition {
            id: COMPARISON_STEP,
            title: "Side-by-Side Comparison",
            description: "Compare original PDF with final translated version.",
            visible_when: None,
            viewer: Some(ViewerConfig {
                left: "input.pdf",
                right: PerLanguage::new(
                    "english_reconstructed_input.pdf",
                    "arabic_reconstructed_input.pdf",
                ),
            }),
            actions: vec![ActionConfig {
                label: "Open Final",
                target: Some(PerLanguage::new(
                    "/viewer/english_reconstructed_input.pdf",
                    "/viewer/arabic_reconstructed_input.pdf",
                )),
            }],
            body: StepBody::Fixed {
                inputs: Vec::new(),
                action: None,
                result: None,
            },
        },
    ]
});

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn catalog_is_ordered_and_complete() {
        let ids: Vec<StepId> = steps().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn input_ids_unique_across_all_variants() {
        for step in steps() {
            let mut seen = HashSet::new();
            for input in step.all_inputs() {
                assert!(
                    seen.insert(input.id),
                    "step {} declares '{}' twice",
                    step.id,
                    input.id
                );
            }
        }
    }

    #[test]
    fn conditional_step_resolves_per_language() {
        let step = find(4).unwrap();
        let en = resolve(step, Language::English).unwrap();
        let ar = resolve(step, Language::Arabic).unwrap();
        assert_eq!(en.action, Some(ActionId::ExtractCharacters));
        assert_eq!(ar.action, Some(ActionId::ExtractLines));
        assert_eq!(en.inputs[0].id, "json_output");
        assert_eq!(ar.result, Some("line_db.json"));
    }

    #[test]
    fn fixed_step_resolves_identically_for_every_language() {
        for step in steps() {
            if step.id == 4 || step.id == 6 {
                continue;
            }
            assert_eq!(
                resolve(step, Language::English),
                resolve(step, Language::Arabic),
                "step {}",
                step.id
            );
        }
    }

    #[test]
    fn empty_conditional_slot_resolves_to_none() {
        let step = StepDefinition {
            id: 99,
            title: "t",
            description: "d",
            visible_when: None,
            viewer: None,
            actions: Vec::new(),
            body: StepBody::Conditional(PerLanguage::new(
                None,
                Some(StepVariant {
                    inputs: Vec::new(),
                    action: ActionId::ExtractLines,
                    result: "x",
                }),
            )),
        };
        assert!(resolve(&step, Language::English).is_none());
        assert!(resolve(&step, Language::Arabic).is_some());
    }

    #[test]
    fn local_steps_have_no_action() {
        for id in [LANGUAGE_STEP, COMPARISON_STEP] {
            let step = find(id).unwrap();
            assert_eq!(resolve(step, Language::English).unwrap().action, None);
        }
    }

    #[test]
    fn translation_only_visible_for_arabic() {
        let step = find(5).unwrap();
        assert!(step.is_visible(Language::Arabic));
        assert!(!step.is_visible(Language::English));
    }

    #[test]
    fn comparison_viewer_right_follows_language() {
        let viewer = find(COMPARISON_STEP).unwrap().viewer.as_ref().unwrap();
        assert_eq!(viewer.left, "input.pdf");
        assert_eq!(
            viewer.right_for(Language::Arabic),
            "arabic_reconstructed_input.pdf"
        );
    }

    #[test]
    fn action_ids_match_service_names() {
        assert_eq!(ActionId::RemoveText.to_string(), "removeText");
        assert_eq!(
            serde_json::to_string(&ActionId::TranslateArabic).unwrap(),
            "\"translateArabic\""
        );
    }
}
