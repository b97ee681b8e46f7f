//! Deterministic prompt template assembly (C10).
//!
//! No hidden state, no network. Five templates — system, core, auxiliary,
//! specific, final — each independently resolved from an explicit
//! directory, then an environment variable, then a compiled-in default,
//! mirroring the teacher's `PromptSet::load` resolution order.

use std::path::{Path, PathBuf};

use crate::registry::IndustryProfile;

/// Compiled-in system prompt template, `{industry}` substituted at render time.
pub const SYSTEM_TEMPLATE: &str = "You are a financial analyst writing a structured equity research note for a company in the {industry} industry. Be precise, cite the figures given, and never invent data not present in the indicators or context below.";

/// Compiled-in template for the core-indicator analysis step.
pub const CORE_TEMPLATE: &str = "## Core Indicators\n\n{indicators}\n\n## Supporting Context\n\n{context}\n\nWrite a concise analysis of the company's core financial position based only on the indicators and context above.";

/// Compiled-in template for the auxiliary-indicator analysis step.
pub const AUXILIARY_TEMPLATE: &str = "## Auxiliary Indicators\n\n{indicators}\n\nWrite a concise analysis of the company's secondary financial characteristics based only on the indicators above.";

/// Compiled-in template for the industry-specific analysis step.
pub const SPECIFIC_TEMPLATE: &str = "## Industry-Specific Indicators ({industry})\n\n{indicators}\n\nWrite a concise analysis focused on what these indicators imply for a company in this industry.";

/// Compiled-in template for the final report-composition step.
pub const FINAL_TEMPLATE: &str = "## Core Analysis\n\n{core_analysis}\n\n## Auxiliary Analysis\n\n{auxiliary_analysis}\n\n## Specific Analysis\n\n{specific_analysis}\n\n## Supporting Context\n\n{context}\n\nCompose the final report. It MUST include, verbatim as section headings, each of: 核心结论, 分项分析, 综合判断, 投资建议.";

/// Environment variable carrying the prompt template directory, mirroring
/// the teacher's `RLM_PROMPT_DIR`.
const PROMPT_DIR_ENV: &str = "FINREPORT_PROMPT_DIR";

const SYSTEM_FILENAME: &str = "system.md";
const CORE_FILENAME: &str = "core.md";
const AUXILIARY_FILENAME: &str = "auxiliary.md";
const SPECIFIC_FILENAME: &str = "specific.md";
const FINAL_FILENAME: &str = "final.md";

/// The five resolved prompt templates for one process.
#[derive(Debug, Clone)]
pub struct PromptSet {
    /// System prompt template, `{industry}` substituted.
    pub system: String,
    /// Core-indicator analysis template.
    pub core: String,
    /// Auxiliary-indicator analysis template.
    pub auxiliary: String,
    /// Industry-specific analysis template.
    pub specific: String,
    /// Final report-composition template.
    pub r#final: String,
}

impl PromptSet {
    /// Resolves templates from `prompt_dir`, then [`PROMPT_DIR_ENV`], then
    /// compiled-in defaults. Each file is resolved independently — a
    /// missing file falls back to its default without failing the whole
    /// set.
    #[must_use]
    pub fn load(prompt_dir: Option<&Path>) -> Self {
        let resolved_dir = prompt_dir
            .map(PathBuf::from)
            .or_else(|| std::env::var(PROMPT_DIR_ENV).ok().map(PathBuf::from));

        let load_file = |filename: &str, default: &str| -> String {
            resolved_dir
                .as_ref()
                .map(|dir| dir.join(filename))
                .and_then(|path| std::fs::read_to_string(&path).ok())
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            system: load_file(SYSTEM_FILENAME, SYSTEM_TEMPLATE),
            core: load_file(CORE_FILENAME, CORE_TEMPLATE),
            auxiliary: load_file(AUXILIARY_FILENAME, AUXILIARY_TEMPLATE),
            specific: load_file(SPECIFIC_FILENAME, SPECIFIC_TEMPLATE),
            r#final: load_file(FINAL_FILENAME, FINAL_TEMPLATE),
        }
    }

    /// Compiled-in defaults, ignoring the filesystem.
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            system: SYSTEM_TEMPLATE.to_string(),
            core: CORE_TEMPLATE.to_string(),
            auxiliary: AUXILIARY_TEMPLATE.to_string(),
            specific: SPECIFIC_TEMPLATE.to_string(),
            r#final: FINAL_TEMPLATE.to_string(),
        }
    }

    /// Renders the system prompt for `industry`.
    #[must_use]
    pub fn render_system(&self, industry: &IndustryProfile) -> String {
        self.system.replace("{industry}", industry.name)
    }

    /// Renders the core-analysis user prompt.
    #[must_use]
    pub fn render_core(&self, indicators: &str, context: &str) -> String {
        self.core
            .replace("{indicators}", indicators)
            .replace("{context}", context)
    }

    /// Renders the auxiliary-analysis user prompt.
    #[must_use]
    pub fn render_auxiliary(&self, indicators: &str) -> String {
        self.auxiliary.replace("{indicators}", indicators)
    }

    /// Renders the industry-specific-analysis user prompt.
    #[must_use]
    pub fn render_specific(&self, industry: &IndustryProfile, indicators: &str) -> String {
        self.specific
            .replace("{industry}", industry.name)
            .replace("{indicators}", indicators)
    }

    /// Renders the final report-composition user prompt.
    #[must_use]
    pub fn render_final(
        &self,
        core_analysis: &str,
        auxiliary_analysis: &str,
        specific_analysis: &str,
        context: &str,
    ) -> String {
        self.r#final
            .replace("{core_analysis}", core_analysis)
            .replace("{auxiliary_analysis}", auxiliary_analysis)
            .replace("{specific_analysis}", specific_analysis)
            .replace("{context}", context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry;

    #[test]
    fn test_defaults_are_nonempty() {
        let prompts = PromptSet::defaults();
        assert!(!prompts.system.is_empty());
        assert!(!prompts.core.is_empty());
        assert!(!prompts.r#final.is_empty());
    }

    #[test]
    fn test_render_system_substitutes_industry() {
        let profile = registry::lookup("general").unwrap();
        let prompts = PromptSet::defaults();
        let rendered = prompts.render_system(profile);
        assert!(rendered.contains("综合"));
        assert!(!rendered.contains("{industry}"));
    }

    #[test]
    fn test_load_falls_back_to_default_when_dir_missing() {
        let prompts = PromptSet::load(Some(Path::new("/nonexistent/prompt/dir")));
        assert_eq!(prompts.system, SYSTEM_TEMPLATE);
    }

    #[test]
    fn test_final_template_names_required_sections() {
        assert!(FINAL_TEMPLATE.contains("核心结论"));
        assert!(FINAL_TEMPLATE.contains("分项分析"));
        assert!(FINAL_TEMPLATE.contains("综合判断"));
        assert!(FINAL_TEMPLATE.contains("投资建议"));
    }
}
