//! 工具箱：Tool trait、注册表、执行器与具体工具，以及按场景划分的工具组

pub mod calc;
pub mod code_run;
pub mod document;
pub mod executor;
pub mod image;
pub mod registry;
pub mod schema;
pub mod text;
pub mod web_search;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub use calc::{evaluate, CalcError, CalcTool, CalculateTool, Number};
pub use code_run::RunCodeTool;
pub use document::{AnalyzeDocumentTool, ConvertDocumentTool};
pub use executor::ToolExecutor;
pub use image::DescribeImageTool;
pub use registry::{Tool, ToolRegistry};
pub use schema::tool_call_schema_json;
pub use text::{CountWordsTool, ReverseTextTool, ToUppercaseTool};
pub use web_search::WebSearchTool;

use crate::config::ToolsSection;
use crate::llm::LlmClient;

/// 工具组：documents / math / text 对应三个 MCP 服务器，combined 为三者之和；
/// playground 与 mas 为流水线监督者使用的工具集
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolGroup {
    Documents,
    Math,
    Text,
    Playground,
    Mas,
    Combined,
}

impl ToolGroup {
    pub const ALL: [ToolGroup; 6] = [
        ToolGroup::Documents,
        ToolGroup::Math,
        ToolGroup::Text,
        ToolGroup::Playground,
        ToolGroup::Mas,
        ToolGroup::Combined,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolGroup::Documents => "documents",
            ToolGroup::Math => "math",
            ToolGroup::Text => "text",
            ToolGroup::Playground => "playground",
            ToolGroup::Mas => "mas",
            ToolGroup::Combined => "combined",
        }
    }

    /// MCP 服务器展示名
    pub fn server_name(&self) -> &'static str {
        match self {
            ToolGroup::Documents => "Document Converter",
            ToolGroup::Math => "Math Server",
            ToolGroup::Text => "Text Server",
            ToolGroup::Playground => "Playground Tools",
            ToolGroup::Mas => "MAS Tools",
            ToolGroup::Combined => "Combined Multi-Server Hub",
        }
    }
}

impl fmt::Display for ToolGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolGroup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        ToolGroup::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = ToolGroup::ALL.iter().map(|g| g.as_str()).collect();
                format!("unknown tool group '{}' (expected one of: {})", s, names.join(", "))
            })
    }
}

/// 按工具组构建注册表；vision_llm 仅 describe_image 使用
pub fn build_tool_group(
    group: ToolGroup,
    cfg: &ToolsSection,
    vision_llm: Arc<dyn LlmClient>,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    let web_search = || {
        WebSearchTool::from_key(
            cfg.search.tavily_api_key.as_deref(),
            cfg.search.timeout_secs,
            cfg.search.max_results,
            cfg.search.max_result_chars,
        )
    };

    match group {
        ToolGroup::Documents => {
            registry.register(ConvertDocumentTool);
            registry.register(AnalyzeDocumentTool);
        }
        ToolGroup::Math => registry.register(CalculateTool),
        ToolGroup::Text => {
            registry.register(CountWordsTool);
            registry.register(ReverseTextTool);
            registry.register(ToUppercaseTool);
        }
        ToolGroup::Playground => {
            registry.register(web_search());
            registry.register(CalcTool);
        }
        ToolGroup::Mas => {
            registry.register(web_search());
            registry.register(DescribeImageTool::new(vision_llm));
            registry.register(RunCodeTool::new(
                cfg.code.interpreter.clone(),
                cfg.code.timeout_secs,
                cfg.code.max_output_chars,
            ));
        }
        ToolGroup::Combined => {
            for sub in [ToolGroup::Documents, ToolGroup::Math, ToolGroup::Text] {
                registry.extend(build_tool_group(sub, cfg, vision_llm.clone()));
            }
        }
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;

    fn names(group: ToolGroup) -> Vec<String> {
        build_tool_group(group, &ToolsSection::default(), Arc::new(MockLlmClient)).tool_names()
    }

    #[test]
    fn test_group_contents() {
        assert_eq!(names(ToolGroup::Playground), vec!["calc", "web_search"]);
        assert_eq!(
            names(ToolGroup::Mas),
            vec!["describe_image", "run_code", "web_search"]
        );
        assert_eq!(
            names(ToolGroup::Combined),
            vec![
                "analyze_document",
                "calculate",
                "convert_document",
                "count_words",
                "reverse_text",
                "to_uppercase"
            ]
        );
    }

    #[test]
    fn test_parse_group() {
        assert_eq!("Math".parse::<ToolGroup>().unwrap(), ToolGroup::Math);
        assert!("pdf".parse::<ToolGroup>().unwrap_err().contains("documents"));
    }
}
