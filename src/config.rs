//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `MAS__*` 覆盖（双下划线表示嵌套，如 `MAS__LLM__PROVIDER=mock`），
//! 最后应用沿用下来的单独变量：BASE_MODEL、BASE_URL、OPENROUTER_API_KEY / OPENAI_API_KEY、TAVILY_API_KEY。

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub pipeline: PipelineSection,
    pub tools: ToolsSection,
    pub mcp: McpSection,
    pub judge: JudgeSection,
}

/// [app] 段：应用名、运行轨迹目录
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub name: String,
    /// 每次流水线运行的轨迹写入该目录（`<id>.json`）；未设置则不保存
    pub trace_dir: Option<PathBuf>,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: "mas".to_string(),
            trace_dir: Some(PathBuf::from("traces")),
        }
    }
}

/// [llm] 段：后端选择、模型与超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// 后端：openrouter / openai / mock
    pub provider: String,
    pub model: String,
    /// 覆盖后端默认地址（OpenAI 兼容代理等）
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    /// 视觉模型；未设置时与 model 相同
    pub vision_model: Option<String>,
    pub timeouts: LlmTimeoutsSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "openrouter".to_string(),
            model: crate::llm::DEFAULT_MODEL.to_string(),
            base_url: None,
            api_key: None,
            vision_model: None,
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmTimeoutsSection {
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self { request: 60 }
    }
}

/// [pipeline] 段：各节点温度、计划步数、重试上限、监督者上下文长度
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    pub max_plan_steps: usize,
    /// 校验失败达到该次数后强制进入总结
    pub max_validation_failures: u32,
    /// 交给工具智能体的消息前缀长度；0 表示全部
    pub supervisor_context_messages: usize,
    /// false 时 validator → summarizer 无条件直连（不重试）
    pub retry_on_invalid: bool,
    /// 工具智能体单次调用的最大推理步数
    pub max_agent_steps: usize,
    pub recursion_limit: usize,
    pub temperatures: TemperaturesSection,
    /// 自定义 prompt 目录（planner.txt / supervisor.txt / validator.txt / summary.txt）
    pub prompts_dir: Option<PathBuf>,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            max_plan_steps: 8,
            max_validation_failures: 2,
            supervisor_context_messages: 2,
            retry_on_invalid: true,
            max_agent_steps: 8,
            recursion_limit: 25,
            temperatures: TemperaturesSection::default(),
            prompts_dir: Some(PathBuf::from("config/prompts")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TemperaturesSection {
    pub planner: f32,
    pub supervisor: f32,
    pub validator: f32,
    pub summarizer: f32,
}

impl Default for TemperaturesSection {
    fn default() -> Self {
        Self {
            planner: 0.0,
            supervisor: 0.0,
            validator: 0.0,
            summarizer: 0.3,
        }
    }
}

/// [tools] 段：工具超时、搜索与代码执行
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    /// 单次工具调用超时（秒）
    pub tool_timeout_secs: u64,
    pub search: SearchSection,
    pub code: CodeSection,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            tool_timeout_secs: 30,
            search: SearchSection::default(),
            code: CodeSection::default(),
        }
    }
}

/// [tools.search] 段：Tavily 密钥（缺省时使用 mock 结果）、超时、结果数量与长度
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchSection {
    pub tavily_api_key: Option<String>,
    pub timeout_secs: u64,
    pub max_results: usize,
    pub max_result_chars: usize,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            tavily_api_key: None,
            timeout_secs: 15,
            max_results: 5,
            max_result_chars: 8000,
        }
    }
}

/// [tools.code] 段：run_code 的解释器、超时与输出上限
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CodeSection {
    pub interpreter: String,
    pub timeout_secs: u64,
    pub max_output_chars: usize,
}

impl Default for CodeSection {
    fn default() -> Self {
        Self {
            interpreter: "python3".to_string(),
            timeout_secs: 20,
            max_output_chars: 8000,
        }
    }
}

/// [mcp] 段：启动时连接的 stdio MCP 服务器
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct McpSection {
    pub servers: Vec<McpServerConfig>,
}

/// [[mcp.servers]]：子进程命令行与额外环境变量
#[derive(Debug, Clone, Deserialize)]
pub struct McpServerConfig {
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
}

/// [judge] 段：评审模型、轨迹目录与报告输出
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JudgeSection {
    /// 未设置时与 llm.model 相同
    pub model: Option<String>,
    pub temperature: f32,
    pub traces_dir: PathBuf,
    pub output: PathBuf,
}

impl Default for JudgeSection {
    fn default() -> Self {
        Self {
            model: None,
            temperature: 0.0,
            traces_dir: PathBuf::from("traces"),
            output: PathBuf::from("validation.json"),
        }
    }
}

/// 从 config 目录加载配置，环境变量 MAS__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 叠加环境变量 MAS__*（双下划线表示嵌套键）
/// 4. 应用 BASE_MODEL 等单独变量
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        } else {
            tracing::warn!(path = %path.display(), "config file not found, ignored");
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("MAS")
            .separator("__")
            .try_parsing(true),
    );

    let mut cfg: AppConfig = builder.build()?.try_deserialize()?;
    apply_env_overrides(&mut cfg, |key| std::env::var(key).ok());
    Ok(cfg)
}

/// 单独环境变量覆盖；lookup 便于测试注入
pub fn apply_env_overrides<F>(cfg: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(model) = non_empty("BASE_MODEL") {
        cfg.llm.model = model;
    }
    if let Some(url) = non_empty("BASE_URL") {
        cfg.llm.base_url = Some(url);
    }
    if cfg.llm.api_key.is_none() {
        let key = match cfg.llm.provider.as_str() {
            "openai" => non_empty("OPENAI_API_KEY"),
            _ => non_empty("OPENROUTER_API_KEY").or_else(|| non_empty("OPENAI_API_KEY")),
        };
        cfg.llm.api_key = key;
    }
    if cfg.tools.search.tavily_api_key.is_none() {
        cfg.tools.search.tavily_api_key = non_empty("TAVILY_API_KEY");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.llm.provider, "openrouter");
        assert_eq!(cfg.pipeline.max_plan_steps, 8);
        assert_eq!(cfg.pipeline.max_validation_failures, 2);
        assert_eq!(cfg.pipeline.supervisor_context_messages, 2);
        assert!(cfg.pipeline.retry_on_invalid);
        assert_eq!(cfg.tools.tool_timeout_secs, 30);
        assert_eq!(cfg.judge.output, PathBuf::from("validation.json"));
    }

    #[test]
    fn test_partial_toml_keeps_field_defaults() {
        let cfg: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(
                "[pipeline]\nretry_on_invalid = false\n\n[[mcp.servers]]\nname = \"math\"\ncommand = \"mas-mcp\"\nargs = [\"--server\", \"math\"]\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert!(!cfg.pipeline.retry_on_invalid);
        assert_eq!(cfg.pipeline.max_plan_steps, 8);
        assert_eq!(cfg.pipeline.temperatures.summarizer, 0.3);
        assert_eq!(cfg.mcp.servers[0].args, vec!["--server", "math"]);
    }

    #[test]
    fn test_env_overrides() {
        let mut cfg = AppConfig::default();
        let env: HashMap<&str, &str> = [
            ("BASE_MODEL", "openai/gpt-4o-mini"),
            ("OPENROUTER_API_KEY", "sk-or"),
            ("TAVILY_API_KEY", ""),
        ]
        .into_iter()
        .collect();
        apply_env_overrides(&mut cfg, |k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.llm.model, "openai/gpt-4o-mini");
        assert_eq!(cfg.llm.api_key.as_deref(), Some("sk-or"));
        assert!(cfg.tools.search.tavily_api_key.is_none());
    }
}
