//! Configuration types for Rift proxy.

mod listen;
mod protocol;
mod recording;
mod routing;
mod rules;
mod scripting;
mod upstream;

use std::path::Path;

use serde::{Deserialize, Serialize};

// Re-export all types for library consumers
#[allow(unused_imports)]
pub use listen::{ListenConfig, MetricsConfig, TlsConfig};
pub use protocol::{DeploymentMode, Protocol};
#[allow(unused_imports)]
pub use recording::{
    PredicateGenerator, PredicateGeneratorMatches, RecordingConfig, RecordingPersistence,
};
#[allow(unused_imports)]
pub use routing::{HeaderMatch, HostMatch, Route, RouteMatch};
#[allow(unused_imports)]
pub use rules::{
    ErrorFault, FaultConfig, LatencyFault, MatchConfig, PathMatch, Rule, ScriptRule, TcpFault,
};
#[allow(unused_imports)]
pub use scripting::{
    DecisionCacheConfigFile, FlowStateConfig, RedisConfig, ScriptEngineConfig, ScriptPoolConfigFile,
};
#[allow(unused_imports)]
pub use upstream::{ConnectionPoolConfig, HealthCheckConfig, Upstream, UpstreamConfig};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Optional, informational only. The config is self-describing and supports
    /// combining features (probabilistic rules, script rules, multi-upstream).
    /// Deprecated: kept for backward compatibility.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Deployment mode: "sidecar" or "reverse-proxy"
    /// Recommended: specify explicitly for clarity
    /// If omitted, inferred from upstream/upstreams presence (backward compatible)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<DeploymentMode>,

    pub listen: ListenConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,

    // ===== Deployment Mode Configuration =====
    // Choose exactly ONE deployment mode:
    //
    // SIDECAR MODE:
    //   - Define 'upstream' (single target)
    //   - Do NOT define 'upstreams' or 'routing'
    //   - Traffic: Client -> Rift -> Single Upstream
    //
    // REVERSE PROXY MODE:
    //   - Define 'upstreams' (list of named services)
    //   - Define 'routing' (map requests to upstream names)
    //   - Do NOT define 'upstream'
    //   - Traffic: Client -> Rift -> Multiple Upstreams (routed)
    /// Single upstream target for sidecar mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream: Option<UpstreamConfig>,

    /// Multiple upstream targets for reverse proxy mode
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub upstreams: Vec<Upstream>,

    /// Routing rules for reverse proxy mode (required when 'upstreams' is used)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routing: Vec<Route>,

    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub script_engine: Option<ScriptEngineConfig>,
    #[serde(default)]
    pub flow_state: Option<FlowStateConfig>,
    #[serde(default)]
    pub script_rules: Vec<ScriptRule>,
    #[serde(default)]
    pub connection_pool: ConnectionPoolConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_pool: Option<ScriptPoolConfigFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_cache: Option<DecisionCacheConfigFile>,
    /// Recording configuration for proxy record/replay (Mountebank-compatible)
    #[serde(default)]
    pub recording: RecordingConfig,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        // Validate listener configuration
        if self.listen.protocol == Protocol::Https && self.listen.tls.is_none() {
            anyhow::bail!(
                "TLS configuration is required when listener protocol is 'https'. \
                 Please provide 'listen.tls.cert_path' and 'listen.tls.key_path'"
            );
        }

        // Validate listener protocol is supported
        if !self.listen.protocol.is_supported() {
            anyhow::bail!(
                "Unsupported listener protocol: '{}'. Currently supported: http, https",
                self.listen.protocol.as_str()
            );
        }

        // Validate upstream configuration (sidecar mode)
        if let Some(ref upstream) = self.upstream {
            let protocol = upstream.get_protocol();
            if !protocol.is_supported() {
                anyhow::bail!(
                    "Unsupported upstream protocol: '{}'. Currently supported: http, https",
                    protocol.as_str()
                );
            }
        }

        // Validate all upstreams (reverse proxy mode)
        for upstream in &self.upstreams {
            upstream.validate().map_err(|e| anyhow::anyhow!(e))?;
        }

        // Validate script rules if present
        self.validate_script_rules()?;

        Ok(())
    }

    /// Validate all script rules based on the configured script engine
    fn validate_script_rules(&self) -> Result<(), anyhow::Error> {
        if self.script_rules.is_empty() {
            return Ok(());
        }

        let engine_type = self
            .script_engine
            .as_ref()
            .map(|cfg| cfg.engine.as_str())
            .unwrap_or("rhai");

        for script_rule in &self.script_rules {
            match engine_type {
                "rhai" => {
                    use crate::scripting::RhaiValidator;
                    RhaiValidator::new()
                        .validate(&script_rule.script)
                        .map_err(|e| {
                            anyhow::anyhow!(
                                "Invalid Rhai script in rule '{}': {}",
                                script_rule.id,
                                e
                            )
                        })?;
                }
                #[cfg(feature = "lua")]
                "lua" => {
                    use crate::scripting::LuaValidator;
                    LuaValidator::new()
                        .validate(&script_rule.script)
                        .map_err(|e| {
                            anyhow::anyhow!(
                                "Invalid Lua script in rule '{}': {}",
                                script_rule.id,
                                e
                            )
                        })?;
                }
                #[cfg(not(feature = "lua"))]
                "lua" => {
                    anyhow::bail!("Lua engine specified but 'lua' feature is not enabled");
                }
                #[cfg(feature = "javascript")]
                "javascript" | "js" => {
                    use crate::scripting::JsValidator;
                    JsValidator::validate_static(&script_rule.script).map_err(|e| {
                        anyhow::anyhow!(
                            "Invalid JavaScript script in rule '{}': {}",
                            script_rule.id,
                            e
                        )
                    })?;
                }
                #[cfg(not(feature = "javascript"))]
                "javascript" | "js" => {
                    anyhow::bail!(
                        "JavaScript engine specified but 'javascript' feature is not enabled"
                    );
                }
                other => {
                    anyhow::bail!("Unknown script engine type: '{other}'");
                }
            }
        }

        Ok(())
    }
}
