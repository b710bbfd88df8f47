use crate::extensions::flow_state::FlowStore;
use anyhow::{anyhow, Result};
use rhai::Dynamic;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

// Engine modules (only used by proxy.rs for compilation)
mod rhai_engine;
pub use rhai_engine::RhaiEngine;

// Script pool for optimized execution
mod script_pool;
pub use script_pool::{CompiledScript, ScriptPool, ScriptPoolConfig};

// Decision cache for memoization
mod decision_cache;
pub use decision_cache::{CacheKey, DecisionCache, DecisionCacheConfig};

#[cfg(feature = "lua")]
mod lua_engine;
#[cfg(feature = "lua")]
pub use lua_engine::{compile_to_bytecode, LuaEngine};

#[cfg(feature = "javascript")]
mod js_engine;
#[cfg(feature = "javascript")]
pub use js_engine::{
    clear_imposter_state, compile_js_to_bytecode, execute_mountebank_decorate,
    execute_mountebank_inject, JsEngine, MountebankRequest,
};
#[cfg(feature = "javascript")]
#[expect(unused_imports, reason = "public API for library consumers")]
pub use js_engine::{execute_js_bytecode, MountebankDecorateResponse, MountebankInjectResponse};

// Validator trait and unified error types
mod validator;
#[expect(unused_imports, reason = "public API for library consumers")]
pub use validator::ScriptValidationError;
pub use validator::ScriptValidator;

// Validator modules - used by config validation and stub_validator
mod rhai_validator;
#[expect(unused_imports, reason = "public API for library consumers")]
pub use rhai_validator::ValidationError as RhaiValidationError;
pub use rhai_validator::RhaiValidator;

#[cfg(feature = "lua")]
mod lua_validator;
#[cfg(feature = "lua")]
#[expect(unused_imports, reason = "public API for library consumers")]
pub use lua_validator::LuaValidationError;
#[cfg(feature = "lua")]
pub use lua_validator::LuaValidator;

#[cfg(feature = "javascript")]
mod js_validator;
#[cfg(feature = "javascript")]
#[expect(unused_imports, reason = "public API for library consumers")]
pub use js_validator::JsValidationError;
#[cfg(feature = "javascript")]
pub use js_validator::JsValidator;

// Stub script validation for Admin API
mod stub_validator;
pub use stub_validator::{validate_stub, validate_stubs};

/// Script execution result for fault injection decisions
#[derive(Debug, Clone)]

pub enum FaultDecision {
    None,
    Latency {
        duration_ms: u64,
        rule_id: String,
    },
    Error {
        status: u16,
        body: String,
        rule_id: String,
        headers: std::collections::HashMap<String, String>,
    },
}

/// Unified script engine that supports Rhai, Lua, and JavaScript
#[derive(Clone)]

pub enum ScriptEngine {
    Rhai(RhaiEngine),
    #[cfg(feature = "lua")]
    Lua(LuaEngine),
    #[cfg(feature = "javascript")]
    JavaScript(JsEngine),
}

impl ScriptEngine {
    /// Create a new script engine based on the engine type
    pub fn new(engine_type: &str, script: &str, rule_id: String) -> Result<Self> {
        match engine_type {
            "rhai" => Ok(ScriptEngine::Rhai(RhaiEngine::new(script, rule_id)?)),
            #[cfg(feature = "lua")]
            "lua" => Ok(ScriptEngine::Lua(LuaEngine::new(script, rule_id)?)),
            #[cfg(not(feature = "lua"))]
            "lua" => Err(anyhow!(
                "Lua engine is not enabled. Enable the 'lua' feature flag"
            )),
            #[cfg(feature = "javascript")]
            "javascript" | "js" => Ok(ScriptEngine::JavaScript(JsEngine::new(script, rule_id)?)),
            #[cfg(not(feature = "javascript"))]
            "javascript" | "js" => Err(anyhow!(
                "JavaScript engine is not enabled. Enable the 'javascript' feature flag"
            )),
            other => Err(anyhow!("Unknown script engine type: {other}")),
        }
    }

    /// Execute the script and determine if a fault should be injected
    pub fn should_inject_fault(
        &self,
        request: &ScriptRequest,
        flow_store: Arc<dyn FlowStore>,
    ) -> Result<FaultDecision> {
        match self {
            ScriptEngine::Rhai(engine) => engine.should_inject_fault(request, flow_store),
            #[cfg(feature = "lua")]
            ScriptEngine::Lua(engine) => engine.should_inject(request, flow_store),
            #[cfg(feature = "javascript")]
            ScriptEngine::JavaScript(engine) => engine.should_inject(request, flow_store),
        }
    }
}

/// Request context passed to scripts
#[derive(Debug, Clone)]

pub struct ScriptRequest {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: Value,
    /// Query parameters parsed from the URL
    pub query: HashMap<String, String>,
    /// Path parameters extracted from route patterns (e.g., /users/:id)
    pub path_params: HashMap<String, String>,
}

/// Wrapper for FlowStore that can be used in scripts (both Rhai and Lua)
/// Uses direct synchronous calls since FlowStore is no longer async
#[derive(Clone)]

pub struct ScriptFlowStore {
    store: Arc<dyn FlowStore>,
}

impl ScriptFlowStore {
    pub fn new(store: Arc<dyn FlowStore>) -> Self {
        Self { store }
    }

    /// Get a value from flow state
    pub fn get(&mut self, flow_id: String, key: String) -> Dynamic {
        match self.store.get(&flow_id, &key) {
            Ok(Some(val)) => rhai_engine::json_to_dynamic(val),
            _ => Dynamic::UNIT,
        }
    }

    /// Set a value in flow state
    pub fn set(&mut self, flow_id: String, key: String, value: Dynamic) -> bool {
        let json_val = rhai_engine::dynamic_to_json(value);
        self.store.set(&flow_id, &key, json_val).is_ok()
    }

    /// Check if a key exists
    pub fn exists(&mut self, flow_id: String, key: String) -> bool {
        self.store.exists(&flow_id, &key).unwrap_or(false)
    }

    /// Delete a key
    pub fn delete(&mut self, flow_id: String, key: String) -> bool {
        self.store.delete(&flow_id, &key).is_ok()
    }

    /// Increment a counter
    pub fn increment(&mut self, flow_id: String, key: String) -> i64 {
        self.store.increment(&flow_id, &key).unwrap_or(0)
    }

    /// Set TTL for a flow
    pub fn set_ttl(&mut self, flow_id: String, ttl_seconds: i64) -> bool {
        self.store.set_ttl(&flow_id, ttl_seconds).is_ok()
    }
}
