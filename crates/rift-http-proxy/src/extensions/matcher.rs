use crate::config::{HeaderMatch, PathMatch, Rule};
use crate::predicate::{
    compile_header_matcher, compile_query_matcher, parse_query_string, CompiledBodyMatcher,
    CompiledFieldMatcher,
};
use hyper::{HeaderMap, Method, Uri};
use regex::Regex;
use std::sync::Arc;

pub struct CompiledRule {
    pub id: String,
    pub match_config: CompiledMatch,
    pub rule: Arc<Rule>,
}

pub struct CompiledMatch {
    methods: Vec<Method>,
    path_matcher: PathMatcher,
    headers: Vec<HeaderMatch>,
    /// Enhanced header predicates (Mountebank-compatible)
    header_predicates: Vec<CompiledFieldMatcher>,
    /// Query parameter matchers
    query_matchers: Vec<CompiledFieldMatcher>,
    /// Body matcher
    body_matcher: Option<CompiledBodyMatcher>,
    /// Case-sensitive matching
    case_sensitive: bool,
}

enum PathMatcher {
    Any,
    Exact(String),
    Prefix(String),
    Regex(Regex),
    Contains(String),
    EndsWith(String),
}

impl CompiledRule {
    pub fn compile(rule: Rule) -> Result<Self, anyhow::Error> {
        let methods: Vec<Method> = rule
            .match_config
            .methods
            .iter()
            .map(|m| m.parse())
            .collect::<Result<Vec<_>, _>>()?;

        let path_matcher = match &rule.match_config.path {
            PathMatch::Any => PathMatcher::Any,
            PathMatch::Exact { exact } => PathMatcher::Exact(exact.clone()),
            PathMatch::Prefix { prefix } => PathMatcher::Prefix(prefix.clone()),
            PathMatch::Regex { regex } => PathMatcher::Regex(Regex::new(regex)?),
            PathMatch::Contains { contains } => PathMatcher::Contains(contains.clone()),
            PathMatch::EndsWith { ends_with } => PathMatcher::EndsWith(ends_with.clone()),
        };

        // Compile enhanced header predicates
        let header_predicates: Result<Vec<_>, _> = rule
            .match_config
            .header_predicates
            .iter()
            .map(compile_header_matcher)
            .collect();

        // Compile query matchers
        let query_matchers: Result<Vec<_>, _> = rule
            .match_config
            .query
            .iter()
            .map(compile_query_matcher)
            .collect();

        // Compile body matcher
        let body_matcher = rule
            .match_config
            .body
            .as_ref()
            .map(CompiledBodyMatcher::compile)
            .transpose()?;

        Ok(CompiledRule {
            id: rule.id.clone(),
            match_config: CompiledMatch {
                methods,
                path_matcher,
                headers: rule.match_config.headers.clone(),
                header_predicates: header_predicates?,
                query_matchers: query_matchers?,
                body_matcher,
                case_sensitive: rule.match_config.case_sensitive,
            },
            rule: Arc::new(rule),
        })
    }

    pub fn matches(&self, method: &Method, uri: &Uri, headers: &HeaderMap) -> bool {
        self.matches_with_body(method, uri, headers, None)
    }

    /// Match with optional request body (for body predicates)
    pub fn matches_with_body(
        &self,
        method: &Method,
        uri: &Uri,
        headers: &HeaderMap,
        body: Option<&str>,
    ) -> bool {
        let case_sensitive = self.match_config.case_sensitive;

        // Match method
        if !self.match_config.methods.is_empty() && !self.match_config.methods.contains(method) {
            return false;
        }

        // Match path
        let path = uri.path();
        match &self.match_config.path_matcher {
            PathMatcher::Any => {}
            PathMatcher::Exact(exact) => {
                let matches = if case_sensitive {
                    path == exact
                } else {
                    path.eq_ignore_ascii_case(exact)
                };
                if !matches {
                    return false;
                }
            }
            PathMatcher::Prefix(prefix) => {
                let matches = if case_sensitive {
                    path.starts_with(prefix)
                } else {
                    path.to_lowercase().starts_with(&prefix.to_lowercase())
                };
                if !matches {
                    return false;
                }
            }
            PathMatcher::Regex(regex) => {
                if !regex.is_match(path) {
                    return false;
                }
            }
            PathMatcher::Contains(pattern) => {
                let matches = if case_sensitive {
                    path.contains(pattern)
                } else {
                    path.to_lowercase().contains(&pattern.to_lowercase())
                };
                if !matches {
                    return false;
                }
            }
            PathMatcher::EndsWith(suffix) => {
                let matches = if case_sensitive {
                    path.ends_with(suffix)
                } else {
                    path.to_lowercase().ends_with(&suffix.to_lowercase())
                };
                if !matches {
                    return false;
                }
            }
        }

        // Match simple headers (backward compatible)
        for header_match in &self.match_config.headers {
            let header_value = match headers.get(&header_match.name) {
                Some(value) => value,
                None => return false,
            };

            let value_str = match header_value.to_str() {
                Ok(s) => s,
                Err(_) => return false,
            };

            if value_str != header_match.value {
                return false;
            }
        }

        // Match enhanced header predicates
        for header_pred in &self.match_config.header_predicates {
            let value = headers
                .get(header_pred.name.as_str())
                .and_then(|v| v.to_str().ok());
            if !header_pred.matches(value) {
                return false;
            }
        }

        // Match query parameters
        if !self.match_config.query_matchers.is_empty() {
            let query_params = parse_query_string(uri.query());
            for query_matcher in &self.match_config.query_matchers {
                let value = query_params.get(&query_matcher.name).map(|s| s.as_str());
                if !query_matcher.matches(value) {
                    return false;
                }
            }
        }

        // Match body (if provided and body matcher configured)
        if let Some(ref body_matcher) = self.match_config.body_matcher {
            match body {
                Some(body_str) => {
                    if !body_matcher.matches(body_str, case_sensitive) {
                        return false;
                    }
                }
                None => {
                    // Body matcher configured but no body provided - don't match
                    return false;
                }
            }
        }

        true
    }
}

pub fn find_matching_rule<'a>(
    rules: &'a [CompiledRule],
    method: &Method,
    uri: &Uri,
    headers: &HeaderMap,
) -> Option<&'a CompiledRule> {
    rules.iter().find(|rule| rule.matches(method, uri, headers))
}
