use crate::config::{HeaderMatch, HostMatch, Route};
use hyper::Request;
use regex::Regex;

/// Router matches incoming requests to upstream services
pub struct Router {
    routes: Vec<CompiledRoute>,
}

struct CompiledRoute {
    name: String,
    upstream: String,
    host: Option<CompiledHost>,
    path_prefix: Option<String>,
    path_exact: Option<String>,
    path_regex: Option<Regex>,
    headers: Vec<HeaderMatch>,
}

enum CompiledHost {
    Exact(String),
    Wildcard(String),
}

impl Router {
    /// Create a new router from route configuration
    pub fn new(routes: Vec<Route>) -> Result<Self, String> {
        let mut compiled = Vec::new();

        for route in routes {
            compiled.push(compile_route(route)?);
        }

        Ok(Router { routes: compiled })
    }

    /// Match a request to an upstream service name
    /// Returns the upstream name if matched, None if no match
    pub fn match_request<B>(&self, req: &Request<B>) -> Option<&str> {
        // First-match-wins algorithm
        for route in &self.routes {
            if matches_route(req, route) {
                return Some(&route.upstream);
            }
        }
        None
    }
}

fn compile_route(route: Route) -> Result<CompiledRoute, String> {
    let host = route.match_config.host.map(|host_match| match host_match {
        HostMatch::Exact(h) => CompiledHost::Exact(h),
        HostMatch::Wildcard { wildcard } => CompiledHost::Wildcard(wildcard),
    });

    let path_regex = if let Some(pattern) = &route.match_config.path_regex {
        let regex = Regex::new(pattern)
            .map_err(|e| format!("Invalid path regex in route '{}': {}", route.name, e))?;
        Some(regex)
    } else {
        None
    };

    Ok(CompiledRoute {
        name: route.name,
        upstream: route.upstream,
        host,
        path_prefix: route.match_config.path_prefix,
        path_exact: route.match_config.path_exact,
        path_regex,
        headers: route.match_config.headers,
    })
}

fn matches_route<B>(req: &Request<B>, route: &CompiledRoute) -> bool {
    // Check host
    if let Some(ref host_match) = route.host {
        let req_host = req
            .uri()
            .host()
            .or_else(|| req.headers().get("host").and_then(|h| h.to_str().ok()));

        let matches = match (req_host, host_match) {
            (Some(req_host), CompiledHost::Exact(ref pattern)) => req_host == pattern,
            (Some(req_host), CompiledHost::Wildcard(ref pattern)) => {
                // Simple wildcard matching (*.example.com)
                if let Some(suffix) = pattern.strip_prefix("*.") {
                    req_host.ends_with(suffix)
                } else {
                    req_host == pattern
                }
            }
            _ => false,
        };

        if !matches {
            return false;
        }
    }

    // Check path
    let path = req.uri().path();

    if let Some(ref exact) = route.path_exact {
        if path != exact {
            return false;
        }
    }

    if let Some(ref prefix) = route.path_prefix {
        if !path.starts_with(prefix) {
            return false;
        }
    }

    if let Some(ref regex) = route.path_regex {
        if !regex.is_match(path) {
            return false;
        }
    }

    // Check headers
    for header_match in &route.headers {
        match req.headers().get(&header_match.name) {
            Some(header_val) => {
                if header_val.to_str().ok() != Some(&header_match.value) {
                    return false;
                }
            }
            None => return false,
        }
    }

    true
}
