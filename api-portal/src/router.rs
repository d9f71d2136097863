// Copyright 2026 Oxide Computer Company

//! Routes incoming HTTP requests to handler functions

use crate::error::HttpError;
use crate::error::PortalError;
use crate::handler::ApiEndpoint;
use crate::handler::RouteHandler;
use crate::server::ServerContext;
use http::Method;
use percent_encoding::percent_decode_str;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;

/// `HttpRouter` maps an HTTP method and URI path to a handler.
///
/// Routes are registered with paths like `"/api/apis/{name}"`.  Paths are
/// split into segments on '/'.  A segment is one of:
///
/// * a literal, which matches exactly that (percent-decoded) segment
/// * a variable, `{name}`, which matches any one segment
/// * a glob, `{name:.*}`, which matches one or more segments
///
/// A glob may be followed only by literal segments, so
/// `"/api/{path:.*}/api-docs"` matches `/api/weather/api-docs` as well as
/// `/api/maps/v2/api-docs`.  A glob at the very end of a route also matches
/// nothing at all.
///
/// Unlike a strict prefix tree, a node may have literal, variable, and glob
/// edges at the same time.  Lookup prefers a literal edge, then the variable
/// edge, then the glob, and backs up to try the next kind whenever the rest of
/// the path doesn't lead to a handler for the request's method.  So with both
/// `"/api/apis/{name}"` and `"/api/{path:.*}/api-docs"` registered,
/// `/api/apis/api-docs` looks up the API named "api-docs" while
/// `/api/apis/x/api-docs` is a docs request.
///
/// Registration mistakes (malformed segments, duplicate routes, reusing a
/// variable name) are programmer errors and panic.  Routes are registered
/// before the server starts and the router is read-only afterwards.
#[derive(Debug)]
pub struct HttpRouter<Context: ServerContext> {
    root: Box<HttpRouterNode<Context>>,
}

#[derive(Debug)]
struct HttpRouterNode<Context: ServerContext> {
    /// handlers for this node, keyed by upper-case method name
    methods: BTreeMap<String, ApiEndpoint<Context>>,
    literals: BTreeMap<String, Box<HttpRouterNode<Context>>>,
    variable: Option<(String, Box<HttpRouterNode<Context>>)>,
    glob: Option<(String, Box<HttpRouterNode<Context>>)>,
}

/// A segment of a route path, as written when registering a route
#[derive(Debug, PartialEq)]
pub enum PathSegment {
    Literal(String),
    /// `{name}`
    VarnameSegment(String),
    /// `{name:.*}`
    VarnameWildcard(String),
}

impl PathSegment {
    /// Parses one segment of a route path.  Panics if the segment looks like
    /// a variable but isn't well-formed.
    pub fn from(segment: &str) -> PathSegment {
        if !segment.starts_with('{') && !segment.ends_with('}') {
            return PathSegment::Literal(segment.to_string());
        }

        assert!(
            segment.starts_with('{'),
            "HTTP URI path segment variable missing leading \"{{\""
        );
        assert!(
            segment.ends_with('}'),
            "HTTP URI path segment variable missing trailing \"}}\""
        );

        let var = &segment[1..segment.len() - 1];
        let (var, pat) = match var.find(':') {
            Some(index) => (&var[..index], Some(&var[index + 1..])),
            None => (var, None),
        };

        assert!(
            !var.is_empty(),
            "HTTP URI path segment variable name must not be empty",
        );

        match pat {
            Some(pat) => {
                assert!(
                    pat == ".*",
                    "Only the pattern '.*' is currently supported"
                );
                PathSegment::VarnameWildcard(var.to_string())
            }
            None => PathSegment::VarnameSegment(var.to_string()),
        }
    }
}

/// The value of a path variable: one segment for `{name}`, the matched
/// segments for `{name:.*}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableValue {
    String(String),
    Components(Vec<String>),
}

pub type VariableSet = BTreeMap<String, VariableValue>;

/// A successful lookup: the handler to run and the values of the route's
/// path variables
#[derive(Debug)]
pub struct RouterLookupResult<Context: ServerContext> {
    pub handler: Arc<dyn RouteHandler<Context>>,
    pub operation_id: String,
    pub variables: VariableSet,
}

impl<Context: ServerContext> HttpRouterNode<Context> {
    fn new() -> Self {
        HttpRouterNode {
            methods: BTreeMap::new(),
            literals: BTreeMap::new(),
            variable: None,
            glob: None,
        }
    }
}

impl<Context: ServerContext> Default for HttpRouter<Context> {
    fn default() -> Self {
        HttpRouter::new()
    }
}

impl<Context: ServerContext> HttpRouter<Context> {
    pub fn new() -> Self {
        HttpRouter { root: Box::new(HttpRouterNode::new()) }
    }

    /// Registers `endpoint` at its method and path.
    pub fn insert(&mut self, endpoint: ApiEndpoint<Context>) {
        let path = endpoint.path.clone();
        let mut varnames: BTreeSet<String> = BTreeSet::new();
        let mut after_glob: Option<String> = None;

        let mut node: &mut Box<HttpRouterNode<Context>> = &mut self.root;
        for raw_segment in route_path_to_segments(&path) {
            let segment = PathSegment::from(raw_segment);

            if let Some(glob_name) = &after_glob {
                if !matches!(segment, PathSegment::Literal(_)) {
                    panic!(
                        "URI path \"{}\": only literal segments may follow \
                         the wildcard variable \"{}\"",
                        path, glob_name,
                    );
                }
            }

            node = match segment {
                PathSegment::Literal(lit) => node
                    .literals
                    .entry(lit)
                    .or_insert_with(|| Box::new(HttpRouterNode::new())),

                PathSegment::VarnameSegment(new_varname) => {
                    insert_var(&path, &mut varnames, &new_varname);
                    let (varname, child) =
                        node.variable.get_or_insert_with(|| {
                            (
                                new_varname.clone(),
                                Box::new(HttpRouterNode::new()),
                            )
                        });
                    check_same_name(&path, varname.as_str(), &new_varname);
                    child
                }

                PathSegment::VarnameWildcard(new_varname) => {
                    insert_var(&path, &mut varnames, &new_varname);
                    after_glob = Some(new_varname.clone());
                    let (varname, child) = node.glob.get_or_insert_with(|| {
                        (new_varname.clone(), Box::new(HttpRouterNode::new()))
                    });
                    check_same_name(&path, varname.as_str(), &new_varname);
                    child
                }
            };
        }

        let methodname = endpoint.method.as_str().to_uppercase();
        if node.methods.contains_key(&methodname) {
            panic!(
                "URI path \"{}\": attempted to create duplicate route for \
                 method \"{}\"",
                path, endpoint.method,
            );
        }

        node.methods.insert(methodname, endpoint);
    }

    /// Finds the handler for a request with `method` and raw (still
    /// percent-encoded) URI `path`.
    ///
    /// A `HEAD` request is served by the `GET` handler when there's no
    /// `HEAD` handler.  Anything that doesn't resolve to a handler for the
    /// method, including a known path with the wrong method, is a 404.  A
    /// path that can't be decoded is a 400.
    pub fn lookup_route(
        &self,
        method: &Method,
        path: &str,
    ) -> Result<RouterLookupResult<Context>, HttpError> {
        let segments = input_path_to_segments(path).map_err(|message| {
            let mut error = HttpError::for_bad_request(String::from(
                "invalid path encoding",
            ));
            error.internal_message = message;
            error
        })?;

        let mut candidates = vec![method.as_str().to_uppercase()];
        if *method == Method::HEAD {
            candidates.push(Method::GET.as_str().to_string());
        }

        for methodname in &candidates {
            let mut variables = VariableSet::new();
            if let Some(endpoint) =
                find_endpoint(&self.root, &segments, methodname, &mut variables)
            {
                return Ok(RouterLookupResult {
                    handler: Arc::clone(&endpoint.handler),
                    operation_id: endpoint.operation_id.clone(),
                    variables,
                });
            }
        }

        Err(PortalError::RouteNotFound {
            method: method.clone(),
            path: path.to_string(),
        }
        .into())
    }

    /// Returns every registered endpoint.  Within a node, endpoints come in
    /// method order, and children are visited literals first, then the
    /// variable, then the glob.
    pub fn endpoints(&self) -> Vec<&ApiEndpoint<Context>> {
        let mut endpoints = Vec::new();
        let mut stack: Vec<&HttpRouterNode<Context>> = vec![&self.root];
        while let Some(node) = stack.pop() {
            endpoints.extend(node.methods.values());
            // Pushed in reverse so that literals pop first.
            if let Some((_, child)) = &node.glob {
                stack.push(child);
            }
            if let Some((_, child)) = &node.variable {
                stack.push(child);
            }
            stack.extend(node.literals.values().rev().map(|c| &**c));
        }
        endpoints
    }
}

/// Depth-first search for a node under `node` that matches all of `segments`
/// and has a handler for `methodname`.  On success `variables` holds exactly
/// the variables bound along the matching path.
fn find_endpoint<'a, Context: ServerContext>(
    node: &'a HttpRouterNode<Context>,
    segments: &[String],
    methodname: &str,
    variables: &mut VariableSet,
) -> Option<&'a ApiEndpoint<Context>> {
    let Some((first, rest)) = segments.split_first() else {
        if let Some(endpoint) = node.methods.get(methodname) {
            return Some(endpoint);
        }

        // A trailing glob matches the empty remainder.
        let (varname, child) = node.glob.as_ref()?;
        let found = child.methods.get(methodname)?;
        variables.insert(varname.clone(), VariableValue::Components(vec![]));
        return Some(found);
    };

    if let Some(child) = node.literals.get(first) {
        if let Some(endpoint) =
            find_endpoint(child, rest, methodname, variables)
        {
            return Some(endpoint);
        }
    }

    if let Some((varname, child)) = &node.variable {
        variables.insert(varname.clone(), VariableValue::String(first.clone()));
        if let Some(endpoint) =
            find_endpoint(child, rest, methodname, variables)
        {
            return Some(endpoint);
        }
        variables.remove(varname);
    }

    // Only literals follow a glob, so trying each split costs at most the
    // depth of the literal suffix.  The (possibly long) matched segments are
    // copied once, for the split that succeeds.
    if let Some((varname, child)) = &node.glob {
        for taken in 1..=segments.len() {
            if let Some(endpoint) =
                find_endpoint(child, &segments[taken..], methodname, variables)
            {
                variables.insert(
                    varname.clone(),
                    VariableValue::Components(segments[..taken].to_vec()),
                );
                return Some(endpoint);
            }
        }
    }

    None
}

fn insert_var(path: &str, varnames: &mut BTreeSet<String>, new_varname: &str) {
    if !varnames.insert(new_varname.to_string()) {
        panic!(
            "URI path \"{}\": variable name \"{}\" is used more than once",
            path, new_varname
        );
    }
}

/// Two routes that share a variable edge must call it the same thing.
fn check_same_name(path: &str, existing: &str, new_varname: &str) {
    if existing != new_varname {
        panic!(
            "URI path \"{}\": attempted to use variable name \"{}\", but a \
             different name (\"{}\") has already been used for this",
            path, new_varname, existing
        );
    }
}

/// Splits a request path into percent-decoded segments.  Empty segments (from
/// a leading '/', a trailing '/', or "//") are dropped.  Dot-segments are
/// rejected rather than resolved.
fn input_path_to_segments(path: &str) -> Result<Vec<String>, String> {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| match segment {
            "." | ".." => Err("dot-segments are not permitted".to_string()),
            _ => Ok(percent_decode_str(segment)
                .decode_utf8()
                .map_err(|e| e.to_string())?
                .to_string()),
        })
        .collect()
}

/// Splits a route path.  Route paths come from our own code, so problems
/// panic.  Paths must begin with '/' and only the last segment may be empty.
fn route_path_to_segments(path: &str) -> Vec<&str> {
    if !path.starts_with('/') {
        panic!("route paths must begin with a '/': '{}'", path);
    }
    let mut ret = path.split('/').skip(1).collect::<Vec<_>>();
    for segment in &ret[..ret.len() - 1] {
        if segment.is_empty() {
            panic!("path segments may not be empty: '{}'", path);
        }
    }

    if ret.last() == Some(&"") {
        ret.pop();
    }
    ret
}
