use crate::{
    http::{request::split_path, request::Request, response::Response},
    server::server_impl::{ErasedHandler, Handler, HandlerError},
};
use crossbeam::sync::ShardedLock;
use std::{collections::HashMap, fmt, sync::Arc, sync::PoisonError};

/// Method and path routing table.
///
/// Patterns are matched segment by segment. A segment starting with `:` is a
/// wildcard that matches exactly one non-empty path segment, so `/a/:id`
/// matches `/a/1` but neither `/a/1/2` nor `/a/`. Methods are compared
/// exactly (`GET` and `get` are different methods).
///
/// Lookups take a shared lock and may run from any number of connection
/// tasks at once; registration takes the exclusive side.
///
/// # Examples
/// ```
/// use tcp_to_http::{HandlerResult, Request, Resolved, Response, Router};
///
/// fn user(_: &mut Response, _: &Request) -> HandlerResult {
///     Ok(())
/// }
///
/// let router = Router::new();
/// router.register("GET", "/users/:id", user);
///
/// assert!(matches!(router.resolve("GET", "/users/7"), Resolved::Found(_)));
/// assert!(matches!(router.resolve("GET", "/users"), Resolved::NotFound));
/// assert!(matches!(
///     router.resolve("POST", "/users/7"),
///     Resolved::MethodNotAllowed(allowed) if allowed == ["GET"]
/// ));
/// ```
#[derive(Default)]
pub struct Router {
    table: ShardedLock<RouteTable>,
}

#[derive(Default)]
struct RouteTable {
    routes: Vec<Route>,
    // method -> pattern -> position in `routes`
    exact: HashMap<String, HashMap<String, usize>>,
}

/// A registered route, as returned by [`Router::resolve`].
#[derive(Clone)]
pub struct Route {
    method: Arc<str>,
    pattern: Arc<str>,
    wildcard: bool,
    handler: Arc<dyn ErasedHandler>,
}

/// Outcome of a route lookup.
#[derive(Debug, Clone)]
pub enum Resolved {
    Found(Route),
    /// No route of any method matches the path.
    NotFound,
    /// Routes exist for the path, but only for these methods, in
    /// registration order.
    MethodNotAllowed(Vec<String>),
}

impl Router {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a route. Registering the same method and pattern again replaces
    /// the handler; the route keeps its original lookup priority.
    pub fn register<H: Handler>(&self, method: &str, pattern: &str, handler: H) {
        let route = Route {
            method: Arc::from(method),
            pattern: Arc::from(pattern),
            wildcard: split_path(pattern).any(|segment| segment.starts_with(':')),
            handler: Arc::new(handler),
        };

        let mut table = self.table.write().unwrap_or_else(PoisonError::into_inner);
        let table = &mut *table;

        let patterns = table.exact.entry(method.to_owned()).or_default();
        match patterns.get(pattern) {
            Some(&i) => {
                table.routes[i] = route;
                tracing::info!(method, pattern, "Route replaced");
            }
            None => {
                patterns.insert(pattern.to_owned(), table.routes.len());
                table.routes.push(route);
                tracing::info!(method, pattern, "Route registered");
            }
        }
    }

    /// Finds the handler for `method` and `path`.
    ///
    /// An exact pattern match wins; otherwise wildcard patterns are tried in
    /// registration order. Anything after a `?` in `path` is ignored.
    pub fn resolve(&self, method: &str, path: &str) -> Resolved {
        let path = path.split_once('?').map_or(path, |(path, _)| path);
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);

        if let Some(&i) = table.exact.get(method).and_then(|p| p.get(path)) {
            return Resolved::Found(table.routes[i].clone());
        }

        if let Some(route) = table
            .routes
            .iter()
            .find(|route| &*route.method == method && route.wildcard && route.matches(path))
        {
            return Resolved::Found(route.clone());
        }

        let mut allowed: Vec<String> = Vec::new();
        for route in table.routes.iter().filter(|route| route.matches(path)) {
            if !allowed.iter().any(|m| m.as_str() == &*route.method) {
                allowed.push(route.method.to_string());
            }
        }

        match allowed.is_empty() {
            true => Resolved::NotFound,
            false => Resolved::MethodNotAllowed(allowed),
        }
    }

    pub fn len(&self) -> usize {
        self.table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .routes
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_list().entries(table.routes.iter()).finish()
    }
}

impl Route {
    #[inline]
    pub fn method(&self) -> &str {
        &self.method
    }

    #[inline]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Runs the route's handler.
    #[inline]
    pub async fn call(&self, response: &mut Response, request: &Request) -> Result<(), HandlerError> {
        self.handler.call(response, request).await
    }

    #[inline]
    pub(crate) fn pattern_arc(&self) -> Arc<str> {
        self.pattern.clone()
    }

    fn matches(&self, path: &str) -> bool {
        if !self.wildcard {
            return &*self.pattern == path;
        }

        let mut pattern = split_path(&self.pattern);
        let mut segments = split_path(path);

        loop {
            match (pattern.next(), segments.next()) {
                (None, None) => return true,
                (Some(p), Some(s)) if p.starts_with(':') && !s.is_empty() => {}
                (Some(p), Some(s)) if p == s && !p.starts_with(':') => {}
                _ => return false,
            }
        }
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.pattern)
            .finish_non_exhaustive()
    }
}
