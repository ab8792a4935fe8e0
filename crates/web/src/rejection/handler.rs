use std::any::type_name;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use micro_http::protocol::HttpResponse;
use tracing::debug;

use crate::rejection::default_handler::default_handler;
use crate::rejection::{CircuitBreakerOpenRejection, HandlerError, Rejection, RejectionVariant};
use crate::route::Route;

type RuleFn = dyn Fn(&[Rejection]) -> Option<Route> + Send + Sync;
type ResponseMapper = dyn Fn(HttpResponse) -> HttpResponse + Send + Sync;

#[derive(Clone)]
struct Rule {
    description: Cow<'static, str>,
    f: Arc<RuleFn>,
}

impl Rule {
    fn apply(&self, rejections: &[Rejection]) -> Option<Route> {
        (self.f)(rejections)
    }

    fn map_response(&self, mapper: &Arc<ResponseMapper>) -> Rule {
        let f = Arc::clone(&self.f);
        let mapper = Arc::clone(mapper);
        Rule {
            description: self.description.clone(),
            f: Arc::new(move |rejections: &[Rejection]| f(rejections).map(|route| map_route(route, &mapper))),
        }
    }
}

fn map_route(route: Route, mapper: &Arc<ResponseMapper>) -> Route {
    let mapper = Arc::clone(mapper);
    route.map_response(move |response| mapper(response))
}

/// Builds a [`RejectionHandler`] from an ordered list of rules.
///
/// Rules are tried in registration order, whatever their kind; the first one
/// that matches decides the response.
pub struct RejectionHandlerBuilder {
    rules: Vec<Rule>,
    not_found: Option<Route>,
    is_default: bool,
}

impl RejectionHandlerBuilder {
    pub(crate) fn new(is_default: bool) -> Self {
        Self { rules: Vec::new(), not_found: None, is_default }
    }

    /// Adds a rule firing on the first rejection `f` returns a route for.
    ///
    /// The other rejections are ignored.
    pub fn handle<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&Rejection) -> Option<Route> + Send + Sync + 'static,
    {
        self.rules.push(Rule {
            description: Cow::Borrowed("case"),
            f: Arc::new(move |rejections: &[Rejection]| rejections.iter().find_map(&f)),
        });
        self
    }

    /// Adds a rule firing on the first rejection of exact payload type `T`.
    pub fn handle_variant<T, F>(&mut self, f: F) -> &mut Self
    where
        T: RejectionVariant,
        F: Fn(&T) -> Route + Send + Sync + 'static,
    {
        self.rules.push(Rule {
            description: Cow::Owned(format!("case {}", short_type_name::<T>())),
            f: Arc::new(move |rejections: &[Rejection]| rejections.iter().find_map(T::from_rejection).map(&f)),
        });
        self
    }

    /// Adds a rule firing if any rejection has exact payload type `T`.
    ///
    /// `f` receives all of them at once, in their original order.
    pub fn handle_all<T, F>(&mut self, f: F) -> &mut Self
    where
        T: RejectionVariant,
        F: Fn(Vec<T>) -> Route + Send + Sync + 'static,
    {
        self.rules.push(Rule {
            description: Cow::Owned(format!("all {}", short_type_name::<T>())),
            f: Arc::new(move |rejections: &[Rejection]| {
                let matched = rejections.iter().filter_map(T::from_rejection).cloned().collect::<Vec<_>>();
                (!matched.is_empty()).then(|| f(matched))
            }),
        });
        self
    }

    /// Sets the route used when there are no rejections at all.
    pub fn handle_not_found(&mut self, route: Route) -> &mut Self {
        self.not_found = Some(route);
        self
    }

    pub fn handle_circuit_breaker_open_rejection<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&CircuitBreakerOpenRejection) -> Route + Send + Sync + 'static,
    {
        self.handle_variant::<CircuitBreakerOpenRejection, F>(f)
    }

    /// Freezes the rules registered so far. The builder stays usable.
    pub fn result(&self) -> RejectionHandler {
        RejectionHandler {
            kind: HandlerKind::Built {
                rules: self.rules.clone(),
                not_found: self.not_found.clone(),
                is_default: self.is_default,
            },
        }
    }
}

impl fmt::Debug for RejectionHandlerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RejectionHandlerBuilder")
            .field("rules", &self.rules.iter().map(|rule| &rule.description).collect::<Vec<_>>())
            .field("not_found", &self.not_found.is_some())
            .field("is_default", &self.is_default)
            .finish()
    }
}

type HandlerFn = dyn Fn(&[Rejection]) -> Option<Route> + Send + Sync;

/// Maps the rejections collected for a request to the route answering it.
///
/// Handlers are immutable and cheap to clone; build them once and share them.
#[derive(Clone)]
pub struct RejectionHandler {
    kind: HandlerKind,
}

#[derive(Clone)]
enum HandlerKind {
    Built { rules: Vec<Rule>, not_found: Option<Route>, is_default: bool },
    Function(Arc<HandlerFn>),
    Fallback { primary: Arc<RejectionHandler>, fallback: Arc<RejectionHandler> },
}

impl RejectionHandler {
    pub fn builder() -> RejectionHandlerBuilder {
        RejectionHandlerBuilder::new(false)
    }

    /// A handler backed by a plain function.
    ///
    /// Such a handler cannot have its responses mapped, see
    /// [`map_rejection_response`](Self::map_rejection_response).
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&[Rejection]) -> Option<Route> + Send + Sync + 'static,
    {
        Self { kind: HandlerKind::Function(Arc::new(f)) }
    }

    /// Returns true if this is the built-in default handler, which answers
    /// every rejection set.
    pub fn is_default(&self) -> bool {
        matches!(self.kind, HandlerKind::Built { is_default: true, .. })
    }

    pub(crate) fn kind_name(&self) -> &'static str {
        match self.kind {
            HandlerKind::Built { .. } => "built",
            HandlerKind::Function(_) => "function",
            HandlerKind::Fallback { .. } => "fallback",
        }
    }

    /// Returns the route for `rejections`, or `None` if no rule matches.
    ///
    /// An empty slice means no route matched the request at all; only the
    /// not-found route can answer it.
    pub fn apply(&self, rejections: &[Rejection]) -> Option<Route> {
        match &self.kind {
            HandlerKind::Built { not_found, .. } if rejections.is_empty() => {
                debug!(found = not_found.is_some(), "no rejections, use not found route");
                not_found.clone()
            }
            HandlerKind::Built { rules, .. } => rules.iter().find_map(|rule| {
                let route = rule.apply(rejections);
                if route.is_some() {
                    debug!(rule = %rule.description, rejections = rejections.len(), "rejection rule matched");
                }
                route
            }),
            HandlerKind::Function(f) => f(rejections),
            HandlerKind::Fallback { primary, fallback } => {
                primary.apply(rejections).or_else(|| fallback.apply(rejections))
            }
        }
    }

    /// Tries `self` first and `other` for whatever `self` leaves unhandled.
    ///
    /// The default handler leaves nothing unhandled, so it is returned as is.
    /// Two built handlers are merged into one built handler.
    #[must_use]
    pub fn with_fallback(self, other: RejectionHandler) -> RejectionHandler {
        if self.is_default() {
            return self;
        }

        match (self.kind, other.kind) {
            (
                HandlerKind::Built { mut rules, not_found, .. },
                HandlerKind::Built { rules: other_rules, not_found: other_not_found, is_default },
            ) => {
                rules.extend(other_rules);
                RejectionHandler {
                    kind: HandlerKind::Built { rules, not_found: not_found.or(other_not_found), is_default },
                }
            }
            (primary, fallback) => RejectionHandler {
                kind: HandlerKind::Fallback {
                    primary: Arc::new(RejectionHandler { kind: primary }),
                    fallback: Arc::new(RejectionHandler { kind: fallback }),
                },
            },
        }
    }

    /// Falls back to the default handler, making this handler answer every
    /// rejection set.
    #[must_use]
    pub fn seal(self) -> RejectionHandler {
        if self.is_default() {
            self
        } else {
            self.with_fallback(default_handler().clone())
        }
    }

    /// Post-processes the response of every rule and of the not-found route.
    ///
    /// Only handlers made by [`RejectionHandlerBuilder::result`] (or merged
    /// from such handlers) know their rules; anything else is an error.
    pub fn map_rejection_response<F>(self, f: F) -> Result<RejectionHandler, HandlerError>
    where
        F: Fn(HttpResponse) -> HttpResponse + Send + Sync + 'static,
    {
        let kind = self.kind_name();
        let HandlerKind::Built { rules, not_found, is_default } = self.kind else {
            return Err(HandlerError::NotBuilt { kind });
        };

        let mapper: Arc<ResponseMapper> = Arc::new(f);
        Ok(RejectionHandler {
            kind: HandlerKind::Built {
                rules: rules.iter().map(|rule| rule.map_response(&mapper)).collect(),
                not_found: not_found.map(|route| map_route(route, &mapper)),
                is_default,
            },
        })
    }

    /// Prepares a rejection set for handling.
    ///
    /// Transformations are taken out of the set, duplicates among the other
    /// rejections are dropped (the first occurrence wins), and then each
    /// transformation is applied in order to the result of the previous one.
    pub fn apply_transformations(rejections: Vec<Rejection>) -> Vec<Rejection> {
        let mut transformations = Vec::new();
        let mut remaining: Vec<Rejection> = Vec::with_capacity(rejections.len());
        for rejection in rejections {
            match rejection {
                Rejection::Transformation(transformation) => transformations.push(transformation),
                rejection if remaining.contains(&rejection) => {}
                rejection => remaining.push(rejection),
            }
        }

        transformations.iter().fold(remaining, |remaining, transformation| transformation.transform(remaining))
    }
}

impl Default for RejectionHandler {
    fn default() -> Self {
        default_handler().clone()
    }
}

impl fmt::Debug for RejectionHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            HandlerKind::Built { rules, not_found, is_default } => f
                .debug_struct("RejectionHandler")
                .field("rules", &rules.len())
                .field("not_found", &not_found.is_some())
                .field("is_default", is_default)
                .finish(),
            HandlerKind::Function(_) => f.debug_struct("RejectionHandler").finish_non_exhaustive(),
            HandlerKind::Fallback { primary, fallback } => {
                f.debug_struct("RejectionHandler").field("primary", primary).field("fallback", fallback).finish()
            }
        }
    }
}

fn short_type_name<T>() -> &'static str {
    let name = type_name::<T>();
    name.rsplit("::").next().unwrap_or(name)
}
