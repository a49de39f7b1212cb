//! Conventional resource route expansion.
//!
//! [`expand`] turns one resource name into the fixed table of up to ten
//! routes: five for the collection and its members and five for member
//! relationships.
//!
//! | Action            | Method   | Path                                   |
//! |-------------------|----------|----------------------------------------|
//! | `list`            | `GET`    | `/{name}`                              |
//! | `create`          | `POST`   | `/{name}`                              |
//! | `show`            | `GET`    | `/{name}/:id`                          |
//! | `update`          | `PATCH`  | `/{name}/:id`                          |
//! | `destroy`         | `DELETE` | `/{name}/:id`                          |
//! | `related`         | `GET`    | `/{name}/:id/:relation`                |
//! | `fetch-related`   | `GET`    | `/{name}/:id/relationships/:relation`  |
//! | `replace-related` | `PATCH`  | `/{name}/:id/relationships/:relation`  |
//! | `add-related`     | `POST`   | `/{name}/:id/relationships/:relation`  |
//! | `remove-related`  | `DELETE` | `/{name}/:id/relationships/:relation`  |

use std::fmt;
use std::str::FromStr;

use http::Method;

/// One of the ten conventional resource actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceAction {
    /// `GET /{name}`
    List,
    /// `POST /{name}`
    Create,
    /// `GET /{name}/:id`
    Show,
    /// `PATCH /{name}/:id`
    Update,
    /// `DELETE /{name}/:id`
    Destroy,
    /// `GET /{name}/:id/:relation`
    Related,
    /// `GET /{name}/:id/relationships/:relation`
    FetchRelated,
    /// `PATCH /{name}/:id/relationships/:relation`
    ReplaceRelated,
    /// `POST /{name}/:id/relationships/:relation`
    AddRelated,
    /// `DELETE /{name}/:id/relationships/:relation`
    RemoveRelated,
}

impl ResourceAction {
    /// Every action, in registration order.
    pub const ALL: [Self; 10] = [
        Self::List,
        Self::Create,
        Self::Show,
        Self::Update,
        Self::Destroy,
        Self::Related,
        Self::FetchRelated,
        Self::ReplaceRelated,
        Self::AddRelated,
        Self::RemoveRelated,
    ];

    /// The action's suffix in the `{name}/{action}` handler name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Create => "create",
            Self::Show => "show",
            Self::Update => "update",
            Self::Destroy => "destroy",
            Self::Related => "related",
            Self::FetchRelated => "fetch-related",
            Self::ReplaceRelated => "replace-related",
            Self::AddRelated => "add-related",
            Self::RemoveRelated => "remove-related",
        }
    }

    /// The HTTP method this action is registered under.
    #[must_use]
    pub fn method(self) -> Method {
        match self {
            Self::List | Self::Show | Self::Related | Self::FetchRelated => Method::GET,
            Self::Create | Self::AddRelated => Method::POST,
            Self::Update | Self::ReplaceRelated => Method::PATCH,
            Self::Destroy | Self::RemoveRelated => Method::DELETE,
        }
    }

    /// Renders the URL shape for a resource name.
    #[must_use]
    pub fn path(self, resource: &str) -> String {
        match self {
            Self::List | Self::Create => format!("/{resource}"),
            Self::Show | Self::Update | Self::Destroy => format!("/{resource}/:id"),
            Self::Related => format!("/{resource}/:id/:relation"),
            Self::FetchRelated | Self::ReplaceRelated | Self::AddRelated | Self::RemoveRelated => {
                format!("/{resource}/:id/relationships/:relation")
            }
        }
    }

    /// Returns `true` for the five relationship actions.
    #[must_use]
    pub const fn is_relationship(self) -> bool {
        matches!(
            self,
            Self::Related
                | Self::FetchRelated
                | Self::ReplaceRelated
                | Self::AddRelated
                | Self::RemoveRelated
        )
    }
}

impl fmt::Display for ResourceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown resource action name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown resource action `{0}`")]
pub struct UnknownResourceAction(pub String);

impl FromStr for ResourceAction {
    type Err = UnknownResourceAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.name() == s)
            .ok_or_else(|| UnknownResourceAction(s.to_string()))
    }
}

/// Filters applied when expanding a resource.
///
/// `only` is a whitelist and `except` a blacklist. They may be combined; an
/// action listed in both is excluded. Turning `related` off excludes the five
/// relationship actions.
///
/// # Example
///
/// ```rust
/// use trellis_router::{ResourceAction, ResourceOptions};
///
/// let options = ResourceOptions::new()
///     .only([ResourceAction::List, ResourceAction::Show])
///     .except([ResourceAction::Show]);
///
/// assert!(options.includes(ResourceAction::List));
/// assert!(!options.includes(ResourceAction::Show));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceOptions {
    only: Option<Vec<ResourceAction>>,
    except: Vec<ResourceAction>,
    related: bool,
}

impl Default for ResourceOptions {
    fn default() -> Self {
        Self {
            only: None,
            except: Vec::new(),
            related: true,
        }
    }
}

impl ResourceOptions {
    /// Options that generate all ten routes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts expansion to the given actions.
    pub fn only(mut self, actions: impl IntoIterator<Item = ResourceAction>) -> Self {
        self.only = Some(actions.into_iter().collect());
        self
    }

    /// Excludes the given actions. Takes precedence over [`only`](Self::only).
    pub fn except(mut self, actions: impl IntoIterator<Item = ResourceAction>) -> Self {
        self.except.extend(actions);
        self
    }

    /// Enables or disables the relationship routes.
    pub fn related(mut self, enabled: bool) -> Self {
        self.related = enabled;
        self
    }

    /// Returns `true` if the action survives the filters.
    #[must_use]
    pub fn includes(&self, action: ResourceAction) -> bool {
        if self.except.contains(&action) {
            return false;
        }
        if !self.related && action.is_relationship() {
            return false;
        }
        self.only
            .as_ref()
            .map_or(true, |only| only.contains(&action))
    }
}

/// A route produced by [`expand`], ready to be registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRoute {
    /// Conventional action kind.
    pub kind: ResourceAction,
    /// HTTP method.
    pub method: Method,
    /// Un-normalized path pattern.
    pub pattern: String,
    /// Handler name, `{resource}/{action}`.
    pub action: String,
}

/// Expands a resource name into its conventional routes, in table order.
///
/// The name is used verbatim in both the URL and the handler names.
///
/// ```rust
/// use trellis_router::{expand, ResourceOptions};
///
/// let routes = expand("books", &ResourceOptions::new().related(false));
/// let actions: Vec<_> = routes.iter().map(|r| r.action.as_str()).collect();
/// assert_eq!(
///     actions,
///     ["books/list", "books/create", "books/show", "books/update", "books/destroy"]
/// );
/// ```
#[must_use]
pub fn expand(resource: &str, options: &ResourceOptions) -> Vec<ResourceRoute> {
    ResourceAction::ALL
        .into_iter()
        .filter(|action| options.includes(*action))
        .map(|kind| ResourceRoute {
            kind,
            method: kind.method(),
            pattern: kind.path(resource),
            action: format!("{resource}/{}", kind.name()),
        })
        .collect()
}
