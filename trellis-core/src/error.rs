//! Error types shared by the reactive core and the renderer.
//!
//! Every operation that can detect a malformed node description or a broken
//! usage contract reports it synchronously through [`Error`]. Nothing is
//! retried.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised by the runtime and the renderer.
#[derive(Debug, Error)]
pub enum Error {
    /// An observation was started while another one was recording reads.
    #[error("cannot start tracking while another observation is recording reads")]
    NestedTracking,

    /// `create_effect` was called outside a component body.
    #[error("`create_effect()` must be called inside a component")]
    EffectOutsideComponent,

    /// The `ref` property was given something other than a reference.
    #[error("the `ref` property must be an element reference or a callback")]
    InvalidRef,

    /// An event key was given something other than a handler.
    #[error("`{key}` must be bound to an event handler")]
    InvalidHandler { key: String },

    /// A handler was bound to a key that is not an event key.
    #[error("`{key}` is not an event key but was given an event handler")]
    UnexpectedHandler { key: String },

    /// The `use` property was given something other than directives.
    #[error("the `use` property only accepts directive bindings")]
    InvalidDirective,

    /// A property was given a value its key does not accept.
    #[error("invalid value for `{key}`: {reason}")]
    InvalidProp { key: String, reason: String },

    /// A style resolver received something other than a string or mapping.
    #[error("style must be a string or an object, got {0}")]
    InvalidStyle(String),

    /// `bind` received something other than a mapping.
    #[error("only objects can be bound to an element, got {0}")]
    InvalidBind(String),

    /// A `p:` tag names a component that was never registered.
    #[error("component `<p:{0}>` is not registered")]
    UnknownComponent(String),

    /// `use_directive` names a directive that was never registered.
    #[error("directive `{0}` is not registered")]
    UnknownDirective(String),

    /// A component returned an empty fragment.
    #[error("component `{0}` must return at least one node")]
    EmptyComponent(String),

    /// A list render produced the same key twice.
    #[error("duplicate key `{0}` found in <p:each>")]
    DuplicateKey(String),

    /// A list item rendered no nodes.
    #[error("<p:each> items must render at least one node")]
    EmptyListItem,

    /// A conditional branch rendered no nodes.
    #[error("<p:case> branches must render at least one node")]
    EmptyBranch,

    /// A conditional block was built without branches.
    #[error("<p:case> requires at least one branch")]
    NoBranches,

    /// The mount target is not an element.
    #[error("mount target is not an element node")]
    InvalidTarget,

    /// A component body reported a failure.
    #[error("component `{component}` failed: {message}")]
    Component { component: String, message: String },

    /// The runtime configuration could not be parsed.
    #[error("invalid runtime configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl Error {
    /// Build a user-level component error.
    pub fn component(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Whether this error describes a malformed node description or a
    /// misuse detected while building one.
    pub fn is_construction(&self) -> bool {
        !matches!(self, Self::Component { .. } | Self::Config(_))
    }
}
