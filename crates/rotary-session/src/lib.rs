//! Remote session contracts and key-routed session delegation.
//!
//! A [`DelegatingSessionFactory`] owns a set of keyed delegate factories.
//! Callers bind a [`RoutingKey`](rotary_core::RoutingKey) to the current
//! thread through [`ThreadKeyRouter`]; subsequent `session()` calls on that
//! thread open sessions from the matching delegate.

pub mod delegating;
pub mod session;

pub use delegating::{
    DefaultSessionFactoryLocator, DelegatingSessionFactory, SessionFactoryLocator,
};
pub use session::{Session, SessionFactory, ThreadKeyRouter};
