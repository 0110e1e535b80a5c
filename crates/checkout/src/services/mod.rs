//! Collaborators the flow is injected with.
//!
//! Each trait is the narrow capability the flow needs from a piece of the
//! surrounding application: who is signed in, where to navigate, what is in
//! the cart, and how to tell the user something happened.

pub mod cart;
pub mod notify;
pub mod router;
pub mod session;

use std::sync::Arc;

pub use cart::{CartStore, InMemoryCart};
pub use notify::{Notifier, TracingNotifier};
pub use router::{HistoryNavigator, Navigator, routes};
pub use session::{SessionProvider, StaticSession};

/// The synchronous collaborators shared by every stage of the flow.
///
/// Cheap to clone; every field is reference counted.
#[derive(Clone)]
pub struct Services {
    pub session: Arc<dyn SessionProvider>,
    pub navigator: Arc<dyn Navigator>,
    pub cart: Arc<dyn CartStore>,
    pub notifier: Arc<dyn Notifier>,
}

impl Services {
    /// Bundle the collaborators.
    pub fn new(
        session: Arc<dyn SessionProvider>,
        navigator: Arc<dyn Navigator>,
        cart: Arc<dyn CartStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            session,
            navigator,
            cart,
            notifier,
        }
    }
}
