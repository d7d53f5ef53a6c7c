pub mod auth_header;
pub mod auth_refresh;

use std::sync::Arc;

use crate::navigator::Navigator;
use crate::session::SessionHandle;
use crate::transport::Transport;

pub use auth_header::WithAuthHeader;
pub use auth_refresh::{Attempt, WithAuthRefresh};

pub type AuthenticatedStack =
    WithAuthRefresh<WithAuthHeader<Arc<dyn Transport>>, Arc<dyn Transport>>;

/// `WithAuthRefresh(WithAuthHeader(raw))`. The refresh call itself goes
/// straight through `raw`.
pub fn authenticated(
    raw: Arc<dyn Transport>,
    session: SessionHandle,
    navigator: Arc<dyn Navigator>,
) -> AuthenticatedStack {
    let with_header = WithAuthHeader::new(raw.clone(), session.clone());
    WithAuthRefresh::new(with_header, raw, session, navigator)
}
