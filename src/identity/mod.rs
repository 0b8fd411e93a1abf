//! Identity core: user entity, persistence, handle allocation and the
//! signup/signin resolver. Keep the public surface thin and split the
//! implementation across sub-modules.

mod user;
mod store;
mod handle;
mod resolver;

pub use user::{AuthMode, NewUser, User, DEFAULT_PROFILE_IMG};
pub use store::{FileIdentityStore, IdentityStore};
pub use handle::{allocate, HANDLE_SUFFIX_LEN};
pub use resolver::{AuthSession, IdentityResolver};
