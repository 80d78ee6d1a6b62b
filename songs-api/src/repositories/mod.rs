//! Repositories: the only sanctioned entry points to the stores
//!
//! Every statement runs through the `TxContext` shared with the owning unit
//! of work, so a bound transaction covers all three repositories.

pub mod ratings;
pub mod songs;
pub mod users;

pub use ratings::RatingsRepository;
pub use songs::SongsRepository;
pub use users::UsersRepository;
