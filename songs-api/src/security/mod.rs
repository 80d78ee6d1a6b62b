//! Authentication primitives: password hashing and JWT access tokens

pub mod jwt;
pub mod password;

pub use jwt::{Claims, JwtManager, TokenError};
pub use password::{
    hash_password, hash_password_blocking, verify_password, verify_password_blocking, PasswordHash,
};
