// 会话令牌：签发与校验

pub mod clock;
pub mod token;

pub use clock::{Clock, SystemClock};
pub use token::{
    IssuedToken, Principal, Role, TOKEN_LIFETIME_SECS, TokenCodec, TokenError, VerifiedToken,
};
