pub mod inspect;
pub mod lp;
pub mod solve;
pub mod util;
