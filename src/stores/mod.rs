mod identity;
mod profiles;

pub use identity::*;
pub use profiles::*;
