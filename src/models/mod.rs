mod access;
mod profile;
mod requests;
mod subscription;

pub use access::*;
pub use profile::*;
pub use requests::*;
pub use subscription::*;
